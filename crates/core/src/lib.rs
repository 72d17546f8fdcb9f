//! Domain types for meshgen.
//!
//! Describes a 3D generation request ([`JobSpec`]), the API token that
//! authorizes it ([`Credentials`]) and the local validation applied
//! before anything is sent to the remote service.

pub mod credentials;
pub mod error;
pub mod spec;

pub use credentials::Credentials;
pub use error::ValidationError;
pub use spec::{GenerationMode, JobSpec, OutputFormat};
