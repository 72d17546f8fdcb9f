//! `meshgen` -- generate 3D models with the Tripo API.
//!
//! Submits an image, multiview or text job, waits for it and saves the
//! model. Configuration comes from the environment (see
//! [`CliConfig::from_env`]) with command-line flags taking precedence.
//!
//! ```text
//! meshgen --image photo.png --output model.glb
//! meshgen -i front.png -i back.png -i left.png -o model.fbx -f fbx
//! meshgen --prompt "a wooden barrel" --output barrel.glb
//! meshgen --balance
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use meshgen_cli::args::Args;
use meshgen_cli::config::CliConfig;
use meshgen_cli::progress;
use meshgen_tripo::GenerationTask;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meshgen=info,meshgen_tripo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "meshgen failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = CliConfig::from_env()?;
    config.apply_args(&args)?;

    let credentials = config.credentials(args.api_key.clone())?;
    tracing::info!(
        api_base = %config.api_base,
        api_key = %credentials,
        "Starting meshgen",
    );
    let client = Arc::new(config.job_client(credentials)?);

    if args.balance {
        let balance = client.get_balance().await?;
        println!("Credits remaining: {} (frozen: {})", balance.balance, balance.frozen);
        return Ok(());
    }

    let spec = args.job_spec()?;
    let output = args.output_path()?;
    if args.output.as_deref() != Some(output.as_path()) {
        tracing::info!(output = %output.display(), "Output adjusted to match format");
    }

    tracing::info!(
        mode = %spec.mode,
        format = %spec.format,
        output = %output.display(),
        timeout_secs = config.timeout.as_secs(),
        "Generating model",
    );

    let reporter = tokio::spawn(progress::report(client.subscribe()));
    let task = GenerationTask::spawn(client, spec, output, config.poll_config());

    let cancel = task.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted. The remote task may still complete and consume credits.");
            cancel.cancel();
        }
    });

    let result = task.join().await;
    // The task held the last client handle; the reporter ends once it has
    // drained the remaining events.
    let _ = reporter.await;
    let outcome = result?;

    tracing::info!(
        task_id = %outcome.handle,
        path = %outcome.path.display(),
        bytes = outcome.bytes,
        finished_at = %outcome.finished_at,
        "Done",
    );
    Ok(())
}
