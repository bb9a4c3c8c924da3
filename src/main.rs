use anyhow::Context;
use clap::Parser;
use desk_driver::backend::native_backend;
use desk_driver::driver::{drive_loop, DriverSession};
use desk_driver::logging;
use desk_driver::settings::Settings;
use std::path::PathBuf;

/// Drive the desktop pointer and keyboard from action scripts.
#[derive(Parser)]
#[command(name = "desk_driver", version)]
struct Cli {
    /// Action script to run. Required unless --drive is given.
    script: Option<PathBuf>,

    /// Settings file.
    #[arg(long, default_value = "settings.json")]
    settings: String,

    /// Leave the queues populated after execution instead of draining them.
    #[arg(long)]
    keep_queues: bool,

    /// Serve the JSON line protocol on stdin instead of running a script.
    #[arg(long)]
    drive: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings))?;
    logging::init(settings.debug_logging);

    let backend = native_backend()?;

    if cli.drive {
        tracing::info!("serving drive commands on stdin");
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        return drive_loop(backend.as_ref(), stdin.lock(), stdout.lock());
    }

    let path = cli
        .script
        .context("an action script is required unless --drive is given")?;
    let script = std::fs::read_to_string(&path)
        .with_context(|| format!("reading script {}", path.display()))?;

    let mut session = DriverSession::new(&settings, backend)?;
    let outcome = session.parse(&script).map_err(anyhow::Error::from).and_then(|()| {
        session.execute_queues(!cli.keep_queues)
    });
    session.shutdown();

    let events = session.monitor().action_history().len();
    tracing::info!(events, "session finished");
    outcome
}
