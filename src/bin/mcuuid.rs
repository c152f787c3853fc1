use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use mcuuid::Bootstrap;
use mcuuid::app::format_fields;
use mcuuid::browser::HelpLauncher;
use mcuuid::telemetry::init_tracing;
use tokio::io::{self, AsyncWriteExt, BufReader};
use tokio::task;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mcuuid", version, about = "Look up a Minecraft account UUID", long_about = None)]
struct Args {
    /// Username to look up once. Starts an interactive session when omitted.
    #[arg(value_name = "USERNAME")]
    username: Option<String>,

    /// Show UUIDs with dashes (saved for future runs).
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_dashes")]
    dashes: bool,

    /// Show UUIDs without dashes (saved for future runs).
    #[arg(long, action = ArgAction::SetTrue)]
    no_dashes: bool,

    /// Open the web version in a browser and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    web: bool,

    /// Increase logging verbosity.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Override the default configuration path.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let bootstrap = Bootstrap::load(args.config.clone())?;
    init_tracing("mcuuid", args.verbose, &bootstrap.settings.traces)?;
    info!(path = %bootstrap.config_path.display(), "using config");

    if args.web {
        HelpLauncher::from_settings(&bootstrap.settings).open_and_wait();
        return Ok(());
    }

    // The blocking HTTP client must be built off the async worker threads.
    let mut app = task::spawn_blocking(move || bootstrap.build_app()).await??;
    if args.dashes {
        app.form_mut().set_dashes(true)?;
    } else if args.no_dashes {
        app.form_mut().set_dashes(false)?;
    }

    match args.username {
        Some(name) => {
            let fields = app.lookup_once(&name).await?;
            let mut stdout = io::stdout();
            stdout.write_all(format_fields(&fields).as_bytes()).await?;
            stdout.flush().await?;
        }
        None => {
            let stdin = BufReader::new(io::stdin());
            app.run(stdin, io::stdout()).await?;
        }
    }

    Ok(())
}
