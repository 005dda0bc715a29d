pub mod commands;
pub mod prompt;
pub mod status;
pub mod watch;

use std::{
    io::{self, IsTerminal},
    path::PathBuf,
};

use anyhow::Result;
use clap::Parser;
use commands::{execute, Commands};
use prompt::LinePrompt;
use tracing::{info, warn};
use watch::run_watch;

use crate::{
    storage::{
        json_storage::JsonFileStorage,
        snapshot::{load_planner, save_planner},
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, LogSettings},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Daybudget", version, long_about = None)]
#[command(about = "Plan how the hours left in your day are spent", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Print logs to stdout as well")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. Defaults to $XDG_STATE_HOME/daybudget or \
                $HOME/.local/state/daybudget"
    )]
    dir: Option<PathBuf>,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    enable_logging(&LogSettings::for_cli(&dir, args.log))?;

    let storage = JsonFileStorage::new(dir.join("state"))?;
    let colored = io::stdout().is_terminal();

    if let Commands::Watch = args.commands {
        return run_watch(storage, DefaultClock, colored).await;
    }

    let mut planner = load_planner(&storage).await;
    let mutates = args.commands.mutates();
    let output = execute(
        &mut planner,
        args.commands,
        DefaultClock.time(),
        colored,
        &mut LinePrompt::stdio(),
    )?;

    if mutates {
        let failed = save_planner(&storage, &planner).await;
        if failed > 0 {
            warn!("{failed} state keys weren't saved");
            eprintln!("Warning: {failed} state keys couldn't be saved, see the logs");
        } else {
            info!("State saved");
        }
    }

    print!("{output}");
    Ok(())
}
