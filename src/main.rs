//! Ledger Todo CLI
//!
//! Read-only inspection of any account's list against a live node.
//! Writes need a wallet and go through the library's commands layer.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ledger_todo::config::{ClientConfig, CONFIG_FILE_NAME};
use ledger_todo::domain::{AccountAddress, TodoList};
use ledger_todo::AppState;

#[derive(Parser)]
#[command(name = "ledger-todo", version, about = "Inspect ledger-backed todo lists")]
struct Cli {
    /// Config file (created by `init-config`)
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Override the fullnode REST endpoint
    #[arg(long, global = true)]
    node_url: Option<String>,

    /// Override the todolist module address
    #[arg(long, global = true)]
    module_address: Option<String>,

    /// Directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print an account's todo list
    Show {
        address: String,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn print_list(list: &TodoList) {
    if !list.exists {
        println!("{} has no todo list", list.owner);
        return;
    }
    println!(
        "{} ({} tasks, {} open)",
        list.owner,
        list.tasks.len(),
        list.pending_count()
    );
    for task in &list.tasks {
        let mark = if task.completed { "x" } else { " " };
        println!("  [{}] {:>3}  {}", mark, task.task_id, task.content);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let mut config = ClientConfig::load_or_default(&cli.config).map_err(|e| e.to_string())?;
    if let Some(url) = cli.node_url {
        config.node_url = url;
    }
    if let Some(addr) = cli.module_address {
        config.module_address = addr;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }

    let log_dir = config
        .log_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("ledger-todo"));
    if let Err(e) = rolling_logger::init_logger(log_dir, "LedgerTodo") {
        eprintln!("Logging disabled: {}", e);
    }

    match cli.command {
        Command::InitConfig { force } => {
            if cli.config.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    cli.config.display()
                ));
            }
            config.save(&cli.config).map_err(|e| e.to_string())?;
            println!("Wrote {}", cli.config.display());
            Ok(())
        }
        Command::Show { address, json } => {
            let owner = AccountAddress::parse(&address).map_err(|e| e.to_string())?;
            let state = AppState::from_config(&config).map_err(|e| e.to_string())?;

            let list = state.synchronizer.fetch(&owner).await.map_err(|e| {
                let _ = rolling_logger::error(&format!("show {} failed: {}", owner, e));
                e.to_string()
            })?;

            if json {
                let out = serde_json::to_string_pretty(&list).map_err(|e| e.to_string())?;
                println!("{}", out);
            } else {
                print_list(&list);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
