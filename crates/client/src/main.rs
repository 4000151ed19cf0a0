//! Taskwire CLI
//!
//! Watches a task, project, or dashboard view and prints live updates.
//!
//! ```bash
//! taskwire --origin https://tasks.example.com save-token <jwt>
//! taskwire watch --screen projects
//! taskwire chat --session 12 "what is overdue?"
//! ```

mod cmd_chat;
mod cmd_token;
mod cmd_watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskwire::config::Settings;
use taskwire::logging::init_logging;
use taskwire::paths::DataDir;
use taskwire::token::TokenStore;
use taskwire::Screen;

#[derive(Parser, Debug)]
#[command(name = "taskwire")]
#[command(version, about = "Live task and project notifications")]
struct Cli {
    /// Backend origin, e.g. https://tasks.example.com
    #[arg(long, global = true, env = "TASKWIRE_ORIGIN")]
    origin: Option<String>,

    /// Session token (JWT) used for REST and the notification socket
    #[arg(long, global = true, env = "TASKWIRE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding config.toml, the token file, and logs
    #[arg(long, global = true, env = "TASKWIRE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mount a view and print it as notifications arrive
    Watch {
        #[arg(long, value_enum, default_value_t = Screen::Tasks)]
        screen: Screen,
    },
    /// Send a chatbot message and stream the reply
    Chat {
        #[arg(long)]
        session: i64,
        message: String,
    },
    /// Store a session token in the data dir
    SaveToken { token: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = DataDir::resolve(cli.data_dir.as_deref());
    data_dir.ensure_dirs()?;
    let _logging = init_logging(&data_dir)?;

    let settings = Settings::resolve(cli.origin.as_deref(), data_dir.clone())?;
    let store = TokenStore::new(data_dir);

    match cli.command {
        Command::Watch { screen } => {
            let token = store.resolve(cli.token.as_deref(), &settings.file);
            cmd_watch::run(&settings, token, screen).await
        }
        Command::Chat { session, message } => {
            let token = store.resolve(cli.token.as_deref(), &settings.file);
            cmd_chat::run(&settings, token, session, &message).await
        }
        Command::SaveToken { token } => cmd_token::save(&store, &token),
    }
}
