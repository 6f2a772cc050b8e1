use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod chat;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "3000")]
        port: String,
    },
    /// Start a terminal chat session against a running relay
    Chat {
        /// Base URL of the relay
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,

        /// Bearer token for the relay (falls back to MINDCARE_ID_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await;
        }
        Some(Command::Chat { url, token }) => {
            chat::run(&url, token).await?;
        }
        None => {}
    }

    Ok(())
}
