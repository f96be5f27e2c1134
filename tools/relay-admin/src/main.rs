//! relay-admin: manage the relay's IP allow/block lists from the shell.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use relay_admin::{AdminClient, ClientError};

#[derive(Parser, Debug)]
#[command(name = "relay-admin")]
#[command(about = "Manage the relay IP access gate")]
struct Args {
    /// Relay base URL
    #[arg(long, env = "RELAY_ADMIN_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Admin key sent as X-Admin-Key
    #[arg(long, env = "RELAY_ADMIN_KEY", hide_env_values = true)]
    key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current mode and lists
    Status,
    /// Block an address (removes it from the allow list)
    Block { ip: String },
    /// Allow an address (removes it from the block list)
    Allow { ip: String },
    /// Remove an address from both lists
    Remove { ip: String },
    /// Switch the gate mode
    Mode { mode: Mode },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Whitelist,
    Blacklist,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Whitelist => "whitelist",
            Mode::Blacklist => "blacklist",
        }
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    let client = AdminClient::new(args.url, args.key)?;

    let outcome = match args.command {
        Command::Status => {
            print!("{}", client.status().await?);
            return Ok(());
        }
        Command::Block { ip } => client.block(&ip).await?,
        Command::Allow { ip } => client.allow(&ip).await?,
        Command::Remove { ip } => client.remove(&ip).await?,
        Command::Mode { mode } => client.set_mode(mode.as_str()).await?,
    };

    println!("{}", outcome.message);
    print!("{}", outcome.status);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        if e.is_unauthorized() {
            eprintln!("Admin key rejected. Check --key or RELAY_ADMIN_KEY.");
        }
        return Err(e.into());
    }
    Ok(())
}
