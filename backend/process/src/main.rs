use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://nominations.db")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import the nomination form's CSV export
    Import { csv: PathBuf },

    /// Write every nomination to a JSON file
    Export {
        #[arg(default_value = "nominations-export.json")]
        output: PathBuf,
    },

    /// Create an admin account, generating a password unless one is given
    CreateAdmin {
        username: String,

        #[arg(long)]
        password: Option<String>,
    },

    /// Create committee accounts with generated passwords
    CreateCommittee {
        #[arg(required = true)]
        usernames: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let store = process::open(&args.database).await?;

    match args.command {
        Command::Import { csv } => {
            process::import_csv(&store, &csv).await?;
        }
        Command::Export { output } => {
            process::export_json(&store, &output).await?;
        }
        Command::CreateAdmin { username, password } => {
            process::create_admin(&store, &username, password).await?;
        }
        Command::CreateCommittee { usernames } => {
            process::create_committee(&store, &usernames).await?;
        }
    }

    store.close().await;
    Ok(())
}
