#![forbid(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::json;
use tracing::info;

use snippetbox::config::Config;
use snippetbox::db::{DatabaseError, DatabaseManager};
use snippetbox::utils;

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    utils::logging::init_tracing(&config.logging);

    let db_manager = DatabaseManager::new(&config.database).await?;
    let store = db_manager.snippet_store();

    match cli.command {
        Command::InitSchema => {
            db_manager.init_schema().await?;
            info!("snippets table is ready");
        }
        Command::Create {
            title,
            content,
            expires,
        } => {
            let id = store.create(&title, &content, expires).await?;
            println!("{}", json!({ "id": id }));
        }
        Command::Show { id } => match store.get_by_id(id).await {
            Ok(snippet) => println!("{}", serde_json::to_string_pretty(&snippet)?),
            Err(DatabaseError::NoRecord) => bail!("snippet {id} not found"),
            Err(err) => return Err(err.into()),
        },
        Command::Latest => {
            let snippets = store.list_latest().await?;
            println!("{}", serde_json::to_string_pretty(&snippets)?);
        }
    }

    Ok(())
}
