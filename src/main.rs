use std::sync::Arc;

use anyhow::Context;

use mail_triage::config::Config;
use mail_triage::mailbox::{GmailClient, MailboxClient};
use mail_triage::mailbox::fetch::fetch_and_store;
use mail_triage::rules::RuleEngine;
use mail_triage::store::{LibSqlBackend, MessageStore};

const USAGE: &str = "usage: mail-triage [process|fetch|init-db]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "process".to_string());
    if !matches!(command.as_str(), "process" | "fetch" | "init-db") {
        eprintln!("Error: unknown command '{}'", command);
        eprintln!("  {}", USAGE);
        std::process::exit(2);
    }

    let config = Config::from_env().context("invalid configuration")?;

    eprintln!("📬 Mail Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Command: {}", command);
    eprintln!("   Database: {}", config.db_path.display());

    let store = LibSqlBackend::new_local(&config.db_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    match command.as_str() {
        "init-db" => {
            let count = store.count().await?;
            eprintln!("   Cache ready ({} messages)", count);
        }
        "fetch" => {
            eprintln!("   Query: {} (max {})", config.fetch.query, config.fetch.max_results);
            let client = GmailClient::new(&config.gmail);
            let stored = fetch_and_store(
                &client,
                &store,
                &config.fetch.query,
                config.fetch.max_results,
            )
            .await
            .context("failed to list messages")?;
            tracing::info!("Fetched and stored {} messages", stored);
        }
        _ => {
            eprintln!("   Rules: {}\n", config.rules_path.display());
            let store: Arc<dyn MessageStore> = Arc::new(store);
            let mailbox: Arc<dyn MailboxClient> = Arc::new(GmailClient::new(&config.gmail));
            let summary = RuleEngine::new(store, mailbox)
                .run(&config.rules_path)
                .await
                .context("failed to load rule document")?;
            tracing::info!("Run complete: {}", summary);
        }
    }

    Ok(())
}
