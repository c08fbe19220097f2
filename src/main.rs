use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing_subscriber::EnvFilter;

use rekins::{
    emit_invoice, share_title, CounterAllocator, DirectoryExport, FirestoreConfig, FirestoreStore,
    InvoiceDraft, ISSUER,
};

#[derive(Parser, Debug)]
#[command(name = "rekins", about = "Invoice PDF generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose the invoice for a draft file, save it, and advance the
    /// counter.
    Generate {
        /// JSON draft: items, optional buyer text, payment method.
        #[arg(long)]
        draft: PathBuf,

        /// Output directory (defaults to the current directory).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Issue date as YYYY-MM-DD (defaults to today, UTC).
        #[arg(long)]
        date: Option<String>,
    },

    /// Print the number the next invoice will carry.
    ShowNumber,

    /// Override the counter (operator correction).
    SetNumber { value: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let store = store_from_env()?;

    match cli.command {
        Command::Generate { draft, out, date } => {
            let json = std::fs::read_to_string(&draft)
                .with_context(|| format!("failed to read draft file {}", draft.display()))?;
            let draft: InvoiceDraft =
                serde_json::from_str(&json).context("failed to parse draft file")?;

            let issue_date = match date {
                Some(s) => Date::parse(&s, format_description!("[year]-[month]-[day]"))
                    .context("invalid --date, expected YYYY-MM-DD")?,
                None => OffsetDateTime::now_utc().date(),
            };

            let mut allocator = CounterAllocator::load(store).await?;
            let mut target = DirectoryExport::new(out.unwrap_or_else(|| PathBuf::from(".")));

            let emitted = emit_invoice(&mut allocator, &ISSUER, &draft, issue_date, &mut target).await?;

            println!(
                "{} -> {}",
                share_title(emitted.number),
                target
                    .last_written()
                    .map(|p| p.display().to_string())
                    .unwrap_or(emitted.filename),
            );
            println!("nākamais numurs: {}", allocator.current());
        }

        Command::ShowNumber => {
            let allocator = CounterAllocator::load(store).await?;
            println!("{}", allocator.current());
        }

        Command::SetNumber { value } => {
            let mut allocator = CounterAllocator::load(store).await?;
            allocator.set_manual(value).await?;
            println!("rēķina numurs mainīts uz {value}");
        }
    }

    Ok(())
}

fn store_from_env() -> anyhow::Result<FirestoreStore> {
    let project = std::env::var("REKINS_FIRESTORE_PROJECT")
        .context("REKINS_FIRESTORE_PROJECT is not set")?;
    let api_key = std::env::var("REKINS_FIRESTORE_API_KEY")
        .context("REKINS_FIRESTORE_API_KEY is not set")?;

    let mut config = FirestoreConfig::new(project, api_key);
    if let Ok(base_url) = std::env::var("REKINS_FIRESTORE_BASE_URL") {
        config = config.with_base_url(base_url);
    }

    Ok(FirestoreStore::new(config))
}
