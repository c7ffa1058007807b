use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use finanza::config::ResolvedConfig;
use finanza::storage::{JsonFileStorage, Storage};
use finanza::upload::{Preprocessor, UploadFlow};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "finanza")]
#[command(about = "Personal finance transaction tracker")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "finanza.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,
    /// Import a bank statement file through the upload pipeline
    Import {
        /// Statement file (xlsx, xls or csv)
        file: PathBuf,
        /// Bank the statement comes from (intesa, allianz)
        #[arg(short, long)]
        bank: String,
        /// Account the transactions belong to
        #[arg(short, long)]
        account: String,
        /// Report what would be committed without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List stored transactions
    List {
        /// Only transactions for this bank
        #[arg(short, long)]
        bank: Option<String>,
        /// Only transactions for this account (requires --bank)
        #[arg(short, long, requires = "bank")]
        account: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)?;

    match cli.command {
        Some(Command::Config) => {
            println!("Config file: {}", cli.config.display());
            println!("Data directory: {}", config.data_dir.display());
            println!("Upload directory: {}", config.upload_dir.display());
        }
        Some(Command::Import {
            file,
            bank,
            account,
            dry_run,
        }) => {
            let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));
            import(storage, &config, &file, &bank, &account, dry_run).await?;
        }
        Some(Command::List { bank, account }) => {
            let storage = JsonFileStorage::new(&config.data_dir);
            list(&storage, bank.as_deref(), account.as_deref()).await?;
        }
        None => {
            println!("Finanza - Personal Finance Tracker");
            println!("===================================\n");
            println!("Config: {}", cli.config.display());
            println!("Data directory: {}\n", config.data_dir.display());
            println!("Commands:");
            println!("  config    Show current configuration");
            println!("  import    Import a bank statement file");
            println!("  list      List stored transactions\n");
            println!("Run 'finanza --help' for more options.");
        }
    }

    Ok(())
}

async fn import(
    storage: Arc<dyn Storage>,
    config: &ResolvedConfig,
    file: &PathBuf,
    bank: &str,
    account: &str,
    dry_run: bool,
) -> Result<()> {
    let mut flow = UploadFlow::new(storage, Preprocessor::new(&config.upload_dir));
    flow.select_file(file, bank, account);

    let pre = flow.preprocess().await?;
    println!(
        "Parsed {} transactions from {}",
        pre.transactions.len(),
        file.display()
    );
    if let Some(range) = pre.date_range {
        println!("Date range: {} to {}", range.first_date, range.last_date);
    }
    for warning in &pre.warnings {
        println!("  warning: {}", warning.message);
    }
    println!("Raw file saved as {}", pre.saved_filename);

    let harmonized = flow.harmonize().await?;
    println!(
        "{} new, {} already stored",
        harmonized.new_transactions.len(),
        harmonized.duplicate_transactions.len()
    );
    for tx in &harmonized.new_transactions {
        println!(
            "  {} {:>10}  {}",
            tx.date,
            tx.amount,
            tx.description.as_deref().unwrap_or("-")
        );
    }

    if dry_run {
        println!("Dry run: nothing committed.");
        return Ok(());
    }

    let committed = flow.commit().await?;
    println!("{}", committed.message);
    Ok(())
}

async fn list(
    storage: &dyn Storage,
    bank: Option<&str>,
    account: Option<&str>,
) -> Result<()> {
    let transactions = match (bank, account) {
        (Some(bank), Some(account)) => storage.find_transactions(bank, account).await?,
        (Some(bank), None) => {
            let mut all = storage.all_transactions().await?;
            all.retain(|t| t.bank_name.eq_ignore_ascii_case(bank));
            all
        }
        _ => storage.all_transactions().await?,
    };

    for tx in &transactions {
        println!(
            "{} {:>12}  {:<12} {:<16} {}",
            tx.date,
            tx.amount,
            tx.bank_name,
            tx.account_name,
            tx.description.as_deref().unwrap_or("-")
        );
    }
    println!("{} transactions", transactions.len());
    Ok(())
}
