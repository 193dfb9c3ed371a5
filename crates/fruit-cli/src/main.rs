// ============================================================================
// fruit-db — CLI ledger inspection tool for the fruit bot
// ============================================================================
// Usage:
//   fruit-db stats                          Show ledger statistics
//   fruit-db list-users                     List users with collection sizes
//   fruit-db show-user <ID>                 Show one user's collection
//   fruit-db export --format json           Export the full ledger as JSON
//   fruit-db import <FILE>                  Copy a users_data.json into the store
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fruit_core::store::{open_store, read_ledger_strict, LedgerStore, StoreBackend};
use fruit_core::{Ledger, Rarity};

/// Fruit bot ledger inspection tool
#[derive(Parser)]
#[command(name = "fruit-db", version, about = "Inspect and manage the fruit bot ledger")]
struct Cli {
    /// Store backend: json or redb (default: $FRUIT_STORE_BACKEND or json)
    #[arg(long, global = true, env = "FRUIT_STORE_BACKEND", default_value = "json")]
    backend: String,

    /// Path to the store (default: users_data.json / ~/.fruitbot/ledger.redb)
    #[arg(long, global = true, env = "FRUIT_STORE_PATH")]
    store_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show ledger statistics (users, items, per-rarity counts)
    Stats,

    /// List users with their collection sizes
    ListUsers,

    /// Show one user's record and collection
    ShowUser {
        /// Platform user id
        id: String,
    },

    /// Export the full ledger as JSON
    Export {
        /// Output format (currently only json is supported)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Replace the configured store with the contents of a JSON ledger file
    Import {
        /// users_data.json-format file to read
        file: String,

        /// Show what would be imported without writing
        #[arg(long)]
        dry_run: bool,
    },
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let backend: StoreBackend = cli.backend.parse()?;
    let store = open_store(backend, cli.store_path.as_deref())?;

    match cli.command {
        Commands::Stats => cmd_stats(store.as_ref()),
        Commands::ListUsers => cmd_list_users(store.as_ref()),
        Commands::ShowUser { id } => cmd_show_user(store.as_ref(), &id),
        Commands::Export { format } => cmd_export(store.as_ref(), &format),
        Commands::Import { file, dry_run } => cmd_import(store.as_ref(), &file, dry_run),
    }
}

fn cmd_stats(store: &dyn LedgerStore) -> Result<()> {
    let stats = store.load()?.stats();

    println!("=== Fruit Bot Ledger Stats ===");
    println!("Store: {}", store.describe());
    println!();
    println!("Users:    {} ({} have drawn)", stats.total_users, stats.active_drawers);
    println!("Fruits:   {} total", stats.total_items);
    for rarity in Rarity::ALL {
        let count = stats.items_by_rarity.get(&rarity).copied().unwrap_or(0);
        println!("  {:12} {}", rarity.as_str(), count);
    }

    Ok(())
}

fn cmd_list_users(store: &dyn LedgerStore) -> Result<()> {
    let ledger = store.load()?;

    if ledger.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("{:<14}  {:<24}  {:>6}  {}", "USER ID", "NAME", "FRUITS", "LAST DRAW");
    println!("{}", "-".repeat(72));

    for (id, record) in ledger.iter() {
        let name = record.display_name.chars().take(24).collect::<String>();
        println!(
            "{:<14}  {:<24}  {:>6}  {}",
            id,
            name,
            record.collection.len(),
            format_timestamp(record.last_draw_at)
        );
    }

    println!("\nTotal: {} users", ledger.len());
    Ok(())
}

fn cmd_show_user(store: &dyn LedgerStore, id: &str) -> Result<()> {
    let ledger = store.load()?;
    let record = ledger
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("No user with id '{}'", id))?;

    println!("User:      {} ({})", id, record.display_name);
    println!("Last draw: {}", format_timestamp(record.last_draw_at));
    println!("Fruits:    {}", record.collection.len());

    for rarity in Rarity::ALL {
        let items = record.items_of(rarity);
        if items.is_empty() {
            continue;
        }
        println!("\n{} ({})", rarity, items.len());
        for item in &items {
            let origin = match item.obtained {
                Some(_) => format!("drawn {}", format_timestamp(item.obtained)),
                None => "granted".to_string(),
            };
            println!("  - {} ({}) {}", item.name, item.kind, origin);
        }
    }

    Ok(())
}

fn cmd_export(store: &dyn LedgerStore, format: &str) -> Result<()> {
    if format != "json" {
        anyhow::bail!("Unsupported format '{}'. Only 'json' is supported.", format);
    }

    let ledger = store.load()?;
    let stats = ledger.stats();
    let export = serde_json::json!({
        "exported_at": Utc::now().to_rfc3339(),
        "store": store.describe(),
        "stats": stats,
        "users": ledger.users,
    });

    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}

fn cmd_import(store: &dyn LedgerStore, file: &str, dry_run: bool) -> Result<()> {
    let incoming: Ledger = read_ledger_strict(file)?;
    let stats = incoming.stats();

    if dry_run {
        println!("=== DRY RUN — nothing will be written ===\n");
        println!(
            "Would import {} users with {} fruits from {} into {}",
            stats.total_users,
            stats.total_items,
            file,
            store.describe()
        );
        return Ok(());
    }

    store.save_all(&incoming)?;
    println!(
        "Imported {} users with {} fruits into {}",
        stats.total_users,
        stats.total_items,
        store.describe()
    );
    Ok(())
}
