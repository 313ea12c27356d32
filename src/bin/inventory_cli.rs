use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use inventory_ledger::{
    config::{self, AppConfig},
    errors::{ErrorResponse, ServiceError},
    events::{process_events, EventSender},
    forms::ProductForm,
    ledger::{self, LocalLedger},
    logging::{self, LoggerConfig, StockAudit},
    models::{LocalInventoryItem, LocalTransaction, TransactionType},
    store::FileKeyValueStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    let (event_sender, event_rx) = EventSender::channel(config.event_channel_capacity);
    let events = tokio::spawn(process_events(event_rx, config.low_stock_threshold));

    let json = cli.json;
    let outcome = {
        let ledger = open_ledger(&cli, &config)?.with_events(event_sender);
        run(cli.command, &ledger, json)
    };

    // the ledger held the last sender, so the loop drains and stops
    let stats = events.await.context("event loop panicked")?;
    debug!(?stats, "event loop finished");

    if let Err(err) = &outcome {
        if let Some(service_error) = err.downcast_ref::<ServiceError>().filter(|_| json) {
            print_json(&ErrorResponse::from(service_error))?;
        }
    }
    outcome
}

fn open_ledger(cli: &Cli, config: &AppConfig) -> Result<LocalLedger> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
    let store = FileKeyValueStore::open(&data_dir)
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;

    let audit_logger = if cli.audit {
        logging::setup_logger(LoggerConfig {
            use_color: !cli.json,
            ..LoggerConfig::default()
        })
    } else {
        logging::discard_logger()
    };

    Ok(LocalLedger::new(
        Arc::new(store),
        config.stock_policy,
        StockAudit::new(audit_logger, "local"),
    ))
}

fn run(command: Commands, ledger: &LocalLedger, json: bool) -> Result<()> {
    match command {
        Commands::Items(command) => handle_items_command(ledger, command, json),
        Commands::Stock(command) => handle_stock_command(ledger, command, json),
    }
}

#[derive(Parser)]
#[command(name = "inventory", about = "Track products and their stock movements", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(long, global = true, help = "Directory for local data (overrides config)")]
    data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Write the stock audit trail to stderr"
    )]
    audit: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Items(ItemsCommands),
    #[command(subcommand)]
    Stock(StockCommands),
}

#[derive(Subcommand)]
enum ItemsCommands {
    Add(ItemAddArgs),
    List,
    Show(ItemIdArgs),
    Edit(ItemEditArgs),
    Delete(ItemIdArgs),
}

#[derive(Args)]
struct ItemAddArgs {
    #[arg(long, help = "Product name")]
    name: String,
    #[arg(long, help = "Unit price, greater than zero")]
    price: String,
    #[arg(long, help = "Opening stock, zero or more")]
    stock: String,
    #[arg(long, default_value = "", help = "Product category")]
    category: String,
    #[arg(long, default_value = "", help = "Free-text description")]
    description: String,
    #[arg(long, help = "Path to a product picture")]
    image: Option<PathBuf>,
}

#[derive(Args)]
struct ItemEditArgs {
    id: Uuid,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, help = "Replace the product picture")]
    image: Option<PathBuf>,
}

#[derive(Args)]
struct ItemIdArgs {
    id: Uuid,
}

#[derive(Subcommand)]
enum StockCommands {
    /// Record incoming stock
    In(MovementArgs),
    /// Record outgoing stock
    Out(MovementArgs),
    /// Show an item's movements with the balance after each
    History(ItemIdArgs),
}

#[derive(Args)]
struct MovementArgs {
    id: Uuid,
    #[arg(help = "Units moved, greater than zero")]
    quantity: i64,
    #[arg(long, help = "When the movement happened (RFC 3339); defaults to now")]
    date: Option<DateTime<Utc>>,
}

fn read_image(path: Option<&PathBuf>) -> Result<Option<Vec<u8>>> {
    path.map(|p| fs::read(p).with_context(|| format!("failed to read image {}", p.display())))
        .transpose()
}

fn handle_items_command(ledger: &LocalLedger, command: ItemsCommands, json: bool) -> Result<()> {
    let catalog = ledger.catalog();
    match command {
        ItemsCommands::Add(args) => {
            let form = ProductForm {
                name: args.name,
                category: args.category,
                description: args.description,
                price: args.price,
                stock: args.stock,
                new_images: read_image(args.image.as_ref())?.into_iter().collect(),
                ..ProductForm::default()
            };
            let item = form.to_local_item()?;
            catalog.add(item.clone())?;
            if json {
                print_json(&item)?;
            } else {
                println!("Added item {}", item.id);
                render_item(&item);
            }
        }
        ItemsCommands::List => {
            let items = catalog.items()?;
            if json {
                print_json(&items)?;
            } else if items.is_empty() {
                println!("No items yet.");
            } else {
                println!("Items ({} total):", items.len());
                items.iter().for_each(render_item);
            }
        }
        ItemsCommands::Show(args) => {
            let item = catalog.get(&args.id)?;
            if json {
                print_json(&item)?;
            } else {
                render_item(&item);
                if !item.description.is_empty() {
                    println!("  {}", item.description);
                }
            }
        }
        ItemsCommands::Edit(args) => {
            let item = catalog.get(&args.id)?;
            let mut form = ProductForm::from_local(&item);
            if let Some(name) = args.name {
                form.name = name;
            }
            if let Some(price) = args.price {
                form.price = price;
            }
            if let Some(category) = args.category {
                form.category = category;
            }
            if let Some(description) = args.description {
                form.description = description;
            }
            if let Some(image) = read_image(args.image.as_ref())? {
                form.new_images = vec![image];
            }
            let updated = form.apply_to_local(&item)?;
            catalog.update(updated.clone())?;
            if json {
                print_json(&updated)?;
            } else {
                println!("Updated item {}", updated.id);
                render_item(&updated);
            }
        }
        ItemsCommands::Delete(args) => {
            if !catalog.delete(&args.id)? {
                return Err(anyhow!("item {} not found", args.id));
            }
            if json {
                print_json(&json!({ "deleted": args.id }))?;
            } else {
                println!("Deleted item {}", args.id);
            }
        }
    }
    Ok(())
}

fn handle_stock_command(ledger: &LocalLedger, command: StockCommands, json: bool) -> Result<()> {
    let (kind, args) = match command {
        StockCommands::In(args) => (TransactionType::Incoming, args),
        StockCommands::Out(args) => (TransactionType::Outgoing, args),
        StockCommands::History(args) => return render_history(ledger, &args.id, json),
    };

    let entry = ledger.record(&args.id, kind, args.quantity, args.date.unwrap_or_else(Utc::now))?;
    if json {
        print_json(&json!({
            "transaction": entry.transaction,
            "previousStock": entry.previous_stock,
            "newStock": entry.new_stock,
        }))?;
    } else {
        println!(
            "Recorded {} of {} for item {}: stock {} -> {}",
            kind, args.quantity, args.id, entry.previous_stock, entry.new_stock
        );
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryLine<'a> {
    #[serde(flatten)]
    transaction: &'a LocalTransaction,
    balance: i64,
}

fn render_history(ledger: &LocalLedger, id: &Uuid, json: bool) -> Result<()> {
    let item = ledger.catalog().get(id)?;
    let history = ledger.history(id)?;
    let opening = ledger::implied_opening_stock(item.stock, &history)?;
    let balances = ledger::running_balances(opening, &history)?;

    if json {
        let lines: Vec<HistoryLine<'_>> = history
            .iter()
            .zip(balances)
            .map(|(transaction, balance)| HistoryLine {
                transaction,
                balance,
            })
            .collect();
        return print_json(&json!({
            "item": item,
            "openingStock": opening,
            "transactions": lines,
        }));
    }

    render_item(&item);
    if history.is_empty() {
        println!("  no movements recorded");
        return Ok(());
    }
    println!("  opening stock {}", opening);
    for (tx, balance) in history.iter().zip(balances) {
        println!(
            "  {} {:>8} {:>6} -> {}",
            tx.date.format("%Y-%m-%d %H:%M"),
            tx.kind,
            tx.amount,
            balance
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_item(item: &LocalInventoryItem) {
    println!(
        "- Item {} • {} • {} • price {:.2} • stock {}",
        item.id, item.name, item.category, item.price, item.stock
    );
}
