// ============================================================================
// pantryctl — CLI for the pantry vision backend
// ============================================================================
// Usage:
//   pantryctl inventory                     List the current inventory
//   pantryctl stats                         Show aggregate statistics
//   pantryctl override rice set 4           Correct an item count
//   pantryctl watch --seconds 60            Run the sync engine and print
//                                           snapshots as they change
// ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pantry_core::{
    ExportFormat, HttpGateway, InventoryGateway, InventoryItem, OverrideOp, OverrideRequest,
    PantryEngine, SyncConfig, TaskStatus,
};
use std::sync::Arc;
use std::time::Duration;

/// Pantry inventory sync and inspection tool
#[derive(Parser)]
#[command(name = "pantryctl", version, about = "Inspect and correct the pantry inventory")]
struct Cli {
    /// Backend base URL (default: PANTRY_API_URL or http://localhost:8000)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the current inventory
    Inventory,

    /// Show aggregate inventory statistics
    Stats,

    /// List items at or below the low-stock threshold
    LowStock {
        /// Defaults to the configured threshold
        #[arg(long)]
        threshold: Option<u32>,
    },

    /// List items not seen by a capture for a while
    Stale {
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Show the recent change timeline
    Changes {
        #[arg(long, default_value = "24")]
        hours: u32,
    },

    /// Correct an item count: set, add, or subtract
    Override {
        /// Canonical item name
        item: String,

        /// Operation: set, add, subtract
        operation: String,

        /// Amount (0-999)
        amount: u32,

        /// Note recorded with the correction
        #[arg(long)]
        notes: Option<String>,
    },

    /// List capture devices
    Devices,

    /// Show the health report for one device
    DeviceHealth { id: String },

    /// Delete a device
    DeleteDevice { id: String },

    /// List processing tasks
    Tasks {
        /// Filter by status: pending, started, success, failure
        #[arg(long)]
        status: Option<String>,
    },

    /// Export the full inventory
    Export {
        /// Output format: json or csv
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Run the sync engine and print snapshots as revisions change
    Watch {
        /// How long to watch before exiting
        #[arg(long, default_value = "60")]
        seconds: u64,
    },
}

fn parse_op(s: &str) -> Result<OverrideOp> {
    match s.to_lowercase().as_str() {
        "set" => Ok(OverrideOp::Set),
        "add" => Ok(OverrideOp::Add),
        "subtract" | "sub" => Ok(OverrideOp::Subtract),
        _ => anyhow::bail!("Unknown operation '{}'. Valid values: set, add, subtract", s),
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(TaskStatus::Pending),
        "started" => Ok(TaskStatus::Started),
        "success" => Ok(TaskStatus::Success),
        "failure" => Ok(TaskStatus::Failure),
        _ => anyhow::bail!(
            "Unknown status '{}'. Valid values: pending, started, success, failure",
            s
        ),
    }
}

fn parse_format(s: &str) -> Result<ExportFormat> {
    match s.to_lowercase().as_str() {
        "json" => Ok(ExportFormat::Json),
        "csv" => Ok(ExportFormat::Csv),
        _ => anyhow::bail!("Unsupported format '{}'. Valid values: json, csv", s),
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = SyncConfig::default();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    let gateway = HttpGateway::new(&config);

    match cli.command {
        Commands::Inventory => cmd_inventory(&gateway).await,
        Commands::Stats => cmd_stats(&gateway).await,
        Commands::LowStock { threshold } => {
            cmd_low_stock(&gateway, threshold.unwrap_or(config.low_stock_threshold)).await
        }
        Commands::Stale { days } => cmd_stale(&gateway, days).await,
        Commands::Changes { hours } => cmd_changes(&gateway, hours).await,
        Commands::Override {
            item,
            operation,
            amount,
            notes,
        } => cmd_override(config, item, &operation, amount, notes).await,
        Commands::Devices => cmd_devices(&gateway).await,
        Commands::DeviceHealth { id } => cmd_device_health(&gateway, &id).await,
        Commands::DeleteDevice { id } => cmd_delete_device(&gateway, &id).await,
        Commands::Tasks { status } => cmd_tasks(&gateway, status).await,
        Commands::Export { format } => cmd_export(&gateway, &format).await,
        Commands::Watch { seconds } => cmd_watch(config, seconds).await,
    }
}

fn print_items(items: &[InventoryItem]) {
    println!(
        "{:<24}  {:>5}  {:>6}  {:<8}  {:<22}  {}",
        "ITEM", "COUNT", "CONF", "TYPE", "LAST SEEN", "EXPIRY"
    );
    println!("{}", "-".repeat(90));
    for item in items {
        println!(
            "{:<24}  {:>5}  {:>5.0}%  {:<8}  {:<22}  {}",
            item.canonical_name,
            item.count_estimate,
            item.confidence * 100.0,
            format!("{:?}", item.package_type).to_lowercase(),
            format_timestamp(item.last_seen_at),
            item.expiry_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    println!("\nTotal: {} items", items.len());
}

async fn cmd_inventory(gateway: &HttpGateway) -> Result<()> {
    let mut items = gateway.fetch_items().await?;
    if items.is_empty() {
        println!("Inventory is empty.");
        return Ok(());
    }
    items.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
    print_items(&items);
    Ok(())
}

async fn cmd_stats(gateway: &HttpGateway) -> Result<()> {
    let stats = gateway.fetch_stats().await?;

    println!("=== Pantry Inventory Stats ===");
    println!("Items:        {} total", stats.total_items);
    println!("  in stock    {}", stats.items_in_stock);
    println!("  out         {}", stats.items_out_of_stock);
    println!("Quantity:     {}", stats.total_quantity);
    println!("Confidence:   {:.0}% average", stats.avg_confidence * 100.0);
    println!(
        "  high {} / medium {} / low {}",
        stats.confidence_breakdown.high,
        stats.confidence_breakdown.medium,
        stats.confidence_breakdown.low
    );
    Ok(())
}

async fn cmd_low_stock(gateway: &HttpGateway, threshold: u32) -> Result<()> {
    let items = gateway.fetch_low_stock(threshold).await?;
    if items.is_empty() {
        println!("No items at or below {} in stock.", threshold);
        return Ok(());
    }
    print_items(&items);
    Ok(())
}

async fn cmd_stale(gateway: &HttpGateway, days: u32) -> Result<()> {
    let items = gateway.fetch_stale(days).await?;
    if items.is_empty() {
        println!("No items unseen for more than {} days.", days);
        return Ok(());
    }
    print_items(&items);
    Ok(())
}

async fn cmd_changes(gateway: &HttpGateway, hours: u32) -> Result<()> {
    let changes = gateway.fetch_recent_changes(hours).await?;
    if changes.is_empty() {
        println!("No changes in the last {} hours.", hours);
        return Ok(());
    }

    println!(
        "{:<22}  {:<24}  {:<16}  {:>6}  {}",
        "TIMESTAMP", "ITEM", "EVENT", "DELTA", "DETAILS"
    );
    println!("{}", "-".repeat(90));
    for change in &changes {
        println!(
            "{:<22}  {:<24}  {:<16}  {:>+6}  {}",
            format_timestamp(Some(change.timestamp)),
            change.item_name.as_deref().unwrap_or("-"),
            change.event_type,
            change.delta,
            change.details.as_deref().unwrap_or("-"),
        );
    }
    println!("\nTotal: {} changes", changes.len());
    Ok(())
}

async fn cmd_override(
    config: SyncConfig,
    item: String,
    operation: &str,
    amount: u32,
    notes: Option<String>,
) -> Result<()> {
    let operation = parse_op(operation)?;
    // The engine resolves add / subtract against the backend's current
    // count and confirms the correction with a follow-up fetch.
    let engine = PantryEngine::new(config);
    engine.force_refresh().await?;
    let resolved = engine
        .apply_override(&OverrideRequest {
            item_name: item.clone(),
            operation,
            amount,
            notes,
        })
        .await?;
    println!("{} {} -> count {}", operation, item, resolved);
    Ok(())
}

async fn cmd_devices(gateway: &HttpGateway) -> Result<()> {
    let devices = gateway.fetch_devices().await?;
    if devices.is_empty() {
        println!("No devices registered.");
        return Ok(());
    }

    println!(
        "{:<20}  {:<20}  {:<10}  {:>5}  {:>6}  {:<22}  {}",
        "DEVICE ID", "NAME", "STATUS", "BATT", "RSSI", "LAST SEEN", "CAPTURES"
    );
    println!("{}", "-".repeat(110));
    for device in &devices {
        println!(
            "{:<20}  {:<20}  {:<10}  {:>4}%  {:>6}  {:<22}  {}",
            device.id,
            device.name,
            format!("{:?}", device.status).to_lowercase(),
            device
                .battery_pct
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            device
                .rssi
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format_timestamp(device.last_seen_at),
            device.capture_count,
        );
    }
    println!("\nTotal: {} devices", devices.len());
    Ok(())
}

async fn cmd_device_health(gateway: &HttpGateway, id: &str) -> Result<()> {
    let health = gateway.fetch_device_health(id).await?;

    println!("=== Device Health: {} ===", id);
    println!(
        "Battery:     {}{}",
        health
            .battery_pct
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "-".to_string()),
        health
            .battery_v
            .map(|v| format!(" ({:.2} V)", v))
            .unwrap_or_default()
    );
    println!(
        "Signal:      {}",
        health
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Captures:    {} in 7d, {} in 24h",
        health.captures_7d, health.captures_24h
    );
    println!(
        "Success:     {:.0}% 7d, {:.0}% 24h",
        health.success_rate_7d * 100.0,
        health.success_rate_24h * 100.0
    );
    println!("Healthy:     {}", if health.is_healthy { "yes" } else { "no" });
    Ok(())
}

async fn cmd_delete_device(gateway: &HttpGateway, id: &str) -> Result<()> {
    gateway.delete_device(id).await?;
    println!("Deleted device {}", id);
    Ok(())
}

async fn cmd_tasks(gateway: &HttpGateway, status_filter: Option<String>) -> Result<()> {
    let filter = status_filter.as_deref().map(parse_task_status).transpose()?;
    let tasks = gateway.fetch_tasks().await?;
    let tasks: Vec<_> = tasks
        .into_iter()
        .filter(|t| filter.map_or(true, |f| t.status == f))
        .collect();

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:<22}  {}",
        "TASK ID", "STATUS", "CREATED AT", "NAME"
    );
    println!("{}", "-".repeat(90));
    for task in &tasks {
        println!(
            "{:<36}  {:<10}  {:<22}  {}",
            task.id,
            format!("{:?}", task.status).to_lowercase(),
            format_timestamp(task.created_at),
            task.name,
        );
    }
    println!("\nTotal: {} tasks", tasks.len());
    Ok(())
}

async fn cmd_export(gateway: &HttpGateway, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let body = gateway.export_inventory(format).await?;
    println!("{}", body);
    Ok(())
}

async fn cmd_watch(config: SyncConfig, seconds: u64) -> Result<()> {
    let engine = PantryEngine::new(config);
    let state = Arc::clone(engine.state());
    let mut revision = state.inventory.subscribe();
    engine.start();

    println!("Watching inventory for {} seconds (Ctrl-C to stop)...\n", seconds);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => break,
            changed = revision.changed() => {
                if changed.is_err() {
                    break;
                }
                let rev = *revision.borrow_and_update();
                let derived = state.inventory.derived().await;
                let snapshot = &derived.snapshot;
                println!(
                    "[rev {}] {} items, {} low stock, {} expiring soon, {} stale, avg confidence {:.0}%",
                    rev,
                    snapshot.total_items,
                    derived.low_stock.len(),
                    derived.expiring_soon.len(),
                    derived.stale.len(),
                    snapshot.avg_confidence * 100.0,
                );
            }
        }
    }

    engine.stop();
    Ok(())
}
