use analytics::{
    accounts_with_positions, build_snapshot, calculate_risk_metrics, generate_summary_report,
    low_balance_accounts, SummaryReport, LOW_BALANCE_THRESHOLD,
};
use api_client::{retry_with_backoff, AccountApi, TradovateClient};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::Config;
use core_types::{OrderAction, OrderSpec, OrderType};
use manager::{ConnectionReport, MultiAccountManager};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// The main entry point for the multi-account portfolio manager.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command-line arguments.
    let cli = Cli::parse();

    // Load and validate the account configuration before anything else.
    let config = configuration::load_config()?;

    match cli.command {
        // Quote streaming drives a single standalone session; it does not
        // need the registry.
        Commands::Quotes(args) => handle_quotes(args, config).await,
        command => {
            let mut manager = MultiAccountManager::new(&config.settings);
            manager.register_many(config.accounts.clone())?;

            let report = manager.connect_all().await;
            print_connection_summary(&report);

            if report.total > 0 && report.connected == 0 {
                anyhow::bail!("no accounts connected");
            }

            let result = match command {
                Commands::Status => handle_status(&manager).await,
                Commands::Analyze => handle_analyze(&manager).await,
                Commands::Monitor(args) => handle_monitor(&manager, args).await,
                Commands::Export(args) => handle_export(&manager, args).await,
                Commands::Balances => handle_balances(&manager).await,
                Commands::Order(args) => handle_order(&manager, args).await,
                Commands::Cancel(args) => handle_cancel(&manager, args).await,
                Commands::Quotes(_) => unreachable!("handled before connecting"),
            };

            manager.disconnect();
            result
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Manage balances, positions and orders across multiple Tradovate accounts.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a status dashboard for every connected account.
    Status,
    /// Run a full portfolio analysis with per-account risk metrics.
    Analyze,
    /// Poll all accounts on an interval, renewing tokens as needed.
    Monitor(MonitorArgs),
    /// Export a portfolio snapshot to a JSON file.
    Export(ExportArgs),
    /// Fetch each account's balance individually, retrying transient failures.
    Balances,
    /// Place an order on one account, or fan it out to all of them.
    Order(OrderArgs),
    /// Cancel a working order on one account.
    Cancel(CancelArgs),
    /// Stream real-time quotes over one account's market-data feed.
    Quotes(QuotesArgs),
}

#[derive(Parser)]
struct MonitorArgs {
    /// Seconds between polling iterations.
    #[arg(long, default_value_t = 60)]
    interval: u64,
}

#[derive(Parser)]
struct ExportArgs {
    /// Where to write the snapshot.
    #[arg(long, default_value = "portfolio-snapshot.json")]
    output: PathBuf,
}

#[derive(Parser)]
struct OrderArgs {
    /// Account to trade on; omit to place the order on every account.
    #[arg(long)]
    account: Option<String>,

    /// Buy or sell.
    #[arg(long, value_enum)]
    action: OrderAction,

    /// The contract symbol (e.g. "MESM4").
    #[arg(long)]
    symbol: String,

    /// Number of contracts.
    #[arg(long, default_value_t = 1)]
    qty: u32,

    /// Market, limit, stop or stop-limit.
    #[arg(long, value_enum, default_value = "market")]
    order_type: OrderType,

    /// Limit price; required for limit and stop-limit orders.
    #[arg(long)]
    price: Option<Decimal>,
}

#[derive(Parser)]
struct CancelArgs {
    /// The account the order lives on.
    #[arg(long)]
    account: String,

    /// The platform order id to cancel.
    #[arg(long)]
    order_id: i64,
}

#[derive(Parser)]
struct QuotesArgs {
    /// Account whose market-data feed to use; defaults to the first one.
    #[arg(long)]
    account: Option<String>,

    /// Contract symbols to subscribe to.
    #[arg(required = true)]
    symbols: Vec<String>,
}

// ==============================================================================
// Command Handlers
// ==============================================================================

fn print_connection_summary(report: &ConnectionReport) {
    println!("\n=== Connection Summary ===");
    println!("Total accounts: {}", report.total);
    println!("Connected: {}", report.connected);
    println!("Failed: {}", report.failed);
    for outcome in &report.outcomes {
        match outcome.error() {
            None => println!("  ✅ {}", outcome.account_name),
            Some(error) => println!("  ❌ {}: {}", outcome.account_name, error),
        }
    }
    println!();
}

/// Renders the per-account dashboard table.
async fn handle_status(manager: &MultiAccountManager) -> anyhow::Result<()> {
    let summaries = manager.get_all_accounts_summary().await;

    let mut table = Table::new();
    table.set_header(vec![
        "Account",
        "Account ID",
        "Balance",
        "Positions",
        "Orders",
        "Risk",
    ]);

    for summary in &summaries {
        let risk = calculate_risk_metrics(summary);
        table.add_row(vec![
            summary.account_name.clone(),
            summary
                .account_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format!("${:.2}", summary.cash_balance()),
            summary.positions.len().to_string(),
            summary.orders.len().to_string(),
            risk.risk_level.to_string(),
        ]);
    }

    println!("{table}");

    let total: Decimal = summaries.iter().map(|s| s.cash_balance()).sum();
    println!(
        "\nTotal balance across {} account(s): ${:.2}",
        summaries.len(),
        total
    );
    Ok(())
}

/// Full portfolio analysis: rollup report, per-account risk, and alerts.
async fn handle_analyze(manager: &MultiAccountManager) -> anyhow::Result<()> {
    let summaries = manager.get_all_accounts_summary().await;

    let report = generate_summary_report(&summaries);
    print_report(&report);

    println!("Detailed risk analysis:\n");
    for summary in &summaries {
        let metrics = calculate_risk_metrics(summary);
        println!("[{}]", summary.account_name);
        println!("  Balance: ${:.2}", metrics.balance);
        println!(
            "  Exposure: {} contracts ({:.2}%)",
            metrics.exposure, metrics.exposure_percent
        );
        println!("  Risk level: {}", metrics.risk_level);
        println!();
    }

    let low = low_balance_accounts(&summaries, LOW_BALANCE_THRESHOLD);
    if !low.is_empty() {
        println!("⚠️  Low balance alerts:");
        for summary in low {
            println!(
                "  - {}: ${:.2}",
                summary.account_name,
                summary.cash_balance()
            );
        }
        println!();
    }

    let active = accounts_with_positions(&summaries);
    if !active.is_empty() {
        println!("📈 Accounts with open positions:");
        for summary in active {
            println!(
                "  - {}: {} position(s)",
                summary.account_name,
                summary.positions.len()
            );
            for position in &summary.positions {
                println!(
                    "    • Contract {}: {} lots",
                    position.contract_id, position.net_pos
                );
            }
        }
    }

    Ok(())
}

fn print_report(report: &SummaryReport) {
    println!("\n=== Portfolio Summary Report ===");
    println!("Total accounts: {}", report.total_accounts);
    println!("Total balance: ${:.2}", report.total_balance);
    println!("Average balance: ${:.2}", report.average_balance);
    println!("Low balance accounts: {}", report.low_balance_accounts);
    println!("Open positions: {}", report.total_positions);
    println!("Active orders: {}", report.total_orders);
    println!(
        "Risk distribution: {} none / {} low / {} medium / {} high\n",
        report.risk_distribution.none,
        report.risk_distribution.low,
        report.risk_distribution.medium,
        report.risk_distribution.high
    );
}

/// Polls all accounts on a fixed interval until interrupted.
async fn handle_monitor(manager: &MultiAccountManager, args: MonitorArgs) -> anyhow::Result<()> {
    println!(
        "Starting monitoring loop (interval: {}s). Press Ctrl+C to stop.",
        args.interval
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    let mut iteration = 1u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping monitoring...");
                return Ok(());
            }
        }

        println!("\n{}", "=".repeat(60));
        println!("Monitoring iteration #{iteration}");

        // Expired tokens renew in place; failures are per-account.
        let renewals = manager.renew_all_tokens().await;
        for outcome in renewals.iter().filter(|o| !o.is_success()) {
            println!(
                "  ⚠️  {}: token renewal failed: {}",
                outcome.account_name,
                outcome.error().unwrap_or("unknown")
            );
        }

        let summaries = manager.get_all_accounts_summary().await;
        println!("\nQuick status:");
        for summary in &summaries {
            println!(
                "  {:<15}: ${:<12.2} | {} pos | {} orders",
                summary.account_name,
                summary.cash_balance(),
                summary.positions.len(),
                summary.orders.len()
            );
        }

        let low = low_balance_accounts(&summaries, LOW_BALANCE_THRESHOLD);
        if !low.is_empty() {
            println!("\n⚠️  {} account(s) with low balance!", low.len());
        }

        iteration += 1;
    }
}

/// Writes a point-in-time JSON snapshot of the whole portfolio.
async fn handle_export(manager: &MultiAccountManager, args: ExportArgs) -> anyhow::Result<()> {
    let summaries = manager.get_all_accounts_summary().await;
    let snapshot = build_snapshot(&summaries, chrono::Utc::now());

    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(&args.output, json)?;

    println!("✅ Portfolio snapshot exported to {}", args.output.display());
    Ok(())
}

/// Fetches each balance sequentially with exponential-backoff retries.
async fn handle_balances(manager: &MultiAccountManager) -> anyhow::Result<()> {
    println!("\n=== Per-account balances (with retry) ===\n");

    for name in manager.names() {
        let Some(api) = manager.get(&name) else {
            continue;
        };

        let result = retry_with_backoff(
            || {
                let api = api.clone();
                async move { api.balance().await }
            },
            3,
            Duration::from_secs(1),
        )
        .await;

        match result {
            Ok(balance) => println!("✅ {}: ${:.2}", name, balance.cash_balance),
            Err(error) => println!("❌ {}: failed after retries - {}", name, error),
        }
    }

    Ok(())
}

async fn handle_order(manager: &MultiAccountManager, args: OrderArgs) -> anyhow::Result<()> {
    let spec = OrderSpec {
        action: args.action,
        symbol: args.symbol.clone(),
        order_qty: args.qty,
        order_type: args.order_type,
        price: args.price,
    };

    match args.account {
        Some(account) => {
            let confirmation = manager.place_order(&account, &spec).await?;
            println!(
                "✅ {}: order placed{}",
                account,
                confirmation
                    .order_id
                    .map(|id| format!(" (id {id})"))
                    .unwrap_or_default()
            );
        }
        None => {
            let outcomes = manager.place_order_on_all(&spec).await;
            for outcome in outcomes {
                match outcome.result {
                    Ok(confirmation) => println!(
                        "✅ {}: order placed{}",
                        outcome.account_name,
                        confirmation
                            .order_id
                            .map(|id| format!(" (id {id})"))
                            .unwrap_or_default()
                    ),
                    Err(error) => println!("❌ {}: {}", outcome.account_name, error),
                }
            }
        }
    }

    Ok(())
}

async fn handle_cancel(manager: &MultiAccountManager, args: CancelArgs) -> anyhow::Result<()> {
    manager.cancel_order(&args.account, args.order_id).await?;
    println!("✅ {}: order {} cancelled", args.account, args.order_id);
    Ok(())
}

/// Streams quotes on a standalone session, outside the registry.
async fn handle_quotes(args: QuotesArgs, config: Config) -> anyhow::Result<()> {
    let account = match args.account {
        Some(name) => config
            .accounts
            .iter()
            .find(|a| a.account_name == name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("account '{}' is not configured", name))?,
        None => config
            .accounts
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no accounts configured"))?,
    };

    let client = TradovateClient::new(account, config.settings.demo);
    client.authenticate().await?;

    // Resolve the symbols up front so updates can be labelled by name.
    let mut contract_names: HashMap<i64, String> = HashMap::new();
    for symbol in &args.symbols {
        let contract = client.find_contract(symbol).await?;
        println!("📊 Subscribed to {} (contract id {})", contract.name, contract.id);
        contract_names.insert(contract.id, contract.name);
    }

    let stream = client.market_data().await?;
    let mut quotes = stream.subscribe_quotes(&args.symbols);

    println!("Streaming quotes. Press Ctrl+C to stop.\n");
    loop {
        tokio::select! {
            Some(quote) = quotes.recv() => {
                let label = contract_names
                    .get(&quote.contract_id)
                    .cloned()
                    .unwrap_or_else(|| quote.contract_id.to_string());
                println!(
                    "{}  bid {}  ask {}  last {}",
                    label,
                    fmt_price(quote.bid),
                    fmt_price(quote.ask),
                    fmt_price(quote.last)
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping stream...");
                return Ok(());
            }
            else => return Ok(()),
        }
    }
}

fn fmt_price(value: Option<Decimal>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}
