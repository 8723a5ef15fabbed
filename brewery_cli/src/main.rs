use brewery_core::sales::parse_date;
use brewery_core::*;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "brewplan")]
#[command(about = "Brewery production planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, global = true, value_parser = parse_timestamp)]
    at: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show batches, tanks, pending orders and stock (default)
    Status,

    /// List beer types and their demand models
    Beers,

    /// Show the sales forecast for a beer
    Forecast {
        /// Beer name
        beer: String,

        /// First day to show (defaults to the first forecast day)
        #[arg(long, value_parser = parse_day)]
        from: Option<NaiveDate>,

        /// Range to show: week, month or a number of days
        #[arg(long, default_value = "week", conflicts_with = "days")]
        span: RangeSpan,

        /// Number of days to show
        #[arg(long)]
        days: Option<u32>,
    },

    /// Show recorded daily sales for a beer
    History {
        /// Beer name
        beer: String,

        /// Number of most recent days to show
        #[arg(long, default_value_t = 14)]
        days: u32,
    },

    /// Show what the advisor recommends
    Suggest,

    /// Start the batch the advisor recommends
    Start,

    /// Manage batches
    #[command(subcommand)]
    Batch(BatchCommands),

    /// Manage orders
    #[command(subcommand)]
    Order(OrderCommands),

    /// Import a sales CSV and refit demand models
    Import {
        /// CSV file with date, beer and quantity columns
        path: PathBuf,
    },

    /// Show the audit log
    Log {
        /// Only show the last N entries
        #[arg(long)]
        tail: Option<usize>,
    },
}

#[derive(Subcommand)]
enum BatchCommands {
    /// Queue a new batch
    Add {
        beer: String,
        /// Volume in litres
        volume: u32,
    },

    /// Move a batch to its next stage
    Advance {
        /// Batch id or unique prefix
        id: String,

        /// Tank to move into
        #[arg(long)]
        tank: Option<String>,

        /// Advance even if the batch is not due yet
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Record a customer order
    Add {
        beer: String,
        bottles: u32,
        /// Due date (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long, value_parser = parse_day)]
        due: NaiveDate,
    },

    /// Deliver a pending order from stock
    Deliver {
        /// Order id or unique prefix
        id: String,
    },

    /// Cancel a pending order
    Cancel {
        /// Order id or unique prefix
        id: String,
    },
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {:?}: {}", value, e))
}

fn parse_day(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("invalid date {:?}", value))
}

fn main() -> ExitCode {
    // Initialize logging
    brewery_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let errors = get_default_catalog().validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Config("invalid default catalog".into()));
    }

    // Determine data directory
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let now = cli.at.unwrap_or_else(Utc::now);
    tracing::debug!("Using data directory {:?} at {}", data_dir, now);

    let mut ws = Workspace::open(data_dir, config)?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => cmd_status(&ws, now),
        Commands::Beers => cmd_beers(&ws),
        Commands::Forecast {
            beer,
            from,
            span,
            days,
        } => {
            let span = days.map(RangeSpan::Days).unwrap_or(span);
            cmd_forecast(&ws, &beer, from, span, now)
        }
        Commands::History { beer, days } => cmd_history(&ws, &beer, days),
        Commands::Suggest => cmd_suggest(&ws, now),
        Commands::Start => cmd_start(&mut ws, now),
        Commands::Batch(BatchCommands::Add { beer, volume }) => {
            let id = ws.add_batch(&beer, volume, now)?;
            let batch = ws
                .brewery()
                .batch(id)
                .ok_or_else(|| Error::NotFound {
                    entity: "Batch",
                    id: id.to_string(),
                })?;
            println!(
                "✓ Added batch {}: {}L of {} ({})",
                batch.short_id(),
                volume,
                beer,
                batch.stage
            );
            Ok(())
        }
        Commands::Batch(BatchCommands::Advance { id, tank, force }) => {
            let transition = if force {
                ws.advance_batch(&id, tank.as_deref(), now)?
            } else {
                ws.execute_advance(&id, tank.as_deref(), now)?
            };
            print_transition(&transition);
            Ok(())
        }
        Commands::Order(OrderCommands::Add { beer, bottles, due }) => {
            let id = ws.add_order(&beer, bottles, due, now)?;
            println!(
                "✓ Order {} recorded: {} bottles of {} due {}",
                &id.simple().to_string()[..8],
                bottles,
                beer,
                due
            );
            Ok(())
        }
        Commands::Order(OrderCommands::Deliver { id }) => {
            let delivery = ws.deliver_order(&id, now)?;
            println!(
                "✓ Delivered {} bottles of {} ({} left in stock)",
                delivery.bottles, delivery.beer, delivery.remaining
            );
            Ok(())
        }
        Commands::Order(OrderCommands::Cancel { id }) => {
            let order = ws.cancel_order(&id, now)?;
            println!(
                "✓ Cancelled order {} for {} bottles of {}",
                order.short_id(),
                order.bottles,
                order.beer
            );
            Ok(())
        }
        Commands::Import { path } => {
            let report = ws.import_sales(&path, now)?;
            println!(
                "✓ Imported {} sales rows for {} beers",
                report.rows,
                report.beers.len()
            );
            for name in &report.beers {
                if let Some(beer) = ws.brewery().beer(name) {
                    println!(
                        "  {}: {:.1} bottles/day, {:+.3}%/day",
                        beer.name,
                        beer.base_sales,
                        beer.growth_rate * 100.0
                    );
                }
            }
            Ok(())
        }
        Commands::Log { tail } => cmd_log(&ws, tail),
    }
}

fn cmd_status(ws: &Workspace, now: DateTime<Utc>) -> Result<()> {
    let snapshot = ws.snapshot(now);

    println!("Batches");
    if snapshot.batches.is_empty() {
        println!("  (none)");
    }
    for view in &snapshot.batches {
        let batch = &view.batch;
        println!(
            "  {}  {:<20} {:>5}L  {:<12} {:<10} {}",
            batch.short_id(),
            batch.beer,
            batch.volume,
            batch.stage.as_str(),
            batch.tank.as_deref().unwrap_or("-"),
            format_elapsed(view.elapsed)
        );
    }

    println!();
    println!("Tanks");
    for tank in &snapshot.tanks {
        let occupant = tank
            .occupant
            .and_then(|id| ws.brewery().batch(id))
            .map(|b| format!("{} ({})", b.beer, b.short_id()))
            .unwrap_or_else(|| "free".to_string());
        println!(
            "  {:<10} {:>5}L  {:<12} {}",
            tank.name,
            tank.capacity,
            format!("{:?}", tank.function).to_lowercase(),
            occupant
        );
    }

    println!();
    println!("Pending orders");
    if snapshot.pending_orders.is_empty() {
        println!("  (none)");
    }
    for order in &snapshot.pending_orders {
        println!(
            "  {}  {:<20} {:>5} bottles  due {}",
            order.short_id(),
            order.beer,
            order.bottles,
            order.due
        );
    }

    println!();
    println!("Inventory");
    if snapshot.inventory.is_empty() {
        println!("  (none)");
    }
    for (beer, bottles) in &snapshot.inventory {
        println!("  {:<20} {:>6} bottles", beer, bottles);
    }

    Ok(())
}

fn cmd_beers(ws: &Workspace) -> Result<()> {
    for beer in ws.brewery().beers() {
        let anchor = beer
            .anchor_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no sales".to_string());
        let recorded = ws.sales().get(&beer.name).map_or(0, |series| series.len());
        println!(
            "  {:<20} {:>8.1} bottles/day  {:+.3}%/day  anchored {}  ({} days recorded)",
            beer.name,
            beer.base_sales,
            beer.growth_rate * 100.0,
            anchor,
            recorded
        );
    }
    Ok(())
}

fn cmd_forecast(
    ws: &Workspace,
    beer: &str,
    from: Option<NaiveDate>,
    span: RangeSpan,
    now: DateTime<Utc>,
) -> Result<()> {
    let forecast = ws.forecast(beer, now.date_naive())?;
    let from = from.unwrap_or_else(|| forecast.first_date());
    let points = forecast.range(from, span)?;

    println!("Forecast for {} (bottles/day)", beer);
    for point in &points {
        println!("  {}  day {:>3}  {:>10.1}", point.date, point.day, point.value);
    }
    let total: f64 = points.iter().map(|p| p.value).sum();
    println!("  total {:.0} bottles over {} days", total, points.len());
    Ok(())
}

fn cmd_history(ws: &Workspace, beer: &str, days: u32) -> Result<()> {
    let series = ws.sales().get(beer).ok_or_else(|| {
        let known: Vec<&str> = ws.sales().beers().collect();
        tracing::debug!("Sales history covers: {:?}", known);
        Error::NotFound {
            entity: "Sales history",
            id: if known.is_empty() {
                format!("{} (no sales imported yet)", beer)
            } else {
                format!("{} (have: {})", beer, known.join(", "))
            },
        }
    })?;

    let shown = (days.max(1) as usize).min(series.len());
    let first = series.end() - chrono::Duration::days(shown as i64 - 1);

    println!("Sales of {} (bottles/day)", beer);
    let mut total = 0u64;
    for date in first.iter_days().take(shown) {
        let sold = series.on(date).unwrap_or(0);
        total += u64::from(sold);
        println!("  {}  {:>8}", date, sold);
    }
    println!("  total {} bottles over {} days", total, shown);
    Ok(())
}

fn cmd_suggest(ws: &Workspace, now: DateTime<Utc>) -> Result<()> {
    let refresh = ws.refresh(now);
    let suggestions = &refresh.suggestions;

    if suggestions.start.is_none() && suggestions.advances.is_empty() {
        println!("Nothing to do right now.");
        return Ok(());
    }

    if let Some(start) = &suggestions.start {
        println!(
            "Start {}L of {}: {:.0} bottles unmet over {} days from {}",
            start.volume, start.beer, start.demand, start.window_days, start.window_start
        );
    }

    for advance in &suggestions.advances {
        let short = &advance.batch.simple().to_string()[..8];
        let action = match &advance.action {
            AdvanceAction::Auto => String::new(),
            AdvanceAction::ChooseTank(tanks) => format!(" into one of: {}", tanks.join(", ")),
            AdvanceAction::Blocked => " (blocked: no free tank)".to_string(),
        };
        println!(
            "Move {} ({}) from {} to {} after {}{}",
            advance.beer,
            short,
            advance.from,
            advance.to,
            format_elapsed(advance.elapsed),
            action
        );
    }
    Ok(())
}

fn cmd_start(ws: &mut Workspace, now: DateTime<Utc>) -> Result<()> {
    let id = ws.execute_start(now)?;
    if let Some(batch) = ws.brewery().batch(id) {
        println!(
            "✓ Started batch {}: {}L of {} ({})",
            batch.short_id(),
            batch.volume,
            batch.beer,
            batch.stage
        );
    }
    Ok(())
}

fn cmd_log(ws: &Workspace, tail: Option<usize>) -> Result<()> {
    let entries = ws.audit_entries()?;
    let skip = tail.map_or(0, |n| entries.len().saturating_sub(n));
    for entry in &entries[skip..] {
        println!("{}", entry);
    }
    Ok(())
}

fn print_transition(transition: &Transition) {
    println!(
        "✓ {} moved from {} to {}",
        transition.beer, transition.from, transition.to
    );
    if let Some(tank) = &transition.released {
        println!("  released {}", tank);
    }
    if let Some(tank) = &transition.assigned {
        println!("  now in {}", tank);
    }
    if let Some(bottles) = transition.bottles {
        println!("  {} bottles added to inventory", bottles);
    }
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let hours = elapsed.num_hours();
    if hours >= 48 {
        format!("{}d {}h", hours / 24, hours % 24)
    } else {
        format!("{}h {}m", hours, elapsed.num_minutes() % 60)
    }
}
