use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use ibqueue::domain::{SchedulableItem, SharedItem, initialize_item};
use ibqueue::priority::format_sample;
use ibqueue::properties::parse_date;
use ibqueue::scheduler::{Clock, Scheduler, SystemClock};
use ibqueue::storage::{JsonlItemStore, PriorityUpdate, PriorityWriter, StoredItemRecord};
use log::info;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::{Config, parse_refs};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ibqueue")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("ibqueue.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Queue { date, refs } => handle_queue_command(date.as_deref(), refs.as_deref(), config).await,
        Commands::Next { refs } => handle_next_command(refs.as_deref(), config).await,
        Commands::Review { refs } => handle_review_command(refs.as_deref(), config).await,
        Commands::Init { id, due } => handle_init_command(id, due.as_deref(), config),
        Commands::Show { id } => handle_show_command(id, config),
        Commands::Reschedule { id, date } => handle_reschedule_command(id, date, config),
    }
}

fn open_store(config: &Config) -> Result<Arc<JsonlItemStore>> {
    let path = &config.storage.items_path;
    let store = JsonlItemStore::open(path).context(format!("Failed to open item store at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_scheduler(store: Arc<JsonlItemStore>, refs: Option<&str>, config: &Config) -> Scheduler {
    let refs = match refs {
        Some(r) => parse_refs(r),
        None => config.queue.selected_refs.clone(),
    };
    let known = &config.queue.subset_queries;
    for r in &refs {
        if !known.is_empty() && !known.contains(r) {
            log::warn!("Filter tag '{}' is not among the configured subset queries", r);
        }
    }

    Scheduler::new(store)
        .with_refs(refs)
        .with_refresh_threshold(config.queue.refresh_threshold_minutes)
        .with_query_timeout(Duration::from_millis(config.queue.query_timeout_ms))
}

fn parse_day(s: &str) -> Result<chrono::NaiveDate> {
    parse_date(s).ok_or_else(|| eyre!("Invalid date '{}', expected YYYY-MM-DD", s))
}

fn print_item(position: usize, item: &SchedulableItem) {
    let sample = item
        .sample
        .and_then(format_sample)
        .unwrap_or_else(|| "-".to_string());
    let priority = match item.beta {
        Some(beta) => beta.summary().to_string(),
        None => "Not set".red().to_string(),
    };
    let due = item.due.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
    println!(
        "{:>3}. {}  {} {}  {} {}  due {}",
        position,
        item.id.bold(),
        "S".cyan(),
        sample,
        "P".blue().bold(),
        priority,
        due
    );
}

fn print_items(items: &[SharedItem]) {
    if items.is_empty() {
        println!("{}", "Queue is empty.".dimmed());
        return;
    }
    for (i, item) in items.iter().enumerate() {
        print_item(i + 1, &item.snapshot());
    }
}

async fn handle_queue_command(date: Option<&str>, refs: Option<&str>, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let scheduler = build_scheduler(store.clone(), refs, config);
    let today = scheduler.today();
    let date = date.map(parse_day).transpose()?.unwrap_or(today);
    info!("Listing queue for {} (refs: {:?})", date, scheduler.refs());

    let items = if date == today {
        refresh_and_persist(&scheduler, &store).await?;
        scheduler.items()
    } else {
        println!("{} {}", "Preview:".yellow(), date);
        scheduler.preview(date).await.context("Failed to preview queue")?
    };

    print_items(&items);
    Ok(())
}

async fn handle_next_command(refs: Option<&str>, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let scheduler = build_scheduler(store.clone(), refs, config);

    refresh_and_persist(&scheduler, &store).await?;

    match scheduler.next() {
        Some(item) => {
            println!("{}", "Next:".green());
            print_item(1, &item.snapshot());
            println!("{} remaining", scheduler.len());
        }
        None => println!("{}", "Nothing due.".dimmed()),
    }
    Ok(())
}

async fn refresh_and_persist(scheduler: &Scheduler, store: &JsonlItemStore) -> Result<()> {
    let report = scheduler.refresh().await.context("Failed to refresh queue")?;
    report.persist(store).context("Failed to persist drawn samples")?;
    info!("Queue refreshed: {} items", report.queued);
    Ok(())
}

/// Review loop over one long-lived queue.
///
/// Enter marks the shown item reviewed and moves it to tomorrow, `q` quits.
/// The queue is refreshed from the store only once the configured refresh
/// threshold has passed.
async fn handle_review_command(refs: Option<&str>, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let scheduler = build_scheduler(store.clone(), refs, config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if scheduler.needs_refresh() {
            refresh_and_persist(&scheduler, &store).await?;
        }

        let Some(item) = scheduler.next() else {
            println!("{}", "Nothing due.".dimmed());
            return Ok(());
        };
        print_item(1, &item.snapshot());
        print!("{} remaining, [enter] reviewed, [q] quit: ", scheduler.len());
        std::io::stdout().flush()?;

        let answer = lines.next_line().await?;
        match answer.as_deref().map(str::trim) {
            None | Some("q") | Some("Q") => return Ok(()),
            _ => {}
        }

        let tomorrow = scheduler
            .today()
            .succ_opt()
            .ok_or_else(|| eyre!("No day after {}", scheduler.today()))?;
        store
            .persist_priority(&item.id(), &PriorityUpdate::due(tomorrow))
            .context(format!("Failed to reschedule {}", item.id()))?;
        item.set_due(Some(tomorrow));
        println!("{} {} -> {}", "Reviewed:".green(), item.id(), tomorrow);
    }
}

fn handle_init_command(id: &str, due: Option<&str>, config: &Config) -> Result<()> {
    info!("Initializing item: {}", id);
    let store = open_store(config)?;
    let due = due.map(parse_day).transpose()?;

    let mut record = store.get(id)?.unwrap_or_else(|| StoredItemRecord::new(id));
    let mut update = initialize_item(&record, config.priority.defaults(), due)?;
    if update.due.is_none() {
        update.due = Some(SystemClock.today());
    }
    record.apply(&update);
    store.upsert(record.clone())?;

    println!("{} {}", "Initialized:".green(), id);
    print_item(1, &SchedulableItem::from_record(&record));
    Ok(())
}

fn handle_show_command(id: &str, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let record = store.get(id)?.ok_or_else(|| eyre!("Item not found: {}", id))?;
    let item = SchedulableItem::from_record(&record);

    println!("{} {}", "Item:".green(), item.id.bold());
    match item.beta {
        Some(beta) => {
            println!("  a = {}, b = {}", beta.a(), beta.b());
            println!("  priority {}", beta.summary());
        }
        None => println!("  priority {}", "Not set".red()),
    }
    if let Some(sample) = item.sample.and_then(format_sample) {
        println!("  sample {}", sample);
    }
    match item.due {
        Some(due) => println!("  due {}", due),
        None => println!("  due -"),
    }
    if !item.refs.is_empty() {
        println!("  refs {}", item.refs.join(", "));
    }
    Ok(())
}

fn handle_reschedule_command(id: &str, date: &str, config: &Config) -> Result<()> {
    let date = parse_day(date)?;
    info!("Rescheduling {} to {}", id, date);
    let store = open_store(config)?;
    store.persist_priority(id, &PriorityUpdate::due(date))?;
    println!("{} {} -> {}", "Rescheduled:".green(), id, date);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
