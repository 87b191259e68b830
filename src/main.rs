use clap::Parser;
use topomap::db::{schema, Db};
use topomap::{Config, Processor};
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "topomap-processor")]
#[command(about = "Drain one batch of access logs into the service topology")]
struct Args {
    /// Override processor.batch_size for this run
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Create the store and its schema, then exit
    #[arg(long)]
    init: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read first so its log level can seed the logger
    let config = Config::load();
    let level = config
        .as_ref()
        .map(|c| c.processor.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", level),
    )
    .init();

    let config = config.map_err(|e| {
        log::error!("Unable to load configuration: {:#}", e);
        e
    })?;

    let batch_size = args.batch_size.unwrap_or(config.processor.batch_size);
    if batch_size == 0 {
        anyhow::bail!("--batch-size must be greater than 0");
    }

    let db = Db::new(config.db_path());
    if args.init {
        db.initialize()?;
        return Ok(());
    }

    log::info!(
        "Starting processor run as {} on {} (batch size {})",
        config.database.user,
        db.path().display(),
        batch_size
    );

    let summary = db
        .with_connection(move |conn| {
            schema::ensure_core_schema(conn)?;
            Processor::new(batch_size).run(conn)
        })
        .await
        .map_err(|e| {
            log::error!("Run aborted: {}", e);
            e
        })?;

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    }

    if summary.retained > 0 {
        log::warn!(
            "{} entries could not be quarantined and stay queued for the next run",
            summary.retained
        );
    }

    Ok(())
}
