//! Print the topology snapshot the reporting view is built from.

use clap::Parser;
use topomap::db::Db;
use topomap::report::{build_snapshot, ReportFilter};
use topomap::Config;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "topomap-report")]
#[command(about = "Print nodes, links and traffic aggregates as JSON")]
struct Args {
    /// Only count requests stored after this time (RFC 3339 or YYYY-MM-DD[ HH:MM:SS])
    #[arg(long)]
    from: Option<String>,

    /// Only count requests stored before this time
    #[arg(long)]
    to: Option<String>,

    /// Only show services registered in this namespace
    #[arg(short, long)]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "warn"),
    )
    .init();

    let args = Args::parse();
    let config = Config::load()?;
    let filter = ReportFilter::new(
        args.from.as_deref(),
        args.to.as_deref(),
        args.namespace.as_deref(),
    )?;

    let db = Db::new(config.db_path());
    let snapshot = db
        .with_connection(move |conn| build_snapshot(conn, &filter))
        .await?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
