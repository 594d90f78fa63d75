use std::{sync::Arc, time::Duration};

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing::{info, warn};

use philosophers::{Names, Narrator, PickupOrder, Table, TableConfig};

/// Dining philosophers sharing a ring of forks
#[derive(Debug, Parser)]
#[command(name = "philosophers", version)]
struct Cli {
    /// Number of seats (and forks) around the table
    #[arg(short, long, default_value_t = 5)]
    seats: usize,

    /// Comma separated names, one per seat (default: A0, A1, ...)
    #[arg(short, long, value_delimiter = ',')]
    names: Vec<String>,

    /// Everyone picks up the left fork first (can deadlock)
    #[arg(long)]
    naive: bool,

    /// Hold the first fork until everyone holds one
    #[arg(long)]
    lockstep: bool,

    /// How long lockstep waits for stragglers, in milliseconds
    #[arg(long, default_value_t = 100)]
    grace_ms: u64,

    /// Give up waiting for a fork after this many milliseconds
    #[arg(long)]
    patience_ms: Option<u64>,

    /// Upper bound of the random thinking time, in milliseconds
    #[arg(long, default_value_t = 0)]
    think_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn table_config(&self) -> TableConfig {
        TableConfig {
            seats: self.seats,
            names: if self.names.is_empty() {
                Names::default()
            } else {
                Names::Listed(self.names.clone())
            },
            order: if self.naive {
                PickupOrder::LeftFirst
            } else {
                PickupOrder::Ranked
            },
            patience: self.patience_ms.map(Duration::from_millis),
            think_for: Duration::from_millis(self.think_ms),
            lockstep: self.lockstep.then(|| Duration::from_millis(self.grace_ms)),
        }
    }
}

// ログは stderr、哲学者の実況は stdout
fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = cli.table_config();
    if config.order == PickupOrder::LeftFirst && config.lockstep.is_some() && config.patience.is_none() {
        warn!("--naive --lockstep without --patience-ms will hang forever");
    }

    let table = Table::new(&config).wrap_err("failed to lay the table")?;
    info!(assignments = ?table.assignments(), "pickup order");

    table
        .run(Arc::new(Narrator))
        .wrap_err("dinner did not finish")?;
    println!("all philosophers are full");

    Ok(())
}
