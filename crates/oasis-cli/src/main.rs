//! oasisctl - operator access to the booking data service
//!
//! Each subcommand calls one data service operation and prints the result
//! as JSON on stdout. Logs go to stderr.

mod cli;

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::info;

use oasis_config::AppConfig;
use oasis_data::{CountryClient, DataService, Lookup};
use oasis_db::{DbClient, PoolSettings};
use oasis_obs::LogFormat;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_path(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    let format: LogFormat = config
        .log_format()
        .parse()
        .map_err(|e: String| anyhow!(e))
        .context("Invalid [log] format")?;
    oasis_obs::init("oasisctl", format);

    let backend = Backend::new(&config);
    let result = run(&cli.command, &backend, cli.compact).await;
    backend.close().await;
    result
}

/// Database connection opened on first use
struct Backend<'a> {
    config: &'a AppConfig,
    db: OnceCell<DbClient>,
}

impl<'a> Backend<'a> {
    fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    async fn db(&self) -> Result<&DbClient> {
        self.db.get_or_try_init(|| connect(self.config)).await
    }

    async fn service(&self) -> Result<DataService> {
        let db = self.db().await?;
        Ok(DataService::new(Arc::new(db.clone())))
    }

    async fn close(self) {
        if let Some(db) = self.db.into_inner() {
            db.close().await;
        }
    }
}

async fn connect(config: &AppConfig) -> Result<DbClient> {
    let database_url = config.database_url()?;
    let settings = PoolSettings {
        max_connections: config.max_connections(),
        acquire_timeout: config.acquire_timeout(),
    };
    DbClient::connect(&database_url, settings)
        .await
        .context("Failed to connect to database")
}

async fn run(command: &Command, backend: &Backend<'_>, compact: bool) -> Result<()> {
    match command {
        Command::Cabins => print(&backend.service().await?.get_cabins().await?, compact),
        Command::Cabin { id } => {
            print_lookup(backend.service().await?.get_cabin(*id).await, compact)
        }
        Command::CabinPrice { id } => {
            print_lookup(backend.service().await?.get_cabin_price(*id).await, compact)
        }
        Command::Guest { email } => {
            print_lookup(backend.service().await?.get_guest(email).await, compact)
        }
        Command::Booking { id } => {
            print(&backend.service().await?.get_booking(*id).await?, compact)
        }
        Command::Bookings { guest_id } => {
            print(&backend.service().await?.get_bookings(*guest_id).await?, compact)
        }
        Command::BookedDates { cabin_id, as_of } => {
            let service = backend.service().await?;
            let dates = match as_of {
                Some(today) => service.booked_dates_as_of(*cabin_id, *today).await?,
                None => service.get_booked_dates_by_cabin_id(*cabin_id).await?,
            };
            print(&dates, compact)
        }
        Command::Settings => print(&backend.service().await?.get_settings().await?, compact),
        Command::Countries => {
            let url = backend.config.countries_url()?;
            let countries = CountryClient::new(url.as_str()).fetch_countries().await?;
            print(&countries, compact)
        }
        Command::DeleteBooking { id } => {
            print(&backend.service().await?.delete_booking(*id).await?, compact)
        }
        Command::Check => {
            let db = backend.db().await?;
            db.ping().await.context("Database ping failed")?;
            db.check_schema().await.context("Schema check failed")?;
            info!("Database connection and schema verified");
            print(&serde_json::json!({ "ok": true }), compact)
        }
    }
}

/// Found records print as JSON, absence prints `null`
fn print_lookup<T: Serialize>(lookup: Lookup<T>, compact: bool) -> Result<()> {
    match lookup {
        Lookup::Found(record) => print(&record, compact),
        Lookup::NotFound => print(&serde_json::Value::Null, compact),
        Lookup::Fault => bail!("Lookup failed; see logs"),
    }
}

fn print<T: Serialize + ?Sized>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{json}");
    Ok(())
}
