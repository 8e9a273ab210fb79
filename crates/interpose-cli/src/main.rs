mod error;
mod interceptors;
mod ledger;
mod sales;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use interpose_core::app::{DispatcherBuilder, OrderingKind, Proxy, Settings};
use interpose_core::domain::MarkerKind;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;
use crate::interceptors::{
    Logged, LoggingInterceptor, Transactable, TransactionInterceptor, Validated, ValidationInterceptor,
};
use crate::ledger::{Ledger, TxHandle};
use crate::sales::{Sales, SalesService, method_table};

#[derive(Debug, Parser)]
#[command(name = "interpose", about = "Runs a small sales ledger through interceptors")]
struct Cli {
    /// Ordering of after hooks (overrides the settings file)
    #[arg(long)]
    ordering: Option<OrderingKind>,

    /// TOML settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Make every service call fail after staging its writes
    #[arg(long)]
    fail: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(ordering) = cli.ordering {
        settings.ordering = ordering;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings = load_settings(&cli)?;
    info!(ordering = %settings.ordering, ignore_unmapped = settings.ignore_unmapped, "settings loaded");

    let ledger = Arc::new(Ledger::with_catalog(
        ["widget", "gadget", "gizmo"],
        ["alice", "bob"],
    ));

    let dispatcher = DispatcherBuilder::new()
        .intercept::<Transactable, _, _>({
            let ledger = ledger.clone();
            move || TransactionInterceptor::new(ledger.clone())
        })?
        .intercept::<Logged, _, _>(LoggingInterceptor::default)?
        .intercept::<Validated, _, _>(|| ValidationInterceptor)?
        .settings(&settings)
        .expect_markers(&[
            MarkerKind::of::<Transactable>(),
            MarkerKind::of::<Logged>(),
            MarkerKind::of::<Validated>(),
        ])
        .build()?;

    let service = SalesService::new(ledger.clone(), cli.fail);
    let sales = Sales::new(Proxy::new(
        service,
        Arc::new(dispatcher),
        Arc::new(method_table()),
    ));

    match sales.create_sale("widget", "alice", &TxHandle::new()).await {
        Ok(sale) => info!(sale = %sale.id, "create_sale succeeded"),
        Err(err) => error!(error = %err, "create_sale failed"),
    }
    match sales.create_sale_async(" gadget ", "bob", &TxHandle::new()).await {
        Ok(sale) => info!(sale = %sale.id, "create_sale_async succeeded"),
        Err(err) => error!(error = %err, "create_sale_async failed"),
    }
    match sales.create_sale("gizmo", "", &TxHandle::new()).await {
        Ok(sale) => info!(sale = %sale.id, "create_sale succeeded"),
        Err(err) => error!(error = %err, "create_sale rejected"),
    }
    match sales.remove_last_sale_async(&TxHandle::new()).await {
        Ok(()) => info!("remove_last_sale_async succeeded"),
        Err(err) => error!(error = %err, "remove_last_sale_async failed"),
    }

    println!("{}", serde_json::to_string_pretty(&ledger.snapshot())?);
    Ok(())
}
