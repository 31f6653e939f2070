use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trace_mint::domain::scope::CompanyScope;
use trace_mint::utils::{logger, validation::Validate};
use trace_mint::{
    Cli, Command, InspectionItemPatch, InspectionOrchestrator, MemoryStore, MintRequestInput,
    MintRequestService, TraceConfig, TraceError,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<TraceError>() {
            Some(trace) => {
                tracing::error!(category = ?trace.category(), "{trace}");
                eprintln!("❌ {trace}");
                eprintln!("💡 {}", trace.recovery_suggestion());
                std::process::exit(if trace.is_retryable() { 2 } else { 1 });
            }
            None => {
                eprintln!("❌ {e:#}");
                std::process::exit(1);
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => TraceConfig::from_file(path)
            .with_context(|| format!("failed to load config file '{path}'"))?,
        None => TraceConfig::default(),
    };
    if let Some(snapshot) = &cli.snapshot {
        config.store.snapshot_path = snapshot.clone();
    }
    config.validate()?;

    if config.logging.json {
        logger::init_json_logger(&config.logging.level);
    } else {
        logger::init_cli_logger(cli.verbose, &config.logging.level);
    }
    tracing::debug!(?config, "configuration loaded");

    let snapshot_path = config.store.snapshot_path.clone();
    let store = Arc::new(MemoryStore::load_file(&snapshot_path).await?);
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping before the next write");
            ctrl_c.cancel();
        }
    });

    let orchestrator = InspectionOrchestrator::new(store.clone(), store.clone(), store.clone())
        .with_sync_policy(config.sync_policy());

    // Keep whatever was committed even when the command fails part way.
    let outcome = execute(&cli.command, &orchestrator, &store, &cancel).await;
    store.save_file(&snapshot_path).await?;
    let output = outcome?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn execute(
    command: &Command,
    orchestrator: &InspectionOrchestrator<MemoryStore, MemoryStore, MemoryStore>,
    store: &Arc<MemoryStore>,
    cancel: &CancellationToken,
) -> trace_mint::Result<serde_json::Value> {
    let output = match command {
        Command::Show { production_id } => {
            serde_json::to_value(orchestrator.get_batch(production_id).await?)?
        }
        Command::UpdateItem {
            production_id,
            product_id,
            result,
            inspected_by,
            inspected_at,
            status,
        } => {
            let patch = InspectionItemPatch {
                result: result.clone(),
                inspected_by: inspected_by.clone(),
                inspected_at: *inspected_at,
                status: status.clone(),
            };
            let batch = orchestrator
                .update_item(production_id, product_id, patch, cancel)
                .await?;
            serde_json::to_value(batch)?
        }
        Command::Complete {
            production_id,
            by,
            at,
        } => {
            let at = at.unwrap_or_else(Utc::now);
            let batch = orchestrator
                .complete_batch(production_id, by, at, cancel)
                .await?;
            serde_json::to_value(batch)?
        }
        Command::Resync { production_id } => {
            let synced = orchestrator.resync_products(production_id, cancel).await?;
            serde_json::json!({ "productionID": production_id, "synced": synced })
        }
        Command::RequestMint {
            company,
            scope,
            production,
            brand,
            blueprint,
            by,
        } => {
            let scope = if scope.is_empty() {
                CompanyScope::new(company, [production])?
            } else {
                CompanyScope::new(company, scope)?
            };
            let service =
                MintRequestService::new(store.clone(), store.clone(), store.clone(), store.clone());
            let outcome = service
                .request_mint(
                    &scope,
                    MintRequestInput {
                        production_id: production.clone(),
                        brand_id: brand.clone(),
                        token_blueprint_id: blueprint.clone(),
                        created_by: by.clone(),
                        created_at: Some(Utc::now()),
                        scheduled_burn_date: None,
                    },
                )
                .await?;
            if !outcome.requested_flag_set {
                tracing::warn!("batch was not flagged as requested; reconcile before the next request");
            }
            serde_json::json!({
                "mint": outcome.mint,
                "requestedFlagSet": outcome.requested_flag_set,
            })
        }
    };
    Ok(output)
}
