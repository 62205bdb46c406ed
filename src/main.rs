mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apontamento::checklist::{ChecklistAnswers, ChecklistService, ChecklistStrategy, ChecklistValidator, QuestionCatalog};
use apontamento::config::{AppConfig, Backend};
use apontamento::error::EngineError;
use apontamento::fetch::PaginatedFetcher;
use apontamento::registration::{RegistrationService, plant_offset};
use apontamento::scan::{ScanOutcome, ScanSession, handle_input};
use apontamento::store::{MemoryStore, Store, SupabaseStore};
use apontamento::ui::{Loading, Printer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "apontamento=debug"
    } else {
        "apontamento=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(operator) = cli.operator {
        config.operator = operator;
    }

    match config.backend(cli.offline)? {
        Backend::Memory => {
            warn!("running with in-memory store, nothing is persisted after exit");
            run(cli.command, &config, Arc::new(MemoryStore::new())).await
        }
        Backend::Supabase => {
            let store = SupabaseStore::new(
                &config.supabase_url,
                config.supabase_key.clone(),
                config.request_timeout(),
            )?
            .with_page_order(config.page_order_column.clone());
            info!(url = %config.supabase_url, "using Supabase store");
            run(cli.command, &config, Arc::new(store)).await
        }
    }
}

async fn run<S: Store>(command: Command, config: &AppConfig, store: Arc<S>) -> Result<()> {
    let offset = plant_offset(config.utc_offset_hours);
    let fetcher = PaginatedFetcher::new(config.page_size);
    let registrations = Arc::new(
        RegistrationService::builder(store.clone())
            .table(config.tables.registrations.clone())
            .policy(config.duplicate_policy)
            .cache_ttl(config.recent_cache_ttl())
            .recent_limit(config.recent_limit)
            .utc_offset(offset)
            .fetcher(fetcher)
            .build(),
    );
    let printer = Printer::new(offset);

    match command {
        Command::Scan => {
            let mut session = ScanSession::new(config.operator.clone());
            info!(session = session.id(), operator = session.operator(), policy = %config.duplicate_policy, "scan session started");
            printer.session(&session);

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let outcome = handle_input(&mut session, &line, &registrations).await;
                if matches!(outcome, ScanOutcome::NoInput) {
                    continue;
                }
                printer.outcome(&outcome);
                printer.session(&session);
            }
        }
        Command::Recent { limit } => {
            let loading = Loading::start("Carregando apontamentos...");
            let rows = registrations.latest(limit).await;
            loading.finish();
            printer.recent(&rows?);
        }
        Command::Today => {
            let loading = Loading::start("Carregando apontamentos de hoje...");
            let summary = registrations.summary_today().await;
            loading.finish();
            printer.summary(&summary?);
        }
        Command::Pending => {
            let checklists = checklist_service(config, store, registrations, fetcher);
            let loading = Loading::start("Carregando séries disponíveis...");
            let pending = checklists.pending_inspections().await;
            loading.finish();
            printer.pending(&pending?);
        }
        Command::Checklist {
            serial,
            statuses,
            observations,
            work_order,
        } => {
            let checklists = checklist_service(config, store, registrations, fetcher);
            let answers = ChecklistAnswers {
                statuses: statuses.into_iter().collect(),
                observations: observations.into_iter().collect(),
            };
            let loading = Loading::start("Salvando checklist...");
            let result = checklists
                .submit(&serial, &answers, &config.operator, work_order)
                .await;
            loading.finish();
            match result {
                Ok(checklist) => printer.checklist_saved(&checklist),
                Err(e) => {
                    printer.error(&e);
                    if matches!(
                        e,
                        EngineError::Incomplete { .. } | EngineError::MissingObservation { .. }
                    ) {
                        let validator = checklists.validator();
                        printer.questions(validator.catalog(), |i| validator.is_mandatory(i));
                    }
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

fn checklist_service<S: Store>(
    config: &AppConfig,
    store: Arc<S>,
    registrations: Arc<RegistrationService<S>>,
    fetcher: PaginatedFetcher,
) -> ChecklistService<S> {
    let validator = ChecklistValidator::new(
        QuestionCatalog::mola(),
        config.mandatory_observations.iter().copied(),
    );
    let strategy = ChecklistStrategy::for_mode(
        config.checklist_mode,
        &config.tables.checklist_items,
        &config.tables.checklists,
    );
    ChecklistService::new(store, registrations, validator, strategy).with_fetcher(fetcher)
}
