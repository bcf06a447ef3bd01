use std::{process, sync::Arc, time::Duration};

use kurohelper::{
    application::{
        catalog::Catalog,
        dispatcher::Dispatcher,
        error::AppError,
        features::{
            LEGACY_COMMANDS, RetiredComponent, SearchFeature, SearchSettings, command_name,
        },
        navigator::Navigator,
        reporting::TransportReporter,
        views::ImagePolicy,
    },
    cache::{ExpirySweeper, SessionIndex},
    config,
    domain::{token, types::Domain},
    infra::{catalog::JsonCatalog, stdio, telemetry},
};
use tokio::io::BufReader;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

/// Acknowledgment records outlive the slowest fetch by this much, so an edit
/// never finds its deferral already purged.
const ACK_RETENTION_MARGIN: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Decode(args) => run_decode(args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let cache = &settings.cache;
    let sessions = Arc::new(SessionIndex::new(cache.ttl, cache.session_capacity));
    let transport = Arc::new(stdio::StdioTransport::stdout(
        settings.navigator.fetch_timeout + ACK_RETENTION_MARGIN,
    ));
    let navigator = Navigator::new(
        sessions.clone(),
        transport.clone(),
        settings.navigator.fetch_timeout,
    );
    let catalog: Arc<dyn Catalog> = Arc::new(
        JsonCatalog::load(
            settings.catalog.path.as_deref(),
            settings.catalog.sources.clone(),
        )
        .await?,
    );
    let images = Arc::new(ImagePolicy::new(
        settings.images.allow_list.clone(),
        settings.images.placeholder_url.clone(),
    ));
    let search = SearchSettings {
        page_size: settings.navigator.page_size,
        ttl: cache.ttl,
        result_capacity: cache.result_capacity,
    };

    let mut sweeper = ExpirySweeper::new(cache.sweep_interval);
    sweeper.register(sessions);
    sweeper.register(transport.clone());

    let mut dispatcher = Dispatcher::new(Arc::new(TransportReporter::new(transport.clone())));
    for domain in Domain::ALL {
        let feature = SearchFeature::new(
            domain,
            &settings.catalog.sources,
            catalog.clone(),
            navigator.clone(),
            images.clone(),
            search,
        )?;
        for store in feature.stores() {
            sweeper.register(store);
        }
        dispatcher.register(domain, command_name(domain), Arc::new(feature));
    }

    let retired = Arc::new(RetiredComponent::new(transport.clone()));
    for command in LEGACY_COMMANDS {
        dispatcher.register_legacy(command, retired.clone());
    }

    info!(
        target: "kurohelper::serve",
        domains = Domain::ALL.len(),
        stores = sweeper.store_count(),
        sources = ?settings.catalog.sources,
        "Serving interactions from stdin"
    );

    let sweeper_handle = sweeper.spawn();
    let result = stdio::serve(
        Arc::new(dispatcher),
        BufReader::new(tokio::io::stdin()),
    )
    .await;

    sweeper_handle.abort();
    let _ = sweeper_handle.await;

    result.map(|_| ()).map_err(AppError::from)
}

fn run_decode(args: config::DecodeArgs) -> Result<(), AppError> {
    let decoded = token::decode(&args.token)?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&decoded)
    } else {
        serde_json::to_string(&decoded)
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode token: {err}")))?;

    println!("{rendered}");
    Ok(())
}
