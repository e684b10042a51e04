use std::{process, sync::Arc};

use stormo::{
    application::{
        error::AppError,
        fanout::FanoutEngine,
        publish::PublishService,
        repos::{AccountsRepo, EngagementRepo, PostsRepo, PostsWriteRepo, SocialGraphRepo},
        social::SocialService,
        timeline::TimelineAssembler,
    },
    cache::{CacheConfig, TimelineCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
    realtime::{EventBus, LiveRegistry, RelayHandle, RelayWorker},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
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
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let ApplicationContext { api_state, relay } =
        build_application_context(repositories, &settings);

    let result = serve_http(&settings, api_state).await;

    // Bounded drain: the relay finishes the event in hand, nothing more.
    if tokio::time::timeout(settings.server.graceful_shutdown, relay.stop())
        .await
        .is_err()
    {
        warn!("realtime relay did not stop before the shutdown deadline");
    }

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(target = "stormo::migrate", "migrations applied");
    Ok(())
}

struct ApplicationContext {
    api_state: ApiState,
    relay: RelayHandle,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> ApplicationContext {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let accounts_repo: Arc<dyn AccountsRepo> = repositories.clone();
    let social_repo: Arc<dyn SocialGraphRepo> = repositories.clone();
    let engagement_repo: Arc<dyn EngagementRepo> = repositories.clone();

    let cache_config = CacheConfig::from(&settings.timeline);
    let cache = Arc::new(TimelineCache::new(&cache_config));

    let live = LiveRegistry::new();
    let (bus, events) = EventBus::channel();
    let relay = RelayWorker::spawn(live.clone(), events);

    let fanout = Arc::new(FanoutEngine::new(
        social_repo.clone(),
        cache.clone(),
        bus,
        settings.timeline.celebrity_threshold,
    ));
    let timeline = Arc::new(TimelineAssembler::new(
        cache.clone(),
        social_repo.clone(),
        posts_repo.clone(),
        accounts_repo.clone(),
        engagement_repo.clone(),
        cache_config,
    ));
    let publish = Arc::new(PublishService::new(
        posts_repo.clone(),
        posts_write_repo,
        accounts_repo.clone(),
        fanout,
    ));
    let social = Arc::new(SocialService::new(
        social_repo,
        accounts_repo,
        posts_repo,
        engagement_repo,
        cache,
    ));

    let api_state = ApiState {
        timeline,
        publish,
        social,
        live,
        db: repositories,
    };

    ApplicationContext { api_state, relay }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "stormo listening");

    let server = axum::serve(listener, router.into_make_service());
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
