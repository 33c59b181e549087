use std::{error::Error as StdError, iter, process, sync::Arc};

use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        error::AppError,
        groups::{CreateGroupCommand, GroupService},
        repos::{GroupsRepo, GroupsWriteRepo},
    },
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        uploads::UploadStorage,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain: Vec<String> = iter::successors(Some(error as &dyn StdError), |err| (*err).source())
        .map(ToString::to_string)
        .collect();

    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?chain, "application error");
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
        config::Command::CreateGroup(args) => run_create_group(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let upload_storage = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone())
            .map_err(|err| InfraError::io("create the upload directory", err))?,
    );

    let state = HttpState::new(repositories, upload_storage, &settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| InfraError::io("bind the HTTP listener", err))?;

    info!(
        target = "yatube::serve",
        addr = %settings.server.addr,
        cache_enabled = settings.cache.enabled,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "yatube::serve", "server stopped");
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(
        target = "yatube::migrate",
        url = %settings.database.url,
        "migrations applied"
    );
    Ok(())
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let reader: Arc<dyn GroupsRepo> = repositories.clone();
    let writer: Arc<dyn GroupsWriteRepo> = repositories;
    let groups = GroupService::new(reader, writer);

    let group = groups
        .create(CreateGroupCommand {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await
        .map_err(|err| AppError::validation(err.to_string()))?;

    info!(
        target = "yatube::create_group",
        id = group.id,
        slug = %group.slug,
        "group created"
    );
    println!("{}", group.slug);
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| InfraError::database("connect to the database", err))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database("apply migrations", err))?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

/// Resolves on Ctrl-C or SIGTERM, then arms a hard deadline for in-flight requests.
async fn shutdown_signal(grace: std::time::Duration) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        target = "yatube::serve",
        grace_secs = grace.as_secs(),
        "shutdown requested"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        error!(target = "yatube::serve", "graceful shutdown timed out");
        process::exit(1);
    });
}
