use std::{process, sync::Arc};

use skystore::{
    application::{
        accounts::AccountService,
        blog::BlogService,
        catalog::CatalogService,
        error::AppError,
        notify::{MailIdentity, MilestoneNotifier},
        seed::CatalogSeeder,
        sessions::SessionService,
    },
    cache::{CacheOptions, MemorySnapshotStore},
    config,
    domain::entities::{PostRecord, ProductRecord},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        mail, telemetry,
    },
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
        config::Command::SeedRoles(_) => run_seed_roles(settings).await,
        config::Command::SeedCatalog(_) => run_seed_catalog(settings).await,
        config::Command::CreateSuperuser(args) => {
            run_create_superuser(settings, &args.email, &args.password).await
        }
        config::Command::AssignGroup(args) => {
            run_assign_group(settings, &args.email, &args.group).await
        }
        config::Command::GrantPermission(args) => {
            run_grant_permission(settings, &args.email, &args.permission).await
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let http_state = build_http_state(repositories, &settings)?;
    serve_http(&settings, http_state).await
}

async fn run_seed_roles(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let accounts = build_account_service(repositories, &settings)?;
    accounts
        .seed_roles()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to seed roles: {err}")))?;
    info!(target = "skystore::cli", "permission groups are up to date");
    Ok(())
}

async fn run_seed_catalog(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let seeder = CatalogSeeder::new(
        repositories.clone(),
        repositories.clone(),
        repositories,
    );
    let report = seeder
        .run()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to seed catalog: {err}")))?;
    info!(
        target = "skystore::cli",
        categories = report.categories,
        products = report.products,
        contacts = report.contacts,
        "catalog seeded"
    );
    Ok(())
}

async fn run_create_superuser(
    settings: config::Settings,
    email: &str,
    password: &str,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let accounts = build_account_service(repositories, &settings)?;
    let user = accounts
        .create_superuser(email, password)
        .await
        .map_err(|err| AppError::validation(format!("failed to create superuser: {err}")))?;
    info!(
        target = "skystore::cli",
        user_id = %user.id,
        email = %user.email,
        "superuser created"
    );
    Ok(())
}

async fn run_assign_group(
    settings: config::Settings,
    email: &str,
    group: &str,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let accounts = build_account_service(repositories, &settings)?;
    let user = accounts
        .assign_group(email, group)
        .await
        .map_err(|err| AppError::validation(format!("failed to assign group: {err}")))?;
    info!(target = "skystore::cli", user_id = %user.id, group, "group assigned");
    Ok(())
}

async fn run_grant_permission(
    settings: config::Settings,
    email: &str,
    permission: &str,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let accounts = build_account_service(repositories, &settings)?;
    let user = accounts
        .grant_permission(email, permission)
        .await
        .map_err(|err| AppError::validation(format!("failed to grant permission: {err}")))?;
    info!(target = "skystore::cli", user_id = %user.id, permission, "permission granted");
    Ok(())
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

fn build_account_service(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<AccountService, AppError> {
    let session_ttl = time::Duration::try_from(settings.sessions.ttl)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    let sessions = SessionService::new(repositories.clone(), session_ttl);
    let mailer = mail::build_mailer(&settings.mail).map_err(AppError::from)?;

    Ok(AccountService::new(
        repositories,
        sessions,
        mailer,
        mail_identity(settings),
    ))
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let cache = CacheOptions {
        enabled: settings.cache.enabled,
        ttl: settings.cache.ttl,
    };
    if !cache.enabled {
        warn!(target = "skystore::cache", "listing cache is disabled");
    }

    let threshold = i64::try_from(settings.notifications.view_milestone.get())
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    let mailer = mail::build_mailer(&settings.mail).map_err(AppError::from)?;
    let notifier = MilestoneNotifier::new(mailer, mail_identity(settings), threshold);

    let catalog = CatalogService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        Arc::new(MemorySnapshotStore::<ProductRecord>::new()),
        cache,
    );
    let blog = BlogService::new(
        repositories.clone(),
        Arc::new(MemorySnapshotStore::<PostRecord>::new()),
        cache,
        notifier,
    );
    let accounts = build_account_service(repositories.clone(), settings)?;

    Ok(HttpState {
        catalog: Arc::new(catalog),
        blog: Arc::new(blog),
        accounts: Arc::new(accounts),
        health: repositories,
    })
}

fn mail_identity(settings: &config::Settings) -> MailIdentity {
    MailIdentity {
        from: settings.mail.from.clone(),
        admin: settings.mail.admin_email.clone(),
    }
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "skystore::http",
        addr = %settings.server.addr,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(
                    target = "skystore::http",
                    error = %err,
                    "failed to listen for shutdown signal"
                );
                return;
            }
            info!(
                target = "skystore::http",
                grace_secs = grace.as_secs(),
                "shutdown signal received"
            );
        })
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
