mod catalog;
mod config;
mod error;
mod mailer;
mod models;
mod optimize;
mod routes;
mod snapshot;

use std::{fs, sync::Arc};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use catalog::MediaCatalog;
use config::{AppConfig, Environment};
use mailer::{ContactMailer, LogMailer, SmtpMailer};
use routes::register;
use snapshot::SnapshotStore;

pub struct AppState {
    pub catalog: MediaCatalog,
    pub snapshot: SnapshotStore,
    pub mailer: Arc<dyn ContactMailer>,
    pub environment: Environment,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().expect("failed to load config");

    fs::create_dir_all(&config.log_dir).expect("failed to create log directory");
    let file_appender = rolling::never(&config.log_dir, "backend.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let _guard = guard;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("failed to init logging filter");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    let catalog = MediaCatalog::new(config.media_root.clone());
    catalog
        .ensure_default_structure()
        .expect("failed to create media directories");

    let mailer: Arc<dyn ContactMailer> = match &config.smtp {
        Some(smtp) => {
            Arc::new(SmtpMailer::from_config(smtp).expect("failed to build smtp transport"))
        }
        None => {
            info!("no SMTP configured, contact emails will be logged");
            Arc::new(LogMailer)
        }
    };

    let snapshot = SnapshotStore::new(catalog.clone(), config.snapshot_path.clone());

    info!(
        host = %config.host,
        port = config.port,
        env = config.env.as_str(),
        media_root = %config.media_root.display(),
        "starting studio backend"
    );

    let bind_addr = format!("{}:{}", config.host, config.port);
    let client_origin = config.client_origin.clone();
    let shared_state = web::Data::new(AppState {
        catalog,
        snapshot,
        mailer,
        environment: config.env,
    });

    HttpServer::new(move || {
        let cors = match &client_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allowed_methods(vec!["GET", "POST"])
                .allow_any_header()
                .supports_credentials()
                .max_age(3600),
            None => Cors::permissive(),
        };
        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(shared_state.clone())
            .configure(register)
    })
    .bind(bind_addr)?
    .run()
    .await
}
