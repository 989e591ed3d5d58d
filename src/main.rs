use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use student_dashboard::api::{self, AppState};
use student_dashboard::cli::Args;
use student_dashboard::config::Config;
use student_dashboard::data::{generate_students, load_students};
use student_dashboard::database::{InMemoryRepository, StudentRepository};
use student_dashboard::insights;

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_repository(config: &Config) -> Result<InMemoryRepository> {
    let students = match &config.data.students_file {
        Some(path) => load_students(path)
            .with_context(|| format!("Failed to load students from {}", path.display()))?,
        None => {
            info!(
                "No student file configured, generating {} sample students",
                config.data.sample_size
            );
            generate_students(config.data.sample_size, config.data.seed)
        }
    };

    InMemoryRepository::new(students).context("Student records failed validation")
}

async fn start_api(config: Config, state: AppState) -> std::io::Result<()> {
    let state = web::Data::new(state);
    let bind = (config.server.host.clone(), config.server.port);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(api::cors())
            .wrap(Logger::new("%r %s %Dms"))
            .configure(api::configure)
            .default_service(web::to(api::fallback_route))
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.bind(bind)?.run().await
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse_args();

    let mut config = Config::resolve(args.config.as_deref())?;
    config.merge_env();
    config.merge_with_args(&args);

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&args);
    info!("Student Analytics Dashboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    let repository = load_repository(&config)?;
    info!("Serving {} student records", repository.len());
    let repository: Arc<dyn StudentRepository> = Arc::new(repository);

    let narrator = insights::from_config(&config.narrative)
        .context("Failed to set up narrative generator")?;

    let state = AppState::new(
        repository,
        narrator,
        config.analytics.clone(),
        config.narrative.max_chars,
    );

    info!(
        "Starting API on http://{}:{}",
        config.server.host, config.server.port
    );
    start_api(config, state)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
