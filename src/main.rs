use actix_web::{App, HttpServer, web};
use restaurant_directory::application::auth_service::AuthService;
use restaurant_directory::application::restaurant_service::RestaurantService;
use restaurant_directory::data::memory::InMemoryRestaurantRepository;
use restaurant_directory::data::user_repository::InMemoryUserRepository;
use restaurant_directory::infrastructure::config::AppConfig;
use restaurant_directory::infrastructure::logging::init_logging;
use restaurant_directory::infrastructure::security::PasswordHashing;
use restaurant_directory::presentation::handlers::{AppState, not_found};
use restaurant_directory::presentation::middleware::RequestTrace;
use restaurant_directory::presentation::routes::configure;
use restaurant_directory::presentation::session::{session_key, session_middleware};
use std::sync::Arc;
use tracing::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    init_logging(config.log_format).map_err(std::io::Error::other)?;
    info!(host = %config.host, port = config.port, "Configuration loaded");

    let hasher = PasswordHashing::new(config.hashing)
        .map_err(|e| std::io::Error::other(format!("invalid argon2 parameters: {}", e)))?;

    let auth = AuthService::new(Arc::new(InMemoryUserRepository::new()), hasher)
        .map_err(|e| std::io::Error::other(format!("failed to set up authentication: {:#}", e)))?;
    let state = web::Data::new(AppState {
        restaurants: RestaurantService::new(Arc::new(InMemoryRestaurantRepository::new())),
        auth,
    });
    info!("Application state initialized");

    let key = session_key(&config.session);
    let session_settings = config.session.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(session_middleware(&session_settings, key.clone()))
            .wrap(RequestTrace)
            .configure(configure)
            .default_service(web::to(not_found))
    });

    let (host, port) = config.bind_address();
    let server = server.bind((host.as_str(), port))?;
    info!(address = %format!("{}:{}", host, port), "Starting HTTP server");
    server.run().await
}
