use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use user_api::config::Config;
use user_api::state::AppState;
use user_api::user_handlers::configure;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("tracing init failed: {e}");
    }

    let config = Config::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = web::Data::new(
        AppState::new(&config).map_err(|e| std::io::Error::other(format!("startup failed: {e:?}")))?,
    );

    info!(addr = %config.bind_addr, "listening");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
