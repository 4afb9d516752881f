//! HTTP server entry point.

use optipress::api::{router, AppState};
use optipress::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr;

    let state = AppState::new(config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("optipress server listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
