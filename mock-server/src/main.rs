use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let app = match std::env::var("MOCK_TOKEN") {
        Ok(token) if !token.is_empty() => mock_server::app_with_token(token),
        _ => mock_server::app(),
    };

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}{}", mock_server::LAYER_PATH);
    mock_server::run_app(listener, app).await
}
