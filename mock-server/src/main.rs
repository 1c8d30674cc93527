use mock_server::MockState;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let user_name = std::env::var("MOCK_USER").unwrap_or_else(|_| "demo".to_string());
    let system_code = std::env::var("MOCK_SYSTEM_CODE").unwrap_or_else(|_| "demo".to_string());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("FusionSolar emulator listening on http://{addr}/thirdData");
    mock_server::run(listener, MockState::new(&user_name, &system_code)).await
}
