use pong_peer::config::PeerConfig;
use pong_peer::game_loop::run_peer;
use pong_peer::presentation::LogPresentation;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match PeerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid peer configuration: {}", e);
            std::process::exit(1);
        }
    };
    let url = match config.join_url() {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid peer configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(seed = config.seed, "Pong peer connecting to {}", url);
    if let Err(e) = run_peer::<LogPresentation>(&config, url).await {
        tracing::error!(error = %e, "peer stopped");
        std::process::exit(1);
    }
}
