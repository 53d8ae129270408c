use clap::Parser;
use swap_mock::MockBackend;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the mock backend
#[derive(Parser, Debug)]
#[command(name = "swap-mock")]
#[command(about = "Battery-swap backend stand-in serving a demo station")]
struct Args {
    /// Port to bind the server to
    #[arg(short, long, default_value = "4000")]
    port: u16,

    /// Require this bearer token on every request
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .pretty()
        .init();

    let mut backend = MockBackend::demo_station();
    if let Some(token) = args.token {
        backend = backend.require_token(token);
    }
    let app = backend.router();

    let bind_addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Starting mock backend on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", bind_addr, e))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}
