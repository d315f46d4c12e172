use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};
use clap::Parser;

#[derive(Parser)]
#[command(about = "Pretend upstream for trying out upstream-lb")]
struct Args {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = Args::parse().port;

    let app = Router::new()
        .route("/", get(move || async move { format!("Hello from the backend on port {port}!") }))
        .route("/health", get(|| async { "OK" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "Finally done"
            }),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Pretend backend is listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
