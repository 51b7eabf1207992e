use std::net::SocketAddr;

use tricrawl::{log_info, Services};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let services = Services::bootstrap();

    let port = services.config.proxy_port;
    let router = tricrawl::modules::proxy::build_router(services.proxy_state());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_info!("tricrawl-proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to bind proxy listener on {}: {}", addr, e);
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, router).await {
        eprintln!("tricrawl-proxy server error: {}", e);
        std::process::exit(1);
    }
}
