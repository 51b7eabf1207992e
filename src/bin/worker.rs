use std::net::SocketAddr;

use tricrawl::{log_info, Services};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let services = Services::bootstrap();
    let worker = services.archival_worker();

    tokio::spawn(worker.clone().run_poll_loop());

    let port = services.config.worker_port;
    let router = tricrawl::modules::worker_http::build_router(worker);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_info!("tricrawl-worker listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to bind worker listener on {}: {}", addr, e);
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, router).await {
        eprintln!("tricrawl-worker server error: {}", e);
        std::process::exit(1);
    }
}
