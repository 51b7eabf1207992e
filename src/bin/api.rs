use std::net::SocketAddr;

use tricrawl::{log_info, Services};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let services = Services::bootstrap();

    if let Err(e) = services.run_migrations() {
        eprintln!("Failed to run database migrations: {}", e);
        eprintln!("Database migration failed. Please check database schema and permissions.");
        std::process::exit(1);
    }

    let port = services.config.api_port;
    let router = tricrawl::modules::api::build_router(services.api_state());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_info!("tricrawl-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to bind API listener on {}: {}", addr, e);
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, router).await {
        eprintln!("tricrawl-api server error: {}", e);
        std::process::exit(1);
    }
}
