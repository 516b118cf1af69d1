//! # Connection Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor. SIGINT/SIGTERM detienen el loop de accept.

use conn_server::config::Config;
use conn_server::logging;
use conn_server::server::Server;
use tracing::{error, info};

fn main() {
    let config = Config::new();
    logging::init(config.log_level.into());

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }
    config.print_summary();

    let mut server = Server::new(config);
    let stop = server.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received stop signal. Stopping server...");
        stop.stop();
    }) {
        error!("Error while setting signal handler: {}", e);
    }

    if let Err(e) = server.run() {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}
