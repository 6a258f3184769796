// src/main.rs
use std::process;

use docstore::{Config, Engine, TcpServer};

fn main() {
    env_logger::init();
    log::info!("starting docstore server");

    let config = Config::load();
    let engine = Engine::new(config.data_dir.clone());

    let server = match TcpServer::bind(&config.listen_addr()) {
        Ok(server) => server,
        Err(e) => {
            log::error!("cannot bind {}: {}", config.listen_addr(), e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run(engine) {
        log::error!("server error: {}", e);
        process::exit(1);
    }
}
