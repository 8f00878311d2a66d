use std::sync::Arc;

use dispatchd::config::Config;
use dispatchd::dispatch::Dispatcher;
use dispatchd::error::StartupError;
use dispatchd::logger;
use dispatchd::server;

fn main() {
    // Config file path (without extension), defaults to "config"
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());

    if let Err(e) = run(&config_path) {
        logger::log_error(&e.to_string());
        eprintln!("[FATAL] {e}");
        std::process::exit(1);
    }
}

fn run(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load_from(config_path)?;
    logger::init(&cfg).map_err(StartupError::Logger)?;
    logger::log_config(&cfg);

    // Requests are handled one at a time, a single thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr, cfg.server.backlog)?;

    // Framework only: applications build their own binary with routes
    let dispatcher = Arc::new(Dispatcher::new(&cfg, Vec::new())?);

    logger::log_server_start(&addr, &cfg, dispatcher.registry().len());
    server::start_server_loop(listener, dispatcher, server::shutdown_signal()).await;
    Ok(())
}
