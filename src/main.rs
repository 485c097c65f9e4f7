use staging_gate::config::{load_config, print_schema};
use staging_gate::startup::run;
use staging_gate::utils::logger::init_logging;

const CONFIG_PATH: &str = "./config.yaml";

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Failed to print schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = match load_config(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", CONFIG_PATH, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
