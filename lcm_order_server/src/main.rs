use std::process::ExitCode;

use dotenvy::dotenv;
use lcm_order_server::{cli::handle_command_line_args, config::ServerConfig, server::run_server};
use log::*;

#[actix_web::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return ExitCode::SUCCESS;
    }
    let config = ServerConfig::from_env_or_default();
    info!("🚀️ Order server listening on {}:{}. Orders are stored in {}", config.host, config.port, config.database_url);
    match &config.webhook_whitelist {
        Some(ips) => info!("🚀️ Payment notifications are accepted from {} whitelisted addresses", ips.len()),
        None => warn!("🚀️ Payment notifications are accepted from any address"),
    }
    match run_server(config).await {
        Ok(_) => {
            info!("🚀️ Order server stopped");
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("🚀️ Order server failed. {e}");
            ExitCode::FAILURE
        },
    }
}
