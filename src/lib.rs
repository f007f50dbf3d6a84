pub mod cli;
pub mod config;
pub mod errors;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;

use cli::Args;
use config::AppConfig;
use llm::chat::new_client as new_chat_client;
use log::info;
use relay::ChatRelay;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", config.server_addr);
    info!("Chat Model: {}", config.llm.completion_model);
    info!("Chat Base URL: {}", config.llm.base_url);
    info!("Chat API Key: configured");
    info!("Max Duration: {:?}", config.max_duration);
    info!(
        "System Instruction: {}",
        args.system_instruction_path.as_deref().unwrap_or("built-in")
    );
    info!(
        "Rate Limit: {}",
        config.rate_limit_per_second.map_or("unlimited".to_string(), |n| format!("{}/s", n))
    );
    info!("TLS Enabled: {}", config.tls.is_some());
    info!("-------------------------");

    let chat_client = new_chat_client(&config.llm)?;
    let relay = Arc::new(
        ChatRelay::new(chat_client, config.system_instruction.clone(), config.max_duration)
    );
    info!("Chat relay ready (ceiling {:?} per request)", relay.max_duration());

    let server = Server::new(config, relay);
    server.run().await?;

    Ok(())
}
