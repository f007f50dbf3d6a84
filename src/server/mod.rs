pub mod api;
pub mod errors;

use crate::config::AppConfig;
use crate::relay::ChatRelay;
use api::AppState;
use governor::{ Quota, RateLimiter };
use log::{ info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Server {
    config: AppConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: AppConfig, relay: Arc<ChatRelay>) -> Self {
        let limiter = config.rate_limit_per_second.map(|per_second| {
            info!("Chat requests limited to {} per second.", per_second);
            Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
        });
        if limiter.is_none() {
            warn!("Server configured WITHOUT a chat rate limit. Upstream quota is unprotected.");
        }

        Self {
            config,
            state: AppState { relay, limiter },
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr: SocketAddr = self.config.server_addr
            .parse()
            .map_err(|e| format!("Invalid server address '{}': {}", self.config.server_addr, e))?;

        api::start_http_server(addr, self.state.clone(), self.config.tls.as_ref()).await
    }
}
