pub mod prompt;

use crate::cli::Args;
use crate::errors::ConfigError;
use crate::llm::LlmConfig;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

/// Validated runtime configuration, built once from the parsed [`Args`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub llm: LlmConfig,
    pub system_instruction: Arc<str>,
    pub max_duration: Duration,
    pub rate_limit_per_second: Option<NonZeroU32>,
    pub tls: Option<TlsConfig>,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let llm = LlmConfig::new(&args.chat_api_key, &args.chat_model, &args.chat_base_url)?;

        if args.max_duration_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }

        let rate_limit_per_second = match args.rate_limit_per_second {
            Some(n) => Some(NonZeroU32::new(n).ok_or(ConfigError::ZeroRateLimit)?),
            None => None,
        };

        let tls = if args.enable_tls {
            match (&args.tls_cert_path, &args.tls_key_path) {
                (Some(cert_path), Some(key_path)) =>
                    Some(TlsConfig { cert_path: cert_path.clone(), key_path: key_path.clone() }),
                _ => {
                    return Err(
                        ConfigError::Tls(
                            "Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".into()
                        )
                    );
                }
            }
        } else {
            None
        };

        let system_instruction = prompt::load_system_instruction(
            args.system_instruction_path.as_deref()
        )?;

        Ok(Self {
            server_addr: args.server_addr.clone(),
            llm,
            system_instruction,
            max_duration: Duration::from_secs(args.max_duration_secs),
            rate_limit_per_second,
            tls,
        })
    }
}
