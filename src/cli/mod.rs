use clap::Parser;

#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// API key for the Gemini API. Required; there is no built-in fallback.
    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gemini-2.0-flash-exp, gemini-1.5-pro)
    #[arg(long, env = "CHAT_MODEL", default_value = "gemini-2.0-flash-exp")]
    pub chat_model: String,

    /// Root URL of the Gemini REST API, without the model path.
    #[arg(
        long,
        env = "CHAT_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub chat_base_url: String,

    // --- Relay Args ---
    /// Hard ceiling, in seconds, for one relayed chat request including streaming.
    #[arg(long, env = "MAX_DURATION_SECS", default_value = "30")]
    pub max_duration_secs: u64,

    /// Optional file whose content replaces the built-in system instruction.
    #[arg(long, env = "SYSTEM_INSTRUCTION_PATH")]
    pub system_instruction_path: Option<String>,

    /// Optional global cap on chat requests per second. Unset means unlimited.
    #[arg(long, env = "RATE_LIMIT_PER_SECOND")]
    pub rate_limit_per_second: Option<u32>,

    // --- General App Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

// The credential must never end up in logs, so Debug is written by hand.
impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("chat_api_key", &"<redacted>")
            .field("chat_model", &self.chat_model)
            .field("chat_base_url", &self.chat_base_url)
            .field("max_duration_secs", &self.max_duration_secs)
            .field("system_instruction_path", &self.system_instruction_path)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("server_addr", &self.server_addr)
            .field("debug", &self.debug)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("enable_tls", &self.enable_tls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_only_key_given() {
        let args = Args::try_parse_from(["industrisense", "--chat-api-key", "secret"]).unwrap();
        assert_eq!(args.chat_model, "gemini-2.0-flash-exp");
        assert_eq!(args.max_duration_secs, 30);
        assert_eq!(args.server_addr, "127.0.0.1:3000");
        assert!(args.rate_limit_per_second.is_none());
        assert!(!args.enable_tls);
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let args = Args::try_parse_from(["industrisense", "--chat-api-key", "secret-value"]).unwrap();
        let rendered = format!("{:?}", args);
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
