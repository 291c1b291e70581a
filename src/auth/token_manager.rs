use anyhow::Result;

use crate::auth::{oauth, tokens_file};
use crate::config::{Config, DEFAULT_SERVER};

/// Hands out an access token for the configured server, preferring the
/// cached one over a fresh browser dance.
pub struct TokenManager {
    cfg: Config,
    server: String,
}

impl TokenManager {
    pub fn new(mut cfg: Config, server_override: Option<&str>) -> Self {
        if cfg.consumer_secret.is_empty()
            && let Ok(secret) = std::env::var("NOTEDATE_CONSUMER_SECRET")
        {
            cfg.consumer_secret = secret;
        }
        let server = server_override
            .map(str::to_string)
            .or_else(|| cfg.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        Self { cfg, server }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns a usable access token; runs the interactive flow if needed.
    pub fn get_access_token(&self, force_reauth: bool) -> Result<String> {
        // 1) cached token issued for this same server
        if !force_reauth
            && let Some(tf) = tokens_file::load_tokens()?
            && tf.server.as_deref() == Some(self.server.as_str())
            && let Some(token) = tf.access_token
        {
            log::info!("using cached access token for {}", self.server);
            return Ok(token);
        }

        // 2) otherwise go through the browser
        let token = oauth::perform_authorization(&self.cfg, &self.server)?;
        tokens_file::save_tokens(Some(&token), Some(&self.server))?;
        Ok(token)
    }
}
