use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;

use crate::auth::callback::CallbackListener;
use crate::config::{Config, DEFAULT_CALLBACK_PORT};
use crate::console;

/// How long to wait for the browser redirect before falling back to a
/// manually entered code.
const VERIFIER_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Temporary token pair issued at the start of the authorization dance.
/// The secret signs the final exchange; neither part outlives the flow.
pub struct RequestToken {
    pub token: String,
    pub secret: String,
}

/// Client for the service's three-step authorization endpoints.
pub struct OAuthClient {
    server: String,
    consumer_key: String,
    consumer_secret: String,
    http: Client,
}

impl OAuthClient {
    pub fn new(server: &str, consumer_key: &str, consumer_secret: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("notedate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to construct authorization client")?;

        Ok(Self {
            server: server.trim_end_matches('/').to_string(),
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
            http,
        })
    }

    /// Ask the service for a temporary request-token pair, registering the
    /// local callback URL for the redirect.
    pub fn request_token(&self, callback_url: &str) -> Result<RequestToken> {
        let signature = format!("{}&", self.consumer_secret);
        let params = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_signature_method", "PLAINTEXT"),
            ("oauth_signature", signature.as_str()),
            ("oauth_callback", callback_url),
        ];

        let response = self
            .http
            .post(format!("{}/oauth/request_token", self.server))
            .form(&params)
            .send()
            .context("request token call failed")?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!(
                "request token call failed with status {status}: {body}"
            ));
        }

        let pairs = parse_form_pairs(&body);
        let token = pairs
            .get("oauth_token")
            .cloned()
            .ok_or_else(|| anyhow!("request token response missing oauth_token"))?;
        let secret = pairs
            .get("oauth_token_secret")
            .cloned()
            .ok_or_else(|| anyhow!("request token response missing oauth_token_secret"))?;
        Ok(RequestToken { token, secret })
    }

    /// Where the user grants access; the service redirects back to the
    /// registered callback with the verifier attached.
    pub fn authorize_url(&self, request_token: &RequestToken) -> String {
        let token: String =
            url::form_urlencoded::byte_serialize(request_token.token.as_bytes()).collect();
        format!("{}/oauth/authorize?oauth_token={token}", self.server)
    }

    /// Exchange the verifier and request-token pair for the long-lived
    /// access token. A rejected verifier is final; waiting cannot fix it,
    /// so this is never retried.
    pub fn access_token(&self, request_token: &RequestToken, verifier: &str) -> Result<String> {
        let signature = format!("{}&{}", self.consumer_secret, request_token.secret);
        let params = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_token", request_token.token.as_str()),
            ("oauth_signature_method", "PLAINTEXT"),
            ("oauth_signature", signature.as_str()),
            ("oauth_verifier", verifier),
        ];

        let response = self
            .http
            .post(format!("{}/oauth/access_token", self.server))
            .form(&params)
            .send()
            .context("access token call failed")?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!(
                "access token exchange rejected with status {status}: {body}"
            ));
        }

        parse_form_pairs(&body)
            .remove("oauth_token")
            .ok_or_else(|| anyhow!("access token response missing oauth_token"))
    }
}

/// Run the full interactive authorization dance and return an access token.
pub fn perform_authorization(cfg: &Config, server: &str) -> Result<String> {
    let client = OAuthClient::new(server, &cfg.consumer_key, &cfg.consumer_secret)?;

    // 1) Bind the callback listener first so the redirect cannot race it.
    let port = cfg.callback_port.unwrap_or(DEFAULT_CALLBACK_PORT);
    let mut listener = CallbackListener::bind(port)?;
    let callback_url = format!("http://localhost:{}", listener.port());

    // 2) Request token pair, then show the authorization page.
    let request_token = client.request_token(&callback_url)?;
    let authorize_url = client.authorize_url(&request_token);

    println!("Opening browser for authorization...");
    println!("Authorization URL: {authorize_url}");
    // best-effort: don't fail if browser can't be opened
    if let Err(e) = open::that(&authorize_url) {
        eprintln!("Warning: could not open browser automatically: {e}");
    }

    // 3) Wait for the redirect; degrade to manual entry after the timeout.
    let verifier = match listener.wait_for_verifier(VERIFIER_TIMEOUT) {
        Some(code) => code,
        None => {
            println!("\nNo callback received. After authorizing, the service shows a verification code.");
            console::prompt_line("Enter the verification code: ")?
        }
    };
    listener.shutdown();

    // 4) Exchange once; failure here aborts the run.
    client.access_token(&request_token, &verifier)
}

fn parse_form_pairs(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    fn client_for(server: &MockServer) -> OAuthClient {
        OAuthClient::new(&server.base_url(), "key", "shh").unwrap()
    }

    #[test]
    fn request_token_sends_signed_form_and_parses_pair() {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/request_token")
                .body_contains("oauth_consumer_key=key")
                .body_contains("oauth_signature=shh%26")
                .body_contains("oauth_callback=http%3A%2F%2Flocalhost%3A8080");
            then.status(200)
                .body("oauth_token=rt-1&oauth_token_secret=rs-1");
        });

        let pair = client_for(&server)
            .request_token("http://localhost:8080")
            .expect("request token");

        mock.assert_hits(1);
        assert_eq!(pair.token, "rt-1");
        assert_eq!(pair.secret, "rs-1");
    }

    #[test]
    fn authorize_url_carries_the_token() {
        let server = MockServer::start();
        let client = client_for(&server);
        let pair = RequestToken {
            token: "rt 1".to_string(),
            secret: "rs-1".to_string(),
        };

        let url = client.authorize_url(&pair);
        assert!(url.ends_with("/oauth/authorize?oauth_token=rt+1"));
    }

    #[test]
    fn access_token_signs_with_both_secrets() {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/access_token")
                .body_contains("oauth_token=rt-1")
                .body_contains("oauth_verifier=ABC123")
                .body_contains("oauth_signature=shh%26rs-1");
            then.status(200).body("oauth_token=access-1");
        });

        let token = client_for(&server)
            .access_token(
                &RequestToken {
                    token: "rt-1".to_string(),
                    secret: "rs-1".to_string(),
                },
                "ABC123",
            )
            .expect("access token");

        mock.assert_hits(1);
        assert_eq!(token, "access-1");
    }

    #[test]
    fn rejected_verifier_is_a_hard_error() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST).path("/oauth/access_token");
            then.status(401).body("oauth_problem=verifier_invalid");
        });

        let err = client_for(&server)
            .access_token(
                &RequestToken {
                    token: "rt-1".to_string(),
                    secret: "rs-1".to_string(),
                },
                "WRONG",
            )
            .expect_err("exchange must fail");

        let message = err.to_string();
        assert!(message.contains("rejected"), "got: {message}");
        assert!(message.contains("verifier_invalid"), "got: {message}");
    }
}
