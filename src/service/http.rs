use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;

use super::{NoteStore, ServiceError, ServiceResult};
use crate::domain::note::{MetadataSpec, Note, NoteFilter, NoteList, NoteParts, Notebook, User};

/// HTTP implementation of [`NoteStore`]. One instance per authenticated
/// session; the access token rides along as a bearer header on every call.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    base_url: String,
    token: String,
    client: Client,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ServiceClient {
    pub fn new(base_url: &str, token: &str) -> ServiceResult<Self> {
        let trimmed = base_url.trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(ServiceError::Network("server URL cannot be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("notedate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ServiceError::Network(format!("failed to construct client: {err}")))?;

        Ok(Self {
            base_url: trimmed,
            token: token.to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()?;
        parse_json_response(response)
    }
}

impl NoteStore for ServiceClient {
    fn list_notebooks(&self) -> ServiceResult<Vec<Notebook>> {
        self.get_json("/v1/notebooks")
    }

    fn find_notes_metadata(
        &self,
        filter: &NoteFilter,
        offset: u32,
        max_notes: u32,
        spec: &MetadataSpec,
    ) -> ServiceResult<NoteList> {
        let body = serde_json::json!({
            "offset": offset,
            "max_notes": max_notes,
            "filter": filter,
            "result_spec": spec,
        });

        let response = self
            .client
            .post(self.url("/v1/notes/search"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        parse_json_response(response)
    }

    fn get_note(&self, guid: &str, parts: NoteParts) -> ServiceResult<Note> {
        let response = self
            .client
            .get(self.url(&format!("/v1/notes/{guid}")))
            .bearer_auth(&self.token)
            .query(&[
                ("with_content", parts.content),
                ("with_resources_data", parts.resources),
                ("with_resources_recognition", parts.recognition),
                ("with_resources_alternate_data", parts.alternate_data),
            ])
            .send()?;
        parse_json_response(response)
    }

    fn update_note(&self, note: &Note) -> ServiceResult<Note> {
        let response = self
            .client
            .put(self.url(&format!("/v1/notes/{}", note.guid)))
            .bearer_auth(&self.token)
            .json(note)
            .send()?;
        parse_json_response(response)
    }

    fn get_user(&self) -> ServiceResult<User> {
        self.get_json("/v1/user")
    }
}

fn parse_json_response<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
    let status = response.status();
    let headers = response.headers().clone();
    let body_text = response.text().unwrap_or_default();

    if !status.is_success() {
        return Err(error_from_response(status, &headers, &body_text));
    }

    serde_json::from_str::<T>(&body_text)
        .map_err(|err| ServiceError::Decode(format!("bad response JSON: {err}")))
}

fn error_from_response(status: StatusCode, headers: &HeaderMap, body_text: &str) -> ServiceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ServiceError::RateLimited {
            retry_after: extract_retry_after(headers),
        };
    }

    let message = error_message(body_text, status);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Auth(message),
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        _ => ServiceError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Best error text we can pull out of a failure body: the JSON envelope's
/// message when there is one, otherwise the (truncated) raw body.
fn error_message(body_text: &str, status: StatusCode) -> String {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body_text).ok();
    parsed
        .as_ref()
        .and_then(|payload| payload.error.as_ref())
        .and_then(|error| error.message.clone())
        .or_else(|| parsed.as_ref().and_then(|payload| payload.message.clone()))
        .unwrap_or_else(|| {
            let trimmed = body_text.trim();
            if trimmed.is_empty() {
                format!("request failed with status {}", status.as_u16())
            } else {
                truncate_for_error(trimmed, 240)
            }
        })
}

/// Seconds the service asked us to hold off, when it said so. A literal `0`
/// is kept as a zero duration rather than collapsed into "no hint".
fn extract_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate_for_error(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_header_parses_including_zero() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, "17".parse().unwrap());
        assert_eq!(extract_retry_after(&headers), Some(Duration::from_secs(17)));

        headers.insert(RETRY_AFTER, " 0 ".parse().unwrap());
        assert_eq!(extract_retry_after(&headers), Some(Duration::ZERO));

        headers.insert(RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(extract_retry_after(&headers), None);
    }

    #[test]
    fn error_message_prefers_envelope_over_raw_body() {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(
            error_message(r#"{"error":{"message":"quota exceeded"}}"#, status),
            "quota exceeded"
        );
        assert_eq!(
            error_message(r#"{"message":"maintenance window"}"#, status),
            "maintenance window"
        );
        assert_eq!(error_message("plain text body", status), "plain text body");
        assert_eq!(
            error_message("", status),
            "request failed with status 500"
        );
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let long = "x".repeat(500);
        let message = error_message(&long, StatusCode::BAD_GATEWAY);
        assert_eq!(message.chars().count(), 243);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn empty_server_url_is_rejected() {
        assert!(ServiceClient::new("", "token").is_err());
        assert!(ServiceClient::new("/", "token").is_err());
    }
}
