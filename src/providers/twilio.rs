use async_trait::async_trait;
use serde::Deserialize;

use crate::notifier::{MessageReceipt, Notifier, NotifyError, NotifyResult, OutboundMessage};

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

// Message resource, only the field we keep
#[derive(Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u32>,
    message: String,
}

/// Twilio Programmable Messaging client (works for SMS and WhatsApp senders).
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(
        http: reqwest::Client,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioClient {
    async fn send(&self, message: OutboundMessage) -> NotifyResult<MessageReceipt> {
        let form = [
            ("To", message.to.as_str()),
            ("From", message.from.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiError>().await {
                Ok(ApiError {
                    code: Some(code),
                    message,
                }) => format!("{message} (code {code})"),
                Ok(ApiError { message, .. }) => message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource = response.json::<MessageResource>().await?;
        Ok(MessageReceipt { id: resource.sid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_mock;
    use axum::{
        Form, Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode, header},
        routing::post,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, Option<String>, HashMap<String, String>)>>>;

    async fn fake_messages(
        State(seen): State<Seen>,
        Path(account): Path<String>,
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = form.get("Body").cloned().unwrap_or_default();
        seen.lock().unwrap().push((account, auth, form));

        if body.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"code": 21602, "message": "Message body is required.", "status": 400})),
            );
        }
        (
            StatusCode::CREATED,
            Json(serde_json::json!({"sid": "SM0001", "status": "queued"})),
        )
    }

    async fn mock_twilio() -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/2010-04-01/Accounts/{account}/Messages.json", post(fake_messages))
            .with_state(seen.clone());
        (spawn_mock(app).await, seen)
    }

    fn message(body: &str) -> OutboundMessage {
        OutboundMessage {
            body: body.to_string(),
            from: "whatsapp:+14155238886".to_string(),
            to: "whatsapp:+10000000000".to_string(),
        }
    }

    #[tokio::test]
    async fn send_posts_form_with_basic_auth() {
        let (base, seen) = mock_twilio().await;
        let client = TwilioClient::new(reqwest::Client::new(), "AC42", "tok").with_base_url(base);

        let receipt = client.send(message("report ready")).await.unwrap();

        assert_eq!(receipt.id, "SM0001");
        let seen = seen.lock().unwrap();
        let (account, auth, form) = &seen[0];
        assert_eq!(account, "AC42");
        // base64("AC42:tok")
        assert_eq!(auth.as_deref(), Some("Basic QUM0Mjp0b2s="));
        assert_eq!(form["To"], "whatsapp:+10000000000");
        assert_eq!(form["From"], "whatsapp:+14155238886");
        assert_eq!(form["Body"], "report ready");
    }

    #[tokio::test]
    async fn rejection_carries_provider_message() {
        let (base, _) = mock_twilio().await;
        let client = TwilioClient::new(reqwest::Client::new(), "AC42", "tok").with_base_url(base);

        let err = client.send(message("")).await.unwrap_err();

        match err {
            NotifyError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Message body is required. (code 21602)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
