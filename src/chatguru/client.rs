use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::error::{RegistrationError, StatusError};
use super::types::{ContactRequest, StatusReply, text_field};
use crate::config::{AppConfig, ProtocolConfig};

/// The two remote operations the reconciliation loop depends on.
pub trait RegistrationApi {
    /// Request registration of a contact, returning the opaque tracking id.
    async fn submit(&self, contact: &ContactRequest) -> Result<String, RegistrationError>;

    /// Ask for the current state of a previously submitted registration.
    async fn check_status(
        &self,
        phone_id: Option<&str>,
        registration_id: &str,
    ) -> Result<StatusReply, StatusError>;
}

pub struct ChatGuruClient {
    client: Client,
    base_url: String,
    api_key: String,
    account_id: String,
    protocol: ProtocolConfig,
}

impl ChatGuruClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::with_base_url(
            config.endpoint_url(),
            config.api_key.clone(),
            config.account_id.clone(),
            config.protocol.clone(),
        )
    }

    /// Create a client pointing at a custom endpoint URL (useful for testing).
    pub fn with_base_url(
        base_url: String,
        api_key: String,
        account_id: String,
        protocol: ProtocolConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            account_id,
            protocol,
        })
    }

    fn credentials<'a>(&'a self, action: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("action", action),
            ("key", self.api_key.as_str()),
            ("account_id", self.account_id.as_str()),
        ]
    }
}

impl RegistrationApi for ChatGuruClient {
    async fn submit(&self, contact: &ContactRequest) -> Result<String, RegistrationError> {
        let mut form = self.credentials(&self.protocol.submit_action);
        if let Some(phone_id) = contact.phone_id.as_deref() {
            form.push(("phone_id", phone_id));
        }
        form.push(("name", contact.name.as_str()));
        form.push(("chat_number", contact.chat_number.as_str()));
        form.push(("text", self.protocol.message_text.as_str()));
        if let Some(dialog_id) = contact.dialog_id.as_deref() {
            form.push(("dialog_id", dialog_id));
        }
        if let Some(user_id) = contact.user_id.as_deref() {
            form.push(("user_id", user_id));
        }

        debug!(url = %self.base_url, chat_number = %contact.chat_number, "submitting contact");
        let response = self.client.post(&self.base_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), %body, "submit response");

        if status.is_success() {
            let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            return text_field(&parsed, &self.protocol.id_field).ok_or(RegistrationError::MissingId);
        }

        if status == StatusCode::BAD_REQUEST {
            let description = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| text_field(&v, "description"))
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(RegistrationError::Rejected(description));
        }

        Err(RegistrationError::Http {
            status: status.as_u16(),
        })
    }

    async fn check_status(
        &self,
        phone_id: Option<&str>,
        registration_id: &str,
    ) -> Result<StatusReply, StatusError> {
        let mut form = self.credentials(&self.protocol.status_action);
        if let Some(phone_id) = phone_id {
            form.push(("phone_id", phone_id));
        }
        form.push((self.protocol.id_field.as_str(), registration_id));

        let response = self.client.post(&self.base_url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(%registration_id, %body, "status response");
        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| StatusError::InvalidBody(e.to_string()))?;
        let state = text_field(&parsed, &self.protocol.status_field).ok_or_else(|| {
            StatusError::InvalidBody(format!("missing `{}`", self.protocol.status_field))
        })?;
        let description = text_field(&parsed, &self.protocol.description_field).unwrap_or_default();

        Ok(StatusReply { state, description })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatGuruClient {
        ChatGuruClient::with_base_url(
            format!("{}/api/v1", server.uri()),
            "test-key".into(),
            "acc-1".into(),
            ProtocolConfig::default(),
        )
        .unwrap()
    }

    fn contact() -> ContactRequest {
        ContactRequest {
            name: "Maria".into(),
            chat_number: "5511999990000".into(),
            phone_id: Some("phone-1".into()),
            dialog_id: None,
            user_id: Some("user-9".into()),
        }
    }

    #[tokio::test]
    async fn submit_returns_registration_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("action=chat_add"))
            .and(body_string_contains("key=test-key"))
            .and(body_string_contains("chat_number=5511999990000"))
            .and(body_string_contains("user_id=user-9"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"result": "success", "chat_add_id": "reg-123"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server).submit(&contact()).await.unwrap();
        assert_eq!(id, "reg-123");
    }

    #[tokio::test]
    async fn submit_omits_blank_optional_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"chat_add_id": 77})))
            .mount(&server)
            .await;

        client_for(&server).submit(&contact()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(!body.contains("dialog_id"));
        assert!(body.contains("phone_id=phone-1"));
    }

    #[tokio::test]
    async fn submit_success_without_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "success"})))
            .mount(&server)
            .await;

        let err = client_for(&server).submit(&contact()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::MissingId));
    }

    #[tokio::test]
    async fn submit_bad_request_uses_server_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"result": "error", "description": "Chat já existe"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).submit(&contact()).await.unwrap_err();
        assert_eq!(err.to_string(), "Chat já existe");
    }

    #[tokio::test]
    async fn submit_bad_request_without_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = client_for(&server).submit(&contact()).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown error");
    }

    #[tokio::test]
    async fn submit_other_status_is_tagged_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server).submit(&contact()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Http { status: 502 }));
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn submit_transport_failure_is_reported() {
        let client = ChatGuruClient::with_base_url(
            "http://127.0.0.1:1/api/v1".into(),
            "k".into(),
            "a".into(),
            ProtocolConfig::default(),
        )
        .unwrap();

        let err = client.submit(&contact()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Transport(_)));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn check_status_parses_state_and_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("action=chat_add_status"))
            .and(body_string_contains("chat_add_id=reg-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chat_add_status": "done",
                "chat_add_status_description": "Chat criado"
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .check_status(Some("phone-1"), "reg-123")
            .await
            .unwrap();
        assert_eq!(reply.state, "done");
        assert_eq!(reply.description, "Chat criado");
        assert!(reply.is_terminal());
    }

    #[tokio::test]
    async fn check_status_non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .check_status(None, "reg-1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn check_status_without_state_field_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"foo": "bar"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .check_status(None, "reg-1")
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::InvalidBody(_)));
    }
}
