use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::providers::{Mailer, OutboundEmail, ProviderResult};
use concierge_store::app_config::ResendConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http;
use crate::resiliency::CircuitBreaker;

const PROVIDER: &str = "resend";

#[derive(Debug, Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    id: String,
}

pub struct ResendClient {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    base_url: String,
    breaker: CircuitBreaker,
}

impl ResendClient {
    pub fn from_config(config: &ResendConfig) -> Option<Arc<Self>> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        info!(from = %config.from_email, "Initialized Resend client");
        Some(Arc::new(Self {
            client: http::client(http::DEFAULT_TIMEOUT),
            api_key,
            from_email: config.from_email.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker: CircuitBreaker::for_vendor(PROVIDER),
        }))
    }

    async fn post_email(&self, email: &OutboundEmail) -> ProviderResult<String> {
        let body = SendEmail {
            from: &self.from_email,
            to: [email.to.expose().as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, e))?;

        let response = http::ensure_success(PROVIDER, response).await?;
        let sent: SendEmailResponse = http::json(PROVIDER, response).await?;
        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(sent.id)
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, email: &OutboundEmail) -> ProviderResult<String> {
        self.breaker.call(|| self.post_email(email)).await
    }
}
