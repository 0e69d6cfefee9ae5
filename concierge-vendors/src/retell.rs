use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::providers::{CallPlacer, OutboundCall, ProviderError, ProviderResult};
use concierge_store::app_config::RetellConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::http;
use crate::resiliency::CircuitBreaker;

const PROVIDER: &str = "retell";

#[derive(Debug, Serialize)]
struct CreatePhoneCall<'a> {
    from_number: &'a str,
    to_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_agent_id: Option<&'a str>,
    retell_llm_dynamic_variables: BTreeMap<String, String>,
    metadata: Value,
}

#[derive(Debug, Deserialize)]
struct PhoneCallResponse {
    call_id: String,
}

pub struct RetellClient {
    client: reqwest::Client,
    api_key: String,
    agent_id: Option<String>,
    from_number: String,
    base_url: String,
    breaker: CircuitBreaker,
}

impl RetellClient {
    /// Needs both an API key and a caller id.
    pub fn from_config(config: &RetellConfig) -> Option<Arc<Self>> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        let from_number = config.from_number.clone().filter(|n| !n.is_empty())?;
        info!("Initialized Retell client");

        Some(Arc::new(Self {
            client: http::client(http::DEFAULT_TIMEOUT),
            api_key,
            agent_id: config.agent_id.clone(),
            from_number,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker: CircuitBreaker::for_vendor(PROVIDER),
        }))
    }

    async fn create_phone_call(&self, call: &OutboundCall) -> ProviderResult<String> {
        let url = format!("{}/v2/create-phone-call", self.base_url);
        let body = CreatePhoneCall {
            from_number: &self.from_number,
            to_number: call.to_number.expose().as_str(),
            override_agent_id: self.agent_id.as_deref(),
            retell_llm_dynamic_variables: string_variables(&call.dynamic_variables),
            metadata: serde_json::json!({
                "first_message": call.first_message,
                "language": call.language,
            }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, e))?;

        let response = http::ensure_success(PROVIDER, response).await?;
        let created: PhoneCallResponse = http::json(PROVIDER, response).await?;
        info!(to = %call.to_number, call_id = %created.call_id, "Retell outbound call initiated");
        Ok(created.call_id)
    }
}

/// Retell only accepts string values for prompt variables.
fn string_variables(variables: &Value) -> BTreeMap<String, String> {
    let Some(map) = variables.as_object() else {
        return BTreeMap::new();
    };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}

#[async_trait]
impl CallPlacer for RetellClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn place_call(&self, call: &OutboundCall) -> ProviderResult<String> {
        if call.to_number.expose().is_empty() {
            return Err(ProviderError::NotConfigured("passenger phone number"));
        }
        self.breaker.call(|| self.create_phone_call(call)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dynamic_variables_become_strings() {
        let vars = string_variables(&json!({
            "passenger_name": "Margaret",
            "minutes": 30,
            "gate": null,
        }));
        assert_eq!(vars.get("passenger_name").map(String::as_str), Some("Margaret"));
        assert_eq!(vars.get("minutes").map(String::as_str), Some("30"));
        assert!(!vars.contains_key("gate"));
        assert!(string_variables(&json!("nope")).is_empty());
    }

    #[test]
    fn test_requires_key_and_number() {
        let mut config = RetellConfig { api_key: Some("key".to_string()), ..Default::default() };
        assert!(RetellClient::from_config(&config).is_none());

        config.from_number = Some("+18005550100".to_string());
        assert!(RetellClient::from_config(&config).is_some());
    }
}
