use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::state::AppState;

/// Prometheus counters for the HTTP surface and the outbound alerting paths.
pub struct Metrics {
    registry: Registry,
    pub http_requests: IntCounterVec,
    pub alerts: IntCounterVec,
    pub reminders: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let http_requests = counter(&registry, "concierge_http_requests_total", "HTTP requests by route and status", &["route", "status"]);
        let alerts = counter(&registry, "concierge_location_alerts_total", "Location alerts raised by type", &["alert_type"]);
        let reminders = counter(&registry, "concierge_reminders_total", "Reminder call attempts by type and outcome", &["reminder_type", "status"]);
        Self { registry, http_requests, alerts, reminders }
    }

    pub fn record_alert(&self, alert_type: &str) {
        self.alerts.with_label_values(&[alert_type]).inc();
    }

    pub fn record_reminder(&self, reminder_type: &str, status: &str) {
        self.reminders.with_label_values(&[reminder_type, status]).inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels).expect("valid metric definition");
    registry.register(Box::new(counter.clone())).expect("metric registered once");
    counter
}

/// Counts requests by matched route template, so path ids do not explode the label set.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(req).await;
    state
        .metrics
        .http_requests
        .with_label_values(&[route.as_str(), response.status().as_str()])
        .inc();
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = Metrics::new();
        metrics.record_alert("running_late");
        metrics.record_reminder("gate_closing", "called");
        metrics.http_requests.with_label_values(&["/health", "200"]).inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("concierge_location_alerts_total{alert_type=\"running_late\"} 1"));
        assert!(text.contains("concierge_reminders_total{reminder_type=\"gate_closing\",status=\"called\"} 1"));
        assert!(text.contains("concierge_http_requests_total{route=\"/health\",status=\"200\"} 1"));
    }
}
