use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use concierge_core::models::{Message, MessageRole, Session};
use concierge_shared::models::events::ConciergeEvent;
use rand::RngCore;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::context::TripContext;
use crate::conversation::{ConversationEngine, SessionView};
use crate::error::{TripError, TripResult};

const TOKEN_BYTES: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct HelperLink {
    pub helper_link: String,
    /// Full URL when a public base URL is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_url: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Time-limited family access to a session. A link lives exactly as long as
/// its session.
#[derive(Clone)]
pub struct HelperLinks {
    ctx: TripContext,
}

impl HelperLinks {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    pub async fn create_link(&self, session_id: Uuid) -> TripResult<HelperLink> {
        let mut session = self.ctx.session(session_id).await?;
        let created = self.ensure_link(&mut session);
        if created {
            self.ctx.store.save_session(&session).await?;
        }
        Ok(self.describe(&session))
    }

    /// Gives the session a token if it has none. True when one was created.
    pub fn ensure_link(&self, session: &mut Session) -> bool {
        if session.helper_link.is_some() {
            return false;
        }
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        session.helper_link = Some(URL_SAFE_NO_PAD.encode(bytes));
        info!(session_id = %session.id, "Helper link created");
        true
    }

    pub fn describe(&self, session: &Session) -> HelperLink {
        let token = session.helper_link.clone().unwrap_or_default();
        HelperLink {
            helper_url: self.url_for(&token),
            helper_link: token,
            expires_at: session.expires_at,
        }
    }

    pub fn url_for(&self, token: &str) -> Option<String> {
        self.ctx
            .rules
            .helper_link_base_url
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), token))
    }

    /// The live session behind a link.
    pub async fn resolve(&self, link: &str) -> TripResult<Session> {
        let session = self
            .ctx
            .store
            .find_by_helper_link(link.trim())
            .await?
            .ok_or_else(|| TripError::not_found("Helper link not found or expired"))?;
        if session.is_expired_at(Utc::now()) {
            return Err(TripError::Expired("Helper link has expired".to_string()));
        }
        Ok(session)
    }

    pub async fn view(&self, link: &str) -> TripResult<SessionView> {
        let session = self.resolve(link).await?;
        ConversationEngine::new(self.ctx.clone()).view(&session).await
    }

    /// A family member's suggestion, shown to the passenger as a family message.
    pub async fn suggest(&self, link: &str, text: &str) -> TripResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TripError::validation("message is required"));
        }
        let session = self.resolve(link).await?;
        let message = Message::new(session.id, MessageRole::Family, text);
        self.ctx.append(&message).await?;
        Ok(message)
    }

    /// Where running-late alerts for this session are emailed.
    pub async fn register_email(&self, link: &str, email: &str) -> TripResult<()> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(TripError::validation("A valid email is required"));
        }
        let mut session = self.resolve(link).await?;
        session.set_context("helper_email", json!(email));
        self.ctx.store.save_session(&session).await?;
        info!(session_id = %session.id, "Helper email registered");
        Ok(())
    }

    /// Event stream for the session behind a link. Callers filter with
    /// [`ConciergeEvent::concerns_session`].
    pub async fn subscribe(&self, link: &str) -> TripResult<(Uuid, broadcast::Receiver<ConciergeEvent>)> {
        let session = self.resolve(link).await?;
        Ok((session.id, self.ctx.events.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded, session_for};
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_link_is_stable() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let mut session = Session::new(Duration::minutes(30));
        session.reservation_id = Some(reservation.id);
        ctx.store.save_session(&session).await.unwrap();
        let links = HelperLinks::new(ctx);

        let first = links.create_link(session.id).await.unwrap();
        let second = links.create_link(session.id).await.unwrap();

        assert_eq!(first.helper_link, second.helper_link);
        assert_eq!(first.helper_link.len(), 11);
        assert_eq!(first.expires_at, session.expires_at);
        assert!(first.helper_url.is_none());
    }

    #[tokio::test]
    async fn test_view_and_suggest() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let session = session_for(&ctx, &reservation).await;
        let link = session.helper_link.clone().unwrap();
        let links = HelperLinks::new(ctx.clone());

        links.suggest(&link, "Take the 2pm flight, Mom").await.unwrap();
        let view = links.view(&link).await.unwrap();

        assert_eq!(view.reservation.unwrap().confirmation_code, "DEMO123");
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].role, MessageRole::Family);
        assert!(matches!(links.suggest(&link, " ").await, Err(TripError::Validation(_))));
    }

    #[tokio::test]
    async fn test_expired_and_unknown_links() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let mut session = session_for(&ctx, &reservation).await;
        session.expires_at = Utc::now() - Duration::minutes(1);
        ctx.store.save_session(&session).await.unwrap();
        let links = HelperLinks::new(ctx);

        let err = links.view(session.helper_link.as_deref().unwrap()).await.unwrap_err();
        assert!(matches!(err, TripError::Expired(_)));
        let err = links.view("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Helper link not found or expired");
    }

    #[tokio::test]
    async fn test_register_email() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let session = session_for(&ctx, &reservation).await;
        let links = HelperLinks::new(ctx.clone());

        links.register_email(session.helper_link.as_deref().unwrap(), "son@example.com").await.unwrap();
        let stored = ctx.store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.context_str("helper_email"), Some("son@example.com"));
    }
}
