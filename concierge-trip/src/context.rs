use std::sync::Arc;

use chrono::Utc;
use concierge_assist::IntentService;
use concierge_core::models::{Message, Session, SessionState};
use concierge_core::providers::KeyValueCache;
use concierge_core::repository::ConciergeStore;
use concierge_shared::models::events::{
    ConciergeEvent, MessageAppendedEvent, SessionStateChangedEvent,
};
use concierge_store::app_config::BusinessRules;
use concierge_store::{EventBus, InMemoryCache, InMemoryStore};
use concierge_vendors::VendorSet;
use uuid::Uuid;

use crate::error::{TripError, TripResult};

/// Shared handles every trip workflow runs against. Cloning is cheap.
#[derive(Clone)]
pub struct TripContext {
    pub store: Arc<dyn ConciergeStore>,
    pub cache: Arc<dyn KeyValueCache>,
    pub vendors: VendorSet,
    pub intents: Arc<IntentService>,
    pub events: EventBus,
    pub rules: BusinessRules,
}

impl TripContext {
    pub fn new(
        store: Arc<dyn ConciergeStore>,
        cache: Arc<dyn KeyValueCache>,
        vendors: VendorSet,
        rules: BusinessRules,
    ) -> Self {
        let intents = Arc::new(IntentService::new(vendors.language_model.clone()));
        Self { store, cache, vendors, intents, events: EventBus::default(), rules }
    }

    /// In-memory store and cache, no vendors.
    pub fn in_memory(rules: BusinessRules) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryCache::new()),
            VendorSet::offline(),
            rules,
        )
    }

    pub fn with_vendors(mut self, vendors: VendorSet) -> Self {
        self.intents = Arc::new(IntentService::new(vendors.language_model.clone()));
        self.vendors = vendors;
        self
    }

    pub(crate) async fn session(&self, id: Uuid) -> TripResult<Session> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| TripError::not_found("Session not found"))
    }

    /// Persists a transcript entry and tells subscribers about it.
    pub(crate) async fn append(&self, message: &Message) -> TripResult<()> {
        self.store.append_message(message).await?;
        self.events.publish(ConciergeEvent::MessageAppended(MessageAppendedEvent {
            session_id: message.session_id,
            message_id: message.id,
            role: message.role.to_string(),
            content: message.content.clone(),
            timestamp: message.timestamp.timestamp(),
        }));
        Ok(())
    }

    /// Moves the session to `to`, announcing real changes. Does not persist.
    pub(crate) fn transition(&self, session: &mut Session, to: SessionState) {
        if session.state == to {
            return;
        }
        let from = session.state;
        session.state = to;
        self.events.publish(ConciergeEvent::SessionStateChanged(SessionStateChangedEvent {
            session_id: session.id,
            from: from.to_string(),
            to: to.to_string(),
            timestamp: Utc::now().timestamp(),
        }));
    }
}
