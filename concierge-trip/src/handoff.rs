use chrono::{DateTime, Utc};
use concierge_core::models::{
    HandoffDossier, HandoffPriority, HandoffStatus, Message, MessageRole, Reservation, Session,
};
use concierge_shared::models::events::{ConciergeEvent, HandoffUpdatedEvent};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::context::TripContext;
use crate::error::{TransitionError, TripError, TripResult};

/// Whole words; a trailing `*` marks a stem ("thank*" covers "thankful").
const POSITIVE: &[&str] = &[
    "thank*", "great", "perfect", "good", "wonderful", "happy", "excellent", "love", "lovely",
    "gracias", "perfecto", "bueno", "buena", "excelente", "genial", "feliz", "maravilloso",
];

const NEGATIVE: &[&str] = &[
    "angry", "upset", "frustrat*", "terrible", "awful", "bad", "confus*", "worried", "worry",
    "scared", "ridiculous", "hate", "problem", "problems", "wrong", "lost", "late", "help",
    "molesto", "molesta", "enojado", "enojada", "frustrad*", "mal", "confundid*", "preocupad*",
    "perdido", "perdida", "problema", "ayuda", "tarde",
];

fn in_lexicon(lexicon: &[&str], word: &str) -> bool {
    lexicon.iter().any(|entry| match entry.strip_suffix('*') {
        Some(stem) => word.starts_with(stem),
        None => word == *entry,
    })
}

/// Lexicon score over user messages in [-1, 1]; 0 when no word matches.
pub fn sentiment_score(messages: &[Message]) -> f64 {
    let (mut positive, mut negative) = (0i32, 0i32);
    for message in messages.iter().filter(|m| m.role == MessageRole::User) {
        for word in message.content.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            if in_lexicon(POSITIVE, word) {
                positive += 1;
            } else if in_lexicon(NEGATIVE, word) {
                negative += 1;
            }
        }
    }
    let matched = positive + negative;
    if matched == 0 {
        return 0.0;
    }
    ((positive - negative) as f64 / matched as f64).clamp(-1.0, 1.0)
}

pub fn priority_for(sentiment: f64, reservation: Option<&Reservation>, now: DateTime<Utc>) -> HandoffPriority {
    let flight = reservation.and_then(|r| r.first_flight());
    let minutes = flight.map(|f| f.minutes_until_departure(now));
    let disrupted = flight.is_some_and(|f| f.status.is_disruption());
    let departs_within = |hours: i64| minutes.is_some_and(|m| (0..=hours * 60).contains(&m));

    if departs_within(2) || disrupted || sentiment <= -0.6 {
        HandoffPriority::Urgent
    } else if sentiment < -0.3 || departs_within(24) {
        HandoffPriority::High
    } else if sentiment > 0.3 {
        HandoffPriority::Low
    } else {
        HandoffPriority::Medium
    }
}

/// Dossiers for the human agent console.
#[derive(Clone)]
pub struct HandoffDesk {
    ctx: TripContext,
}

impl HandoffDesk {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// Opens a dossier for the session, or returns the one already open.
    pub async fn request(&self, session_id: Uuid, reason: &str) -> TripResult<HandoffDossier> {
        let session = self.ctx.session(session_id).await?;
        if let Some(open) = self.ctx.store.open_dossier_for_session(session_id).await? {
            return Ok(open);
        }

        let transcript = self.ctx.store.list_messages(session_id).await?;
        let reservation = match session.reservation_id {
            Some(id) => self.ctx.store.get_reservation(id).await?,
            None => None,
        };
        let now = Utc::now();
        let sentiment = sentiment_score(&transcript);
        let priority = priority_for(sentiment, reservation.as_ref(), now);

        let dossier = HandoffDossier {
            id: Uuid::new_v4(),
            session_id,
            status: HandoffStatus::Pending,
            priority,
            sentiment_score: sentiment,
            reason: if reason.trim().is_empty() { "Passenger requested an agent".to_string() } else { reason.trim().to_string() },
            summary: summarize(&session, reservation.as_ref(), &transcript),
            metadata: metadata(&session, reservation.as_ref()),
            transcript,
            assigned_agent: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        };
        self.ctx.store.save_dossier(&dossier).await?;
        info!(dossier_id = %dossier.id, %session_id, priority = %priority, "Handoff requested");
        self.announce(&dossier);
        Ok(dossier)
    }

    /// Most urgent first, then oldest first.
    pub async fn list(&self, status: Option<HandoffStatus>) -> TripResult<Vec<HandoffDossier>> {
        let mut dossiers = self.ctx.store.list_dossiers(status).await?;
        dossiers.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(dossiers)
    }

    /// The dossier with its transcript brought up to date.
    pub async fn get(&self, id: Uuid) -> TripResult<HandoffDossier> {
        let mut dossier = self.load(id).await?;
        dossier.transcript = self.ctx.store.list_messages(dossier.session_id).await?;
        Ok(dossier)
    }

    pub async fn accept(&self, id: Uuid, agent: &str) -> TripResult<HandoffDossier> {
        let mut dossier = self.load(id).await?;
        ensure(&dossier, &[HandoffStatus::Pending], "accepted")?;
        dossier.status = HandoffStatus::Accepted;
        dossier.assigned_agent = Some(agent.to_string());
        self.store(dossier).await
    }

    /// An agent message into the passenger's conversation.
    pub async fn reply(&self, id: Uuid, content: &str) -> TripResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TripError::validation("message is required"));
        }
        let dossier = self.load(id).await?;
        ensure(&dossier, &[HandoffStatus::Accepted], "reply")?;

        let message = Message::new(dossier.session_id, MessageRole::Agent, content);
        self.ctx.append(&message).await?;
        Ok(message)
    }

    pub async fn resolve(&self, id: Uuid, notes: Option<&str>) -> TripResult<HandoffDossier> {
        let mut dossier = self.load(id).await?;
        ensure(&dossier, &[HandoffStatus::Pending, HandoffStatus::Accepted], "resolved")?;
        dossier.status = HandoffStatus::Resolved;
        dossier.resolution_notes = notes.map(str::to_string);
        self.store(dossier).await
    }

    async fn load(&self, id: Uuid) -> TripResult<HandoffDossier> {
        self.ctx
            .store
            .get_dossier(id)
            .await?
            .ok_or_else(|| TripError::not_found("Handoff not found"))
    }

    async fn store(&self, mut dossier: HandoffDossier) -> TripResult<HandoffDossier> {
        dossier.updated_at = Utc::now();
        self.ctx.store.save_dossier(&dossier).await?;
        info!(dossier_id = %dossier.id, status = %dossier.status, "Handoff updated");
        self.announce(&dossier);
        Ok(dossier)
    }

    fn announce(&self, dossier: &HandoffDossier) {
        self.ctx.events.publish(ConciergeEvent::HandoffUpdated(HandoffUpdatedEvent {
            dossier_id: dossier.id,
            session_id: dossier.session_id,
            status: dossier.status.to_string(),
            priority: dossier.priority.to_string(),
            timestamp: dossier.updated_at.timestamp(),
        }));
    }
}

fn ensure(dossier: &HandoffDossier, allowed: &[HandoffStatus], to: &str) -> Result<(), TransitionError> {
    if allowed.contains(&dossier.status) {
        Ok(())
    } else {
        Err(TransitionError { from: dossier.status.to_string(), to: to.to_string() })
    }
}

fn summarize(session: &Session, reservation: Option<&Reservation>, transcript: &[Message]) -> String {
    let mut parts = Vec::new();
    match reservation {
        Some(r) => {
            parts.push(format!("{} ({})", r.passenger.full_name(), r.confirmation_code));
            if let Some(f) = r.first_flight() {
                parts.push(format!(
                    "{} {} to {} ({}), status {}",
                    f.flight_number,
                    f.origin_city(),
                    f.destination_city(),
                    f.departure_time.format("%b %d %H:%M UTC"),
                    f.status
                ));
            }
        }
        None => parts.push("No reservation identified".to_string()),
    }
    parts.push(format!("Conversation state: {}", session.state));
    if let Some(last) = transcript.iter().rev().find(|m| m.role == MessageRole::User) {
        parts.push(format!("Last request: \"{}\"", last.content));
    }
    parts.join(". ")
}

fn metadata(session: &Session, reservation: Option<&Reservation>) -> serde_json::Value {
    let passenger = reservation.map(|r| &r.passenger);
    json!({
        "passenger_name": passenger.map(|p| p.full_name()),
        "phone": passenger.and_then(|p| p.phone.as_ref()).map(|p| p.hint()),
        "language": session.language().or(passenger.map(|p| p.language)).unwrap_or_default(),
        "confirmation_code": reservation.map(|r| r.confirmation_code.clone()),
        "session_state": session.state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded, session_for};
    use chrono::Duration;
    use concierge_core::demo::demo_reservation;

    fn user(text: &str) -> Message {
        Message::new(Uuid::nil(), MessageRole::User, text)
    }

    #[test]
    fn test_sentiment_score() {
        assert_eq!(sentiment_score(&[]), 0.0);
        assert_eq!(sentiment_score(&[user("I am so frustrated and confused")]), -1.0);
        assert_eq!(sentiment_score(&[user("Gracias, perfecto")]), 1.0);
        assert_eq!(sentiment_score(&[user("thanks but I'm worried")]), 0.0);

        let assistant = Message::new(Uuid::nil(), MessageRole::Assistant, "terrible");
        assert_eq!(sentiment_score(&[assistant]), 0.0);
    }

    #[test]
    fn test_sentiment_matches_whole_words() {
        // "help" and "late" must not match inside longer words
        assert_eq!(sentiment_score(&[user("You were very helpful, see you later")]), 0.0);
        assert_eq!(sentiment_score(&[user("Tengo una maleta, goodbye")]), 0.0);
        assert_eq!(sentiment_score(&[user("I'm thankful")]), 1.0);
        assert_eq!(sentiment_score(&[user("Estoy preocupada")]), -1.0);
    }

    #[test]
    fn test_priority_rules() {
        let now = Utc::now();
        // DEMO123 departs in a day and a half
        let later = demo_reservation("DEMO123", now).unwrap();
        assert_eq!(priority_for(0.0, Some(&later), now), HandoffPriority::Medium);
        assert_eq!(priority_for(0.5, Some(&later), now), HandoffPriority::Low);
        assert_eq!(priority_for(-0.4, Some(&later), now), HandoffPriority::High);
        assert_eq!(priority_for(-0.6, None, now), HandoffPriority::Urgent);

        assert_eq!(priority_for(0.0, Some(&later), now + Duration::hours(20)), HandoffPriority::High);
        assert_eq!(priority_for(0.9, Some(&later), now + Duration::hours(37)), HandoffPriority::Urgent);
    }

    #[tokio::test]
    async fn test_request_reuses_open_dossier() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let session = session_for(&ctx, &reservation).await;
        ctx.store.append_message(&Message::new(session.id, MessageRole::User, "I need a person")).await.unwrap();
        let desk = HandoffDesk::new(ctx);

        let first = desk.request(session.id, "Passenger asked for an agent").await.unwrap();
        let second = desk.request(session.id, "again").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.transcript.len(), 1);
        assert!(first.summary.contains("Margaret Johnson (DEMO123)"));
        assert!(first.summary.contains("Last request: \"I need a person\""));
        assert_eq!(first.metadata["phone"], "********0123");
        assert_eq!(first.metadata["confirmation_code"], "DEMO123");
    }

    #[tokio::test]
    async fn test_lifecycle_and_invalid_transitions() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let session = session_for(&ctx, &reservation).await;
        let desk = HandoffDesk::new(ctx.clone());
        let dossier = desk.request(session.id, "help").await.unwrap();

        assert!(matches!(desk.reply(dossier.id, "Hello").await, Err(TripError::Transition(_))));

        let accepted = desk.accept(dossier.id, "agent.smith").await.unwrap();
        assert_eq!(accepted.assigned_agent.as_deref(), Some("agent.smith"));
        assert!(matches!(desk.accept(dossier.id, "other").await, Err(TripError::Transition(_))));

        desk.reply(dossier.id, "Hi Margaret, I'm here to help.").await.unwrap();
        assert_eq!(desk.get(dossier.id).await.unwrap().transcript.last().unwrap().role, MessageRole::Agent);

        let resolved = desk.resolve(dossier.id, Some("Rebooked")).await.unwrap();
        assert_eq!(resolved.status, HandoffStatus::Resolved);
        assert!(matches!(desk.resolve(dossier.id, None).await, Err(TripError::Transition(_))));

        // A resolved dossier no longer blocks a new request
        let next = desk.request(session.id, "again").await.unwrap();
        assert_ne!(next.id, dossier.id);
    }

    #[tokio::test]
    async fn test_list_orders_by_priority() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let calm = session_for(&ctx, &reservation).await;
        let upset = session_for(&ctx, &reservation).await;
        ctx.store.append_message(&Message::new(upset.id, MessageRole::User, "This is terrible, I'm angry")).await.unwrap();
        let desk = HandoffDesk::new(ctx);

        desk.request(calm.id, "").await.unwrap();
        desk.request(upset.id, "").await.unwrap();

        let listed = desk.list(None).await.unwrap();
        assert_eq!(listed[0].session_id, upset.id);
        assert_eq!(listed[0].priority, HandoffPriority::Urgent);
    }
}
