//! Trip workflows: the conversation engine, changes and bookings, family
//! helpers, live location, reminders and disruptions.

pub mod alerts;
pub mod calls;
pub mod context;
pub mod conversation;
pub mod disruption;
pub mod error;
pub mod family;
pub mod flights;
pub mod format;
pub mod handoff;
pub mod helper;
pub mod journey;
pub mod location;
pub mod notify;
pub mod reminders;
pub mod reservations;
pub mod tools;
pub mod voice;

#[cfg(test)]
mod testing;

pub use alerts::{AlertOutcome, LocationAlerts};
pub use calls::{verify_signature, CallEvents};
pub use context::TripContext;
pub use conversation::{ConversationEngine, SessionView, StartReply, TurnReply};
pub use disruption::{DisruptionManager, DisruptionReport, StatusUpdate};
pub use error::{ActionError, TransitionError, TripError, TripResult};
pub use family::{ActionOutcome, FamilyActions};
pub use flights::FlightCatalog;
pub use handoff::HandoffDesk;
pub use helper::{HelperLink, HelperLinks};
pub use location::{geofence_status, LocationMetrics, LocationTracker, LocationUpdate};
pub use notify::Notifier;
pub use reminders::{ReminderKind, ReminderResult, Reminders};
pub use reservations::{FlightChange, ReservationService};
pub use tools::VoiceTools;
pub use voice::{SpeechResult, VoiceService};
