use concierge_core::CoreError;

/// Failures surfaced to API callers. Messages are user-facing.
#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Session or helper link past its expiry.
    #[error("{0}")]
    Expired(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TripError {
    pub fn validation(message: impl Into<String>) -> Self {
        TripError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        TripError::NotFound(message.into())
    }
}

pub type TripResult<T> = Result<T, TripError>;

#[derive(Debug, thiserror::Error)]
#[error("Invalid state transition from {from} to {to}")]
pub struct TransitionError {
    pub from: String,
    pub to: String,
}

/// Why a family action was rejected. The text is stored on the failed action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("No reservation found")]
    NoReservation,

    #[error("No flight segment found")]
    NoSegment,

    #[error("New flight not found")]
    NewFlightNotFound,

    #[error("Reservation already cancelled")]
    AlreadyCancelled,

    #[error("Flight segment not found")]
    SegmentNotFound,

    #[error("Unknown action type: {0}")]
    UnknownType(String),

    #[error("Seat is required")]
    SeatRequired,

    #[error(transparent)]
    Core(#[from] CoreError),
}
