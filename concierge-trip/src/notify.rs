use concierge_core::airports::city_name;
use concierge_core::models::{Flight, Language, Reservation, ReservationView, SegmentView};
use concierge_core::providers::OutboundEmail;
use concierge_shared::Masked;
use tracing::{info, warn};

use crate::context::TripContext;
use crate::format::long_datetime;

/// Transactional emails. Delivery failures are logged and reported as `false`.
#[derive(Clone)]
pub struct Notifier {
    ctx: TripContext,
}

impl Notifier {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    pub async fn change_confirmation(&self, reservation: &Reservation, original: &Flight, new: &Flight) -> bool {
        let passenger = &reservation.passenger;
        let language = passenger.language;
        let code = &reservation.confirmation_code;
        let seat = reservation.first_segment().and_then(|s| s.seat.clone());

        let (subject, heading, intro, was, now) = match language {
            Language::Es => (
                format!("Cambio de Vuelo Confirmado - {}", code),
                "Cambio de Vuelo Confirmado",
                format!("Hola {}, su cambio de vuelo ha sido confirmado.", passenger.first_name),
                "Vuelo anterior",
                "Nuevo vuelo",
            ),
            Language::En => (
                format!("Flight Change Confirmed - {}", code),
                "Flight Change Confirmed",
                format!("Hi {}, your flight change has been confirmed.", passenger.first_name),
                "Previous flight",
                "New flight",
            ),
        };

        let summary = self
            .ctx
            .intents
            .change_summary(&SegmentView::of(original, None), &SegmentView::of(new, seat.clone()), language)
            .await;

        let html = page(
            heading,
            &[
                paragraph(&intro),
                paragraph(&summary.summary),
                section(was, &flight_rows(original, None, language)),
                section(now, &flight_rows(new, seat.as_deref(), language)),
                code_block(code, language),
            ],
        );
        self.deliver(&passenger.email, subject, html).await
    }

    /// Sent for bookings made through the voice agent.
    pub async fn booking_confirmation(&self, reservation: &Reservation) -> bool {
        let Some(flight) = reservation.first_flight() else {
            return false;
        };
        let passenger = &reservation.passenger;
        let language = passenger.language;
        let code = &reservation.confirmation_code;

        let (subject, heading, intro, details) = match language {
            Language::Es => (
                format!("Confirmación de Vuelo - {}", code),
                "¡Vuelo Confirmado!",
                format!("Hola {}, su reservación está confirmada.", passenger.full_name()),
                "Detalles de su Vuelo",
            ),
            Language::En => (
                format!("Flight Confirmation - {}", code),
                "Flight Confirmed!",
                format!("Hi {}, your booking is confirmed.", passenger.full_name()),
                "Your Flight Details",
            ),
        };
        let seat = match language {
            Language::Es => "Se asignará en el check-in",
            Language::En => "Will be assigned at check-in",
        };
        let summary = self.ctx.intents.trip_summary(&ReservationView::from(reservation), language).await;

        let html = page(
            heading,
            &[
                paragraph(&intro),
                paragraph(&summary.summary),
                section(details, &flight_rows(flight, Some(seat), language)),
                code_block(code, language),
            ],
        );
        self.deliver(&passenger.email, subject, html).await
    }

    /// Tells a registered family member that the passenger may miss the flight.
    pub async fn running_late_alert(
        &self,
        to: &Masked<String>,
        passenger_name: &str,
        flight_number: &str,
        message: &str,
    ) -> bool {
        let subject = format!("Alert: {} may be running late for flight {}", passenger_name, flight_number);
        let html = page(
            "Passenger Alert",
            &[
                paragraph(message),
                paragraph("You can follow their progress from your helper link."),
            ],
        );
        self.deliver(to, subject, html).await
    }

    async fn deliver(&self, to: &Masked<String>, subject: String, html: String) -> bool {
        let Some(mailer) = &self.ctx.vendors.mailer else {
            info!(%to, %subject, "Email not configured, skipping");
            return false;
        };
        let email = OutboundEmail { to: to.clone(), subject, html };
        match mailer.send(&email).await {
            Ok(id) => {
                info!(%to, message_id = %id, "Email delivered");
                true
            }
            Err(e) => {
                warn!(%to, "Email delivery failed: {}", e);
                false
            }
        }
    }
}

fn flight_rows(flight: &Flight, seat: Option<&str>, language: Language) -> Vec<(&'static str, String)> {
    let es = language.is_spanish();
    let mut rows = vec![
        (if es { "Vuelo" } else { "Flight" }, flight.flight_number.clone()),
        (if es { "Desde" } else { "From" }, format!("{} ({})", city_name(&flight.origin), flight.origin)),
        (if es { "Hacia" } else { "To" }, format!("{} ({})", city_name(&flight.destination), flight.destination)),
        (if es { "Salida" } else { "Departure" }, long_datetime(flight.departure_time, language)),
        (if es { "Llegada" } else { "Arrival" }, long_datetime(flight.arrival_time, language)),
        (if es { "Puerta" } else { "Gate" }, flight.gate.clone().unwrap_or_else(|| "TBD".to_string())),
    ];
    if let Some(seat) = seat {
        rows.push((if es { "Asiento" } else { "Seat" }, seat.to_string()));
    }
    rows
}

fn page(heading: &str, blocks: &[String]) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <div style=\"background: #0078d2; padding: 24px; text-align: center;\">\
         <h1 style=\"color: white; margin: 0; font-size: 28px;\">{}</h1></div>\
         <div style=\"padding: 24px; font-size: 18px;\">{}</div></div>",
        escape(heading),
        blocks.concat()
    )
}

fn paragraph(text: &str) -> String {
    format!("<p>{}</p>", escape(text))
}

fn section(title: &str, rows: &[(&str, String)]) -> String {
    let body: String = rows
        .iter()
        .map(|(label, value)| {
            format!("<tr><td><strong>{}</strong></td><td>{}</td></tr>", escape(label), escape(value))
        })
        .collect();
    format!("<h2>{}</h2><table cellpadding=\"6\">{}</table>", escape(title), body)
}

fn code_block(code: &str, language: Language) -> String {
    let label = if language.is_spanish() { "Código de confirmación" } else { "Confirmation code" };
    format!("<p>{}: <strong style=\"font-size: 24px; letter-spacing: 4px;\">{}</strong></p>", label, escape(code))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubMailer};
    use chrono::Utc;
    use concierge_core::demo::demo_reservation;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_change_email_in_passenger_language() {
        let mailer = Arc::new(StubMailer::default());
        let mut ctx = context();
        ctx.vendors.mailer = Some(mailer.clone());
        let notifier = Notifier::new(ctx);

        let reservation = demo_reservation("ABUELA1", Utc::now()).unwrap();
        let flight = reservation.first_flight().unwrap().clone();
        assert!(notifier.change_confirmation(&reservation, &flight, &flight).await);

        assert_eq!(mailer.subjects(), vec!["Cambio de Vuelo Confirmado - ABUELA1".to_string()]);
        let sent = mailer.sent.lock().unwrap();
        assert!(sent[0].html.contains("Nuevo vuelo"));
        assert!(sent[0].html.contains("Su vuelo ha sido cambiado. Cambios: ninguno."));
        assert_eq!(sent[0].to.expose(), "maria.garcia@example.com");
    }

    #[tokio::test]
    async fn test_without_mailer_reports_not_sent() {
        let notifier = Notifier::new(context());
        let reservation = demo_reservation("DEMO123", Utc::now()).unwrap();
        let flight = reservation.first_flight().unwrap().clone();
        assert!(!notifier.change_confirmation(&reservation, &flight, &flight).await);
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(paragraph("<b>&"), "<p>&lt;b&gt;&amp;</p>");
    }
}
