use std::time::Duration;

use concierge_trip::Reminders;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::state::AppState;

/// Places due reminder calls every `reminder_interval_seconds`.
pub async fn start_reminder_worker(state: AppState) {
    let every = Duration::from_secs(state.trip.rules.reminder_interval_seconds.max(1));
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Reminder worker started, checking every {}s", every.as_secs());

    loop {
        ticker.tick().await;
        match Reminders::new(state.trip.clone()).run_due().await {
            Ok(results) if results.is_empty() => {}
            Ok(results) => {
                crate::reminders::record(&state, &results);
                info!(count = results.len(), "Reminder calls processed");
            }
            Err(e) => error!("Reminder run failed: {}", e),
        }
    }
}
