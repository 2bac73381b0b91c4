//! # Payment Notifications
//!
//! Best-effort observer hook fired after a payment allocation commits.
//! Delivery is fire-and-forget: a notifier can log, enqueue an SMS, or do
//! nothing, and none of that affects the committed allocation.

use tracing::info;

/// What happened to one incoming payment, after commit.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub customer_id: String,
    /// Amount the caller submitted, in cents.
    pub payment_cents: i64,
    /// Portion applied to outstanding transactions.
    pub allocated_cents: i64,
    /// Unapplied excess, dropped by policy.
    pub discarded_cents: i64,
    /// How many transactions became fully paid in this allocation.
    pub settled_count: usize,
}

/// Observer for committed payment allocations.
///
/// Implementations must not block for long and must not fail loudly; the
/// allocation is already durable by the time this fires.
pub trait Notifier: Send + Sync {
    fn payment_recorded(&self, event: &PaymentEvent);
}

/// Default notifier: structured log line per allocation.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn payment_recorded(&self, event: &PaymentEvent) {
        info!(
            customer_id = %event.customer_id,
            payment_cents = event.payment_cents,
            allocated_cents = event.allocated_cents,
            discarded_cents = event.discarded_cents,
            settled_count = event.settled_count,
            "Payment recorded"
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures events for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub events: Mutex<Vec<PaymentEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn payment_recorded(&self, event: &PaymentEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
