//! Discarding results of superseded queries.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket identifying one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryTicket(u64);

/// Hands out monotonically increasing tickets; only the newest is current.
///
/// A component issues a ticket before starting a query and calls
/// [`QuerySequencer::accept`] with the result. Results of any query that has
/// since been superseded are dropped instead of rendered.
#[derive(Debug, Default)]
pub struct QuerySequencer {
    latest: AtomicU64,
}

impl QuerySequencer {
    /// Creates a sequencer with no queries issued.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Issues a ticket, superseding every earlier one.
    pub fn issue(&self) -> QueryTicket {
        QueryTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the newest.
    #[must_use]
    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Returns `result` if its ticket is still current, `None` otherwise.
    pub fn accept<T>(&self, ticket: QueryTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            metrics::counter!("superseded_results_total").increment(1);
            tracing::debug!(ticket = ticket.0, "Discarding superseded result");
            None
        }
    }
}
