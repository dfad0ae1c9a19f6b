//! Discarding results that arrive after the requester has moved on.
//!
//! A [`Generation`] is owned by whoever displays results. Each batch of work
//! takes a [`Ticket`]; advancing the generation makes every earlier ticket
//! stale, and [`Ticket::apply`] drops values produced under a stale ticket.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for the current generation.
    pub fn ticket(&self) -> Ticket {
        Ticket { current: Arc::clone(&self.current), issued: self.current.load(Ordering::Acquire) }
    }

    /// Invalidate all outstanding tickets and return one for the new generation.
    pub fn advance(&self) -> Ticket {
        let issued = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        Ticket { current: Arc::clone(&self.current), issued }
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    current: Arc<AtomicU64>,
    issued: u64,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.issued
    }

    /// `Some(value)` while the ticket is current, `None` once it went stale.
    pub fn apply<T>(&self, value: T) -> Option<T> {
        if self.is_current() { Some(value) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ticket_is_current() {
        let generation = Generation::new();
        let ticket = generation.ticket();
        assert!(ticket.is_current());
        assert_eq!(ticket.apply(5), Some(5));
    }

    #[test]
    fn test_advance_invalidates_older_tickets() {
        let generation = Generation::new();
        let first = generation.ticket();
        let second = generation.advance();

        assert!(!first.is_current());
        assert_eq!(first.apply("stale"), None);
        assert!(second.is_current());
        assert_eq!(generation.ticket().apply(1), Some(1));
    }

    #[test]
    fn test_clones_share_generation() {
        let generation = Generation::new();
        let ticket = generation.ticket();
        generation.clone().advance();
        assert!(!ticket.is_current());
    }

    #[tokio::test]
    async fn test_late_result_is_dropped() {
        let generation = Generation::new();
        let ticket = generation.ticket();

        let work = tokio::spawn(async move {
            tokio::task::yield_now().await;
            ticket.apply("late result")
        });
        generation.advance();

        assert_eq!(work.await.unwrap(), None);
    }
}
