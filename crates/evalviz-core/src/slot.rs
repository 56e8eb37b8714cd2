//! Sequence-tagged request slots.
//!
//! Every logical request (dataset load, attention load, each query run) owns
//! one slot. Issuing a request hands out a ticket; only the completion that
//! carries the slot's latest ticket is applied.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SlotState<T> {
    #[default]
    Idle,
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> SlotState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestSlot<T> {
    name: &'static str,
    latest: u64,
    state: SlotState<T>,
}

impl<T> RequestSlot<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            latest: 0,
            state: SlotState::Idle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> &SlotState<T> {
        &self.state
    }

    /// Marks the slot pending and supersedes any outstanding ticket.
    pub fn begin(&mut self) -> Ticket {
        self.latest += 1;
        self.state = SlotState::Pending;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }

    /// Applies a completion. Returns `false` if the ticket was superseded and
    /// the result dropped.
    pub fn complete<E: std::fmt::Display>(&mut self, ticket: Ticket, result: Result<T, E>) -> bool {
        if !self.is_current(ticket) {
            debug!(
                slot = self.name,
                ticket = ticket.0,
                latest = self.latest,
                "dropping stale response"
            );
            return false;
        }
        self.state = match result {
            Ok(v) => SlotState::Ready(v),
            Err(e) => SlotState::Failed(e.to_string()),
        };
        true
    }

    /// Back to idle; outstanding tickets become stale.
    pub fn reset(&mut self) {
        self.latest += 1;
        self.state = SlotState::Idle;
    }
}
