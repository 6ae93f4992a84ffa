//! Page state definitions for tracking crawl progress
//!
//! Every page of a run moves through
//! `Pending → Fetching → {Extracting → Processed, Skipped}`.
use std::fmt;

/// Represents the current state of a page in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// URL generated, not yet dispatched
    Pending,

    /// Request in flight (including retries and backoff)
    Fetching,

    /// Page fetched, records being pulled out of it
    Extracting,

    // ===== Terminal States =====
    /// Page fetched and extracted (possibly yielding zero records)
    Processed,

    /// Fetch failed after exhausting retries, or the run was cancelled first
    Skipped,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Skipped)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Pending, Self::Skipped)
                | (Self::Fetching, Self::Extracting)
                | (Self::Fetching, Self::Skipped)
                | (Self::Extracting, Self::Processed)
        )
    }

    /// Moves to `next`, logging and refusing illegal transitions
    pub fn advance(&mut self, next: PageState) -> bool {
        if self.can_transition_to(next) {
            *self = next;
            true
        } else {
            tracing::error!("Invalid page state transition: {} -> {}", self, next);
            false
        }
    }

    /// Short lowercase label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Processed => "processed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Extracting,
            Self::Processed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
