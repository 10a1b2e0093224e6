//! Order status state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
///            complete            deliver              return
/// Draft ──────────────► Completed ──────────► Delivered ──────────► Returned
///   ▲                      │
///   └──────────────────────┘
///        revert_to_draft
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order is being assembled; every field can still change.
    #[default]
    Draft,

    /// Stock has been reserved for the line items.
    Completed,

    /// Goods handed over; counted in the customer's purchase stats.
    Delivered,

    /// Goods came back (terminal state).
    Returned,
}

impl OrderStatus {
    /// Returns true if the order's fields may be edited in this status.
    pub fn can_edit(&self) -> bool {
        matches!(self, OrderStatus::Draft)
    }

    /// Returns true if the order may be hard-deleted in this status.
    pub fn can_delete(&self) -> bool {
        matches!(self, OrderStatus::Draft)
    }

    /// Returns true if no transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Returned)
    }

    /// Returns the status reached by `transition`, or an error naming the
    /// current status and the attempted target.
    pub fn transition(self, transition: Transition) -> Result<OrderStatus, OrderError> {
        if self == transition.source() {
            Ok(transition.target())
        } else {
            Err(OrderError::InvalidTransition {
                current: self,
                target: transition.target(),
            })
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::Completed => "Completed",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Returned => "Returned",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(OrderStatus::Draft),
            "Completed" => Ok(OrderStatus::Completed),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Returned" => Ok(OrderStatus::Returned),
            other => Err(OrderError::UnknownStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// The four transitions of the order state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Draft → Completed, reserving stock.
    Complete,
    /// Completed → Delivered, accruing purchase stats.
    Deliver,
    /// Completed → Draft, optionally releasing stock.
    RevertToDraft,
    /// Delivered → Returned, with optional reversals.
    Return,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Transition::Complete,
        Transition::Deliver,
        Transition::RevertToDraft,
        Transition::Return,
    ];

    /// The only status this transition may start from.
    pub fn source(&self) -> OrderStatus {
        match self {
            Transition::Complete => OrderStatus::Draft,
            Transition::Deliver | Transition::RevertToDraft => OrderStatus::Completed,
            Transition::Return => OrderStatus::Delivered,
        }
    }

    /// The status this transition leads to.
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Complete => OrderStatus::Completed,
            Transition::Deliver => OrderStatus::Delivered,
            Transition::RevertToDraft => OrderStatus::Draft,
            Transition::Return => OrderStatus::Returned,
        }
    }

    /// Trigger name, used as a log field and metric label.
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Complete => "complete",
            Transition::Deliver => "deliver",
            Transition::RevertToDraft => "revert_to_draft",
            Transition::Return => "return",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
