//! Order, payment and fulfilment states.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Usual flow:
/// ```text
/// Pending ──► Paid ──► Shipped ──┬──► Delivered
///    │          │         │      └──► Undelivered
///    └──────────┴─────────┴──► Cancelled
/// ```
///
/// Transitions are not enforced: any status may follow any other, and every
/// change is recorded in the order's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, awaiting payment confirmation.
    #[default]
    Pending,

    Paid,

    /// Handed to a rider.
    Shipped,

    Delivered,

    /// The rider could not complete delivery.
    Undelivered,

    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order would normally see no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Undelivered | OrderStatus::Cancelled
        )
    }

    /// Returns true if an admin may set this status directly.
    pub fn is_admin_settable(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Undelivered => "undelivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
}

impl PaymentMethod {
    /// Returns true for methods that need card details.
    pub fn is_card(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::DebitCard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Undelivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_admin_cannot_set_pending() {
        assert!(!OrderStatus::Pending.is_admin_settable());
        assert!(OrderStatus::Paid.is_admin_settable());
        assert!(OrderStatus::Cancelled.is_admin_settable());
    }

    #[test]
    fn test_card_methods() {
        assert!(PaymentMethod::CreditCard.is_card());
        assert!(PaymentMethod::DebitCard.is_card());
        assert!(!PaymentMethod::Paypal.is_card());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::Pending.to_string(), "pending");
        assert_eq!(OrderStatus::Undelivered.to_string(), "undelivered");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStatus::Shipped).unwrap();
        assert_eq!(json, "\"shipped\"");
        let method: PaymentMethod = serde_json::from_str("\"credit_card\"").unwrap();
        assert_eq!(method, PaymentMethod::CreditCard);
    }
}
