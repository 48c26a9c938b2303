//! Order document and its status operations.

use chrono::{DateTime, Utc};
use common::{DocumentId, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::money::Money;
use crate::repository::Entity;
use crate::user::Actor;
use crate::validation::{FieldError, is_required};

use super::{OrderStatus, PaymentMethod, PaymentStatus};

/// Note recorded when a rider is assigned.
pub const RIDER_ASSIGNED_NOTE: &str = "Rider assigned for delivery";

/// Note recorded when the rider confirms delivery.
pub const DELIVERED_NOTE: &str = "Order delivered successfully";

/// Note on the first history entry.
pub const ORDER_PLACED_NOTE: &str = "Order placed";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Every field is required.
    pub fn validate(&self) -> Vec<FieldError> {
        [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| !is_required(value))
        .map(|(field, _)| {
            FieldError::new(
                format!("shipping_address.{field}"),
                format!("{field} is required"),
            )
        })
        .collect()
    }
}

/// The `(color, size)` pair identifying a variant within its product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantSelection {
    pub color: String,
    pub size: String,
}

/// A purchased product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: ProductId,
    pub variant: VariantSelection,
    pub quantity: u32,
    /// Unit price at the time of purchase.
    #[serde(rename = "price_cents")]
    pub price: Money,
}

impl OrderLine {
    /// Unit price times quantity, or `None` if it does not fit in cents.
    pub fn subtotal(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// One entry of the append-only status log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub lines: Vec<OrderLine>,
    /// Sum of line subtotals, fixed at creation.
    #[serde(rename = "total_cents")]
    pub total: Money,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub rider: Option<UserId>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Order {
    const COLLECTION: &'static str = "orders";

    fn document_id(&self) -> DocumentId {
        self.id.document_id()
    }
}

impl Order {
    /// Builds a pending order; the total is computed from the lines.
    ///
    /// Fails with a validation error if the total overflows.
    pub fn place(
        user: UserId,
        lines: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Self> {
        let total = lines
            .iter()
            .map(OrderLine::subtotal)
            .try_fold(Money::zero(), |acc, subtotal| acc.checked_add(subtotal?))
            .ok_or_else(|| DomainError::invalid("items", "Order total is too large"))?;

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user,
            lines,
            total,
            status: OrderStatus::Pending,
            shipping_address,
            payment_method,
            payment_status: PaymentStatus::default(),
            rider: None,
            tracking_number: None,
            estimated_delivery: None,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                note: Some(ORDER_PLACED_NOTE.to_string()),
            }],
            created_at: now,
            updated_at: now,
        })
    }

    /// Sets the status and appends one history entry. Any status may follow any other.
    pub fn update_status(&mut self, status: OrderStatus, note: Option<String>) {
        let now = Utc::now();
        self.status = status;
        self.status_history.push(StatusEntry {
            status,
            timestamp: now,
            note,
        });
        self.updated_at = now;
    }

    /// Hands the order to `rider` and marks it shipped.
    pub fn assign_rider(&mut self, rider: UserId) {
        self.rider = Some(rider);
        self.update_status(OrderStatus::Shipped, Some(RIDER_ASSIGNED_NOTE.to_string()));
    }

    pub fn is_assigned_to(&self, rider: UserId) -> bool {
        self.rider == Some(rider)
    }

    /// Delivery confirmation by the assigned rider.
    pub fn mark_delivered(&mut self, rider: UserId) -> Result<()> {
        self.ensure_assigned(rider)?;
        self.update_status(OrderStatus::Delivered, Some(DELIVERED_NOTE.to_string()));
        Ok(())
    }

    /// Failed delivery reported by the assigned rider.
    pub fn mark_undelivered(&mut self, rider: UserId, reason: Option<String>) -> Result<()> {
        self.ensure_assigned(rider)?;
        self.update_status(OrderStatus::Undelivered, reason);
        Ok(())
    }

    /// Admins and riders see every order; customers only their own.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.is_admin() || actor.is_rider() || self.user == actor.user_id
    }

    fn ensure_assigned(&self, rider: UserId) -> Result<()> {
        if self.is_assigned_to(rider) {
            Ok(())
        } else {
            Err(DomainError::NotAssigned {
                order_id: self.id,
                rider_id: rider,
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn address() -> ShippingAddress {
        ShippingAddress {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "US".to_string(),
        }
    }

    pub fn line(quantity: u32, price_cents: i64) -> OrderLine {
        OrderLine {
            product: ProductId::new(),
            variant: VariantSelection {
                color: "red".to_string(),
                size: "std".to_string(),
            },
            quantity,
            price: Money::from_cents(price_cents),
        }
    }
}
