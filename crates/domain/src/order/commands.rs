//! Order commands.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::validation::{
    CardDetails, FieldError, is_required, is_valid_card_number, is_valid_expiry_now,
    validate_card_payment,
};

use super::{OrderStatus, PaymentMethod, ShippingAddress, VariantSelection};

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub color: String,
    pub size: String,
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(
        product_id: ProductId,
        color: impl Into<String>,
        size: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            color: color.into(),
            size: size.into(),
            quantity,
        }
    }

    pub fn selection(&self) -> VariantSelection {
        VariantSelection {
            color: self.color.clone(),
            size: self.size.clone(),
        }
    }
}

/// Command to place an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The customer placing the order.
    pub user: UserId,

    pub items: Vec<LineRequest>,

    pub shipping_address: ShippingAddress,

    pub payment_method: PaymentMethod,

    /// Checked when present and then dropped; card data is never stored.
    pub card: Option<CardDetails>,
}

impl PlaceOrder {
    pub fn new(
        user: UserId,
        items: Vec<LineRequest>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            user,
            items,
            shipping_address,
            payment_method,
            card: None,
        }
    }

    pub fn with_card(mut self, card: CardDetails) -> Self {
        self.card = Some(card);
        self
    }

    /// Shape checks that run before any product is loaded.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.items.is_empty() {
            errors.push(FieldError::new("items", "Order must contain at least one item"));
        }
        for (i, item) in self.items.iter().enumerate() {
            if !is_required(&item.color) {
                errors.push(FieldError::new(format!("items[{i}].color"), "Color is required"));
            }
            if !is_required(&item.size) {
                errors.push(FieldError::new(format!("items[{i}].size"), "Size is required"));
            }
            if item.quantity < 1 {
                errors.push(FieldError::new(
                    format!("items[{i}].quantity"),
                    "Quantity must be at least 1",
                ));
            }
        }

        errors.extend(self.shipping_address.validate());

        if let Some(ref card) = self.card {
            let shape = validate_card_payment(self.payment_method, card);
            let shape_ok = shape.is_empty();
            errors.extend(shape);
            if shape_ok && self.payment_method.is_card() {
                if !card.card_number.as_deref().is_some_and(is_valid_card_number) {
                    errors.push(FieldError::new("card_number", "Card number is invalid"));
                }
                if !card.expiry_date.as_deref().is_some_and(is_valid_expiry_now) {
                    errors.push(FieldError::new("expiry_date", "Card has expired"));
                }
            }
        }

        errors
    }
}

/// Admin request to change an order's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub status: OrderStatus,
    /// With `shipped`, assigns this rider instead of a bare status change.
    #[serde(default)]
    pub rider: Option<UserId>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Outcome reported by the assigned rider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryReport {
    Delivered,
    Undelivered {
        #[serde(default, alias = "note")]
        reason: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::fixtures::address;

    fn command(items: Vec<LineRequest>) -> PlaceOrder {
        PlaceOrder::new(UserId::new(), items, address(), PaymentMethod::CreditCard)
    }

    #[test]
    fn test_valid_command_has_no_errors() {
        let cmd = command(vec![LineRequest::new(ProductId::new(), "red", "std", 1)]);
        assert!(cmd.validate().is_empty());
    }

    #[test]
    fn test_empty_items_rejected() {
        let errors = command(vec![]).validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "items");
    }

    #[test]
    fn test_line_shape_rejected() {
        let errors = command(vec![LineRequest::new(ProductId::new(), "", " ", 0)]).validate();
        let fields: Vec<_> = errors.into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            ["items[0].color", "items[0].size", "items[0].quantity"]
        );
    }

    #[test]
    fn test_card_checks_when_present() {
        let base = command(vec![LineRequest::new(ProductId::new(), "red", "std", 1)]);

        let good = base.clone().with_card(CardDetails {
            card_number: Some("4111 1111 1111 1111".to_string()),
            expiry_date: Some("12/99".to_string()),
            cvv: Some("123".to_string()),
        });
        assert!(good.validate().is_empty());

        let bad_luhn = base.clone().with_card(CardDetails {
            card_number: Some("4111111111111112".to_string()),
            expiry_date: Some("12/99".to_string()),
            cvv: Some("123".to_string()),
        });
        let errors = bad_luhn.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "card_number");

        let missing_cvv = base.with_card(CardDetails {
            card_number: Some("4111111111111111".to_string()),
            expiry_date: Some("12/99".to_string()),
            cvv: None,
        });
        assert_eq!(missing_cvv.validate()[0].field, "cvv");
    }

    #[test]
    fn test_delivery_report_json() {
        let delivered: DeliveryReport =
            serde_json::from_str(r#"{"status":"delivered"}"#).unwrap();
        assert_eq!(delivered, DeliveryReport::Delivered);

        let failed: DeliveryReport =
            serde_json::from_str(r#"{"status":"undelivered","reason":"Closed"}"#).unwrap();
        assert_eq!(
            failed,
            DeliveryReport::Undelivered {
                reason: Some("Closed".to_string())
            }
        );
    }

    #[test]
    fn test_undelivered_accepts_note_field() {
        let failed: DeliveryReport =
            serde_json::from_str(r#"{"status":"undelivered","note":"Nobody home"}"#).unwrap();
        assert_eq!(
            failed,
            DeliveryReport::Undelivered {
                reason: Some("Nobody home".to_string())
            }
        );

        let bare: DeliveryReport = serde_json::from_str(r#"{"status":"undelivered"}"#).unwrap();
        assert_eq!(bare, DeliveryReport::Undelivered { reason: None });
    }
}
