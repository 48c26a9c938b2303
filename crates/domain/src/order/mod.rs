//! Orders and their status lifecycle.

mod aggregate;
mod commands;
mod service;
mod state;

pub use aggregate::{
    DELIVERED_NOTE, ORDER_PLACED_NOTE, Order, OrderLine, RIDER_ASSIGNED_NOTE, ShippingAddress,
    StatusEntry, VariantSelection,
};
pub use commands::{ChangeStatus, DeliveryReport, LineRequest, PlaceOrder};
pub use service::OrderService;
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};

#[cfg(test)]
pub(crate) use aggregate::fixtures;
