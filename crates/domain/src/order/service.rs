//! Order service: creation with stock reservation, status changes, delivery.

use std::time::Instant;

use common::{OrderId, UserId};
use document_store::{DocumentStore, StoreError, WriteBatch};

use crate::catalog::Product;
use crate::error::{DomainError, Result};
use crate::repository::{Entity, Repository, Stored, query_for};
use crate::user::{Actor, Role, User};

use super::{ChangeStatus, DeliveryReport, Order, OrderLine, OrderStatus, PlaceOrder};

/// Service for managing orders.
///
/// Every write is conditional on the version the service read, so two
/// requests racing on the same order or the same product stock cannot both
/// succeed.
pub struct OrderService<S: DocumentStore> {
    repo: Repository<S>,
}

impl<S: DocumentStore> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Places an order and reserves its stock.
    ///
    /// The order insert and every product stock decrement are committed as one
    /// batch. If a product changed after it was read the batch is rejected as a
    /// [`DomainError::Conflict`] and nothing is written.
    #[tracing::instrument(skip(self, cmd), fields(user = %cmd.user, lines = cmd.items.len()))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.try_place_order(cmd).await;
        metrics::histogram!("order_creation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(order_id = %order.id, total = %order.total, "Order created");
            }
            Err(e) => {
                metrics::counter!("order_creation_failures_total", "reason" => e.kind())
                    .increment(1);
                tracing::warn!(error = %e, "Order creation failed");
            }
        }
        result
    }

    async fn try_place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        let errors = cmd.validate();
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let mut products: Vec<Stored<Product>> = Vec::new();
        let mut lines = Vec::with_capacity(cmd.items.len());

        for item in &cmd.items {
            let index = match products.iter().position(|p| p.id == item.product_id) {
                Some(index) => index,
                None => {
                    let product = self
                        .repo
                        .get::<Product>(item.product_id)
                        .await?
                        .filter(|p| p.is_active)
                        .ok_or(DomainError::ProductNotFound(item.product_id))?;
                    products.push(product);
                    products.len() - 1
                }
            };

            // Decrementing the loaded copy makes repeated lines for one
            // variant count against the same stock.
            let variant = products[index]
                .variant_mut(&item.color, &item.size)
                .ok_or_else(|| DomainError::InvalidVariant {
                    product_id: item.product_id,
                    color: item.color.clone(),
                    size: item.size.clone(),
                })?;
            if variant.stock < item.quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: item.product_id,
                    color: item.color.clone(),
                    size: item.size.clone(),
                    requested: item.quantity,
                    available: variant.stock,
                });
            }
            variant.stock -= item.quantity;

            lines.push(OrderLine {
                product: item.product_id,
                variant: item.selection(),
                quantity: item.quantity,
                price: variant.price,
            });
        }

        let order = Order::place(cmd.user, lines, cmd.shipping_address, cmd.payment_method)?;

        let mut batch = WriteBatch::new().insert(order.to_new_document()?);
        for product in &mut products {
            product.updated_at = order.created_at;
            batch = batch.replace(product.to_replacement()?);
        }

        match self.repo.commit(batch).await {
            Ok(_) => Ok(order),
            Err(DomainError::Store(StoreError::VersionConflict { document_id, .. })) => {
                Err(DomainError::Conflict(format!(
                    "Product {document_id} changed while the order was being placed"
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Admin status change.
    ///
    /// `shipped` together with a rider assigns that rider; anything else is a
    /// plain status update carrying the optional note.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(
        &self,
        actor: &Actor,
        order_id: OrderId,
        change: ChangeStatus,
    ) -> Result<Order> {
        ensure_admin(actor)?;
        if !change.status.is_admin_settable() {
            return Err(DomainError::invalid(
                "status",
                format!("Status cannot be set to {}", change.status),
            ));
        }

        if let (OrderStatus::Shipped, Some(rider)) = (change.status, change.rider) {
            return self.assign_rider(actor, order_id, rider).await;
        }

        let mut order = self.load(order_id).await?;
        order.update_status(change.status, change.note);
        self.save_status_change(order).await
    }

    /// Assigns an approved rider and marks the order shipped.
    #[tracing::instrument(skip(self))]
    pub async fn assign_rider(
        &self,
        actor: &Actor,
        order_id: OrderId,
        rider_id: UserId,
    ) -> Result<Order> {
        ensure_admin(actor)?;
        let mut order = self.load(order_id).await?;

        let is_rider = self
            .repo
            .get::<User>(rider_id)
            .await?
            .is_some_and(|u| u.role == Role::Rider && u.is_approved);
        if !is_rider {
            return Err(DomainError::RiderNotFound(rider_id));
        }

        order.assign_rider(rider_id);
        tracing::info!(order_id = %order_id, rider_id = %rider_id, "Rider assigned");
        self.save_status_change(order).await
    }

    /// Delivery outcome reported by the rider the order is assigned to.
    #[tracing::instrument(skip(self))]
    pub async fn report_delivery(
        &self,
        actor: &Actor,
        order_id: OrderId,
        report: DeliveryReport,
    ) -> Result<Order> {
        if !actor.is_rider() {
            return Err(DomainError::Forbidden(
                "Only riders can report deliveries".to_string(),
            ));
        }

        let mut order = self.load(order_id).await?;
        match report {
            DeliveryReport::Delivered => order.mark_delivered(actor.user_id)?,
            DeliveryReport::Undelivered { reason } => {
                order.mark_undelivered(actor.user_id, reason)?
            }
        }
        self.save_status_change(order).await
    }

    /// Delivery confirmation by the assigned rider. See [`Self::report_delivery`].
    pub async fn mark_delivered(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        self.report_delivery(actor, order_id, DeliveryReport::Delivered)
            .await
    }

    /// Failed delivery reported by the assigned rider; `reason` becomes the
    /// history note.
    pub async fn mark_undelivered(
        &self,
        actor: &Actor,
        order_id: OrderId,
        reason: Option<String>,
    ) -> Result<Order> {
        self.report_delivery(actor, order_id, DeliveryReport::Undelivered { reason })
            .await
    }

    /// Returns an order if `actor` may see it.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?.into_inner();
        if !order.is_visible_to(actor) {
            return Err(DomainError::Forbidden(
                "You can only view your own orders".to_string(),
            ));
        }
        Ok(order)
    }

    /// All orders, newest first.
    pub async fn list_all(&self) -> Result<Vec<Order>> {
        self.list(query_for::<Order>()).await
    }

    /// Orders placed by `user`, newest first.
    pub async fn list_for_customer(&self, user: UserId) -> Result<Vec<Order>> {
        self.list(query_for::<Order>().where_eq("user", user.to_string()))
            .await
    }

    /// Orders assigned to `rider`, newest first.
    pub async fn list_for_rider(&self, rider: UserId) -> Result<Vec<Order>> {
        self.list(query_for::<Order>().where_eq("rider", rider.to_string()))
            .await
    }

    async fn list(&self, query: document_store::DocumentQuery) -> Result<Vec<Order>> {
        Ok(self
            .repo
            .find::<Order>(query.newest_first())
            .await?
            .into_iter()
            .map(Stored::into_inner)
            .collect())
    }

    async fn load(&self, order_id: OrderId) -> Result<Stored<Order>> {
        self.repo
            .get::<Order>(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    async fn save_status_change(&self, order: Stored<Order>) -> Result<Order> {
        let saved = self.repo.save(order).await?.into_inner();
        metrics::counter!("order_status_changes_total", "status" => saved.status.as_str())
            .increment(1);
        tracing::info!(order_id = %saved.id, status = %saved.status, "Order status changed");
        Ok(saved)
    }
}

fn ensure_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden("Admin access required".to_string()))
    }
}
