//! Rider roster management.

use std::sync::Arc;

use common::UserId;
use document_store::DocumentStore;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::order::Order;
use crate::repository::{Repository, Stored, query_for};
use crate::user::{PasswordHasher, Role, User, insert_user};
use crate::validation::{FieldError, has_min_length, is_required, is_valid_email};

use super::{RiderLoad, RiderStats, rank_by_active_deliveries};

/// Input for creating a rider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRider {
    pub email: String,
    pub name: String,
    pub phone: String,
    /// Riders without a password can only sign in through an external provider.
    #[serde(default)]
    pub password: Option<String>,
}

impl NewRider {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !is_valid_email(self.email.trim()) {
            errors.push(FieldError::new("email", "A valid email is required"));
        }
        if !is_required(&self.name) {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if !is_required(&self.phone) {
            errors.push(FieldError::new("phone", "Phone is required"));
        }
        if let Some(ref password) = self.password
            && !has_min_length(password, 6)
        {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 6 characters",
            ));
        }
        errors
    }
}

/// Partial rider update. `is_active` maps onto the account's approval flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiderPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl RiderPatch {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.as_deref().is_some_and(|n| !is_required(n)) {
            errors.push(FieldError::new("name", "Name must not be blank"));
        }
        if self.phone.as_deref().is_some_and(|p| !is_required(p)) {
            errors.push(FieldError::new("phone", "Phone must not be blank"));
        }
        errors
    }
}

/// Service for the rider roster and workload.
pub struct RiderService<S: DocumentStore> {
    repo: Repository<S>,
    hasher: Arc<dyn PasswordHasher>,
}

impl<S: DocumentStore> RiderService<S> {
    pub fn new(store: S, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            repo: Repository::new(store),
            hasher,
        }
    }

    /// All riders, sorted by name.
    #[tracing::instrument(skip(self))]
    pub async fn list_riders(&self) -> Result<Vec<User>> {
        let mut riders = self.riders(false).await?;
        riders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(riders)
    }

    /// Creates an approved rider account.
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_rider(&self, input: NewRider) -> Result<User> {
        let errors = input.validate();
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let mut rider = User::new(&input.email, &input.name, Role::Rider);
        rider.phone = Some(input.phone.trim().to_string());
        rider.is_approved = true;
        if let Some(ref password) = input.password {
            rider.password_hash = Some(self.hasher.hash(password)?);
        }

        let stored = insert_user(&self.repo, rider).await?;
        tracing::info!(rider_id = %stored.id, "Rider created");
        Ok(stored.into_inner())
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_rider(&self, id: UserId, patch: RiderPatch) -> Result<User> {
        let errors = patch.validate();
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let mut rider = self.load(id).await?;
        if let Some(name) = patch.name {
            rider.name = name.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            rider.phone = Some(phone.trim().to_string());
        }
        if let Some(active) = patch.is_active {
            rider.is_approved = active;
        }
        Ok(self.repo.save(rider).await?.into_inner())
    }

    /// Approved riders ordered by current workload, lightest first.
    #[tracing::instrument(skip(self))]
    pub async fn available_riders(&self) -> Result<Vec<RiderLoad>> {
        let riders = self.riders(true).await?;
        let shipped = self
            .repo
            .find::<Order>(query_for::<Order>().where_eq("status", "shipped"))
            .await?
            .into_iter()
            .map(Stored::into_inner)
            .collect::<Vec<_>>();
        Ok(rank_by_active_deliveries(riders, &shipped))
    }

    #[tracing::instrument(skip(self))]
    pub async fn rider_stats(&self, id: UserId) -> Result<RiderStats> {
        self.load(id).await?;
        let orders = self
            .repo
            .find::<Order>(query_for::<Order>().where_eq("rider", id.to_string()))
            .await?;
        Ok(RiderStats::from_orders(id, orders.iter().map(|o| &**o)))
    }

    async fn riders(&self, approved_only: bool) -> Result<Vec<User>> {
        let mut query = query_for::<User>().where_eq("role", Role::Rider.as_str());
        if approved_only {
            query = query.where_eq("is_approved", true);
        }
        Ok(self
            .repo
            .find::<User>(query)
            .await?
            .into_iter()
            .map(Stored::into_inner)
            .collect())
    }

    async fn load(&self, id: UserId) -> Result<Stored<User>> {
        self.repo
            .get::<User>(id)
            .await?
            .filter(|u| u.role == Role::Rider)
            .ok_or(DomainError::RiderNotFound(id))
    }
}
