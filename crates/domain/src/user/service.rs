//! Account registration, login and approval.

use std::sync::Arc;

use common::UserId;
use document_store::{DocumentStore, StoreError};

use crate::error::{DomainError, Result};
use crate::repository::{Repository, Stored};
use crate::validation::validate_registration;

use super::{PasswordHasher, Role, User, normalize_email};

/// Service for user accounts.
pub struct AccountService<S: DocumentStore> {
    repo: Repository<S>,
    hasher: Arc<dyn PasswordHasher>,
}

impl<S: DocumentStore> AccountService<S> {
    pub fn new(store: S, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            repo: Repository::new(store),
            hasher,
        }
    }

    /// Creates an unapproved customer account.
    ///
    /// Fails with [`DomainError::Conflict`] if the email is taken; the unique
    /// key is enforced by the store, so two racing registrations cannot both
    /// succeed.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let errors = validate_registration(email, password, name);
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let mut user = User::new(email, name, Role::Customer);
        user.password_hash = Some(self.hasher.hash(password)?);

        let stored = insert_user(&self.repo, user).await?;
        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %stored.id, "User registered");
        Ok(stored.into_inner())
    }

    /// Checks credentials and returns the account.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let result = self.check_credentials(email, password).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(DomainError::NotApproved) => "not_approved",
            Err(DomainError::InvalidCredentials) => "invalid_credentials",
            Err(_) => "error",
        };
        metrics::counter!("auth_logins_total", "outcome" => outcome).increment(1);
        result
    }

    async fn check_credentials(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .repo
            .get_by_unique_key::<User>(&normalize_email(email))
            .await?
            .ok_or(DomainError::InvalidCredentials)?
            .into_inner();

        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.hasher.verify(password, hash));
        if !verified {
            return Err(DomainError::InvalidCredentials);
        }
        if !user.is_approved {
            return Err(DomainError::NotApproved);
        }
        Ok(user)
    }

    /// Signs in a user vouched for by an external identity provider.
    ///
    /// Unknown emails get a new, already approved customer account without a
    /// password.
    #[tracing::instrument(skip(self))]
    pub async fn login_external(&self, email: &str, name: &str, subject: &str) -> Result<User> {
        let key = normalize_email(email);
        if let Some(existing) = self.repo.get_by_unique_key::<User>(&key).await? {
            return Ok(existing.into_inner());
        }

        let mut user = User::new(email, name, Role::Customer);
        user.is_approved = true;
        user.external_subject = Some(subject.to_string());

        let stored = insert_user(&self.repo, user).await?;
        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %stored.id, "External user created");
        Ok(stored.into_inner())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, id: UserId) -> Result<User> {
        Ok(self.load(id).await?.into_inner())
    }

    /// Loads the user behind a bearer token; unapproved users are refused.
    pub async fn authenticate(&self, id: UserId) -> Result<User> {
        let user = self.get_user(id).await?;
        if !user.is_approved {
            return Err(DomainError::NotApproved);
        }
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_approval(&self, id: UserId, approved: bool) -> Result<User> {
        let mut user = self.load(id).await?;
        user.is_approved = approved;
        let saved = self.repo.save(user).await?;
        tracing::info!(user_id = %id, approved, "User approval changed");
        Ok(saved.into_inner())
    }

    /// Creates an approved admin unless the email is already registered.
    #[tracing::instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> Result<User> {
        if let Some(existing) = self
            .repo
            .get_by_unique_key::<User>(&normalize_email(email))
            .await?
        {
            return Ok(existing.into_inner());
        }

        let errors = validate_registration(email, password, name);
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let mut user = User::new(email, name, Role::Admin);
        user.is_approved = true;
        user.password_hash = Some(self.hasher.hash(password)?);
        let stored = insert_user(&self.repo, user).await?;
        tracing::info!(user_id = %stored.id, "Admin account created");
        Ok(stored.into_inner())
    }

    async fn load(&self, id: UserId) -> Result<Stored<User>> {
        self.repo
            .get::<User>(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }
}

/// Inserts a user, turning an email clash into a conflict.
pub(crate) async fn insert_user<S: DocumentStore>(
    repo: &Repository<S>,
    user: User,
) -> Result<Stored<User>> {
    match repo.insert(user).await {
        Err(DomainError::Store(StoreError::DuplicateKey { key, .. })) => Err(
            DomainError::Conflict(format!("Email {key} is already registered")),
        ),
        other => other,
    }
}
