//! User accounts.

mod model;
mod service;

pub use model::{Actor, Address, PasswordHasher, Role, User, UserProfile, normalize_email};
pub use service::AccountService;

pub(crate) use service::insert_user;

#[cfg(test)]
pub(crate) use service::fakes;
