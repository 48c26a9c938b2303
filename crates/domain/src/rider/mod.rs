//! Riders: roster, workload ranking and delivery stats.

mod selection;
mod service;

pub use selection::{RiderLoad, RiderStats, rank_by_active_deliveries};
pub use service::{NewRider, RiderPatch, RiderService};
