//! Rider workload.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderStatus};
use crate::user::{User, UserProfile};

/// A rider with the number of orders they are currently delivering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderLoad {
    #[serde(flatten)]
    pub rider: UserProfile,
    pub active_deliveries: usize,
}

/// Delivery counts for one rider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderStats {
    /// Orders ever assigned to the rider.
    pub total_deliveries: usize,
    pub successful_deliveries: usize,
    pub failed_deliveries: usize,
    pub current_active_deliveries: usize,
}

impl RiderStats {
    pub fn from_orders<'a>(rider: UserId, orders: impl IntoIterator<Item = &'a Order>) -> Self {
        orders
            .into_iter()
            .filter(|order| order.is_assigned_to(rider))
            .fold(Self::default(), |mut stats, order| {
                stats.total_deliveries += 1;
                match order.status {
                    OrderStatus::Delivered => stats.successful_deliveries += 1,
                    OrderStatus::Undelivered => stats.failed_deliveries += 1,
                    OrderStatus::Shipped => stats.current_active_deliveries += 1,
                    _ => {}
                }
                stats
            })
    }
}

/// Orders riders by how many shipped orders they hold, fewest first.
///
/// The sort is stable, so riders with equal load keep their input order.
pub fn rank_by_active_deliveries(riders: Vec<User>, orders: &[Order]) -> Vec<RiderLoad> {
    let mut ranked: Vec<RiderLoad> = riders
        .into_iter()
        .map(|rider| {
            let active_deliveries = orders
                .iter()
                .filter(|o| o.status == OrderStatus::Shipped && o.is_assigned_to(rider.id))
                .count();
            RiderLoad {
                rider: rider.profile(),
                active_deliveries,
            }
        })
        .collect();
    ranked.sort_by_key(|load| load.active_deliveries);
    ranked
}
