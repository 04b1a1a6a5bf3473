pub mod in_memory;

pub use in_memory::*;

use crate::model::{GenericError, ModelId, Order};
use async_trait::async_trait;

/// Read-only access to the order history the scorer depends on.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn get_order(&self, order_id: ModelId) -> Result<Option<Order>, GenericError>;

    /// Mean `total_amount` over every order of `owner_id`; `None` when the owner has no orders.
    async fn average_amount_for_owner(
        &self,
        owner_id: ModelId,
    ) -> Result<Option<f64>, GenericError>;
}
