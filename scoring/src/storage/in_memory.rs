use std::sync::RwLock;

use async_trait::async_trait;

use crate::{
    model::{GenericError, ModelId, Order},
    storage::OrderLookup,
};

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: RwLock::new(orders),
        }
    }

    pub fn insert(&self, order: Order) -> Result<(), GenericError> {
        self.orders
            .write()
            .map_err(|_| "order store lock poisoned")?
            .push(order);
        Ok(())
    }
}

#[async_trait]
impl OrderLookup for InMemoryOrderStore {
    async fn get_order(&self, order_id: ModelId) -> Result<Option<Order>, GenericError> {
        let orders = self.orders.read().map_err(|_| "order store lock poisoned")?;
        Ok(orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn average_amount_for_owner(
        &self,
        owner_id: ModelId,
    ) -> Result<Option<f64>, GenericError> {
        let orders = self.orders.read().map_err(|_| "order store lock poisoned")?;
        let amounts: Vec<f64> = orders
            .iter()
            .filter(|o| o.owner_id == owner_id)
            .map(|o| o.total_amount)
            .collect();

        if amounts.is_empty() {
            return Ok(None);
        }
        Ok(Some(amounts.iter().sum::<f64>() / amounts.len() as f64))
    }
}
