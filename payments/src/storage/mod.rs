pub mod prod;

pub use prod::*;

use async_trait::async_trait;

use crate::{
    entities::user,
    model::{GenericError, MetricsOut, ModelId, OrderCreate, OrderDetails, PaymentCreate, PaymentOut},
};

#[async_trait]
pub trait PaymentsStorage: Send + Sync {
    /// Creates every table that does not exist yet.
    async fn create_schema(&self) -> Result<(), GenericError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>, GenericError>;

    async fn get_user(&self, user_id: ModelId) -> Result<Option<user::Model>, GenericError>;

    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<user::Model, GenericError>;

    /// Inserts the order and its lines atomically. The total is derived from the lines.
    async fn insert_order(
        &self,
        owner_id: ModelId,
        order: &OrderCreate,
    ) -> Result<OrderDetails, GenericError>;

    async fn get_order_details(
        &self,
        order_id: ModelId,
    ) -> Result<Option<OrderDetails>, GenericError>;

    async fn insert_payment(&self, payment: &PaymentCreate) -> Result<PaymentOut, GenericError>;

    async fn metrics_summary(&self, user_id: ModelId) -> Result<MetricsOut, GenericError>;
}
