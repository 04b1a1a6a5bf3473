use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Schema, Set, TransactionTrait,
};
use scoring::{model::Order, scorers::HIGH_AMOUNT_THRESHOLD, storage::OrderLookup};
use tracing::{debug, info};

use crate::{
    entities::{order, order_item, payment, user},
    model::{GenericError, MetricsOut, ModelId, OrderCreate, OrderDetails, PaymentCreate, PaymentOut},
    storage::PaymentsStorage,
};

#[derive(Clone)]
pub struct ProdStorage {
    pub db: DatabaseConnection,
}

impl ProdStorage {
    pub async fn new(database_url: &str) -> Result<Self, GenericError> {
        let db = Database::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn create_table<E: EntityTrait>(&self, schema: &Schema, entity: E) -> Result<(), GenericError> {
        let backend = self.db.get_database_backend();

        let mut table = schema.create_table_from_entity(entity);
        table.if_not_exists();
        self.db.execute(backend.build(&table)).await?;

        for mut index in schema.create_index_from_entity(entity) {
            index.if_not_exists();
            self.db.execute(backend.build(&index)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentsStorage for ProdStorage {
    async fn create_schema(&self) -> Result<(), GenericError> {
        let schema = Schema::new(self.db.get_database_backend());

        // Parents before children so the foreign keys resolve.
        self.create_table(&schema, user::Entity).await?;
        self.create_table(&schema, order::Entity).await?;
        self.create_table(&schema, order_item::Entity).await?;
        self.create_table(&schema, payment::Entity).await?;

        info!("Database schema ready");
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>, GenericError> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(user)
    }

    async fn get_user(&self, user_id: ModelId) -> Result<Option<user::Model>, GenericError> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<user::Model, GenericError> {
        let model = user::ActiveModel {
            id: NotSet,
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
        };
        let user = model.insert(&self.db).await?;
        debug!(user_id = user.id, "Inserted user");
        Ok(user)
    }

    async fn insert_order(
        &self,
        owner_id: ModelId,
        request: &OrderCreate,
    ) -> Result<OrderDetails, GenericError> {
        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: NotSet,
            user_id: Set(owner_id),
            customer_id: Set(request.customer_id.clone()),
            shipping_address: Set(request.shipping_address.clone()),
            total_amount: Set(request.total_amount()),
            created_at: Set(chrono::Utc::now().naive_utc()),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let am = order_item::ActiveModel {
                id: NotSet,
                order_id: Set(order_model.id),
                sku: Set(item.sku.clone()),
                qty: Set(item.qty),
                unit_price: Set(item.unit_price),
            };
            items.push(am.insert(&txn).await?);
        }

        txn.commit().await?;
        debug!(
            order_id = order_model.id,
            owner_id,
            items = items.len(),
            total_amount = order_model.total_amount,
            "Inserted order"
        );
        Ok(OrderDetails::from_models(order_model, items))
    }

    async fn get_order_details(
        &self,
        order_id: ModelId,
    ) -> Result<Option<OrderDetails>, GenericError> {
        let Some(order_model) = order::Entity::find_by_id(order_id).one(&self.db).await? else {
            return Ok(None);
        };
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&self.db)
            .await?;
        Ok(Some(OrderDetails::from_models(order_model, items)))
    }

    async fn insert_payment(&self, payment: &PaymentCreate) -> Result<PaymentOut, GenericError> {
        let model = payment::ActiveModel {
            id: NotSet,
            order_id: Set(payment.order_id),
            amount: Set(payment.amount),
            method: Set(payment.method.clone()),
            provider: Set(payment.provider.clone()),
            metadata: Set(payment
                .metadata
                .clone()
                .unwrap_or_else(|| serde_json::json!({}))),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };
        let saved = model.insert(&self.db).await?;
        debug!(payment_id = saved.id, order_id = saved.order_id, "Inserted payment");
        Ok(saved.into())
    }

    async fn metrics_summary(&self, user_id: ModelId) -> Result<MetricsOut, GenericError> {
        let owned = order::Entity::find().filter(order::Column::UserId.eq(user_id));

        let total_orders = owned.clone().count(&self.db).await?;
        let suspicious_orders = owned
            .filter(order::Column::TotalAmount.gte(HIGH_AMOUNT_THRESHOLD))
            .count(&self.db)
            .await?;

        // Payments and revenue are system wide.
        let total_payments = payment::Entity::find().count(&self.db).await?;
        let total_revenue = payment::Entity::find()
            .select_only()
            .column_as(
                SimpleExpr::from(Func::sum(Expr::col(payment::Column::Amount))),
                "value",
            )
            .into_tuple::<Option<f64>>()
            .one(&self.db)
            .await?
            .flatten()
            .unwrap_or(0.0);

        Ok(MetricsOut::new(
            total_orders,
            suspicious_orders,
            total_payments,
            total_revenue,
        ))
    }
}

#[async_trait]
impl OrderLookup for ProdStorage {
    async fn get_order(&self, order_id: ModelId) -> Result<Option<Order>, GenericError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .map(|model| Order {
                id: model.id,
                owner_id: model.user_id,
                total_amount: model.total_amount,
            });
        Ok(order)
    }

    async fn average_amount_for_owner(
        &self,
        owner_id: ModelId,
    ) -> Result<Option<f64>, GenericError> {
        let average = order::Entity::find()
            .filter(order::Column::UserId.eq(owner_id))
            .select_only()
            .column_as(
                SimpleExpr::from(Func::avg(Expr::col(order::Column::TotalAmount))),
                "value",
            )
            .into_tuple::<Option<f64>>()
            .one(&self.db)
            .await?;
        Ok(average.flatten())
    }
}
