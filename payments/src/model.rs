use serde::{Deserialize, Serialize};

use crate::entities::{order, order_item, payment, user};

pub use scoring::model::{GenericError, ModelId};

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

// ---- Auth ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
}

impl Validate for UserCreate {
    fn validate(&self) -> Result<(), String> {
        if !is_valid_email(&self.email) {
            return Err(format!("Invalid email address: {}", self.email));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

impl Validate for UserLogin {
    fn validate(&self) -> Result<(), String> {
        if !is_valid_email(&self.email) {
            return Err(format!("Invalid email address: {}", self.email));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOut {
    pub id: ModelId,
    pub email: String,
}

impl From<user::Model> for UserOut {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: String,
}

impl TokenOut {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

// ---- Orders / Payments ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemIn {
    pub sku: String,
    pub qty: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub customer_id: String,
    pub items: Vec<OrderItemIn>,
    pub shipping_address: String,
}

impl OrderCreate {
    pub fn total_amount(&self) -> f64 {
        self.items
            .iter()
            .map(|item| f64::from(item.qty) * item.unit_price)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemOut {
    pub id: ModelId,
    pub sku: String,
    pub qty: i32,
    pub unit_price: f64,
}

impl From<order_item::Model> for OrderItemOut {
    fn from(item: order_item::Model) -> Self {
        Self {
            id: item.id,
            sku: item.sku,
            qty: item.qty,
            unit_price: item.unit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOut {
    pub id: ModelId,
    pub customer_id: String,
    pub shipping_address: String,
    pub total_amount: f64,
    pub items: Vec<OrderItemOut>,
}

/// An order together with its owner, as read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub owner_id: ModelId,
    pub order: OrderOut,
}

impl OrderDetails {
    pub fn from_models(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            owner_id: order.user_id,
            order: OrderOut {
                id: order.id,
                customer_id: order.customer_id,
                shipping_address: order.shipping_address,
                total_amount: order.total_amount,
                items: items.into_iter().map(OrderItemOut::from).collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreate {
    pub order_id: ModelId,
    pub amount: f64,
    pub method: String,
    pub provider: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOut {
    pub id: ModelId,
    pub order_id: ModelId,
    pub amount: f64,
    pub method: String,
    pub provider: String,
    pub metadata: serde_json::Value,
}

impl From<payment::Model> for PaymentOut {
    fn from(payment: payment::Model) -> Self {
        Self {
            id: payment.id,
            order_id: payment.order_id,
            amount: payment.amount,
            method: payment.method,
            provider: payment.provider,
            metadata: payment.metadata,
        }
    }
}

// ---- Metrics ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsOut {
    pub total_orders: u64,
    pub total_payments: u64,
    pub total_revenue: f64,
    pub suspected_fraud_rate: f64,
}

impl MetricsOut {
    pub fn new(total_orders: u64, suspicious_orders: u64, total_payments: u64, total_revenue: f64) -> Self {
        let suspected_fraud_rate = if total_orders == 0 {
            0.0
        } else {
            round_to(suspicious_orders as f64 / total_orders as f64, 3)
        };
        Self {
            total_orders,
            total_payments,
            total_revenue,
            suspected_fraud_rate,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let labels: Vec<&str> = domain.split('.').collect();
    !local.is_empty()
        && !domain.contains('@')
        && labels.len() >= 2
        && labels.iter().all(|label| !label.is_empty())
}
