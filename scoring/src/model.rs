use serde::{Deserialize, Serialize};
use std::error::Error;
use strum_macros::{Display as EnumDisplay, EnumIter};

pub type ModelId = i32;

pub type GenericError = Box<dyn Error + Send + Sync>;

/// The slice of a persisted order the scorer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: ModelId,
    pub owner_id: ModelId,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub order_id: ModelId,
    #[serde(default)]
    pub ip_country: Option<String>,
    #[serde(default)]
    pub email_domain: Option<String>,
    /// Distance between the IP geolocation and the shipping address, in km.
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub attempts_last_hour: Option<i64>,
    #[serde(default)]
    pub ticket_amount: Option<f64>,
}

impl ScoringRequest {
    pub fn for_order(order_id: ModelId) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDisplay, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReasonTag {
    OrderNotFound,
    HighAmount,
    RiskyCountry,
    DisposableEmail,
    IpShippingDistance,
    MultipleAttempts,
    TicketOutlier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub reasons: Vec<ReasonTag>,
}

impl ScoreResult {
    pub fn order_not_found() -> Self {
        Self {
            score: 1.0,
            reasons: vec![ReasonTag::OrderNotFound],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
    Approve,
    Review,
    Reject,
}

pub const REJECT_THRESHOLD: f64 = 0.75;
pub const REVIEW_THRESHOLD: f64 = 0.5;

impl Decision {
    /// Bands are inclusive on their lower bound.
    pub fn from_score(score: f64) -> Self {
        if score >= REJECT_THRESHOLD {
            Decision::Reject
        } else if score >= REVIEW_THRESHOLD {
            Decision::Review
        } else {
            Decision::Approve
        }
    }
}

/// What the scoring endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub score: f64,
    pub reasons: Vec<ReasonTag>,
    pub decision: Decision,
}

impl From<ScoreResult> for Assessment {
    fn from(result: ScoreResult) -> Self {
        Self {
            decision: Decision::from_score(result.score),
            score: result.score,
            reasons: result.reasons,
        }
    }
}
