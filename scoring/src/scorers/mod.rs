pub mod rule_based;

pub use rule_based::*;

use crate::model::{Order, ScoreResult, ScoringRequest};

pub trait Scorer: Send + Sync {
    /// `order` is `None` when the referenced order does not exist.
    fn evaluate(
        &self,
        order: Option<&Order>,
        request: &ScoringRequest,
        historical_avg: Option<f64>,
    ) -> ScoreResult;
}
