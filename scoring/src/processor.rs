use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::{
    model::{Assessment, GenericError, ScoringRequest},
    scorers::Scorer,
    storage::OrderLookup,
};

/// Resolves the order, fetches the owner's history and runs the scorer.
pub struct Processor<S: Scorer> {
    scorer: S,
    order_lookup: Arc<dyn OrderLookup>,
}

impl<S> Processor<S>
where
    S: Scorer,
{
    pub fn new(scorer: S, order_lookup: Arc<dyn OrderLookup>) -> Self {
        info!("Initializing new scoring Processor");
        Self {
            scorer,
            order_lookup,
        }
    }

    /// Lookup failures are returned as errors; only a missing order maps to `order_not_found`.
    pub async fn score(&self, request: &ScoringRequest) -> Result<Assessment, GenericError> {
        let started = Instant::now();
        debug!(order_id = request.order_id, "Scoring transaction");

        let order = self.order_lookup.get_order(request.order_id).await?;
        let historical_avg = match &order {
            Some(order) => {
                self.order_lookup
                    .average_amount_for_owner(order.owner_id)
                    .await?
            }
            None => None,
        };
        debug!(
            order_id = request.order_id,
            found = order.is_some(),
            historical_avg = ?historical_avg,
            "Resolved scoring inputs"
        );

        let result = self.scorer.evaluate(order.as_ref(), request, historical_avg);
        let assessment = Assessment::from(result);

        histogram!("fraud_scoring_seconds").record(started.elapsed().as_secs_f64());
        counter!("fraud_decisions_total", "decision" => assessment.decision.to_string())
            .increment(1);

        info!(
            order_id = request.order_id,
            score = assessment.score,
            decision = %assessment.decision,
            reasons = ?assessment.reasons,
            "Scored transaction"
        );
        Ok(assessment)
    }
}
