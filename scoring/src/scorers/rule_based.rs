use crate::{
    model::{Order, ReasonTag, ScoreResult, ScoringRequest},
    scorers::Scorer,
};

pub const HIGH_AMOUNT_THRESHOLD: f64 = 300.0;
pub const RISK_COUNTRIES: [&str; 4] = ["VN", "RU", "NG", "PK"];
pub const DISPOSABLE_DOMAINS: [&str; 3] = ["mailinator.com", "tempmail.com", "yopmail.com"];
pub const DISTANCE_THRESHOLD_KM: f64 = 1000.0;
pub const ATTEMPTS_THRESHOLD: i64 = 3;
pub const OUTLIER_FACTOR: f64 = 2.5;

pub const MAX_SCORE: f64 = 1.0;

/// Everything a rule predicate may look at.
pub struct RuleInput<'a> {
    /// Override amount if supplied, otherwise the order total.
    pub amount: f64,
    pub request: &'a ScoringRequest,
    pub historical_avg: Option<f64>,
}

type Predicate = Box<dyn Fn(&RuleInput) -> bool + Send + Sync>;

pub struct Rule {
    pub reason: ReasonTag,
    pub weight: f64,
    predicate: Predicate,
}

impl Rule {
    pub fn new<F>(reason: ReasonTag, weight: f64, predicate: F) -> Self
    where
        F: Fn(&RuleInput) -> bool + Send + Sync + 'static,
    {
        Self {
            reason,
            weight,
            predicate: Box::new(predicate),
        }
    }

    pub fn matches(&self, input: &RuleInput) -> bool {
        (self.predicate)(input)
    }
}

/// Additive scorer over an ordered rule table.
pub struct RuleBasedScorer {
    rules: Vec<Rule>,
}

impl RuleBasedScorer {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn effective_amount(order: &Order, request: &ScoringRequest) -> f64 {
        // A zero override falls back to the order total.
        match request.ticket_amount {
            Some(amount) if amount != 0.0 => amount,
            _ => order.total_amount,
        }
    }
}

impl Default for RuleBasedScorer {
    fn default() -> Self {
        get_rule_based_scorer()
    }
}

impl Scorer for RuleBasedScorer {
    fn evaluate(
        &self,
        order: Option<&Order>,
        request: &ScoringRequest,
        historical_avg: Option<f64>,
    ) -> ScoreResult {
        let Some(order) = order else {
            return ScoreResult::order_not_found();
        };

        let input = RuleInput {
            amount: Self::effective_amount(order, request),
            request,
            historical_avg,
        };

        let mut score = 0.0;
        let mut reasons = Vec::new();
        for rule in &self.rules {
            if rule.matches(&input) {
                score += rule.weight;
                reasons.push(rule.reason);
            }
        }

        ScoreResult {
            score: f64::min(MAX_SCORE, score),
            reasons,
        }
    }
}

/// The production rule table. Order matters: reasons are reported in this order.
pub fn get_rule_based_scorer() -> RuleBasedScorer {
    let mut scorer = RuleBasedScorer::new();

    scorer.add_rule(Rule::new(ReasonTag::HighAmount, 0.35, |input| {
        input.amount >= HIGH_AMOUNT_THRESHOLD
    }));

    scorer.add_rule(Rule::new(ReasonTag::RiskyCountry, 0.25, |input| {
        input
            .request
            .ip_country
            .as_deref()
            .is_some_and(|country| RISK_COUNTRIES.contains(&country))
    }));

    scorer.add_rule(Rule::new(ReasonTag::DisposableEmail, 0.20, |input| {
        input.request.email_domain.as_deref().is_some_and(|domain| {
            let domain = domain.to_lowercase();
            DISPOSABLE_DOMAINS.contains(&domain.as_str())
        })
    }));

    scorer.add_rule(Rule::new(ReasonTag::IpShippingDistance, 0.15, |input| {
        input
            .request
            .distance_km
            .is_some_and(|distance| distance > DISTANCE_THRESHOLD_KM)
    }));

    scorer.add_rule(Rule::new(ReasonTag::MultipleAttempts, 0.20, |input| {
        input
            .request
            .attempts_last_hour
            .is_some_and(|attempts| attempts >= ATTEMPTS_THRESHOLD)
    }));

    scorer.add_rule(Rule::new(ReasonTag::TicketOutlier, 0.20, |input| {
        input
            .historical_avg
            .is_some_and(|avg| input.amount > avg * OUTLIER_FACTOR)
    }));

    scorer
}
