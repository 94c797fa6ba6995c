use chrono::{DateTime, Utc};
use overseer_core::{OverseerError, OverseerResult, Params};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};
use uuid::Uuid;

const BASE_CONFIDENCE: f64 = 0.7;
const IMPACT_WEIGHT: f64 = 0.6;
const COST_WEIGHT: f64 = 0.4;

/// What kind of situation a decision context describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    PerformanceOptimization,
    SecurityResponse,
    ResourceAllocation,
    BusinessStrategy,
    OperationalDecision,
}

impl std::fmt::Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DecisionType::PerformanceOptimization => "performance_optimization",
            DecisionType::SecurityResponse => "security_response",
            DecisionType::ResourceAllocation => "resource_allocation",
            DecisionType::BusinessStrategy => "business_strategy",
            DecisionType::OperationalDecision => "operational_decision",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    fn score(self) -> f64 {
        match self {
            Impact::High => 3.0,
            Impact::Medium => 2.0,
            Impact::Low => 1.0,
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Impact::Low => write!(f, "low"),
            Impact::Medium => write!(f, "medium"),
            Impact::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cost {
    None,
    Low,
    Medium,
    High,
}

impl Cost {
    fn score(self) -> f64 {
        match self {
            Cost::None => 3.0,
            Cost::Low => 2.0,
            Cost::Medium => 1.0,
            Cost::High => 0.0,
        }
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cost::None => write!(f, "none"),
            Cost::Low => write!(f, "low"),
            Cost::Medium => write!(f, "medium"),
            Cost::High => write!(f, "high"),
        }
    }
}

/// A candidate action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub action: String,
    pub impact: Impact,
    pub cost: Cost,
}

/// An immutable decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: Uuid,
    #[serde(rename = "type")]
    pub decision_type: DecisionType,
    pub context: Params,
    pub options: Vec<DecisionOption>,
    pub selected_option: DecisionOption,
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    /// Outcome reported later through [`DecisionMakerAgent::record_outcome`].
    /// Absent counts as a success when computing confidence.
    #[serde(default)]
    pub success: Option<bool>,
}

type OptionRow = (&'static str, Impact, Cost);

const PERFORMANCE_OPTIONS: &[OptionRow] = &[
    ("scale_resources", Impact::High, Cost::Medium),
    ("optimize_algorithms", Impact::Medium, Cost::Low),
    ("restart_services", Impact::Medium, Cost::Low),
    ("investigate_root_cause", Impact::High, Cost::Low),
];

const SECURITY_OPTIONS: &[OptionRow] = &[
    ("isolate_affected_systems", Impact::High, Cost::High),
    ("update_security_policies", Impact::Medium, Cost::Low),
    ("notify_security_team", Impact::High, Cost::Low),
    ("run_security_scan", Impact::Medium, Cost::Low),
];

const RESOURCE_OPTIONS: &[OptionRow] = &[
    ("allocate_more_resources", Impact::High, Cost::High),
    ("optimize_current_resources", Impact::Medium, Cost::Low),
    ("queue_tasks", Impact::Low, Cost::None),
    ("implement_caching", Impact::Medium, Cost::Medium),
];

/// Rule-based decision maker with a bounded memory of past decisions.
pub struct DecisionMakerAgent {
    history: Mutex<VecDeque<Decision>>,
    capacity: usize,
}

impl DecisionMakerAgent {
    /// `capacity` bounds the retained history; the oldest record is evicted.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Classify, score and select, then append the decision to history.
    pub fn make_decision(&self, context: &Params) -> OverseerResult<Decision> {
        let decision_type = Self::classify(context);
        let options = Self::options_for(decision_type);
        let urgency = urgency(context)?;

        let (selected, score) = select_best(&options, urgency)
            .ok_or_else(|| OverseerError::NoOptions(decision_type.to_string()))?;
        let selected = selected.clone();

        let mut history = self.history.lock();
        let confidence = confidence(&history, decision_type);
        let decision = Decision {
            decision_id: Uuid::new_v4(),
            decision_type,
            context: context.clone(),
            reasoning: reasoning(&selected, context),
            options,
            selected_option: selected,
            score,
            confidence,
            timestamp: Utc::now(),
            success: None,
        };

        if history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(decision.clone());
        drop(history);

        info!(
            decision_id = %decision.decision_id,
            decision_type = %decision_type,
            action = %decision.selected_option.action,
            confidence = decision.confidence,
            "Decision made"
        );
        Ok(decision)
    }

    /// First matching context key wins.
    pub fn classify(context: &Params) -> DecisionType {
        if context.contains_key("performance_issue") {
            DecisionType::PerformanceOptimization
        } else if context.contains_key("security_alert") {
            DecisionType::SecurityResponse
        } else if context.contains_key("resource_constraint") {
            DecisionType::ResourceAllocation
        } else if context.contains_key("business_opportunity") {
            DecisionType::BusinessStrategy
        } else {
            DecisionType::OperationalDecision
        }
    }

    /// The static option table. Types without a table yield no options.
    pub fn options_for(decision_type: DecisionType) -> Vec<DecisionOption> {
        let rows: &[OptionRow] = match decision_type {
            DecisionType::PerformanceOptimization => PERFORMANCE_OPTIONS,
            DecisionType::SecurityResponse => SECURITY_OPTIONS,
            DecisionType::ResourceAllocation => RESOURCE_OPTIONS,
            DecisionType::BusinessStrategy | DecisionType::OperationalDecision => &[],
        };
        rows.iter()
            .map(|&(action, impact, cost)| DecisionOption {
                action: action.to_string(),
                impact,
                cost,
            })
            .collect()
    }

    /// `(impact*0.6 + cost*0.4) * urgency`, urgency defaulting to 1.0.
    pub fn score(option: &DecisionOption, urgency: Option<f64>) -> f64 {
        (option.impact.score() * IMPACT_WEIGHT + option.cost.score() * COST_WEIGHT)
            * urgency.unwrap_or(1.0)
    }

    /// Mark a retained decision as having worked out or not.
    pub fn record_outcome(&self, decision_id: Uuid, success: bool) -> OverseerResult<()> {
        let mut history = self.history.lock();
        let record = history
            .iter_mut()
            .find(|d| d.decision_id == decision_id)
            .ok_or_else(|| OverseerError::NotFound(format!("decision {decision_id}")))?;
        record.success = Some(success);
        debug!(decision_id = %decision_id, success, "Decision outcome recorded");
        Ok(())
    }

    /// Retained decisions, oldest first.
    pub fn history(&self) -> Vec<Decision> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

fn urgency(context: &Params) -> OverseerResult<Option<f64>> {
    match context.get("urgency") {
        None => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            OverseerError::Validation(format!("urgency must be a number, got {value}"))
        }),
    }
}

/// Strictly greatest score; earlier options win ties.
fn select_best(options: &[DecisionOption], urgency: Option<f64>) -> Option<(&DecisionOption, f64)> {
    let mut best: Option<(&DecisionOption, f64)> = None;
    for option in options {
        let score = DecisionMakerAgent::score(option, urgency);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((option, score)),
        }
    }
    best
}

fn confidence(history: &VecDeque<Decision>, decision_type: DecisionType) -> f64 {
    let similar: Vec<&Decision> = history
        .iter()
        .filter(|d| d.decision_type == decision_type)
        .collect();
    if similar.is_empty() {
        return BASE_CONFIDENCE;
    }
    let successes = similar.iter().filter(|d| d.success.unwrap_or(true)).count();
    let success_rate = successes as f64 / similar.len() as f64;
    ((BASE_CONFIDENCE + success_rate) / 2.0).clamp(0.0, 1.0)
}

fn reasoning(option: &DecisionOption, context: &Params) -> String {
    let mut text = format!(
        "Selected {} because it has {} impact and {} cost.",
        option.action, option.impact, option.cost
    );
    let urgent = context
        .get("urgency")
        .and_then(serde_json::Value::as_f64)
        .is_some_and(|u| u != 0.0);
    if urgent {
        text.push_str(" High urgency situation requires immediate action.");
    }
    let constrained = context
        .get("available_resources")
        .and_then(serde_json::Value::as_f64)
        .is_some_and(|r| r < 100.0);
    if constrained {
        text.push_str(" Resource constraints favor cost-effective solutions.");
    }
    text
}
