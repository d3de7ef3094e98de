//! Candidate validation for generated comparison payloads.
//!
//! Two passes: a JSON Schema pass for shape/type/cardinality, then semantic
//! checks the schema cannot express (impact-level coverage, finite numbers,
//! the duplication guard). Any failure is reported with a reason tag; the
//! orchestrator treats it like a transport failure and retries.

use std::collections::HashSet;
use std::fmt;

use jsonschema::Draft;
use serde_json::Value;

const OUTPUT_SCHEMA: &str = include_str!("../../schemas/comparison_output.schema.json");

/// Expected size of the action-label pool (3 roadmap points x 5 actions).
pub const EXPECTED_TASK_POOL: usize = 15;
/// Minimum distinct lower-cased `task` labels among the 15. Below this the
/// model has degenerated into repeated filler and the attempt is rejected.
pub const MIN_UNIQUE_TASKS: usize = 13;

/// Cardinalities that vary with the prompt variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectations {
    /// Exact number of legal optimizations the variant asked for (3 or 5).
    pub optimization_count: usize,
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Shape/type/cardinality violation caught by the JSON Schema.
    Schema,
    /// A numeric field failed to parse to a finite number.
    NonFiniteNumber,
    /// The roadmap does not cover each impact level exactly once.
    ImpactCoverage,
    /// Wrong number of legal optimizations for the requested variant.
    OptimizationCount,
    /// Too many repeated action labels across the roadmap.
    TaskDuplication,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::Schema => "schema",
            FailureReason::NonFiniteNumber => "non_finite_number",
            FailureReason::ImpactCoverage => "impact_coverage",
            FailureReason::OptimizationCount => "optimization_count",
            FailureReason::TaskDuplication => "task_duplication",
        }
    }
}

/// A rejected candidate, with the reason tag logged on retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl ValidationFailure {
    fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason.as_str(), self.detail)
    }
}

impl std::error::Error for ValidationFailure {}

/// Validate a decoded candidate against the output contract.
pub fn validate_candidate(
    candidate: &Value,
    expectations: &Expectations,
) -> Result<(), ValidationFailure> {
    validate_schema(candidate)?;
    validate_numbers(candidate)?;
    validate_roadmap(candidate)?;
    validate_optimizations(candidate, expectations)?;
    Ok(())
}

/// Validate against the embedded JSON Schema (Draft 2020-12).
fn validate_schema(candidate: &Value) -> Result<(), ValidationFailure> {
    let schema: Value = serde_json::from_str(OUTPUT_SCHEMA)
        .map_err(|err| ValidationFailure::new(FailureReason::Schema, err.to_string()))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| ValidationFailure::new(FailureReason::Schema, err.to_string()))?;
    let messages: Vec<String> = compiled
        .iter_errors(candidate)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(ValidationFailure::new(
            FailureReason::Schema,
            messages.join("; "),
        ));
    }
    Ok(())
}

const NUMERIC_FIELDS: [&str; 10] = [
    "monthlyRevenue",
    "simplesTotal",
    "reformTotal",
    "savings",
    "annualSavings",
    "ibsAmount",
    "cbsAmount",
    "creditsTaken",
    "effectiveRateSimples",
    "effectiveRateReform",
];

fn validate_numbers(candidate: &Value) -> Result<(), ValidationFailure> {
    for field in NUMERIC_FIELDS {
        if let Some(value) = candidate.get(field) {
            let finite = value.as_f64().is_some_and(f64::is_finite);
            if !finite {
                return Err(ValidationFailure::new(
                    FailureReason::NonFiniteNumber,
                    format!("field '{field}' is not a finite number"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_roadmap(candidate: &Value) -> Result<(), ValidationFailure> {
    let points = candidate["strategicRoadmap"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let mut levels: Vec<&str> = points
        .iter()
        .filter_map(|p| p["impactLevel"].as_str())
        .collect();
    levels.sort_unstable();
    let mut expected = vec!["ALTO", "BAIXO", "MÉDIO"];
    expected.sort_unstable();
    if levels != expected {
        return Err(ValidationFailure::new(
            FailureReason::ImpactCoverage,
            format!("impact levels {levels:?} must cover ALTO, MÉDIO and BAIXO exactly once"),
        ));
    }

    let tasks: Vec<String> = points
        .iter()
        .flat_map(|p| p["actions"].as_array().cloned().unwrap_or_default())
        .filter_map(|a| a["task"].as_str().map(|t| t.trim().to_lowercase()))
        .collect();
    let unique: HashSet<&String> = tasks.iter().collect();
    if unique.len() < MIN_UNIQUE_TASKS {
        return Err(ValidationFailure::new(
            FailureReason::TaskDuplication,
            format!(
                "only {} unique task labels out of {} (minimum {})",
                unique.len(),
                EXPECTED_TASK_POOL,
                MIN_UNIQUE_TASKS
            ),
        ));
    }

    Ok(())
}

fn validate_optimizations(
    candidate: &Value,
    expectations: &Expectations,
) -> Result<(), ValidationFailure> {
    let count = candidate["legalOptimizations"]
        .as_array()
        .map_or(0, Vec::len);
    if count != expectations.optimization_count {
        return Err(ValidationFailure::new(
            FailureReason::OptimizationCount,
            format!(
                "expected exactly {} legal optimizations, got {count}",
                expectations.optimization_count
            ),
        ));
    }
    Ok(())
}
