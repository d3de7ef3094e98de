//! Retry/fallback orchestration around the generation backend.
//!
//! The contract is total: a [`ComparisonResult`] is always returned, never an
//! error. Generation, parsing and validation failures are absorbed by the
//! attempt loop; exhaustion switches to the deterministic arithmetic path,
//! which is a silent quality degradation observable only through tracing.

use std::thread;

use tracing::{debug, info, instrument, warn};

use crate::core::model::deterministic_result;
use crate::core::sanitize::{Candidate, sanitize};
use crate::core::types::{ComparisonResult, TaxInput};
use crate::core::validate::{Expectations, validate_candidate};
use crate::io::config::RadarConfig;
use crate::io::generator::{GenRequest, GenerateError, Generator};
use crate::io::parse::{ParseError, decode_candidate};
use crate::io::prompt::{PromptVariant, build_prompt};

/// Why a single attempt was rejected. Logged per retry.
#[derive(Debug)]
enum AttemptFailure {
    Generate(GenerateError),
    Parse(ParseError),
    Validation(crate::core::validate::ValidationFailure),
}

impl AttemptFailure {
    fn kind(&self) -> &'static str {
        match self {
            AttemptFailure::Generate(err) => err.kind(),
            AttemptFailure::Parse(_) => "parse",
            AttemptFailure::Validation(_) => "validation",
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Generate(err) => err.fmt(f),
            AttemptFailure::Parse(err) => err.fmt(f),
            AttemptFailure::Validation(err) => err.fmt(f),
        }
    }
}

/// Run the full comparison pipeline for one input.
///
/// Attempts are sequential; retry state lives in this call frame, so
/// concurrent invocations are independent. The caller must have filled
/// defaults and guaranteed `monthly_revenue > 0`.
#[instrument(skip_all, fields(variant = ?config.prompt.variant, max_attempts = config.retry.max_attempts))]
pub fn compute_comparison<G: Generator>(
    input: &TaxInput,
    generator: &G,
    config: &RadarConfig,
) -> ComparisonResult {
    let variant = config.prompt.variant;
    let expectations = variant.expectations();
    let max_attempts = config.retry.max_attempts;

    for attempt in 1..=max_attempts {
        let request = GenRequest {
            prompt: build_prompt(variant, input, &config.rates),
            timeout: config.generator.timeout(),
            output_limit_bytes: config.generator.output_limit_bytes,
        };

        match run_attempt(generator, &request, variant, &expectations) {
            Ok(candidate) => {
                info!(attempt, "generation attempt accepted");
                return sanitize(input, &config.rates, candidate);
            }
            Err(failure) => {
                warn!(
                    attempt,
                    max_attempts,
                    reason = failure.kind(),
                    detail = %failure,
                    "generation attempt rejected"
                );
                if attempt < max_attempts {
                    let backoff = config.retry.backoff();
                    if !backoff.is_zero() {
                        debug!(backoff_ms = backoff.as_millis() as u64, "backing off");
                        thread::sleep(backoff);
                    }
                }
            }
        }
    }

    warn!("generation exhausted, serving the deterministic result");
    let fallback = deterministic_result(input, &config.rates);
    sanitize(input, &config.rates, Candidate::from(fallback))
}

fn run_attempt<G: Generator>(
    generator: &G,
    request: &GenRequest,
    variant: PromptVariant,
    expectations: &Expectations,
) -> Result<Candidate, AttemptFailure> {
    let completion = generator
        .generate(request)
        .map_err(AttemptFailure::Generate)?;

    let value = decode_candidate(&completion, variant).map_err(AttemptFailure::Parse)?;
    validate_candidate(&value, expectations).map_err(AttemptFailure::Validation)?;

    serde_json::from_value::<Candidate>(value).map_err(|err| {
        AttemptFailure::Parse(ParseError {
            detail: format!("validated candidate failed typed projection: {err}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FALLBACK_HEALTH_SCORE, deterministic_result};
    use crate::core::types::{BusinessSector, Recommendation};
    use serde_json::json;
    use std::cell::RefCell;

    /// Scripted completions, consumed one per attempt.
    struct ScriptedGenerator {
        script: RefCell<Vec<Result<String, GenerateError>>>,
        calls: RefCell<u32>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<String, GenerateError>>) -> Self {
            Self {
                script: RefCell::new(script),
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.borrow()
        }
    }

    impl Generator for ScriptedGenerator {
        fn generate(&self, _request: &GenRequest) -> Result<String, GenerateError> {
            *self.calls.borrow_mut() += 1;
            let mut script = self.script.borrow_mut();
            if script.is_empty() {
                return Err(GenerateError::Transport("script exhausted".to_string()));
            }
            script.remove(0)
        }
    }

    fn sample_input() -> TaxInput {
        TaxInput {
            monthly_revenue: 208_000.0,
            monthly_purchases: 140_000.0,
            payroll: 29_852.0,
            other_inputs: 15_000.0,
            accumulated_revenue: 2_500_000.0,
            sector: BusinessSector::Commerce,
            simples_annex: 1,
            custom_simples_rate: Some(10.81),
        }
    }

    fn test_config() -> RadarConfig {
        let mut config = RadarConfig::default();
        config.retry.backoff_ms = 0;
        config
    }

    /// A completion the validator accepts under the Schema variant
    /// (five legal optimizations).
    fn valid_completion() -> String {
        let mut value =
            serde_json::to_value(deterministic_result(&sample_input(), &test_config().rates))
                .expect("serialize");
        let optimizations = value["legalOptimizations"]
            .as_array_mut()
            .expect("optimizations");
        optimizations.push(json!({
            "title": "Aproveitamento de Saldos Credores",
            "howToImplement": "Mapear créditos acumulados e pedir ressarcimento.",
            "benefitExpected": "Recuperação de caixa imobilizado."
        }));
        optimizations.push(json!({
            "title": "Planejamento do Fator R",
            "howToImplement": "Rever a proporção folha/faturamento trimestralmente.",
            "benefitExpected": "Enquadramento no anexo mais favorável."
        }));
        value["healthScore"] = json!(92);
        value["analysis"] = json!("Parecer gerado pelo modelo.");
        serde_json::to_string(&value).expect("serialize completion")
    }

    #[test]
    fn first_valid_attempt_is_accepted() {
        let generator = ScriptedGenerator::new(vec![Ok(valid_completion())]);
        let result = compute_comparison(&sample_input(), &generator, &test_config());

        assert_eq!(generator.calls(), 1);
        assert_eq!(result.health_score, 92);
        assert_eq!(result.analysis, "Parecer gerado pelo modelo.");
        assert_eq!(result.legal_optimizations.len(), 5);
        // Derived identities hold even on the generated path.
        assert_eq!(result.savings, (result.simples_total - result.reform_total).abs());
        assert_eq!(result.annual_savings, result.savings * 12.0);
    }

    #[test]
    fn failures_are_retried_until_a_valid_attempt() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerateError::Transport("connection reset".to_string())),
            Ok("prosa sem objeto json".to_string()),
            Ok(valid_completion()),
        ]);
        let result = compute_comparison(&sample_input(), &generator, &test_config());

        assert_eq!(generator.calls(), 3);
        assert_eq!(result.health_score, 92);
    }

    #[test]
    fn exhaustion_falls_back_to_the_deterministic_result() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerateError::Timeout(std::time::Duration::from_secs(12))),
            Err(GenerateError::Transport("boom".to_string())),
            Err(GenerateError::Transport("boom".to_string())),
        ]);
        let config = test_config();
        let result = compute_comparison(&sample_input(), &generator, &config);

        assert_eq!(generator.calls(), config.retry.max_attempts);
        assert_eq!(result, deterministic_result(&sample_input(), &config.rates));
        assert_eq!(result.health_score, FALLBACK_HEALTH_SCORE);
        assert_eq!(result.recommendation, Recommendation::Reforma);
    }

    #[test]
    fn degenerate_output_is_rejected_and_falls_back() {
        // Valid shape, but every action label is the same: fails the
        // duplication guard on all attempts.
        let mut value =
            serde_json::to_value(deterministic_result(&sample_input(), &test_config().rates))
                .expect("serialize");
        for point in value["strategicRoadmap"].as_array_mut().expect("roadmap") {
            for action in point["actions"].as_array_mut().expect("actions") {
                action["task"] = json!("Revisar processos");
            }
        }
        let degenerate = serde_json::to_string(&value).expect("serialize");

        let generator = ScriptedGenerator::new(vec![
            Ok(degenerate.clone()),
            Ok(degenerate.clone()),
            Ok(degenerate),
        ]);
        let config = test_config();
        let result = compute_comparison(&sample_input(), &generator, &config);

        assert_eq!(generator.calls(), config.retry.max_attempts);
        assert_eq!(result.health_score, FALLBACK_HEALTH_SCORE);
        // Fallback roadmap has 15 unique labels again.
        let mut tasks: Vec<String> = result
            .strategic_roadmap
            .iter()
            .flat_map(|p| p.actions.iter().map(|a| a.task.to_lowercase()))
            .collect();
        tasks.sort_unstable();
        tasks.dedup();
        assert_eq!(tasks.len(), 15);
    }

    #[test]
    fn attempt_budget_is_never_exceeded() {
        let mut config = test_config();
        config.retry.max_attempts = 2;
        let generator = ScriptedGenerator::new(vec![
            Err(GenerateError::Transport("a".to_string())),
            Err(GenerateError::Transport("b".to_string())),
            Ok(valid_completion()),
        ]);

        let result = compute_comparison(&sample_input(), &generator, &config);
        assert_eq!(generator.calls(), 2);
        assert_eq!(result.health_score, FALLBACK_HEALTH_SCORE);
    }
}
