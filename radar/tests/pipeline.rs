//! End-to-end pipeline tests through the public API.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use serde_json::json;

use tributo_radar::core::model::{FALLBACK_HEALTH_SCORE, deterministic_result};
use tributo_radar::core::types::{BusinessSector, ImpactLevel, Recommendation, TaxInput};
use tributo_radar::io::config::RadarConfig;
use tributo_radar::io::generator::{CommandGenerator, GenRequest, GenerateError, Generator};
use tributo_radar::io::prompt::PromptVariant;
use tributo_radar::orchestrator::compute_comparison;

struct ScriptedGenerator {
    script: RefCell<Vec<Result<String, GenerateError>>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Result<String, GenerateError>>) -> Self {
        Self {
            script: RefCell::new(script),
        }
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, _request: &GenRequest) -> Result<String, GenerateError> {
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

fn fast_config() -> RadarConfig {
    let mut config = RadarConfig::default();
    config.retry.backoff_ms = 0;
    config
}

/// The worked example: generation unavailable, deterministic path serves the
/// documented figures.
#[test]
fn fallback_path_matches_the_worked_example() {
    let generator = ScriptedGenerator::new(vec![
        Err(GenerateError::Transport("down".to_string())),
        Err(GenerateError::Transport("down".to_string())),
        Err(GenerateError::Transport("down".to_string())),
    ]);
    let config = fast_config();
    let result = compute_comparison(&sample_input(), &generator, &config);

    assert!((result.simples_total - 22_492.80).abs() < 1e-6);
    assert!((result.reform_total - 14_045.0).abs() < 1e-6);
    assert!((result.credits_taken - 41_075.0).abs() < 1e-6);
    assert!((result.savings - 8_447.80).abs() < 1e-6);
    assert!((result.annual_savings - 101_373.60).abs() < 1e-6);
    assert_eq!(result.recommendation, Recommendation::Reforma);
    assert_eq!(result.health_score, FALLBACK_HEALTH_SCORE);

    // Output cardinalities hold on the fallback path.
    assert_eq!(result.strategic_roadmap.len(), 3);
    for point in &result.strategic_roadmap {
        assert_eq!(point.actions.len(), 5);
    }
    let mut tasks: Vec<String> = result
        .strategic_roadmap
        .iter()
        .flat_map(|p| p.actions.iter().map(|a| a.task.to_lowercase()))
        .collect();
    tasks.sort_unstable();
    tasks.dedup();
    assert_eq!(tasks.len(), 15);
}

/// Calling the pipeline twice with identical input and a dead backend yields
/// bit-identical numeric output.
#[test]
fn fallback_path_is_idempotent() {
    let config = fast_config();
    let dead = || {
        ScriptedGenerator::new(vec![
            Err(GenerateError::Transport("down".to_string())),
            Err(GenerateError::Transport("down".to_string())),
            Err(GenerateError::Transport("down".to_string())),
        ])
    };
    let a = compute_comparison(&sample_input(), &dead(), &config);
    let b = compute_comparison(&sample_input(), &dead(), &config);

    assert_eq!(a, b);
    assert_eq!(a.reform_total.to_bits(), b.reform_total.to_bits());
    assert_eq!(a.annual_savings.to_bits(), b.annual_savings.to_bits());
}

/// Tagged-variant completion decoded, validated and sanitized end to end.
#[test]
fn tagged_completion_flows_through_the_pipeline() {
    let mut config = fast_config();
    config.prompt.variant = PromptVariant::Tagged;

    let canned = deterministic_result(&sample_input(), &config.rates);
    let roadmap = serde_json::to_string(&canned.strategic_roadmap).expect("roadmap json");
    let optimizations =
        serde_json::to_string(&canned.legal_optimizations).expect("optimizations json");
    let drivers = serde_json::to_string(&canned.decision_drivers).expect("drivers json");

    let completion = format!(
        "Segue o parecer.\n\
         <simplesTotal>22492.80</simplesTotal>\n\
         <reformTotal>14045</reformTotal>\n\
         <recommendation>REFORMA</recommendation>\n\
         <analysis>Parecer do modelo em texto etiquetado.</analysis>\n\
         <technicalDetails>IBS e CBS somam 26,5% com créditos plenos.</technicalDetails>\n\
         <healthScore>88</healthScore>\n\
         <decisionDrivers>{drivers}</decisionDrivers>\n\
         <legalOptimizations>{optimizations}</legalOptimizations>\n\
         <strategicRoadmap>{roadmap}</strategicRoadmap>\n\
         Fim do parecer."
    );

    let generator = ScriptedGenerator::new(vec![Ok(completion)]);
    let result = compute_comparison(&sample_input(), &generator, &config);

    assert_eq!(result.health_score, 88);
    assert_eq!(result.analysis, "Parecer do modelo em texto etiquetado.");
    assert_eq!(result.legal_optimizations.len(), 3);
    assert_eq!(
        result
            .strategic_roadmap
            .iter()
            .map(|p| p.impact_level)
            .collect::<Vec<_>>(),
        ImpactLevel::ALL.to_vec()
    );
    assert!((result.savings - 8_447.80).abs() < 1e-6);
}

/// A schema-variant completion that violates the cardinality contract is
/// rejected and a later attempt wins.
#[test]
fn invalid_then_valid_schema_completion() {
    let config = fast_config();
    let canned = deterministic_result(&sample_input(), &config.rates);

    // 3 optimizations where the schema variant demands 5.
    let short = serde_json::to_string(&canned).expect("serialize");

    let mut value = serde_json::to_value(&canned).expect("to_value");
    let optimizations = value["legalOptimizations"].as_array_mut().expect("array");
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
    let full = serde_json::to_string(&value).expect("serialize");

    let generator = ScriptedGenerator::new(vec![Ok(short), Ok(full)]);
    let result = compute_comparison(&sample_input(), &generator, &config);
    assert_eq!(result.legal_optimizations.len(), 5);
}

/// A slow backend is cut off by the per-attempt budget and the caller still
/// gets a result within the documented bound.
#[test]
fn slow_backend_is_bounded_by_the_timeout() {
    let mut config = fast_config();
    config.generator.command = vec!["sleep".to_string(), "30".to_string()];
    config.generator.timeout_secs = 1;
    config.retry.max_attempts = 1;

    let generator = CommandGenerator::from_config(&config.generator);
    let started = Instant::now();
    let result = compute_comparison(&sample_input(), &generator, &config);
    let elapsed = started.elapsed();

    // One attempt of 1s plus fallback compute time, with generous slack.
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    assert_eq!(result.health_score, FALLBACK_HEALTH_SCORE);
}
