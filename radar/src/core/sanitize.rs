//! Last line of defense before a result reaches the caller.
//!
//! Every field of the final object is coerced to its expected type or
//! replaced with a computed/documented default, so the report-rendering
//! collaborator never sees a missing or non-finite numeric value. Derived
//! identities (savings, annual savings, recommendation, IBS/CBS split,
//! effective reform rate) are recomputed unconditionally from the final
//! totals so they hold exactly on both the generated and fallback paths.

use serde::Deserialize;

use crate::core::model::{FALLBACK_HEALTH_SCORE, compute_totals, deterministic_result};
use crate::core::types::{
    ComparisonResult, ImpactLevel, LegalOptimization, Rates, Recommendation, StrategicPoint,
    TaxInput,
};

/// Loosely-typed candidate as decoded from a generation attempt.
///
/// All fields are optional or defaulted; [`sanitize`] fills the gaps. The
/// fallback path also passes through here (via `From<ComparisonResult>`) so
/// both paths share one guarantee.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Candidate {
    pub simples_total: Option<f64>,
    pub reform_total: Option<f64>,
    pub credits_taken: Option<f64>,
    pub effective_rate_simples: Option<f64>,
    pub health_score: Option<f64>,
    pub analysis: Option<String>,
    pub technical_details: Option<String>,
    pub decision_drivers: Vec<String>,
    pub strategic_roadmap: Vec<StrategicPoint>,
    pub legal_optimizations: Vec<LegalOptimization>,
}

impl From<ComparisonResult> for Candidate {
    fn from(result: ComparisonResult) -> Self {
        Self {
            simples_total: Some(result.simples_total),
            reform_total: Some(result.reform_total),
            credits_taken: Some(result.credits_taken),
            effective_rate_simples: Some(result.effective_rate_simples),
            health_score: Some(f64::from(result.health_score)),
            analysis: Some(result.analysis),
            technical_details: Some(result.technical_details),
            decision_drivers: result.decision_drivers,
            strategic_roadmap: result.strategic_roadmap,
            legal_optimizations: result.legal_optimizations,
        }
    }
}

/// Coerce a candidate into a fully-specified [`ComparisonResult`].
pub fn sanitize(input: &TaxInput, rates: &Rates, candidate: Candidate) -> ComparisonResult {
    let computed = compute_totals(input, rates);
    // Deterministic narrative used wherever the candidate text is unusable.
    let canned = deterministic_result(input, rates);

    let simples_total = pick_amount(candidate.simples_total, computed.simples_total);
    let reform_total = pick_amount(candidate.reform_total, computed.reform_total);
    let credits_taken = pick_amount(candidate.credits_taken, computed.credits);

    let savings = (simples_total - reform_total).abs();
    let recommendation = if reform_total < simples_total {
        Recommendation::Reforma
    } else {
        Recommendation::Simples
    };
    let effective_rate_reform = if input.monthly_revenue > 0.0 {
        reform_total / input.monthly_revenue * 100.0
    } else {
        0.0
    };
    let ibs_amount = reform_total * rates.ibs_share;

    let mut strategic_roadmap = if roadmap_is_usable(&candidate.strategic_roadmap) {
        candidate.strategic_roadmap
    } else {
        canned.strategic_roadmap
    };
    strategic_roadmap.sort_by_key(|point| point.impact_level.priority());

    let legal_optimizations = if (3..=5).contains(&candidate.legal_optimizations.len()) {
        candidate.legal_optimizations
    } else {
        canned.legal_optimizations
    };
    let decision_drivers = if (3..=4).contains(&candidate.decision_drivers.len()) {
        candidate.decision_drivers
    } else {
        canned.decision_drivers
    };

    ComparisonResult {
        monthly_revenue: input.monthly_revenue,
        sector: input.sector,
        simples_total,
        reform_total,
        savings,
        annual_savings: savings * 12.0,
        recommendation,
        analysis: pick_text(candidate.analysis, canned.analysis),
        decision_drivers,
        technical_details: pick_text(candidate.technical_details, canned.technical_details),
        ibs_amount,
        cbs_amount: reform_total - ibs_amount,
        credits_taken,
        effective_rate_simples: candidate
            .effective_rate_simples
            .filter(|rate| rate.is_finite() && *rate >= 0.0)
            .unwrap_or(computed.effective_rate_simples),
        effective_rate_reform,
        strategic_roadmap,
        legal_optimizations,
        health_score: pick_health_score(candidate.health_score),
    }
}

/// Keep a candidate amount only when it is a finite non-negative number.
fn pick_amount(candidate: Option<f64>, fallback: f64) -> f64 {
    candidate
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(fallback)
}

fn pick_text(candidate: Option<String>, fallback: String) -> String {
    match candidate {
        Some(text) if !text.trim().is_empty() => text,
        _ => fallback,
    }
}

fn pick_health_score(candidate: Option<f64>) -> u8 {
    match candidate {
        Some(score) if score.is_finite() => score.round().clamp(0.0, 100.0) as u8,
        _ => FALLBACK_HEALTH_SCORE,
    }
}

/// A roadmap is usable when it has the contracted shape: three points, one
/// per impact level, five actions each.
fn roadmap_is_usable(roadmap: &[StrategicPoint]) -> bool {
    if roadmap.len() != 3 {
        return false;
    }
    if roadmap.iter().any(|point| point.actions.len() != 5) {
        return false;
    }
    ImpactLevel::ALL
        .iter()
        .all(|level| roadmap.iter().any(|point| point.impact_level == *level))
}
