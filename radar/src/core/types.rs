//! Shared contracts between the comparison engine components.
//!
//! These types define the stable wire format consumed by report-rendering
//! collaborators. Field names serialize in camelCase and enum values keep
//! their original pt-BR labels, so a result round-trips against the
//! pre-existing JSON contract.

use serde::{Deserialize, Serialize};

/// Business sector declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessSector {
    #[serde(rename = "Comércio")]
    Commerce,
    #[serde(rename = "Serviços")]
    Services,
    #[serde(rename = "Indústria")]
    Industry,
}

/// Input figures for one comparison. Monetary fields are monthly BRL amounts.
///
/// The caller fills defaults before invoking the engine; `monthly_revenue`
/// must be positive (it is used as a divisor for effective rates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInput {
    pub monthly_revenue: f64,
    /// Purchases of goods/inputs. Generate full credit under the reform.
    pub monthly_purchases: f64,
    /// Payroll. No direct credit under the value-added model.
    pub payroll: f64,
    /// Other creditable fixed costs (energy, rent, telecom).
    pub other_inputs: f64,
    /// Accumulated revenue over the last 12 months.
    pub accumulated_revenue: f64,
    pub sector: BusinessSector,
    /// Simples Nacional annex (1..=5).
    pub simples_annex: u8,
    /// Effective Simples rate declared by the user, in percent.
    /// Falls back to [`Rates::default_simples_rate`] when unset.
    #[serde(default)]
    pub custom_simples_rate: Option<f64>,
}

impl TaxInput {
    /// Declared Simples rate in percent, defaulting when the user left it out.
    pub fn declared_rate(&self, rates: &Rates) -> f64 {
        self.custom_simples_rate
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(rates.default_simples_rate)
    }
}

/// Tunable regime constants.
///
/// The reform legislation itself is not settled on a single headline rate or
/// IBS/CBS split, so both are configuration rather than law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rates {
    /// Reform debit/credit rate applied to revenue and creditable inputs.
    pub credit_rate: f64,
    /// Default effective Simples rate in percent.
    pub default_simples_rate: f64,
    /// IBS share of the reform total; CBS takes the remainder.
    pub ibs_share: f64,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            credit_rate: 0.265,
            default_simples_rate: 10.81,
            ibs_share: 0.65,
        }
    }
}

/// Regime the comparison recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// Declared-rate regime: flat percentage on gross revenue, no credits.
    #[serde(rename = "SIMPLES")]
    Simples,
    /// Credit-based regime: value-added tax net of input credits.
    #[serde(rename = "REFORMA")]
    Reforma,
}

/// Priority bucket for a roadmap entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLevel {
    #[serde(rename = "ALTO")]
    Alto,
    #[serde(rename = "MÉDIO")]
    Medio,
    #[serde(rename = "BAIXO")]
    Baixo,
}

impl ImpactLevel {
    /// Fixed ordering used to normalize roadmap output: Alto first.
    pub fn priority(self) -> u8 {
        match self {
            ImpactLevel::Alto => 0,
            ImpactLevel::Medio => 1,
            ImpactLevel::Baixo => 2,
        }
    }

    pub const ALL: [ImpactLevel; 3] = [ImpactLevel::Alto, ImpactLevel::Medio, ImpactLevel::Baixo];
}

/// One concrete step inside a roadmap entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicAction {
    /// Short unique label. Uniqueness across the whole roadmap is enforced
    /// by the validator (duplication guard).
    pub task: String,
    pub description: String,
    pub implementation: String,
}

/// A prioritized recommendation bucket with its action steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicPoint {
    pub title: String,
    pub description: String,
    pub impact_level: ImpactLevel,
    /// Exactly five per point.
    pub actions: Vec<StrategicAction>,
}

/// A lawful tax-reduction strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalOptimization {
    pub title: String,
    pub how_to_implement: String,
    pub benefit_expected: String,
}

/// Full comparison output. Constructed fresh per invocation, never mutated
/// after return. Every numeric field is finite; list cardinalities are
/// guaranteed by the sanitizer regardless of which path produced the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub monthly_revenue: f64,
    pub sector: BusinessSector,
    /// Monthly tax under the declared-rate regime.
    pub simples_total: f64,
    /// Monthly tax under the credit-based regime, clamped to >= 0.
    pub reform_total: f64,
    /// `|simples_total - reform_total|`.
    pub savings: f64,
    /// `savings * 12`.
    pub annual_savings: f64,
    pub recommendation: Recommendation,
    pub analysis: String,
    /// Key points behind the recommendation, 3 to 4 entries.
    pub decision_drivers: Vec<String>,
    pub technical_details: String,
    /// IBS slice of `reform_total` per the configured split.
    pub ibs_amount: f64,
    /// CBS slice of `reform_total`.
    pub cbs_amount: f64,
    /// `(purchases + other inputs) * credit_rate`.
    pub credits_taken: f64,
    pub effective_rate_simples: f64,
    /// `reform_total / revenue * 100`.
    pub effective_rate_reform: f64,
    /// Three entries, one per impact level, ordered Alto > Médio > Baixo.
    pub strategic_roadmap: Vec<StrategicPoint>,
    /// Three or five entries depending on the prompt variant.
    pub legal_optimizations: Vec<LegalOptimization>,
    /// Fixed confidence indicator in 0..=100, constant per code path.
    pub health_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_serializes_to_original_labels() {
        assert_eq!(
            serde_json::to_string(&Recommendation::Simples).expect("serialize"),
            "\"SIMPLES\""
        );
        assert_eq!(
            serde_json::to_string(&Recommendation::Reforma).expect("serialize"),
            "\"REFORMA\""
        );
    }

    #[test]
    fn impact_levels_keep_accented_labels_and_priority_order() {
        assert_eq!(
            serde_json::to_string(&ImpactLevel::Medio).expect("serialize"),
            "\"MÉDIO\""
        );
        assert!(ImpactLevel::Alto.priority() < ImpactLevel::Medio.priority());
        assert!(ImpactLevel::Medio.priority() < ImpactLevel::Baixo.priority());
    }

    #[test]
    fn tax_input_uses_camel_case_wire_names() {
        let input = TaxInput {
            monthly_revenue: 208_000.0,
            monthly_purchases: 140_000.0,
            payroll: 29_852.0,
            other_inputs: 15_000.0,
            accumulated_revenue: 2_500_000.0,
            sector: BusinessSector::Commerce,
            simples_annex: 1,
            custom_simples_rate: Some(10.81),
        };
        let json = serde_json::to_value(&input).expect("serialize");
        assert!(json.get("monthlyRevenue").is_some());
        assert!(json.get("customSimplesRate").is_some());
        assert_eq!(json["sector"], "Comércio");
    }

    #[test]
    fn declared_rate_falls_back_when_unset_or_degenerate() {
        let rates = Rates::default();
        let mut input = TaxInput {
            monthly_revenue: 1.0,
            monthly_purchases: 0.0,
            payroll: 0.0,
            other_inputs: 0.0,
            accumulated_revenue: 0.0,
            sector: BusinessSector::Services,
            simples_annex: 3,
            custom_simples_rate: None,
        };
        assert_eq!(input.declared_rate(&rates), 10.81);

        input.custom_simples_rate = Some(f64::NAN);
        assert_eq!(input.declared_rate(&rates), 10.81);

        input.custom_simples_rate = Some(8.5);
        assert_eq!(input.declared_rate(&rates), 8.5);
    }
}
