//! Prompt builder for the generation backend.
//!
//! One template, variant-driven: the [`PromptVariant`] selects the response
//! format (strict JSON vs tagged text) and the list cardinalities the model
//! is held to, instead of duplicating whole prompt-building functions per
//! shape.

use clap::ValueEnum;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use crate::core::model::format_brl;
use crate::core::types::{BusinessSector, Rates, TaxInput};
use crate::core::validate::Expectations;

const COMPARISON_TEMPLATE: &str = include_str!("../../prompts/comparison.md");

/// Output contract requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    /// Pure JSON response, five legal optimizations.
    Schema,
    /// Per-field `<name>...</name>` tagged text, three legal optimizations.
    Tagged,
}

impl PromptVariant {
    /// Exact number of legal optimizations this variant asks for.
    pub fn optimization_count(self) -> usize {
        match self {
            PromptVariant::Schema => 5,
            PromptVariant::Tagged => 3,
        }
    }

    /// Validator expectations matching this variant's cardinalities.
    pub fn expectations(self) -> Expectations {
        Expectations {
            optimization_count: self.optimization_count(),
        }
    }
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("comparison", COMPARISON_TEMPLATE)
            .expect("comparison template should be valid");
        Self { env }
    }

    fn render(&self, variant: PromptVariant, input: &TaxInput, rates: &Rates) -> String {
        let template = self
            .env
            .get_template("comparison")
            .expect("comparison template should be registered");
        template
            .render(context! {
                sector => sector_label(input.sector),
                revenue => format_brl(input.monthly_revenue),
                purchases => format_brl(input.monthly_purchases),
                payroll => format_brl(input.payroll),
                other_inputs => format_brl(input.other_inputs),
                declared_rate => format!("{:.2}", input.declared_rate(rates)),
                credit_rate => format!("{:.3}", rates.credit_rate),
                credit_rate_pct => format!("{:.1}", rates.credit_rate * 100.0),
                ibs_share => format!("{:.2}", rates.ibs_share),
                optimization_count => variant.optimization_count(),
                schema_mode => variant == PromptVariant::Schema,
            })
            .expect("comparison template rendering should not fail")
    }
}

fn sector_label(sector: BusinessSector) -> &'static str {
    match sector {
        BusinessSector::Commerce => "Comércio",
        BusinessSector::Services => "Serviços",
        BusinessSector::Industry => "Indústria",
    }
}

/// Build the instruction prompt for one generation attempt.
pub fn build_prompt(variant: PromptVariant, input: &TaxInput, rates: &Rates) -> String {
    PromptEngine::new().render(variant, input, rates)
}
