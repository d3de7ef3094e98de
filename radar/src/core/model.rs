//! Deterministic arithmetic model for both regimes.
//!
//! Pure functions only: no clock, no I/O, no generation backend. This module
//! is the guaranteed-success path the orchestrator falls back to, so it must
//! never fail and must be bit-identical across calls for identical input.

use crate::core::playbook::{fallback_optimizations, fallback_roadmap};
use crate::core::types::{ComparisonResult, Rates, Recommendation, TaxInput};

/// Confidence indicator attached to deterministic results. Fixed per code
/// path, not derived from the figures.
pub const FALLBACK_HEALTH_SCORE: u8 = 80;

/// Numeric core of a comparison, before any narrative content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub simples_total: f64,
    /// Net reform tax, clamped to >= 0 (credits may exceed the gross debit
    /// when purchases approach or exceed revenue).
    pub reform_total: f64,
    pub credits: f64,
    pub effective_rate_simples: f64,
    pub effective_rate_reform: f64,
    pub ibs_amount: f64,
    pub cbs_amount: f64,
    pub recommendation: Recommendation,
}

/// Compute both regimes' totals and derived metrics.
///
/// Ties between the totals favor the declared-rate regime: the reform is
/// only recommended when it is strictly cheaper.
pub fn compute_totals(input: &TaxInput, rates: &Rates) -> Totals {
    let declared_rate = input.declared_rate(rates);
    let simples_total = input.monthly_revenue * declared_rate / 100.0;

    let taxable_inputs = input.monthly_purchases + input.other_inputs;
    let credits = taxable_inputs * rates.credit_rate;
    let gross_reform = input.monthly_revenue * rates.credit_rate;
    let reform_total = (gross_reform - credits).max(0.0);

    let effective_rate_reform = if input.monthly_revenue > 0.0 {
        reform_total / input.monthly_revenue * 100.0
    } else {
        0.0
    };

    let recommendation = if reform_total < simples_total {
        Recommendation::Reforma
    } else {
        Recommendation::Simples
    };

    let ibs_amount = reform_total * rates.ibs_share;

    Totals {
        simples_total,
        reform_total,
        credits,
        effective_rate_simples: declared_rate,
        effective_rate_reform,
        ibs_amount,
        // Remainder rather than a second multiplication, so the two slices
        // always sum exactly to the reform total.
        cbs_amount: reform_total - ibs_amount,
        recommendation,
    }
}

/// Build a fully-specified result without any generation backend.
///
/// Narrative fields come from the canned playbook pool with the computed
/// figures interpolated. This is the terminal recovery path of the
/// orchestrator and is never itself retried.
pub fn deterministic_result(input: &TaxInput, rates: &Rates) -> ComparisonResult {
    let totals = compute_totals(input, rates);
    let savings = (totals.simples_total - totals.reform_total).abs();

    let analysis = format!(
        "A análise demonstra que a transição para o IBS/CBS altera a dinâmica \
         competitiva da empresa. No modelo atual (Simples), o imposto incide sobre \
         a receita bruta de {} sem direito a créditos significativos. Na Reforma, \
         a não-cumulatividade plena permite abater {} em créditos sobre compras e \
         custos operacionais, levando a carga mensal a {}.",
        format_brl(input.monthly_revenue),
        format_brl(totals.credits),
        format_brl(totals.reform_total),
    );
    let technical_details = format!(
        "O CBS (federal) e o IBS (subnacional) somam {:.1}% sobre o faturamento. \
         O diferencial competitivo está na apropriação de {} em créditos mensais, \
         decompondo o imposto em {} de IBS e {} de CBS.",
        rates.credit_rate * 100.0,
        format_brl(totals.credits),
        format_brl(totals.ibs_amount),
        format_brl(totals.cbs_amount),
    );

    let winner = match totals.recommendation {
        Recommendation::Reforma => format!(
            "O modelo não-cumulativo reduz a carga tributária em {} por mês.",
            format_brl(savings)
        ),
        Recommendation::Simples => format!(
            "A alíquota declarada do Simples permanece mais vantajosa por {} ao mês.",
            format_brl(savings)
        ),
    };
    let decision_drivers = vec![
        format!(
            "Créditos mensais de {} sobre compras e custos operacionais.",
            format_brl(totals.credits)
        ),
        format!(
            "Alíquota efetiva de {:.2}% na Reforma contra {:.2}% no Simples.",
            totals.effective_rate_reform, totals.effective_rate_simples
        ),
        format!(
            "Folha de pagamento de {} não gera crédito direto no modelo de valor adicionado.",
            format_brl(input.payroll)
        ),
        winner,
    ];

    ComparisonResult {
        monthly_revenue: input.monthly_revenue,
        sector: input.sector,
        simples_total: totals.simples_total,
        reform_total: totals.reform_total,
        savings,
        annual_savings: savings * 12.0,
        recommendation: totals.recommendation,
        analysis,
        decision_drivers,
        technical_details,
        ibs_amount: totals.ibs_amount,
        cbs_amount: totals.cbs_amount,
        credits_taken: totals.credits,
        effective_rate_simples: totals.effective_rate_simples,
        effective_rate_reform: totals.effective_rate_reform,
        strategic_roadmap: fallback_roadmap(),
        legal_optimizations: fallback_optimizations(),
        health_score: FALLBACK_HEALTH_SCORE,
    }
}

/// Format a BRL amount with pt-BR separators ("R$ 41.075,00").
pub fn format_brl(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac:02}")
}
