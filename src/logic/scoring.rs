use super::types::{ArbitrageRoute, ExecutionComplexity};
use std::cmp::Ordering;

const MAX_SCORE: f64 = 10.0;
const CROSS_CHAIN_RISK: f64 = 3.0;

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, MAX_SCORE) }
}

/// `hops + 100 * total_price_impact (+3 cross-chain)`, capped at 10.
pub fn risk_score(hop_count: usize, total_price_impact: f64, cross_chain: bool) -> f64 {
    let mut risk = hop_count as f64 + 100.0 * total_price_impact;
    if cross_chain {
        risk += CROSS_CHAIN_RISK;
    }
    clamp_score(risk)
}

pub fn execution_complexity(hop_count: usize) -> ExecutionComplexity {
    match hop_count {
        0..=2 => ExecutionComplexity::Simple,
        3 => ExecutionComplexity::Medium,
        _ => ExecutionComplexity::Complex,
    }
}

/// Inputs of the viability score, all in USD except where noted.
#[derive(Debug, Clone, Copy)]
pub struct ViabilityInputs {
    /// Net profit relative to the input value.
    pub profit_margin: f64,
    pub gross_profit: f64,
    pub gas_cost: f64,
    /// Fraction, summed over hops.
    pub total_price_impact: f64,
    pub hop_count: usize,
}

/// Average of four 0..=10 sub-scores: profit, gas penalty, impact penalty and hop penalty.
pub fn viability_score(inputs: &ViabilityInputs) -> f64 {
    let profit = clamp_score(inputs.profit_margin * 200.0);

    let gas = if inputs.gross_profit > 0.0 { clamp_score(MAX_SCORE * (1.0 - inputs.gas_cost / inputs.gross_profit)) } else { 0.0 };

    let impact = clamp_score(MAX_SCORE - 200.0 * inputs.total_price_impact);

    let hops = clamp_score(MAX_SCORE - 2.0 * inputs.hop_count.saturating_sub(2) as f64);

    (profit + gas + impact + hops) / 4.0
}

/// Ranking order: viability descending, then estimated profit descending.
pub fn compare_routes(a: &ArbitrageRoute, b: &ArbitrageRoute) -> Ordering {
    b.viability_score.total_cmp(&a.viability_score).then_with(|| b.estimated_profit.total_cmp(&a.estimated_profit)).then_with(|| a.id.cmp(&b.id))
}
