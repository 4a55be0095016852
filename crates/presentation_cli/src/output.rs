//! Human-readable rendering of command results

use std::fmt::Write;

use application::BudgetStatus;
use domain::{Candidate, Hub, ResolutionResult};

/// Render a resolution for the terminal
pub fn render_resolution(result: &ResolutionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📍 Meeting point: {}", result.coordinate);

    match (&result.candidate_label, &result.provider) {
        (Some(label), Some(provider)) => {
            let _ = writeln!(out, "   Station:   {label}");
            let _ = writeln!(out, "   Provider:  {provider}");
        },
        _ => {
            let reason = result
                .fallback_reason
                .map_or_else(|| "unknown".to_string(), |r| r.to_string());
            let _ = writeln!(out, "⚠️  Geometric midpoint only ({reason})");
        },
    }

    if let Some(score) = &result.score_breakdown {
        let _ = writeln!(
            out,
            "   Score:     {:.0} (travel {:.0}s, fairness +{:.0}, transfers +{:.0}, hub -{:.0})",
            score.total,
            score.travel_time_secs,
            score.fairness_penalty,
            score.transfer_penalty,
            score.importance_bonus
        );
    }

    let _ = writeln!(out, "   Evaluated: {} candidate(s)", result.candidates_evaluated);
    for skipped in &result.skipped {
        let _ = writeln!(out, "   ✗ {}: {}", skipped.label, skipped.reason);
    }
    out
}

/// Render the budget table
pub fn render_budget(status: &[BudgetStatus]) -> String {
    if status.is_empty() {
        return "No providers configured\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<8} {:>10} {:>10} {:>8}  policy",
        "provider", "period", "requests", "spend", "usage"
    );
    for entry in status {
        let _ = writeln!(
            out,
            "{:<16} {:<8} {:>10} {:>10.2} {:>7.1}%  {}",
            entry.provider_id.as_str(),
            entry.period.to_string(),
            entry.consumed_requests,
            entry.spend,
            entry.usage_percent,
            entry.policy.as_str()
        );
    }
    out
}

/// Render the hub catalog
pub fn render_hubs(hubs: &[Hub]) -> String {
    let mut out = String::new();
    for hub in hubs {
        let _ = writeln!(out, "{:<28} {:<10} {}", hub.name, hub.tier.as_str(), hub.coordinate);
    }
    let _ = writeln!(out, "{} hub(s)", hubs.len());
    out
}

/// Render relevant candidates for a pair of locations
pub fn render_candidates(candidates: &[Candidate]) -> String {
    if candidates.is_empty() {
        return "No hub lies between these locations\n".to_string();
    }
    let mut out = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {candidate}", i + 1);
    }
    out
}
