// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credit score engine.
//!
//! A WorldScore is an integer in `[300, 900]` derived from five behavioral
//! factors with fixed weights. The computation is a pure function; reads and
//! writes go through the [`UserRepository`](crate::storage::UserRepository).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Score assigned to a wallet on first connection.
pub const DEFAULT_SCORE: i64 = 640;

/// Lowest representable score.
pub const MIN_SCORE: i64 = 300;

/// Highest representable score.
pub const MAX_SCORE: i64 = 900;

/// Behavioral factors feeding the score formula.
///
/// `payment_history`, `credit_utilization` and `credit_mix` are percentages
/// in `[0, 100]`; `credit_age_days` is an age in days; `recent_inquiries` is
/// a count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFactors {
    /// On-time payment rate (0-100).
    pub payment_history: f64,
    /// Inverse utilization of available credit (0-100).
    pub credit_utilization: f64,
    /// Age of the oldest credit line, in days.
    pub credit_age_days: f64,
    /// Diversity of credit types (0-100).
    pub credit_mix: f64,
    /// Hard inquiries in the recent window.
    pub recent_inquiries: u32,
}

/// Clamp a score into the valid `[MIN_SCORE, MAX_SCORE]` range.
pub fn clamp(score: i64) -> i64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Compute a score from behavioral factors.
///
/// Weights: payment history 35%, utilization 30%, credit age 15%,
/// credit mix 10%, inquiry impact 10%. Credit age is normalized so that
/// five years saturates the factor; each recent inquiry costs 10 points of
/// the inquiry factor. The weighted sum (0-100) is projected onto the
/// 300-900 scale and rounded.
pub fn compute(factors: &ScoreFactors) -> i64 {
    let normalized_age = (factors.credit_age_days / 365.0 * 20.0).min(100.0);
    let inquiry_impact = (100.0 - f64::from(factors.recent_inquiries) * 10.0).max(0.0);

    let weighted = factors.payment_history * 0.35
        + factors.credit_utilization * 0.30
        + normalized_age * 0.15
        + factors.credit_mix * 0.10
        + inquiry_impact * 0.10;

    clamp((300.0 + weighted * 6.0).round() as i64)
}
