//! Mann-Whitney U rank-test engine.
//!
//! Performs combined ranking with midrank tie handling, rank-sum
//! aggregation, U-statistic derivation and the two-sided significance
//! decision. Everything is recomputed per invocation; there is no shared
//! state.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::types::{
    Dataset, DecisionPolicy, DecisionStatistic, EngineError, GroupSummary, PValueMethod,
    RankedObservation, TestResult,
};

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Largest per-group size for which the exact null distribution is used.
const EXACT_SIZE_LIMIT: usize = 20;

/// Two values this close are treated as tied.
const TIE_EPSILON: f64 = 1e-10;

/// Engine configuration. All knobs are explicit; nothing is hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Two-sided significance level.
    pub alpha: f64,
    /// Decision path selector.
    pub policy: DecisionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            policy: DecisionPolicy::ExactOrApproxP,
        }
    }
}

/// Ranks the pooled sample ascending by value, assigning midranks to ties.
///
/// The returned sequence is sorted ascending, matching the ranking table
/// the report displays. Ranks are full precision; rounding happens only at
/// presentation time.
#[must_use]
pub fn rank_observations(dataset: &Dataset) -> Vec<RankedObservation> {
    let mut sorted: Vec<RankedObservation> = dataset
        .observations()
        .iter()
        .map(|o| RankedObservation {
            group: o.group.clone(),
            value: o.value,
            rank: 0.0,
        })
        .collect();

    sorted.sort_by(|a, b| {
        a.value
            .partial_cmp(&b.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Walk contiguous tie blocks and assign the mean of the ranks the block
    // would occupy if untied.
    let n = sorted.len();
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && (sorted[j].value - sorted[i].value).abs() < TIE_EPSILON {
            j += 1;
        }

        let midrank = (i + j - 1) as f64 / 2.0 + 1.0;
        for item in &mut sorted[i..j] {
            item.rank = midrank;
        }

        i = j;
    }

    sorted
}

/// Aggregates ranked observations per group, in the dataset's label order.
pub fn summarize_groups(
    dataset: &Dataset,
    ranked: &[RankedObservation],
) -> Result<Vec<GroupSummary>, EngineError> {
    let mut summaries = Vec::with_capacity(2);

    for label in dataset.labels() {
        let mut n = 0;
        let mut rank_sum = 0.0;
        for item in ranked.iter().filter(|r| &r.group == label) {
            n += 1;
            rank_sum += item.rank;
        }

        if n == 0 {
            return Err(EngineError::DegenerateInput {
                label: label.clone(),
            });
        }

        summaries.push(GroupSummary {
            label: label.clone(),
            n,
            rank_sum,
        });
    }

    Ok(summaries)
}

/// Runs the full test: ranking, rank sums, U statistics and the decision.
pub fn evaluate(dataset: &Dataset, config: &EngineConfig) -> Result<TestResult, EngineError> {
    let ranked = rank_observations(dataset);
    let summaries = summarize_groups(dataset, &ranked)?;

    let (n1, n2) = (summaries[0].n, summaries[1].n);
    let (r1, r2) = (summaries[0].rank_sum, summaries[1].rank_sum);

    let product = (n1 * n2) as f64;
    let u1 = product + (n1 * (n1 + 1)) as f64 / 2.0 - r1;
    let u2 = product - u1;
    let u = u1.min(u2);

    let mu_u = product / 2.0;
    let sigma_u = (product * (n1 + n2 + 1) as f64 / 12.0).sqrt();

    let (statistic, reject_null) = match config.policy {
        DecisionPolicy::ExactOrApproxP => {
            let exact_applicable =
                n1 <= EXACT_SIZE_LIMIT && n2 <= EXACT_SIZE_LIMIT && !has_ties(&ranked);
            let (p_value, method) = if exact_applicable {
                (exact_p_value(u, n1, n2), PValueMethod::Exact)
            } else {
                (approx_p_value(u, mu_u, sigma_u), PValueMethod::NormalApprox)
            };
            (
                DecisionStatistic::PValue { p_value, method },
                p_value < config.alpha,
            )
        }
        DecisionPolicy::ZApproximation => {
            let z = (u - mu_u).abs() / sigma_u;
            let critical = z_critical(config.alpha);
            (DecisionStatistic::ZScore { z, critical }, z > critical)
        }
    };

    Ok(TestResult {
        n1,
        n2,
        r1,
        r2,
        u1,
        u2,
        u,
        mu_u,
        sigma_u,
        alpha: config.alpha,
        statistic,
        reject_null,
    })
}

fn has_ties(ranked: &[RankedObservation]) -> bool {
    ranked
        .windows(2)
        .any(|w| (w[1].value - w[0].value).abs() < TIE_EPSILON)
}

/// Two-sided p-value from the exact Mann-Whitney null distribution.
///
/// Valid only for tie-free samples, where U is an integer.
fn exact_p_value(u: f64, n1: usize, n2: usize) -> f64 {
    let counts = u_null_counts(n1, n2);
    let total: f64 = counts.iter().sum();

    let cutoff = (u.floor() as usize).min(counts.len() - 1);
    let cdf: f64 = counts[..=cutoff].iter().sum::<f64>() / total;

    (2.0 * cdf).min(1.0)
}

/// Counts of arrangements producing each U value, for group sizes (n1, n2).
///
/// Mann & Whitney counting recurrence:
/// f(u; n1, n2) = f(u − n2; n1 − 1, n2) + f(u; n1, n2 − 1),
/// f(0; 0, ·) = f(0; ·, 0) = 1. Counts stay below 2^53 for the sizes the
/// exact path accepts, so f64 arithmetic is lossless.
fn u_null_counts(n1: usize, n2: usize) -> Vec<f64> {
    let mut table: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); n2 + 1]; n1 + 1];

    for j in 0..=n2 {
        table[0][j] = vec![1.0];
    }
    for i in 1..=n1 {
        table[i][0] = vec![1.0];
        for j in 1..=n2 {
            let mut dist = vec![0.0; i * j + 1];
            for (u, slot) in dist.iter_mut().enumerate() {
                let mut count = 0.0;
                if u >= j {
                    count += table[i - 1][j].get(u - j).copied().unwrap_or(0.0);
                }
                count += table[i][j - 1].get(u).copied().unwrap_or(0.0);
                *slot = count;
            }
            table[i][j] = dist;
        }
    }

    table[n1][n2].clone()
}

/// Two-sided p-value from the normal approximation with continuity
/// correction.
fn approx_p_value(u: f64, mu_u: f64, sigma_u: f64) -> f64 {
    if sigma_u <= 0.0 {
        return 1.0;
    }

    let z = if u > mu_u {
        (u - 0.5 - mu_u) / sigma_u
    } else {
        (u + 0.5 - mu_u) / sigma_u
    };

    (2.0 * (1.0 - standard_normal_cdf(z.abs()))).clamp(0.0, 1.0)
}

/// Two-sided critical z value at the given significance level.
#[must_use]
pub fn z_critical(alpha: f64) -> f64 {
    inverse_normal_cdf(1.0 - alpha / 2.0)
}

/// Standard normal CDF via the complementary error function.
#[must_use]
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Complementary error function, Abramowitz & Stegun formula 7.1.26.
fn erfc(x: f64) -> f64 {
    let a1 = 0.254_829_592;
    let a2 = -0.284_496_736;
    let a3 = 1.421_413_741;
    let a4 = -1.453_152_027;
    let a5 = 1.061_405_429;
    let p = 0.327_591_1;

    let sign_negative = x < 0.0;
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    if sign_negative {
        2.0 - y
    } else {
        y
    }
}

/// Inverse standard normal CDF, Acklam's rational approximation.
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
