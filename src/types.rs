//! Common types for ranktest.
//!
//! Defines the data model shared by the input adapter, the rank-test engine
//! and the report assembler, plus the error taxonomy.

use serde::Serialize;
use thiserror::Error;

/// A single (group, value) record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Group label.
    pub group: String,
    /// Measured value.
    pub value: f64,
}

/// A validated two-group dataset.
///
/// Invariant: exactly two distinct group labels, each with at least one
/// observation. Labels are kept in lexicographic order so that the ranking
/// table and the rank-sum narrative enumerate groups identically.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    observations: Vec<Observation>,
    labels: [String; 2],
    group_column: String,
    value_column: String,
}

impl Dataset {
    /// Builds a dataset from raw observations, validating the two-group
    /// invariant.
    pub fn new(
        observations: Vec<Observation>,
        group_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let group_column = group_column.into();
        let value_column = value_column.into();

        let mut labels: Vec<String> = observations.iter().map(|o| o.group.clone()).collect();
        labels.sort();
        labels.dedup();

        if labels.len() != 2 {
            return Err(ValidationError::GroupCount {
                column: group_column,
                count: labels.len(),
                labels,
            });
        }

        let mut iter = labels.into_iter();
        let first = iter.next().unwrap_or_default();
        let second = iter.next().unwrap_or_default();

        Ok(Self {
            observations,
            labels: [first, second],
            group_column,
            value_column,
        })
    }

    /// Observations in load order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// The two group labels, lexicographically ordered.
    pub const fn labels(&self) -> &[String; 2] {
        &self.labels
    }

    /// Name of the source column holding group labels.
    pub fn group_column(&self) -> &str {
        &self.group_column
    }

    /// Name of the source column holding values; parameterizes the
    /// hypothesis text.
    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    /// Number of observations carrying the given label.
    pub fn group_len(&self, label: &str) -> usize {
        self.observations
            .iter()
            .filter(|o| o.group == label)
            .count()
    }
}

/// An observation with its combined-sample rank (midrank for ties).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedObservation {
    /// Group label.
    pub group: String,
    /// Measured value.
    pub value: f64,
    /// Rank over the pooled sample, 1-based; midrank for tied values.
    pub rank: f64,
}

/// Per-group aggregates derived from the ranked sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Group label.
    pub label: String,
    /// Number of observations in the group.
    pub n: usize,
    /// Sum of ranks over the group.
    pub rank_sum: f64,
}

/// Which decision path the engine follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Two-sided p-value: exact for small tie-free samples, normal
    /// approximation with continuity correction otherwise.
    ExactOrApproxP,
    /// |U − μ|/σ compared against the two-sided z critical value.
    ZApproximation,
}

/// How a p-value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PValueMethod {
    /// Exact Mann-Whitney null distribution.
    Exact,
    /// Normal approximation with continuity correction.
    NormalApprox,
}

impl std::fmt::Display for PValueMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact distribution"),
            Self::NormalApprox => write!(f, "normal approximation with continuity correction"),
        }
    }
}

/// The quantity the decision was based on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionStatistic {
    /// Two-sided p-value compared against alpha.
    PValue {
        /// The p-value.
        p_value: f64,
        /// How it was computed.
        method: PValueMethod,
    },
    /// Z-score compared against the critical value.
    ZScore {
        /// |U − μ|/σ.
        z: f64,
        /// Two-sided critical value at alpha.
        critical: f64,
    },
}

/// Terminal artifact of one engine invocation. Recomputed per run, never
/// cached.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Observations in the first (lexicographic) group.
    pub n1: usize,
    /// Observations in the second group.
    pub n2: usize,
    /// Rank sum of the first group.
    pub r1: f64,
    /// Rank sum of the second group.
    pub r2: f64,
    /// U statistic of the first group.
    pub u1: f64,
    /// U statistic of the second group.
    pub u2: f64,
    /// Test statistic, min(U1, U2).
    pub u: f64,
    /// Null mean of U: n1·n2/2.
    pub mu_u: f64,
    /// Null standard deviation of U: sqrt(n1·n2·(n1+n2+1)/12).
    pub sigma_u: f64,
    /// Significance level.
    pub alpha: f64,
    /// Decision statistic (p-value or z-score).
    pub statistic: DecisionStatistic,
    /// Whether the null hypothesis was rejected.
    pub reject_null: bool,
}

/// Input validation failures. Reported immediately; no partial result.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A requested column is absent from the header row.
    #[error("column '{column}' not found in header")]
    MissingColumn {
        /// The missing column name.
        column: String,
    },

    /// A value-column cell could not be read as a finite number.
    #[error("column '{column}' contains non-numeric value '{token}' at data row {row}")]
    NonNumericValue {
        /// The value column name.
        column: String,
        /// The offending token.
        token: String,
        /// 1-based data row (excluding the header).
        row: usize,
    },

    /// The group column does not hold exactly two distinct labels.
    #[error(
        "group column '{column}' must hold exactly two distinct labels, found {count}: {labels:?}"
    )]
    GroupCount {
        /// The group column name.
        column: String,
        /// Number of distinct labels observed.
        count: usize,
        /// The labels observed.
        labels: Vec<String>,
    },

    /// Small-sample policy violated.
    #[error(
        "group '{label}' has {n} observations; small-sample policy allows fewer than {ceiling} per group"
    )]
    SampleSize {
        /// The offending group label.
        label: String,
        /// Observed group size.
        n: usize,
        /// Configured ceiling.
        ceiling: usize,
    },

    /// Underlying CSV reader failure (I/O, ragged rows).
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Engine contract violations. Should be prevented upstream by the input
/// adapter; the engine checks independently.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A group ended up with no observations.
    #[error("group '{label}' has no observations; both groups must be non-empty")]
    DegenerateInput {
        /// The empty group's label.
        label: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(group: &str, value: f64) -> Observation {
        Observation {
            group: group.to_string(),
            value,
        }
    }

    #[test]
    fn dataset_orders_labels_lexicographically() {
        let data = Dataset::new(
            vec![obs("B", 1.0), obs("A", 2.0), obs("B", 3.0)],
            "Group",
            "Value",
        )
        .unwrap();
        assert_eq!(data.labels(), &["A".to_string(), "B".to_string()]);
        assert_eq!(data.group_len("A"), 1);
        assert_eq!(data.group_len("B"), 2);
    }

    #[test]
    fn dataset_rejects_single_label() {
        let err = Dataset::new(vec![obs("A", 1.0), obs("A", 2.0)], "Group", "Value").unwrap_err();
        match err {
            ValidationError::GroupCount { count, column, .. } => {
                assert_eq!(count, 1);
                assert_eq!(column, "Group");
            }
            other => panic!("expected GroupCount, got {other:?}"),
        }
    }

    #[test]
    fn dataset_rejects_three_labels() {
        let err = Dataset::new(
            vec![obs("A", 1.0), obs("B", 2.0), obs("C", 3.0)],
            "Group",
            "Value",
        )
        .unwrap_err();
        match err {
            ValidationError::GroupCount { count, labels, .. } => {
                assert_eq!(count, 3);
                assert_eq!(labels, vec!["A", "B", "C"]);
            }
            other => panic!("expected GroupCount, got {other:?}"),
        }
    }
}
