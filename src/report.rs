//! Report assembler: engine output to an ordered worked solution.
//!
//! Pure formatting. Every number shown here was computed by the engine; any
//! numeric discrepancy traces back there, not to this module.

use std::fmt::Write as _;

use serde::Serialize;

use crate::types::{Dataset, DecisionStatistic, GroupSummary, RankedObservation, TestResult};

/// One labeled block of the worked solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Section heading.
    pub title: String,
    /// Plain-text body; formula strings substitute concrete numbers.
    pub body: String,
}

impl Section {
    fn new(title: impl Into<String>, body: String) -> Self {
        Self {
            title: title.into(),
            body: body.trim_end().to_string(),
        }
    }
}

/// Assembles the ordered sections of the step-by-step solution.
#[must_use]
pub fn render(
    dataset: &Dataset,
    ranked: &[RankedObservation],
    summaries: &[GroupSummary],
    result: &TestResult,
) -> Vec<Section> {
    vec![
        hypotheses_section(dataset, result),
        ranking_section(ranked, summaries),
        rank_sum_section(ranked, summaries),
        u_statistic_section(result),
        test_statistic_section(result),
        decision_section(dataset, result),
    ]
}

fn hypotheses_section(dataset: &Dataset, result: &TestResult) -> Section {
    let value = dataset.value_column();
    let [g1, g2] = dataset.labels();

    let mut body = String::new();
    let _ = writeln!(
        body,
        "H0: the median {value} is the same in groups {g1} and {g2}"
    );
    let _ = writeln!(
        body,
        "H1: the median {value} differs between groups {g1} and {g2} (two-tailed)"
    );
    let _ = writeln!(body, "significance level: alpha = {}", fmt(result.alpha));

    Section::new("1. Hypotheses", body)
}

fn ranking_section(ranked: &[RankedObservation], summaries: &[GroupSummary]) -> Section {
    let mut body = String::new();

    let group_width = ranked
        .iter()
        .map(|r| r.group.len())
        .max()
        .unwrap_or(5)
        .max("Group".len());

    let _ = writeln!(body, "{:<group_width$}  {:>10}  {:>8}", "Group", "Value", "Rank");
    for item in ranked {
        let _ = writeln!(
            body,
            "{:<group_width$}  {:>10}  {:>8.2}",
            item.group,
            fmt(item.value),
            item.rank
        );
    }

    body.push('\n');
    for (i, summary) in summaries.iter().enumerate() {
        let _ = writeln!(
            body,
            "n{} (observations in group {}) = {}",
            i + 1,
            summary.label,
            summary.n
        );
    }

    Section::new("2. Combined ranking", body)
}

fn rank_sum_section(ranked: &[RankedObservation], summaries: &[GroupSummary]) -> Section {
    let mut body = String::new();

    for (i, summary) in summaries.iter().enumerate() {
        let addends: Vec<String> = ranked
            .iter()
            .filter(|r| r.group == summary.label)
            .map(|r| fmt(r.rank))
            .collect();

        let _ = writeln!(
            body,
            "R{} (sum of ranks for group {}) = {} = {}",
            i + 1,
            summary.label,
            addends.join(" + "),
            fmt(summary.rank_sum)
        );
    }

    Section::new("3. Rank sums", body)
}

fn u_statistic_section(result: &TestResult) -> Section {
    let (n1, n2) = (result.n1, result.n2);
    let product = n1 * n2;
    let half_pairs = n1 * (n1 + 1) / 2;

    let mut body = String::new();
    let _ = writeln!(body, "U1 = n1*n2 + n1(n1+1)/2 - R1");
    let _ = writeln!(
        body,
        "   = {n1}*{n2} + {n1}({n1}+1)/2 - {}",
        fmt(result.r1)
    );
    let _ = writeln!(body, "   = {product} + {half_pairs} - {}", fmt(result.r1));
    let _ = writeln!(body, "   = {}", fmt(result.u1));
    body.push('\n');
    let _ = writeln!(body, "U2 = n1*n2 - U1");
    let _ = writeln!(body, "   = {product} - {}", fmt(result.u1));
    let _ = writeln!(body, "   = {}", fmt(result.u2));

    Section::new("4. U statistics", body)
}

fn test_statistic_section(result: &TestResult) -> Section {
    let body = format!(
        "U = min(U1, U2) = min({}, {}) = {}\n",
        fmt(result.u1),
        fmt(result.u2),
        fmt(result.u)
    );
    Section::new("5. Test statistic", body)
}

fn decision_section(dataset: &Dataset, result: &TestResult) -> Section {
    let value = dataset.value_column();
    let [g1, g2] = dataset.labels();
    let mut body = String::new();

    match result.statistic {
        DecisionStatistic::PValue { p_value, method } => {
            let _ = writeln!(body, "p-value ({method}) = {p_value:.4}");
            if result.reject_null {
                let _ = writeln!(
                    body,
                    "since p ({p_value:.4}) < alpha ({}), we reject H0",
                    fmt(result.alpha)
                );
            } else {
                let _ = writeln!(
                    body,
                    "since p ({p_value:.4}) >= alpha ({}), we fail to reject H0",
                    fmt(result.alpha)
                );
            }
        }
        DecisionStatistic::ZScore { z, critical } => {
            let _ = writeln!(body, "mu_U = n1*n2/2 = {}", fmt(result.mu_u));
            let _ = writeln!(
                body,
                "sigma_U = sqrt(n1*n2*(n1+n2+1)/12) = {:.4}",
                result.sigma_u
            );
            let _ = writeln!(
                body,
                "Z = |U - mu_U| / sigma_U = |{} - {}| / {:.4} = {z:.4}",
                fmt(result.u),
                fmt(result.mu_u),
                result.sigma_u
            );
            if result.reject_null {
                let _ = writeln!(
                    body,
                    "since Z ({z:.4}) > z-critical ({critical:.4}), we reject H0"
                );
            } else {
                let _ = writeln!(
                    body,
                    "since Z ({z:.4}) <= z-critical ({critical:.4}), we fail to reject H0"
                );
            }
        }
    }

    if result.reject_null {
        let _ = writeln!(
            body,
            "the median {value} differs significantly between groups {g1} and {g2}"
        );
    } else {
        let _ = writeln!(
            body,
            "the median {value} does not differ significantly between groups {g1} and {g2}"
        );
    }

    Section::new("6. Decision", body)
}

/// Formats a number, trimming the fraction when it is integral.
fn fmt(x: f64) -> String {
    if (x - x.round()).abs() < 1e-9 {
        format!("{}", x.round() as i64)
    } else {
        let s = format!("{x:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{evaluate, rank_observations, summarize_groups, EngineConfig};
    use crate::input::sample_dataset;
    use crate::types::DecisionPolicy;

    fn sample_sections(policy: DecisionPolicy) -> Vec<Section> {
        let data = sample_dataset();
        let ranked = rank_observations(&data);
        let summaries = summarize_groups(&data, &ranked).unwrap();
        let config = EngineConfig {
            policy,
            ..EngineConfig::default()
        };
        let result = evaluate(&data, &config).unwrap();
        render(&data, &ranked, &summaries, &result)
    }

    #[test]
    fn sections_are_ordered() {
        let sections = sample_sections(DecisionPolicy::ExactOrApproxP);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "1. Hypotheses",
                "2. Combined ranking",
                "3. Rank sums",
                "4. U statistics",
                "5. Test statistic",
                "6. Decision",
            ]
        );
    }

    #[test]
    fn hypotheses_mention_the_value_column() {
        let sections = sample_sections(DecisionPolicy::ExactOrApproxP);
        assert!(sections[0].body.contains("the median Value"));
        assert!(sections[0].body.contains("alpha = 0.05"));
    }

    #[test]
    fn ranking_table_shows_midranks_to_two_decimals() {
        let sections = sample_sections(DecisionPolicy::ExactOrApproxP);
        assert!(sections[1].body.contains("8.50"));
        assert!(sections[1].body.contains("n1 (observations in group A) = 7"));
        assert!(sections[1].body.contains("n2 (observations in group B) = 5"));
    }

    #[test]
    fn rank_sums_show_literal_addends() {
        let sections = sample_sections(DecisionPolicy::ExactOrApproxP);
        assert!(sections[2]
            .body
            .contains("R1 (sum of ranks for group A) = 1 + 2 + 7 + 8.5 + 10 + 11 + 12 = 51.5"));
        assert!(sections[2]
            .body
            .contains("R2 (sum of ranks for group B) = 3 + 4 + 5 + 6 + 8.5 = 26.5"));
    }

    #[test]
    fn u_derivation_substitutes_values() {
        let sections = sample_sections(DecisionPolicy::ExactOrApproxP);
        assert!(sections[3].body.contains("= 7*5 + 7(7+1)/2 - 51.5"));
        assert!(sections[3].body.contains("= 35 + 28 - 51.5"));
        assert!(sections[3].body.contains("= 11.5"));
        assert!(sections[4].body.contains("min(11.5, 23.5) = 11.5"));
    }

    #[test]
    fn p_value_decision_fails_to_reject_on_sample() {
        let sections = sample_sections(DecisionPolicy::ExactOrApproxP);
        assert!(sections[5].body.contains("fail to reject H0"));
        assert!(sections[5]
            .body
            .contains("does not differ significantly between groups A and B"));
    }

    #[test]
    fn z_decision_shows_the_comparison() {
        let sections = sample_sections(DecisionPolicy::ZApproximation);
        assert!(sections[5].body.contains("mu_U = n1*n2/2 = 17.5"));
        assert!(sections[5].body.contains("z-critical (1.96"));
        assert!(sections[5].body.contains("fail to reject H0"));
    }

    #[test]
    fn fmt_trims_integral_values() {
        assert_eq!(fmt(35.0), "35");
        assert_eq!(fmt(8.5), "8.5");
        assert_eq!(fmt(51.5), "51.5");
        assert_eq!(fmt(0.05), "0.05");
    }
}
