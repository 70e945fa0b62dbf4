//! ranktest: CLI entry point.
//!
//! Loads a two-group dataset, runs the Mann-Whitney U test and prints the
//! worked solution section by section.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use colored::Colorize;

use ranktest::engine::{evaluate, rank_observations, summarize_groups, EngineConfig};
use ranktest::input::{load_path, sample_dataset, LoadOptions};
use ranktest::report::{render, Section};
use ranktest::types::{DecisionPolicy, TestResult};

#[derive(Parser)]
#[command(name = "ranktest")]
#[command(about = "Step-by-step Mann-Whitney U test solver for two independent samples")]
#[command(version)]
struct Cli {
    /// Path to a delimited data file with a header row.
    data: Option<PathBuf>,

    /// Use the built-in demonstration dataset instead of a file.
    #[arg(long, conflicts_with = "data")]
    sample: bool,

    /// Header name of the group-label column.
    #[arg(short, long, default_value = "Group")]
    group_column: String,

    /// Header name of the numeric value column.
    #[arg(short, long, default_value = "Value")]
    value_column: String,

    /// Two-sided significance level.
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Decision path: p-value (exact or approximate) or z comparison.
    #[arg(long, value_enum, default_value_t = PolicyArg::PValue)]
    policy: PolicyArg,

    /// Enforce the small-sample policy: fail when either group has at
    /// least this many observations.
    #[arg(long)]
    max_group_size: Option<usize>,

    /// Field delimiter for the data file.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Emit the result and sections as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Two-sided p-value: exact for small tie-free samples, normal
    /// approximation with continuity correction otherwise.
    PValue,
    /// Z-score against the two-sided critical value.
    Z,
}

impl From<PolicyArg> for DecisionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::PValue => Self::ExactOrApproxP,
            PolicyArg::Z => Self::ZApproximation,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.alpha <= 0.0 || cli.alpha >= 1.0 {
        anyhow::bail!("alpha must be in (0, 1), got {}", cli.alpha);
    }

    let dataset = match (&cli.data, cli.sample) {
        (Some(path), false) => {
            let delimiter = u8::try_from(cli.delimiter)
                .map_err(|_| anyhow::anyhow!("delimiter must be a single ASCII character"))?;
            let mut options =
                LoadOptions::new(&cli.group_column, &cli.value_column).with_delimiter(delimiter);
            if let Some(ceiling) = cli.max_group_size {
                options = options.with_ceiling(ceiling);
            }
            load_path(path, &options)?
        }
        _ => sample_dataset(),
    };

    let config = EngineConfig {
        alpha: cli.alpha,
        policy: cli.policy.into(),
    };

    let ranked = rank_observations(&dataset);
    let summaries = summarize_groups(&dataset, &ranked)?;
    let result = evaluate(&dataset, &config)?;
    let sections = render(&dataset, &ranked, &summaries, &result);

    if cli.json {
        print_json(&result, &sections)?;
    } else {
        print_text(&sections, &result);
    }

    Ok(())
}

fn print_text(sections: &[Section], result: &TestResult) {
    println!("{}", "Mann-Whitney U Test: Step-by-Step Solution".bold());
    println!("{}", "=".repeat(60));

    let last = sections.len().saturating_sub(1);
    for (i, section) in sections.iter().enumerate() {
        println!();
        println!("{}", section.title.cyan().bold());

        if i == last {
            // Color the conclusion like a pass/fail verdict.
            if result.reject_null {
                println!("{}", section.body.red());
            } else {
                println!("{}", section.body.green());
            }
        } else {
            println!("{}", section.body);
        }
    }

    println!();
    println!("{}", "=".repeat(60));
}

fn print_json(result: &TestResult, sections: &[Section]) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "result": result,
        "sections": sections,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
