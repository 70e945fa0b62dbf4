//! Input adapter: tabular data to a validated two-group dataset.
//!
//! Reads a delimited file with a header row, picks a group column and a
//! value column, and normalizes the rows into a [`Dataset`]. Pure transform:
//! on any validation failure the whole load aborts with a descriptive error.

use std::io::Read;
use std::path::Path;

use crate::types::{Dataset, Observation, ValidationError};

/// Default small-sample ceiling: each group must stay below this size for
/// the small-sample policy to accept it.
pub const SMALL_SAMPLE_CEILING: usize = 10;

/// Options controlling a load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Header name of the group-label column.
    pub group_column: String,
    /// Header name of the numeric value column.
    pub value_column: String,
    /// Field delimiter (default: comma).
    pub delimiter: u8,
    /// When set, loading fails if either group reaches this many
    /// observations.
    pub small_sample_ceiling: Option<usize>,
}

impl LoadOptions {
    /// Creates options for the given columns with a comma delimiter and no
    /// size policy.
    pub fn new(group_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            group_column: group_column.into(),
            value_column: value_column.into(),
            delimiter: b',',
            small_sample_ceiling: None,
        }
    }

    /// Sets a custom field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Enables the small-sample policy with the default ceiling.
    #[must_use]
    pub const fn with_small_sample_policy(mut self) -> Self {
        self.small_sample_ceiling = Some(SMALL_SAMPLE_CEILING);
        self
    }

    /// Enables the small-sample policy with a custom ceiling.
    #[must_use]
    pub const fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.small_sample_ceiling = Some(ceiling);
        self
    }
}

/// Loads a dataset from any reader producing delimited text with a header
/// row.
pub fn load<R: Read>(reader: R, options: &LoadOptions) -> Result<Dataset, ValidationError> {
    let csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(reader);
    load_reader(csv_reader, options)
}

/// Loads a dataset from a file path.
pub fn load_path(path: &Path, options: &LoadOptions) -> Result<Dataset, ValidationError> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_path(path)?;
    load_reader(reader, options)
}

fn load_reader<R: Read>(
    mut csv_reader: csv::Reader<R>,
    options: &LoadOptions,
) -> Result<Dataset, ValidationError> {
    let headers = csv_reader.headers()?.clone();
    let group_idx = column_index(&headers, &options.group_column)?;
    let value_idx = column_index(&headers, &options.value_column)?;

    let mut observations = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let group = record.get(group_idx).unwrap_or_default().trim().to_string();
        let token = record.get(value_idx).unwrap_or_default().trim();

        let value: f64 = token
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| ValidationError::NonNumericValue {
                column: options.value_column.clone(),
                token: token.to_string(),
                row: row + 1,
            })?;

        observations.push(Observation { group, value });
    }

    let dataset = Dataset::new(observations, &options.group_column, &options.value_column)?;
    enforce_small_sample_policy(&dataset, options.small_sample_ceiling)?;
    Ok(dataset)
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize, ValidationError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| ValidationError::MissingColumn {
            column: column.to_string(),
        })
}

fn enforce_small_sample_policy(
    dataset: &Dataset,
    ceiling: Option<usize>,
) -> Result<(), ValidationError> {
    let Some(ceiling) = ceiling else {
        return Ok(());
    };

    for label in dataset.labels() {
        let n = dataset.group_len(label);
        if n >= ceiling {
            return Err(ValidationError::SampleSize {
                label: label.clone(),
                n,
                ceiling,
            });
        }
    }

    Ok(())
}

/// Built-in demonstration dataset: two groups A and B, 12 observations,
/// one tied value pair across groups.
pub fn sample_dataset() -> Dataset {
    let rows = [
        ("A", 20.0),
        ("A", 23.0),
        ("B", 25.0),
        ("B", 29.0),
        ("B", 30.0),
        ("B", 35.0),
        ("A", 39.0),
        ("A", 42.0),
        ("B", 42.0),
        ("A", 51.0),
        ("A", 57.0),
        ("A", 60.0),
    ];

    let observations = rows
        .iter()
        .map(|&(group, value)| Observation {
            group: group.to_string(),
            value,
        })
        .collect();

    Dataset::new(observations, "Group", "Value").expect("built-in sample is a valid two-group dataset")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_CSV: &str = "\
Group,Value
A,20
A,23
B,25
B,29
B,30
B,35
A,39
A,42
B,42
A,51
A,57
A,60
";

    fn options() -> LoadOptions {
        LoadOptions::new("Group", "Value")
    }

    #[test]
    fn loads_sample_csv() {
        let data = load(SAMPLE_CSV.as_bytes(), &options()).unwrap();
        assert_eq!(data.observations().len(), 12);
        assert_eq!(data.labels(), &["A".to_string(), "B".to_string()]);
        assert_eq!(data.group_len("A"), 7);
        assert_eq!(data.group_len("B"), 5);
        assert_eq!(data.value_column(), "Value");
    }

    #[test]
    fn built_in_sample_matches_csv_fixture() {
        let from_csv = load(SAMPLE_CSV.as_bytes(), &options()).unwrap();
        let built_in = sample_dataset();
        assert_eq!(built_in.observations(), from_csv.observations());
    }

    #[test]
    fn missing_column_is_named() {
        let err = load(SAMPLE_CSV.as_bytes(), &LoadOptions::new("Cohort", "Value")).unwrap_err();
        match err {
            ValidationError::MissingColumn { column } => assert_eq!(column, "Cohort"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_value_names_column_and_row() {
        let csv = "Group,Value\nA,1\nB,two\nA,3\nB,4\n";
        let err = load(csv.as_bytes(), &options()).unwrap_err();
        match err {
            ValidationError::NonNumericValue { column, token, row } => {
                assert_eq!(column, "Value");
                assert_eq!(token, "two");
                assert_eq!(row, 2);
            }
            other => panic!("expected NonNumericValue, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_token_is_rejected() {
        let csv = "Group,Value\nA,1\nB,NaN\nA,3\nB,4\n";
        let err = load(csv.as_bytes(), &options()).unwrap_err();
        assert!(matches!(err, ValidationError::NonNumericValue { .. }));
    }

    #[test]
    fn three_groups_fail_group_count() {
        let csv = "Group,Value\nA,1\nB,2\nC,3\n";
        let err = load(csv.as_bytes(), &options()).unwrap_err();
        match err {
            ValidationError::GroupCount { count, .. } => assert_eq!(count, 3),
            other => panic!("expected GroupCount, got {other:?}"),
        }
    }

    #[test]
    fn ceiling_rejects_group_of_ten() {
        let mut csv = String::from("Group,Value\n");
        for i in 0..10 {
            csv.push_str(&format!("A,{i}\n"));
        }
        csv.push_str("B,100\n");

        let err = load(
            csv.as_bytes(),
            &options().with_small_sample_policy(),
        )
        .unwrap_err();
        match err {
            ValidationError::SampleSize { label, n, ceiling } => {
                assert_eq!(label, "A");
                assert_eq!(n, 10);
                assert_eq!(ceiling, 10);
            }
            other => panic!("expected SampleSize, got {other:?}"),
        }
    }

    #[test]
    fn ceiling_accepts_group_of_nine() {
        let mut csv = String::from("Group,Value\n");
        for i in 0..9 {
            csv.push_str(&format!("A,{i}\n"));
        }
        csv.push_str("B,100\n");

        let data = load(csv.as_bytes(), &options().with_small_sample_policy()).unwrap();
        assert_eq!(data.group_len("A"), 9);
    }

    #[test]
    fn custom_delimiter() {
        let tsv = "Group\tValue\nA\t1\nB\t2\n";
        let data = load(tsv.as_bytes(), &options().with_delimiter(b'\t')).unwrap();
        assert_eq!(data.observations().len(), 2);
    }
}
