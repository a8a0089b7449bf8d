//! Feature alignment for credit risk model inference.
//!
//! Reproduces the tabular preprocessing the model was trained with:
//! categorical fields are one-hot encoded into `<field>_<category>` indicator
//! columns, then the encoded columns are reindexed onto the ordered list of
//! training columns. Training columns the record does not produce are filled
//! with 0; produced columns the model never saw are dropped.
//!
//! Alignment never fails. A malformed record degrades into zeros.

use crate::types::request::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, Level};

/// How categorical fields are expanded into indicator columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingPolicy {
    /// Drop the first (lexicographically smallest) category of every field.
    ///
    /// Matches the reference preprocessing exactly. With a single record per
    /// request each field has one category, so categorical inputs are
    /// discarded entirely.
    #[default]
    DropFirst,
    /// Emit an indicator for every observed category and let the training
    /// column list decide which survive.
    Indicator,
}

/// One-hot encoded view of a batch of records
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedFrame {
    /// Column names: numeric fields first, then indicator columns
    pub columns: Vec<String>,
    /// One row per input record, `columns.len()` values each
    pub rows: Vec<Vec<f64>>,
}

impl EncodedFrame {
    /// Project every row onto `columns`, filling columns this frame lacks with 0.
    pub fn reindex(&self, columns: &[String]) -> Vec<Vec<f64>> {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(self.columns.len());
        for (i, name) in self.columns.iter().enumerate() {
            positions.entry(name.as_str()).or_insert(i);
        }

        self.rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|name| positions.get(name.as_str()).map_or(0.0, |&i| row[i]))
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Numeric,
    Boolean,
    Categorical,
    Empty,
}

/// Scalar value of `field` in `record`. Null, arrays and objects count as absent.
fn scalar<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    match record.get(field) {
        Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) | None => None,
        Some(value) => Some(value),
    }
}

fn field_kind<'a>(values: impl Iterator<Item = &'a Value>) -> FieldKind {
    let (mut numbers, mut booleans, mut others) = (0usize, 0usize, 0usize);
    for value in values {
        match value {
            Value::Number(_) => numbers += 1,
            Value::Bool(_) => booleans += 1,
            _ => others += 1,
        }
    }

    match (numbers, booleans, others) {
        (0, 0, 0) => FieldKind::Empty,
        (_, 0, 0) => FieldKind::Numeric,
        (0, _, 0) => FieldKind::Boolean,
        _ => FieldKind::Categorical,
    }
}

/// Category label of a scalar inside a categorical field
fn category_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        _ => None,
    }
}

/// One-hot encode a batch of records.
///
/// Categories are pooled across the batch, so a field with `k` distinct
/// categories yields `k - 1` indicator columns under
/// [`EncodingPolicy::DropFirst`] and `k` under [`EncodingPolicy::Indicator`].
/// A numeric field missing from some rows is 0 in those rows.
pub fn encode_batch(records: &[Record], policy: EncodingPolicy) -> EncodedFrame {
    let fields: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();

    let mut numeric: Vec<(String, Vec<f64>)> = Vec::new();
    let mut indicators: Vec<(String, Vec<f64>)> = Vec::new();

    for field in fields {
        let cells: Vec<Option<&Value>> = records.iter().map(|r| scalar(r, field)).collect();

        match field_kind(cells.iter().flatten().copied()) {
            FieldKind::Numeric => {
                let values = cells
                    .iter()
                    .map(|c| c.and_then(Value::as_f64).unwrap_or(0.0))
                    .collect();
                numeric.push((field.to_string(), values));
            }
            FieldKind::Boolean => {
                let values = cells
                    .iter()
                    .map(|c| match c {
                        Some(Value::Bool(true)) => 1.0,
                        _ => 0.0,
                    })
                    .collect();
                numeric.push((field.to_string(), values));
            }
            FieldKind::Categorical => {
                let labels: Vec<Option<String>> =
                    cells.iter().map(|c| c.and_then(category_label)).collect();
                let categories: BTreeSet<&str> =
                    labels.iter().flatten().map(String::as_str).collect();
                let skip = match policy {
                    EncodingPolicy::DropFirst => 1,
                    EncodingPolicy::Indicator => 0,
                };

                for category in categories.into_iter().skip(skip) {
                    let values = labels
                        .iter()
                        .map(|l| if l.as_deref() == Some(category) { 1.0 } else { 0.0 })
                        .collect();
                    indicators.push((format!("{field}_{category}"), values));
                }
            }
            FieldKind::Empty => {}
        }
    }

    let (columns, values): (Vec<String>, Vec<Vec<f64>>) =
        numeric.into_iter().chain(indicators).unzip();
    let rows = (0..records.len())
        .map(|r| values.iter().map(|column| column[r]).collect())
        .collect();

    EncodedFrame { columns, rows }
}

/// Align one record onto `training_columns`.
///
/// The output always has `training_columns.len()` entries in that order.
pub fn align(record: &Record, training_columns: &[String], policy: EncodingPolicy) -> Vec<f64> {
    encode_batch(std::slice::from_ref(record), policy)
        .reindex(training_columns)
        .pop()
        .unwrap_or_else(|| vec![0.0; training_columns.len()])
}

/// Aligner bound to a fixed training column list.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    columns: Vec<String>,
    policy: EncodingPolicy,
}

impl FeatureAligner {
    /// Create an aligner for the given training columns
    pub fn new(columns: Vec<String>, policy: EncodingPolicy) -> Self {
        Self { columns, policy }
    }

    /// Align a single record into a model input row.
    pub fn align(&self, record: &Record) -> Vec<f64> {
        if self.policy == EncodingPolicy::DropFirst && tracing::enabled!(Level::DEBUG) {
            self.trace_discarded_categories(record);
        }
        align(record, &self.columns, self.policy)
    }

    /// Number of features produced per row
    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    /// Training column names, in model order
    pub fn feature_names(&self) -> &[String] {
        &self.columns
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    fn trace_discarded_categories(&self, record: &Record) {
        for (field, value) in record {
            let Value::String(category) = value else {
                continue;
            };
            let column = format!("{field}_{category}");
            if self.columns.contains(&column) {
                debug!(
                    field = %field,
                    column = %column,
                    "Known indicator column zeroed by drop_first encoding"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_record_follows_training_order() {
        let cols = columns(&["AGE", "LIMIT_BAL", "PAY_0", "BILL_AMT1"]);
        let rec = record(json!({"LIMIT_BAL": 50000, "AGE": 35, "BILL_AMT1": 1200.5}));

        let row = align(&rec, &cols, EncodingPolicy::DropFirst);

        assert_eq!(row, vec![35.0, 50000.0, 0.0, 1200.5]);
    }

    #[test]
    fn test_alignment_ignores_key_order() {
        let cols = columns(&["a", "b", "c"]);
        let first = record(json!({"a": 1, "b": 2, "c": 3}));
        let mut second = Record::new();
        second.insert("c".to_string(), json!(3));
        second.insert("a".to_string(), json!(1));
        second.insert("b".to_string(), json!(2));

        assert_eq!(
            align(&first, &cols, EncodingPolicy::DropFirst),
            align(&second, &cols, EncodingPolicy::DropFirst)
        );
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let cols = columns(&["a", "b"]);
        let rec = record(json!({"a": 1, "b": 2, "unexpected": 99, "other": "x"}));

        for policy in [EncodingPolicy::DropFirst, EncodingPolicy::Indicator] {
            let row = align(&rec, &cols, policy);
            assert_eq!(row, vec![1.0, 2.0]);
        }
    }

    #[test]
    fn test_empty_record_is_all_zeros() {
        let cols = columns(&["a", "b", "c"]);
        let row = align(&Record::new(), &cols, EncodingPolicy::DropFirst);
        assert_eq!(row, vec![0.0; 3]);
    }

    #[test]
    fn test_single_categorical_dropped_under_drop_first() {
        let cols = columns(&["AGE", "EDUCATION_high_school", "EDUCATION_university"]);
        let rec = record(json!({"AGE": 41, "EDUCATION": "university"}));

        let row = align(&rec, &cols, EncodingPolicy::DropFirst);

        assert_eq!(row, vec![41.0, 0.0, 0.0]);
    }

    #[test]
    fn test_single_categorical_kept_under_indicator() {
        let cols = columns(&["AGE", "EDUCATION_high_school", "EDUCATION_university"]);
        let rec = record(json!({"AGE": 41, "EDUCATION": "university"}));

        let row = align(&rec, &cols, EncodingPolicy::Indicator);

        assert_eq!(row, vec![41.0, 0.0, 1.0]);
    }

    #[test]
    fn test_baseline_category_has_no_column_under_indicator() {
        // "graduate" sorts first, so training dropped it
        let cols = columns(&["EDUCATION_high_school", "EDUCATION_university"]);
        let rec = record(json!({"EDUCATION": "graduate"}));

        let row = align(&rec, &cols, EncodingPolicy::Indicator);

        assert_eq!(row, vec![0.0, 0.0]);
    }

    #[test]
    fn test_batch_drops_first_category() {
        let records = vec![
            record(json!({"HOUSING": "rent"})),
            record(json!({"HOUSING": "own"})),
            record(json!({"HOUSING": "free"})),
            record(json!({"HOUSING": "own"})),
        ];

        let frame = encode_batch(&records, EncodingPolicy::DropFirst);

        assert_eq!(frame.columns, columns(&["HOUSING_own", "HOUSING_rent"]));
        assert_eq!(
            frame.rows,
            vec![
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![0.0, 0.0],
                vec![1.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_batch_indicator_count_bounded_by_categories() {
        let values = ["a", "b", "c", "d", "b", "a"];
        let records: Vec<Record> = values.iter().map(|v| record(json!({"f": v}))).collect();

        let frame = encode_batch(&records, EncodingPolicy::DropFirst);
        let indicator_count = frame.columns.iter().filter(|c| c.starts_with("f_")).count();

        assert_eq!(indicator_count, 3);
        assert!(!frame.columns.contains(&"f_a".to_string()));
    }

    #[test]
    fn test_numeric_columns_precede_indicators() {
        let records = vec![
            record(json!({"z_num": 1, "a_cat": "x", "b_num": 2})),
            record(json!({"z_num": 3, "a_cat": "y", "b_num": 4})),
        ];

        let frame = encode_batch(&records, EncodingPolicy::DropFirst);

        assert_eq!(frame.columns, columns(&["b_num", "z_num", "a_cat_y"]));
    }

    #[test]
    fn test_booleans_and_nulls() {
        let cols = columns(&["OWNER", "NOTES", "TAGS"]);
        let rec = record(json!({"OWNER": true, "NOTES": null, "TAGS": ["a", "b"]}));

        let row = align(&rec, &cols, EncodingPolicy::Indicator);

        assert_eq!(row, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mixed_field_becomes_categorical() {
        let records = vec![
            record(json!({"GRADE": 1})),
            record(json!({"GRADE": "B"})),
            record(json!({"GRADE": 2})),
        ];

        let frame = encode_batch(&records, EncodingPolicy::Indicator);

        assert_eq!(frame.columns, columns(&["GRADE_1", "GRADE_2", "GRADE_B"]));
        assert!(!frame.columns.contains(&"GRADE".to_string()));
    }

    #[test]
    fn test_missing_numeric_in_batch_is_zero() {
        let records = vec![
            record(json!({"a": 5, "b": 1})),
            record(json!({"b": 2})),
            record(json!({"a": null, "b": 3})),
        ];

        let frame = encode_batch(&records, EncodingPolicy::DropFirst);

        assert_eq!(frame.columns, columns(&["a", "b"]));
        assert_eq!(frame.rows, vec![vec![5.0, 1.0], vec![0.0, 2.0], vec![0.0, 3.0]]);
    }

    #[test]
    fn test_batch_pools_categories_before_reindex() {
        let cols = columns(&["AGE", "HOUSING_own", "HOUSING_rent"]);
        let records = vec![
            record(json!({"AGE": 30, "HOUSING": "rent"})),
            record(json!({"AGE": 50, "HOUSING": "free"})),
        ];

        let rows = encode_batch(&records, EncodingPolicy::DropFirst).reindex(&cols);

        assert_eq!(rows, vec![vec![30.0, 0.0, 1.0], vec![50.0, 0.0, 0.0]]);
    }
}
