use std::collections::BTreeMap;

use crate::{ast::FieldPath, record::Record, value::Value};

/// One aggregation result row.
pub type Row = BTreeMap<String, Value>;

/// Property statistics over the matching records.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// One row per top-level property: `property`, `count` and `dtype`
    Properties,
    /// The value of `field` for every record that has it
    Values { field: FieldPath },
    /// Distinct values of `field` (array elements counted individually)
    /// with the number of records holding each
    ValueCounts { field: FieldPath },
}

pub(crate) fn run<'a>(
    records: impl Iterator<Item = &'a Record>,
    aggregation: &Aggregation,
) -> Vec<Row> {
    match aggregation {
        Aggregation::Properties => properties(records),
        Aggregation::Values { field } => records
            .flat_map(|record| record.resolve(field).into_iter().cloned().collect::<Vec<_>>())
            .map(|value| Row::from([("value".to_string(), value)]))
            .collect(),
        Aggregation::ValueCounts { field } => value_counts(records, field),
    }
}

fn properties<'a>(records: impl Iterator<Item = &'a Record>) -> Vec<Row> {
    let mut stats: BTreeMap<&str, (i64, String)> = BTreeMap::new();
    for record in records {
        for (key, value) in &record.fields {
            let label = dtype(value);
            let entry = stats.entry(key).or_insert_with(|| (0, label.clone()));
            entry.0 += 1;
            if entry.1 != label {
                entry.1 = "mixed".to_string();
            }
        }
    }

    stats
        .into_iter()
        .map(|(key, (count, label))| {
            Row::from([
                ("property".to_string(), Value::from(key)),
                ("count".to_string(), Value::Integer(count)),
                ("dtype".to_string(), Value::String(label)),
            ])
        })
        .collect()
}

fn value_counts<'a>(records: impl Iterator<Item = &'a Record>, field: &FieldPath) -> Vec<Row> {
    let mut counts: Vec<(Value, i64)> = vec![];
    for record in records {
        let values = record.resolve(field);
        let mut seen: Vec<&Value> = vec![];
        for value in crate::value::elements(&values) {
            if seen.iter().any(|v| v.loose_eq(value)) {
                continue;
            }
            seen.push(value);
            match counts.iter_mut().find(|(v, _)| v.loose_eq(value)) {
                Some((_, count)) => *count += 1,
                None => counts.push((value.clone(), 1)),
            }
        }
    }
    counts.sort_by(|(a, _), (b, _)| a.sort_cmp(b));

    counts
        .into_iter()
        .map(|(value, count)| {
            Row::from([
                ("value".to_string(), value),
                ("count".to_string(), Value::Integer(count)),
            ])
        })
        .collect()
}

/// Shape label of a property value: `scalar(float)`, `vector(int)`,
/// `array(float)`.
pub fn dtype(value: &Value) -> String {
    match value {
        Value::Array(items) => match items.first() {
            None => "vector(empty)".to_string(),
            Some(Value::Array(inner)) => match inner.first() {
                Some(Value::Array(_)) => "list(list(...))".to_string(),
                Some(first) => format!("array({})", first.type_name()),
                None => "array(empty)".to_string(),
            },
            Some(first) => format!("vector({})", first.type_name()),
        },
        other => format!("scalar({})", other.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_labels() {
        assert_eq!(dtype(&Value::Float(1.0)), "scalar(float)");
        assert_eq!(dtype(&Value::from(vec![true, false])), "vector(bool)");
        assert_eq!(
            dtype(&Value::from(vec![vec![0.0, 1.0], vec![1.0, 0.0]])),
            "array(float)"
        );
        assert_eq!(dtype(&Value::Object(BTreeMap::new())), "scalar(dict)");
    }

    #[test]
    fn value_counts_count_records() {
        let records = [
            Record::new().with("elements", Value::from(vec!["Si", "O", "O"])),
            Record::new().with("elements", Value::from(vec!["Si"])),
        ];
        let rows = run(
            records.iter(),
            &Aggregation::ValueCounts {
                field: FieldPath::parse("elements"),
            },
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["value"], Value::from("O"));
        assert_eq!(rows[0]["count"], Value::Integer(1));
        assert_eq!(rows[1]["value"], Value::from("Si"));
        assert_eq!(rows[1]["count"], Value::Integer(2));
    }
}
