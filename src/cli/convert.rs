//! Record input for the CLI

use crate::Record;

use super::CliError;

/// Parses records from a JSON array, a single JSON object, or one JSON
/// object per line.
pub fn load_records(text: &str) -> Result<Vec<Record>, CliError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CliError::NoInput);
    }

    let values: Vec<serde_json::Value> = match serde_json::from_str(trimmed) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(single) => vec![single],
        Err(_) => trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| Record::from_json(value).ok_or(CliError::InvalidRecord { index }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_arrays_objects_and_lines() {
        assert_eq!(load_records(r#"[{"a": 1}, {"a": 2}]"#).unwrap().len(), 2);
        assert_eq!(load_records(r#"{"a": 1}"#).unwrap().len(), 1);
        assert_eq!(load_records("{\"a\": 1}\n\n{\"a\": 2}\n").unwrap().len(), 2);
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            load_records("[{\"a\": 1}, 3]"),
            Err(CliError::InvalidRecord { index: 1 })
        ));
        assert!(matches!(load_records("  "), Err(CliError::NoInput)));
    }
}
