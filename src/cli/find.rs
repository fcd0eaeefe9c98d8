//! Run queries against records read from JSON input

use crate::{Abcd, Config, FindOptions, SortDirection};

use super::{CliError, load_records};

/// Options shared by `find` and `count`
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Query text; empty selects every record
    pub query: String,
    /// JSON records: an array, an object, or one object per line
    pub input: Option<String>,
    pub limit: Option<usize>,
    pub skip: usize,
    /// Sort keys, `field` ascending or `-field` descending
    pub sort: Vec<String>,
}

/// Parses a `--sort` key.
pub fn parse_sort(key: &str) -> Result<(String, SortDirection), CliError> {
    let (field, direction) = match key.strip_prefix('-') {
        Some(field) => (field, SortDirection::Descending),
        None => (key.strip_prefix('+').unwrap_or(key), SortDirection::Ascending),
    };
    if field.is_empty() || field.split('.').any(str::is_empty) {
        return Err(CliError::InvalidSort(key.to_string()));
    }
    Ok((field.to_string(), direction))
}

fn load(options: &QueryOptions, config: &Config) -> Result<Abcd, CliError> {
    let input = options.input.as_deref().ok_or(CliError::NoInput)?;
    let records = load_records(input)?;
    let db = Abcd::open(config.clone())?;
    db.insert_many(records)?;
    Ok(db)
}

fn query(options: &QueryOptions) -> Option<&str> {
    Some(options.query.as_str()).filter(|q| !q.trim().is_empty())
}

/// Matching records as JSON, each carrying its `_id`.
pub fn execute_find(
    options: &QueryOptions,
    config: &Config,
) -> Result<Vec<serde_json::Value>, CliError> {
    let mut find = FindOptions::new().skip(options.skip);
    find.limit = options.limit;
    for key in &options.sort {
        let (field, direction) = parse_sort(key)?;
        find = find.sort_by(field.as_str(), direction);
    }

    let db = load(options, config)?;
    let cursor = db.find(query(options), find)?;
    Ok(cursor.map(|record| record.to_json()).collect())
}

pub fn execute_count(options: &QueryOptions, config: &Config) -> Result<usize, CliError> {
    let db = load(options, config)?;
    Ok(db.count(query(options))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;

    fn options(query: &str) -> QueryOptions {
        QueryOptions {
            query: query.to_string(),
            input: Some(
                r#"[{"name": "a", "n": 3}, {"name": "b", "n": 1}, {"name": "c", "n": 2}]"#
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn find_sorts_and_limits() {
        let mut opts = options("n > 1");
        opts.sort = vec!["-n".to_string()];
        opts.limit = Some(1);

        let found = execute_find(&opts, &Config::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], "a");
    }

    #[test]
    fn count_on_every_backend() {
        for backend in [Backend::Memory, Backend::DocumentStore, Backend::SearchIndex] {
            let config = Config::default().with_backend(backend);
            assert_eq!(execute_count(&options("name in [\"a\", \"c\"]"), &config).unwrap(), 2);
            assert_eq!(execute_count(&options(""), &config).unwrap(), 3);
        }
    }

    #[test]
    fn sort_keys() {
        assert_eq!(
            parse_sort("-energy").unwrap(),
            ("energy".to_string(), SortDirection::Descending)
        );
        assert!(parse_sort("-").is_err());
        assert!(parse_sort("a..b").is_err());
    }
}
