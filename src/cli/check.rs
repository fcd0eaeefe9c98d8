//! Parse and compile queries without touching a store

use crate::{Backend, Compiled, Config, compile, parse};

use super::CliError;

/// How `check` reports a valid query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckFormat {
    /// The typed tree as JSON
    #[default]
    Ast,
    /// Canonical query text
    Canonical,
}

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query to check
    pub query: String,
    pub format: CheckFormat,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    Ast(serde_json::Value),
    Canonical(String),
}

/// Parse and type-check a query
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let node = parse(&options.query)?;
    Ok(match options.format {
        CheckFormat::Ast => CheckResult::Ast(serde_json::to_value(&node)?),
        CheckFormat::Canonical => CheckResult::Canonical(node.to_string()),
    })
}

/// Compile a query for `backend`. In-process predicates have no native
/// text, so the memory backend reports the canonical query instead.
pub fn execute_compile(
    query: &str,
    backend: Backend,
    config: &Config,
) -> Result<serde_json::Value, CliError> {
    let node = match query.trim() {
        "" => None,
        text => Some(parse(text)?),
    };
    let compiled = compile::compile(node.as_ref(), backend, config)?;
    Ok(match compiled {
        Compiled::Predicate(_) => serde_json::json!({
            "backend": backend,
            "predicate": node.map(|n| n.to_string()),
        }),
        Compiled::Document(filter) | Compiled::Search(filter) => filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_output_normalizes_aliases() {
        let options = CheckOptions {
            query: "a == 1 & !b".to_string(),
            format: CheckFormat::Canonical,
        };
        match execute_check(&options).unwrap() {
            CheckResult::Canonical(text) => assert_eq!(text, "a = 1 and not b"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn compile_reports_unsupported_constructs() {
        let err = execute_compile("name ~= \"x\"", Backend::SearchIndex, &Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("~="));
    }
}
