//! Documentation content for the abcd CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Syntax,
    Operators,
    Types,
    Arrays,
    Backends,
    Examples,
}

impl DocCategory {
    /// Parse category name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" | "grammar" => Some(Self::Syntax),
            "operators" | "ops" => Some(Self::Operators),
            "types" | "type" | "literals" => Some(Self::Types),
            "arrays" | "array" | "quantifiers" => Some(Self::Arrays),
            "backends" | "backend" => Some(Self::Backends),
            "examples" | "example" => Some(Self::Examples),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"ABCD QUERY LANGUAGE

Queries select atomistic structures by their properties. A query combines
predicates on fields with `and`, `or` and `not`; the same query runs against
every supported backend.

DOCUMENTATION CATEGORIES

  syntax            Field paths, grouping, precedence and keyword aliases
  operators         Comparison, regex, membership, range and existence
  types             Literal types and which operators accept them
  arrays            How predicates treat array-valued fields: any(...) and all(...)
  backends          Memory, document-store and search-index targets
  examples          Common queries

QUICK REFERENCE

  energy < -10                  Comparison
  config_type ~= "^bulk"        Regular expression
  elements in ["Si", "O"]       Membership
  n_atoms in 8..<64             Range (exclusive upper bound)
  virial                        Existence
  all(forces) < 0.1             Every element

Run 'abcd doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::from_name(name) {
        Some(DocCategory::Syntax) => Ok(SYNTAX_DOC),
        Some(DocCategory::Operators) => Ok(OPERATORS_DOC),
        Some(DocCategory::Types) => Ok(TYPES_DOC),
        Some(DocCategory::Arrays) => Ok(ARRAYS_DOC),
        Some(DocCategory::Backends) => Ok(BACKENDS_DOC),
        Some(DocCategory::Examples) => Ok(EXAMPLES_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const SYNTAX_DOC: &str = r#"SYNTAX - Fields, Grouping and Precedence

FIELD PATHS
  energy                    Top-level property
  derived.elements.Si       Nested object keys joined by '.'
  cell.0                    Numeric segments index arrays
  info.tag                  Name segments fan out over arrays of objects

BOOLEAN OPERATORS (lowest to highest precedence)
  a or b          a | b
  a and b         a & b
  not a           !a

  `and` binds tighter than `or`; `not` binds tightest. Operators of equal
  precedence group from the left. Use parentheses to override:

    (a or b) and c

REVERSED MEMBERSHIP
  22 in forces_count        Same as: forces_count = 22

EMPTY QUERY
  An empty query selects every record.
"#;

const OPERATORS_DOC: &str = r#"OPERATORS - Predicates on a Field

COMPARISON
  =   ==        Equal
  !=            Not equal (records without the field match)
  <  <=         Less than, at most
  >  >=         Greater than, at least

REGULAR EXPRESSION
  field ~= "pattern"        Unanchored search, Rust regex syntax
  field ~ "pattern"         Alias

MEMBERSHIP
  field in [v1, v2, ...]    Equal to one of the listed values (non-empty)

RANGE
  field in low..high        low <= field <= high
  field in low..<high       low <= field <  high
  field in low<..high       low <  field <= high
  field in low<..<high      low <  field <  high

  A range whose low bound exceeds its high bound matches nothing.

EXISTENCE
  field                     Present with a non-null value
"#;

const TYPES_DOC: &str = r#"TYPES - Literals

LITERALS
  42  -7                    Integer
  3.14  -2.31e-5            Float
  "text"                    String (escapes: \" \\ \/ \n \t \r \uXXXX)
  true  false               Boolean (True/False also accepted)
  2021-05-01                Date (midnight UTC)
  2021-05-01T12:30:00Z      Date and time, optional offset
  [1, 2, 3]                 Array (equality only)

OPERATOR RULES
  = !=                      Any literal
  < <= > >= ranges          Integer, float, string or date
  ~=                        String
  in [...]                  Scalars

  Integers and floats compare with each other exactly. Values of different
  types never match: `n_atoms = "8"` does not select n_atoms = 8.

ERRORS
  Every lex, parse and type error reports its line and column.
"#;

const ARRAYS_DOC: &str = r#"ARRAYS - Quantifiers

ANY (default)
  forces > 1                Some element is greater than 1
  any(forces) > 1           Same, spelled out
  pbc = [true, true, true]  The whole array equals the literal
  elements in ["Si", "O"]   Some element is listed

  A range tests both bounds against the same element:
    forces in -1..1         Some element lies within [-1, 1]

ALL
  all(forces) < 0.1         The array is non-empty and every element
                            is below 0.1

EXISTENCE
  Empty arrays, null and arrays holding only nulls count as absent.
"#;

const BACKENDS_DOC: &str = r#"BACKENDS - Compile Targets

  memory          In-process predicate; reference semantics
  document_store  Mongo-style filter document
  search_index    OpenSearch-style query DSL

  abcd compile --backend document_store 'energy < -10'

SEARCH INDEX LIMITS
  Not supported: `~=`, `all(...)` and equality against an array literal.
  Compiling them fails with an unsupported-operation error naming the
  construct. String predicates use the keyword sub-field (see
  `search.keyword_suffix` in abcd.toml).

CONFIGURATION
  abcd.toml (or the file in ABCD_CONFIG, or --config):

    backend = "document_store"

    [document]
    collection = "atoms"

    [search]
    index = "atoms"
    keyword_suffix = "keyword"

    [query]
    default_limit = 100

  Environment variables override the file: ABCD_BACKEND, ABCD_SEARCH__INDEX.
"#;

const EXAMPLES_DOC: &str = r#"EXAMPLES - Common Queries

  Structures computed with VASP or CASTEP:
    calculator_name in ["vasp", "castep"]

  Small cells with forces:
    n_atoms < 16 and forces

  Bulk silicon configurations uploaded this year:
    config_type ~= "^bulk" and elements = "Si" and uploaded >= 2026-01-01

  Everything but the test set:
    not tags = "test"

  Against a JSON file:
    abcd find 'energy < -100' --input structures.json --sort energy --limit 5
    cat structures.json | abcd count 'pbc = [true, true, true]'
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_resolve_aliases() {
        assert_eq!(DocCategory::from_name("Ops"), Some(DocCategory::Operators));
        assert!(get_doc_category("quantifiers").unwrap().contains("all(forces)"));
        assert!(matches!(
            get_doc_category("methods"),
            Err(CliError::UnknownCategory(_))
        ));
    }
}
