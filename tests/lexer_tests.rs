// tests/lexer_tests.rs

use abcd::ast::{Token, TokenKind};
use abcd::lexer::{Lexer, tokenize};
use chrono::{TimeZone, Utc};

fn tokens(input: &str) -> Vec<Token> {
    tokenize(input)
        .map(|lexeme| lexeme.unwrap().token)
        .collect()
}

// ============================================================================
// Operators and Punctuation
// ============================================================================

#[test]
fn test_operator_tokens() {
    let test_cases = vec![
        ("=", Token::Eq),
        ("==", Token::Eq),
        ("!=", Token::NotEq),
        ("<", Token::Lt),
        ("<=", Token::LtEq),
        (">", Token::Gt),
        (">=", Token::GtEq),
        ("~=", Token::Regex),
        ("~", Token::Regex),
        ("&", Token::And),
        ("&&", Token::And),
        ("|", Token::Or),
        ("||", Token::Or),
        ("!", Token::Not),
        ("(", Token::LParen),
        (")", Token::RParen),
        ("[", Token::LBracket),
        ("]", Token::RBracket),
        (",", Token::Comma),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap().token;
        assert_eq!(token, expected, "Failed for input: {}", input);
        assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
    }
}

#[test]
fn test_range_tokens() {
    let test_cases = vec![
        ("..", true, true),
        ("..<", true, false),
        ("<..", false, true),
        ("<..<", false, false),
    ];

    for (input, low_inclusive, high_inclusive) in test_cases {
        assert_eq!(
            tokens(input),
            vec![
                Token::Range {
                    low_inclusive,
                    high_inclusive
                },
                Token::Eof
            ],
            "Failed for input: {}",
            input
        );
    }
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(
        tokens("42 -7 +3 3.25 -2.31e-5 1E3"),
        vec![
            Token::Integer(42),
            Token::Integer(-7),
            Token::Integer(3),
            Token::Float(3.25),
            Token::Float(-2.31e-5),
            Token::Float(1000.0),
            Token::Eof,
        ]
    );
}

#[test]
fn test_signed_numbers_are_not_dates() {
    let test_cases = vec![
        ("-999-1", vec![Token::Integer(-999), Token::Integer(-1), Token::Eof]),
        ("+123-4", vec![Token::Integer(123), Token::Integer(-4), Token::Eof]),
    ];

    for (input, expected) in test_cases {
        assert_eq!(tokens(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_number_before_range() {
    assert_eq!(
        tokens("-3..3.5"),
        vec![
            Token::Integer(-3),
            Token::Range {
                low_inclusive: true,
                high_inclusive: true
            },
            Token::Float(3.5),
            Token::Eof,
        ]
    );
}

#[test]
fn test_strings_and_escapes() {
    assert_eq!(
        tokens(r#""bulk" "a\"b" "tab\there" "é""#),
        vec![
            Token::String("bulk".to_string()),
            Token::String("a\"b".to_string()),
            Token::String("tab\there".to_string()),
            Token::String("é".to_string()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_dates() {
    assert_eq!(
        tokens("2021-05-01 2021-05-01T12:30:00Z 2021-05-01T12:30:00+02:00"),
        vec![
            Token::Date(Utc.with_ymd_and_hms(2021, 5, 1, 0, 0, 0).unwrap()),
            Token::Date(Utc.with_ymd_and_hms(2021, 5, 1, 12, 30, 0).unwrap()),
            Token::Date(Utc.with_ymd_and_hms(2021, 5, 1, 10, 30, 0).unwrap()),
            Token::Eof,
        ]
    );
}

#[test]
fn test_identifiers_and_paths() {
    assert_eq!(
        tokens("energy derived.elements.Si cell.0 _hidden"),
        vec![
            Token::Identifier("energy".to_string()),
            Token::Identifier("derived.elements.Si".to_string()),
            Token::Identifier("cell.0".to_string()),
            Token::Identifier("_hidden".to_string()),
            Token::Eof,
        ]
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unterminated_string() {
    let mut lexer = Lexer::new("name = \"bulk");
    lexer.next_token().unwrap();
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.position.column, 8);
    assert!(err.message.contains("unterminated"));
}

#[test]
fn test_unexpected_character() {
    let err = tokenize("a = 1 # comment")
        .find_map(Result::err)
        .expect("lex error");
    assert_eq!(err.position.offset, 6);
    assert_eq!(err.to_string(), "unexpected character `#` at line 1, column 7");
}

#[test]
fn test_integer_overflow_is_an_error() {
    assert!(tokenize("n = 99999999999999999999").any(|lexeme| lexeme.is_err()));
}

#[test]
fn test_invalid_date() {
    assert!(tokenize("uploaded > 2021-13-45").any(|lexeme| lexeme.is_err()));
}

#[test]
fn test_iterator_stops_after_error() {
    let results: Vec<_> = tokenize("a # b c").collect();
    assert_eq!(results.len(), 2);
    assert!(results[1].is_err());
}

// ============================================================================
// Lexemes
// ============================================================================

#[test]
fn test_lexeme_kind_and_text() {
    let lexemes: Vec<_> = tokenize("energy <= -1.5e2 and \"a\\tb\"")
        .map(Result::unwrap)
        .collect();

    let kinds: Vec<TokenKind> = lexemes.iter().map(|lexeme| lexeme.token.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::Number,
            TokenKind::Keyword,
            TokenKind::String,
            TokenKind::Eof,
        ]
    );

    let texts: Vec<&str> = lexemes.iter().map(|lexeme| lexeme.text.as_str()).collect();
    assert_eq!(texts, vec!["energy", "<=", "-1.5e2", "and", "\"a\\tb\"", ""]);
    assert_eq!(lexemes[2].position.column, 11);
}

#[test]
fn test_tokenizing_is_restartable() {
    let text = "a in 1..<5 or b ~= \"x\"";
    let first: Vec<_> = tokenize(text).collect();
    let second: Vec<_> = tokenize(text).collect();
    assert_eq!(first, second);

    let lexer = Lexer::new(text);
    assert_eq!(lexer.clone().count(), lexer.count());
}
