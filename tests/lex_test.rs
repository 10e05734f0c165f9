use mm15::lang::{lex, Operator, Token};

fn single(s: &str) -> Token {
    let mut tokens = lex(s);
    assert_eq!(tokens.len(), 1, "expected one token from {:?}: {:?}", s, tokens);
    tokens.remove(0)
}

#[test]
fn test_number_forms() {
    for s in &["0", "42", "-7", "+3", "3.25", ".5", "-.5", "1e6", "1.5E-3"] {
        assert_eq!(single(s), Token::Number(s.to_string()), "lexing {}", s);
    }
}

#[test]
fn test_number_stops_at_bare_exponent() {
    assert_eq!(
        lex("2e"),
        vec![
            Token::Number("2".to_string()),
            Token::Function("e".to_string()),
        ]
    );
}

#[test]
fn test_complex_literal() {
    assert_eq!(single("(1.5,-2)"), Token::Complex("(1.5,-2)".to_string()));
    // no space allowed after the paren; the rest re-lexes separately
    assert_eq!(lex("( 1,2)")[0], Token::Unknown("(".to_string()));
}

#[test]
fn test_string_literal() {
    assert_eq!(single("\"hello world\""), Token::Str("hello world".to_string()));
    // an unterminated string runs to end of line
    assert_eq!(single("\"open"), Token::Str("open".to_string()));
}

#[test]
fn test_matrix_forms() {
    assert_eq!(
        single("[3,2,\"data.txt\"]"),
        Token::MatrixFile("[3,2,\"data.txt\"]".to_string())
    );
    assert_eq!(
        single("[2 2 $ 1 2 3 4]"),
        Token::MatrixInlineReal("2 2 $ 1 2 3 4".to_string())
    );
    assert_eq!(
        single("[1 2 $ (1,2) (3,4)]"),
        Token::MatrixInlineComplex("1 2 $ (1,2) (3,4)".to_string())
    );
    assert_eq!(
        single("[1 2 $ 1 (3,4)]"),
        Token::MatrixInlineMixed("1 2 $ 1 (3,4)".to_string())
    );
}

#[test]
fn test_builtins_are_functions() {
    assert_eq!(single("sqrt"), Token::Function("sqrt".to_string()));
    assert_eq!(single("ctr_clall"), Token::Function("ctr_clall".to_string()));
    assert_eq!(single("sqrtx"), Token::Identifier("sqrtx".to_string()));
}

#[test]
fn test_operators_and_definitions() {
    assert_eq!(
        lex(": double 2 * ;"),
        vec![
            Token::Colon,
            Token::Identifier("double".to_string()),
            Token::Number("2".to_string()),
            Token::Operator(Operator::Star),
            Token::Semicolon,
        ]
    );
    assert_eq!(single("'"), Token::Function("'".to_string()));
    assert_eq!(single(".^"), Token::Operator(Operator::DotCaret));
}

#[test]
fn test_whole_line() {
    assert_eq!(
        lex("3 4 + \"x\" sto"),
        vec![
            Token::Number("3".to_string()),
            Token::Number("4".to_string()),
            Token::Operator(Operator::Plus),
            Token::Str("x".to_string()),
            Token::Function("sto".to_string()),
        ]
    );
}
