use lark::scanner::Scanner;
use lark::token::{Token, TokenType};

fn scan(source: &str) -> Vec<Result<Token, String>> {
    Scanner::new(source.as_bytes())
        .map(|r| r.map_err(|e| e.to_string()))
        .collect()
}

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .filter_map(Result::ok)
        .collect();

    assert_eq!(
        tokens.len(),
        expected.len(),
        "token count mismatch for {:?}: {:?}",
        source,
        tokens
    );

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type, "in {:?}", source);
        assert_eq!(actual.lexeme, *expected_lexeme, "in {:?}", source);
    }
}

#[test]
fn symbols() {
    assert_token_sequence(
        "({*.,+^?:;})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::CARET, "^"),
            (TokenType::QUESTION, "?"),
            (TokenType::COLON, ":"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn multi_char_operators_match_greedily() {
    assert_token_sequence(
        "== != <= >= ++ -- += -= *= /=",
        &[
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::PLUS_PLUS, "++"),
            (TokenType::MINUS_MINUS, "--"),
            (TokenType::PLUS_EQUAL, "+="),
            (TokenType::MINUS_EQUAL, "-="),
            (TokenType::STAR_EQUAL, "*="),
            (TokenType::SLASH_EQUAL, "/="),
            (TokenType::EOF, ""),
        ],
    );

    // A run of three pluses is '++' then '+'.
    assert_token_sequence(
        "+++",
        &[
            (TokenType::PLUS_PLUS, "++"),
            (TokenType::PLUS, "+"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_are_reserved_but_constructor_is_not() {
    assert_token_sequence(
        "class constructor extends new none let function",
        &[
            (TokenType::CLASS, "class"),
            (TokenType::IDENTIFIER, "constructor"),
            (TokenType::EXTENDS, "extends"),
            (TokenType::NEW, "new"),
            (TokenType::NONE, "none"),
            (TokenType::LET, "let"),
            (TokenType::FUNCTION, "function"),
            (TokenType::EOF, ""),
        ],
    );

    // Keywords are case-sensitive.
    assert_token_sequence(
        "Let LET",
        &[
            (TokenType::IDENTIFIER, "Let"),
            (TokenType::IDENTIFIER, "LET"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn comments_are_discarded() {
    assert_token_sequence(
        "let a; // slash comment\n# hash comment\n/* block\nspanning lines */ let b;",
        &[
            (TokenType::LET, "let"),
            (TokenType::IDENTIFIER, "a"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::LET, "let"),
            (TokenType::IDENTIFIER, "b"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn unterminated_block_comment_reads_to_eof_without_error() {
    let results = scan("let a; /* never closed");

    assert!(results.iter().all(Result::is_ok));

    let kinds: Vec<TokenType> = results
        .into_iter()
        .map(|r| r.unwrap().token_type)
        .collect();

    assert_eq!(
        kinds,
        vec![
            TokenType::LET,
            TokenType::IDENTIFIER,
            TokenType::SEMICOLON,
            TokenType::EOF
        ]
    );
}

#[test]
fn string_literal_excludes_quotes_and_may_span_lines() {
    let tokens: Vec<Token> = Scanner::new("\"ab\ncd\" x".as_bytes())
        .filter_map(Result::ok)
        .collect();

    match &tokens[0].token_type {
        TokenType::STRING(s) => assert_eq!(s, "ab\ncd"),

        other => panic!("expected string token, got {:?}", other),
    }

    // The identifier after the two-line string sits on row 2.
    assert_eq!(tokens[1].lexeme, "x");
    assert_eq!((tokens[1].row, tokens[1].col), (2, 5));
}

#[test]
fn tokens_carry_one_based_positions() {
    let tokens: Vec<Token> = Scanner::new("let a;\n  a = 1;".as_bytes())
        .filter_map(Result::ok)
        .collect();

    let positions: Vec<(usize, usize, &str)> = tokens
        .iter()
        .map(|t| (t.row, t.col, t.lexeme.as_str()))
        .collect();

    assert_eq!(
        positions,
        vec![
            (1, 1, "let"),
            (1, 5, "a"),
            (1, 6, ";"),
            (2, 3, "a"),
            (2, 5, "="),
            (2, 7, "1"),
            (2, 8, ";"),
            (2, 9, ""),
        ]
    );
}

#[test]
fn numeric_literals_round_trip() {
    let tokens: Vec<Token> = Scanner::new("42 3.25 0.5 7.".as_bytes())
        .filter_map(Result::ok)
        .collect();

    let expect = [("42", 42.0), ("3.25", 3.25), ("0.5", 0.5)];

    for (token, (lexeme, value)) in tokens.iter().zip(expect.iter()) {
        assert_eq!(&token.lexeme, lexeme);

        match token.token_type {
            TokenType::NUMBER(n) => assert_eq!(n, *value),

            ref other => panic!("expected number token, got {:?}", other),
        }
    }

    // '7.' is a number followed by a dot: the fraction needs a digit.
    assert_eq!(tokens[3].lexeme, "7");
    assert_eq!(tokens[4].token_type, TokenType::DOT);
}

#[test]
fn unterminated_string_is_a_syntax_error() {
    let results = scan("let s = \"oops");

    let errors: Vec<&String> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Syntax Error: unterminated string"));
    assert!(errors[0].starts_with("1:9:"), "got {}", errors[0]);
}

#[test]
fn unexpected_character_reports_and_continues() {
    let results = scan(",.$(@");

    let error_count = results.iter().filter(|r| r.is_err()).count();

    assert_eq!(error_count, 2);

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            err.contains("Syntax Error: unexpected character"),
            "got: {}",
            err
        );
    }

    // Scanning continued through the bad bytes.
    let kinds: Vec<TokenType> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|t| t.token_type.clone())
        .collect();

    assert_eq!(
        kinds,
        vec![
            TokenType::COMMA,
            TokenType::DOT,
            TokenType::LEFT_PAREN,
            TokenType::EOF
        ]
    );
}

#[test]
fn every_input_ends_with_exactly_one_eof() {
    for source in ["", "   ", "// only a comment", "let a = 1;", "\"s\"", "$"] {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect();

        let eof_count = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::EOF)
            .count();

        assert_eq!(eof_count, 1, "for source {:?}", source);

        assert_eq!(
            tokens.last().expect("at least EOF").token_type,
            TokenType::EOF
        );
    }
}
