// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::{LexError, Lexer, Token};

fn lex(src: &str) -> Vec<Token> {
    Lexer::new(src).tokenize().unwrap()
}

#[test]
fn lexes_punctuation_and_operators() {
    assert_eq!(
        lex("+= -- -> $ <= >>"),
        vec![
            Token::PlusAssign,
            Token::MinusMinus,
            Token::Arrow,
            Token::Dollar,
            Token::Le,
            Token::Shr,
            Token::Eof,
        ]
    );
}

#[test]
fn distinguishes_keywords_from_identifiers() {
    assert_eq!(
        lex("if iffy"),
        vec![Token::If, Token::Ident("iffy".to_string()), Token::Eof]
    );
}

#[test]
fn lexes_numeric_literals() {
    assert_eq!(
        lex("42 3.5"),
        vec![Token::Int(42), Token::Float(3.5), Token::Eof]
    );
}

#[test]
fn lexes_string_literals_with_escapes() {
    assert_eq!(
        lex(r#""a\nb""#),
        vec![Token::Str("a\nb".to_string()), Token::Eof]
    );
}

#[test]
fn skips_line_and_block_comments() {
    assert_eq!(
        lex("1 // comment\n+ /* block */ 2"),
        vec![Token::Int(1), Token::Plus, Token::Int(2), Token::Eof]
    );
}

#[test]
fn unterminated_string_is_an_error() {
    let err = Lexer::new("\"abc").tokenize().unwrap_err();
    assert!(matches!(err, LexError::UnterminatedString { line: 1, column: 1 }));
}

#[test]
fn unexpected_character_is_an_error() {
    let err = Lexer::new("@").tokenize().unwrap_err();
    assert!(matches!(err, LexError::UnexpectedChar { ch: '@', .. }));
}
