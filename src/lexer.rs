//! Tokenizer for XPath expressions.
//!
//! Produces the positional token stream the parser consumes. Words are
//! classified into [`TokenKind::Name`], [`TokenKind::OperatorWord`] and
//! [`TokenKind::ReservedWord`] here, but every word keeps its lexeme:
//! whether `map` is a constructor keyword or an element name is decided
//! by the parser from syntactic position.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{opt, recognize},
    sequence::pair,
};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    OperatorWord,
    ReservedWord,
    StringLiteral,
    IntegerLiteral,
    DecimalLiteral,
    DoubleLiteral,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    ColonColon,
    Colon,
    ColonStar,
    StarColon,
    DotDot,
    Dot,
    At,
    Star,
    Pipe,
    Dollar,
    Question,
    Plus,
    Minus,
    Equals,
    NotEquals,
    LessThanOrEqual,
    LessThan,
    GreaterThanOrEqual,
    GreaterThan,
    SlashSlash,
    Slash,
    Bind,
    Arrow,
    Concat,
    Bang,
    Hash,
}

/// One token. Immutable; the parser only moves a cursor over the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: usize,
}

const RESERVED_WORDS: &[&str] = &[
    "if", "then", "else", "for", "in", "return", "some", "every", "satisfies", "let", "map",
    "array", "function", "instance", "of", "treat", "as", "cast", "castable",
];

const OPERATOR_WORDS: &[&str] = &["and", "or", "div", "mod"];

/// Tokenizes a whole expression, skipping whitespace and (nestable)
/// `(: ... :)` comments.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let mut rest = input;
    let mut tokens = Vec::new();
    loop {
        rest = skip_trivia(input, rest)?;
        if rest.is_empty() {
            break;
        }
        let position = input.len() - rest.len();
        match token(rest) {
            Ok((remaining, (kind, lexeme))) => {
                tokens.push(Token {
                    kind,
                    lexeme,
                    position,
                });
                rest = remaining;
            }
            Err(_) => {
                let ch = rest.chars().next().unwrap_or('\0');
                return Err(Error::syntax(
                    format!("unexpected character '{}'", ch),
                    position,
                ));
            }
        }
    }
    Ok(tokens)
}

fn skip_trivia<'a>(input: &'a str, mut rest: &'a str) -> Result<&'a str, Error> {
    loop {
        let trimmed = rest.trim_start();
        if let Some(after_open) = trimmed.strip_prefix("(:") {
            rest = skip_comment(input, after_open)?;
        } else {
            return Ok(trimmed);
        }
    }
}

fn skip_comment<'a>(input: &'a str, mut rest: &'a str) -> Result<&'a str, Error> {
    let mut depth = 1usize;
    while depth > 0 {
        if let Some(after) = rest.strip_prefix("(:") {
            depth += 1;
            rest = after;
        } else if let Some(after) = rest.strip_prefix(":)") {
            depth -= 1;
            rest = after;
        } else if rest.is_empty() {
            return Err(Error::syntax("unterminated comment", input.len()));
        } else {
            let mut chars = rest.chars();
            chars.next();
            rest = chars.as_str();
        }
    }
    Ok(rest)
}

fn token(input: &str) -> IResult<&str, (TokenKind, String)> {
    alt((string_literal, number_literal, word, punctuation)).parse(input)
}

/// String literals use their delimiter doubled as the escape:
/// `'it''s'` is the string `it's`.
fn string_literal(input: &str) -> IResult<&str, (TokenKind, String)> {
    let (mut rest, delimiter) = alt((char('\''), char('"'))).parse(input)?;
    let mut value = String::new();
    loop {
        let Some(ch) = rest.chars().next() else {
            // Unterminated literal.
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Char,
            )));
        };
        rest = &rest[ch.len_utf8()..];
        if ch == delimiter {
            if let Some(stripped) = rest.strip_prefix(delimiter) {
                value.push(delimiter);
                rest = stripped;
            } else {
                return Ok((rest, (TokenKind::StringLiteral, value)));
            }
        } else {
            value.push(ch);
        }
    }
}

fn number_literal(input: &str) -> IResult<&str, (TokenKind, String)> {
    let (rest, lexeme) = recognize((
        alt((
            recognize((digit1, opt(pair(char('.'), opt(digit1))))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(recognize((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            digit1,
        ))),
    ))
    .parse(input)?;

    let kind = if lexeme.contains(['e', 'E']) {
        TokenKind::DoubleLiteral
    } else if lexeme.contains('.') {
        TokenKind::DecimalLiteral
    } else {
        TokenKind::IntegerLiteral
    };
    Ok((rest, (kind, lexeme.to_string())))
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

fn word(input: &str) -> IResult<&str, (TokenKind, String)> {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, ch)) if is_name_start(ch) => {}
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Alpha,
            )));
        }
    }
    let end = chars
        .find(|&(_, ch)| !is_name_char(ch))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    let lexeme = &input[..end];
    let kind = if RESERVED_WORDS.contains(&lexeme) {
        TokenKind::ReservedWord
    } else if OPERATOR_WORDS.contains(&lexeme) {
        TokenKind::OperatorWord
    } else {
        TokenKind::Name
    };
    Ok((&input[end..], (kind, lexeme.to_string())))
}

fn punctuation(input: &str) -> IResult<&str, (TokenKind, String)> {
    // Longest-match first within each leading character.
    let table: &[(&str, TokenKind)] = &[
        ("<=", TokenKind::LessThanOrEqual),
        (">=", TokenKind::GreaterThanOrEqual),
        ("!=", TokenKind::NotEquals),
        ("//", TokenKind::SlashSlash),
        ("::", TokenKind::ColonColon),
        (":=", TokenKind::Bind),
        (":*", TokenKind::ColonStar),
        ("*:", TokenKind::StarColon),
        ("..", TokenKind::DotDot),
        ("=>", TokenKind::Arrow),
        ("||", TokenKind::Concat),
        ("(", TokenKind::LeftParen),
        (")", TokenKind::RightParen),
        ("[", TokenKind::LeftBracket),
        ("]", TokenKind::RightBracket),
        ("{", TokenKind::LeftBrace),
        ("}", TokenKind::RightBrace),
        (",", TokenKind::Comma),
        (":", TokenKind::Colon),
        (".", TokenKind::Dot),
        ("@", TokenKind::At),
        ("*", TokenKind::Star),
        ("|", TokenKind::Pipe),
        ("$", TokenKind::Dollar),
        ("?", TokenKind::Question),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("=", TokenKind::Equals),
        ("<", TokenKind::LessThan),
        (">", TokenKind::GreaterThan),
        ("/", TokenKind::Slash),
        ("!", TokenKind::Bang),
        ("#", TokenKind::Hash),
    ];
    for (text, kind) in table {
        if let Ok((rest, matched)) = tag::<_, _, nom::error::Error<&str>>(*text).parse(input) {
            return Ok((rest, (*kind, matched.to_string())));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Tag,
    )))
}
