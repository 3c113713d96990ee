//! The SequenceType grammar: type annotations consumed by `instance of`,
//! `treat as`, `cast as` and function signatures.
//!
//! `map(...)`/`array(...)` tests are provided by the shared base at every
//! grammar level; union types are a 3.1 insertion.

use super::{Parser, XPathVersion};
use crate::ast::{QName, SingleType};
use crate::error::Error;
use crate::lexer::TokenKind;
use crate::types::matching::{ItemType, MapTypeArgs, Occurrence, SequenceType};
use crate::types::registry::AtomicType;

impl Parser {
    /// SequenceType: `empty-sequence()`, or an ItemType with an optional
    /// occurrence indicator. Indicators attach only immediately after a
    /// completed ItemType, never inside one.
    pub(crate) fn parse_sequence_type(&mut self) -> Result<SequenceType, Error> {
        if self.is_word("empty-sequence") && self.kind_at(1) == Some(TokenKind::LeftParen) {
            self.current += 2;
            self.expect(TokenKind::RightParen, "')'")?;
            return Ok(SequenceType::Empty);
        }
        let item_type = self.parse_item_type_union()?;
        let occurrence = self.parse_occurrence();
        Ok(SequenceType::Of {
            item_type,
            occurrence,
        })
    }

    fn parse_occurrence(&mut self) -> Occurrence {
        if self.eat(TokenKind::Question) {
            Occurrence::ZeroOrOne
        } else if self.eat(TokenKind::Star) {
            Occurrence::ZeroOrMore
        } else if self.eat(TokenKind::Plus) {
            Occurrence::OneOrMore
        } else {
            Occurrence::ExactlyOne
        }
    }

    /// `T1 | T2 | ...` in 3.1; a lone member stays unwrapped, so the
    /// two-member minimum of [`ItemType::union`] holds by construction.
    fn parse_item_type_union(&mut self) -> Result<ItemType, Error> {
        let first = self.parse_item_type()?;
        if self.grammar < XPathVersion::V3_1 || !self.check(TokenKind::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        // Only a name can start another member; anything else leaves the
        // '|' to the enclosing union expression.
        while self.check(TokenKind::Pipe) && self.kind_at(1).is_some_and(Self::is_wordish) {
            self.current += 1;
            members.push(self.parse_item_type()?);
        }
        if members.len() == 1 {
            return Ok(members.remove(0));
        }
        ItemType::union(members)
    }

    fn parse_item_type(&mut self) -> Result<ItemType, Error> {
        let Some(word) = self.word_at(0).map(str::to_string) else {
            return match self.peek() {
                Some(token) => Err(Error::syntax(
                    format!("expected an item type, found '{}'", token.lexeme),
                    token.position,
                )),
                None => Err(self.eof_error("an item type")),
            };
        };

        if self.kind_at(1) == Some(TokenKind::LeftParen) {
            match word.as_str() {
                "item" => {
                    self.current += 2;
                    self.expect(TokenKind::RightParen, "')'")?;
                    return Ok(ItemType::Item);
                }
                "map" => return self.parse_map_test(),
                "array" => return self.parse_array_test(),
                "function" => return self.parse_function_test(),
                _ if super::is_kind_test_word(&word) => {
                    self.current += 1;
                    return Ok(ItemType::Kind(self.parse_kind_test(&word)?));
                }
                _ => {}
            }
        }

        let position = self.peek().map(|t| t.position).unwrap_or(0);
        let name = self.parse_qname("an atomic type name")?;
        match resolve_atomic_type(&name) {
            Some(atomic) => Ok(ItemType::Atomic(atomic)),
            None => Err(Error::syntax(
                format!("unknown atomic type '{}'", name),
                position,
            )),
        }
    }

    /// `map(*)` or `map(K, V)`.
    fn parse_map_test(&mut self) -> Result<ItemType, Error> {
        self.current += 2; // 'map' '('
        if self.eat(TokenKind::Star) {
            self.expect(TokenKind::RightParen, "')'")?;
            return Ok(ItemType::Map(None));
        }
        let key = self.parse_sequence_type()?;
        self.expect(TokenKind::Comma, "','")?;
        let value = self.parse_sequence_type()?;
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(ItemType::Map(Some(Box::new(MapTypeArgs { key, value }))))
    }

    /// `array(*)` or `array(M)`.
    fn parse_array_test(&mut self) -> Result<ItemType, Error> {
        self.current += 2; // 'array' '('
        if self.eat(TokenKind::Star) {
            self.expect(TokenKind::RightParen, "')'")?;
            return Ok(ItemType::Array(None));
        }
        let member = self.parse_sequence_type()?;
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(ItemType::Array(Some(Box::new(member))))
    }

    /// `function(*)` or `function(T, ...) as T`.
    fn parse_function_test(&mut self) -> Result<ItemType, Error> {
        self.current += 2; // 'function' '('
        if self.eat(TokenKind::Star) {
            self.expect(TokenKind::RightParen, "')'")?;
            return Ok(ItemType::Function {
                params: None,
                ret: None,
            });
        }
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.parse_sequence_type()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        let ret = if self.eat_word("as") {
            Some(Box::new(self.parse_sequence_type()?))
        } else {
            None
        };
        Ok(ItemType::Function {
            params: Some(params),
            ret,
        })
    }

    /// The target of `cast as` / `castable as`: an atomic type name with
    /// an optional `?`.
    pub(crate) fn parse_single_type(&mut self) -> Result<SingleType, Error> {
        let position = self.peek().map(|t| t.position).unwrap_or(0);
        let name = self.parse_qname("an atomic type name")?;
        let target = resolve_atomic_type(&name).ok_or_else(|| {
            Error::syntax(format!("unknown atomic type '{}'", name), position)
        })?;
        let optional = self.eat(TokenKind::Question);
        Ok(SingleType { target, optional })
    }
}

/// Registry lookup for a type annotation name. Only the `xs` prefix (or
/// none) binds to the built-in registry.
fn resolve_atomic_type(name: &QName) -> Option<AtomicType> {
    match name.prefix.as_deref() {
        None | Some("xs") => AtomicType::by_name(&name.local_part),
        _ => None,
    }
}
