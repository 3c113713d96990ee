//! Recursive-descent XPath parser over the token stream.
//!
//! One [`Parser`] implements the whole precedence chain; the grammar
//! level (`1.0`..`3.1`) is an ordered field consulted at exactly the
//! points where a newer grammar inserts productions, so lower levels
//! parse identically under every version.

mod types;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::ast::*;
use crate::error::Error;
use crate::functions::{ExtensionFunction, ExtensionRegistry};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::types::matching::KindTest;

/// The XPath language versions, ordered: a grammar supports its own
/// version and everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum XPathVersion {
    #[default]
    V1_0,
    V2_0,
    V3_0,
    V3_1,
}

impl XPathVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            XPathVersion::V1_0 => "1.0",
            XPathVersion::V2_0 => "2.0",
            XPathVersion::V3_0 => "3.0",
            XPathVersion::V3_1 => "3.1",
        }
    }
}

impl fmt::Display for XPathVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for XPathVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "1.0" => Ok(XPathVersion::V1_0),
            "2.0" => Ok(XPathVersion::V2_0),
            "3.0" => Ok(XPathVersion::V3_0),
            "3.1" => Ok(XPathVersion::V3_1),
            other => Err(Error::config(format!("unknown XPath version '{}'", other))),
        }
    }
}

/// Parser construction options.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub version: XPathVersion,
    pub strict: bool,
    pub extensions: Vec<ExtensionFunction>,
}

impl ParserOptions {
    pub fn new() -> Self {
        Self {
            version: XPathVersion::default(),
            strict: true,
            extensions: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: XPathVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<ExtensionFunction>) -> Self {
        self.extensions = extensions;
        self
    }
}

/// A parsed expression together with the statically validated pieces it
/// needs at evaluation time.
#[derive(Debug, Clone)]
pub struct CompiledXPath {
    pub(crate) root: Expression,
    pub(crate) version: XPathVersion,
    pub(crate) extensions: Arc<ExtensionRegistry>,
}

impl CompiledXPath {
    pub fn root(&self) -> &Expression {
        &self.root
    }

    pub fn version(&self) -> XPathVersion {
        self.version
    }

    pub fn extensions(&self) -> &Arc<ExtensionRegistry> {
        &self.extensions
    }
}

/// Recursive-descent parser. Holds the cursor for one parse at a time;
/// `parse` resets it on entry, so an instance must not be shared by
/// overlapping parses.
pub struct Parser {
    grammar: XPathVersion,
    options: ParserOptions,
    extensions: Arc<ExtensionRegistry>,
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// A parser whose grammar level is the requested version.
    pub fn new(options: ParserOptions) -> Result<Self, Error> {
        Self::with_grammar(options.version, options)
    }

    pub fn xpath10(options: ParserOptions) -> Result<Self, Error> {
        Self::with_grammar(XPathVersion::V1_0, options)
    }

    pub fn xpath20(options: ParserOptions) -> Result<Self, Error> {
        Self::with_grammar(XPathVersion::V2_0, options)
    }

    pub fn xpath30(options: ParserOptions) -> Result<Self, Error> {
        Self::with_grammar(XPathVersion::V3_0, options)
    }

    pub fn xpath31(options: ParserOptions) -> Result<Self, Error> {
        Self::with_grammar(XPathVersion::V3_1, options)
    }

    fn with_grammar(grammar: XPathVersion, options: ParserOptions) -> Result<Self, Error> {
        if options.strict && options.version > grammar {
            return Err(Error::config(format!(
                "version {} is not supported by the {} grammar",
                options.version, grammar
            )));
        }
        let extensions = Arc::new(ExtensionRegistry::from_functions(&options.extensions)?);
        Ok(Self {
            grammar,
            options,
            extensions,
            tokens: Vec::new(),
            current: 0,
        })
    }

    pub fn grammar(&self) -> XPathVersion {
        self.grammar
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Tokenizes and parses one complete expression.
    pub fn parse(&mut self, input: &str) -> Result<CompiledXPath, Error> {
        let tokens = tokenize(input)?;
        self.parse_tokens(tokens)
    }

    /// Parses a pre-lexed token stream. The whole stream must be
    /// consumed by exactly one expression.
    pub fn parse_tokens(&mut self, tokens: Vec<Token>) -> Result<CompiledXPath, Error> {
        self.tokens = tokens;
        self.current = 0;
        if self.tokens.is_empty() {
            return Err(Error::syntax("empty expression", 0));
        }
        let root = self.parse_expr()?;
        if let Some(token) = self.peek() {
            return Err(Error::syntax(
                format!("unexpected trailing token '{}'", token.lexeme),
                token.position,
            ));
        }
        Ok(CompiledXPath {
            root,
            version: self.options.version,
            extensions: self.extensions.clone(),
        })
    }

    // ----- cursor helpers -----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset)
    }

    fn kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.peek_at(offset).map(|t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Error> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                let token = token.clone();
                self.current += 1;
                Ok(token)
            }
            Some(token) => Err(Error::syntax(
                format!("expected {}, found '{}'", what, token.lexeme),
                token.position,
            )),
            None => Err(self.eof_error(what)),
        }
    }

    fn eof_error(&self, what: &str) -> Error {
        let position = self.tokens.last().map(|t| t.position + t.lexeme.len()).unwrap_or(0);
        Error::syntax(format!("expected {}, found end of input", what), position)
    }

    fn is_wordish(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Name | TokenKind::OperatorWord | TokenKind::ReservedWord
        )
    }

    fn word_at(&self, offset: usize) -> Option<&str> {
        self.peek_at(offset)
            .filter(|t| Self::is_wordish(t.kind))
            .map(|t| t.lexeme.as_str())
    }

    fn is_word(&self, word: &str) -> bool {
        self.word_at(0) == Some(word)
    }

    fn is_word_at(&self, offset: usize, word: &str) -> bool {
        self.word_at(offset) == Some(word)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), Error> {
        if self.eat_word(word) {
            Ok(())
        } else {
            match self.peek() {
                Some(token) => Err(Error::syntax(
                    format!("expected '{}', found '{}'", word, token.lexeme),
                    token.position,
                )),
                None => Err(self.eof_error(&format!("'{}'", word))),
            }
        }
    }

    /// A name-position token: reserved and operator words stay usable as
    /// node, function and variable names.
    fn take_name(&mut self, what: &str) -> Result<String, Error> {
        match self.peek() {
            Some(token) if Self::is_wordish(token.kind) => {
                let lexeme = token.lexeme.clone();
                self.current += 1;
                Ok(lexeme)
            }
            Some(token) => Err(Error::syntax(
                format!("expected {}, found '{}'", what, token.lexeme),
                token.position,
            )),
            None => Err(self.eof_error(what)),
        }
    }

    fn parse_qname(&mut self, what: &str) -> Result<QName, Error> {
        let first = self.take_name(what)?;
        if self.check(TokenKind::Colon) && self.kind_at(1).is_some_and(Self::is_wordish) {
            self.current += 1;
            let local = self.take_name("local name")?;
            Ok(QName::with_prefix(first, local))
        } else {
            Ok(QName::new(first))
        }
    }

    // ----- precedence chain -----

    /// Expr: comma-separated sequence construction at the top level is a
    /// 3.0 insertion; parenthesized sequences are handled by the shared
    /// primary.
    fn parse_expr(&mut self) -> Result<Expression, Error> {
        let first = self.parse_expr_single()?;
        if self.grammar >= XPathVersion::V3_0 && self.check(TokenKind::Comma) {
            let mut items = vec![first];
            while self.eat(TokenKind::Comma) {
                items.push(self.parse_expr_single()?);
            }
            return Ok(Expression::Sequence(items));
        }
        Ok(first)
    }

    /// ExprSingle: the keyword forms are checked first, each recognized
    /// only in its unambiguous syntactic position so the words stay
    /// usable as names.
    fn parse_expr_single(&mut self) -> Result<Expression, Error> {
        if self.grammar >= XPathVersion::V2_0 {
            if self.is_word("if") && self.kind_at(1) == Some(TokenKind::LeftParen) {
                return self.parse_if();
            }
            if self.is_word("for") && self.kind_at(1) == Some(TokenKind::Dollar) {
                return self.parse_for();
            }
            if (self.is_word("some") || self.is_word("every"))
                && self.kind_at(1) == Some(TokenKind::Dollar)
            {
                return self.parse_quantified();
            }
        }
        if self.grammar >= XPathVersion::V3_0
            && self.is_word("let")
            && self.kind_at(1) == Some(TokenKind::Dollar)
        {
            return self.parse_let();
        }
        self.parse_or()
    }

    fn parse_if(&mut self) -> Result<Expression, Error> {
        self.expect_word("if")?;
        self.expect(TokenKind::LeftParen, "'('")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RightParen, "')'")?;
        self.expect_word("then")?;
        let then_expr = self.parse_expr_single()?;
        self.expect_word("else")?;
        let else_expr = self.parse_expr_single()?;
        Ok(Expression::if_expr(condition, then_expr, else_expr))
    }

    fn parse_for(&mut self) -> Result<Expression, Error> {
        self.expect_word("for")?;
        let bindings = self.parse_in_bindings()?;
        self.expect_word("return")?;
        let return_expr = self.parse_expr_single()?;
        Ok(Expression::ForExpr {
            bindings,
            return_expr: Box::new(return_expr),
        })
    }

    fn parse_let(&mut self) -> Result<Expression, Error> {
        self.expect_word("let")?;
        let mut bindings = Vec::new();
        loop {
            self.expect(TokenKind::Dollar, "'$'")?;
            let name = self.take_name("variable name")?;
            self.expect(TokenKind::Bind, "':='")?;
            let value = self.parse_expr_single()?;
            bindings.push((name, Box::new(value)));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_word("return")?;
        let return_expr = self.parse_expr_single()?;
        Ok(Expression::LetExpr {
            bindings,
            return_expr: Box::new(return_expr),
        })
    }

    fn parse_quantified(&mut self) -> Result<Expression, Error> {
        let quantifier = if self.eat_word("some") {
            Quantifier::Some
        } else {
            self.expect_word("every")?;
            Quantifier::Every
        };
        let bindings = self.parse_in_bindings()?;
        self.expect_word("satisfies")?;
        let satisfies = self.parse_expr_single()?;
        Ok(Expression::QuantifiedExpr {
            quantifier,
            bindings,
            satisfies: Box::new(satisfies),
        })
    }

    fn parse_in_bindings(&mut self) -> Result<Vec<(String, Box<Expression>)>, Error> {
        let mut bindings = Vec::new();
        loop {
            self.expect(TokenKind::Dollar, "'$'")?;
            let name = self.take_name("variable name")?;
            self.expect_word("in")?;
            let value = self.parse_expr_single()?;
            bindings.push((name, Box::new(value)));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(bindings)
    }

    fn parse_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_and()?;
        while self.eat_word("or") {
            let right = self.parse_and()?;
            left = Expression::binary_op(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;
        while self.eat_word("and") {
            let right = self.parse_equality()?;
            left = Expression::binary_op(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat(TokenKind::Equals) {
                BinaryOperator::Equals
            } else if self.eat(TokenKind::NotEquals) {
                BinaryOperator::NotEquals
            } else {
                return Ok(left);
            };
            let right = self.parse_relational()?;
            left = Expression::binary_op(left, op, right);
        }
    }

    fn parse_relational(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_range()?;
        loop {
            let op = if self.eat(TokenKind::LessThan) {
                BinaryOperator::LessThan
            } else if self.eat(TokenKind::LessThanOrEqual) {
                BinaryOperator::LessThanOrEqual
            } else if self.eat(TokenKind::GreaterThan) {
                BinaryOperator::GreaterThan
            } else if self.eat(TokenKind::GreaterThanOrEqual) {
                BinaryOperator::GreaterThanOrEqual
            } else {
                return Ok(left);
            };
            let right = self.parse_range()?;
            left = Expression::binary_op(left, op, right);
        }
    }

    /// Range `a to b`, a 2.0 insertion between the relational and
    /// additive levels.
    fn parse_range(&mut self) -> Result<Expression, Error> {
        let left = self.parse_additive()?;
        if self.grammar >= XPathVersion::V2_0 && self.eat_word("to") {
            let right = self.parse_additive()?;
            return Ok(Expression::RangeExpr {
                start: Box::new(left),
                end: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_string_concat()?;
        loop {
            let op = if self.eat(TokenKind::Plus) {
                BinaryOperator::Plus
            } else if self.eat(TokenKind::Minus) {
                BinaryOperator::Minus
            } else {
                return Ok(left);
            };
            let right = self.parse_string_concat()?;
            left = Expression::binary_op(left, op, right);
        }
    }

    /// `||`, a 3.0 insertion between the additive and multiplicative
    /// levels.
    fn parse_string_concat(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;
        if self.grammar >= XPathVersion::V3_0 {
            while self.eat(TokenKind::Concat) {
                let right = self.parse_multiplicative()?;
                left = Expression::StringConcat {
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat(TokenKind::Star) {
                BinaryOperator::Multiply
            } else if self.eat_word("div") {
                BinaryOperator::Divide
            } else if self.eat_word("mod") {
                BinaryOperator::Modulo
            } else {
                return Ok(left);
            };
            let right = self.parse_unary()?;
            left = Expression::binary_op(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let mut ops = Vec::new();
        loop {
            if self.eat(TokenKind::Minus) {
                ops.push(UnaryOperator::Minus);
            } else if self.eat(TokenKind::Plus) {
                ops.push(UnaryOperator::Plus);
            } else {
                break;
            }
        }
        let mut expr = self.parse_union()?;
        for op in ops.into_iter().rev() {
            expr = Expression::unary_op(op, expr);
        }
        Ok(expr)
    }

    fn parse_union(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_simple_map()?;
        while self.eat(TokenKind::Pipe) {
            let right = self.parse_simple_map()?;
            left = Expression::binary_op(left, BinaryOperator::Union, right);
        }
        Ok(left)
    }

    /// `!`, a 3.0 insertion between the union and instance-of levels.
    fn parse_simple_map(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_instance_of()?;
        if self.grammar >= XPathVersion::V3_0 {
            while self.eat(TokenKind::Bang) {
                let right = self.parse_instance_of()?;
                left = Expression::SimpleMapExpr {
                    base: Box::new(left),
                    mapping: Box::new(right),
                };
            }
        }
        Ok(left)
    }

    /// The 2.0 type operators between the union and path levels.
    fn parse_instance_of(&mut self) -> Result<Expression, Error> {
        let expr = self.parse_arrow()?;
        if self.grammar < XPathVersion::V2_0 {
            return Ok(expr);
        }
        if self.is_word("instance") && self.is_word_at(1, "of") {
            self.current += 2;
            let sequence_type = self.parse_sequence_type()?;
            return Ok(Expression::InstanceOf {
                expr: Box::new(expr),
                sequence_type,
            });
        }
        if self.is_word("treat") && self.is_word_at(1, "as") {
            self.current += 2;
            let sequence_type = self.parse_sequence_type()?;
            return Ok(Expression::TreatAs {
                expr: Box::new(expr),
                sequence_type,
            });
        }
        if self.is_word("castable") && self.is_word_at(1, "as") {
            self.current += 2;
            let single_type = self.parse_single_type()?;
            return Ok(Expression::CastableAs {
                expr: Box::new(expr),
                single_type,
            });
        }
        if self.is_word("cast") && self.is_word_at(1, "as") {
            self.current += 2;
            let single_type = self.parse_single_type()?;
            return Ok(Expression::CastAs {
                expr: Box::new(expr),
                single_type,
            });
        }
        Ok(expr)
    }

    /// `=>`, a 3.0 insertion between the instance-of and path levels.
    fn parse_arrow(&mut self) -> Result<Expression, Error> {
        let base = self.parse_path()?;
        if self.grammar < XPathVersion::V3_0 || !self.check(TokenKind::Arrow) {
            return Ok(base);
        }
        let mut steps = Vec::new();
        while self.eat(TokenKind::Arrow) {
            let function_name = self.parse_qname("function name after '=>'")?;
            let args = self.parse_argument_list()?;
            steps.push(ArrowStep {
                function_name,
                args,
            });
        }
        Ok(Expression::ArrowExpr {
            base: Box::new(base),
            steps,
        })
    }

    // ----- paths -----

    fn parse_path(&mut self) -> Result<Expression, Error> {
        if self.eat(TokenKind::Slash) {
            let steps = if self.starts_step() {
                self.parse_steps()?
            } else {
                Vec::new()
            };
            return Ok(Expression::Path(LocationPath {
                start: PathStart::Root,
                steps,
            }));
        }
        if self.eat(TokenKind::SlashSlash) {
            let mut steps = vec![Step::descendant_or_self()];
            steps.extend(self.parse_steps()?);
            return Ok(Expression::Path(LocationPath {
                start: PathStart::Root,
                steps,
            }));
        }
        if self.starts_step() {
            let steps = self.parse_steps()?;
            return Ok(Expression::Path(LocationPath {
                start: PathStart::Context,
                steps,
            }));
        }

        let base = self.parse_postfix()?;
        if self.check(TokenKind::Slash) || self.check(TokenKind::SlashSlash) {
            let steps = self.parse_step_continuation()?;
            return Ok(Expression::Path(LocationPath {
                start: PathStart::Expression(Box::new(base)),
                steps,
            }));
        }
        Ok(base)
    }

    fn parse_steps(&mut self) -> Result<Vec<Step>, Error> {
        let mut steps = vec![self.parse_step()?];
        steps.extend(self.parse_step_continuation()?);
        Ok(steps)
    }

    fn parse_step_continuation(&mut self) -> Result<Vec<Step>, Error> {
        let mut steps = Vec::new();
        loop {
            if self.eat(TokenKind::SlashSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.parse_step()?);
            } else if self.eat(TokenKind::Slash) {
                steps.push(self.parse_step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    /// A bare name starts a location step unless it is immediately
    /// followed by `(` (function call), `#` (3.0 function reference) or
    /// a constructor brace; kind-test names with `(` are still steps.
    fn starts_step(&self) -> bool {
        match self.kind() {
            Some(TokenKind::At | TokenKind::DotDot | TokenKind::Star | TokenKind::StarColon) => {
                true
            }
            Some(kind) if Self::is_wordish(kind) => {
                let Some(lexeme) = self.word_at(0) else {
                    return false;
                };
                match self.kind_at(1) {
                    Some(TokenKind::LeftParen) => is_kind_test_word(lexeme),
                    Some(TokenKind::Hash) if self.grammar >= XPathVersion::V3_0 => false,
                    Some(TokenKind::LeftBrace)
                        if self.grammar >= XPathVersion::V3_1
                            && (lexeme == "map" || lexeme == "array") =>
                    {
                        false
                    }
                    Some(TokenKind::Colon) if self.kind_at(2).is_some_and(Self::is_wordish) => {
                        // prefix:local followed by '(' or '#' is a call
                        // or reference, not a step.
                        match self.kind_at(3) {
                            Some(TokenKind::LeftParen) => false,
                            Some(TokenKind::Hash) => self.grammar < XPathVersion::V3_0,
                            _ => true,
                        }
                    }
                    _ => true,
                }
            }
            _ => false,
        }
    }

    fn parse_step(&mut self) -> Result<Step, Error> {
        let (axis, node_test) = if self.eat(TokenKind::At) {
            (Axis::Attribute, self.parse_node_test()?)
        } else if self.eat(TokenKind::DotDot) {
            (Axis::Parent, NodeTest::Kind(KindTest::AnyKind))
        } else if self.kind().is_some_and(Self::is_wordish)
            && self.kind_at(1) == Some(TokenKind::ColonColon)
        {
            let name = self.take_name("axis name")?;
            let position = self.peek().map(|t| t.position).unwrap_or(0);
            let axis = Axis::by_name(&name)
                .ok_or_else(|| Error::syntax(format!("unknown axis '{}'", name), position))?;
            self.current += 1;
            (axis, self.parse_node_test()?)
        } else {
            (Axis::Child, self.parse_node_test()?)
        };

        let mut predicates = Vec::new();
        while self.eat(TokenKind::LeftBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(TokenKind::RightBracket, "']'")?;
        }
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, Error> {
        if self.eat(TokenKind::Star) {
            return Ok(NodeTest::Wildcard);
        }
        if self.eat(TokenKind::StarColon) {
            let local = self.take_name("local name after '*:'")?;
            return Ok(NodeTest::LocalWildcard(local));
        }
        if self.kind().is_some_and(Self::is_wordish) {
            let name = self.take_name("node test")?;
            if is_kind_test_word(&name) && self.check(TokenKind::LeftParen) {
                return Ok(NodeTest::Kind(self.parse_kind_test(&name)?));
            }
            if self.eat(TokenKind::ColonStar) {
                return Ok(NodeTest::NamespaceWildcard(name));
            }
            if self.check(TokenKind::Colon) && self.kind_at(1).is_some_and(Self::is_wordish) {
                self.current += 1;
                let local = self.take_name("local name")?;
                return Ok(NodeTest::Name(QName::with_prefix(name, local)));
            }
            return Ok(NodeTest::Name(QName::new(name)));
        }
        match self.peek() {
            Some(token) => Err(Error::syntax(
                format!("expected a node test, found '{}'", token.lexeme),
                token.position,
            )),
            None => Err(self.eof_error("a node test")),
        }
    }

    pub(crate) fn parse_kind_test(&mut self, word: &str) -> Result<KindTest, Error> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let kind = match word {
            "node" => KindTest::AnyKind,
            "text" => KindTest::Text,
            "comment" => KindTest::Comment,
            "document-node" => KindTest::Document,
            "processing-instruction" => {
                let target = if self.check(TokenKind::RightParen) {
                    None
                } else if self.check(TokenKind::StringLiteral) {
                    self.advance().map(|t| t.lexeme)
                } else {
                    Some(self.take_name("processing-instruction target")?)
                };
                KindTest::ProcessingInstruction(target)
            }
            "element" => KindTest::Element(self.parse_optional_name_arg()?),
            "attribute" => KindTest::Attribute(self.parse_optional_name_arg()?),
            other => {
                return Err(Error::syntax(
                    format!("unknown kind test '{}'", other),
                    self.peek().map(|t| t.position).unwrap_or(0),
                ));
            }
        };
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(kind)
    }

    fn parse_optional_name_arg(&mut self) -> Result<Option<QName>, Error> {
        if self.check(TokenKind::RightParen) {
            return Ok(None);
        }
        if self.eat(TokenKind::Star) {
            return Ok(None);
        }
        Ok(Some(self.parse_qname("element or attribute name")?))
    }

    // ----- postfix and primary -----

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let mut base = self.parse_primary()?;
        loop {
            if self.check(TokenKind::LeftBracket) {
                let mut predicates = Vec::new();
                while self.eat(TokenKind::LeftBracket) {
                    predicates.push(self.parse_expr()?);
                    self.expect(TokenKind::RightBracket, "']'")?;
                }
                base = Expression::FilterExpr {
                    base: Box::new(base),
                    predicates,
                };
            } else if self.check(TokenKind::LeftParen) && self.grammar >= XPathVersion::V3_0 {
                let args = self.parse_argument_list()?;
                base = Expression::DynamicFunctionCall {
                    function_expr: Box::new(base),
                    args,
                };
            } else if self.check(TokenKind::Question)
                && self.grammar >= XPathVersion::V3_1
                && self.lookup_key_follows(1)
            {
                self.current += 1;
                let key = self.parse_lookup_key()?;
                base = Expression::LookupExpr {
                    base: Box::new(base),
                    key,
                };
            } else {
                return Ok(base);
            }
        }
    }

    fn lookup_key_follows(&self, offset: usize) -> bool {
        match self.kind_at(offset) {
            Some(TokenKind::Star | TokenKind::IntegerLiteral | TokenKind::LeftParen) => true,
            Some(kind) => Self::is_wordish(kind),
            None => false,
        }
    }

    fn parse_lookup_key(&mut self) -> Result<LookupKey, Error> {
        if self.eat(TokenKind::Star) {
            return Ok(LookupKey::Wildcard);
        }
        if self.check(TokenKind::IntegerLiteral) {
            let token = self.advance().ok_or_else(|| self.eof_error("lookup key"))?;
            let index = token
                .lexeme
                .parse::<i64>()
                .map_err(|_| Error::syntax("integer lookup key out of range", token.position))?;
            return Ok(LookupKey::Integer(index));
        }
        if self.eat(TokenKind::LeftParen) {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::RightParen, "')'")?;
            return Ok(LookupKey::Parenthesized(Box::new(expr)));
        }
        let name = self.take_name("lookup key")?;
        Ok(LookupKey::Name(name))
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expression>, Error> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(TokenKind::RightParen) {
            return Ok(args);
        }
        loop {
            if self.grammar >= XPathVersion::V3_0
                && self.check(TokenKind::Question)
                && matches!(
                    self.kind_at(1),
                    Some(TokenKind::Comma | TokenKind::RightParen)
                )
            {
                self.current += 1;
                args.push(Expression::ArgumentPlaceholder);
            } else {
                args.push(self.parse_expr_single()?);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.eof_error("an expression"));
        };
        match token.kind {
            TokenKind::StringLiteral => {
                self.current += 1;
                Ok(Expression::Literal(Literal::String(token.lexeme)))
            }
            TokenKind::IntegerLiteral => {
                self.current += 1;
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    Error::syntax("integer literal out of range", token.position)
                })?;
                Ok(Expression::Literal(Literal::Integer(value)))
            }
            TokenKind::DecimalLiteral => {
                self.current += 1;
                let value = token.lexeme.parse::<Decimal>().map_err(|_| {
                    Error::syntax("decimal literal out of range", token.position)
                })?;
                Ok(Expression::Literal(Literal::Decimal(value)))
            }
            TokenKind::DoubleLiteral => {
                self.current += 1;
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    Error::syntax("invalid double literal", token.position)
                })?;
                Ok(Expression::Literal(Literal::Double(value)))
            }
            TokenKind::Dollar => {
                self.current += 1;
                let name = self.take_name("variable name")?;
                Ok(Expression::Variable(name))
            }
            TokenKind::Dot => {
                self.current += 1;
                Ok(Expression::ContextItem)
            }
            TokenKind::LeftParen => {
                self.current += 1;
                // Empty parens are the empty-sequence literal; the shared
                // base provides this (and comma sequences) at every
                // grammar level.
                if self.eat(TokenKind::RightParen) {
                    return Ok(Expression::empty_sequence());
                }
                let mut items = vec![self.parse_expr_single()?];
                while self.eat(TokenKind::Comma) {
                    items.push(self.parse_expr_single()?);
                }
                self.expect(TokenKind::RightParen, "')'")?;
                if items.len() == 1 {
                    Ok(items.remove(0))
                } else {
                    Ok(Expression::Sequence(items))
                }
            }
            TokenKind::Question if self.grammar >= XPathVersion::V3_1 => {
                self.current += 1;
                Ok(Expression::UnaryLookup(self.parse_lookup_key()?))
            }
            TokenKind::LeftBracket if self.grammar >= XPathVersion::V3_1 => {
                self.current += 1;
                let mut members = Vec::new();
                if !self.check(TokenKind::RightBracket) {
                    loop {
                        members.push(self.parse_expr_single()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightBracket, "']'")?;
                Ok(Expression::ArrayConstructor(ArrayConstructorKind::Square(
                    members,
                )))
            }
            kind if Self::is_wordish(kind) => self.parse_named_primary(&token.lexeme),
            _ => Err(Error::syntax(
                format!("unexpected token '{}'", token.lexeme),
                token.position,
            )),
        }
    }

    fn parse_named_primary(&mut self, lexeme: &str) -> Result<Expression, Error> {
        if self.grammar >= XPathVersion::V3_1
            && lexeme == "map"
            && self.kind_at(1) == Some(TokenKind::LeftBrace)
        {
            return self.parse_map_constructor();
        }
        if self.grammar >= XPathVersion::V3_1
            && lexeme == "array"
            && self.kind_at(1) == Some(TokenKind::LeftBrace)
        {
            self.current += 2;
            let body = if self.check(TokenKind::RightBrace) {
                Expression::empty_sequence()
            } else {
                self.parse_expr()?
            };
            self.expect(TokenKind::RightBrace, "'}'")?;
            return Ok(Expression::ArrayConstructor(ArrayConstructorKind::Curly(
                Box::new(body),
            )));
        }
        if self.grammar >= XPathVersion::V3_0
            && lexeme == "function"
            && self.kind_at(1) == Some(TokenKind::LeftParen)
        {
            return self.parse_inline_function();
        }

        let name = self.parse_qname("a function name")?;
        if self.grammar >= XPathVersion::V3_0 && self.check(TokenKind::Hash) {
            self.current += 1;
            let token = self.expect(TokenKind::IntegerLiteral, "an arity")?;
            let arity = token
                .lexeme
                .parse::<usize>()
                .map_err(|_| Error::syntax("arity out of range", token.position))?;
            return Ok(Expression::NamedFunctionRef { name, arity });
        }
        if self.check(TokenKind::LeftParen) {
            let args = self.parse_argument_list()?;
            return Ok(Expression::FunctionCall { name, args });
        }
        match self.peek() {
            Some(token) => Err(Error::syntax(
                format!("unexpected token '{}'", token.lexeme),
                token.position,
            )),
            None => Err(self.eof_error("'('")),
        }
    }

    fn parse_map_constructor(&mut self) -> Result<Expression, Error> {
        self.current += 2; // 'map' '{'
        let mut entries = Vec::new();
        if !self.check(TokenKind::RightBrace) {
            loop {
                let key = self.parse_expr_single()?;
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.parse_expr_single()?;
                entries.push(MapEntry {
                    key: Box::new(key),
                    value: Box::new(value),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(Expression::MapConstructor(entries))
    }

    fn parse_inline_function(&mut self) -> Result<Expression, Error> {
        self.current += 1; // 'function'
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expect(TokenKind::Dollar, "'$'")?;
                let name = self.take_name("parameter name")?;
                let type_decl = if self.eat_word("as") {
                    Some(self.parse_sequence_type()?)
                } else {
                    None
                };
                params.push(Param { name, type_decl });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        let return_type = if self.eat_word("as") {
            Some(self.parse_sequence_type()?)
        } else {
            None
        };
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let body = if self.check(TokenKind::RightBrace) {
            Expression::empty_sequence()
        } else {
            self.parse_expr()?
        };
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(Expression::InlineFunction {
            params,
            return_type,
            body: Box::new(body),
        })
    }
}

fn is_kind_test_word(word: &str) -> bool {
    matches!(
        word,
        "node" | "text" | "comment" | "processing-instruction" | "document-node" | "element"
            | "attribute"
    )
}
