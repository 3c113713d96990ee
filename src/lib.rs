//! XPath expression engine: tokenizer, version-layered parser (1.0
//! through 3.1) and an evaluator over the full XDM type system.
//!
//! One [`Parser`] implements the whole grammar; its grammar level selects
//! which productions are active, so a 1.0 parser and a 3.1 parser share
//! every precedence level they have in common. Evaluation runs against
//! any document representation implementing [`XdmNode`].
//!
//! # Key Types
//!
//! - [`Parser`] / [`CompiledXPath`]: compile an expression once, evaluate
//!   it many times
//! - [`XdmValue`]: a sequence of nodes, atomics, maps, arrays and
//!   function items
//! - [`EvaluationContext`]: everything an evaluation can observe
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use oxipath::{EvaluationContext, Parser, ParserOptions, XPathVersion};
//!
//! let options = ParserOptions::new().with_version(XPathVersion::V3_1);
//! let compiled = Parser::new(options)?.parse("for $i in 1 to 3 return $i * 2")?;
//!
//! let variables = HashMap::new();
//! let ctx: EvaluationContext<'_, '_, oxipath::node::tests::MockNode<'_>> =
//!     EvaluationContext::new(None, None, &variables);
//! let result = compiled.evaluate(&ctx)?;
//! assert_eq!(result.len(), 3);
//! # Ok::<(), oxipath::Error>(())
//! ```

pub mod ast;
pub mod atomize;
pub mod engine;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod node;
pub mod operators;
pub mod parser;
pub mod promote;
pub mod types;

pub use ast::{Expression, QName};
pub use atomize::{AtomizeMode, atomize_single, atomize_value};
pub use engine::{EvaluationContext, evaluate};
pub use error::Error;
pub use functions::{ExtensionFunction, ExtensionRegistry};
pub use lexer::{Token, TokenKind, tokenize};
pub use node::{NodeKind, NodeName, XdmNode};
pub use parser::{CompiledXPath, Parser, ParserOptions, XPathVersion};
pub use promote::PromotionContext;
pub use types::{
    AtomicType, AtomicValue, ItemType, Occurrence, SequenceType, XdmArray, XdmFunction, XdmItem,
    XdmMap, XdmValue, matches_sequence_type,
};
