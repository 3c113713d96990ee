use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown atomic type '{0}'")]
    UnknownType(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Cannot cast {from} to {to}: {reason}")]
    Cast {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Cannot atomize {0}")]
    Atomization(String),

    #[error("Cardinality error: expected {expected}, got {actual} items")]
    Cardinality { expected: String, actual: usize },

    #[error("Variable '${0}' not found")]
    UnknownVariable(String),

    #[error("Unknown function '{name}' with arity {arity}")]
    UnknownFunction { name: String, arity: usize },

    #[error("Function '{function}' error: {message}")]
    Function { function: String, message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Context item is required but not set")]
    NoContextItem,

    #[error("Array index {index} out of bounds (size: {size})")]
    ArrayIndexOutOfBounds { index: i64, size: usize },

    #[error("Dynamic error: {0}")]
    Dynamic(String),
}

impl Error {
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn cast(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Cast {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    pub fn dynamic(message: impl Into<String>) -> Self {
        Self::Dynamic(message.into())
    }

    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            function: function.into(),
            message: message.into(),
        }
    }
}
