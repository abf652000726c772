//! MaxRegel errors

use anyhow::Result;
use thiserror::Error;

/// MaxRegel errors.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Argument '{0}' is missing")]
    MissingArgument(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Wildcard rules are not supported when using backward chaining")]
    WildcardBackwardChaining,
    #[error("Variable {0} is already defined in the ruleset. Backward chaining does not support multiple rules for the same variable")]
    DuplicateDefinition(String),
    #[error("Max iterations reached: {0}")]
    MaxIterationsReached(usize),
    #[error("Maximum number of epochs exceeded: {0}")]
    EpochBudgetExceeded(usize),
    #[error("Comparison uses a rule to compare to, but did not bind() first: {0}")]
    UnboundDynamicValue(String),
    #[error("Unsupported rule function name: {0}")]
    UnsupportedRule(String),
    #[error("Unsupported predicate function name: {0}")]
    UnsupportedPredicate(String),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Malformed AST for {0}: {1}")]
    MalformedAst(String, String),
    #[error("Assert failed: {0}")]
    AssertionFailed(String),
}

pub fn error<T>(err: impl std::error::Error + Send + Sync + 'static) -> Result<T> {
    Err(err.into())
}
