//! Restricted boolean expressions over the configuration tree
//!
//! Conditions in command templates are small expressions such as
//! `enabled && attachState.backend && project === "demo"`. They are tokenized,
//! parsed into a tree and evaluated against a [`Context`] built from the
//! configuration. There are no function calls, assignments or side effects.
//!
//! Evaluation is fail-closed: a syntax error, an unresolvable reference or a
//! property read through `undefined` makes the whole condition `false`. So does
//! nesting deeper than 64 levels.

use log::debug;
use thiserror::Error;

use crate::sections::{AttachState, ConfigTree, DropdownValues};

pub mod context;
mod eval;
mod lexer;
mod parser;

pub use context::{Context, build_context};
pub(crate) use eval::strict_equals;

/// Reasons a condition could not be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("unexpected character `{0}` at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("`{0}` is not defined")]
    Unresolved(String),
    #[error("cannot read properties of `{0}`")]
    NotAnObject(String),
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Evaluate an expression against an already built context.
///
/// # Errors
///
/// Returns `ExprError` on malformed syntax or an unresolvable reference.
pub fn try_evaluate(expr: &str, context: &Context) -> Result<bool, ExprError> {
    let tree = parser::parse(lexer::tokenize(expr)?)?;
    let value = eval::eval(&tree, context)?;
    Ok(eval::is_truthy(value.as_ref()))
}

/// Evaluate `expr` for the section (or sub-section) `section_id`. Never fails: errors yield `false`.
#[must_use]
pub fn evaluate(
    expr: &str,
    config: &ConfigTree,
    section_id: &str,
    attach_state: &AttachState,
    dropdowns: &DropdownValues,
) -> bool {
    let context = build_context(section_id, config, attach_state, dropdowns);
    match try_evaluate(expr, &context) {
        Ok(result) => result,
        Err(e) => {
            debug!("Condition `{expr}` for '{section_id}' evaluated to false: {e}");
            false
        }
    }
}

/// Borrowed view of everything a condition can see
#[derive(Debug, Clone, Copy)]
pub struct EvalInputs<'a> {
    pub config: &'a ConfigTree,
    pub attach_state: &'a AttachState,
    pub dropdowns: &'a DropdownValues,
}

impl<'a> EvalInputs<'a> {
    #[must_use]
    pub fn new(
        config: &'a ConfigTree,
        attach_state: &'a AttachState,
        dropdowns: &'a DropdownValues,
    ) -> Self {
        Self {
            config,
            attach_state,
            dropdowns,
        }
    }

    #[must_use]
    pub fn evaluate(&self, expr: &str, section_id: &str) -> bool {
        evaluate(
            expr,
            self.config,
            section_id,
            self.attach_state,
            self.dropdowns,
        )
    }

    /// An absent condition always holds
    #[must_use]
    pub fn holds(&self, condition: Option<&str>, section_id: &str) -> bool {
        condition.is_none_or(|expr| self.evaluate(expr, section_id))
    }
}
