//! The per-node validation hook.
//!
//! A validator sees every element as it closes, together with an XPath-like
//! location (`/root/child/leaf`) and whatever value the parent already holds
//! under the same name (`Some` for the second and later siblings). It returns
//! the value to store, which may be the input unchanged, a coerced scalar or a
//! completely different structure. Returning an error aborts the parse.

use thiserror::Error;

use crate::value::Value;

/// Error raised by a validator. The message reaches the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a validation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the validator's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Validates and optionally transforms each closed element.
pub trait Validator: Send + Sync {
    /// Returns the value to store for the element at `xpath`.
    fn validate(
        &self,
        xpath: &str,
        current: Option<&Value>,
        new_value: Value,
    ) -> Result<Value, ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&str, Option<&Value>, Value) -> Result<Value, ValidationError> + Send + Sync,
{
    fn validate(
        &self,
        xpath: &str,
        current: Option<&Value>,
        new_value: Value,
    ) -> Result<Value, ValidationError> {
        self(xpath, current, new_value)
    }
}

/// Builds the location string for an element closing under `ancestors`.
pub fn xpath<'a>(ancestors: impl IntoIterator<Item = &'a str>, name: &str) -> String {
    let mut path = String::new();
    for ancestor in ancestors {
        path.push('/');
        path.push_str(ancestor);
    }
    path.push('/');
    path.push_str(name);
    path
}
