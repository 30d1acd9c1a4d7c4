// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;
use thiserror::Error;

/// Why a schema definition file could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The file is not well-formed JSON. The message points at the offending location.
    #[error("{message}")]
    Syntax { message: String },
    /// A referenced type is neither defined earlier in the file nor among the known types.
    #[error("undefined name: {name}")]
    UnresolvedReference { name: Rc<str> },
    /// The file declares the same name twice with different definitions.
    #[error("can't redefine: {name}")]
    ConflictingDefinition { name: Rc<str> },
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl ParseError {
    /// The missing type name, if this error is an unresolved reference.
    pub fn unresolved_name(&self) -> Option<&Rc<str>> {
        match self {
            ParseError::UnresolvedReference { name } => Some(name),
            _ => None,
        }
    }
}
