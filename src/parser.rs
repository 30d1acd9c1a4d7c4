// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Rc, Source};

use std::collections::BTreeMap;

mod error;
mod json;

pub use error::ParseError;
pub use json::JsonSchemaParser;

/// Type name to definition.
pub type TypeBindings<D> = BTreeMap<Rc<str>, D>;

/// Parses one schema definition file against a set of already resolved types.
///
/// The resolver treats any `Err` as "not parsable yet": the file is set aside and
/// retried whenever some other file contributes new definitions.
pub trait SchemaParser {
    type Definition: Clone;

    /// Every named type the file declares, in document order. A name declared more
    /// than once appears more than once. No references are resolved.
    fn declared_type_names(&self, source: &Source) -> Vec<Rc<str>>;

    /// Parse `source` assuming every binding in `known` is resolved. Returns the types
    /// the file itself defines.
    fn parse(
        &self,
        source: &Source,
        known: &TypeBindings<Self::Definition>,
    ) -> Result<TypeBindings<Self::Definition>, ParseError>;
}

impl<P: SchemaParser + ?Sized> SchemaParser for &P {
    type Definition = P::Definition;

    fn declared_type_names(&self, source: &Source) -> Vec<Rc<str>> {
        (**self).declared_type_names(source)
    }

    fn parse(
        &self,
        source: &Source,
        known: &TypeBindings<Self::Definition>,
    ) -> Result<TypeBindings<Self::Definition>, ParseError> {
        (**self).parse(source, known)
    }
}
