// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod options;
mod parser;
mod resolver;
mod schema;
mod source;

#[cfg(feature = "arc")]
pub use std::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub use std::rc::Rc;

pub use options::{CompilerOptions, DateTimeLogicalType, FieldVisibility, OptionsError, StringType};
pub use parser::{JsonSchemaParser, ParseError, SchemaParser, TypeBindings};
pub use resolver::{
    resolve_files, FileId, FileState, ProcessingState, Resolution, ResolveError, SchemaResolver,
    TypeState,
};
pub use schema::{Field, FieldOrder, LogicalType, Name, Primitive, Properties, Schema, Type};
pub use source::Source;

#[cfg(test)]
mod tests;
