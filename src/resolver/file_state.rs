// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::TypeState;
use crate::{ParseError, Rc, Source, TypeBindings};

use std::collections::{BTreeMap, BTreeSet};

/// Handle to a file tracked by a [`ProcessingState`](super::ProcessingState). Only
/// meaningful for the state, or the resulting `Resolution`, that handed it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub(crate) usize);

impl FileId {
    /// Position of the file in the input order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Processing record for one schema definition file.
#[derive(Debug, Clone)]
pub struct FileState {
    source: Source,
    declared_type_names: BTreeSet<Rc<str>>,
    duplicate_type_names: BTreeSet<Rc<str>>,
    last_error: Option<ParseError>,
}

impl FileState {
    /// `declared` lists every named type declaration in the file, with repeats.
    /// Names that occur more than once become the file's duplicate type names.
    pub fn new<I>(source: Source, declared: I) -> Self
    where
        I: IntoIterator<Item = Rc<str>>,
    {
        let mut declared_type_names = BTreeSet::new();
        let mut duplicate_type_names = BTreeSet::new();
        for name in declared {
            if !declared_type_names.insert(name.clone()) {
                duplicate_type_names.insert(name);
            }
        }

        Self {
            source,
            declared_type_names,
            duplicate_type_names,
            last_error: None,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn declared_type_names(&self) -> &BTreeSet<Rc<str>> {
        &self.declared_type_names
    }

    pub fn duplicate_type_names(&self) -> &BTreeSet<Rc<str>> {
        &self.duplicate_type_names
    }

    pub fn last_error(&self) -> Option<&ParseError> {
        self.last_error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    /// Bindings this file may be parsed against: every registered type except those the
    /// file itself declares more than once. Such names must be resolved from the file's
    /// own content.
    pub fn usable_bindings<D: Clone>(
        &self,
        types: &BTreeMap<Rc<str>, TypeState<D>>,
    ) -> TypeBindings<D> {
        types
            .iter()
            .filter(|(name, _)| !self.duplicate_type_names.contains(*name))
            .map(|(name, state)| (name.clone(), state.definition().clone()))
            .collect()
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn record_error(&mut self, error: ParseError) {
        self.last_error = Some(error);
    }
}
