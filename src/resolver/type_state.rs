// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Rc, Source};

/// The latest known definition of one named type and the file that supplied it.
#[derive(Debug, Clone)]
pub struct TypeState<D> {
    name: Rc<str>,
    defining_file: Source,
    definition: D,
}

impl<D> TypeState<D> {
    pub fn new(name: Rc<str>, defining_file: Source, definition: D) -> Self {
        Self {
            name,
            defining_file,
            definition,
        }
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn defining_file(&self) -> &Source {
        &self.defining_file
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    /// Record a definition of this type. A later definition always replaces an earlier
    /// one, together with its source.
    pub fn process_definition(&mut self, source: &Source, definition: D) {
        self.defining_file = source.clone();
        self.definition = definition;
    }
}
