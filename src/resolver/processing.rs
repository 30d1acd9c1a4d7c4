// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{FileId, FileState, TypeState};
use crate::{ParseError, Rc, TypeBindings};

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, VecDeque};

use indexmap::IndexSet;
use log::debug;

/// State of one resolution run.
///
/// Every file is in exactly one of three places: the work queue, the holding set, or
/// neither (finished). Files start in the work queue in input order. A file whose parse
/// fails moves to the holding set; any successful parse moves the whole holding set
/// back to the end of the queue, since the new definitions may be what the held files
/// were missing. When the queue is empty the holding set is final.
#[derive(Debug, Clone)]
pub struct ProcessingState<D> {
    files: Vec<FileState>,
    types: BTreeMap<Rc<str>, TypeState<D>>,
    queue: VecDeque<FileId>,
    held: IndexSet<FileId>,
}

impl<D: Clone> ProcessingState<D> {
    pub fn new<I>(files: I) -> Self
    where
        I: IntoIterator<Item = FileState>,
    {
        let files: Vec<FileState> = files.into_iter().collect();
        let queue = (0..files.len()).map(FileId).collect();
        Self {
            files,
            types: BTreeMap::new(),
            queue,
            held: IndexSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file behind `id`.
    ///
    /// # Panics
    ///
    /// Ids are only meaningful for the state that handed them out. Every method taking
    /// a [`FileId`] panics if `id` came from a different state.
    pub fn file(&self, id: FileId) -> &FileState {
        &self.files[id.0]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileState)> + '_ {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, file)| (FileId(idx), file))
    }

    /// The type registry.
    pub fn types(&self) -> &BTreeMap<Rc<str>, TypeState<D>> {
        &self.types
    }

    /// Bindings to parse file `id` against, taken from the current registry.
    pub fn determine_usable_types(&self, id: FileId) -> TypeBindings<D> {
        self.file(id).usable_bindings(&self.types)
    }

    /// Register the types a successful parse of `id` produced, then requeue every held
    /// file.
    pub fn commit_new_definitions(&mut self, id: FileId, new_types: TypeBindings<D>) {
        let file = &mut self.files[id.0];
        let source = file.source().clone();
        for (name, definition) in new_types {
            match self.types.entry(name) {
                Entry::Occupied(mut e) => e.get_mut().process_definition(&source, definition),
                Entry::Vacant(e) => {
                    let name = e.key().clone();
                    e.insert(TypeState::new(name, source.clone(), definition));
                }
            }
        }
        file.clear_error();

        if !self.held.is_empty() {
            debug!(
                "{source}: requeueing {} held file(s) for another attempt",
                self.held.len()
            );
            self.queue.extend(self.held.drain(..));
        }
    }

    pub fn record_error(&mut self, id: FileId, error: ParseError) {
        self.files[id.0].record_error(error);
    }

    /// Append `id` to the end of the work queue.
    pub fn enqueue(&mut self, id: FileId) {
        debug_assert!(!self.held.contains(&id), "file is already held");
        self.queue.push_back(id);
    }

    /// Hold `id` until the registry changes. Returns false if it was already held, in
    /// which case nothing changes.
    pub fn defer(&mut self, id: FileId) -> bool {
        debug_assert!(!self.queue.contains(&id), "file is still queued");
        self.held.insert(id)
    }

    pub fn next_pending(&mut self) -> Option<FileId> {
        self.queue.pop_front()
    }

    /// Whether the work queue is non-empty. Held files do not count.
    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn queued(&self) -> impl Iterator<Item = FileId> + '_ {
        self.queue.iter().copied()
    }

    pub fn held(&self) -> impl Iterator<Item = FileId> + '_ {
        self.held.iter().copied()
    }

    /// Files whose latest attempt failed. Once there is no pending work these are the
    /// files that can never be resolved.
    pub fn failed_files(&self) -> impl Iterator<Item = &FileState> + '_ {
        self.held.iter().map(|id| &self.files[id.0])
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<FileState>,
        BTreeMap<Rc<str>, TypeState<D>>,
        Vec<FileId>,
    ) {
        (self.files, self.types, self.held.into_iter().collect())
    }
}
