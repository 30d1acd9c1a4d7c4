// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fixed-point resolution of named types across schema definition files.
//!
//! No dependency graph is built. Each file is simply parsed against the types known so
//! far; a file that fails is held back and retried after any other file succeeds. The
//! run ends when the work queue drains, and whatever is still held at that point can
//! never be resolved (an undefined name, or files that need each other's types).

use crate::*;

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info, warn};
use thiserror::Error;

mod file_state;
mod processing;
mod type_state;

pub use file_state::{FileId, FileState};
pub use processing::ProcessingState;
pub use type_state::TypeState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("could not resolve {count} schema definition file(s):\n{report}")]
    Unresolved { count: usize, report: String },
}

/// Drives a [`ProcessingState`] to completion with a [`SchemaParser`].
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver<P> {
    parser: P,
}

impl<P: SchemaParser> SchemaResolver<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Resolve `sources`, initially attempted in the given order.
    pub fn resolve<I>(&self, sources: I) -> Resolution<P::Definition>
    where
        I: IntoIterator<Item = Source>,
    {
        let files = sources.into_iter().map(|source| {
            let declared = self.parser.declared_type_names(&source);
            FileState::new(source, declared)
        });
        let mut state = ProcessingState::new(files);
        let mut imports: Vec<Option<TypeBindings<P::Definition>>> =
            (0..state.len()).map(|_| None).collect();
        let mut attempts = 0;

        while let Some(id) = state.next_pending() {
            attempts += 1;
            let bindings = state.determine_usable_types(id);
            let source = state.file(id).source().clone();

            match self.parser.parse(&source, &bindings) {
                Ok(new_types) => {
                    debug!("{source}: defines {} type(s)", new_types.len());
                    imports[id.index()] = Some(bindings);
                    state.commit_new_definitions(id, new_types);
                }
                Err(err) => {
                    debug!("{source}: deferred: {err}");
                    state.record_error(id, err);
                    state.defer(id);
                }
            }
        }

        let (files, types, failed) = state.into_parts();
        info!(
            "resolved {} type(s) from {} of {} file(s) in {attempts} attempt(s)",
            types.len(),
            files.len() - failed.len(),
            files.len(),
        );
        for id in &failed {
            let file = &files[id.index()];
            match file.last_error() {
                Some(err) => warn!("{}: unresolved: {err}", file.source()),
                None => warn!("{}: unresolved", file.source()),
            }
        }

        Resolution {
            files,
            types,
            imports,
            failed,
            attempts,
        }
    }
}

/// Outcome of a resolution run.
#[derive(Debug, Clone)]
pub struct Resolution<D> {
    files: Vec<FileState>,
    types: BTreeMap<Rc<str>, TypeState<D>>,
    imports: Vec<Option<TypeBindings<D>>>,
    failed: Vec<FileId>,
    attempts: usize,
}

impl<D> Resolution<D> {
    /// The final type registry.
    pub fn types(&self) -> &BTreeMap<Rc<str>, TypeState<D>> {
        &self.types
    }

    pub fn definition(&self, name: &str) -> Option<&D> {
        self.types.get(name).map(TypeState::definition)
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileState)> + '_ {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, file)| (FileId(idx), file))
    }

    /// `None` if `id` does not belong to this run.
    pub fn file(&self, id: FileId) -> Option<&FileState> {
        self.files.get(id.0)
    }

    /// The bindings file `id` was successfully parsed against. `None` for failed files.
    pub fn imports(&self, id: FileId) -> Option<&TypeBindings<D>> {
        self.imports.get(id.0).and_then(Option::as_ref)
    }

    /// Files that could not be resolved, in the order they were last held.
    pub fn failed_files(&self) -> impl Iterator<Item = &FileState> + '_ {
        self.failed.iter().map(|id| &self.files[id.0])
    }

    pub fn failed_ids(&self) -> &[FileId] {
        &self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of parse attempts performed, including retries.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// One entry per failed file with its last error. For an undefined name, the files
    /// that declare it are listed too.
    pub fn report(&self) -> String {
        let mut report = String::new();
        for file in self.failed_files() {
            report.push_str(&match file.last_error() {
                Some(err) => format!("* {}: {err}\n", file.source()),
                None => format!("* {}\n", file.source()),
            });

            let Some(name) = file.last_error().and_then(ParseError::unresolved_name) else {
                continue;
            };
            let candidates: Vec<&str> = self
                .files
                .iter()
                .filter(|f| f.declared_type_names().contains(name))
                .map(|f| f.source().file())
                .collect();
            report.push_str(&if candidates.is_empty() {
                format!("  '{name}' is not declared by any input file\n")
            } else {
                format!("  '{name}' is declared in: {}\n", candidates.join(", "))
            });
        }
        report
    }

    pub fn into_result(self) -> Result<Self, ResolveError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ResolveError::Unresolved {
                count: self.failed.len(),
                report: self.report(),
            })
        }
    }
}

/// Read the schema files at `paths` and resolve them with a [`JsonSchemaParser`].
pub fn resolve_files<I, P>(paths: I) -> anyhow::Result<Resolution<Schema>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let sources = paths
        .into_iter()
        .map(Source::from_file)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let resolver = SchemaResolver::new(JsonSchemaParser::new());
    Ok(resolver.resolve(sources))
}
