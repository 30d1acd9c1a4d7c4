// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)] // resolver tests unwrap/panic to assert outcomes

use crate::*;

use core::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::Result;

mod suite;

/// One stub file: the types it defines (name, definition tag) and the names it uses.
#[derive(Default)]
struct StubFile {
    defines: Vec<(&'static str, &'static str)>,
    uses: Vec<&'static str>,
}

/// Parser over stub files keyed by file name. Records every attempt and the bindings
/// each attempt was offered.
#[derive(Default)]
struct StubParser {
    files: BTreeMap<&'static str, StubFile>,
    attempts: RefCell<Vec<String>>,
    offered: RefCell<Vec<(String, Vec<String>)>>,
}

impl StubParser {
    fn file(
        mut self,
        name: &'static str,
        defines: &[(&'static str, &'static str)],
        uses: &[&'static str],
    ) -> Self {
        self.files.insert(
            name,
            StubFile {
                defines: defines.to_vec(),
                uses: uses.to_vec(),
            },
        );
        self
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.borrow().clone()
    }
}

impl SchemaParser for StubParser {
    type Definition = Rc<str>;

    fn declared_type_names(&self, source: &Source) -> Vec<Rc<str>> {
        self.files[source.file()]
            .defines
            .iter()
            .map(|(name, _)| Rc::from(*name))
            .collect()
    }

    fn parse(
        &self,
        source: &Source,
        known: &TypeBindings<Rc<str>>,
    ) -> Result<TypeBindings<Rc<str>>, ParseError> {
        self.attempts.borrow_mut().push(source.file().to_string());
        self.offered.borrow_mut().push((
            source.file().to_string(),
            known.keys().map(|k| k.to_string()).collect(),
        ));

        let file = &self.files[source.file()];
        for name in &file.uses {
            let local = file.defines.iter().any(|(n, _)| n == name);
            if !local && !known.contains_key(*name) {
                return Err(ParseError::UnresolvedReference {
                    name: Rc::from(*name),
                });
            }
        }

        Ok(file
            .defines
            .iter()
            .map(|(name, definition)| (Rc::from(*name), Rc::from(*definition)))
            .collect())
    }
}

fn sources(names: &[&str]) -> Vec<Source> {
    names
        .iter()
        .map(|name| Source::from_contents(*name, ""))
        .collect()
}

fn failed_names<D>(resolution: &Resolution<D>) -> Vec<String> {
    resolution
        .failed_files()
        .map(|f| f.source().file().to_string())
        .collect()
}

fn type_names<D>(resolution: &Resolution<D>) -> Vec<String> {
    resolution.types().keys().map(|k| k.to_string()).collect()
}

fn xyz() -> StubParser {
    StubParser::default()
        .file("x", &[("foo", "x:foo")], &[])
        .file("y", &[("bar", "y:bar")], &["foo"])
        .file("z", &[("baz", "z:baz")], &["bar"])
}

#[test]
fn independent_files_resolve_on_first_attempt() {
    let parser = StubParser::default()
        .file("a", &[("A", "a:A")], &[])
        .file("b", &[("B", "b:B")], &[])
        .file("c", &[("C", "c:C")], &[]);
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["a", "b", "c"]));

    assert!(resolution.is_success());
    assert_eq!(resolution.attempts(), 3);
    assert_eq!(parser.attempts(), ["a", "b", "c"]);
    assert_eq!(type_names(&resolution), ["A", "B", "C"]);
}

#[test]
fn resolution_is_order_independent() {
    let make = || {
        StubParser::default()
            .file("a", &[("T", "a:T")], &[])
            .file("b", &[("U", "b:U")], &["T"])
    };

    let forward = make();
    let forward = SchemaResolver::new(&forward).resolve(sources(&["a", "b"]));
    let backward = make();
    let backward = SchemaResolver::new(&backward).resolve(sources(&["b", "a"]));

    for resolution in [&forward, &backward] {
        assert!(resolution.is_success());
        assert_eq!(type_names(resolution), ["T", "U"]);
        assert_eq!(resolution.definition("T").map(|d| d.as_ref()), Some("a:T"));
        assert_eq!(resolution.definition("U").map(|d| d.as_ref()), Some("b:U"));
    }
    assert_eq!(forward.attempts(), 2);
    assert_eq!(backward.attempts(), 3);
}

#[test]
fn mutual_dependency_fails_both_files() {
    let parser = StubParser::default()
        .file("a", &[("A", "a:A")], &["B"])
        .file("b", &[("B", "b:B")], &["A"])
        .file("c", &[("C", "c:C")], &[]);
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["a", "b", "c"]));

    assert!(!resolution.is_success());
    assert_eq!(failed_names(&resolution), ["a", "b"]);
    assert_eq!(type_names(&resolution), ["C"]);
    // a and b are retried once after c succeeds, then the queue drains.
    assert_eq!(parser.attempts(), ["a", "b", "c", "a", "b"]);

    let a = resolution.failed_files().next().unwrap();
    assert_eq!(
        a.last_error(),
        Some(&ParseError::UnresolvedReference { name: "B".into() })
    );
}

#[test]
fn undefined_name_is_reported_with_last_error() {
    let parser = StubParser::default()
        .file("a", &[("A", "a:A")], &["Missing"])
        .file("b", &[("B", "b:B")], &[]);
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["a", "b"]));

    assert_eq!(failed_names(&resolution), ["a"]);
    let report = resolution.report();
    assert!(report.contains("* a: undefined name: Missing"), "{report}");
    assert!(
        report.contains("'Missing' is not declared by any input file"),
        "{report}"
    );

    match resolution.into_result() {
        Err(ResolveError::Unresolved { count, .. }) => assert_eq!(count, 1),
        Ok(_) => panic!("expected failure"),
    }
}

#[test]
fn report_names_candidate_files() {
    let parser = StubParser::default()
        .file("a", &[("A", "a:A")], &["B"])
        .file("b", &[("B", "b:B")], &["A"]);
    let report = SchemaResolver::new(&parser)
        .resolve(sources(&["a", "b"]))
        .report();

    assert!(report.contains("'B' is declared in: b"), "{report}");
    assert!(report.contains("'A' is declared in: a"), "{report}");
}

#[test]
fn report_lists_each_failed_file_with_its_error() {
    let parser = StubParser::default()
        .file("a", &[("A", "a:A")], &["Missing"])
        .file("b", &[("B", "b:B")], &["A"]);
    let report = SchemaResolver::new(&parser)
        .resolve(sources(&["a", "b"]))
        .report();

    assert_eq!(
        report,
        "* a: undefined name: Missing\n\
         \x20 'Missing' is not declared by any input file\n\
         * b: undefined name: A\n\
         \x20 'A' is declared in: a\n"
    );
}

#[test]
fn file_ids_from_another_run_are_not_found() {
    let parser = StubParser::default()
        .file("a", &[("A", "a:A")], &[])
        .file("b", &[("B", "b:B")], &[])
        .file("c", &[("C", "c:C")], &[]);
    let small = SchemaResolver::new(&parser).resolve(sources(&["a"]));
    let large = SchemaResolver::new(&parser).resolve(sources(&["a", "b", "c"]));

    let (own, _) = small.files().next().unwrap();
    assert_eq!(small.file(own).map(|f| f.source().file()), Some("a"));

    let (foreign, _) = large.files().last().unwrap();
    assert!(small.file(foreign).is_none());
    assert!(small.imports(foreign).is_none());
    assert_eq!(large.file(foreign).map(|f| f.source().file()), Some("c"));
}

#[test]
fn later_definition_replaces_earlier_one() {
    let parser = StubParser::default()
        .file("a", &[("T", "a:T")], &[])
        .file("b", &[("T", "b:T")], &[]);
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["a", "b"]));

    assert!(resolution.is_success());
    assert_eq!(resolution.types().len(), 1);
    let t = &resolution.types()["T"];
    assert_eq!(t.name().as_ref(), "T");
    assert_eq!(t.definition().as_ref(), "b:T");
    assert_eq!(t.defining_file().file(), "b");
}

#[test]
fn xyz_in_dependency_order() {
    let parser = xyz();
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["x", "y", "z"]));

    assert!(resolution.is_success());
    assert_eq!(parser.attempts(), ["x", "y", "z"]);
    assert_eq!(type_names(&resolution), ["bar", "baz", "foo"]);
}

#[test]
fn xyz_in_reverse_dependency_order() {
    let parser = xyz();
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["y", "z", "x"]));

    assert!(resolution.is_success());
    // y and z are held, x succeeds and requeues both, then both succeed in order.
    assert_eq!(parser.attempts(), ["y", "z", "x", "y", "z"]);
    assert_eq!(type_names(&resolution), ["bar", "baz", "foo"]);
    assert_eq!(resolution.types()["bar"].defining_file().file(), "y");
}

#[test]
fn imports_record_the_bindings_of_the_successful_attempt() {
    let parser = xyz();
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["y", "z", "x"]));

    let imports = |idx: usize| -> Vec<String> {
        let (id, _) = resolution.files().nth(idx).unwrap();
        resolution
            .imports(id)
            .unwrap()
            .keys()
            .map(|k| k.to_string())
            .collect()
    };
    assert_eq!(imports(0), ["foo"]);
    assert_eq!(imports(1), ["bar", "foo"]);
    assert!(imports(2).is_empty());
}

#[test]
fn duplicate_names_are_never_offered() {
    let parser = StubParser::default()
        .file("a", &[("T", "a:T")], &[])
        .file("b", &[("T", "b:T1"), ("T", "b:T2"), ("U", "b:U")], &[]);
    let resolution = SchemaResolver::new(&parser).resolve(sources(&["a", "b"]));

    assert!(resolution.is_success());
    let offered = parser.offered.borrow();
    assert_eq!(offered[1], ("b".to_string(), vec![]));

    let (_, b) = resolution.files().nth(1).unwrap();
    assert_eq!(
        b.duplicate_type_names().iter().map(|n| n.as_ref()).collect::<Vec<_>>(),
        ["T"]
    );
}

#[test]
fn empty_input() {
    let parser = StubParser::default();
    let resolution = SchemaResolver::new(&parser).resolve(Vec::<Source>::new());

    assert!(resolution.is_success());
    assert_eq!(resolution.attempts(), 0);
    assert!(resolution.types().is_empty());
}

fn state_with(names: &[&str]) -> ProcessingState<Rc<str>> {
    ProcessingState::new(
        sources(names)
            .into_iter()
            .map(|source| FileState::new(source, Vec::new())),
    )
}

#[test]
fn state_starts_with_every_file_queued() {
    let state = state_with(&["a", "b", "c"]);
    assert!(state.has_pending_work());
    assert_eq!(
        state.queued().map(FileId::index).collect::<Vec<_>>(),
        [0, 1, 2]
    );
    assert_eq!(state.held().count(), 0);
}

#[test]
fn next_pending_is_fifo() {
    let mut state = state_with(&["a", "b"]);
    let a = state.next_pending().unwrap();
    let b = state.next_pending().unwrap();
    assert_eq!((a.index(), b.index()), (0, 1));
    assert!(state.next_pending().is_none());
    assert!(!state.has_pending_work());

    state.enqueue(b);
    assert_eq!(state.next_pending(), Some(b));
}

#[test]
fn defer_is_idempotent() {
    let mut state = state_with(&["a", "b", "c"]);
    let a = state.next_pending().unwrap();
    let b = state.next_pending().unwrap();

    assert!(state.defer(b));
    assert!(state.defer(a));
    assert!(!state.defer(b));

    assert_eq!(state.held().collect::<Vec<_>>(), [b, a]);
    assert_eq!(state.queued().map(FileId::index).collect::<Vec<_>>(), [2]);
}

#[test]
fn held_files_do_not_count_as_pending_work() {
    let mut state = state_with(&["a"]);
    let a = state.next_pending().unwrap();
    state.record_error(a, ParseError::UnresolvedReference { name: "T".into() });
    state.defer(a);

    assert!(!state.has_pending_work());
    let failed: Vec<_> = state.failed_files().map(|f| f.source().file()).collect();
    assert_eq!(failed, ["a"]);
    assert!(state.file(a).has_error());
}

#[test]
fn commit_requeues_held_files_in_holding_order() -> Result<()> {
    let mut state = state_with(&["a", "b", "c", "d"]);
    let a = state.next_pending().unwrap();
    let b = state.next_pending().unwrap();
    let c = state.next_pending().unwrap();

    state.record_error(b, ParseError::InvalidSchema("b".into()));
    state.defer(b);
    state.record_error(a, ParseError::InvalidSchema("a".into()));
    state.defer(a);

    let mut new_types = TypeBindings::new();
    new_types.insert(Rc::from("T"), Rc::from("c:T"));
    state.commit_new_definitions(c, new_types);

    assert_eq!(state.held().count(), 0);
    assert_eq!(
        state.queued().map(FileId::index).collect::<Vec<_>>(),
        [3, 1, 0]
    );
    assert_eq!(state.types()["T"].defining_file().file(), "c");
    // Requeued files keep their error until their own successful attempt.
    assert!(state.file(a).has_error());
    assert!(!state.file(c).has_error());
    Ok(())
}

#[test]
fn commit_updates_existing_entries_in_place() {
    let mut state = state_with(&["a", "b"]);
    let a = state.next_pending().unwrap();
    let b = state.next_pending().unwrap();

    state.commit_new_definitions(a, [(Rc::from("T"), Rc::from("a:T"))].into_iter().collect());
    state.commit_new_definitions(b, [(Rc::from("T"), Rc::from("b:T"))].into_iter().collect());

    assert_eq!(state.types().len(), 1);
    assert_eq!(state.types()["T"].definition().as_ref(), "b:T");
    assert_eq!(state.types()["T"].defining_file().file(), "b");
}

#[test]
fn commit_clears_previous_error() {
    let mut state = state_with(&["a"]);
    let a = state.next_pending().unwrap();
    state.record_error(a, ParseError::UnresolvedReference { name: "T".into() });
    assert!(state.file(a).has_error());

    state.commit_new_definitions(a, TypeBindings::new());
    assert!(!state.file(a).has_error());
    assert!(state.types().is_empty());
}

#[test]
fn usable_types_exclude_own_duplicates() {
    let files = vec![
        FileState::new(Source::from_contents("a", ""), vec![Rc::from("T")]),
        FileState::new(
            Source::from_contents("b", ""),
            vec![Rc::from("T"), Rc::from("U"), Rc::from("T")],
        ),
    ];
    let mut state: ProcessingState<Rc<str>> = ProcessingState::new(files);
    let a = state.next_pending().unwrap();
    let b = state.next_pending().unwrap();

    let new_types = [
        (Rc::from("T"), Rc::from("a:T")),
        (Rc::from("V"), Rc::from("a:V")),
    ];
    state.commit_new_definitions(a, new_types.into_iter().collect());

    let for_a = state.determine_usable_types(a);
    let for_b = state.determine_usable_types(b);
    assert_eq!(for_a.keys().map(|k| k.as_ref()).collect::<Vec<&str>>(), ["T", "V"]);
    assert_eq!(for_b.keys().map(|k| k.as_ref()).collect::<Vec<&str>>(), ["V"]);
    assert_eq!(for_b["V"].as_ref(), "a:V");
}
