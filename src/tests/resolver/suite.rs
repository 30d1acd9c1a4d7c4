// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::print_stdout
)] // yaml suite reports progress and panics on failure

use crate::*;

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct SchemaFile {
    name: String,
    schema: String,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    files: Vec<SchemaFile>,
    #[serde(default)]
    want_types: Vec<String>,
    #[serde(default)]
    want_failed: Vec<String>,
    // Type name to the file expected to hold its final definition.
    want_defined_by: Option<BTreeMap<String, String>>,
    // Type name to its expected JSON form.
    want_definitions: Option<BTreeMap<String, serde_json::Value>>,
    want_attempts: Option<usize>,
    // Substrings expected in the failure report.
    #[serde(default)]
    want_report: Vec<String>,
    skip: Option<bool>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn run_case(case: &TestCase) -> Result<()> {
    let resolver = SchemaResolver::new(JsonSchemaParser::new());
    let sources = case
        .files
        .iter()
        .map(|f| Source::from_contents(f.name.clone(), f.schema.clone()));
    let resolution = resolver.resolve(sources);

    let types: Vec<String> = resolution.types().keys().map(|k| k.to_string()).collect();
    if types != case.want_types {
        bail!("types mismatch\nleft  = {types:?}\nright = {:?}", case.want_types);
    }

    let failed: Vec<String> = resolution
        .failed_files()
        .map(|f| f.source().file().to_string())
        .collect();
    if failed != case.want_failed {
        bail!(
            "failed files mismatch\nleft  = {failed:?}\nright = {:?}\n{}",
            case.want_failed,
            resolution.report()
        );
    }

    if let Some(defined_by) = &case.want_defined_by {
        for (name, file) in defined_by {
            let Some(state) = resolution.types().get(name.as_str()) else {
                bail!("type {name} not resolved");
            };
            if state.defining_file().file() != file {
                bail!(
                    "{name} defined by {} instead of {file}",
                    state.defining_file().file()
                );
            }
        }
    }

    if let Some(definitions) = &case.want_definitions {
        for (name, expected) in definitions {
            let Some(schema) = resolution.definition(name) else {
                bail!("type {name} not resolved");
            };
            let computed = schema.to_json();
            if &computed != expected {
                bail!(
                    "definition mismatch for {name}\nleft  = {}\nright = {}",
                    serde_json::to_string_pretty(&computed)?,
                    serde_json::to_string_pretty(expected)?
                );
            }
        }
    }

    if let Some(attempts) = case.want_attempts {
        if resolution.attempts() != attempts {
            bail!("expected {attempts} attempts, got {}", resolution.attempts());
        }
    }

    let report = resolution.report();
    for fragment in &case.want_report {
        if !report.contains(fragment.as_str()) {
            bail!("report does not contain {fragment:?}:\n{report}");
        }
    }

    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    std::println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        std::print!("\ncase {} ", case.note);
        if case.skip == Some(true) {
            std::println!("skipped");
            continue;
        }
        run_case(case)?;
        std::println!("passed");
    }

    std::println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/resolver/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
