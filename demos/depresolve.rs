// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use depresolver::{CompilerOptions, JsonSchemaParser, SchemaParser, Source};
use walkdir::WalkDir;

fn read_options(file: Option<String>) -> Result<CompilerOptions> {
    let Some(file) = file else {
        return Ok(CompilerOptions::default());
    };
    let contents =
        std::fs::read_to_string(&file).with_context(|| format!("Failed to read {file}"))?;

    Ok(if file.ends_with(".json") {
        CompilerOptions::from_json_str(&contents)?
    } else if file.ends_with(".yaml") {
        serde_yaml::from_str(&contents)?
    } else {
        bail!("Unsupported options file `{file}`. Must be json or yaml.")
    })
}

// Expand directories into the .avsc files below them, sorted by path.
fn collect_files(paths: &[String]) -> Result<Vec<String>> {
    let mut files = vec![];
    for path in paths {
        if std::path::Path::new(path).is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "avsc")
                {
                    files.push(entry.path().display().to_string());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn schema_resolve(paths: &[String], options: Option<String>, show_imports: bool) -> Result<()> {
    let options = read_options(options)?;
    let files = collect_files(paths)?;
    if files.is_empty() {
        bail!("no schema files found");
    }

    let resolution = depresolver::resolve_files(&files)?;

    // Everything a code generator needs: its settings and the complete definitions.
    let types: BTreeMap<&str, serde_json::Value> = resolution
        .types()
        .iter()
        .map(|(name, state)| (name.as_ref(), state.definition().to_json()))
        .collect();
    let output = serde_json::json!({ "options": options, "types": types });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if show_imports {
        for (id, file) in resolution.files() {
            if let Some(imports) = resolution.imports(id) {
                let names: Vec<&str> = imports.keys().map(|k| k.as_ref()).collect();
                println!("{}: {}", file.source().file(), names.join(", "));
            }
        }
    }

    eprintln!(
        "{} type(s), {} attempt(s)",
        resolution.types().len(),
        resolution.attempts()
    );
    resolution.into_result()?;
    Ok(())
}

fn schema_declared(file: String) -> Result<()> {
    let source = Source::from_file(&file)?;
    for name in JsonSchemaParser::default().declared_type_names(&source) {
        println!("{name}");
    }
    Ok(())
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a set of schema files and print every resolved type.
    Resolve {
        /// Schema files, or directories to search for .avsc files.
        #[arg(required(true), value_name = "schema.avsc|dir")]
        paths: Vec<String>,

        /// Compiler options. json or yaml.
        #[arg(long, short, value_name = "options.json|options.yaml")]
        options: Option<String>,

        /// Print the types each file was parsed against.
        #[arg(long, short)]
        imports: bool,
    },

    /// List the type names a schema file declares.
    Declared {
        /// Schema file.
        file: String,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Resolve {
            paths,
            options,
            imports,
        } => schema_resolve(&paths, options, imports),
        Command::Declared { file } => schema_declared(file),
    }
}
