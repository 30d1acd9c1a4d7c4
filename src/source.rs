// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;

use core::cmp;
use core::fmt::{self, Debug, Formatter};
use std::path::Path;

use anyhow::{bail, Result};

struct SourceInternal {
    file: String,
    contents: String,
    lines: Vec<(usize, usize)>,
}

/// A schema definition file: its name and contents.
///
/// Cloning is cheap. Two sources are equal only if they are clones of the same
/// `Source`; two files with identical names and contents are still distinct inputs.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl cmp::Ord for Source {
    fn cmp(&self, other: &Source) -> cmp::Ordering {
        Rc::as_ptr(&self.src).cmp(&Rc::as_ptr(&other.src))
    }
}

impl cmp::PartialOrd for Source {
    fn partial_cmp(&self, other: &Source) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Rc::ptr_eq(&self.src, &other.src)
    }
}

impl cmp::Eq for Source {}

impl std::hash::Hash for Source {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.src).hash(state)
    }
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("file", &self.src.file)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.src.file)
    }
}

impl Source {
    pub fn from_contents(file: impl Into<String>, contents: impl Into<String>) -> Source {
        let file = file.into();
        let contents = contents.into();

        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0usize;
        let mut start = 0usize;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i,
                };
                lines.push((start, end));
                start = i + 1;
            }
            prev_ch = ch;
            prev_pos = i;
        }

        if start < contents.len() || contents.is_empty() {
            lines.push((start, contents.len()));
        }

        Self {
            src: Rc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Source> {
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        };
        Ok(Self::from_contents(
            path.as_ref().to_string_lossy().to_string(),
            contents,
        ))
    }

    pub fn file(&self) -> &str {
        &self.src.file
    }

    pub fn contents(&self) -> &str {
        &self.src.contents
    }

    /// Zero-based line lookup. Out of range lines are empty.
    pub fn line(&self, idx: usize) -> &str {
        match self.src.lines.get(idx) {
            Some(&(start, end)) => &self.src.contents[start..end],
            None => "",
        }
    }

    /// Render `msg` with a caret under the one-based `line` and `col`.
    pub fn message(&self, line: usize, col: usize, kind: &str, msg: &str) -> String {
        if line == 0 || line > self.src.lines.len() {
            return format!("{}: {kind}: {msg}", self.src.file);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col.saturating_sub(1);

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
             {:<line_num_width$}| {}\n\
             {:<line_num_width$}| {:<col_spaces$}^\n\
             {}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }
}
