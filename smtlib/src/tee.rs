// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Record the SMT dialogue and save it to a file for debugging purposes.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::sexp::Sexp;

/// A log of everything sent to the solver, written incrementally so the
/// dialogue survives a solver crash mid-query.
#[derive(Debug)]
pub struct Tee {
    file: BufWriter<File>,
}

impl Tee {
    /// Create (or truncate) the log file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }

    /// Append an s-expression sent to the solver.
    pub fn append(&mut self, s: &Sexp) {
        // the log is best-effort; a full disk shouldn't fail the query
        _ = writeln!(self.file, "{s}");
        _ = self.file.flush();
    }

    /// Append a comment line.
    pub fn comment(&mut self, c: &str) {
        _ = writeln!(self.file, ";; {c}");
        _ = self.file.flush();
    }
}
