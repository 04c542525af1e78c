// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::position::TokenPos;

/// A scan or parse diagnostic: a position and a one-line message.
#[derive(Clone, Debug)]
pub struct Error {
    pub pos: Option<TokenPos>,
    pub msg: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{}:LINE{} {}", pos.file.file_name, pos.line_no, self.msg),
            None => f.write_str(&self.msg),
        }
    }
}

/// An append-only list of diagnostics, shared between the scanner and the
/// parser working on the same file. Errors are accumulated, never thrown;
/// both keep going after reporting one.
#[derive(Clone, Debug)]
pub struct ErrorList {
    errors: Rc<RefCell<Vec<Error>>>,
}

impl ErrorList {
    pub fn new() -> ErrorList {
        ErrorList {
            errors: Rc::new(RefCell::new(vec![])),
        }
    }

    pub fn add(&self, pos: Option<TokenPos>, msg: impl Into<String>) {
        self.errors.borrow_mut().push(Error {
            pos,
            msg: msg.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.errors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty()
    }

    pub fn borrow(&self) -> Ref<Vec<Error>> {
        self.errors.borrow()
    }

    /// The aggregate form: `None` when the list is empty, the single entry
    /// when there is one, otherwise the first entry plus a count.
    pub fn err(&self) -> Option<String> {
        let errors = self.errors.borrow();
        match errors.len() {
            0 => None,
            1 => Some(errors[0].to_string()),
            n => Some(format!("{} and ({}) more errors", errors[0], n - 1)),
        }
    }
}

impl Default for ErrorList {
    fn default() -> ErrorList {
        ErrorList::new()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.err() {
            Some(s) => f.write_str(&s),
            None => f.write_str("no errors"),
        }
    }
}

/// Fatal boundary failures. Unlike scan and parse diagnostics these abort
/// early: a source that cannot be read, or a buffer that does not match
/// the file it claims to come from, leaves nothing sensible to recover.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("file size ({disk}) does not match src len ({len})")]
    SizeMismatch { disk: u64, len: u64 },
    #[error("file path not exists. {0}")]
    PathNotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
