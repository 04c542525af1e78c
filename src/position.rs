// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Logical identity of a source file: the package it belongs to, its
/// name inside that package and its absolute path on disk.
///
/// One `FilePos` is shared by every position of the file, so it is
/// handed around behind an `Rc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePos {
    pub package: String,
    pub file_name: String,
    pub name: String,
    pub file_path: PathBuf,
}

impl FilePos {
    pub fn new(package: &str, file_name: &str, file_path: PathBuf) -> FilePos {
        FilePos {
            package: package.to_string(),
            file_name: file_name.to_string(),
            // kept as a separate field, always equal to file_name
            name: file_name.to_string(),
            file_path,
        }
    }
}

/// A position inside a source file: byte offset, 1-based line number and
/// the byte offset of the line start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPos {
    pub file: Rc<FilePos>,
    pub offset: usize,
    pub line_no: usize,
    pub line_offset: usize,
}

impl TokenPos {
    /// A position carrying only an offset; line information is left zero.
    pub fn new(file: Rc<FilePos>, offset: usize) -> TokenPos {
        TokenPos {
            file,
            offset,
            line_no: 0,
            line_offset: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.offset > 0
    }
}

impl fmt::Display for TokenPos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:L{}", self.file.file_path.display(), self.line_no)
    }
}

/// A source file together with its table of line-start offsets. The
/// scanner appends an entry whenever it observes a newline.
#[derive(Clone, Debug)]
pub struct TokenFile {
    pub pos: Rc<FilePos>,
    pub line_offsets: Vec<usize>,
}

impl TokenFile {
    pub fn new(pos: FilePos) -> TokenFile {
        TokenFile {
            pos: Rc::new(pos),
            line_offsets: Vec::new(),
        }
    }

    pub fn add_line_offset(&mut self, offset: usize) {
        self.line_offsets.push(offset);
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len() + 1
    }

    /// The 1-based line number containing `offset`: one more than the
    /// number of recorded line starts at or before it.
    pub fn line_for_offset(&self, offset: usize) -> usize {
        1 + self.line_offsets.partition_point(|&lo| lo <= offset)
    }
}
