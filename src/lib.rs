// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Front-end for the gidl interface definition language: a hand-written
//! scanner and a recursive-descent parser producing a position- and
//! comment-annotated AST for the downstream code generator.
//!
//! # Usage:
//! ```
//! use std::path::PathBuf;
//!
//! let pos = gidl_parser::FilePos::new("example.com/demo", "demo.gidl", PathBuf::from("demo.gidl"));
//! let file = gidl_parser::TokenFile::new(pos);
//! let (idl, errors) = gidl_parser::parse_source(file, b"syntax = \"v1\";").unwrap();
//! assert_eq!(idl.assigns.len(), 1);
//! assert!(errors.is_empty());
//! ```

mod errors;
mod files;
mod parser;
mod position;
mod scanner;
mod token;

pub mod ast;

pub use errors::{Error, ErrorList, InitError};
pub use files::{find_idl_files, is_idl_file, parse_file_at, path_exists, scan_files, FILE_POSTFIX};
pub use parser::Parser;
pub use position::{FilePos, TokenFile, TokenPos};
pub use scanner::Scanner;
pub use token::{Token, TokenType};

/// Parse one in-memory source. The AST and the accumulated diagnostics
/// come back together; only construction problems (a buffer that does not
/// match the on-disk file) surface as a hard error.
pub fn parse_source(
    file: TokenFile,
    src: &[u8],
) -> Result<(ast::IdlFile, ErrorList), InitError> {
    let parser = Parser::new(file, src)?;
    Ok(parser.parse_file())
}
