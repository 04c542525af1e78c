// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The driver boundary: discovering `.gidl` sources on disk and running
//! the scanner/parser pair over one of them. Package-path resolution is
//! the caller's business; the string it hands over is consumed verbatim.

use std::fs;
use std::path::Path;

use log::error;

use crate::ast::IdlFile;
use crate::errors::{ErrorList, InitError};
use crate::parser::Parser;
use crate::position::{FilePos, TokenFile};

pub const FILE_POSTFIX: &str = ".gidl";

pub fn is_idl_file(name: &str) -> bool {
    name.ends_with(FILE_POSTFIX)
}

pub fn path_exists(path: &Path) -> (bool, bool) {
    match fs::metadata(path) {
        Ok(info) => (true, info.is_dir()),
        Err(_) => (false, false),
    }
}

/// The `.gidl` file names under `path`: the file's own name when it is a
/// file, the matching entries (non-recursive) when it is a directory.
pub fn find_idl_files(path: &Path) -> Result<Vec<String>, InitError> {
    let info = match fs::metadata(path) {
        Ok(info) => info,
        Err(e) => {
            error!("no such file or directory. error: {}", e);
            return Err(e.into());
        }
    };

    let mut file_names = vec![];
    if info.is_dir() {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                error!("read dir failed. path: {}, error: {}", path.display(), e);
                return Err(e.into());
            }
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_idl_file(&name) && entry.file_type()?.is_file() {
                file_names.push(name);
            }
        }
        file_names.sort();
    } else if let Some(name) = path.file_name() {
        let name = name.to_string_lossy().into_owned();
        if is_idl_file(&name) {
            file_names.push(name);
        }
    }

    Ok(file_names)
}

/// Builds one [`TokenFile`] per discovered source. `module_package_path`
/// becomes the package of every file's [`FilePos`].
pub fn scan_files(path: &Path, module_package_path: &str) -> Result<Vec<TokenFile>, InitError> {
    let file_names = find_idl_files(path)?;

    let abs_path = match path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            error!("get abs path failed. path: {}, error: {}", path.display(), e);
            return Err(e.into());
        }
    };
    let (exists, is_dir) = path_exists(&abs_path);
    if !exists {
        error!("file path not exists. {}", abs_path.display());
        return Err(InitError::PathNotFound(abs_path));
    }

    let abs_dir = if is_dir {
        abs_path
    } else {
        match abs_path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return Err(InitError::PathNotFound(abs_path)),
        }
    };

    let files = file_names
        .iter()
        .map(|name| TokenFile::new(FilePos::new(module_package_path, name, abs_dir.join(name))))
        .collect();
    Ok(files)
}

/// Reads the source behind `token_file` and parses it. The error list
/// comes back beside the AST; a non-empty list means the AST is only
/// good for diagnostics.
pub fn parse_file_at(token_file: TokenFile) -> Result<(IdlFile, ErrorList), InitError> {
    let src = match fs::read(&token_file.pos.file_path) {
        Ok(src) => src,
        Err(e) => {
            error!(
                "read file failed. path: {}, error: {}",
                token_file.pos.file_path.display(),
                e
            );
            return Err(e.into());
        }
    };
    let parser = Parser::new(token_file, &src)?;
    Ok(parser.parse_file())
}
