// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::path::PathBuf;

use gidl_parser::{parse_source, ErrorList, FilePos, Scanner, Token, TokenFile};
use proptest::prelude::*;

fn new_file() -> TokenFile {
    TokenFile::new(FilePos::new(
        "example.com/demo",
        "demo.gidl",
        PathBuf::from("demo.gidl"),
    ))
}

fn scan_tokens(src: &[u8]) -> Vec<(Token, String)> {
    let mut s = Scanner::new(new_file(), src, ErrorList::new()).unwrap();
    let mut toks = vec![];
    loop {
        let (_, tok, lit) = s.scan();
        if tok == Token::EOF {
            break;
        }
        toks.push((tok, lit));
    }
    toks
}

proptest! {
    /// Arbitrary bytes, malformed UTF-8 included: the scanner reports
    /// errors but always terminates, stays in bounds and moves forward.
    #[test]
    fn scan_handles_arbitrary_bytes(src in proptest::collection::vec(any::<u8>(), 0..256)) {
        let errors = ErrorList::new();
        let mut s = Scanner::new(new_file(), &src, errors).unwrap();
        let mut last_offset = None;
        loop {
            let (pos, tok, _) = s.scan();
            prop_assert!(pos.offset <= src.len());
            if tok == Token::EOF {
                break;
            }
            if let Some(prev) = last_offset {
                prop_assert!(pos.offset > prev, "scanner stalled at offset {}", pos.offset);
            }
            last_offset = Some(pos.offset);
        }
    }

    /// The parser inherits the same guarantee: any input produces an AST
    /// plus diagnostics, never a crash.
    #[test]
    fn parse_handles_arbitrary_text(src in "[ -~\\n]{0,200}") {
        let (idl, _errors) = parse_source(new_file(), src.as_bytes()).unwrap();
        for decl in &idl.decls {
            prop_assert!(decl.pos().offset <= src.len());
            prop_assert!(decl.pos().offset <= decl.end().offset);
        }
    }

    /// Prepending a BOM leaves the token sequence unchanged.
    #[test]
    fn bom_prefix_is_idempotent(src in "[a-z0-9 .;,(){}=*\\n]{0,120}") {
        let plain = scan_tokens(src.as_bytes());
        let bommed = scan_tokens(format!("\u{feff}{}", src).as_bytes());
        prop_assert_eq!(plain, bommed);
    }

    /// Rewriting LF line endings as CRLF leaves the token sequence
    /// unchanged for sources whose literals cannot span lines.
    #[test]
    fn crlf_rewrite_is_idempotent(src in "[a-z0-9 .;,(){}=*\\n]{0,120}") {
        let lf = scan_tokens(src.as_bytes());
        let crlf = scan_tokens(src.replace('\n', "\r\n").as_bytes());
        prop_assert_eq!(lf, crlf);
    }
}
