// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.
//
// The literal scanning rules follow the lexical grammar of the Go
// programming language, which gidl sources share.

use std::fs;

use crate::errors::{ErrorList, InitError};
use crate::position::{TokenFile, TokenPos};
use crate::token::Token;

const BOM: char = '\u{feff}'; // byte order mark, only permitted as very first character

/// Transforms a byte buffer into a stream of `(position, token, literal)`
/// triples through repeated calls to [`Scanner::scan`].
///
/// Errors never abort the scan: they are appended to the shared error
/// list, the scanner moves past the offending bytes, and the caller keeps
/// pulling tokens until EOF.
pub struct Scanner<'a> {
    file: TokenFile,
    src: &'a [u8],
    errors: ErrorList,

    ch: Option<char>,   // current character; None at end of file
    offset: usize,      // byte offset of the current character
    rd_offset: usize,   // reading offset (byte after the current character)
    line_no: usize,     // current line number, 1-based
    line_offset: usize, // byte offset of the current line start
}

impl<'a> Scanner<'a> {
    /// Prepares a scanner over `src` for `file`. When the file path can be
    /// statted, a mismatch between the on-disk size and the buffer length
    /// is a fatal error: the buffer does not hold the file it claims to.
    pub fn new(file: TokenFile, src: &'a [u8], errors: ErrorList) -> Result<Scanner<'a>, InitError> {
        if let Ok(meta) = fs::metadata(&file.pos.file_path) {
            if meta.len() != src.len() as u64 {
                return Err(InitError::SizeMismatch {
                    disk: meta.len(),
                    len: src.len() as u64,
                });
            }
        }

        let mut s = Scanner {
            file,
            src,
            errors,
            ch: None,
            offset: 0,
            rd_offset: 0,
            line_no: 1,
            line_offset: 0,
        };

        s.next();
        if s.ch == Some(BOM) {
            s.next(); // a leading BOM is skipped once
        }
        Ok(s)
    }

    pub fn file(&self) -> &TokenFile {
        &self.file
    }

    pub fn into_file(self) -> TokenFile {
        self.file
    }

    pub fn errors(&self) -> ErrorList {
        self.errors.clone()
    }

    fn error(&self, offset: usize, msg: impl Into<String>) {
        self.errors.add(Some(self.token_pos(offset)), msg);
    }

    fn token_pos(&self, offset: usize) -> TokenPos {
        TokenPos {
            file: self.file.pos.clone(),
            offset,
            line_no: self.line_no,
            line_offset: self.line_offset,
        }
    }

    /// Reads the next Unicode character into `ch`, enforcing the byte-level
    /// rules: no NUL, valid UTF-8, BOM only at offset 0.
    fn next(&mut self) {
        if self.rd_offset < self.src.len() {
            self.offset = self.rd_offset;
            if self.ch == Some('\n') {
                self.line_no += 1;
                self.line_offset = self.offset;
                self.file.add_line_offset(self.offset);
            }

            let b = self.src[self.rd_offset];
            let (ch, width) = if b == 0 {
                self.error(self.offset, "illegal character NUL");
                ('\0', 1)
            } else if b < 0x80 {
                (b as char, 1)
            } else {
                match decode_rune(&self.src[self.rd_offset..]) {
                    Some((ch, width)) => {
                        if ch == BOM && self.offset > 0 {
                            self.error(self.offset, "illegal byte order mark");
                        }
                        (ch, width)
                    }
                    None => {
                        self.error(self.offset, "illegal UTF-8 encoding");
                        (char::REPLACEMENT_CHARACTER, 1)
                    }
                }
            };
            self.ch = Some(ch);
            self.rd_offset += width;
        } else {
            self.offset = self.src.len();
            if self.ch == Some('\n') {
                self.line_no += 1;
                self.line_offset = self.offset;
                self.file.add_line_offset(self.offset);
            }
            self.ch = None;
        }
    }

    /// The byte following the current character, or 0 at end of file.
    fn peek(&self) -> u8 {
        if self.rd_offset < self.src.len() {
            self.src[self.rd_offset]
        } else {
            0
        }
    }

    fn lit_from(&self, offs: usize) -> String {
        String::from_utf8_lossy(&self.src[offs..self.offset]).into_owned()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.ch {
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                self.next();
            } else {
                break;
            }
        }
    }

    /// Returns the next token and its literal text. After the end of the
    /// source every call returns EOF. The offset of successive tokens is
    /// strictly increasing: every path below consumes at least one
    /// character.
    pub fn scan(&mut self) -> (TokenPos, Token, String) {
        self.skip_whitespace();
        let pos = self.token_pos(self.offset);

        let (tok, lit) = match self.ch {
            Some(ch) if is_letter(ch) || ch == '@' => {
                let lit = self.scan_identifier();
                (Token::lookup_keyword(&lit), lit)
            }
            Some(ch) if is_decimal(ch) => self.scan_number(),
            Some('.') if self.peek().is_ascii_digit() => self.scan_number(),
            Some('"') => (Token::STRING, self.scan_string()),
            Some('\'') => (Token::CHAR, self.scan_rune()),
            Some('`') => (Token::STRING, self.scan_raw_string()),
            Some('/') if self.peek() == b'/' || self.peek() == b'*' => {
                (Token::COMMENT, self.scan_comment())
            }
            Some(ch) => {
                self.next();
                match Token::lookup_operator(ch) {
                    Some(tok) => (tok, tok.text().to_string()),
                    // no other rule claims the character; hand it to the
                    // parser as an identifier and let it complain there
                    None => (Token::IDENT, ch.to_string()),
                }
            }
            None => (Token::EOF, String::new()),
        };
        (pos, tok, lit)
    }

    fn scan_identifier(&mut self) -> String {
        let offs = self.offset;
        if self.ch == Some('@') {
            self.next();
        }
        while let Some(ch) = self.ch {
            if is_letter(ch) || is_digit(ch) {
                self.next();
            } else {
                break;
            }
        }
        self.lit_from(offs)
    }

    /// Consumes digits of `base` together with `_` separators. Bit 0 of the
    /// result records that a digit was present, bit 1 that a separator was.
    /// The offset of the first decimal digit not valid for `base` lands in
    /// `invalid`.
    fn digits(&mut self, base: u32, invalid: &mut Option<usize>) -> u32 {
        let mut digsep = 0u32;
        if base <= 10 {
            while let Some(ch) = self.ch {
                if is_decimal(ch) {
                    if ch as u32 >= '0' as u32 + base && invalid.is_none() {
                        *invalid = Some(self.offset);
                    }
                    digsep |= 1;
                    self.next();
                } else if ch == '_' {
                    digsep |= 2;
                    self.next();
                } else {
                    break;
                }
            }
        } else {
            while let Some(ch) = self.ch {
                if is_hex(ch) {
                    digsep |= 1;
                    self.next();
                } else if ch == '_' {
                    digsep |= 2;
                    self.next();
                } else {
                    break;
                }
            }
        }
        digsep
    }

    fn scan_number(&mut self) -> (Token, String) {
        let offs = self.offset;
        let mut tok = Token::ILLEGAL;
        let mut base: u32 = 10;
        let mut prefix = '\0'; // one of 0 (decimal), '0' (bare octal), 'x', 'o', 'b'
        let mut digsep = 0u32;
        let mut invalid: Option<usize> = None;

        // integer part
        if self.ch != Some('.') {
            tok = Token::INT;
            if self.ch == Some('0') {
                self.next();
                match self.ch.map(lower) {
                    Some('x') => {
                        self.next();
                        base = 16;
                        prefix = 'x';
                    }
                    Some('o') => {
                        self.next();
                        base = 8;
                        prefix = 'o';
                    }
                    Some('b') => {
                        self.next();
                        base = 2;
                        prefix = 'b';
                    }
                    _ => {
                        base = 8;
                        prefix = '0';
                        digsep = 1; // leading 0 is a digit
                    }
                }
            }
            digsep |= self.digits(base, &mut invalid);
        }

        // fractional part
        if self.ch == Some('.') {
            tok = Token::FLOAT;
            if prefix == 'o' || prefix == 'b' {
                self.error(
                    self.offset,
                    format!("invalid radix point in {}", lit_name(prefix)),
                );
            }
            self.next();
            digsep |= self.digits(base, &mut invalid);
        }

        if digsep & 1 == 0 {
            self.error(offs, format!("{} has no digits", lit_name(prefix)));
        }

        // exponent
        if let Some(e) = self.ch.map(lower).filter(|&e| e == 'e' || e == 'p') {
            if e == 'e' && prefix != '\0' && prefix != '0' {
                self.error(
                    self.offset,
                    format!("'{}' exponent requires decimal mantissa", e),
                );
            } else if e == 'p' && prefix != 'x' {
                self.error(
                    self.offset,
                    format!("'{}' exponent requires hexadecimal mantissa", e),
                );
            }
            self.next();
            tok = Token::FLOAT;
            if self.ch == Some('+') || self.ch == Some('-') {
                self.next();
            }
            let ds = self.digits(10, &mut invalid);
            digsep |= ds;
            if ds & 1 == 0 {
                self.error(offs, "exponent has no digits");
            }
        } else if prefix == 'x' && tok == Token::FLOAT {
            self.error(offs, "hexadecimal mantissa requires a 'p' exponent");
        }

        // imaginary suffix
        if self.ch == Some('i') {
            tok = Token::IMAG;
            self.next();
        }

        let lit = self.lit_from(offs);
        if tok == Token::INT {
            if let Some(i) = invalid {
                self.error(
                    i,
                    format!(
                        "invalid digit '{}' in {}",
                        lit.as_bytes()[i - offs] as char,
                        lit_name(prefix)
                    ),
                );
            }
        }
        if digsep & 2 != 0 {
            if let Some(i) = invalid_sep(&lit) {
                self.error(offs + i, "'_' must separate successive digits");
            }
        }

        (tok, lit)
    }

    /// Validates one escape sequence after the backslash has been consumed.
    /// `quote` is the closing quote of the surrounding literal.
    fn scan_escape(&mut self, quote: char) -> bool {
        let offs = self.offset;

        let (mut n, base, max): (u32, u32, u32) = match self.ch {
            Some(ch)
                if matches!(ch, 'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\') || ch == quote =>
            {
                self.next();
                return true;
            }
            Some('0'..='7') => (3, 8, 255),
            Some('x') => {
                self.next();
                (2, 16, 255)
            }
            Some('u') => {
                self.next();
                (4, 16, char::MAX as u32)
            }
            Some('U') => {
                self.next();
                (8, 16, char::MAX as u32)
            }
            Some(_) => {
                self.error(offs, "unknown escape sequence");
                return false;
            }
            None => {
                self.error(offs, "escape sequence not terminated");
                return false;
            }
        };

        let mut x: u32 = 0;
        while n > 0 {
            match self.ch {
                Some(ch) => {
                    let d = digit_val(ch);
                    if d >= base {
                        self.error(
                            self.offset,
                            format!("illegal character U+{:04X} in escape sequence", ch as u32),
                        );
                        return false;
                    }
                    x = x * base + d;
                    self.next();
                }
                None => {
                    self.error(self.offset, "escape sequence not terminated");
                    return false;
                }
            }
            n -= 1;
        }

        if x > max || (0xD800..0xE000).contains(&x) {
            self.error(offs, "escape sequence is invalid Unicode code point");
            return false;
        }
        true
    }

    fn scan_string(&mut self) -> String {
        let offs = self.offset; // opening quote
        self.next();
        loop {
            match self.ch {
                None | Some('\n') => {
                    self.error(offs, "string literal not terminated");
                    break;
                }
                Some('"') => {
                    self.next();
                    break;
                }
                Some('\\') => {
                    self.next();
                    self.scan_escape('"');
                }
                Some(_) => self.next(),
            }
        }
        self.lit_from(offs)
    }

    fn scan_rune(&mut self) -> String {
        let offs = self.offset; // opening quote
        self.next();
        let mut valid = true;
        let mut n = 0;
        loop {
            match self.ch {
                None | Some('\n') => {
                    if valid {
                        self.error(offs, "rune literal not terminated");
                        valid = false;
                    }
                    break;
                }
                Some('\'') => {
                    self.next();
                    break;
                }
                Some('\\') => {
                    self.next();
                    if !self.scan_escape('\'') {
                        valid = false;
                    }
                    n += 1;
                }
                Some(_) => {
                    self.next();
                    n += 1;
                }
            }
        }
        if valid && n != 1 {
            self.error(offs, "illegal rune literal");
        }
        self.lit_from(offs)
    }

    fn scan_raw_string(&mut self) -> String {
        let offs = self.offset; // opening backquote
        self.next();
        let mut has_cr = false;
        loop {
            match self.ch {
                None => {
                    self.error(offs, "raw string literal not terminated");
                    break;
                }
                Some('`') => {
                    self.next();
                    break;
                }
                Some(ch) => {
                    if ch == '\r' {
                        has_cr = true;
                    }
                    self.next();
                }
            }
        }
        let mut lit = self.src[offs..self.offset].to_vec();
        if has_cr {
            lit = strip_cr(&lit, false);
        }
        String::from_utf8_lossy(&lit).into_owned()
    }

    fn scan_comment(&mut self) -> String {
        let offs = self.offset; // initial '/'
        let mut num_cr = 0;
        self.next();

        if self.ch == Some('/') {
            // //-style, up to but excluding the terminating newline
            self.next();
            while let Some(ch) = self.ch {
                if ch == '\n' {
                    break;
                }
                if ch == '\r' {
                    num_cr += 1;
                }
                self.next();
            }
        } else {
            // /*-style
            self.next();
            let mut terminated = false;
            while let Some(ch) = self.ch {
                if ch == '\r' {
                    num_cr += 1;
                }
                self.next();
                if ch == '*' && self.ch == Some('/') {
                    self.next();
                    terminated = true;
                    break;
                }
            }
            if !terminated {
                self.error(offs, "comment not terminated");
            }
        }

        let mut lit = self.src[offs..self.offset].to_vec();
        if num_cr > 0 {
            lit = strip_cr(&lit, lit[1] == b'*');
        }
        String::from_utf8_lossy(&lit).into_owned()
    }
}

/// Removes carriage returns. In a /*-style comment a `\r` directly between
/// `*` and the closing `/` is kept, so that stripping cannot fabricate a
/// premature `*/` terminator.
fn strip_cr(b: &[u8], comment: bool) -> Vec<u8> {
    let mut c: Vec<u8> = Vec::with_capacity(b.len());
    for (i, &ch) in b.iter().enumerate() {
        if ch != b'\r'
            || comment
                && c.len() > 2
                && c[c.len() - 1] == b'*'
                && i + 1 < b.len()
                && b[i + 1] == b'/'
        {
            c.push(ch);
        }
    }
    c
}

/// Decodes one UTF-8 encoded character from the start of `src`. `None`
/// means the bytes are not a valid encoding (overlong forms, surrogates
/// and truncated sequences included).
fn decode_rune(src: &[u8]) -> Option<(char, usize)> {
    let width = match src[0] {
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return None,
    };
    if src.len() < width {
        return None;
    }
    let s = std::str::from_utf8(&src[..width]).ok()?;
    s.chars().next().map(|ch| (ch, width))
}

/// Reports the first position in a numeric literal at which an underscore
/// separator breaks the rule that `_` may only sit between digits (a base
/// prefix counts as a digit).
pub fn invalid_sep(x: &str) -> Option<usize> {
    let b = x.as_bytes();
    let mut x1 = ' '; // prefix char, or ' '
    let mut d = '.'; // digit, '_', or '.' (for anything else)
    let mut start = 0;

    if b.len() >= 2 && b[0] == b'0' {
        x1 = lower(b[1] as char);
        if x1 == 'x' || x1 == 'o' || x1 == 'b' {
            d = '0'; // the prefix counts as a digit
            start = 2;
        }
    }

    for (i, &byte) in b.iter().enumerate().skip(start) {
        let p = d; // previous digit class
        let ch = byte as char;
        if ch == '_' {
            if p != '0' {
                return Some(i);
            }
            d = '_';
        } else if is_decimal(ch) || x1 == 'x' && is_hex(ch) {
            d = '0';
        } else {
            if p == '_' {
                return Some(i);
            }
            d = '.';
        }
    }
    if d == '_' {
        return Some(b.len());
    }
    None
}

fn lit_name(prefix: char) -> &'static str {
    match prefix {
        'x' => "hexadecimal literal",
        'o' | '0' => "octal literal",
        'b' => "binary literal",
        _ => "decimal literal",
    }
}

fn lower(ch: char) -> char {
    // lower-case ch iff ch is an ASCII letter
    ch.to_ascii_lowercase()
}

fn is_letter(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_uppercase() || ch == '_' || !ch.is_ascii() && ch.is_alphabetic()
}

fn is_digit(ch: char) -> bool {
    is_decimal(ch) || !ch.is_ascii() && ch.is_numeric()
}

fn is_decimal(ch: char) -> bool {
    ch.is_ascii_digit()
}

fn is_hex(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

fn digit_val(ch: char) -> u32 {
    match ch {
        '0'..='9' => ch as u32 - '0' as u32,
        'a'..='f' => ch as u32 - 'a' as u32 + 10,
        'A'..='F' => ch as u32 - 'A' as u32 + 10,
        _ => 16, // larger than any legal digit val
    }
}
