// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![allow(non_camel_case_types)]

use std::fmt;

/// The set of lexical tokens of the gidl language.
///
/// Tokens are fieldless; the scanner hands back the literal text beside
/// the token, so positions and literals stay cheap to copy around.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Token {
    // Special tokens
    ILLEGAL,
    EOF,
    COMMENT,
    NEWLINE,

    // Identifiers and basic type literals
    IDENT,  // main
    INT,    // 12345
    FLOAT,  // 123.45
    IMAG,   // 123.45i
    CHAR,   // 'a'
    STRING, // "abc"

    // Operators and delimiters
    ASSIGN, // =
    STAR,   // *

    LPAREN, // (
    LBRACK, // [
    LBRACE, // {
    COMMA,  // ,
    PERIOD, // .

    RPAREN,    // )
    RBRACK,    // ]
    RBRACE,    // }
    SEMICOLON, // ;

    // Keywords
    SYNTAX,
    SERVICE,
    MODEL,
    REST,
    GRPC,
    WS,
    IMPORT,
    RAW,
    MAP,
    INTERFACE,
    DECORATOR, // @
}

pub enum TokenType {
    Literal,
    Operator,
    Keyword,
    Other,
}

impl Token {
    pub fn token_property(&self) -> (TokenType, &'static str) {
        match self {
            Token::ILLEGAL => (TokenType::Other, "ILLEGAL"),
            Token::EOF => (TokenType::Other, "EOF"),
            Token::COMMENT => (TokenType::Other, "COMMENT"),
            Token::NEWLINE => (TokenType::Other, "NEWLINE"),
            Token::IDENT => (TokenType::Literal, "IDENT"),
            Token::INT => (TokenType::Literal, "INT"),
            Token::FLOAT => (TokenType::Literal, "FLOAT"),
            Token::IMAG => (TokenType::Literal, "IMAG"),
            Token::CHAR => (TokenType::Literal, "CHAR"),
            Token::STRING => (TokenType::Literal, "STRING"),
            Token::ASSIGN => (TokenType::Operator, "="),
            Token::STAR => (TokenType::Operator, "*"),
            Token::LPAREN => (TokenType::Operator, "("),
            Token::LBRACK => (TokenType::Operator, "["),
            Token::LBRACE => (TokenType::Operator, "{"),
            Token::COMMA => (TokenType::Operator, ","),
            Token::PERIOD => (TokenType::Operator, "."),
            Token::RPAREN => (TokenType::Operator, ")"),
            Token::RBRACK => (TokenType::Operator, "]"),
            Token::RBRACE => (TokenType::Operator, "}"),
            Token::SEMICOLON => (TokenType::Operator, ";"),
            Token::SYNTAX => (TokenType::Keyword, "syntax"),
            Token::SERVICE => (TokenType::Keyword, "service"),
            Token::MODEL => (TokenType::Keyword, "model"),
            Token::REST => (TokenType::Keyword, "rest"),
            Token::GRPC => (TokenType::Keyword, "grpc"),
            Token::WS => (TokenType::Keyword, "ws"),
            Token::IMPORT => (TokenType::Keyword, "import"),
            Token::RAW => (TokenType::Keyword, "raw"),
            Token::MAP => (TokenType::Keyword, "map"),
            Token::INTERFACE => (TokenType::Keyword, "interface"),
            Token::DECORATOR => (TokenType::Keyword, "@"),
        }
    }

    /// Maps an identifier to its keyword token, or IDENT if it is not a
    /// keyword.
    pub fn lookup_keyword(ident: &str) -> Token {
        match ident {
            "syntax" => Token::SYNTAX,
            "service" => Token::SERVICE,
            "model" => Token::MODEL,
            "rest" => Token::REST,
            "grpc" => Token::GRPC,
            "ws" => Token::WS,
            "import" => Token::IMPORT,
            "raw" => Token::RAW,
            "map" => Token::MAP,
            "interface" => Token::INTERFACE,
            "@" => Token::DECORATOR,
            _ => Token::IDENT,
        }
    }

    /// Maps a single operator or delimiter character to its token.
    pub fn lookup_operator(ch: char) -> Option<Token> {
        match ch {
            '=' => Some(Token::ASSIGN),
            '*' => Some(Token::STAR),
            '(' => Some(Token::LPAREN),
            '[' => Some(Token::LBRACK),
            '{' => Some(Token::LBRACE),
            ',' => Some(Token::COMMA),
            '.' => Some(Token::PERIOD),
            ')' => Some(Token::RPAREN),
            ']' => Some(Token::RBRACK),
            '}' => Some(Token::RBRACE),
            ';' => Some(Token::SEMICOLON),
            _ => None,
        }
    }

    /// The closing token of a block opened by `self`.
    pub fn block_close(&self) -> Option<Token> {
        match self {
            Token::LPAREN => Some(Token::RPAREN),
            Token::LBRACE => Some(Token::RBRACE),
            _ => None,
        }
    }

    /// The opening token matching a block closed by `self`.
    pub fn block_open(&self) -> Option<Token> {
        match self {
            Token::RPAREN => Some(Token::LPAREN),
            Token::RBRACE => Some(Token::LBRACE),
            _ => None,
        }
    }

    pub fn text(&self) -> &'static str {
        let (_, t) = self.token_property();
        t
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.token_property().0, TokenType::Literal)
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.token_property().0, TokenType::Operator)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self.token_property().0, TokenType::Keyword)
    }

    /// True for the tokens a basic literal value may carry.
    pub fn is_basic_lit(&self) -> bool {
        matches!(
            self,
            Token::INT | Token::FLOAT | Token::IMAG | Token::CHAR | Token::STRING
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.text())
    }
}
