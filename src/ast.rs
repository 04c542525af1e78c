// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::HashMap;
use std::rc::Rc;

use crate::position::{FilePos, TokenFile, TokenPos};
use crate::token::Token;

// ----------------------------------------------------------------------------
// Basic nodes

/// An identifier with its position.
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub pos: TokenPos,
    pub name: String,
}

impl Ident {
    pub fn end(&self) -> TokenPos {
        TokenPos::new(self.pos.file.clone(), self.pos.offset + self.name.len())
    }
}

/// A literal of basic type. `value` keeps the literal text exactly as it
/// appears in the source, quotes and escapes included.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicLit {
    pub pos: TokenPos,
    pub kind: Token, // INT, FLOAT, IMAG, CHAR or STRING
    pub value: String,
}

impl BasicLit {
    pub fn end(&self) -> TokenPos {
        TokenPos::new(self.pos.file.clone(), self.pos.offset + self.value.len())
    }

    /// The string value with quotes stripped and escapes decoded; `None`
    /// when the literal is not a well-formed quoted string.
    pub fn unquote(&self) -> Option<String> {
        unquote(&self.value)
    }
}

/// A single //-style or /*-style comment.
///
/// `text` holds the comment without carriage returns that may have been
/// present in the source, so for comments containing them the position
/// reported by `end()` falls short of the true source end.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub pos: TokenPos, // position of the '/' starting the comment
    pub text: String,
}

impl Comment {
    pub fn end(&self) -> TokenPos {
        TokenPos::new(self.pos.file.clone(), self.pos.offset + self.text.len())
    }
}

/// A sequence of comments with no other tokens and no more than one blank
/// line between them. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct CommentGroup {
    pub list: Vec<Comment>,
}

impl CommentGroup {
    pub fn pos(&self) -> &TokenPos {
        &self.list[0].pos
    }

    pub fn end(&self) -> TokenPos {
        self.list[self.list.len() - 1].end()
    }
}

// ----------------------------------------------------------------------------
// Types

/// Fields common to every type node: display name and source span.
#[derive(Clone, Debug)]
pub struct TypeBase {
    pub name: Ident,
    pub pos: TokenPos,
    pub end: TokenPos,
}

/// A reference to a named type, optionally qualified with a package.
#[derive(Clone, Debug)]
pub struct TypeRef {
    pub base: TypeBase,
    pub package: Option<Ident>,
}

/// `[]T`
#[derive(Clone, Debug)]
pub struct ArrayType {
    pub base: TypeBase,
    pub elem: IType,
}

/// `map[K]V`
#[derive(Clone, Debug)]
pub struct MapType {
    pub base: TypeBase,
    pub key: IType,
    pub elem: IType,
}

/// `interface` or `interface{}`
#[derive(Clone, Debug)]
pub struct InterfaceType {
    pub base: TypeBase,
}

/// `*T`
#[derive(Clone, Debug)]
pub struct PointerType {
    pub base: TypeBase,
    pub base_type: IType,
}

/// A braced field list, either the body of a named model or an anonymous
/// struct used directly as a type.
#[derive(Clone, Debug)]
pub struct ModelType {
    pub base: TypeBase,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub opening: TokenPos,
    pub fields: Vec<ModelField>,
    pub closing: TokenPos,
    pub anonymous: bool,
}

#[derive(Clone, Debug)]
pub struct ModelField {
    pub pos: TokenPos,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub name: Ident,
    pub typ: IType,
    pub tag: Option<FieldTag>,
    /// Whether the field name starts with an upper-case letter.
    pub exported: bool,
    /// Whether the field carries only a type, its name being derived from
    /// that type.
    pub embedded: bool,
}

#[derive(Clone, Debug)]
pub struct FieldTag {
    pub lit: BasicLit,
}

impl FieldTag {
    /// Splits a tag into its key/value pairs: `json:"name" db:"name"`
    /// becomes {"json": "name", "db": "name"}. Malformed pairs are
    /// silently dropped.
    pub fn split(&self) -> HashMap<String, String> {
        let mut parts = HashMap::new();
        let tag = unquote(&self.lit.value).unwrap_or_else(|| self.lit.value.clone());
        let tag = tag.replace('`', "");
        for pair in tag.split(' ') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let sep = match pair.find(':') {
                Some(i) if i < pair.len() - 1 => i,
                _ => continue,
            };
            let key = &pair[..sep];
            let value = pair[sep + 1..].replace('"', "");
            parts.insert(key.to_string(), value);
        }
        parts
    }
}

/// The sum of all type forms a field or message may use.
#[derive(Clone, Debug)]
pub enum IType {
    Ref(Rc<TypeRef>),
    Model(Rc<ModelType>),
    Array(Rc<ArrayType>),
    Map(Rc<MapType>),
    Interface(Rc<InterfaceType>),
    Pointer(Rc<PointerType>),
    Unknown(Rc<TypeBase>),
}

impl IType {
    /// The placeholder for a position where no type could be parsed.
    pub fn unknown(pos: TokenPos) -> IType {
        IType::Unknown(Rc::new(TypeBase {
            name: Ident {
                pos: pos.clone(),
                name: "Unknown".to_string(),
            },
            end: pos.clone(),
            pos,
        }))
    }

    fn base(&self) -> &TypeBase {
        match self {
            IType::Ref(t) => &t.base,
            IType::Model(t) => &t.base,
            IType::Array(t) => &t.base,
            IType::Map(t) => &t.base,
            IType::Interface(t) => &t.base,
            IType::Pointer(t) => &t.base,
            IType::Unknown(b) => b,
        }
    }

    pub fn name_ident(&self) -> &Ident {
        &self.base().name
    }

    pub fn pos(&self) -> &TokenPos {
        &self.base().pos
    }

    pub fn end(&self) -> &TokenPos {
        &self.base().end
    }
}

/// Reports whether `name` starts with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

// ----------------------------------------------------------------------------
// Declarations

/// Fields shared by every declaration: the source text it spans and its
/// start and end positions. `expr` covers the leading doc comment and the
/// trailing line comment when present.
#[derive(Clone, Debug)]
pub struct Decl {
    pub expr: Vec<u8>,
    pub pos: TokenPos,
    pub end: TokenPos,
}

/// `syntax = "v1";`
#[derive(Clone, Debug)]
pub struct AssignmentDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub tok: Token,
    pub spec: ValueSpec,
}

#[derive(Clone, Debug)]
pub struct ValueSpec {
    pub name: Ident,
    pub value: BasicLit,
}

/// `import "path";` or `import ( ... )`
#[derive(Clone, Debug)]
pub struct ImportDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub tok: Token,
    pub lparen: Option<TokenPos>,
    pub rparen: Option<TokenPos>,
    pub specs: Vec<ImportSpec>,
}

/// A single imported package, optionally renamed.
#[derive(Clone, Debug)]
pub struct ImportSpec {
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub name: Option<Ident>, // local name, "." for a dot import
    pub path: BasicLit,
}

/// `model Name { ... };`
#[derive(Clone, Debug)]
pub struct ModelDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub tok: Token,
    pub name: Ident,
    pub spec: Rc<ModelType>,
}

/// `service Name { ... }` — the body is accepted but not interpreted.
#[derive(Clone, Debug)]
pub struct ServiceDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub tok: Token,
    pub name: Ident,
}

/// `rest Name METHOD "/uri" { req T; resp T; }`
#[derive(Clone, Debug)]
pub struct RestDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub name: Ident,
    pub http_method: Ident,
    pub str_uri: BasicLit,
    pub uris: Vec<String>,
    pub req: Option<IType>,
    pub resp: Option<IType>,
}

/// `grpc Name { req T; resp T; }`
#[derive(Clone, Debug)]
pub struct GrpcDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub name: Ident,
    pub req: Option<IType>,
    pub resp: Option<IType>,
}

/// `ws Name UP <kind> <type>;`
#[derive(Clone, Debug)]
pub struct WsDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
    pub name: Ident,
    pub direction: Ident, // "UP" or "Down"
    pub msg_kind: BasicLit,
    pub msg: IType,
}

/// `raw { ... }` — reserved; the block is consumed, not interpreted.
#[derive(Clone, Debug)]
pub struct RawDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
}

/// `@` — reserved.
#[derive(Clone, Debug)]
pub struct DecoratorDecl {
    pub decl: Decl,
    pub doc: Option<Rc<CommentGroup>>,
    pub comment: Option<Rc<CommentGroup>>,
}

/// The sum of all top-level declarations. Each node is shared between its
/// typed list on [`IdlFile`] and the source-ordered `decls` sequence.
#[derive(Clone, Debug)]
pub enum IDecl {
    Assignment(Rc<AssignmentDecl>),
    Import(Rc<ImportDecl>),
    Model(Rc<ModelDecl>),
    Service(Rc<ServiceDecl>),
    Rest(Rc<RestDecl>),
    Grpc(Rc<GrpcDecl>),
    Ws(Rc<WsDecl>),
    Raw(Rc<RawDecl>),
    Decorator(Rc<DecoratorDecl>),
}

impl IDecl {
    fn decl(&self) -> &Decl {
        match self {
            IDecl::Assignment(d) => &d.decl,
            IDecl::Import(d) => &d.decl,
            IDecl::Model(d) => &d.decl,
            IDecl::Service(d) => &d.decl,
            IDecl::Rest(d) => &d.decl,
            IDecl::Grpc(d) => &d.decl,
            IDecl::Ws(d) => &d.decl,
            IDecl::Raw(d) => &d.decl,
            IDecl::Decorator(d) => &d.decl,
        }
    }

    pub fn pos(&self) -> &TokenPos {
        &self.decl().pos
    }

    pub fn end(&self) -> &TokenPos {
        &self.decl().end
    }

    pub fn expr(&self) -> &[u8] {
        &self.decl().expr
    }

    /// One-line usage text for the declaration form.
    pub fn help(&self) -> &'static str {
        match self {
            IDecl::Assignment(_) => "format: <KEY> = <value>;",
            IDecl::Import(_) => "format: import \"<module path>\";",
            IDecl::Model(_) => "format: model <Name> { <Field> <type> <tag>; };",
            IDecl::Service(_) => "format: service <Name> { ... }",
            IDecl::Rest(_) => "format: rest <Name> <METHOD> \"<uri>[,<uri>]\" { req <type>; resp <type>; }",
            IDecl::Grpc(_) => "format: grpc <Name> { req <type>; resp <type>; }",
            IDecl::Ws(_) => "format: ws <Name> <UP|Down> <kind> <type>;",
            IDecl::Raw(_) => "format: raw { ... }  the block is passed through to the generator untouched",
            IDecl::Decorator(_) => "format: @<DECORATOR_NAME> <content>",
        }
    }
}

// ----------------------------------------------------------------------------
// Rest / ws vocabularies

pub const HTTP_METHODS: [&str; 10] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE", "ANY",
];

pub fn is_http_method(name: &str) -> bool {
    HTTP_METHODS.contains(&name)
}

pub const WS_DIRECTIONS: [&str; 2] = ["UP", "Down"];

pub fn is_ws_direction(name: &str) -> bool {
    WS_DIRECTIONS.contains(&name)
}

// ----------------------------------------------------------------------------
// File

/// The per-file AST container. Constructed when the parser starts, filled
/// through the `add_*` methods while it runs, frozen once it returns.
#[derive(Clone, Debug)]
pub struct IdlFile {
    pub token_file: TokenFile,

    pub assigns: Vec<Rc<AssignmentDecl>>,
    pub imports: Vec<Rc<ImportDecl>>,
    pub models: Vec<Rc<ModelDecl>>,
    pub services: Vec<Rc<ServiceDecl>>,
    pub rests: Vec<Rc<RestDecl>>,
    pub grpcs: Vec<Rc<GrpcDecl>>,
    pub wss: Vec<Rc<WsDecl>>,
    pub raws: Vec<Rc<RawDecl>>,
    pub decorators: Vec<Rc<DecoratorDecl>>,

    pub comments: Vec<Rc<CommentGroup>>,

    /// Every declaration in source order.
    pub decls: Vec<IDecl>,
}

impl IdlFile {
    pub fn new(pos: Rc<FilePos>) -> IdlFile {
        IdlFile {
            token_file: TokenFile {
                pos,
                line_offsets: Vec::new(),
            },
            assigns: vec![],
            imports: vec![],
            models: vec![],
            services: vec![],
            rests: vec![],
            grpcs: vec![],
            wss: vec![],
            raws: vec![],
            decorators: vec![],
            comments: vec![],
            decls: vec![],
        }
    }

    pub fn add_assign(&mut self, decl: Rc<AssignmentDecl>) {
        self.assigns.push(decl.clone());
        self.decls.push(IDecl::Assignment(decl));
    }

    pub fn add_import(&mut self, decl: Rc<ImportDecl>) {
        self.imports.push(decl.clone());
        self.decls.push(IDecl::Import(decl));
    }

    pub fn add_model(&mut self, decl: Rc<ModelDecl>) {
        self.models.push(decl.clone());
        self.decls.push(IDecl::Model(decl));
    }

    pub fn add_service(&mut self, decl: Rc<ServiceDecl>) {
        self.services.push(decl.clone());
        self.decls.push(IDecl::Service(decl));
    }

    pub fn add_rest(&mut self, decl: Rc<RestDecl>) {
        self.rests.push(decl.clone());
        self.decls.push(IDecl::Rest(decl));
    }

    pub fn add_grpc(&mut self, decl: Rc<GrpcDecl>) {
        self.grpcs.push(decl.clone());
        self.decls.push(IDecl::Grpc(decl));
    }

    pub fn add_ws(&mut self, decl: Rc<WsDecl>) {
        self.wss.push(decl.clone());
        self.decls.push(IDecl::Ws(decl));
    }

    pub fn add_raw(&mut self, decl: Rc<RawDecl>) {
        self.raws.push(decl.clone());
        self.decls.push(IDecl::Raw(decl));
    }

    pub fn add_decorator(&mut self, decl: Rc<DecoratorDecl>) {
        self.decorators.push(decl.clone());
        self.decls.push(IDecl::Decorator(decl));
    }
}

// ----------------------------------------------------------------------------
// Literal helpers

/// Strips the quotes from a string, rune or raw-string literal and decodes
/// its escape sequences. `None` when the literal is malformed.
pub fn unquote(lit: &str) -> Option<String> {
    let bytes = lit.as_bytes();
    if bytes.len() < 2 || bytes[0] != bytes[bytes.len() - 1] {
        return None;
    }
    let quote = bytes[0] as char;
    let inner = &lit[1..lit.len() - 1];
    match quote {
        '`' => Some(inner.replace('\r', "")),
        '"' | '\'' => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(ch) = chars.next() {
                if ch != '\\' {
                    out.push(ch);
                    continue;
                }
                match chars.next()? {
                    'a' => out.push('\u{07}'),
                    'b' => out.push('\u{08}'),
                    'f' => out.push('\u{0c}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'v' => out.push('\u{0b}'),
                    '\\' => out.push('\\'),
                    '\'' => out.push('\''),
                    '"' => out.push('"'),
                    'x' => out.push(char::from_u32(hex_value(&mut chars, 2)?)?),
                    'u' => out.push(char::from_u32(hex_value(&mut chars, 4)?)?),
                    'U' => out.push(char::from_u32(hex_value(&mut chars, 8)?)?),
                    d @ '0'..='7' => {
                        let mut v = d.to_digit(8)?;
                        for _ in 0..2 {
                            v = v * 8 + chars.next()?.to_digit(8)?;
                        }
                        if v > 255 {
                            return None;
                        }
                        out.push(v as u8 as char);
                    }
                    _ => return None,
                }
            }
            Some(out)
        }
        _ => None,
    }
}

fn hex_value(chars: &mut std::str::Chars, n: usize) -> Option<u32> {
    let mut v = 0;
    for _ in 0..n {
        v = v * 16 + chars.next()?.to_digit(16)?;
    }
    Some(v)
}
