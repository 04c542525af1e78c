// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::rc::Rc;

use crate::ast::*;
use crate::errors::{ErrorList, InitError};
use crate::position::{TokenFile, TokenPos};
use crate::scanner::Scanner;
use crate::token::Token;

/// A recursive-descent parser over the scanner's token stream, with one
/// token of lookahead. One parser instance processes one file from start
/// to finish; the AST, comment list and error list it fills are owned by
/// nothing else while it runs.
pub struct Parser<'a> {
    src: &'a [u8],
    scanner: Scanner<'a>,
    idl: IdlFile,
    errors: ErrorList,

    // comment tracking
    comments: Vec<Rc<CommentGroup>>,
    lead_comment: Option<Rc<CommentGroup>>,
    line_comment: Option<Rc<CommentGroup>>,

    // one-token lookahead
    pos: TokenPos,
    tok: Token,
    lit: String,
}

impl<'a> Parser<'a> {
    pub fn new(file: TokenFile, src: &'a [u8]) -> Result<Parser<'a>, InitError> {
        let errors = ErrorList::new();
        let file_pos = file.pos.clone();
        let scanner = Scanner::new(file, src, errors.clone())?;
        let mut p = Parser {
            src,
            scanner,
            idl: IdlFile::new(file_pos.clone()),
            errors,
            comments: vec![],
            lead_comment: None,
            line_comment: None,
            pos: TokenPos::new(file_pos, 0),
            tok: Token::ILLEGAL,
            lit: String::new(),
        };
        p.next();
        Ok(p)
    }

    // ------------------------------------------------------------------------
    // Token stream and comment classification

    fn next0(&mut self) {
        let (pos, tok, lit) = self.scanner.scan();
        self.pos = pos;
        self.tok = tok;
        self.lit = lit;
    }

    /// Consume one comment, returning it and the line its text ends on.
    fn consume_comment(&mut self) -> (Comment, usize) {
        // /*-style comments may end on a different line than where they
        // start; count the newlines in the text.
        let mut endline = self.pos.line_no;
        if self.lit.as_bytes().get(1) == Some(&b'*') {
            for &b in self.lit.as_bytes() {
                if b == b'\n' {
                    endline += 1;
                }
            }
        }
        let comment = Comment {
            pos: self.pos.clone(),
            text: std::mem::take(&mut self.lit),
        };
        self.next0();
        (comment, endline)
    }

    /// Consume a run of comments with line gaps of at most `n`, record it
    /// in the file's comment list, and return it with the line the last
    /// comment ends on.
    fn consume_comment_group(&mut self, n: usize) -> (Rc<CommentGroup>, usize) {
        let mut list = vec![];
        let mut endline = self.pos.line_no;
        while self.tok == Token::COMMENT && self.pos.line_no <= endline + n {
            let (comment, el) = self.consume_comment();
            endline = el;
            list.push(comment);
        }
        let group = Rc::new(CommentGroup { list });
        self.comments.push(group.clone());
        (group, endline)
    }

    /// Advance to the next non-comment token, classifying comment groups
    /// seen on the way.
    ///
    /// A line comment starts on the same line as the previous token and has
    /// no token after it on the line it ends on. A lead comment ends on the
    /// line immediately before the next token; it is that token's
    /// documentation. Comment groups merge across at most one blank line.
    fn next(&mut self) {
        self.lead_comment = None;
        self.line_comment = None;
        let prev_line = self.pos.line_no;
        self.next0();

        if self.tok == Token::COMMENT {
            let mut comment = None;

            if self.pos.line_no == prev_line {
                // The comment is on the same line as the previous token; it
                // cannot be a lead comment but may be a line comment.
                let (group, endline) = self.consume_comment_group(0);
                if self.pos.line_no != endline || self.tok == Token::EOF {
                    self.line_comment = Some(group.clone());
                }
                comment = Some(group);
            }

            // consume successor comment groups
            let mut endline = None;
            while self.tok == Token::COMMENT {
                let (group, el) = self.consume_comment_group(2);
                comment = Some(group);
                endline = Some(el);
            }

            if endline.map(|el| el + 1) == Some(self.pos.line_no) {
                // The next token follows on the line immediately after the
                // comment group, which is therefore its lead comment.
                self.lead_comment = comment;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Errors and expectations

    fn error(&self, pos: &TokenPos, msg: impl Into<String>) {
        self.errors.add(Some(pos.clone()), msg);
    }

    fn error_expected(&self, pos: &TokenPos, what: &str) {
        self.error(pos, format!("expected {}", what));
    }

    /// Report an error unless the lookahead is `tok`, then advance either
    /// way so the parse keeps making progress.
    fn expect(&mut self, tok: Token) -> TokenPos {
        let pos = self.pos.clone();
        if self.tok != tok {
            self.error_expected(&pos, &format!("'{}'", tok));
        }
        self.next();
        pos
    }

    /// Statement terminator: `;`, tolerantly `,` (with a complaint), or
    /// nothing right before a closing `}` / `)` or the end of the file.
    fn expect_semi(&mut self) {
        match self.tok {
            Token::RPAREN | Token::RBRACE | Token::EOF => {}
            Token::SEMICOLON => self.next(),
            Token::COMMA => {
                // permit a ',' instead of a ';' but complain
                self.error_expected(&self.pos.clone(), "';'");
                self.next();
            }
            _ => {
                self.error_expected(&self.pos.clone(), "';'");
            }
        }
    }

    /// A separator that may simply be absent, as between the specs of a
    /// grouped import.
    fn opt_semi(&mut self) {
        match self.tok {
            Token::SEMICOLON => self.next(),
            Token::COMMA => {
                self.error_expected(&self.pos.clone(), "';'");
                self.next();
            }
            _ => {}
        }
    }

    /// Consume tokens up to and including the closer matching `open`,
    /// honoring nesting. The opener itself must already be consumed.
    fn skip_balanced(&mut self, open: Token) -> TokenPos {
        let close = match open.block_close() {
            Some(c) => c,
            None => return self.pos.clone(),
        };
        let mut depth = 1usize;
        while self.tok != Token::EOF {
            if self.tok == open {
                depth += 1;
            } else if self.tok == close {
                depth -= 1;
                if depth == 0 {
                    return self.expect(close);
                }
            }
            self.next();
        }
        let pos = self.pos.clone();
        self.error_expected(&pos, &format!("'{}'", close));
        pos
    }

    /// The source bytes from `start` through `end` inclusive, clamped to
    /// the buffer.
    fn slice(&self, start: usize, end: usize) -> Vec<u8> {
        let hi = (end + 1).min(self.src.len());
        let lo = start.min(hi);
        self.src[lo..hi].to_vec()
    }

    fn pos_at(&self, offset: usize) -> TokenPos {
        TokenPos::new(self.scanner.file().pos.clone(), offset)
    }

    // ------------------------------------------------------------------------
    // Top level

    /// Parse every declaration in the file. Unknown tokens at the top level
    /// are skipped so a single stray token cannot take the whole file down.
    pub fn parse_file(mut self) -> (IdlFile, ErrorList) {
        while self.tok != Token::EOF {
            match self.tok {
                Token::IMPORT => self.parse_import(),
                Token::SYNTAX => self.parse_assignment(),
                Token::MODEL => self.parse_model(),
                Token::SERVICE => self.parse_service(),
                Token::REST => self.parse_rest(),
                Token::GRPC => self.parse_grpc(),
                Token::WS => self.parse_ws(),
                Token::RAW => self.parse_raw(),
                Token::DECORATOR => self.parse_decorator(),
                _ => self.next(),
            }
        }

        let Parser {
            scanner,
            errors,
            mut idl,
            comments,
            ..
        } = self;
        idl.comments = comments;
        idl.token_file = scanner.into_file();
        (idl, errors)
    }

    // ------------------------------------------------------------------------
    // Identifiers

    fn parse_ident(&mut self) -> Ident {
        let pos = self.pos.clone();
        let name = if self.tok == Token::IDENT {
            let name = std::mem::take(&mut self.lit);
            self.next();
            name
        } else {
            self.expect(Token::IDENT); // use expect() error handling
            "_".to_string()
        };
        Ident { pos, name }
    }

    // ------------------------------------------------------------------------
    // Imports

    fn parse_import(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.expect(Token::IMPORT);
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);

        let mut specs = vec![];
        let mut lparen = None;
        let mut rparen = None;
        let expr_end;
        let end;

        if self.tok == Token::LPAREN {
            lparen = Some(self.pos.clone());
            self.next();
            while self.tok != Token::RPAREN && self.tok != Token::EOF {
                specs.push(self.parse_import_spec());
            }
            let rp = self.expect(Token::RPAREN);
            self.expect_semi();
            expr_end = match &self.line_comment {
                Some(lc) => lc.end().offset.saturating_sub(1),
                None => rp.offset,
            };
            end = rp.clone();
            rparen = Some(rp);
        } else {
            let spec = self.parse_import_spec();
            let path_end = spec.path.pos.offset + spec.path.value.len();
            expr_end = match &self.line_comment {
                Some(lc) => lc.end().offset.saturating_sub(1),
                None => path_end,
            };
            end = self.pos_at(path_end);
            specs.push(spec);
        }

        let decl = Rc::new(ImportDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end,
            },
            doc,
            comment: self.line_comment.clone(),
            tok: Token::IMPORT,
            lparen,
            rparen,
            specs,
        });
        self.idl.add_import(decl);
    }

    fn parse_import_spec(&mut self) -> ImportSpec {
        let doc = self.lead_comment.take();
        let name = match self.tok {
            Token::PERIOD => {
                let ident = Ident {
                    pos: self.pos.clone(),
                    name: ".".to_string(),
                };
                self.next();
                Some(ident)
            }
            Token::IDENT => Some(self.parse_ident()),
            _ => None,
        };

        let pos = self.pos.clone();
        let path = if self.tok == Token::STRING {
            let lit = std::mem::take(&mut self.lit);
            if !is_valid_import(&lit) {
                self.error(&pos, format!("invalid import path: {}", lit));
            }
            self.next();
            lit
        } else {
            self.expect(Token::STRING);
            String::new()
        };

        self.opt_semi();

        ImportSpec {
            doc,
            comment: self.line_comment.clone(),
            name,
            path: BasicLit {
                pos,
                kind: Token::STRING,
                value: path,
            },
        }
    }

    // ------------------------------------------------------------------------
    // Assignments

    fn parse_assignment(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let tok = self.tok;
        let lit = std::mem::take(&mut self.lit);
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);

        self.next();
        self.expect(Token::ASSIGN);

        let value_pos = self.pos.clone();
        let value_tok = self.tok;
        let value_lit = std::mem::take(&mut self.lit);
        if !value_tok.is_basic_lit() {
            self.error(&value_pos, "illegal basic type value");
        }
        let value_end = value_pos.offset + value_lit.len();

        self.next();
        self.expect_semi(); // call before reading the line comment

        let expr_end = match &self.line_comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => value_end,
        };

        let decl = Rc::new(AssignmentDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos: pos.clone(),
                end: self.pos_at(value_end),
            },
            doc,
            comment: self.line_comment.clone(),
            tok,
            spec: ValueSpec {
                name: Ident { pos, name: lit },
                value: BasicLit {
                    pos: value_pos,
                    kind: value_tok,
                    value: value_lit,
                },
            },
        });
        self.idl.add_assign(decl);
    }

    // ------------------------------------------------------------------------
    // Models and types

    fn parse_model(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let tok = self.tok;
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);

        self.next();
        let spec = self.parse_named_model_spec(doc.clone());

        let comment = self.line_comment.clone();
        let expr_end = match &comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => spec.closing.offset,
        };

        let decl = Rc::new(ModelDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end: spec.closing.clone(),
            },
            doc,
            comment,
            tok,
            name: spec.base.name.clone(),
            spec,
        });
        self.idl.add_model(decl);
    }

    fn parse_named_model_spec(&mut self, doc: Option<Rc<CommentGroup>>) -> Rc<ModelType> {
        let pos = self.pos.clone();
        let name = self.parse_ident();
        let mut spec = self.parse_model_spec();
        spec.base.name = name;
        spec.base.pos = pos;
        spec.doc = doc;
        self.expect_semi(); // an independent model finishes with `};`
        Rc::new(spec)
    }

    /// The braced field list shared by named models and anonymous struct
    /// types.
    fn parse_model_spec(&mut self) -> ModelType {
        let doc = self.lead_comment.take();
        let lbrace = self.expect(Token::LBRACE);
        let comment = self.line_comment.clone();

        let mut fields = vec![];
        while self.tok == Token::IDENT || self.tok == Token::STAR {
            fields.push(self.parse_field());
        }
        let rbrace = self.expect(Token::RBRACE);

        ModelType {
            base: TypeBase {
                name: Ident {
                    pos: lbrace.clone(),
                    name: "model".to_string(),
                },
                pos: lbrace.clone(),
                end: rbrace.clone(),
            },
            doc,
            comment,
            opening: lbrace,
            fields,
            closing: rbrace,
            anonymous: false,
        }
    }

    fn parse_field(&mut self) -> ModelField {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();

        let (name, typ, embedded) = if self.tok == Token::IDENT {
            let name = self.parse_ident();
            if matches!(
                self.tok,
                Token::PERIOD | Token::STRING | Token::SEMICOLON | Token::RBRACE
            ) {
                // no explicit type: the name doubles as an embedded type
                let typ = self.parse_type_name(Some(name.clone()));
                (name, typ, true)
            } else {
                let typ = self.parse_type();
                (name, typ, false)
            }
        } else if self.tok == Token::STAR {
            // embedded pointer: the field is named after the pointee
            let ptr = self.parse_pointer_type();
            let name = ptr.base_type.name_ident().clone();
            (name, IType::Pointer(ptr), true)
        } else {
            self.error(&pos, format!("unsupported token for field: {}", self.tok));
            self.next();
            (
                Ident {
                    pos: pos.clone(),
                    name: "_".to_string(),
                },
                IType::unknown(pos.clone()),
                false,
            )
        };

        let tag = if self.tok == Token::STRING {
            let lit = BasicLit {
                pos: self.pos.clone(),
                kind: self.tok,
                value: std::mem::take(&mut self.lit),
            };
            self.next();
            Some(FieldTag { lit })
        } else {
            None
        };

        self.expect_semi(); // call before reading the line comment

        ModelField {
            exported: is_exported(&name.name),
            pos,
            doc,
            comment: self.line_comment.clone(),
            name,
            typ,
            tag,
            embedded,
        }
    }

    fn parse_type(&mut self) -> IType {
        match self.tok {
            Token::IDENT => self.parse_type_name(None),
            Token::LBRACE => {
                let mut spec = self.parse_model_spec();
                spec.anonymous = true;
                IType::Model(Rc::new(spec))
            }
            Token::LBRACK => self.parse_array_type(),
            Token::MAP => self.parse_map_type(),
            Token::INTERFACE => self.parse_interface_type(),
            Token::STAR => IType::Pointer(self.parse_pointer_type()),
            _ => IType::unknown(self.pos.clone()),
        }
    }

    fn parse_type_name(&mut self, ident: Option<Ident>) -> IType {
        let ident = ident.unwrap_or_else(|| self.parse_ident());
        let pos = ident.pos.clone();

        if self.tok == Token::PERIOD {
            // the identifier was a package name
            self.next();
            let sel = self.parse_ident();
            let full_name = format!("{}.{}", ident.name, sel.name);
            let end = self.pos_at(pos.offset + full_name.len());
            return IType::Ref(Rc::new(TypeRef {
                base: TypeBase {
                    name: Ident {
                        pos: pos.clone(),
                        name: full_name,
                    },
                    pos,
                    end,
                },
                package: Some(ident),
            }));
        }

        let end = self.pos_at(pos.offset + ident.name.len());
        IType::Ref(Rc::new(TypeRef {
            base: TypeBase {
                name: ident,
                pos,
                end,
            },
            package: None,
        }))
    }

    /// `[]T` — no length or ellipsis forms.
    fn parse_array_type(&mut self) -> IType {
        let pos = self.expect(Token::LBRACK);
        self.expect(Token::RBRACK);
        let elem = self.parse_type();
        let name = format!("[]{}", elem.name_ident().name);
        IType::Array(Rc::new(ArrayType {
            base: TypeBase {
                name: Ident {
                    pos: pos.clone(),
                    name,
                },
                pos,
                end: elem.end().clone(),
            },
            elem,
        }))
    }

    fn parse_map_type(&mut self) -> IType {
        let pos = self.expect(Token::MAP);
        self.expect(Token::LBRACK);
        let key = self.parse_type();
        self.expect(Token::RBRACK);
        let elem = self.parse_type();
        let name = format!("map[{}]{}", key.name_ident().name, elem.name_ident().name);
        IType::Map(Rc::new(MapType {
            base: TypeBase {
                name: Ident {
                    pos: pos.clone(),
                    name,
                },
                pos,
                end: elem.end().clone(),
            },
            key,
            elem,
        }))
    }

    /// `interface` or `interface{}`
    fn parse_interface_type(&mut self) -> IType {
        let pos = self.expect(Token::INTERFACE);
        let mut end = self.pos_at(pos.offset + Token::INTERFACE.text().len());
        if self.tok == Token::LBRACE {
            self.next();
            end = self.expect(Token::RBRACE);
        }
        IType::Interface(Rc::new(InterfaceType {
            base: TypeBase {
                name: Ident {
                    pos: pos.clone(),
                    name: "interface".to_string(),
                },
                pos,
                end,
            },
        }))
    }

    fn parse_pointer_type(&mut self) -> Rc<PointerType> {
        let pos = self.expect(Token::STAR);
        let base_type = self.parse_type();
        let name = format!("*{}", base_type.name_ident().name);
        Rc::new(PointerType {
            base: TypeBase {
                name: Ident {
                    pos: pos.clone(),
                    name,
                },
                pos,
                end: base_type.end().clone(),
            },
            base_type,
        })
    }

    // ------------------------------------------------------------------------
    // Services

    fn parse_service(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let tok = self.tok;
        self.next();
        let name = self.parse_ident();

        // the body is accepted but not interpreted yet; skip it with
        // matching braces
        self.expect(Token::LBRACE);
        let rbrace = self.skip_balanced(Token::LBRACE);
        self.expect_semi();
        let comment = self.line_comment.clone();

        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);
        let expr_end = match &comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => rbrace.offset,
        };

        let decl = Rc::new(ServiceDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end: rbrace,
            },
            doc,
            comment,
            tok,
            name,
        });
        self.idl.add_service(decl);
    }

    // ------------------------------------------------------------------------
    // Rest and grpc endpoints

    fn parse_rest(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);
        self.next();

        let name = self.parse_ident();

        let http_method = self.parse_ident();
        if !is_http_method(&http_method.name) {
            self.error(
                &http_method.pos,
                format!("unknown http method {}", http_method.name),
            );
        }

        let uri_pos = self.pos.clone();
        let (str_uri, uris) = if self.tok == Token::STRING {
            let lit = std::mem::take(&mut self.lit);
            self.next();
            let unquoted = unquote(&lit).unwrap_or_default();
            let uris = unquoted
                .split(',')
                .map(|s| s.trim().to_string())
                .collect();
            (
                BasicLit {
                    pos: uri_pos,
                    kind: Token::STRING,
                    value: lit,
                },
                uris,
            )
        } else {
            self.expect(Token::STRING);
            (
                BasicLit {
                    pos: uri_pos,
                    kind: Token::STRING,
                    value: String::new(),
                },
                vec![],
            )
        };

        self.expect(Token::LBRACE);
        let (req, resp, rbrace) = self.parse_req_resp_body("rest");
        self.opt_semi();
        let comment = self.line_comment.clone();

        if let Some(IType::Model(model)) = &req {
            self.check_rest_req(model);
        }

        let expr_end = match &comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => rbrace.offset,
        };

        let decl = Rc::new(RestDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end: rbrace,
            },
            doc,
            comment,
            name,
            http_method,
            str_uri,
            uris,
            req,
            resp,
        });
        self.idl.add_rest(decl);
    }

    fn parse_grpc(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);
        self.next();

        let name = self.parse_ident();

        self.expect(Token::LBRACE);
        let (req, resp, rbrace) = self.parse_req_resp_body("grpc");
        self.opt_semi();
        let comment = self.line_comment.clone();

        let expr_end = match &comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => rbrace.offset,
        };

        let decl = Rc::new(GrpcDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end: rbrace,
            },
            doc,
            comment,
            name,
            req,
            resp,
        });
        self.idl.add_grpc(decl);
    }

    /// The body shared by rest and grpc declarations: only `req` and
    /// `resp` fields are allowed, each at most once.
    fn parse_req_resp_body(
        &mut self,
        kind: &str,
    ) -> (Option<IType>, Option<IType>, TokenPos) {
        let mut req = None;
        let mut resp = None;

        while self.tok != Token::RBRACE && self.tok != Token::EOF {
            if self.tok != Token::IDENT {
                self.error(
                    &self.pos.clone(),
                    format!("unsupported token for field: {}", self.tok),
                );
                self.next();
                continue;
            }
            let field = self.parse_ident();
            match field.name.as_str() {
                "req" => {
                    let typ = self.parse_type();
                    self.expect_semi();
                    if req.is_some() {
                        self.error(&field.pos, format!("duplicated {} field: req", kind));
                    } else {
                        req = Some(typ);
                    }
                }
                "resp" => {
                    let typ = self.parse_type();
                    self.expect_semi();
                    if resp.is_some() {
                        self.error(&field.pos, format!("duplicated {} field: resp", kind));
                    } else {
                        resp = Some(typ);
                    }
                }
                _ => {
                    self.error(
                        &field.pos,
                        format!("unknown field for {}: {}", kind, field.name),
                    );
                    // drop everything up to the end of the entry
                    while !matches!(
                        self.tok,
                        Token::SEMICOLON | Token::RBRACE | Token::EOF
                    ) {
                        self.next();
                    }
                    if self.tok == Token::SEMICOLON {
                        self.next();
                    }
                }
            }
        }

        let rbrace = self.expect(Token::RBRACE);
        (req, resp, rbrace)
    }

    /// A rest request given as an inline model either names all of its
    /// fields from the reserved set `Header`, `Uri`, `Query`, `Body`
    /// (separated form) or none of them (merged form).
    fn check_rest_req(&mut self, model: &ModelType) {
        let mut separated = 0;
        let mut merged = 0;
        for field in &model.fields {
            match field.name.name.as_str() {
                "Header" | "Uri" | "Query" | "Body" => separated += 1,
                _ => merged += 1,
            }
        }
        if separated > 0 && merged > 0 {
            self.error(
                &model.base.pos,
                "mixed merged and separated rest request fields",
            );
        }
    }

    // ------------------------------------------------------------------------
    // Websocket endpoints

    fn parse_ws(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);
        self.next();

        let name = self.parse_ident();

        let direction = self.parse_ident();
        if !is_ws_direction(&direction.name) {
            self.error(
                &direction.pos,
                format!("unknown ws direction {}", direction.name),
            );
        }

        let kind_pos = self.pos.clone();
        let msg_kind = if self.tok.is_literal() {
            let lit = BasicLit {
                pos: kind_pos,
                kind: self.tok,
                value: std::mem::take(&mut self.lit),
            };
            self.next();
            lit
        } else {
            self.error_expected(&kind_pos, "message kind");
            BasicLit {
                pos: kind_pos,
                kind: Token::ILLEGAL,
                value: String::new(),
            }
        };

        let msg = self.parse_type();
        self.expect_semi();
        let comment = self.line_comment.clone();

        let end = msg.end().clone();
        let expr_end = match &comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => end.offset,
        };
        let decl = Rc::new(WsDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end,
            },
            doc,
            comment,
            name,
            direction,
            msg_kind,
            msg,
        });
        self.idl.add_ws(decl);
    }

    // ------------------------------------------------------------------------
    // Reserved declarations

    /// `raw { ... }` — the block is consumed without interpretation.
    fn parse_raw(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);
        self.next();

        let end = if self.tok == Token::LBRACE {
            self.next();
            self.skip_balanced(Token::LBRACE)
        } else {
            self.pos_at(pos.offset + Token::RAW.text().len())
        };
        self.opt_semi();
        let comment = self.line_comment.clone();

        let expr_end = match &comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => end.offset,
        };

        let decl = Rc::new(RawDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end,
            },
            doc,
            comment,
        });
        self.idl.add_raw(decl);
    }

    /// `@` — reserved; only the sigil itself is claimed.
    fn parse_decorator(&mut self) {
        let doc = self.lead_comment.take();
        let pos = self.pos.clone();
        let expr_start = doc.as_ref().map(|d| d.pos().offset).unwrap_or(pos.offset);
        self.next();
        let comment = self.line_comment.clone();

        let end = self.pos_at(pos.offset + 1);
        let expr_end = match &comment {
            Some(lc) => lc.end().offset.saturating_sub(1),
            None => pos.offset,
        };

        let decl = Rc::new(DecoratorDecl {
            decl: Decl {
                expr: self.slice(expr_start, expr_end),
                pos,
                end,
            },
            doc,
            comment,
        });
        self.idl.add_decorator(decl);
    }
}

/// An import path is the quoted form of a non-empty string of graphic,
/// non-whitespace characters outside a small set of punctuation that
/// module paths reserve.
fn is_valid_import(lit: &str) -> bool {
    const ILLEGAL_CHARS: &str = "!\"#$%&'()*,:;<=>?[\\]^{|}`\u{fffd}";
    let s = match unquote(lit) {
        Some(s) => s,
        None => return false,
    };
    for r in s.chars() {
        if r.is_whitespace() || r.is_control() || ILLEGAL_CHARS.contains(r) {
            return false;
        }
    }
    !s.is_empty()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_valid_import() {
        assert!(is_valid_import("\"fmt\""));
        assert!(is_valid_import("\"github.com/acme/rocket\""));
        assert!(!is_valid_import("\"\""));
        assert!(!is_valid_import("\"a b\""));
        assert!(!is_valid_import("\"a;b\""));
        assert!(!is_valid_import("\"a|b\""));
        assert!(!is_valid_import("\"a\u{fffd}\""));
        assert!(!is_valid_import("not-quoted"));
    }
}
