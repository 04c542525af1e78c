// Copyright 2024 The Gidl Authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::path::PathBuf;

use gidl_parser::ast::{IDecl, IType, IdlFile};
use gidl_parser::{parse_source, ErrorList, FilePos, Scanner, Token, TokenFile};
use pretty_assertions::assert_eq;

fn new_file() -> TokenFile {
    TokenFile::new(FilePos::new(
        "example.com/demo",
        "demo.gidl",
        PathBuf::from("demo.gidl"),
    ))
}

fn parse(src: &str) -> (IdlFile, ErrorList) {
    parse_source(new_file(), src.as_bytes()).unwrap()
}

fn parse_clean(src: &str) -> IdlFile {
    let (idl, errors) = parse(src);
    assert!(errors.is_empty(), "unexpected errors for {:?}: {}", src, errors);
    idl
}

fn error_messages(errors: &ErrorList) -> Vec<String> {
    errors.borrow().iter().map(|e| e.msg.clone()).collect()
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

// ----------------------------------------------------------------------------
// End-to-end scenarios

#[test]
fn test_assignment() {
    let src = "syntax=\"v1\";";
    let idl = parse_clean(src);

    assert_eq!(idl.assigns.len(), 1);
    let assign = &idl.assigns[0];
    assert_eq!(assign.tok, Token::SYNTAX);
    assert_eq!(assign.spec.name.name, "syntax");
    assert_eq!(assign.spec.value.kind, Token::STRING);
    assert_eq!(assign.spec.value.value, "\"v1\"");
    assert_eq!(assign.spec.value.unquote().unwrap(), "v1");
    assert_eq!(assign.decl.expr, src.as_bytes());
    assert_eq!(idl.decls.len(), 1);
}

#[test]
fn test_import_group() {
    let src = "import ( \"a\"\n. \"b\"\nalias \"c\" )";
    let idl = parse_clean(src);

    assert_eq!(idl.imports.len(), 1);
    let import = &idl.imports[0];
    assert!(import.lparen.is_some());
    assert!(import.rparen.is_some());
    assert_eq!(import.specs.len(), 3);

    assert!(import.specs[0].name.is_none());
    assert_eq!(import.specs[0].path.unquote().unwrap(), "a");

    assert_eq!(import.specs[1].name.as_ref().unwrap().name, ".");
    assert_eq!(import.specs[1].path.unquote().unwrap(), "b");

    assert_eq!(import.specs[2].name.as_ref().unwrap().name, "alias");
    assert_eq!(import.specs[2].path.unquote().unwrap(), "c");
}

#[test]
fn test_import_single() {
    let src = "import \"github.com/acme/rocket\";";
    let idl = parse_clean(src);
    let import = &idl.imports[0];
    assert!(import.lparen.is_none());
    assert_eq!(import.specs.len(), 1);
    assert_eq!(
        import.specs[0].path.unquote().unwrap(),
        "github.com/acme/rocket"
    );
}

#[test]
fn test_model_fields() {
    let src = "model User { Name string \"json:\\\"name\\\"\"; *Meta }";
    let idl = parse_clean(src);

    assert_eq!(idl.models.len(), 1);
    let model = &idl.models[0];
    assert_eq!(model.name.name, "User");
    assert_eq!(model.spec.fields.len(), 2);

    let first = &model.spec.fields[0];
    assert_eq!(first.name.name, "Name");
    assert!(matches!(&first.typ, IType::Ref(r) if r.base.name.name == "string"));
    assert_eq!(
        first.tag.as_ref().unwrap().lit.value,
        "\"json:\\\"name\\\"\""
    );
    assert!(first.exported);
    assert!(!first.embedded);

    let second = &model.spec.fields[1];
    assert_eq!(second.name.name, "Meta");
    match &second.typ {
        IType::Pointer(p) => {
            assert_eq!(p.base.name.name, "*Meta");
            assert!(matches!(&p.base_type, IType::Ref(r) if r.base.name.name == "Meta"));
        }
        other => panic!("expected pointer type, got {:?}", other),
    }
    assert!(second.exported);
    assert!(second.embedded);
}

#[test]
fn test_rest() {
    let src = "rest Get GET \"/a,/b\" { req Req; resp Resp; }";
    let idl = parse_clean(src);

    assert_eq!(idl.rests.len(), 1);
    let rest = &idl.rests[0];
    assert_eq!(rest.name.name, "Get");
    assert_eq!(rest.http_method.name, "GET");
    assert_eq!(rest.str_uri.value, "\"/a,/b\"");
    assert_eq!(rest.uris, vec!["/a".to_string(), "/b".to_string()]);
    assert!(matches!(rest.req.as_ref().unwrap(), IType::Ref(r) if r.base.name.name == "Req"));
    assert!(matches!(rest.resp.as_ref().unwrap(), IType::Ref(r) if r.base.name.name == "Resp"));
}

#[test]
fn test_rest_unknown_method_still_emits_decl() {
    let (idl, errors) = parse("rest Bad XYZ \"/\" {}");
    assert_eq!(error_messages(&errors), vec!["unknown http method XYZ"]);
    assert_eq!(idl.rests.len(), 1);
    assert_eq!(idl.rests[0].http_method.name, "XYZ");
    assert_eq!(idl.rests[0].uris, vec!["/".to_string()]);
}

#[test]
fn test_ws() {
    let src = "ws Feed UP 1 { Payload string; }";
    let idl = parse_clean(src);

    assert_eq!(idl.wss.len(), 1);
    let ws = &idl.wss[0];
    assert_eq!(ws.name.name, "Feed");
    assert_eq!(ws.direction.name, "UP");
    assert_eq!(ws.msg_kind.kind, Token::INT);
    assert_eq!(ws.msg_kind.value, "1");
    match &ws.msg {
        IType::Model(m) => {
            assert!(m.anonymous);
            assert_eq!(m.fields.len(), 1);
            assert_eq!(m.fields[0].name.name, "Payload");
        }
        other => panic!("expected anonymous model, got {:?}", other),
    }
}

#[test]
fn test_grpc() {
    let idl = parse_clean("grpc Ping { req PingReq; resp PingResp; }");
    assert_eq!(idl.grpcs.len(), 1);
    let grpc = &idl.grpcs[0];
    assert_eq!(grpc.name.name, "Ping");
    assert!(grpc.req.is_some());
    assert!(grpc.resp.is_some());
}

#[test]
fn test_service_body_skipped_with_nesting() {
    let src = "service S { anything { nested { deeper } } tail };";
    let idl = parse_clean(src);
    assert_eq!(idl.services.len(), 1);
    assert_eq!(idl.services[0].name.name, "S");
    let expr = String::from_utf8(idl.services[0].decl.expr.clone()).unwrap();
    assert!(expr.ends_with('}'), "expr should span the body: {:?}", expr);
}

#[test]
fn test_raw_block() {
    let src = "raw { arbitrary 123 { nested } tokens }";
    let idl = parse_clean(src);
    assert_eq!(idl.raws.len(), 1);
    assert_eq!(idl.raws[0].decl.expr, src.as_bytes());
}

#[test]
fn test_decorator_stub() {
    let (idl, errors) = parse("@ Route\nmodel M {};");
    assert!(errors.is_empty(), "{}", errors);
    assert_eq!(idl.decorators.len(), 1);
    assert_eq!(idl.decorators[0].decl.expr, b"@");
    // the content after the sigil is skipped at top level
    assert_eq!(idl.models.len(), 1);
}

// ----------------------------------------------------------------------------
// Types

#[test]
fn test_type_forms() {
    let src = "model M {\n\
               A []string;\n\
               B map[string]User;\n\
               C interface{};\n\
               D pkg.Type;\n\
               E *User;\n\
               F { X int; };\n\
               };";
    let idl = parse_clean(src);
    let fields = &idl.models[0].spec.fields;
    assert_eq!(fields.len(), 6);

    assert!(matches!(&fields[0].typ, IType::Array(a) if a.base.name.name == "[]string"));
    assert!(
        matches!(&fields[1].typ, IType::Map(m) if m.base.name.name == "map[string]User")
    );
    assert!(matches!(&fields[2].typ, IType::Interface(_)));
    match &fields[3].typ {
        IType::Ref(r) => {
            assert_eq!(r.base.name.name, "pkg.Type");
            assert_eq!(r.package.as_ref().unwrap().name, "pkg");
        }
        other => panic!("expected type ref, got {:?}", other),
    }
    assert!(matches!(&fields[4].typ, IType::Pointer(_)));
    match &fields[5].typ {
        IType::Model(m) => {
            assert!(m.anonymous);
            assert_eq!(m.fields[0].name.name, "X");
        }
        other => panic!("expected anonymous model, got {:?}", other),
    }
}

#[test]
fn test_embedded_reference_fields() {
    let src = "model M { Base; pkg.Other; Tagged \"json:\\\"t\\\"\"; };";
    let idl = parse_clean(src);
    let fields = &idl.models[0].spec.fields;
    assert_eq!(fields.len(), 3);
    for field in fields {
        assert!(field.embedded, "field {} should be embedded", field.name.name);
    }
    assert_eq!(fields[1].name.name, "pkg");
    assert!(matches!(&fields[1].typ, IType::Ref(r) if r.base.name.name == "pkg.Other"));
    assert!(fields[2].tag.is_some());
}

// ----------------------------------------------------------------------------
// Comments

#[test]
fn test_lead_comment_becomes_doc() {
    let idl = parse_clean("// c\nmodel M{};");
    let model = &idl.models[0];
    let doc = model.doc.as_ref().expect("model should carry a doc");
    assert_eq!(doc.list.len(), 1);
    assert_eq!(doc.list[0].text, "// c");
    assert!(model.comment.is_none());
}

#[test]
fn test_line_comment_becomes_comment() {
    let idl = parse_clean("model M{}; // c");
    let model = &idl.models[0];
    assert!(model.doc.is_none());
    let comment = model.comment.as_ref().expect("model should carry a comment");
    assert_eq!(comment.list[0].text, "// c");
}

#[test]
fn test_comment_groups_merge_across_one_blank_line() {
    let idl = parse_clean("// a\n\n// b\nmodel M{};");
    // one blank line does not break the group; the whole group is the doc
    assert_eq!(idl.comments.len(), 1);
    let doc = idl.models[0].doc.as_ref().unwrap();
    assert_eq!(doc.list.len(), 2);
    assert_eq!(doc.list[0].text, "// a");
    assert_eq!(doc.list[1].text, "// b");
}

#[test]
fn test_comment_groups_break_on_two_blank_lines() {
    let idl = parse_clean("// far\n\n\n// near\nmodel M{};");
    assert_eq!(idl.comments.len(), 2);
    let doc = idl.models[0].doc.as_ref().unwrap();
    assert_eq!(doc.list.len(), 1);
    assert_eq!(doc.list[0].text, "// near");
}

#[test]
fn test_trailing_comment_on_rest() {
    let idl = parse_clean("rest Get GET \"/a\" { req Req; } // trailing");
    let rest = &idl.rests[0];
    let comment = rest.comment.as_ref().expect("rest should carry a comment");
    assert_eq!(comment.list[0].text, "// trailing");
    let expr = String::from_utf8(rest.decl.expr.clone()).unwrap();
    assert!(expr.ends_with("// trailing"), "expr: {:?}", expr);
}

#[test]
fn test_doc_comment_on_rest() {
    let idl = parse_clean("// fetches one user\nrest Get GET \"/a\" { req Req; }");
    let rest = &idl.rests[0];
    let doc = rest.doc.as_ref().expect("rest should carry a doc");
    assert_eq!(doc.list[0].text, "// fetches one user");
    let expr = String::from_utf8(rest.decl.expr.clone()).unwrap();
    assert!(expr.starts_with("// fetches one user"), "expr: {:?}", expr);
}

#[test]
fn test_trailing_comment_on_grpc() {
    let idl = parse_clean("grpc Ping { req A; } // keepalive");
    let grpc = &idl.grpcs[0];
    assert_eq!(grpc.comment.as_ref().unwrap().list[0].text, "// keepalive");
    let expr = String::from_utf8(grpc.decl.expr.clone()).unwrap();
    assert!(expr.ends_with("// keepalive"), "expr: {:?}", expr);
}

#[test]
fn test_trailing_comment_on_grouped_import() {
    let idl = parse_clean("import ( \"a\" ); // deps");
    let import = &idl.imports[0];
    assert_eq!(import.comment.as_ref().unwrap().list[0].text, "// deps");
    let expr = String::from_utf8(import.decl.expr.clone()).unwrap();
    assert!(expr.ends_with("// deps"), "expr: {:?}", expr);
}

#[test]
fn test_trailing_comment_on_ws_and_raw() {
    let idl = parse_clean("ws Feed UP 1 Event; // push\nraw { x } // passthrough");
    let ws = &idl.wss[0];
    assert_eq!(ws.comment.as_ref().unwrap().list[0].text, "// push");
    let ws_expr = String::from_utf8(ws.decl.expr.clone()).unwrap();
    assert!(ws_expr.ends_with("// push"), "expr: {:?}", ws_expr);

    let raw = &idl.raws[0];
    assert_eq!(raw.comment.as_ref().unwrap().list[0].text, "// passthrough");
    let raw_expr = String::from_utf8(raw.decl.expr.clone()).unwrap();
    assert!(raw_expr.ends_with("// passthrough"), "expr: {:?}", raw_expr);
}

#[test]
fn test_decorator_comments() {
    let idl = parse_clean("// marker\n@ // inline\nmodel M {};");
    let dec = &idl.decorators[0];
    assert_eq!(dec.doc.as_ref().unwrap().list[0].text, "// marker");
    assert_eq!(dec.comment.as_ref().unwrap().list[0].text, "// inline");
    let expr = String::from_utf8(dec.decl.expr.clone()).unwrap();
    assert!(expr.starts_with("// marker"), "expr: {:?}", expr);
    assert!(expr.ends_with("// inline"), "expr: {:?}", expr);
}

#[test]
fn test_doc_extends_decl_expr() {
    let src = "// doc\nmodel M{};";
    let idl = parse_clean(src);
    let expr = String::from_utf8(idl.models[0].decl.expr.clone()).unwrap();
    assert!(expr.starts_with("// doc"), "expr: {:?}", expr);
    assert!(expr.contains("model M{}"));
}

#[test]
fn test_comment_only_file() {
    let (idl, errors) = parse("// one\n\n\n/* two */\n");
    assert!(errors.is_empty(), "{}", errors);
    assert!(idl.decls.is_empty());
    assert_eq!(idl.comments.len(), 2);
}

// ----------------------------------------------------------------------------
// Boundary behaviors

#[test]
fn test_empty_file() {
    let (idl, errors) = parse("");
    assert!(errors.is_empty());
    assert!(idl.decls.is_empty());
    assert!(idl.comments.is_empty());
}

#[test]
fn test_unknown_top_level_tokens_are_skipped() {
    let (idl, errors) = parse("123 ; foo model M {};");
    assert!(errors.is_empty(), "{}", errors);
    assert_eq!(idl.models.len(), 1);
    assert_eq!(idl.decls.len(), 1);
}

// ----------------------------------------------------------------------------
// Diagnostics

#[test]
fn test_invalid_import_path() {
    let (_, errors) = parse("import \"a b\";");
    assert_eq!(error_messages(&errors), vec!["invalid import path: \"a b\""]);
}

#[test]
fn test_illegal_basic_value() {
    let (idl, errors) = parse("syntax = foo;");
    assert_eq!(error_messages(&errors), vec!["illegal basic type value"]);
    // the declaration is still emitted for recovery
    assert_eq!(idl.assigns.len(), 1);
}

#[test]
fn test_comma_for_semicolon_is_tolerated_with_error() {
    let (idl, errors) = parse("syntax = \"v1\",");
    assert_eq!(error_messages(&errors), vec!["expected ';'"]);
    assert_eq!(idl.assigns.len(), 1);
}

#[test]
fn test_duplicated_rest_field() {
    let (idl, errors) = parse("rest R GET \"/\" { req A; req B; }");
    assert_eq!(error_messages(&errors), vec!["duplicated rest field: req"]);
    // the first entry wins
    assert!(
        matches!(idl.rests[0].req.as_ref().unwrap(), IType::Ref(r) if r.base.name.name == "A")
    );
}

#[test]
fn test_unknown_rest_field() {
    let (_, errors) = parse("rest R GET \"/\" { foo A; resp B; }");
    assert_eq!(error_messages(&errors), vec!["unknown field for rest: foo"]);
}

#[test]
fn test_unknown_grpc_field() {
    let (_, errors) = parse("grpc G { body A; }");
    assert_eq!(error_messages(&errors), vec!["unknown field for grpc: body"]);
}

#[test]
fn test_mixed_rest_request_fields() {
    let (_, errors) = parse("rest R GET \"/\" { req { Header {}; Name string; }; }");
    assert_eq!(
        error_messages(&errors),
        vec!["mixed merged and separated rest request fields"]
    );

    // all reserved names: fine
    let (_, errors) = parse("rest R GET \"/\" { req { Header {}; Body {}; }; }");
    assert!(errors.is_empty(), "{}", errors);

    // no reserved names: fine
    let (_, errors) = parse("rest R GET \"/\" { req { Name string; Age int; }; }");
    assert!(errors.is_empty(), "{}", errors);
}

#[test]
fn test_unknown_ws_direction() {
    let (idl, errors) = parse("ws W SIDEWAYS 1 T;");
    assert_eq!(error_messages(&errors), vec!["unknown ws direction SIDEWAYS"]);
    assert_eq!(idl.wss.len(), 1);
}

#[test]
fn test_errors_carry_positions() {
    let (_, errors) = parse("rest Bad XYZ \"/\" {}");
    let list = errors.borrow();
    let pos = list[0].pos.as_ref().unwrap();
    assert_eq!(pos.offset, 9); // the method token
    assert_eq!(pos.line_no, 1);
    assert_eq!(list[0].to_string(), "demo.gidl:LINE1 unknown http method XYZ");
}

// ----------------------------------------------------------------------------
// Structural properties

const FULL_SOURCE: &str = "syntax = \"v1\";\n\
                           import \"github.com/acme/base\";\n\
                           // a user record\n\
                           model User { Name string; Age int; };\n\
                           service Users { anything };\n\
                           rest GetUser GET \"/users\" { req UserReq; resp UserResp; }\n\
                           grpc Sync { req SyncReq; resp SyncResp; }\n\
                           ws Feed UP 1 UserEvent;\n\
                           raw { passthrough }\n";

#[test]
fn test_decls_cover_all_declarations_in_source_order() {
    let idl = parse_clean(FULL_SOURCE);

    let typed_total = idl.assigns.len()
        + idl.imports.len()
        + idl.models.len()
        + idl.services.len()
        + idl.rests.len()
        + idl.grpcs.len()
        + idl.wss.len()
        + idl.raws.len()
        + idl.decorators.len();
    assert_eq!(idl.decls.len(), typed_total);

    let kinds: Vec<&str> = idl
        .decls
        .iter()
        .map(|d| match d {
            IDecl::Assignment(_) => "assign",
            IDecl::Import(_) => "import",
            IDecl::Model(_) => "model",
            IDecl::Service(_) => "service",
            IDecl::Rest(_) => "rest",
            IDecl::Grpc(_) => "grpc",
            IDecl::Ws(_) => "ws",
            IDecl::Raw(_) => "raw",
            IDecl::Decorator(_) => "decorator",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["assign", "import", "model", "service", "rest", "grpc", "ws", "raw"]
    );

    // source order: strictly increasing start offsets
    for pair in idl.decls.windows(2) {
        assert!(pair[0].pos().offset < pair[1].pos().offset);
    }
}

#[test]
fn test_decl_expr_matches_source_slice() {
    let src = FULL_SOURCE;
    let idl = parse_clean(src);
    for decl in &idl.decls {
        let expr = decl.expr();
        assert!(!expr.is_empty());
        // the stored slice must occur in the source at the declaration
        let hay = src.as_bytes();
        let found = hay
            .windows(expr.len())
            .position(|w| w == expr)
            .expect("expr must be a contiguous source slice");
        assert!(found <= decl.pos().offset);
    }
}

#[test]
fn test_decl_positions_are_bounded() {
    let idl = parse_clean(FULL_SOURCE);
    for decl in &idl.decls {
        assert!(decl.pos().offset <= FULL_SOURCE.len());
        assert!(decl.end().offset <= FULL_SOURCE.len());
        assert!(decl.pos().offset <= decl.end().offset);
    }
}

#[test]
fn test_rescanning_decl_expr_roundtrips() {
    let idl = parse_clean(FULL_SOURCE);
    for decl in &idl.decls {
        let expr = decl.expr().to_vec();
        let rescan = scan_tokens(&expr);
        assert!(!rescan.is_empty());
        // the re-scan starts with the declaration keyword (or its doc
        // comment) and produces no stray tokens past the end
        let direct_src = &FULL_SOURCE.as_bytes()
            [decl.pos().offset..(decl.end().offset + 1).min(FULL_SOURCE.len())];
        let direct = scan_tokens(direct_src);
        let tail = rescan.len() - direct.len();
        assert_eq!(&rescan[tail..], &direct[..], "expr: {:?}", String::from_utf8_lossy(&expr));
    }
}

#[test]
fn test_bom_idempotence() {
    let plain = FULL_SOURCE.to_string();
    let bommed = format!("\u{feff}{}", FULL_SOURCE);

    assert_eq!(scan_tokens(plain.as_bytes()), scan_tokens(bommed.as_bytes()));

    let (idl_a, err_a) = parse(&plain);
    let (idl_b, err_b) = parse(&bommed);
    assert!(err_a.is_empty() && err_b.is_empty());
    assert_eq!(structure(&idl_a), structure(&idl_b));
}

#[test]
fn test_crlf_idempotence() {
    let lf = FULL_SOURCE.to_string();
    let crlf = lf.replace('\n', "\r\n");

    assert_eq!(scan_tokens(lf.as_bytes()), scan_tokens(crlf.as_bytes()));

    let (idl_a, err_a) = parse(&lf);
    let (idl_b, err_b) = parse(&crlf);
    assert!(err_a.is_empty() && err_b.is_empty());
    assert_eq!(structure(&idl_a), structure(&idl_b));
}

/// A positionless digest of the AST, for comparing parses of reflowed
/// sources.
fn structure(idl: &IdlFile) -> Vec<String> {
    idl.decls
        .iter()
        .map(|d| match d {
            IDecl::Assignment(a) => format!("assign {}={}", a.spec.name.name, a.spec.value.value),
            IDecl::Import(i) => format!(
                "import {}",
                i.specs
                    .iter()
                    .map(|s| s.path.value.clone())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            IDecl::Model(m) => format!(
                "model {} [{}]",
                m.name.name,
                m.spec
                    .fields
                    .iter()
                    .map(|f| f.name.name.clone())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            IDecl::Service(s) => format!("service {}", s.name.name),
            IDecl::Rest(r) => format!(
                "rest {} {} {}",
                r.name.name,
                r.http_method.name,
                r.uris.join(",")
            ),
            IDecl::Grpc(g) => format!("grpc {}", g.name.name),
            IDecl::Ws(w) => format!("ws {} {} {}", w.name.name, w.direction.name, w.msg_kind.value),
            IDecl::Raw(_) => "raw".to_string(),
            IDecl::Decorator(_) => "decorator".to_string(),
        })
        .collect()
}

#[test]
fn test_help_texts() {
    let idl = parse_clean(FULL_SOURCE);
    for decl in &idl.decls {
        assert!(decl.help().starts_with("format:"));
    }
}
