//! Lowering from the tree-sitter concrete tree into [`Module`].

use std::ops::Range;

use smallvec::SmallVec;
use tree_sitter::Node;

use super::{Clause, ClassDef, Compound, Expr, FunctionDef, Module, Stmt};

/// Node kinds that introduce a further `header:` block inside a compound
/// statement.
const CLAUSE_KINDS: &[&str] = &[
    "elif_clause",
    "else_clause",
    "except_clause",
    "except_group_clause",
    "finally_clause",
];

const COMPOUND_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "with_statement",
    "match_statement",
    "case_clause",
];

/// Source text plus the byte ranges of every comment in it.
struct Source<'a> {
    text: &'a str,
    comments: Vec<Range<usize>>,
}

impl<'a> Source<'a> {
    fn new(root: Node, text: &'a str) -> Self {
        Self {
            text,
            comments: collect_comments(root),
        }
    }

    /// Slice `start..end` with comments cut out, trimming the whitespace a
    /// removed trailing comment leaves behind.
    fn clean(&self, start: usize, end: usize) -> String {
        let first = self.comments.partition_point(|c| c.start < start);
        let mut out = String::with_capacity(end.saturating_sub(start));
        let mut pos = start;

        for comment in self.comments[first..].iter().take_while(|c| c.end <= end) {
            out.push_str(&self.text[pos..comment.start]);
            let trimmed = out.trim_end_matches([' ', '\t']).len();
            out.truncate(trimmed);
            pos = comment.end;
        }

        out.push_str(&self.text[pos..end]);
        out.trim().to_string()
    }

    fn node(&self, node: Node) -> String {
        self.clean(node.start_byte(), node.end_byte())
    }
}

/// Comment ranges in document order.
fn collect_comments(root: Node) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        if node.kind() == "comment" {
            ranges.push(node.byte_range());
        } else if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return ranges;
            }
        }
    }
}

pub(super) fn lower_module(root: Node, text: &str) -> Module {
    let source = Source::new(root, text);
    Module {
        body: lower_block(root, &source),
    }
}

fn lower_block(block: Node, source: &Source) -> Vec<Stmt> {
    let mut cursor = block.walk();
    block
        .named_children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "comment" | "line_continuation"))
        .map(|child| lower_statement(child, source))
        .collect()
}

fn lower_statement(node: Node, source: &Source) -> Stmt {
    match node.kind() {
        "function_definition" => Stmt::FunctionDef(lower_function(node, Vec::new(), source)),
        "class_definition" => Stmt::ClassDef(lower_class(node, Vec::new(), source)),
        "decorated_definition" => lower_decorated(node, source),
        "expression_statement" => lower_expression_statement(node, source),
        "pass_statement" => Stmt::Pass,
        kind if COMPOUND_KINDS.contains(&kind) => {
            let mut clauses = SmallVec::new();
            lower_clauses(node, source, &mut clauses);
            Stmt::Compound(Compound { clauses })
        }
        _ => Stmt::Other(source.node(node)),
    }
}

fn lower_decorated(node: Node, source: &Source) -> Stmt {
    let mut cursor = node.walk();
    let decorators: Vec<String> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|c| source.node(c))
        .collect();

    match node.child_by_field_name("definition") {
        Some(def) if def.kind() == "function_definition" => {
            Stmt::FunctionDef(lower_function(def, decorators, source))
        }
        Some(def) if def.kind() == "class_definition" => {
            Stmt::ClassDef(lower_class(def, decorators, source))
        }
        _ => Stmt::Other(source.node(node)),
    }
}

fn lower_function(node: Node, decorators: Vec<String>, source: &Source) -> FunctionDef {
    let is_async = node.children(&mut node.walk()).any(|c| c.kind() == "async");
    let name = node
        .child_by_field_name("name")
        .map(|n| source.node(n))
        .unwrap_or_default();
    let body = node.child_by_field_name("body");

    FunctionDef {
        decorators,
        is_async,
        name,
        signature: header(node, body, source),
        body: body.map(|b| lower_block(b, source)).unwrap_or_default(),
    }
}

fn lower_class(node: Node, decorators: Vec<String>, source: &Source) -> ClassDef {
    let name = node
        .child_by_field_name("name")
        .map(|n| source.node(n))
        .unwrap_or_default();
    let body = node.child_by_field_name("body");

    ClassDef {
        decorators,
        name,
        header: header(node, body, source),
        body: body.map(|b| lower_block(b, source)).unwrap_or_default(),
    }
}

/// Header text from the start of `node` up to the colon that opens `block`.
fn header(node: Node, block: Option<Node>, source: &Source) -> String {
    let limit = block.map_or(node.end_byte(), |b| b.start_byte());
    let end = node
        .children(&mut node.walk())
        .filter(|c| c.kind() == ":" && c.end_byte() <= limit)
        .last()
        .map_or(limit, |c| c.start_byte());
    source.clean(node.start_byte(), end)
}

/// Flatten a compound statement into clauses. Continuation clauses
/// (`elif`, `else`, `except`, `finally`) are nested nodes and are walked
/// recursively so the result reads top to bottom.
fn lower_clauses(node: Node, source: &Source, clauses: &mut SmallVec<[Clause; 2]>) {
    let mut header_start = node.start_byte();
    let mut colon = None;
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();

    for child in children {
        match child.kind() {
            ":" => colon = Some(child.start_byte()),
            "block" => {
                let end = colon.take().unwrap_or(child.start_byte());
                clauses.push(Clause {
                    header: source.clean(header_start, end),
                    body: lower_block(child, source),
                });
                header_start = child.end_byte();
            }
            kind if CLAUSE_KINDS.contains(&kind) => lower_clauses(child, source, clauses),
            _ => {}
        }
    }
}

fn lower_expression_statement(node: Node, source: &Source) -> Stmt {
    let mut cursor = node.walk();
    let named: Vec<Node> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();

    match named.as_slice() {
        [only] if is_text_literal(*only, source.text) => Stmt::Expr(Expr::Str(source.node(node))),
        [only] if matches!(only.kind(), "assignment" | "augmented_assignment") => {
            Stmt::Other(source.node(node))
        }
        _ => Stmt::Expr(Expr::Other(source.node(node))),
    }
}

/// A `str` constant: plain strings and implicit concatenations of them.
/// Byte strings and f-strings are not text constants.
fn is_text_literal(node: Node, text: &str) -> bool {
    match node.kind() {
        "string" => !prefix_of(node, text)
            .chars()
            .any(|c| matches!(c.to_ascii_lowercase(), 'b' | 'f' | 't')),
        "concatenated_string" => {
            let mut cursor = node.walk();
            let parts: Vec<Node> = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .collect();
            !parts.is_empty() && parts.iter().all(|part| is_text_literal(*part, text))
        }
        "parenthesized_expression" => {
            let mut cursor = node.walk();
            let inner: Vec<Node> = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .collect();
            matches!(inner.as_slice(), [only] if is_text_literal(*only, text))
        }
        _ => false,
    }
}

/// The letters before the opening quote, e.g. `rb` in `rb"..."`.
fn prefix_of<'a>(node: Node, text: &'a str) -> &'a str {
    let opening = node
        .child(0)
        .filter(|c| c.kind() == "string_start")
        .map_or_else(|| &text[node.byte_range()], |c| &text[c.byte_range()]);
    let quote = opening.find(['"', '\'']).unwrap_or(opening.len());
    &opening[..quote]
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;

    #[test]
    fn test_decorated_function() {
        let code = "@app.route(\"/\")  # index\n@login_required\ndef index(request):\n    return 1\n";
        let module = parse(code).unwrap();

        match &module.body[0] {
            Stmt::FunctionDef(func) => {
                assert_eq!(func.decorators, vec!["@app.route(\"/\")", "@login_required"]);
                assert_eq!(func.signature, "def index(request)");
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_class_header_keeps_bases() {
        let code = "class Handler(Base, metaclass=Meta):\n    x = 1\n";
        let module = parse(code).unwrap();

        match &module.body[0] {
            Stmt::ClassDef(class) => {
                assert_eq!(class.name, "Handler");
                assert_eq!(class.header, "class Handler(Base, metaclass=Meta)");
                assert_eq!(class.body, vec![Stmt::Other("x = 1".to_string())]);
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn test_multiline_signature_without_comments() {
        let code = "def build(\n    name,  # the name\n    size=3,\n) -> int:\n    pass\n";
        let module = parse(code).unwrap();

        match &module.body[0] {
            Stmt::FunctionDef(func) => {
                assert_eq!(func.signature, "def build(\n    name,\n    size=3,\n) -> int");
                assert_eq!(func.body, vec![Stmt::Pass]);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_try_clauses() {
        let code = "try:\n    import fast\nexcept ImportError as e:\n    fast = None\nfinally:\n    done()\n";
        let module = parse(code).unwrap();

        match &module.body[0] {
            Stmt::Compound(compound) => {
                let headers: Vec<&str> =
                    compound.clauses.iter().map(|c| c.header.as_str()).collect();
                assert_eq!(headers, vec!["try", "except ImportError as e", "finally"]);
                assert_eq!(compound.clauses[2].body, vec![Stmt::Expr(Expr::Other("done()".into()))]);
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn test_match_cases_are_compounds() {
        let code = "match cmd:\n    case \"go\":\n        run()\n    case _:\n        pass\n";
        let module = parse(code).unwrap();

        let Stmt::Compound(outer) = &module.body[0] else {
            panic!("expected match statement");
        };
        assert_eq!(outer.clauses[0].header, "match cmd");
        assert_eq!(outer.clauses[0].body.len(), 2);

        let Stmt::Compound(case) = &outer.clauses[0].body[0] else {
            panic!("expected case clause");
        };
        assert_eq!(case.clauses[0].header, "case \"go\"");
    }

    #[test]
    fn test_parenthesized_string_is_text() {
        let module = parse("(\"doc\")\nrb\"raw\"\n").unwrap();
        assert!(module.body[0].is_docstring());
        assert!(!module.body[1].is_docstring());
    }
}
