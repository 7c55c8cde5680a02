//! Canonical serialization of a [`Module`] back to Python source.

use super::{Module, Stmt};

const INDENT: &str = "    ";

/// Serialize a module.
///
/// Output uses four-space indentation and one statement per line. Every
/// `def`/`class` that is not the first statement of its block is preceded
/// by a blank line. An empty block is written as `pass` so the output always
/// parses. Non-empty output ends with a newline.
///
/// # Examples
///
/// ```
/// use husk::syntax::{parse, unparse};
///
/// let module = parse("x = 1  # one\nif x:\n  y = 2\n").unwrap();
/// assert_eq!(unparse(&module), "x = 1\nif x:\n    y = 2\n");
/// ```
pub fn unparse(module: &Module) -> String {
    let mut out = String::new();
    write_statements(&mut out, &module.body, 0);
    out
}

fn write_block(out: &mut String, body: &[Stmt], depth: usize) {
    if body.is_empty() {
        write_line(out, "pass", depth);
    } else {
        write_statements(out, body, depth);
    }
}

fn write_statements(out: &mut String, body: &[Stmt], depth: usize) {
    for (index, stmt) in body.iter().enumerate() {
        if index > 0 && matches!(stmt, Stmt::FunctionDef(_) | Stmt::ClassDef(_)) {
            out.push('\n');
        }
        write_statement(out, stmt, depth);
    }
}

fn write_statement(out: &mut String, stmt: &Stmt, depth: usize) {
    match stmt {
        Stmt::FunctionDef(func) => {
            for decorator in &func.decorators {
                write_line(out, decorator, depth);
            }
            write_header(out, &func.signature, depth);
            write_block(out, &func.body, depth + 1);
        }
        Stmt::ClassDef(class) => {
            for decorator in &class.decorators {
                write_line(out, decorator, depth);
            }
            write_header(out, &class.header, depth);
            write_block(out, &class.body, depth + 1);
        }
        Stmt::Compound(compound) => {
            for clause in &compound.clauses {
                write_header(out, &clause.header, depth);
                write_block(out, &clause.body, depth + 1);
            }
        }
        Stmt::Expr(expr) => write_line(out, expr.text(), depth),
        Stmt::Pass => write_line(out, "pass", depth),
        Stmt::Other(text) => write_line(out, text, depth),
    }
}

fn write_header(out: &mut String, header: &str, depth: usize) {
    write_indent(out, depth);
    out.push_str(header);
    out.push_str(":\n");
}

/// Only the first line is re-indented. Continuation lines sit inside
/// brackets, strings or after a backslash, where indentation is either
/// insignificant or part of the value.
fn write_line(out: &mut String, text: &str, depth: usize) {
    write_indent(out, depth);
    out.push_str(text);
    out.push('\n');
}

fn write_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
