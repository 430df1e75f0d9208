//! AST pretty-printer.
//!
//! Renders an AST back to parseable source text. The printer fully
//! parenthesizes nested expressions, so operator structure survives the
//! round trip: pretty-printing an AST and re-parsing the result yields a
//! structurally equal AST.

use crate::ast::{Ast, Node, NodeKind, UnaryOp};

/// Render a whole program.
pub fn pretty_print(ast: &Ast) -> String {
    let mut printer = Printer::new();
    for (index, declaration) in ast.iter().enumerate() {
        if index > 0 {
            printer.out.push('\n');
        }
        printer.stmt(declaration);
    }
    printer.out
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Print a statement body: blocks stay at the current level, single
    /// statements are indented under their header.
    fn body(&mut self, node: &Node) {
        if matches!(node.kind, NodeKind::Block(_)) {
            self.stmt(node);
        } else {
            self.indent += 1;
            self.stmt(node);
            self.indent -= 1;
        }
    }

    fn stmt(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Let { name, value } => match value {
                Some(value) => {
                    let value = self.expr(value);
                    self.line(&format!("let {} = {};", name, value));
                },
                None => self.line(&format!("let {};", name)),
            },
            NodeKind::Assign { name, value } => {
                let value = self.expr(value);
                self.line(&format!("{} = {};", name, value));
            },
            NodeKind::Block(statements) => {
                self.line("{");
                self.indent += 1;
                for statement in statements {
                    self.stmt(statement);
                }
                self.indent -= 1;
                self.line("}");
            },
            NodeKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.expr(condition);
                self.line(&format!("if ({})", condition));
                self.body(then_body);
                if let Some(else_body) = else_body {
                    self.line("else");
                    self.body(else_body);
                }
            },
            NodeKind::While { condition, body } => {
                let condition = self.expr(condition);
                self.line(&format!("while ({})", condition));
                self.body(body);
            },
            NodeKind::DoWhile { condition, body } => {
                self.line("do");
                self.body(body);
                let condition = self.expr(condition);
                self.line(&format!("while ({});", condition));
            },
            NodeKind::Fn { name, params, body } => {
                let params: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                self.line(&format!("fn {}({})", name, params.join(", ")));
                self.body(body);
            },
            NodeKind::Return(value) => {
                let value = self.expr(value);
                self.line(&format!("return {};", value));
            },
            NodeKind::Call { .. } => {
                let call = self.expr(node);
                self.line(&format!("{};", call));
            },
            // Expressions cannot appear in statement position, but the
            // printer stays total.
            other => {
                let rendered = self.expr(&Node::new(node.position.clone(), other.clone()));
                self.line(&rendered);
            },
        }
    }

    fn expr(&mut self, node: &Node) -> String {
        match &node.kind {
            NodeKind::Int(value) => value.to_string(),
            NodeKind::Float(value) => format_float(*value),
            NodeKind::Str(value) => format!("\"{}\"", escape_string(value)),
            NodeKind::Nil => "nil".to_string(),
            NodeKind::Identifier(name) => name.clone(),
            NodeKind::Unary { op, operand } => {
                let operand_text = self.expr(operand);
                // `-`, `+`, and `~` apply to a factor, so anything wider
                // needs parentheses; `!` already consumes a whole
                // expression.
                let needs_parens = *op != UnaryOp::Not
                    && matches!(operand.kind, NodeKind::Binary { .. });
                if needs_parens {
                    format!("{}({})", op.lexeme(), operand_text)
                } else {
                    format!("{}{}", op.lexeme(), operand_text)
                }
            },
            NodeKind::Binary { op, left, right } => {
                let left = self.expr(left);
                let right = self.expr(right);
                format!("({} {} {})", left, op.lexeme(), right)
            },
            NodeKind::Call { name, args } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                format!("{}({})", name, args.join(", "))
            },
            NodeKind::List(values) => {
                let values: Vec<String> = values.iter().map(|v| self.expr(v)).collect();
                format!("[{}]", values.join(", "))
            },
            NodeKind::ListAccess { list, index } => {
                let list = self.expr(list);
                let index = self.expr(index);
                format!("{}[{}]", list, index)
            },
            // Statements have no expression rendering; emit their
            // statement form inline so the printer stays total.
            other => format!("<{:?}>", other),
        }
    }
}

fn format_float(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{}.0", text)
    }
}

fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\x07' => escaped.push_str("\\a"),
            '\x08' => escaped.push_str("\\b"),
            '\x0B' => escaped.push_str("\\v"),
            '\x0C' => escaped.push_str("\\f"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;

    /// Parse, pretty-print, re-parse, and compare structurally.
    fn assert_round_trip(source: &str) {
        let ast = parse_source(source).expect("first parse failed");
        let printed = pretty_print(&ast);
        let reparsed = parse_source(&printed)
            .unwrap_or_else(|e| panic!("re-parse failed: {}\n--- printed ---\n{}", e, printed));
        assert_eq!(ast, reparsed, "round trip changed AST:\n{}", printed);
    }

    #[test]
    fn test_round_trip_hello_world() {
        assert_round_trip("fn main() { write(\"hi\"); return 0; }");
    }

    #[test]
    fn test_round_trip_arithmetic() {
        assert_round_trip("fn main() { write(1 + 2 * 3 - 4 / 5); return 0; }");
    }

    #[test]
    fn test_round_trip_precedence_mix() {
        assert_round_trip("fn main() { return 1 | 2 ^ 3 & 4 << 5 && 6 == 7 + 8 * 9; }");
    }

    #[test]
    fn test_round_trip_unary() {
        assert_round_trip("fn main() { return -1 + ~2 + -(3 + 4); }");
        assert_round_trip("fn main() { return !0; }");
        assert_round_trip("fn main() { return !(1 + 2); }");
    }

    #[test]
    fn test_round_trip_control_flow() {
        assert_round_trip(
            "fn main() {
                let i = 0;
                while (i < 3) { write(i); i += 1; }
                if (i == 3) { write(\"done\"); } else write(\"odd\");
                do { i -= 1; } while (i > 0);
                return 0;
            }",
        );
    }

    #[test]
    fn test_round_trip_functions_and_globals() {
        assert_round_trip(
            "let limit = 10;
            fn fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }
            fn main() { write(fact(limit)); return 0; }",
        );
    }

    #[test]
    fn test_round_trip_lists() {
        assert_round_trip(
            "fn main() {
                let xs = [1, 2.5, \"three\", [4]];
                append(xs, 5);
                write(xs[3][0]);
                return length(xs);
            }",
        );
    }

    #[test]
    fn test_round_trip_string_escapes() {
        assert_round_trip("fn main() { write(\"a\\nb\\t\\\"c\\\"\\\\d\"); return 0; }");
    }

    #[test]
    fn test_round_trip_let_without_value() {
        assert_round_trip("let g; fn main() { let x; return 0; }");
    }

    #[test]
    fn test_float_formatting_keeps_dot() {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(2.5), "2.5");
    }
}
