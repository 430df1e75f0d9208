//! Statement and declaration parsing.

use lngc_lex::TokenKind;

use crate::ast::{BinaryOp, Node, NodeKind, Param};
use crate::{ParseError, Parser};

impl Parser {
    /// Parse a statement.
    pub(crate) fn statement(&mut self) -> Result<Node, ParseError> {
        match self.current().kind {
            TokenKind::Let => self.let_statement(),
            TokenKind::LBrace => self.block_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Ident(_) => {
                if self.peek().kind == TokenKind::LParen {
                    let node = self.function_call()?;
                    self.expect(TokenKind::Semicolon)?;
                    Ok(node)
                } else {
                    self.assign_statement()
                }
            },
            _ => Err(self.unexpected()),
        }
    }

    /// `let IDENT ['=' expression] ';'`
    pub(crate) fn let_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::Let)?;
        let (name, _) = self.expect_ident()?;

        let value = if self.check(&TokenKind::Assign) {
            self.advance();
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(position, NodeKind::Let { name, value }))
    }

    /// `fn IDENT '(' [ IDENT {',' IDENT} ] ')' statement`
    pub(crate) fn fn_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::Fn)?;
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let (param, param_position) = self.expect_ident()?;
            params.push(Param {
                position: param_position,
                name: param,
            });

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;
        let body = self.statement()?;

        Ok(Node::new(
            position,
            NodeKind::Fn {
                name,
                params,
                body: Box::new(body),
            },
        ))
    }

    /// `'{' { statement } '}'`
    ///
    /// A `return` may only be followed by the closing brace; anything
    /// after it in the same block is unreachable and rejected.
    pub(crate) fn block_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let node = self.statement()?;
            let was_return = matches!(node.kind, NodeKind::Return(_));
            body.push(node);

            if was_return && !self.check(&TokenKind::RBrace) {
                return Err(ParseError::UnreachableStatement {
                    position: self.current().position.clone(),
                });
            }
        }

        self.expect(TokenKind::RBrace)?;

        Ok(Node::new(position, NodeKind::Block(body)))
    }

    /// `if condition statement ['else' statement]`
    pub(crate) fn if_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::If)?;
        let condition = self.condition()?;
        let then_body = self.statement()?;

        let else_body = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Node::new(
            position,
            NodeKind::If {
                condition: Box::new(condition),
                then_body: Box::new(then_body),
                else_body,
            },
        ))
    }

    /// `while condition statement`
    pub(crate) fn while_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::While)?;
        let condition = self.condition()?;
        let body = self.statement()?;

        Ok(Node::new(
            position,
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
        ))
    }

    /// `do statement while condition ';'`
    pub(crate) fn do_while_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::Do)?;
        let body = self.statement()?;
        self.expect(TokenKind::While)?;
        let condition = self.condition()?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(
            position,
            NodeKind::DoWhile {
                condition: Box::new(condition),
                body: Box::new(body),
            },
        ))
    }

    /// `return expression ';'`
    pub(crate) fn return_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::Return)?;
        let value = self.expression()?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(position, NodeKind::Return(Box::new(value))))
    }

    /// `IDENT ('='|'+='|'-='|'*='|'/=') expression ';'`
    ///
    /// Compound assignment lowers to a plain assignment whose value is
    /// the matching binary operation on the target.
    pub(crate) fn assign_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();
        let (name, _) = self.expect_ident()?;

        let compound = match self.current().kind {
            TokenKind::Assign => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Sub),
            TokenKind::StarEq => Some(BinaryOp::Mul),
            TokenKind::SlashEq => Some(BinaryOp::Div),
            _ => {
                return Err(ParseError::Expected {
                    expected: "= += -= *= or /=".to_string(),
                    position,
                });
            },
        };
        self.advance();

        let value = match compound {
            None => self.expression()?,
            Some(op) => Node::new(
                position.clone(),
                NodeKind::Binary {
                    op,
                    left: Box::new(Node::new(
                        position.clone(),
                        NodeKind::Identifier(name.clone()),
                    )),
                    right: Box::new(self.expression()?),
                },
            ),
        };

        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(
            position,
            NodeKind::Assign {
                name,
                value: Box::new(value),
            },
        ))
    }

    /// `'(' expression ')'` as used by `if`, `while`, and `do`.
    pub(crate) fn condition(&mut self) -> Result<Node, ParseError> {
        self.expect(TokenKind::LParen)?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(condition)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, NodeKind};
    use crate::parse_source;

    fn parse_stmts(body: &str) -> Vec<NodeKind> {
        let source = format!("fn main() {{ {} }}", body);
        let ast = parse_source(&source).expect("parse failed");
        match &ast[0].kind {
            NodeKind::Fn { body, .. } => match &body.kind {
                NodeKind::Block(stmts) => stmts.iter().map(|n| n.kind.clone()).collect(),
                other => panic!("expected block, got {:?}", other),
            },
            other => panic!("expected fn, got {:?}", other),
        }
    }

    #[test]
    fn test_let_without_value() {
        let stmts = parse_stmts("let x;");
        assert!(matches!(
            &stmts[0],
            NodeKind::Let { name, value: None } if name == "x"
        ));
    }

    #[test]
    fn test_let_with_value() {
        let stmts = parse_stmts("let x = 1;");
        assert!(matches!(
            &stmts[0],
            NodeKind::Let { name, value: Some(_) } if name == "x"
        ));
    }

    #[test]
    fn test_if_else() {
        let stmts = parse_stmts("if (1) { } else { }");
        assert!(matches!(
            &stmts[0],
            NodeKind::If { else_body: Some(_), .. }
        ));
    }

    #[test]
    fn test_if_without_else() {
        let stmts = parse_stmts("if (1) { }");
        assert!(matches!(&stmts[0], NodeKind::If { else_body: None, .. }));
    }

    #[test]
    fn test_while() {
        let stmts = parse_stmts("while (1) { }");
        assert!(matches!(&stmts[0], NodeKind::While { .. }));
    }

    #[test]
    fn test_do_while() {
        let stmts = parse_stmts("do { } while (0);");
        assert!(matches!(&stmts[0], NodeKind::DoWhile { .. }));
    }

    #[test]
    fn test_compound_assignment_lowering() {
        let stmts = parse_stmts("let i = 0; i += 2;");
        match &stmts[1] {
            NodeKind::Assign { name, value } => {
                assert_eq!(name, "i");
                match &value.kind {
                    NodeKind::Binary { op, left, .. } => {
                        assert_eq!(*op, BinaryOp::Add);
                        assert!(matches!(&left.kind, NodeKind::Identifier(n) if n == "i"));
                    },
                    other => panic!("expected binary value, got {:?}", other),
                }
            },
            other => panic!("expected assign, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_operator_required() {
        let source = "fn main() { x < 1; }";
        let err = parse_source(source).unwrap_err();
        assert_eq!(err.to_string(), "\"= += -= *= or /=\" expected");
    }

    #[test]
    fn test_call_statement() {
        let stmts = parse_stmts("write(1);");
        assert!(matches!(&stmts[0], NodeKind::Call { name, .. } if name == "write"));
    }

    #[test]
    fn test_unreachable_statement_after_return() {
        let err = parse_source("fn main() { return 0; let x; }").unwrap_err();
        assert_eq!(err.to_string(), "unreachable statement");
    }

    #[test]
    fn test_return_directly_before_closing_brace_is_fine() {
        let stmts = parse_stmts("return 0;");
        assert!(matches!(&stmts[0], NodeKind::Return(_)));
    }

    #[test]
    fn test_fn_params() {
        let ast = parse_source("fn add(a, b) { return a + b; }").expect("parse failed");
        match &ast[0].kind {
            NodeKind::Fn { name, params, .. } => {
                assert_eq!(name, "add");
                let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["a", "b"]);
            },
            other => panic!("expected fn, got {:?}", other),
        }
    }
}
