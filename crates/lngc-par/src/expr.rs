//! Expression parsing.
//!
//! The precedence ladder, lowest binding first, mirrors the language
//! definition exactly: bitwise or/xor, bitwise and, shifts, logical
//! and/or, comparisons, additive, multiplicative, unary, primary.

use lngc_lex::TokenKind;

use crate::ast::{BinaryOp, Node, NodeKind, UnaryOp};
use crate::{ParseError, Parser};

impl Parser {
    /// Parse an expression, starting at the lowest precedence tier.
    pub(crate) fn expression(&mut self) -> Result<Node, ParseError> {
        self.bitwise_or_xor_expression()
    }

    /// `|` and `^`
    fn bitwise_or_xor_expression(&mut self) -> Result<Node, ParseError> {
        self.binary_tier(
            &[
                (TokenKind::Pipe, BinaryOp::BitOr),
                (TokenKind::Caret, BinaryOp::BitXor),
            ],
            Self::bitwise_and_expression,
        )
    }

    /// `&`
    fn bitwise_and_expression(&mut self) -> Result<Node, ParseError> {
        self.binary_tier(
            &[(TokenKind::Ampersand, BinaryOp::BitAnd)],
            Self::shift_expression,
        )
    }

    /// `<<` and `>>`
    fn shift_expression(&mut self) -> Result<Node, ParseError> {
        self.binary_tier(
            &[
                (TokenKind::Shl, BinaryOp::Shl),
                (TokenKind::Shr, BinaryOp::Shr),
            ],
            Self::and_or_expression,
        )
    }

    /// `&&` and `||`
    fn and_or_expression(&mut self) -> Result<Node, ParseError> {
        self.binary_tier(
            &[
                (TokenKind::AndAnd, BinaryOp::And),
                (TokenKind::OrOr, BinaryOp::Or),
            ],
            Self::comparison_expression,
        )
    }

    /// `==`, `!=`, `<`, `<=`, `>`, `>=`
    fn comparison_expression(&mut self) -> Result<Node, ParseError> {
        self.binary_tier(
            &[
                (TokenKind::EqEq, BinaryOp::Eq),
                (TokenKind::NotEq, BinaryOp::Ne),
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::LtEq, BinaryOp::Le),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::GtEq, BinaryOp::Ge),
            ],
            Self::additive_expression,
        )
    }

    /// `+` and `-`
    fn additive_expression(&mut self) -> Result<Node, ParseError> {
        self.binary_tier(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::multiplicative_expression,
        )
    }

    /// `*` and `/`
    fn multiplicative_expression(&mut self) -> Result<Node, ParseError> {
        self.binary_tier(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
            ],
            Self::factor,
        )
    }

    /// Left-associative chain of binary operations at one precedence tier.
    fn binary_tier(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> Result<Node, ParseError>,
    ) -> Result<Node, ParseError> {
        let mut left = next(self)?;

        loop {
            let op = operators
                .iter()
                .find(|(kind, _)| self.current().kind.same_kind(kind))
                .map(|(_, op)| *op);

            let Some(op) = op else {
                return Ok(left);
            };

            let position = self.current().position.clone();
            self.advance();
            let right = next(self)?;

            left = Node::new(
                position,
                NodeKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
    }

    /// Primary expressions and unary operators.
    pub(crate) fn factor(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        match self.current().kind.clone() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Node::new(position, NodeKind::Int(value)))
            },
            TokenKind::Float(value) => {
                self.advance();
                Ok(Node::new(position, NodeKind::Float(value)))
            },
            TokenKind::Str(value) => {
                self.advance();
                Ok(Node::new(position, NodeKind::Str(value)))
            },
            TokenKind::LParen => {
                self.advance();
                let expression = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expression)
            },
            TokenKind::Plus => {
                self.advance();
                let operand = self.factor()?;
                Ok(Node::new(
                    position,
                    NodeKind::Unary {
                        op: UnaryOp::Plus,
                        operand: Box::new(operand),
                    },
                ))
            },
            TokenKind::Minus => {
                self.advance();
                let operand = self.factor()?;
                Ok(Node::new(
                    position,
                    NodeKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                ))
            },
            // `!` negates a whole expression, not just a factor.
            TokenKind::Bang => {
                self.advance();
                let operand = self.expression()?;
                Ok(Node::new(
                    position,
                    NodeKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                ))
            },
            TokenKind::Tilde => {
                self.advance();
                let operand = self.factor()?;
                Ok(Node::new(
                    position,
                    NodeKind::Unary {
                        op: UnaryOp::BitNot,
                        operand: Box::new(operand),
                    },
                ))
            },
            TokenKind::Ident(_) => {
                if self.peek().kind == TokenKind::LParen {
                    self.function_call()
                } else if self.peek().kind == TokenKind::LBracket {
                    self.list_access()
                } else {
                    let (name, _) = self.expect_ident()?;
                    Ok(Node::new(position, NodeKind::Identifier(name)))
                }
            },
            TokenKind::LBracket => self.list_literal(),
            other => Err(ParseError::InvalidSyntax {
                token: other.value_string(),
                position,
            }),
        }
    }

    /// `IDENT '(' [ expression {',' expression} ] ')'`
    pub(crate) fn function_call(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.expression()?);

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;

        Ok(Node::new(position, NodeKind::Call { name, args }))
    }

    /// `IDENT ('[' expression ']')+`
    fn list_access(&mut self) -> Result<Node, ParseError> {
        let (name, position) = self.expect_ident()?;
        let mut node = Node::new(position, NodeKind::Identifier(name));

        while self.check(&TokenKind::LBracket) {
            let position = self.current().position.clone();
            self.advance();
            let index = self.expression()?;
            self.expect(TokenKind::RBracket)?;

            node = Node::new(
                position,
                NodeKind::ListAccess {
                    list: Box::new(node),
                    index: Box::new(index),
                },
            );
        }

        Ok(node)
    }

    /// `'[' [ expression {',' expression} ] ']'`
    fn list_literal(&mut self) -> Result<Node, ParseError> {
        let position = self.current().position.clone();

        self.expect(TokenKind::LBracket)?;

        let mut values = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            values.push(self.expression()?);

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(TokenKind::RBracket)?;

        Ok(Node::new(position, NodeKind::List(values)))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, NodeKind, UnaryOp};
    use crate::parse_source;

    /// Parse `<expr>` out of `fn main() { return <expr>; }`.
    fn parse_expr(expr: &str) -> NodeKind {
        let source = format!("fn main() {{ return {}; }}", expr);
        let ast = parse_source(&source).expect("parse failed");
        match &ast[0].kind {
            NodeKind::Fn { body, .. } => match &body.kind {
                NodeKind::Block(stmts) => match &stmts[0].kind {
                    NodeKind::Return(value) => value.kind.clone(),
                    other => panic!("expected return, got {:?}", other),
                },
                other => panic!("expected block, got {:?}", other),
            },
            other => panic!("expected fn, got {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expr("42"), NodeKind::Int(42));
        assert_eq!(parse_expr("3.5"), NodeKind::Float(3.5));
        assert_eq!(parse_expr("\"hi\""), NodeKind::Str("hi".into()));
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match parse_expr("1 + 2 * 3") {
            NodeKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Add);
                assert_eq!(left.kind, NodeKind::Int(1));
                assert!(matches!(
                    right.kind,
                    NodeKind::Binary { op: BinaryOp::Mul, .. }
                ));
            },
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_binds_tighter_than_logical() {
        // 1 && 2 == 3 parses as 1 && (2 == 3)
        match parse_expr("1 && 2 == 3") {
            NodeKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::And);
                assert!(matches!(
                    right.kind,
                    NodeKind::Binary { op: BinaryOp::Eq, .. }
                ));
            },
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_shift_binds_looser_than_logical() {
        match parse_expr("1 << 2 && 3") {
            NodeKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Shl);
                assert!(matches!(
                    right.kind,
                    NodeKind::Binary { op: BinaryOp::And, .. }
                ));
            },
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associativity() {
        // 1 - 2 - 3 parses as (1 - 2) - 3
        match parse_expr("1 - 2 - 3") {
            NodeKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Sub);
                assert!(matches!(
                    left.kind,
                    NodeKind::Binary { op: BinaryOp::Sub, .. }
                ));
                assert_eq!(right.kind, NodeKind::Int(3));
            },
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_expression() {
        // (1 + 2) * 3
        match parse_expr("(1 + 2) * 3") {
            NodeKind::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Mul);
                assert!(matches!(
                    left.kind,
                    NodeKind::Binary { op: BinaryOp::Add, .. }
                ));
            },
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_operators() {
        assert!(matches!(
            parse_expr("-1"),
            NodeKind::Unary { op: UnaryOp::Neg, .. }
        ));
        assert!(matches!(
            parse_expr("+1"),
            NodeKind::Unary { op: UnaryOp::Plus, .. }
        ));
        assert!(matches!(
            parse_expr("~1"),
            NodeKind::Unary { op: UnaryOp::BitNot, .. }
        ));
    }

    #[test]
    fn test_bang_consumes_whole_expression() {
        // !1 + 2 parses as !(1 + 2)
        match parse_expr("!1 + 2") {
            NodeKind::Unary { op, operand } => {
                assert_eq!(op, UnaryOp::Not);
                assert!(matches!(
                    operand.kind,
                    NodeKind::Binary { op: BinaryOp::Add, .. }
                ));
            },
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_call_with_arguments() {
        match parse_expr("f(1, 2)") {
            NodeKind::Call { name, args } => {
                assert_eq!(name, "f");
                assert_eq!(args.len(), 2);
            },
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_call_without_arguments() {
        match parse_expr("f()") {
            NodeKind::Call { args, .. } => assert!(args.is_empty()),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_list_literal() {
        match parse_expr("[1, 2, 3]") {
            NodeKind::List(values) => assert_eq!(values.len(), 3),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_list_literal() {
        match parse_expr("[]") {
            NodeKind::List(values) => assert!(values.is_empty()),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_list_access() {
        // xs[0][1] parses as (xs[0])[1]
        match parse_expr("xs[0][1]") {
            NodeKind::ListAccess { list, index } => {
                assert_eq!(index.kind, NodeKind::Int(1));
                assert!(matches!(list.kind, NodeKind::ListAccess { .. }));
            },
            other => panic!("expected list access, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_syntax_error() {
        let err = parse_source("fn main() { return ; }").unwrap_err();
        assert_eq!(err.to_string(), "invalid syntax: \";\"");
    }
}
