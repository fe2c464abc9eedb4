//! Word Parser
//!
//! Handles values, `+` concatenation, list literals and invocation arguments.

use crate::ast::types::{AstError, ConcatExpr, Expr, ListExpr, NumberExpr, StringExpr, VarExpr};
use crate::parser::lexer::TokenType;
use crate::parser::parser::ParserState;
use crate::parser::types::{is_value_token, ParseError};

impl ParserState<'_> {
    /// Check if the current token can start a word
    pub(crate) fn at_value(&mut self) -> bool {
        is_value_token(self.current_type())
    }

    /// A single value token
    pub(crate) fn parse_value(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let expr: Expr = match token.token_type {
            TokenType::Variable => VarExpr::new(token.pos, token.value).into(),
            TokenType::String => StringExpr::new(token.pos, token.value, true).into(),
            TokenType::Number => NumberExpr::new(token.pos, token.value).into(),
            TokenType::Arg | TokenType::Ident => StringExpr::new(token.pos, token.value, false).into(),
            _ => return Err(self.unexpected(&token, "value")),
        };
        Ok(expr)
    }

    /// `value ('+' value)*`, flattened into one concatenation
    pub(crate) fn parse_word(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_value()?;
        if !self.check(TokenType::Plus) {
            return Ok(first);
        }

        let pos = first.pos();
        let mut parts = vec![first];
        while self.check(TokenType::Plus) {
            self.advance();
            let part = if self.check(TokenType::LParen) {
                // Rejected below, but parsed so the error points at the whole word
                self.parse_list()?
            } else {
                self.parse_value()?
            };
            parts.push(part);
        }

        ConcatExpr::new(pos, parts)
            .map(Expr::Concat)
            .map_err(|e| self.construction(pos, e))
    }

    /// `list | word`
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenType::LParen) {
            let list = self.parse_list()?;
            if self.check(TokenType::Plus) {
                return Err(self.construction(list.pos(), AstError::ListInConcat));
            }
            return Ok(list);
        }
        if self.at_value() {
            return self.parse_word();
        }
        let token = self.current().clone();
        Err(self.unexpected(&token, "expression"))
    }

    /// `'(' expr* ')'`
    pub(crate) fn parse_list(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(TokenType::LParen, "'('")?;
        self.enter(open.pos)?;

        let mut values = Vec::new();
        loop {
            if self.check(TokenType::RParen) {
                self.advance();
                break;
            }
            if !self.check(TokenType::LParen) && !self.at_value() {
                let token = self.current().clone();
                return Err(self.unexpected(&token, "')'"));
            }
            values.push(self.parse_expr()?);
        }

        self.leave();
        Ok(ListExpr::new(open.pos, values).into())
    }

    /// `'(' [expr (',' expr)*] ')'` after a function name
    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenType::LParen, "'('")?;
        let mut args = Vec::new();
        if self.check(TokenType::RParen) {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            if self.check(TokenType::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(TokenType::RParen, "',' or ')'")?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::{Expr, Node};
    use crate::parser::parse;
    use crate::parser::types::ParseErrorKind;

    fn assigned(input: &str) -> Expr {
        let tree = parse("test", input).unwrap();
        match &tree.nodes()[0] {
            Node::Assignment(a) => a.value().clone(),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_single_value_not_wrapped() {
        assert!(matches!(assigned("a = $b"), Expr::Var(_)));
    }

    #[test]
    fn test_concat_is_flat() {
        match assigned("a = $a+b+$c") {
            Expr::Concat(c) => {
                assert_eq!(c.parts().len(), 3);
                assert!(c.parts().iter().all(|p| !matches!(p, Expr::Concat(_))));
            }
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_lists() {
        match assigned("a = (1 (2 3) \"x\"+$y)") {
            Expr::List(l) => {
                assert_eq!(l.values().len(), 3);
                assert!(matches!(&l.values()[1], Expr::List(inner) if inner.values().len() == 2));
                assert!(matches!(&l.values()[2], Expr::Concat(_)));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_list() {
        match assigned("a = (\n\tone\n\ttwo\n)") {
            Expr::List(l) => assert_eq!(l.values().len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_list_in_concat_rejected() {
        let err = parse("test", "a = $x+(1 2)").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Construction);
        assert_eq!(err.message, "a list cannot be concatenated");

        let err = parse("test", "a = (1 2)+$x").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Construction);
    }

    #[test]
    fn test_dangling_plus() {
        let err = parse("test", "a = $x+\nb = 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "unexpected newline, expected value");
    }

    #[test]
    fn test_unclosed_list() {
        let err = parse("test", "a = (1 2").unwrap_err();
        assert_eq!(err.message, "unexpected EOF, expected ')'");
    }

    #[test]
    fn test_call_args() {
        let tree = parse("test", "f(a, $b+\"c\", (1 2))").unwrap();
        match &tree.nodes()[0] {
            Node::FnInv(f) => {
                assert_eq!(f.name(), "f");
                assert_eq!(f.args().len(), 3);
                assert!(matches!(&f.args()[2], Expr::List(_)));
            }
            other => panic!("expected invocation, got {:?}", other),
        }
    }

    #[test]
    fn test_call_args_missing_comma() {
        let err = parse("test", "f(a b)").unwrap_err();
        assert_eq!(err.message, "unexpected b, expected ',' or ')'");
    }
}
