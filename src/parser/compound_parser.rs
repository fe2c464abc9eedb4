//! Compound Statement Parser
//!
//! Handles function declarations and invocations, `if`/`else`, `for`,
//! `rfork`, and the keyword statements that take fixed arguments.

use crate::ast::types::{
    BindFnNode, Comparison, DumpNode, Expr, FnDeclNode, FnInvNode, ForNode, IfNode, ImportNode, Node,
    Pos, ReturnNode, RforkNode, SetEnvNode, ShowEnvNode, Tree,
};
use crate::parser::lexer::TokenType;
use crate::parser::parser::ParserState;
use crate::parser::types::ParseError;

/// One `if` condition and its branch, before the chain is folded
struct IfArm {
    pos: Pos,
    lvalue: Expr,
    op: Comparison,
    rvalue: Expr,
    if_tree: Tree,
}

impl IfArm {
    fn into_node(self, else_tree: Option<Tree>) -> IfNode {
        IfNode::new(self.pos, self.lvalue, self.op, self.rvalue, self.if_tree, else_tree)
    }
}

impl ParserState<'_> {
    /// `'fn' Ident '(' [Ident (',' Ident)*] ')' block`
    pub(crate) fn parse_fn_decl(&mut self) -> Result<FnDeclNode, ParseError> {
        let keyword = self.expect(TokenType::Fn, "'fn'")?;
        let name = self.expect(TokenType::Ident, "function name")?;
        self.expect(TokenType::LParen, "'('")?;

        let mut params = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                let param = self.expect(TokenType::Ident, "parameter name")?;
                params.push(param.value);
                if self.check(TokenType::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenType::RParen, "',' or ')'")?;

        let body = self.parse_block(&name.value)?;
        Ok(FnDeclNode::new(keyword.pos, name.value, params, body))
    }

    /// `Ident '(' [expr (',' expr)*] ')'`
    pub(crate) fn parse_fn_inv(&mut self) -> Result<FnInvNode, ParseError> {
        let name = self.expect(TokenType::Ident, "function name")?;
        let args = self.parse_call_args()?;
        Ok(FnInvNode::new(name.pos, name.value, args))
    }

    /// `'if' expr ('=='|'!=') expr block ['else' (block | if)]`
    ///
    /// An `else if` chain is read in a loop. Each hop nests one `else` tree
    /// and counts as one level of depth.
    pub(crate) fn parse_if(&mut self) -> Result<IfNode, ParseError> {
        let first = self.parse_if_arm()?;

        let mut chain = Vec::new();
        let mut else_tree = None;
        while self.check(TokenType::Else) {
            self.advance();
            if self.check(TokenType::If) {
                let pos = self.current().pos;
                self.enter(pos)?;
                chain.push(self.parse_if_arm()?);
            } else {
                else_tree = Some(self.parse_block("else")?);
                break;
            }
        }
        for _ in 0..chain.len() {
            self.leave();
        }

        for arm in chain.into_iter().rev() {
            let nested = arm.into_node(else_tree);
            else_tree = Some(Tree::new("else", std::iter::once(nested).collect()));
        }
        Ok(first.into_node(else_tree))
    }

    fn parse_if_arm(&mut self) -> Result<IfArm, ParseError> {
        let keyword = self.expect(TokenType::If, "'if'")?;
        let lvalue = self.parse_expr()?;

        let operator = self.advance();
        let op = match operator.token_type {
            TokenType::Equal | TokenType::NotEqual => operator
                .value
                .parse::<Comparison>()
                .map_err(|e| self.construction(operator.pos, e))?,
            _ => return Err(self.unexpected(&operator, "'==' or '!='")),
        };

        let rvalue = self.parse_expr()?;
        let if_tree = self.parse_block("if")?;
        Ok(IfArm {
            pos: keyword.pos,
            lvalue,
            op,
            rvalue,
            if_tree,
        })
    }

    /// `'for' [Ident 'in' expr] block`
    pub(crate) fn parse_for(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::For, "'for'")?;
        if self.check(TokenType::LBrace) {
            let body = self.parse_block("for")?;
            return Ok(Node::For(ForNode::forever(keyword.pos, body)));
        }

        let ident = self.expect(TokenType::Ident, "loop variable or '{'")?;
        let in_token = self.advance();
        if in_token.token_type != TokenType::Ident || in_token.value != "in" {
            return Err(self.unexpected(&in_token, "'in'"));
        }
        let in_expr = self.parse_expr()?;
        let body = self.parse_block("for")?;
        Ok(Node::For(ForNode::each(keyword.pos, ident.value, in_expr, body)))
    }

    /// `'rfork' word [block]`
    pub(crate) fn parse_rfork(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::Rfork, "'rfork'")?;
        let flags = self.parse_required_word("rfork flags")?;
        let body = if self.check(TokenType::LBrace) {
            Some(self.parse_block("rfork")?)
        } else {
            None
        };
        Ok(Node::Rfork(RforkNode::new(keyword.pos, flags, body)))
    }

    pub(crate) fn parse_import(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::Import, "'import'")?;
        let path = self.parse_required_word("import path")?;
        Ok(Node::Import(ImportNode::new(keyword.pos, path)))
    }

    pub(crate) fn parse_setenv(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::SetEnv, "'setenv'")?;
        let name = self.expect(TokenType::Ident, "variable name")?;
        Ok(Node::SetEnv(SetEnvNode::new(keyword.pos, name.value)))
    }

    pub(crate) fn parse_showenv(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::ShowEnv, "'showenv'")?;
        Ok(Node::ShowEnv(ShowEnvNode::new(keyword.pos)))
    }

    /// `'bindfn' Ident Ident`
    pub(crate) fn parse_bindfn(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::BindFn, "'bindfn'")?;
        let fn_name = self.expect(TokenType::Ident, "function name")?;
        let cmd_name = self.expect(TokenType::Ident, "command name")?;
        Ok(Node::BindFn(BindFnNode::new(
            keyword.pos,
            fn_name.value,
            cmd_name.value,
        )))
    }

    /// `'dump' [word]`
    pub(crate) fn parse_dump(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::Dump, "'dump'")?;
        let file = if self.at_value() {
            Some(self.parse_word()?)
        } else {
            None
        };
        Ok(Node::Dump(DumpNode::new(keyword.pos, file)))
    }

    /// `'return' [expr]`
    pub(crate) fn parse_return(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::Return, "'return'")?;
        let value = if self.at_value() || self.check(TokenType::LParen) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Node::Return(ReturnNode::new(keyword.pos, value)))
    }

    fn parse_required_word(&mut self, what: &str) -> Result<Expr, ParseError> {
        if !self.at_value() {
            let token = self.current().clone();
            return Err(self.unexpected(&token, what));
        }
        self.parse_word()
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::{Comparison, Expr, Node};
    use crate::parser::types::{ParseErrorKind, ParseLimits};
    use crate::parser::{parse, Parser};

    fn first(input: &str) -> Node {
        let tree = parse("test", input).unwrap();
        assert_eq!(tree.nodes().len(), 1, "{}", tree);
        tree.nodes()[0].clone()
    }

    #[test]
    fn test_fn_decl_params() {
        match first("fn add(a, b) {\n\treturn $a\n}") {
            Node::FnDecl(f) => {
                assert_eq!(f.name(), "add");
                assert_eq!(f.params(), ["a", "b"]);
                assert_eq!(f.body().name(), "add");
                assert_eq!(f.body().nodes().len(), 1);
            }
            other => panic!("expected fn, got {:?}", other),
        }
    }

    #[test]
    fn test_fn_decl_no_params_empty_body() {
        match first("fn noop() {}") {
            Node::FnDecl(f) => {
                assert!(f.params().is_empty());
                assert!(f.body().root().is_empty());
            }
            other => panic!("expected fn, got {:?}", other),
        }
    }

    #[test]
    fn test_fn_decl_trailing_comma() {
        let err = parse("test", "fn f(a,) {}").unwrap_err();
        assert_eq!(err.message, "unexpected ')', expected parameter name");
    }

    #[test]
    fn test_if_not_equal_without_else() {
        match first("if $a != \"x\" { echo diff }") {
            Node::If(n) => {
                assert_eq!(n.op(), Comparison::NotEqual);
                assert_eq!(n.if_tree().name(), "if");
                assert!(n.else_tree().is_none());
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_else_if_chain() {
        match first("if $a == 1 { echo one } else if $a == 2 { echo two } else { echo many }") {
            Node::If(n) => {
                let else_tree = n.else_tree().unwrap();
                assert_eq!(else_tree.name(), "else");
                match &else_tree.nodes()[0] {
                    Node::If(inner) => {
                        assert!(matches!(inner.rvalue(), Expr::Number(v) if v.value() == "2"));
                        assert!(inner.else_tree().is_some());
                    }
                    other => panic!("expected nested if, got {:?}", other),
                }
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_long_else_if_chain() {
        let mut input = String::from("if $a == 0 { echo 0 }");
        for i in 1..150 {
            input.push_str(&format!(" else if $a == {} {{ echo {} }}", i, i));
        }
        input.push_str(" else { echo many }");

        let tree = parse("test", &input).unwrap();
        let mut arms = 0;
        let mut node = tree.nodes()[0].clone();
        while let Node::If(n) = node {
            arms += 1;
            match n.else_tree() {
                Some(t) => node = t.nodes()[0].clone(),
                None => break,
            }
        }
        assert_eq!(arms, 150);
    }

    #[test]
    fn test_else_if_hop_counts_one_level() {
        let parser = Parser::with_limits(ParseLimits {
            max_depth: 3,
            ..ParseLimits::default()
        });
        let two_hops = "if $a == 1 { } else if $a == 2 { } else if $a == 3 { } else { }";
        assert!(parser.parse("t", two_hops).is_ok());

        let three_hops = "if $a == 1 { } else if $a == 2 { } else if $a == 3 { } else if $a == 4 { }";
        let err = parser.parse("t", three_hops).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Limit);
    }

    #[test]
    fn test_if_requires_comparison() {
        let err = parse("test", "if $a { echo }").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "unexpected '{', expected '==' or '!='");
    }

    #[test]
    fn test_for_forms() {
        match first("for { echo loop }") {
            Node::For(f) => {
                assert!(f.ident().is_none());
                assert!(f.in_expr().is_none());
            }
            other => panic!("expected for, got {:?}", other),
        }
        match first("for f in $files { echo $f }") {
            Node::For(f) => {
                assert_eq!(f.ident(), Some("f"));
                assert!(matches!(f.in_expr(), Some(Expr::Var(v)) if v.name() == "$files"));
                assert_eq!(f.body().name(), "for");
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_for_requires_in() {
        let err = parse("test", "for f of $files { echo }").unwrap_err();
        assert_eq!(err.message, "unexpected of, expected 'in'");
    }

    #[test]
    fn test_rfork() {
        match first("rfork upmnis {\n\tmount -t proc proc /proc\n}") {
            Node::Rfork(r) => {
                assert!(matches!(r.flags(), Expr::String(s) if s.value() == "upmnis"));
                assert_eq!(r.body().map(|b| b.nodes().len()), Some(1));
            }
            other => panic!("expected rfork, got {:?}", other),
        }
        match first("rfork u") {
            Node::Rfork(r) => assert!(r.body().is_none()),
            other => panic!("expected rfork, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_statements() {
        match first("import \"./lib/utils.sh\"") {
            Node::Import(i) => assert!(matches!(i.path(), Expr::String(s) if s.is_quoted())),
            other => panic!("expected import, got {:?}", other),
        }
        match first("bindfn gocd cd") {
            Node::BindFn(b) => {
                assert_eq!(b.fn_name(), "gocd");
                assert_eq!(b.cmd_name(), "cd");
            }
            other => panic!("expected bindfn, got {:?}", other),
        }
        match first("dump ./session.sh") {
            Node::Dump(d) => assert!(d.file().is_some()),
            other => panic!("expected dump, got {:?}", other),
        }
        match first("setenv GOPATH") {
            Node::SetEnv(s) => assert_eq!(s.name(), "GOPATH"),
            other => panic!("expected setenv, got {:?}", other),
        }
    }

    #[test]
    fn test_return_forms() {
        let tree = parse("test", "fn f() {\n\treturn\n}\nfn g() { return ($a $b) }").unwrap();
        let returns: Vec<bool> = tree
            .nodes()
            .iter()
            .map(|n| match n {
                Node::FnDecl(f) => match &f.body().nodes()[0] {
                    Node::Return(r) => r.value().is_some(),
                    other => panic!("expected return, got {:?}", other),
                },
                other => panic!("expected fn, got {:?}", other),
            })
            .collect();
        assert_eq!(returns, vec![false, true]);
    }

    #[test]
    fn test_import_requires_path() {
        let err = parse("test", "import\n").unwrap_err();
        assert_eq!(err.message, "unexpected newline, expected import path");
    }
}
