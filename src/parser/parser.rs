//! Recursive Descent Parser for shlang Scripts
//!
//! This parser pulls tokens from the lexer and produces an AST.
//!
//! Grammar (simplified):
//!   program      ::= stmt*
//!   stmt         ::= command_or_pipe | assignment | exec_assign | fn_decl
//!                  | fn_inv | if | for | rfork | import | setenv | showenv
//!                  | bindfn | dump | return | builtin
//!   command      ::= (Ident|Arg) (word | redirect)*
//!   pipe         ::= command ('|' command)+ ['&']
//!   assignment   ::= Ident '=' expr
//!   exec_assign  ::= Ident '<=' (command | pipe)
//!   block        ::= '{' stmt* '}'
//!   expr         ::= list | word
//!   word         ::= value ('+' value)*
//!
//! Statements end at `;`, a newline, the `}` of the enclosing block, or the
//! end of input. The first error stops the parse.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::ast::types::{AstError, ListNode, Node, Pos, Tree};
use crate::parser::lexer::{Lexer, Token, TokenType};
use crate::parser::types::{is_statement_end, ParseError, ParseErrorKind, ParseLimits};

/// Parse `source` with default limits. `name` labels the tree and errors.
pub fn parse(name: &str, source: &str) -> Result<Tree, ParseError> {
    Parser::new().parse(name, source)
}

/// Parser configuration. Each call to [`Parser::parse`] is independent.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    limits: ParseLimits,
}

impl Parser {
    /// Create a new parser instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ParseLimits) -> Self {
        Self { limits }
    }

    /// Parse a script into a tree named `name`
    pub fn parse(&self, name: &str, source: &str) -> Result<Tree, ParseError> {
        let result = self.parse_source(name, source);
        match &result {
            Ok(tree) => debug!(tree = name, statements = tree.nodes().len(), "parsed tree"),
            Err(err) => debug!(tree = name, kind = ?err.kind, %err, "rejected input"),
        }
        result
    }

    fn parse_source(&self, name: &str, source: &str) -> Result<Tree, ParseError> {
        if source.len() > self.limits.max_input_size {
            return Err(ParseError::new(
                ParseErrorKind::Limit,
                name,
                source,
                Pos(0),
                format!(
                    "input too large: {} bytes exceeds limit of {}",
                    source.len(),
                    self.limits.max_input_size
                ),
            ));
        }

        let mut state = ParserState::new(name, source, self.limits);
        state.parse_program()
    }
}

/// Per-parse state: the token stream with its lookahead buffer.
pub(crate) struct ParserState<'a> {
    name: &'a str,
    source: &'a str,
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token>,
    limits: ParseLimits,
    depth: usize,
}

impl<'a> ParserState<'a> {
    fn new(name: &'a str, source: &'a str, limits: ParseLimits) -> Self {
        Self {
            name,
            source,
            lexer: Lexer::new(source),
            lookahead: VecDeque::new(),
            limits,
            depth: 0,
        }
    }

    // ===========================================================================
    // HELPER METHODS
    // ===========================================================================

    /// Make sure at least `n + 1` tokens are buffered. The lexer yields a
    /// final `Eof`; past it the last token is repeated.
    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            match self.lexer.next() {
                Some(token) => self.lookahead.push_back(token),
                None => {
                    let pos = Pos(self.source.len());
                    self.lookahead.push_back(Token::new(TokenType::Eof, "", pos));
                }
            }
        }
    }

    pub(crate) fn current(&mut self) -> &Token {
        self.peek(0)
    }

    pub(crate) fn peek(&mut self, offset: usize) -> &Token {
        self.fill(offset);
        &self.lookahead[offset]
    }

    pub(crate) fn current_type(&mut self) -> TokenType {
        self.current().token_type
    }

    pub(crate) fn advance(&mut self) -> Token {
        self.fill(0);
        match self.lookahead.pop_front() {
            Some(token) => token,
            None => Token::new(TokenType::Eof, "", Pos(self.source.len())),
        }
    }

    pub(crate) fn check(&mut self, token_type: TokenType) -> bool {
        self.current_type() == token_type
    }

    /// Consume a token of the given type or fail naming what was expected.
    pub(crate) fn expect(&mut self, token_type: TokenType, what: &str) -> Result<Token, ParseError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            let token = self.current().clone();
            Err(self.unexpected(&token, what))
        }
    }

    /// `name(` with no blank between the name and the parenthesis
    pub(crate) fn is_invocation(&mut self) -> bool {
        let token = self.current();
        if token.token_type != TokenType::Ident {
            return false;
        }
        let end = token.pos.offset() + token.value.len();
        let next = self.peek(1);
        next.token_type == TokenType::LParen && next.pos.offset() == end
    }

    pub(crate) fn error(&self, kind: ParseErrorKind, pos: Pos, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, self.name, self.source, pos, message)
    }

    /// Error for a token that cannot appear here. Illegal tokens surface
    /// their own lexical message.
    pub(crate) fn unexpected(&self, token: &Token, expected: &str) -> ParseError {
        if token.token_type == TokenType::Illegal {
            return self.error(ParseErrorKind::Lexical, token.pos, token.value.clone());
        }
        self.error(
            ParseErrorKind::Syntax,
            token.pos,
            format!("unexpected {}, expected {}", token, expected),
        )
    }

    pub(crate) fn construction(&self, pos: Pos, err: AstError) -> ParseError {
        self.error(ParseErrorKind::Construction, pos, err.to_string())
    }

    /// Enter a nested block or list, failing past the depth limit.
    pub(crate) fn enter(&mut self, pos: Pos) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(self.error(
                ParseErrorKind::Limit,
                pos,
                format!("maximum nesting depth of {} exceeded", self.limits.max_depth),
            ));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn skip_separators(&mut self) {
        while self.check(TokenType::Semicolon) {
            self.advance();
        }
    }

    // ===========================================================================
    // PROGRAM & BLOCKS
    // ===========================================================================

    fn parse_program(&mut self) -> Result<Tree, ParseError> {
        let root = self.parse_statements(TokenType::Eof)?;
        Ok(Tree::new(self.name, root))
    }

    /// Statements up to (not including) `until`, which is `Eof` or `RBrace`.
    fn parse_statements(&mut self, until: TokenType) -> Result<ListNode, ParseError> {
        let mut list = ListNode::new();
        loop {
            self.skip_separators();
            let token_type = self.current_type();
            if token_type == until {
                break;
            }
            if token_type == TokenType::Eof {
                let token = self.current().clone();
                return Err(self.unexpected(&token, "'}'"));
            }

            let node = self.parse_statement()?;
            trace!(kind = %node.kind(), pos = %node.pos(), "statement");
            list.push(node);

            if !is_statement_end(self.current_type()) {
                let token = self.current().clone();
                return Err(self.unexpected(&token, "end of statement"));
            }
        }
        Ok(list)
    }

    /// `{ stmt* }` as a nested tree called `name`
    pub(crate) fn parse_block(&mut self, name: &str) -> Result<Tree, ParseError> {
        let open = self.expect(TokenType::LBrace, "'{'")?;
        self.enter(open.pos)?;
        let root = self.parse_statements(TokenType::RBrace)?;
        self.expect(TokenType::RBrace, "'}'")?;
        self.leave();
        Ok(Tree::new(name, root))
    }

    // ===========================================================================
    // STATEMENTS
    // ===========================================================================

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        match self.current_type() {
            TokenType::Ident => {
                let next = self.peek(1).token_type;
                match next {
                    TokenType::Assign => self.parse_assignment(),
                    TokenType::AssignCmd => self.parse_exec_assign(),
                    TokenType::LParen if self.is_invocation() => {
                        Ok(Node::FnInv(self.parse_fn_inv()?))
                    }
                    _ => self.parse_command_or_pipe(),
                }
            }
            TokenType::Arg => self.parse_command_or_pipe(),
            TokenType::Fn => Ok(Node::FnDecl(self.parse_fn_decl()?)),
            TokenType::If => Ok(Node::If(self.parse_if()?)),
            TokenType::For => self.parse_for(),
            TokenType::Rfork => self.parse_rfork(),
            TokenType::Import => self.parse_import(),
            TokenType::SetEnv => self.parse_setenv(),
            TokenType::ShowEnv => self.parse_showenv(),
            TokenType::BindFn => self.parse_bindfn(),
            TokenType::Dump => self.parse_dump(),
            TokenType::Return => self.parse_return(),
            TokenType::Builtin => self.parse_builtin(),
            _ => {
                let token = self.current().clone();
                Err(self.unexpected(&token, "statement"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{Expr, NodeKind};

    fn parse_ok(input: &str) -> Tree {
        match parse("test", input) {
            Ok(tree) => tree,
            Err(e) => panic!("failed to parse {:?}: {}", input, e),
        }
    }

    fn parse_err(input: &str) -> ParseError {
        match parse("test", input) {
            Ok(tree) => panic!("expected error for {:?}, got:\n{}", input, tree),
            Err(e) => e,
        }
    }

    fn kinds(tree: &Tree) -> Vec<NodeKind> {
        tree.nodes().iter().map(|n| n.kind()).collect()
    }

    #[test]
    fn test_empty_input() {
        let tree = parse_ok("");
        assert!(tree.root().is_empty());
        assert_eq!(tree.name(), "test");
    }

    #[test]
    fn test_separators_only() {
        assert!(parse_ok(";;\n\n ; \n").root().is_empty());
    }

    #[test]
    fn test_statement_kinds() {
        let tree = parse_ok(
            "echo hi\n\
             a = 1\n\
             b <= ls\n\
             f()\n\
             import lib.sh\n\
             setenv PATH\n\
             showenv\n\
             bindfn f g\n\
             dump\n\
             return\n\
             builtin cd /\n",
        );
        assert_eq!(
            kinds(&tree),
            vec![
                NodeKind::Command,
                NodeKind::Assignment,
                NodeKind::ExecAssign,
                NodeKind::FnInv,
                NodeKind::Import,
                NodeKind::SetEnv,
                NodeKind::ShowEnv,
                NodeKind::BindFn,
                NodeKind::Dump,
                NodeKind::Return,
                NodeKind::Builtin,
            ]
        );
    }

    #[test]
    fn test_semicolon_separated() {
        let tree = parse_ok("a = 1; b = 2;echo $a");
        assert_eq!(
            kinds(&tree),
            vec![NodeKind::Assignment, NodeKind::Assignment, NodeKind::Command]
        );
    }

    #[test]
    fn test_spaced_paren_is_not_invocation() {
        let err = parse_err("cd (x)");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "unexpected '(', expected end of statement");
    }

    #[test]
    fn test_positions_recorded() {
        let tree = parse_ok("echo a\n  b = $x");
        assert_eq!(tree.nodes()[0].pos(), Pos(0));
        assert_eq!(tree.nodes()[1].pos(), Pos(9));
        match &tree.nodes()[1] {
            Node::Assignment(a) => assert_eq!(a.value().pos(), Pos(13)),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_err("fn f() {\n  echo a\n");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "unexpected EOF, expected '}'");
        assert_eq!((err.line, err.column), (3, 1));
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = parse_err("echo a }");
        assert_eq!(err.message, "unexpected '}', expected statement");
    }

    #[test]
    fn test_keyword_out_of_place() {
        let err = parse_err("else { echo }");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "unexpected 'else', expected statement");
    }

    #[test]
    fn test_lexical_error_surfaces() {
        let err = parse_err("echo \"abc");
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert!(err.message.starts_with("unterminated string"));
        assert_eq!((err.line, err.column), (1, 6));
        assert_eq!(err.to_string(), format!("test:1:6: {}", err.message));
    }

    #[test]
    fn test_input_size_limit() {
        let parser = Parser::with_limits(ParseLimits {
            max_input_size: 8,
            ..ParseLimits::default()
        });
        let err = parser.parse("big", "echo 123456789").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Limit);
        assert!(parser.parse("small", "echo a").is_ok());
    }

    #[test]
    fn test_depth_limit() {
        let parser = Parser::with_limits(ParseLimits {
            max_depth: 3,
            ..ParseLimits::default()
        });
        assert!(parser.parse("t", "for { for { for { echo } } }").is_ok());
        let err = parser
            .parse("t", "for { for { for { for { echo } } } }")
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Limit);
        assert_eq!(err.pos, Pos(22));
    }

    #[test]
    fn test_deep_nesting_is_an_error_not_a_crash() {
        let depth = 5_000;
        let input = format!("a = {}{}", "(".repeat(depth), ")".repeat(depth));
        let err = parse_err(&input);
        assert_eq!(err.kind, ParseErrorKind::Limit);
    }

    #[test]
    fn test_parse_is_repeatable() {
        let parser = Parser::new();
        let src = "out <= ls | wc -l";
        let a = parser.parse("a", src).unwrap();
        let b = parser.parse("b", src).unwrap();
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(b.name(), "b");
    }

    #[test]
    fn test_assignment_value_shapes() {
        let tree = parse_ok("a = \"x\"\nb = 42\nc = $a\nd = ()");
        let values: Vec<&Expr> = tree
            .nodes()
            .iter()
            .map(|n| match n {
                Node::Assignment(a) => a.value(),
                other => panic!("expected assignment, got {:?}", other),
            })
            .collect();
        assert!(matches!(values[0], Expr::String(s) if s.value() == "x" && s.is_quoted()));
        assert!(matches!(values[1], Expr::Number(n) if n.value() == "42"));
        assert!(matches!(values[2], Expr::Var(v) if v.name() == "$a"));
        assert!(matches!(values[3], Expr::List(l) if l.values().is_empty()));
    }
}
