//! Command Parser
//!
//! Handles parsing of simple commands, pipelines, redirections, and
//! assignments.

use crate::ast::types::{
    AssignmentNode, AstError, BuiltinNode, CommandBuilder, ExecAssignNode, Node, PipeBuilder,
    RedirectNode, RedirectOp, RedirectTarget,
};
use crate::parser::lexer::{Token, TokenType};
use crate::parser::parser::ParserState;
use crate::parser::types::{is_redirection_token, ParseError, ParseErrorKind};

impl ParserState<'_> {
    /// A command, or a pipeline when `|` follows. A trailing `&` marks the
    /// whole statement as background.
    pub(crate) fn parse_command_or_pipe(&mut self) -> Result<Node, ParseError> {
        let first = self.parse_command()?;
        if !self.check(TokenType::Pipe) {
            let mut command = first;
            if self.check(TokenType::Amp) {
                self.advance();
                command.set_background(true);
            }
            return Ok(Node::Command(command.build()));
        }

        let first = first.build();
        let pos = first.pos();
        let mut pipe = PipeBuilder::new(pos);
        pipe.add_command(first);
        while self.check(TokenType::Pipe) {
            self.advance();
            let command = self.parse_command()?;
            pipe.add_command(command.build());
        }
        if self.check(TokenType::Amp) {
            self.advance();
            pipe.set_background(true);
        }

        pipe.build()
            .map(Node::Pipe)
            .map_err(|e| self.construction(pos, e))
    }

    /// `(Ident|Arg) (word | redirect)*`
    pub(crate) fn parse_command(&mut self) -> Result<CommandBuilder, ParseError> {
        let name = self.advance();
        if !matches!(name.token_type, TokenType::Ident | TokenType::Arg) {
            return Err(self.unexpected(&name, "command"));
        }

        let mut command = CommandBuilder::new(name.pos, name.value);
        loop {
            let token_type = self.current_type();
            if is_redirection_token(token_type) {
                command.add_redirect(self.parse_redirect()?);
            } else if self.at_value() {
                command.add_arg(self.parse_word()?);
            } else {
                break;
            }
        }
        Ok(command)
    }

    /// `>`, `>>` or `<`, an optional `[n]`, `[n=m]` or `[n=]` group, then the
    /// target word unless the group already names one.
    pub(crate) fn parse_redirect(&mut self) -> Result<RedirectNode, ParseError> {
        let operator = self.advance();
        let pos = operator.pos;
        let mut op = match operator.token_type {
            TokenType::Gt => RedirectOp::Write,
            TokenType::Lt => RedirectOp::Read,
            _ => return Err(self.unexpected(&operator, "redirection")),
        };

        if op == RedirectOp::Write
            && self.check(TokenType::Gt)
            && self.current().pos.offset() == pos.offset() + 1
        {
            self.advance();
            op = RedirectOp::Append;
        }

        let mut fd = None;
        let mut target = None;
        if self.check(TokenType::LBrack) {
            self.advance();
            let number = self.expect(TokenType::Number, "file descriptor")?;
            fd = Some(self.parse_fd(&number)?);
            if self.check(TokenType::Assign) {
                self.advance();
                target = Some(if self.check(TokenType::Number) {
                    let number = self.advance();
                    RedirectTarget::Fd(self.parse_fd(&number)?)
                } else {
                    RedirectTarget::Close
                });
            }
            self.expect(TokenType::RBrack, "']'")?;
        }

        let target = match target {
            Some(target) => target,
            None if self.at_value() => RedirectTarget::Location(self.parse_word()?),
            None => {
                let token = self.current().clone();
                return Err(self.unexpected(&token, "redirect target"));
            }
        };

        RedirectNode::new(pos, op, fd, target).map_err(|e| self.construction(pos, e))
    }

    fn parse_fd(&self, token: &Token) -> Result<i32, ParseError> {
        token.value.parse().map_err(|_| {
            self.error(
                ParseErrorKind::Syntax,
                token.pos,
                format!("invalid file descriptor '{}'", token.value),
            )
        })
    }

    /// `Ident '=' expr`
    pub(crate) fn parse_assignment(&mut self) -> Result<Node, ParseError> {
        let name = self.expect(TokenType::Ident, "variable name")?;
        self.expect(TokenType::Assign, "'='")?;
        let value = self.parse_expr()?;
        Ok(Node::Assignment(AssignmentNode::new(name.pos, name.value, value)))
    }

    /// `Ident '<=' (command | pipe)`
    pub(crate) fn parse_exec_assign(&mut self) -> Result<Node, ParseError> {
        let name = self.expect(TokenType::Ident, "variable name")?;
        self.expect(TokenType::AssignCmd, "'<='")?;

        let source = if self.is_invocation() {
            Node::FnInv(self.parse_fn_inv()?)
        } else {
            match self.current_type() {
                TokenType::Ident | TokenType::Arg => self.parse_command_or_pipe()?,
                _ if self.at_value() => {
                    let value = self.parse_word()?;
                    let err = AstError::InvalidExecSource {
                        found: value.kind().as_str(),
                    };
                    return Err(self.construction(name.pos, err));
                }
                _ => {
                    let token = self.current().clone();
                    return Err(self.unexpected(&token, "command"));
                }
            }
        };

        ExecAssignNode::new(name.pos, name.value, source)
            .map(Node::ExecAssign)
            .map_err(|e| self.construction(name.pos, e))
    }

    /// `'builtin' command`
    pub(crate) fn parse_builtin(&mut self) -> Result<Node, ParseError> {
        let keyword = self.expect(TokenType::Builtin, "'builtin'")?;
        let mut command = self.parse_command()?;
        if self.check(TokenType::Amp) {
            self.advance();
            command.set_background(true);
        }
        Ok(Node::Builtin(BuiltinNode::new(keyword.pos, command.build())))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::{CommandNode, ExecSource, Expr, Node, RedirectOp, RedirectTarget};
    use crate::parser::parse;
    use crate::parser::types::ParseErrorKind;

    fn command(input: &str) -> CommandNode {
        let tree = parse("test", input).unwrap();
        match &tree.nodes()[0] {
            Node::Command(c) => c.clone(),
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_command() {
        let cmd = command("ls -l /tmp");
        assert_eq!(cmd.name(), "ls");
        assert_eq!(cmd.args().len(), 2);
        assert!(matches!(&cmd.args()[0], Expr::String(s) if s.value() == "-l" && !s.is_quoted()));
        assert!(!cmd.is_background());
    }

    #[test]
    fn test_path_as_command_name() {
        assert_eq!(command("./build.sh --release").name(), "./build.sh");
    }

    #[test]
    fn test_background_command() {
        assert!(command("sleep 10 &").is_background());
    }

    #[test]
    fn test_background_pipe() {
        let tree = parse("test", "yes | head -n 1 &").unwrap();
        match &tree.nodes()[0] {
            Node::Pipe(p) => {
                assert_eq!(p.commands().len(), 2);
                assert!(p.is_background());
                assert!(p.commands().iter().all(|c| !c.is_background()));
            }
            other => panic!("expected pipe, got {:?}", other),
        }
    }

    #[test]
    fn test_pipe_missing_command() {
        let err = parse("test", "ls |").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "unexpected EOF, expected command");
    }

    #[test]
    fn test_redirect_forms() {
        let cmd = command("cmd < in > out >> log >[2] err >[2=1] >[3=]");
        let redirects = cmd.redirects();
        assert_eq!(redirects.len(), 6);

        assert_eq!(redirects[0].op(), RedirectOp::Read);
        assert_eq!(redirects[1].op(), RedirectOp::Write);
        assert_eq!(redirects[2].op(), RedirectOp::Append);
        assert!(
            matches!(redirects[2].location(), Some(Expr::String(s)) if s.value() == "log")
        );

        assert_eq!(redirects[3].fd(), Some(2));
        assert!(matches!(redirects[3].location(), Some(Expr::String(s)) if s.value() == "err"));

        assert_eq!(redirects[4].fd(), Some(2));
        assert!(matches!(redirects[4].target(), RedirectTarget::Fd(1)));

        assert_eq!(redirects[5].fd(), Some(3));
        assert!(matches!(redirects[5].target(), RedirectTarget::Close));
    }

    #[test]
    fn test_redirect_between_args() {
        let cmd = command("echo a > out b");
        assert_eq!(cmd.args().len(), 2);
        assert_eq!(cmd.redirects().len(), 1);
    }

    #[test]
    fn test_spaced_gt_is_not_append() {
        let err = parse("test", "echo a > > out").unwrap_err();
        assert_eq!(err.message, "unexpected '>', expected redirect target");
    }

    #[test]
    fn test_redirect_target_may_be_concat() {
        let cmd = command("echo a > $dir+\"/out\"");
        assert!(matches!(cmd.redirects()[0].location(), Some(Expr::Concat(_))));
    }

    #[test]
    fn test_invalid_file_descriptor() {
        let err = parse("test", "cmd >[99999999999] out").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "invalid file descriptor '99999999999'");
    }

    #[test]
    fn test_unterminated_redirect_group() {
        let err = parse("test", "cmd >[2 out").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Lexical);
        assert_eq!(err.message, "unterminated redirect group");
    }

    #[test]
    fn test_exec_assign_command() {
        let tree = parse("test", "out <= ls -l").unwrap();
        match &tree.nodes()[0] {
            Node::ExecAssign(e) => {
                assert_eq!(e.name(), "out");
                assert!(matches!(e.command(), ExecSource::Command(c) if c.name() == "ls"));
            }
            other => panic!("expected exec assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_exec_assign_rejects_literal() {
        let err = parse("test", "a <= \"literal\"").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Construction);
        assert_eq!(
            err.message,
            "exec assignment requires a command or pipeline, found string"
        );
    }

    #[test]
    fn test_exec_assign_rejects_invocation() {
        let err = parse("test", "a <= f()").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Construction);
        assert!(err.message.ends_with("found function invocation"));
    }

    #[test]
    fn test_exec_assign_missing_command() {
        let err = parse("test", "a <=\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.message, "unexpected newline, expected command");
    }

    #[test]
    fn test_builtin() {
        let tree = parse("test", "builtin cd /tmp").unwrap();
        match &tree.nodes()[0] {
            Node::Builtin(b) => {
                assert_eq!(b.command().name(), "cd");
                assert_eq!(b.command().args().len(), 1);
            }
            other => panic!("expected builtin, got {:?}", other),
        }
    }
}
