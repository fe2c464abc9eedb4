//! Canonical source rendering
//!
//! `Display` prints a tree back as source text: one statement per line,
//! nested blocks indented with tabs. Parsing the output again gives a
//! structurally equal tree.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::types::*;

fn indent(f: &mut Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        f.write_char('\t')?;
    }
    Ok(())
}

fn write_statements(f: &mut Formatter<'_>, tree: &Tree, level: usize) -> fmt::Result {
    for node in tree.nodes() {
        indent(f, level)?;
        write_node(f, node, level)?;
        f.write_char('\n')?;
    }
    Ok(())
}

/// `{`, the indented statements, then `}` at the enclosing level
fn write_block(f: &mut Formatter<'_>, tree: &Tree, level: usize) -> fmt::Result {
    f.write_str("{\n")?;
    write_statements(f, tree, level + 1)?;
    indent(f, level)?;
    f.write_char('}')
}

fn write_joined<T: Display>(f: &mut Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_node(f: &mut Formatter<'_>, node: &Node, level: usize) -> fmt::Result {
    match node {
        Node::Command(cmd) => write!(f, "{}", cmd),
        Node::Pipe(pipe) => write!(f, "{}", pipe),
        Node::Assignment(n) => write!(f, "{} = {}", n.name(), n.value()),
        Node::ExecAssign(n) => match n.command() {
            ExecSource::Command(cmd) => write!(f, "{} <= {}", n.name(), cmd),
            ExecSource::Pipe(pipe) => write!(f, "{} <= {}", n.name(), pipe),
        },
        Node::FnDecl(n) => {
            write!(f, "fn {}(", n.name())?;
            write_joined(f, n.params(), ", ")?;
            f.write_str(") ")?;
            write_block(f, n.body(), level)
        }
        Node::FnInv(n) => {
            write!(f, "{}(", n.name())?;
            write_joined(f, n.args(), ", ")?;
            f.write_char(')')
        }
        Node::If(n) => write_if(f, n, level),
        Node::For(n) => {
            f.write_str("for ")?;
            if let (Some(ident), Some(in_expr)) = (n.ident(), n.in_expr()) {
                write!(f, "{} in {} ", ident, in_expr)?;
            }
            write_block(f, n.body(), level)
        }
        Node::Rfork(n) => {
            write!(f, "rfork {}", n.flags())?;
            if let Some(body) = n.body() {
                f.write_char(' ')?;
                write_block(f, body, level)?;
            }
            Ok(())
        }
        Node::Import(n) => write!(f, "import {}", n.path()),
        Node::SetEnv(n) => write!(f, "setenv {}", n.name()),
        Node::ShowEnv(_) => f.write_str("showenv"),
        Node::BindFn(n) => write!(f, "bindfn {} {}", n.fn_name(), n.cmd_name()),
        Node::Dump(n) => match n.file() {
            Some(file) => write!(f, "dump {}", file),
            None => f.write_str("dump"),
        },
        Node::Return(n) => match n.value() {
            Some(value) => write!(f, "return {}", value),
            None => f.write_str("return"),
        },
        Node::Builtin(n) => write!(f, "builtin {}", n.command()),
    }
}

fn write_if(f: &mut Formatter<'_>, node: &IfNode, level: usize) -> fmt::Result {
    write!(f, "if {} {} {} ", node.lvalue(), node.op(), node.rvalue())?;
    write_block(f, node.if_tree(), level)?;
    if let Some(else_tree) = node.else_tree() {
        f.write_str(" else ")?;
        write_block(f, else_tree, level)?;
    }
    Ok(())
}

fn write_quoted(f: &mut Formatter<'_>, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_statements(f, self, 0)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_node(f, self, 0)
    }
}

impl Display for CommandNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        for arg in self.args() {
            write!(f, " {}", arg)?;
        }
        for redirect in self.redirects() {
            write!(f, " {}", redirect)?;
        }
        if self.is_background() {
            f.write_str(" &")?;
        }
        Ok(())
    }
}

impl Display for PipeNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_joined(f, self.commands(), " | ")?;
        if self.is_background() {
            f.write_str(" &")?;
        }
        Ok(())
    }
}

impl Display for RedirectNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op())?;
        match (self.fd(), self.target()) {
            (Some(fd), RedirectTarget::Fd(to)) => write!(f, "[{}={}]", fd, to),
            (Some(fd), RedirectTarget::Close) => write!(f, "[{}=]", fd),
            (Some(fd), RedirectTarget::Location(location)) => write!(f, "[{}] {}", fd, location),
            (None, RedirectTarget::Location(location)) => write!(f, " {}", location),
            // Unreachable through the validating constructor
            (None, _) => Ok(()),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(v) => f.write_str(v.name()),
            Expr::String(s) if s.is_quoted() => write_quoted(f, s.value()),
            Expr::String(s) => f.write_str(s.value()),
            Expr::Number(n) => f.write_str(n.value()),
            Expr::Concat(c) => write_joined(f, c.parts(), "+"),
            Expr::List(l) => {
                f.write_char('(')?;
                write_joined(f, l.values(), " ")?;
                f.write_char(')')
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command_with_redirects() {
        let cmd = AST::command(
            0,
            "sed",
            vec![AST::string(4, "s#a\"b#\\#", true)],
            vec![
                AST::redirect(0, RedirectOp::Write, AST::string(0, "out", false)),
                RedirectNode::new(Pos(0), RedirectOp::Write, Some(2), RedirectTarget::Fd(1)).unwrap(),
            ],
            true,
        );
        assert_eq!(cmd.to_string(), r#"sed "s#a\"b#\\#" > out >[2=1] &"#);
    }

    #[test]
    fn test_render_expressions() {
        let concat = AST::concat(
            0,
            vec![AST::var(0, "$GOPATH"), AST::string(0, "/src/", true), AST::var(0, "$path")],
        )
        .unwrap();
        assert_eq!(concat.to_string(), r#"$GOPATH+"/src/"+$path"#);

        let list = AST::list(0, vec![AST::number(0, "1"), AST::string(0, "a b", true)]);
        assert_eq!(list.to_string(), r#"(1 "a b")"#);
    }

    #[test]
    fn test_render_nested_blocks() {
        let cd = |arg: Expr| -> Node { AST::command(0, "cd", vec![arg], vec![], false).into() };
        let if_node = AST::if_node(
            0,
            AST::var(0, "$path"),
            Comparison::Equal,
            AST::string(0, "", true),
            AST::tree("if", vec![cd(AST::var(0, "$GOPATH"))]),
            Some(AST::tree("else", vec![cd(AST::string(0, "/", false))])),
        );
        let tree = AST::tree(
            "t",
            vec![AST::fn_decl(0, "gocd", &["path"], AST::tree("gocd", vec![if_node.into()])).into()],
        );
        let expected = "fn gocd(path) {\n\
                        \tif $path == \"\" {\n\
                        \t\tcd $GOPATH\n\
                        \t} else {\n\
                        \t\tcd /\n\
                        \t}\n\
                        }\n";
        assert_eq!(tree.to_string(), expected);
    }

    #[test]
    fn test_render_empty_tree() {
        assert_eq!(AST::tree("empty", vec![]).to_string(), "");
    }
}
