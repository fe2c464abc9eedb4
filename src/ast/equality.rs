//! Structural equality for AST values
//!
//! Two trees are structurally equal when they have the same shape and the
//! same semantic content. Source positions and tree names are ignored, so a
//! tree built by hand compares equal to the same program parsed from text.
//!
//! Comparison runs in one of two modes. `Silent` only answers yes or no and
//! records nothing. `Diagnostic` reports the first difference with a path
//! into the tree (for example `nodes[0].body.nodes[1].args[2]`) and, for
//! whole trees, a line diff of both renderings.

use std::fmt::Debug;

use similar::TextDiff;
use thiserror::Error;

use crate::ast::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmpMode {
    #[default]
    Silent,
    Diagnostic,
}

/// First difference found by a diagnostic comparison
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}: {detail}{}", display_path(.path), display_diff(.diff))]
pub struct Mismatch {
    /// Dotted path from the compared root to the differing value
    pub path: String,
    pub detail: String,
    /// Unified diff of the canonical renderings, for tree comparisons
    pub diff: Option<String>,
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

fn display_diff(diff: &Option<String>) -> String {
    match diff {
        Some(diff) => format!("\n{}", diff),
        None => String::new(),
    }
}

/// Comparison state threaded through [`StructuralEq::compare_with`].
pub struct Comparer {
    mode: CmpMode,
    path: Vec<String>,
    mismatch: Option<Mismatch>,
}

impl Comparer {
    pub fn new(mode: CmpMode) -> Self {
        Self {
            mode,
            path: Vec::new(),
            mismatch: None,
        }
    }

    fn is_diagnostic(&self) -> bool {
        self.mode == CmpMode::Diagnostic
    }

    fn at_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Record a difference at the current path. Always returns `false`.
    pub fn fail(&mut self, detail: impl FnOnce() -> String) -> bool {
        if self.is_diagnostic() && self.mismatch.is_none() {
            self.mismatch = Some(Mismatch {
                path: self.path_string(),
                detail: detail(),
                diff: None,
            });
        }
        false
    }

    fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            if !out.is_empty() && !segment.starts_with('[') {
                out.push('.');
            }
            out.push_str(segment);
        }
        out
    }

    fn enter(&mut self, segment: impl FnOnce() -> String) {
        if self.is_diagnostic() {
            self.path.push(segment());
        }
    }

    fn leave(&mut self) {
        if self.is_diagnostic() {
            self.path.pop();
        }
    }

    /// Compare a nested AST value under `name`.
    pub fn field<T: StructuralEq + ?Sized>(&mut self, name: &str, a: &T, b: &T) -> bool {
        self.enter(|| name.to_string());
        let equal = a.compare_with(b, self);
        self.leave();
        equal
    }

    /// Compare a plain value under `name`.
    pub fn value<T: PartialEq + Debug + ?Sized>(&mut self, name: &str, a: &T, b: &T) -> bool {
        if a == b {
            return true;
        }
        self.enter(|| name.to_string());
        self.fail(|| format!("{:?} != {:?}", a, b));
        self.leave();
        false
    }

    /// Compare ordered sequences element by element.
    pub fn seq<T: StructuralEq>(&mut self, name: &str, a: &[T], b: &[T]) -> bool {
        self.field(name, a, b)
    }

    /// Compare optional AST values.
    pub fn option<T: StructuralEq>(&mut self, name: &str, a: Option<&T>, b: Option<&T>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.field(name, a, b),
            (None, None) => true,
            (a, _) => {
                self.enter(|| name.to_string());
                let (l, r) = if a.is_some() {
                    ("present", "absent")
                } else {
                    ("absent", "present")
                };
                self.fail(|| format!("{} != {}", l, r));
                self.leave();
                false
            }
        }
    }

    fn attach_diff(&mut self, left: &Tree, right: &Tree) {
        if let Some(mismatch) = self.mismatch.as_mut() {
            if mismatch.diff.is_none() {
                let (left, right) = (left.to_string(), right.to_string());
                let diff = TextDiff::from_lines(&left, &right)
                    .unified_diff()
                    .header("left", "right")
                    .to_string();
                mismatch.diff = Some(diff);
            }
        }
    }

    fn into_mismatch(self) -> Mismatch {
        self.mismatch.unwrap_or_else(|| Mismatch {
            path: String::new(),
            detail: "values differ".to_string(),
            diff: None,
        })
    }
}

/// Position-independent deep equality.
pub trait StructuralEq {
    /// Compare against `other`, recording the first difference in `cmp`.
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool;

    fn is_equal(&self, other: &Self) -> bool {
        self.compare_with(other, &mut Comparer::new(CmpMode::Silent))
    }

    /// Compare in the given mode. In `Silent` mode the error carries no
    /// location.
    fn compare(&self, other: &Self, mode: CmpMode) -> Result<(), Mismatch> {
        let mut cmp = Comparer::new(mode);
        if self.compare_with(other, &mut cmp) {
            Ok(())
        } else {
            Err(cmp.into_mismatch())
        }
    }
}

impl<T: StructuralEq> StructuralEq for [T] {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        if self.len() != other.len() {
            return cmp.fail(|| format!("length {} != {}", self.len(), other.len()));
        }
        for (i, (a, b)) in self.iter().zip(other).enumerate() {
            cmp.enter(|| format!("[{}]", i));
            let equal = a.compare_with(b, cmp);
            cmp.leave();
            if !equal {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// TREES
// =============================================================================

impl StructuralEq for Tree {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        let at_root = cmp.at_root();
        let equal = self.root().compare_with(other.root(), cmp);
        if !equal && at_root && cmp.is_diagnostic() {
            cmp.attach_diff(self, other);
        }
        equal
    }
}

impl StructuralEq for ListNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.seq("nodes", self.nodes(), other.nodes())
    }
}

impl StructuralEq for Node {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        match (self, other) {
            (Node::Command(a), Node::Command(b)) => a.compare_with(b, cmp),
            (Node::Pipe(a), Node::Pipe(b)) => a.compare_with(b, cmp),
            (Node::Assignment(a), Node::Assignment(b)) => a.compare_with(b, cmp),
            (Node::ExecAssign(a), Node::ExecAssign(b)) => a.compare_with(b, cmp),
            (Node::FnDecl(a), Node::FnDecl(b)) => a.compare_with(b, cmp),
            (Node::FnInv(a), Node::FnInv(b)) => a.compare_with(b, cmp),
            (Node::If(a), Node::If(b)) => a.compare_with(b, cmp),
            (Node::For(a), Node::For(b)) => a.compare_with(b, cmp),
            (Node::Rfork(a), Node::Rfork(b)) => a.compare_with(b, cmp),
            (Node::Import(a), Node::Import(b)) => cmp.field("path", a.path(), b.path()),
            (Node::SetEnv(a), Node::SetEnv(b)) => cmp.value("name", a.name(), b.name()),
            (Node::ShowEnv(_), Node::ShowEnv(_)) => true,
            (Node::BindFn(a), Node::BindFn(b)) => {
                cmp.value("fn_name", a.fn_name(), b.fn_name())
                    && cmp.value("cmd_name", a.cmd_name(), b.cmd_name())
            }
            (Node::Dump(a), Node::Dump(b)) => cmp.option("file", a.file(), b.file()),
            (Node::Return(a), Node::Return(b)) => cmp.option("value", a.value(), b.value()),
            (Node::Builtin(a), Node::Builtin(b)) => cmp.field("command", a.command(), b.command()),
            _ => cmp.fail(|| format!("node kind {} != {}", self.kind(), other.kind())),
        }
    }
}

// =============================================================================
// STATEMENTS
// =============================================================================

impl StructuralEq for CommandNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.value("name", self.name(), other.name())
            && cmp.seq("args", self.args(), other.args())
            && cmp.seq("redirects", self.redirects(), other.redirects())
            && cmp.value("background", &self.is_background(), &other.is_background())
    }
}

impl StructuralEq for PipeNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.seq("commands", self.commands(), other.commands())
            && cmp.value("background", &self.is_background(), &other.is_background())
    }
}

impl StructuralEq for RedirectNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.value("op", &self.op(), &other.op())
            && cmp.value("fd", &self.fd(), &other.fd())
            && cmp.field("target", self.target(), other.target())
    }
}

impl StructuralEq for RedirectTarget {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        match (self, other) {
            (RedirectTarget::Location(a), RedirectTarget::Location(b)) => a.compare_with(b, cmp),
            (RedirectTarget::Fd(a), RedirectTarget::Fd(b)) => cmp.value("fd", a, b),
            (RedirectTarget::Close, RedirectTarget::Close) => true,
            _ => cmp.fail(|| format!("{:?} != {:?}", self, other)),
        }
    }
}

impl StructuralEq for AssignmentNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.value("name", self.name(), other.name())
            && cmp.field("value", self.value(), other.value())
    }
}

impl StructuralEq for ExecAssignNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.value("name", self.name(), other.name())
            && cmp.field("command", self.command(), other.command())
    }
}

impl StructuralEq for ExecSource {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        match (self, other) {
            (ExecSource::Command(a), ExecSource::Command(b)) => a.compare_with(b, cmp),
            (ExecSource::Pipe(a), ExecSource::Pipe(b)) => a.compare_with(b, cmp),
            (ExecSource::Command(_), _) => cmp.fail(|| "command != pipe".to_string()),
            (ExecSource::Pipe(_), _) => cmp.fail(|| "pipe != command".to_string()),
        }
    }
}

impl StructuralEq for FnDeclNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.value("name", self.name(), other.name())
            && cmp.value("params", self.params(), other.params())
            && cmp.field("body", self.body(), other.body())
    }
}

impl StructuralEq for FnInvNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.value("name", self.name(), other.name()) && cmp.seq("args", self.args(), other.args())
    }
}

impl StructuralEq for IfNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.field("lvalue", self.lvalue(), other.lvalue())
            && cmp.value("op", &self.op(), &other.op())
            && cmp.field("rvalue", self.rvalue(), other.rvalue())
            && cmp.field("if_tree", self.if_tree(), other.if_tree())
            && cmp.option("else_tree", self.else_tree(), other.else_tree())
    }
}

impl StructuralEq for ForNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.value("ident", &self.ident(), &other.ident())
            && cmp.option("in_expr", self.in_expr(), other.in_expr())
            && cmp.field("body", self.body(), other.body())
    }
}

impl StructuralEq for RforkNode {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        cmp.field("flags", self.flags(), other.flags())
            && cmp.option("body", self.body(), other.body())
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

impl StructuralEq for Expr {
    fn compare_with(&self, other: &Self, cmp: &mut Comparer) -> bool {
        match (self, other) {
            (Expr::Var(a), Expr::Var(b)) => cmp.value("name", a.name(), b.name()),
            (Expr::String(a), Expr::String(b)) => {
                cmp.value("value", a.value(), b.value())
                    && cmp.value("quoted", &a.is_quoted(), &b.is_quoted())
            }
            (Expr::Number(a), Expr::Number(b)) => cmp.value("value", a.value(), b.value()),
            (Expr::Concat(a), Expr::Concat(b)) => cmp.seq("parts", a.parts(), b.parts()),
            (Expr::List(a), Expr::List(b)) => cmp.seq("values", a.values(), b.values()),
            _ => cmp.fail(|| format!("expression kind {} != {}", self.kind(), other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd(pos: usize, arg: Expr) -> Node {
        AST::command(pos, "cd", vec![arg], vec![], false).into()
    }

    #[test]
    fn test_equality_is_reflexive() {
        let tree = AST::tree("t", vec![cd(0, AST::var(3, "$HOME"))]);
        assert!(tree.is_equal(&tree));
        assert!(tree.compare(&tree, CmpMode::Diagnostic).is_ok());
    }

    #[test]
    fn test_positions_and_names_are_ignored() {
        let a = AST::tree("a", vec![cd(0, AST::var(3, "$HOME"))]);
        let b = AST::tree("b", vec![cd(40, AST::var(97, "$HOME"))]);
        assert!(a.is_equal(&b));
        assert!(b.is_equal(&a));
    }

    #[test]
    fn test_quoted_flag_matters() {
        let a = AST::string(0, "x", true);
        let b = AST::string(0, "x", false);
        assert!(!a.is_equal(&b));
    }

    #[test]
    fn test_kind_mismatch() {
        let a = AST::var(0, "$x");
        let b = AST::string(0, "$x", false);
        let err = a.compare(&b, CmpMode::Diagnostic).unwrap_err();
        assert_eq!(err.detail, "expression kind variable != string");
    }

    #[test]
    fn test_diagnostic_reports_path() {
        let a = AST::tree("t", vec![cd(0, AST::var(3, "$HOME"))]);
        let b = AST::tree("t", vec![cd(0, AST::var(3, "$PATH"))]);
        let err = a.compare(&b, CmpMode::Diagnostic).unwrap_err();
        assert_eq!(err.path, "nodes[0].args[0].name");
        assert_eq!(err.detail, "\"$HOME\" != \"$PATH\"");
        let diff = err.diff.unwrap();
        assert!(diff.contains("-cd $HOME"));
        assert!(diff.contains("+cd $PATH"));
    }

    #[test]
    fn test_silent_mode_records_nothing() {
        let a = AST::tree("t", vec![cd(0, AST::var(3, "$HOME"))]);
        let b = AST::tree("t", vec![]);
        let err = a.compare(&b, CmpMode::Silent).unwrap_err();
        assert!(err.path.is_empty());
        assert!(err.diff.is_none());
    }

    #[test]
    fn test_nested_tree_reports_inner_path() {
        let body = |arg: &str| AST::tree("f", vec![cd(0, AST::string(0, arg, false))]);
        let a = AST::tree("t", vec![AST::fn_decl(0, "f", &["x"], body("a")).into()]);
        let b = AST::tree("t", vec![AST::fn_decl(0, "f", &["x"], body("b")).into()]);
        let err = a.compare(&b, CmpMode::Diagnostic).unwrap_err();
        assert_eq!(err.path, "nodes[0].body.nodes[0].args[0].value");
        assert!(err.to_string().starts_with("nodes[0].body.nodes[0].args[0].value: "));
    }

    #[test]
    fn test_sequence_length_mismatch() {
        let a = AST::list(0, vec![AST::number(1, "1"), AST::number(3, "2")]);
        let b = AST::list(0, vec![AST::number(1, "1")]);
        let err = a.compare(&b, CmpMode::Diagnostic).unwrap_err();
        assert_eq!(err.path, "values");
        assert_eq!(err.detail, "length 2 != 1");
    }

    #[test]
    fn test_optional_else_branch() {
        let branch = || AST::tree("if", vec![]);
        let with_else = AST::if_node(
            0,
            AST::var(0, "$a"),
            Comparison::Equal,
            AST::string(0, "", true),
            branch(),
            Some(AST::tree("else", vec![])),
        );
        let without_else = AST::if_node(
            0,
            AST::var(0, "$a"),
            Comparison::Equal,
            AST::string(0, "", true),
            branch(),
            None,
        );
        let err = with_else.compare(&without_else, CmpMode::Diagnostic).unwrap_err();
        assert_eq!(err.path, "else_tree");
        assert_eq!(err.detail, "present != absent");
    }
}
