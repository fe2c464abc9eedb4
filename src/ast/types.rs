//! Abstract Syntax Tree (AST) Types for shlang
//!
//! This module defines the AST produced by the parser. Statements and
//! expressions are two closed families (`Node` and `Expr`) so consumers can
//! match them exhaustively.
//!
//! Nodes are immutable once built. Shapes that are assembled piece by piece
//! (commands, pipelines) go through builder values; shapes with invariants
//! (concatenations, pipelines, exec assignments, fd redirects) go through
//! validating constructors that return [`AstError`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// BASE TYPES
// =============================================================================

/// Byte offset into the parsed source.
///
/// Positions are diagnostics only: structural equality never looks at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Pos(pub usize);

impl Pos {
    pub fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while constructing nodes with invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AstError {
    #[error("exec assignment requires a command or pipeline, found {found}")]
    InvalidExecSource { found: &'static str },

    #[error("concatenation requires at least two parts, found {0}")]
    ConcatTooShort(usize),

    #[error("a list cannot be concatenated")]
    ListInConcat,

    #[error("pipeline requires at least two commands, found {0}")]
    PipeTooShort(usize),

    #[error("invalid comparison operator '{0}', expected '==' or '!='")]
    InvalidComparison(String),

    #[error("redirect to a file descriptor requires a source descriptor")]
    RedirectWithoutFd,
}

// =============================================================================
// TREE & LIST
// =============================================================================

/// A named statement list: a program, a function body or a branch.
#[derive(Debug, Clone, Serialize)]
pub struct Tree {
    name: String,
    root: ListNode,
}

impl Tree {
    pub fn new(name: impl Into<String>, root: ListNode) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    /// Diagnostic label; never interpreted.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &ListNode {
        &self.root
    }

    pub fn nodes(&self) -> &[Node] {
        self.root.nodes()
    }
}

/// Ordered statement sequence. Append-only while a tree is being built.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ListNode {
    nodes: Vec<Node>,
}

impl ListNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.nodes.push(node.into());
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<N: Into<Node>> FromIterator<N> for ListNode {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// STATEMENTS
// =============================================================================

/// Union of all statement types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Command(CommandNode),
    Pipe(PipeNode),
    Assignment(AssignmentNode),
    ExecAssign(ExecAssignNode),
    FnDecl(FnDeclNode),
    FnInv(FnInvNode),
    If(IfNode),
    For(ForNode),
    Rfork(RforkNode),
    Import(ImportNode),
    SetEnv(SetEnvNode),
    ShowEnv(ShowEnvNode),
    BindFn(BindFnNode),
    Dump(DumpNode),
    Return(ReturnNode),
    Builtin(BuiltinNode),
}

/// Discriminant of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Command,
    Pipe,
    Assignment,
    ExecAssign,
    FnDecl,
    FnInv,
    If,
    For,
    Rfork,
    Import,
    SetEnv,
    ShowEnv,
    BindFn,
    Dump,
    Return,
    Builtin,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Pipe => "pipe",
            Self::Assignment => "assignment",
            Self::ExecAssign => "exec assignment",
            Self::FnDecl => "function declaration",
            Self::FnInv => "function invocation",
            Self::If => "if",
            Self::For => "for",
            Self::Rfork => "rfork",
            Self::Import => "import",
            Self::SetEnv => "setenv",
            Self::ShowEnv => "showenv",
            Self::BindFn => "bindfn",
            Self::Dump => "dump",
            Self::Return => "return",
            Self::Builtin => "builtin",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Command(_) => NodeKind::Command,
            Node::Pipe(_) => NodeKind::Pipe,
            Node::Assignment(_) => NodeKind::Assignment,
            Node::ExecAssign(_) => NodeKind::ExecAssign,
            Node::FnDecl(_) => NodeKind::FnDecl,
            Node::FnInv(_) => NodeKind::FnInv,
            Node::If(_) => NodeKind::If,
            Node::For(_) => NodeKind::For,
            Node::Rfork(_) => NodeKind::Rfork,
            Node::Import(_) => NodeKind::Import,
            Node::SetEnv(_) => NodeKind::SetEnv,
            Node::ShowEnv(_) => NodeKind::ShowEnv,
            Node::BindFn(_) => NodeKind::BindFn,
            Node::Dump(_) => NodeKind::Dump,
            Node::Return(_) => NodeKind::Return,
            Node::Builtin(_) => NodeKind::Builtin,
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            Node::Command(n) => n.pos,
            Node::Pipe(n) => n.pos,
            Node::Assignment(n) => n.pos,
            Node::ExecAssign(n) => n.pos,
            Node::FnDecl(n) => n.pos,
            Node::FnInv(n) => n.pos,
            Node::If(n) => n.pos,
            Node::For(n) => n.pos,
            Node::Rfork(n) => n.pos,
            Node::Import(n) => n.pos,
            Node::SetEnv(n) => n.pos,
            Node::ShowEnv(n) => n.pos,
            Node::BindFn(n) => n.pos,
            Node::Dump(n) => n.pos,
            Node::Return(n) => n.pos,
            Node::Builtin(n) => n.pos,
        }
    }
}

macro_rules! impl_from_variant {
    ($enum:ident { $($variant:ident($ty:ty)),* $(,)? }) => {
        $(
            impl From<$ty> for $enum {
                fn from(value: $ty) -> Self {
                    $enum::$variant(value)
                }
            }
        )*
    };
}

impl_from_variant!(Node {
    Command(CommandNode),
    Pipe(PipeNode),
    Assignment(AssignmentNode),
    ExecAssign(ExecAssignNode),
    FnDecl(FnDeclNode),
    FnInv(FnInvNode),
    If(IfNode),
    For(ForNode),
    Rfork(RforkNode),
    Import(ImportNode),
    SetEnv(SetEnvNode),
    ShowEnv(ShowEnvNode),
    BindFn(BindFnNode),
    Dump(DumpNode),
    Return(ReturnNode),
    Builtin(BuiltinNode),
});

// =============================================================================
// COMMANDS & PIPELINES
// =============================================================================

/// Simple command: name args... with optional redirections
#[derive(Debug, Clone, Serialize)]
pub struct CommandNode {
    pos: Pos,
    name: String,
    args: Vec<Expr>,
    redirects: Vec<RedirectNode>,
    background: bool,
}

impl CommandNode {
    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    pub fn redirects(&self) -> &[RedirectNode] {
        &self.redirects
    }

    pub fn is_background(&self) -> bool {
        self.background
    }
}

/// Incremental construction of a [`CommandNode`]
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    node: CommandNode,
}

impl CommandBuilder {
    pub fn new(pos: Pos, name: impl Into<String>) -> Self {
        Self {
            node: CommandNode {
                pos,
                name: name.into(),
                args: Vec::new(),
                redirects: Vec::new(),
                background: false,
            },
        }
    }

    pub fn add_arg(&mut self, arg: Expr) -> &mut Self {
        self.node.args.push(arg);
        self
    }

    pub fn add_redirect(&mut self, redirect: RedirectNode) -> &mut Self {
        self.node.redirects.push(redirect);
        self
    }

    pub fn set_background(&mut self, background: bool) -> &mut Self {
        self.node.background = background;
        self
    }

    pub fn build(self) -> CommandNode {
        self.node
    }
}

/// A pipeline: cmd1 | cmd2 | cmd3
#[derive(Debug, Clone, Serialize)]
pub struct PipeNode {
    pos: Pos,
    commands: Vec<CommandNode>,
    background: bool,
}

impl PipeNode {
    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn commands(&self) -> &[CommandNode] {
        &self.commands
    }

    pub fn is_background(&self) -> bool {
        self.background
    }
}

/// Incremental construction of a [`PipeNode`]
#[derive(Debug, Clone)]
pub struct PipeBuilder {
    pos: Pos,
    commands: Vec<CommandNode>,
    background: bool,
}

impl PipeBuilder {
    pub fn new(pos: Pos) -> Self {
        Self {
            pos,
            commands: Vec::new(),
            background: false,
        }
    }

    pub fn add_command(&mut self, command: CommandNode) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn set_background(&mut self, background: bool) -> &mut Self {
        self.background = background;
        self
    }

    pub fn build(self) -> Result<PipeNode, AstError> {
        if self.commands.len() < 2 {
            return Err(AstError::PipeTooShort(self.commands.len()));
        }
        Ok(PipeNode {
            pos: self.pos,
            commands: self.commands,
            background: self.background,
        })
    }
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectOp {
    Write,  // >
    Append, // >>
    Read,   // <
}

impl fmt::Display for RedirectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RedirectOp::Write => ">",
            RedirectOp::Append => ">>",
            RedirectOp::Read => "<",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RedirectTarget {
    /// File or other location expression: `> out.txt`
    Location(Expr),
    /// Duplicate onto another descriptor: `>[2=1]`
    Fd(i32),
    /// Close the descriptor: `>[2=]`
    Close,
}

/// I/O redirection attached to a command
#[derive(Debug, Clone, Serialize)]
pub struct RedirectNode {
    pos: Pos,
    op: RedirectOp,
    fd: Option<i32>,
    target: RedirectTarget,
}

impl RedirectNode {
    pub fn new(
        pos: Pos,
        op: RedirectOp,
        fd: Option<i32>,
        target: RedirectTarget,
    ) -> Result<Self, AstError> {
        if fd.is_none() && !matches!(target, RedirectTarget::Location(_)) {
            return Err(AstError::RedirectWithoutFd);
        }
        Ok(Self { pos, op, fd, target })
    }

    /// Plain `> location` redirect of the default descriptor
    pub fn to_location(pos: Pos, op: RedirectOp, location: Expr) -> Self {
        Self {
            pos,
            op,
            fd: None,
            target: RedirectTarget::Location(location),
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn op(&self) -> RedirectOp {
        self.op
    }

    pub fn fd(&self) -> Option<i32> {
        self.fd
    }

    pub fn target(&self) -> &RedirectTarget {
        &self.target
    }

    pub fn location(&self) -> Option<&Expr> {
        match &self.target {
            RedirectTarget::Location(expr) => Some(expr),
            _ => None,
        }
    }
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

/// Value assignment: `name = expr`
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentNode {
    pos: Pos,
    name: String,
    value: Expr,
}

impl AssignmentNode {
    pub fn new(pos: Pos, name: impl Into<String>, value: Expr) -> Self {
        Self {
            pos,
            name: name.into(),
            value,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }
}

/// Right-hand side of an exec assignment
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecSource {
    Command(CommandNode),
    Pipe(PipeNode),
}

/// Output capture: `name <= command-or-pipeline`
#[derive(Debug, Clone, Serialize)]
pub struct ExecAssignNode {
    pos: Pos,
    name: String,
    command: ExecSource,
}

impl ExecAssignNode {
    /// Fails unless `node` is a command or a pipeline.
    pub fn new(pos: Pos, name: impl Into<String>, node: Node) -> Result<Self, AstError> {
        let command = match node {
            Node::Command(cmd) => ExecSource::Command(cmd),
            Node::Pipe(pipe) => ExecSource::Pipe(pipe),
            other => {
                return Err(AstError::InvalidExecSource {
                    found: other.kind().as_str(),
                })
            }
        };
        Ok(Self {
            pos,
            name: name.into(),
            command,
        })
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &ExecSource {
        &self.command
    }
}

// =============================================================================
// FUNCTIONS
// =============================================================================

/// Function declaration: `fn name(params) { body }`
#[derive(Debug, Clone, Serialize)]
pub struct FnDeclNode {
    pos: Pos,
    name: String,
    params: Vec<String>,
    body: Tree,
}

impl FnDeclNode {
    pub fn new(pos: Pos, name: impl Into<String>, params: Vec<String>, body: Tree) -> Self {
        Self {
            pos,
            name: name.into(),
            params,
            body,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Tree {
        &self.body
    }
}

/// Function invocation: `name(args)`
#[derive(Debug, Clone, Serialize)]
pub struct FnInvNode {
    pos: Pos,
    name: String,
    args: Vec<Expr>,
}

impl FnInvNode {
    pub fn new(pos: Pos, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            pos,
            name: name.into(),
            args,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }
}

// =============================================================================
// CONTROL FLOW
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
        }
    }
}

impl FromStr for Comparison {
    type Err = AstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Comparison::Equal),
            "!=" => Ok(Comparison::NotEqual),
            other => Err(AstError::InvalidComparison(other.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `if lvalue op rvalue { ... } else { ... }`
#[derive(Debug, Clone, Serialize)]
pub struct IfNode {
    pos: Pos,
    lvalue: Expr,
    op: Comparison,
    rvalue: Expr,
    if_tree: Tree,
    else_tree: Option<Tree>,
}

impl IfNode {
    pub fn new(
        pos: Pos,
        lvalue: Expr,
        op: Comparison,
        rvalue: Expr,
        if_tree: Tree,
        else_tree: Option<Tree>,
    ) -> Self {
        Self {
            pos,
            lvalue,
            op,
            rvalue,
            if_tree,
            else_tree,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn lvalue(&self) -> &Expr {
        &self.lvalue
    }

    pub fn op(&self) -> Comparison {
        self.op
    }

    pub fn rvalue(&self) -> &Expr {
        &self.rvalue
    }

    pub fn if_tree(&self) -> &Tree {
        &self.if_tree
    }

    pub fn else_tree(&self) -> Option<&Tree> {
        self.else_tree.as_ref()
    }
}

/// `for { ... }` or `for name in expr { ... }`
#[derive(Debug, Clone, Serialize)]
pub struct ForNode {
    pos: Pos,
    ident: Option<String>,
    in_expr: Option<Expr>,
    body: Tree,
}

impl ForNode {
    /// Endless loop
    pub fn forever(pos: Pos, body: Tree) -> Self {
        Self {
            pos,
            ident: None,
            in_expr: None,
            body,
        }
    }

    /// Iteration over the values of `in_expr`
    pub fn each(pos: Pos, ident: impl Into<String>, in_expr: Expr, body: Tree) -> Self {
        Self {
            pos,
            ident: Some(ident.into()),
            in_expr: Some(in_expr),
            body,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    pub fn in_expr(&self) -> Option<&Expr> {
        self.in_expr.as_ref()
    }

    pub fn body(&self) -> &Tree {
        &self.body
    }
}

/// `rfork flags { ... }`: run the block in a new namespace
#[derive(Debug, Clone, Serialize)]
pub struct RforkNode {
    pos: Pos,
    flags: Expr,
    body: Option<Tree>,
}

impl RforkNode {
    pub fn new(pos: Pos, flags: Expr, body: Option<Tree>) -> Self {
        Self { pos, flags, body }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn flags(&self) -> &Expr {
        &self.flags
    }

    pub fn body(&self) -> Option<&Tree> {
        self.body.as_ref()
    }
}

// =============================================================================
// KEYWORD STATEMENTS
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ImportNode {
    pos: Pos,
    path: Expr,
}

impl ImportNode {
    pub fn new(pos: Pos, path: Expr) -> Self {
        Self { pos, path }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn path(&self) -> &Expr {
        &self.path
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetEnvNode {
    pos: Pos,
    name: String,
}

impl SetEnvNode {
    pub fn new(pos: Pos, name: impl Into<String>) -> Self {
        Self {
            pos,
            name: name.into(),
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowEnvNode {
    pos: Pos,
}

impl ShowEnvNode {
    pub fn new(pos: Pos) -> Self {
        Self { pos }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }
}

/// `bindfn fn_name cmd_name`: expose a function as a command
#[derive(Debug, Clone, Serialize)]
pub struct BindFnNode {
    pos: Pos,
    fn_name: String,
    cmd_name: String,
}

impl BindFnNode {
    pub fn new(pos: Pos, fn_name: impl Into<String>, cmd_name: impl Into<String>) -> Self {
        Self {
            pos,
            fn_name: fn_name.into(),
            cmd_name: cmd_name.into(),
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn fn_name(&self) -> &str {
        &self.fn_name
    }

    pub fn cmd_name(&self) -> &str {
        &self.cmd_name
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpNode {
    pos: Pos,
    file: Option<Expr>,
}

impl DumpNode {
    pub fn new(pos: Pos, file: Option<Expr>) -> Self {
        Self { pos, file }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn file(&self) -> Option<&Expr> {
        self.file.as_ref()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnNode {
    pos: Pos,
    value: Option<Expr>,
}

impl ReturnNode {
    pub fn new(pos: Pos, value: Option<Expr>) -> Self {
        Self { pos, value }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn value(&self) -> Option<&Expr> {
        self.value.as_ref()
    }
}

/// `builtin cmd args...`: run a command bypassing user functions
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinNode {
    pos: Pos,
    command: CommandNode,
}

impl BuiltinNode {
    pub fn new(pos: Pos, command: CommandNode) -> Self {
        Self { pos, command }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn command(&self) -> &CommandNode {
        &self.command
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

/// Union of all value-producing expressions
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Var(VarExpr),
    String(StringExpr),
    Number(NumberExpr),
    Concat(ConcatExpr),
    List(ListExpr),
}

/// Discriminant of an [`Expr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Var,
    String,
    Number,
    Concat,
    List,
}

impl ExprKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Var => "variable",
            Self::String => "string",
            Self::Number => "number",
            Self::Concat => "concatenation",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Var(_) => ExprKind::Var,
            Expr::String(_) => ExprKind::String,
            Expr::Number(_) => ExprKind::Number,
            Expr::Concat(_) => ExprKind::Concat,
            Expr::List(_) => ExprKind::List,
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            Expr::Var(e) => e.pos,
            Expr::String(e) => e.pos,
            Expr::Number(e) => e.pos,
            Expr::Concat(e) => e.pos,
            Expr::List(e) => e.pos,
        }
    }
}

impl_from_variant!(Expr {
    Var(VarExpr),
    String(StringExpr),
    Number(NumberExpr),
    Concat(ConcatExpr),
    List(ListExpr),
});

/// `$name` reference; the name keeps its leading `$`
#[derive(Debug, Clone, Serialize)]
pub struct VarExpr {
    pos: Pos,
    name: String,
}

impl VarExpr {
    pub fn new(pos: Pos, name: impl Into<String>) -> Self {
        Self {
            pos,
            name: name.into(),
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// String literal. `quoted` records whether it was written between quotes.
#[derive(Debug, Clone, Serialize)]
pub struct StringExpr {
    pos: Pos,
    value: String,
    quoted: bool,
}

impl StringExpr {
    pub fn new(pos: Pos, value: impl Into<String>, quoted: bool) -> Self {
        Self {
            pos,
            value: value.into(),
            quoted,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }
}

/// Decimal number literal, kept as written
#[derive(Debug, Clone, Serialize)]
pub struct NumberExpr {
    pos: Pos,
    value: String,
}

impl NumberExpr {
    pub fn new(pos: Pos, value: impl Into<String>) -> Self {
        Self {
            pos,
            value: value.into(),
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Flattened `a+b+c` chain
#[derive(Debug, Clone, Serialize)]
pub struct ConcatExpr {
    pos: Pos,
    parts: Vec<Expr>,
}

impl ConcatExpr {
    pub fn new(pos: Pos, parts: Vec<Expr>) -> Result<Self, AstError> {
        if parts.len() < 2 {
            return Err(AstError::ConcatTooShort(parts.len()));
        }
        if parts.iter().any(|p| matches!(p, Expr::List(_))) {
            return Err(AstError::ListInConcat);
        }
        Ok(Self { pos, parts })
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn parts(&self) -> &[Expr] {
        &self.parts
    }
}

/// Parenthesized list literal: `(a $b "c")`
#[derive(Debug, Clone, Serialize)]
pub struct ListExpr {
    pos: Pos,
    values: Vec<Expr>,
}

impl ListExpr {
    pub fn new(pos: Pos, values: Vec<Expr>) -> Self {
        Self { pos, values }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn values(&self) -> &[Expr] {
        &self.values
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Shorthand constructors, mostly for building expected trees by hand.
///
/// Positions are taken as plain offsets; use `0` when they do not matter.
pub struct AST;

impl AST {
    pub fn tree(name: impl Into<String>, nodes: Vec<Node>) -> Tree {
        Tree::new(name, nodes.into_iter().collect())
    }

    pub fn var(pos: usize, name: impl Into<String>) -> Expr {
        Expr::Var(VarExpr::new(Pos(pos), name))
    }

    pub fn string(pos: usize, value: impl Into<String>, quoted: bool) -> Expr {
        Expr::String(StringExpr::new(Pos(pos), value, quoted))
    }

    pub fn number(pos: usize, value: impl Into<String>) -> Expr {
        Expr::Number(NumberExpr::new(Pos(pos), value))
    }

    pub fn concat(pos: usize, parts: Vec<Expr>) -> Result<Expr, AstError> {
        Ok(Expr::Concat(ConcatExpr::new(Pos(pos), parts)?))
    }

    pub fn list(pos: usize, values: Vec<Expr>) -> Expr {
        Expr::List(ListExpr::new(Pos(pos), values))
    }

    pub fn command(
        pos: usize,
        name: impl Into<String>,
        args: Vec<Expr>,
        redirects: Vec<RedirectNode>,
        background: bool,
    ) -> CommandNode {
        let mut builder = CommandBuilder::new(Pos(pos), name);
        for arg in args {
            builder.add_arg(arg);
        }
        for redirect in redirects {
            builder.add_redirect(redirect);
        }
        builder.set_background(background);
        builder.build()
    }

    pub fn pipe(
        pos: usize,
        commands: Vec<CommandNode>,
        background: bool,
    ) -> Result<PipeNode, AstError> {
        let mut builder = PipeBuilder::new(Pos(pos));
        for command in commands {
            builder.add_command(command);
        }
        builder.set_background(background);
        builder.build()
    }

    pub fn redirect(pos: usize, op: RedirectOp, location: Expr) -> RedirectNode {
        RedirectNode::to_location(Pos(pos), op, location)
    }

    pub fn assignment(pos: usize, name: impl Into<String>, value: Expr) -> AssignmentNode {
        AssignmentNode::new(Pos(pos), name, value)
    }

    pub fn exec_assign(
        pos: usize,
        name: impl Into<String>,
        node: impl Into<Node>,
    ) -> Result<ExecAssignNode, AstError> {
        ExecAssignNode::new(Pos(pos), name, node.into())
    }

    pub fn fn_decl(pos: usize, name: impl Into<String>, params: &[&str], body: Tree) -> FnDeclNode {
        let params = params.iter().map(|p| p.to_string()).collect();
        FnDeclNode::new(Pos(pos), name, params, body)
    }

    pub fn fn_inv(pos: usize, name: impl Into<String>, args: Vec<Expr>) -> FnInvNode {
        FnInvNode::new(Pos(pos), name, args)
    }

    pub fn if_node(
        pos: usize,
        lvalue: Expr,
        op: Comparison,
        rvalue: Expr,
        if_tree: Tree,
        else_tree: Option<Tree>,
    ) -> IfNode {
        IfNode::new(Pos(pos), lvalue, op, rvalue, if_tree, else_tree)
    }
}
