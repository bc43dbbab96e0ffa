//! Expression AST.
//!
//! Nodes are stored in an arena owned by [`Expression`]. Children and the
//! parent back-link are [`NodeId`] indices into that arena, so walking upward
//! from any node never involves shared ownership.

use crate::expression::operator::BinaryOperator;
use std::fmt;

/// Index of a node inside its [`Expression`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// How a literal was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Number or string constant. For strings `text` holds the unescaped value.
    Literal { text: String, kind: LiteralKind },
    Boolean(bool),
    Null,
    /// A name to be resolved by a value provider, possibly dotted (`alias.column`)
    Reference(String),
    Binary {
        op: BinaryOperator,
        left: NodeId,
        right: NodeId,
    },
    Call { name: String, args: Vec<NodeId> },
    /// A parenthesized sub-expression
    Group(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
}

/// A parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Expression {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            expression: self,
            next: self.parent(id),
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::Binary { left, right, .. } => vec![*left, *right],
            NodeKind::Call { args, .. } => args.clone(),
            NodeKind::Group(inner) => vec![*inner],
            _ => Vec::new(),
        }
    }

    /// Reference nodes below (and including) `id`, in left-to-right order.
    pub fn reference_nodes_under(&self, id: NodeId) -> Vec<(NodeId, &str)> {
        let mut found = Vec::new();
        self.collect_references(id, &mut found);
        found
    }

    pub fn reference_nodes(&self) -> Vec<(NodeId, &str)> {
        self.reference_nodes_under(self.root)
    }

    /// Referenced names in left-to-right order, duplicates included.
    pub fn references(&self) -> Vec<&str> {
        self.reference_nodes()
            .into_iter()
            .map(|(_, name)| name)
            .collect()
    }

    fn collect_references<'a>(&'a self, id: NodeId, found: &mut Vec<(NodeId, &'a str)>) {
        if let NodeKind::Reference(name) = self.kind(id) {
            found.push((id, name.as_str()));
            return;
        }
        for child in self.children(id) {
            self.collect_references(child, found);
        }
    }

    /// The referenced name if the whole expression is a bare reference.
    pub fn as_reference(&self) -> Option<&str> {
        match self.kind(self.root) {
            NodeKind::Reference(name) => Some(name),
            _ => None,
        }
    }

    /// True if the expression references nothing and can be evaluated without a row.
    pub fn is_constant(&self) -> bool {
        self.reference_nodes().is_empty()
    }

    /// Renders the sub-tree rooted at `id` in canonical form.
    pub fn render_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Literal {
                text,
                kind: LiteralKind::Number,
            } => out.push_str(text),
            NodeKind::Literal {
                text,
                kind: LiteralKind::String,
            } => {
                out.push('\'');
                for ch in text.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\r' => out.push_str("\\r"),
                        other => out.push(other),
                    }
                }
                out.push('\'');
            }
            NodeKind::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            NodeKind::Null => out.push_str("null"),
            NodeKind::Reference(name) => out.push_str(name),
            NodeKind::Binary { op, left, right } => {
                self.write_node(*left, out);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                self.write_node(*right, out);
            }
            NodeKind::Call { name, args } => {
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_node(*arg, out);
                }
                out.push(')');
            }
            NodeKind::Group(inner) => {
                out.push('(');
                self.write_node(*inner, out);
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_node(self.root))
    }
}

/// Iterator over a node's ancestors
pub struct Ancestors<'a> {
    expression: &'a Expression,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.expression.parent(current);
        Some(current)
    }
}

/// Builds an [`Expression`] bottom-up. Parent links are filled in when a
/// node is attached to its parent, so children must be added first.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    nodes: Vec<Node>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let children: Vec<NodeId> = match &kind {
            NodeKind::Binary { left, right, .. } => vec![*left, *right],
            NodeKind::Call { args, .. } => args.clone(),
            NodeKind::Group(inner) => vec![*inner],
            _ => Vec::new(),
        };
        for child in children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(Node { kind, parent: None });
        id
    }

    pub fn literal(&mut self, text: impl Into<String>, kind: LiteralKind) -> NodeId {
        self.add(NodeKind::Literal {
            text: text.into(),
            kind,
        })
    }

    pub fn reference(&mut self, name: impl Into<String>) -> NodeId {
        self.add(NodeKind::Reference(name.into()))
    }

    pub fn binary(&mut self, op: BinaryOperator, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Binary { op, left, right })
    }

    pub fn call(&mut self, name: impl Into<String>, args: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Call {
            name: name.into(),
            args,
        })
    }

    pub fn group(&mut self, inner: NodeId) -> NodeId {
        self.add(NodeKind::Group(inner))
    }

    pub fn finish(self, root: NodeId) -> Expression {
        Expression {
            nodes: self.nodes,
            root,
        }
    }
}
