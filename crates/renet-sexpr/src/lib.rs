//! S-expression tree for KiCad board files.
//!
//! Every node remembers the byte range it was parsed from, so callers can
//! locate a value in the original text and rewrite just that range with a
//! [`PatchSet`]. Everything outside the patched ranges is written back
//! untouched, which keeps KiCad's own formatting intact.

mod parser;
mod patch;
mod quote;

pub use parser::{parse, ParseError, Parser};
pub use patch::{Patch, PatchSet};
pub use quote::{escape_string, quote_string};

/// Byte range of a node within the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span covering `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`, used for insertions.
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for zero-width (insertion) spans.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SexprKind {
    /// Unquoted atom such as `pad`, `smd` or `F.Cu`.
    Symbol(String),
    /// Quoted atom, stored unescaped.
    String(String),
    Int(i64),
    F64(f64),
    List(Vec<Sexpr>),
}

/// A parsed node and the byte range it came from.
#[derive(Debug, Clone)]
pub struct Sexpr {
    pub kind: SexprKind,
    pub span: Span,
}

impl PartialEq for Sexpr {
    // Structural equality only; where a node came from does not matter.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Sexpr {
    /// Create a node from its kind and source span.
    pub fn new(kind: SexprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The text of an unquoted symbol.
    pub fn as_sym(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// The unescaped contents of a quoted string.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// Symbol or string content. Older KiCad versions write some identifiers
    /// (uuids, group members) unquoted, newer ones quote them.
    pub fn as_atom(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) | SexprKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if this node is an integer atom.
    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            SexprKind::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Numeric value; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self.kind {
            SexprKind::F64(f) => Some(f),
            SexprKind::Int(n) => Some(n as f64),
            _ => None,
        }
    }

    /// Child nodes, including the leading tag.
    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match &self.kind {
            SexprKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// True if this node is a list.
    pub fn is_list(&self) -> bool {
        matches!(self.kind, SexprKind::List(_))
    }

    /// Leading symbol of a list: `pad` for `(pad "1" smd ...)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()?.first()?.as_sym()
    }

    /// First direct child list whose tag is `name`.
    pub fn find_list(&self, name: &str) -> Option<&Sexpr> {
        self.as_list()?
            .iter()
            .skip(1)
            .find(|item| item.tag() == Some(name))
    }

    /// All direct child lists whose tag is `name`, in source order.
    pub fn find_all_lists<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Sexpr> + 'a {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .skip(1)
            .filter(move |item| item.tag() == Some(name))
    }

    /// Item at `index` of a list, counting the tag as index 0.
    pub fn get(&self, index: usize) -> Option<&Sexpr> {
        self.as_list()?.get(index)
    }

    /// Depth-first traversal; the callback sees every node once, parents
    /// before children.
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(&Sexpr, WalkCtx<'_>),
    {
        fn visit<'a, F>(
            node: &'a Sexpr,
            ancestors: &mut Vec<&'a Sexpr>,
            index_in_parent: Option<usize>,
            f: &mut F,
        ) where
            F: FnMut(&Sexpr, WalkCtx<'_>),
        {
            f(
                node,
                WalkCtx {
                    ancestors,
                    index_in_parent,
                },
            );
            if let Some(children) = node.as_list() {
                ancestors.push(node);
                for (i, child) in children.iter().enumerate() {
                    visit(child, ancestors, Some(i), f);
                }
                ancestors.pop();
            }
        }

        let mut ancestors = Vec::new();
        visit(self, &mut ancestors, None, &mut f);
    }

    /// Walk only string literals, handing over the unescaped value and span.
    pub fn walk_strings<F>(&self, mut f: F)
    where
        F: FnMut(&str, Span, WalkCtx<'_>),
    {
        self.walk(|node, ctx| {
            if let SexprKind::String(s) = &node.kind {
                f(s, node.span, ctx);
            }
        });
    }
}

/// Position of a node during [`Sexpr::walk`].
#[derive(Debug, Clone)]
pub struct WalkCtx<'a> {
    /// Root first, direct parent last.
    pub ancestors: &'a [&'a Sexpr],
    pub index_in_parent: Option<usize>,
}

impl<'a> WalkCtx<'a> {
    /// The list directly containing the visited node.
    pub fn parent(&self) -> Option<&'a Sexpr> {
        self.ancestors.last().copied()
    }

    /// Tag of the parent list, e.g. `net` inside `(net 1 "GND")`.
    pub fn parent_tag(&self) -> Option<&'a str> {
        self.parent()?.tag()
    }

    /// Tag of the list two levels up.
    pub fn grandparent_tag(&self) -> Option<&'a str> {
        let n = self.ancestors.len();
        if n < 2 {
            return None;
        }
        self.ancestors[n - 2].tag()
    }
}
