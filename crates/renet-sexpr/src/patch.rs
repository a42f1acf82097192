use crate::{quote_string, Span};
use std::io::{self, Write};

/// Replace `span` of the source with `text`. A zero-width span inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub span: Span,
    pub text: String,
}

/// Ordered collection of non-overlapping patches against one source text.
///
/// Patches are applied in a single forward pass. Several insertions at the
/// same offset come out in the order they were added, and an insertion at
/// the start of a replaced range is written before the replacement.
#[derive(Debug, Default, Clone)]
pub struct PatchSet {
    patches: Vec<Patch>,
}

impl PatchSet {
    /// An empty patch set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a string literal; `value` is quoted and escaped here.
    pub fn replace_string(&mut self, span: Span, value: &str) {
        self.replace_raw(span, quote_string(value));
    }

    /// Replace `span` with `text` verbatim. An existing patch on exactly the
    /// same span is superseded.
    pub fn replace_raw(&mut self, span: Span, text: String) {
        if !span.is_empty()
            && let Some(existing) = self.patches.iter_mut().find(|p| p.span == span)
        {
            existing.text = text;
            return;
        }
        self.patches.push(Patch { span, text });
    }

    /// Insert `text` at `offset` without consuming any source bytes.
    pub fn insert(&mut self, offset: usize, text: String) {
        self.patches.push(Patch {
            span: Span::at(offset),
            text,
        });
    }

    /// True if no edits have been recorded.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Number of recorded edits.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Recorded edits in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter()
    }

    /// Stream the patched source into `writer`.
    pub fn write_to<W: Write>(&self, source: &str, mut writer: W) -> io::Result<()> {
        let mut ordered: Vec<&Patch> = self.patches.iter().collect();
        // Stable sort: equal offsets keep insertion order, and zero-width
        // inserts sort ahead of a replacement starting at the same byte.
        ordered.sort_by_key(|p| (p.span.start, !p.span.is_empty()));

        debug_assert!(
            ordered
                .windows(2)
                .all(|w| w[0].span.end <= w[1].span.start),
            "overlapping patches"
        );
        debug_assert!(ordered.iter().all(|p| p.span.end <= source.len()));

        let bytes = source.as_bytes();
        let mut cursor = 0;
        for patch in ordered {
            if patch.span.start > cursor {
                writer.write_all(&bytes[cursor..patch.span.start])?;
            }
            writer.write_all(patch.text.as_bytes())?;
            cursor = cursor.max(patch.span.end);
        }
        writer.write_all(&bytes[cursor..])
    }

    /// Patched source as a new string.
    pub fn apply(&self, source: &str) -> String {
        let mut out = Vec::with_capacity(source.len() + self.patches.len() * 16);
        self.write_to(source, &mut out)
            .expect("writing to a Vec<u8> cannot fail");
        // Patches only splice whole UTF-8 strings at node boundaries.
        String::from_utf8(out).expect("patched output is valid UTF-8")
    }
}
