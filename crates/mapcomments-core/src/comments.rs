//! Comment groups and their attachment to declarations
//!
//! tree-sitter treats comments as extras that can appear anywhere in the
//! tree, so attachment is computed from positions instead of tree shape,
//! using the same line-based rules as `go/parser`:
//!
//! - comments that start on the line of the previous token (and any comment
//!   starting on the line where the previous one ended) form a *line group*,
//!   the trailing comment of whatever precedes them;
//! - the remaining comments form groups of comments on adjacent lines;
//! - the last group is the *lead* (doc) comment of the next token if it ends
//!   on the line right before it.

use arborium::tree_sitter::{Node, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start_byte: usize,
    end_byte: usize,
    start_row: usize,
    end_row: usize,
}

impl Span {
    fn of(node: Node) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_row: node.start_position().row,
            end_row: node.end_position().row,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Token {
    span: Span,
    semicolon: bool,
}

/// Positions of every comment and every real token of one file.
pub struct CommentIndex<'a> {
    source: &'a str,
    comments: Vec<Span>,
    tokens: Vec<Token>,
}

impl<'a> CommentIndex<'a> {
    pub fn new(source: &'a str, tree: &Tree) -> Self {
        let mut index = Self {
            source,
            comments: Vec::new(),
            tokens: Vec::new(),
        };
        index.collect(tree.root_node());
        index
    }

    fn collect(&mut self, node: Node) {
        if node.kind() == "comment" {
            self.comments.push(Span::of(node));
            return;
        }
        if node.child_count() == 0 {
            // Newline terminators and missing nodes are not tokens for our purposes
            let text = &self.source[node.byte_range()];
            if !node.is_missing() && !text.trim().is_empty() {
                self.tokens.push(Token {
                    span: Span::of(node),
                    semicolon: text == ";",
                });
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect(child);
        }
    }

    /// The doc comment group directly above `node`, if any.
    pub fn lead_comment(&self, node: Node) -> Option<CommentGroup<'_>> {
        let start = Span::of(node);

        let before = self
            .tokens
            .partition_point(|t| t.span.end_byte <= start.start_byte);
        let prev = before.checked_sub(1).map(|i| self.tokens[i].span);

        let lo = prev.map_or(0, |t| t.end_byte);
        let first = self.comments.partition_point(|c| c.start_byte < lo);
        let last = self
            .comments
            .partition_point(|c| c.end_byte <= start.start_byte);
        let mut between = self.comments.get(first..last)?;

        if let (Some(prev), Some(c)) = (prev, between.first()) {
            if c.start_row == prev.end_row {
                between = &between[line_group_len(between)..];
            }
        }

        let group = last_group(between)?;
        let end_row = group.last()?.end_row;
        (end_row + 1 == start.start_row).then_some(CommentGroup {
            source: self.source,
            comments: group,
        })
    }

    /// The comment group trailing `node` on its last line, if any.
    pub fn line_comment(&self, node: Node) -> Option<CommentGroup<'_>> {
        let end = Span::of(node);

        let next_idx = self
            .tokens
            .partition_point(|t| t.span.start_byte < end.end_byte);
        let next = self.tokens.get(next_idx);
        let hi = next.map_or(usize::MAX, |t| t.span.start_byte);

        let first = self.comments.partition_point(|c| c.start_byte < end.end_byte);
        let after = &self.comments[first..];
        let count = after.iter().take_while(|c| c.end_byte <= hi).count();
        let after = &after[..count];

        if after.first()?.start_row != end.end_row {
            return None;
        }
        let group = &after[..line_group_len(after)];
        let group_end = group.last()?.end_row;

        if next.is_some_and(|t| t.span.start_row == group_end && !t.semicolon) {
            return None;
        }

        Some(CommentGroup {
            source: self.source,
            comments: group,
        })
    }
}

/// Length of the line group at the start of `comments`: each comment starts
/// on the line where the previous one ended.
fn line_group_len(comments: &[Span]) -> usize {
    let Some(first) = comments.first() else {
        return 0;
    };
    let mut end_row = first.start_row;
    let mut len = 0;
    for c in comments {
        if c.start_row > end_row {
            break;
        }
        end_row = c.end_row;
        len += 1;
    }
    len
}

/// The last run of comments on adjacent lines.
fn last_group(comments: &[Span]) -> Option<&[Span]> {
    let mut start = 0;
    let mut end_row = comments.first()?.end_row;
    for (i, c) in comments.iter().enumerate().skip(1) {
        if c.start_row > end_row + 1 {
            start = i;
        }
        end_row = c.end_row;
    }
    Some(&comments[start..])
}

/// A sequence of comments with no blank line in between.
#[derive(Debug, Clone, Copy)]
pub struct CommentGroup<'a> {
    source: &'a str,
    comments: &'a [Span],
}

impl CommentGroup<'_> {
    /// Raw comment texts, markers included.
    pub fn raw(&self) -> impl Iterator<Item = &str> {
        self.comments
            .iter()
            .map(|c| &self.source[c.start_byte..c.end_byte])
    }

    /// The text of the group with comment markers removed.
    ///
    /// `//` and one following space (or `/*` and `*/`) are stripped, compiler
    /// directives such as `//go:generate` are dropped, trailing whitespace is
    /// removed from every line, leading blank lines are dropped and runs of
    /// blank lines collapse into one. The result is empty or ends with a
    /// single newline.
    pub fn text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        for raw in self.raw() {
            let raw = raw.replace('\r', "");
            let body = if let Some(rest) = raw.strip_prefix("//") {
                if let Some(rest) = rest.strip_prefix(' ') {
                    rest
                } else if is_directive(rest) {
                    continue;
                } else {
                    rest
                }
            } else if let Some(rest) = raw.strip_prefix("/*") {
                rest.strip_suffix("*/").unwrap_or(rest)
            } else {
                raw.as_str()
            };

            lines.extend(body.split('\n').map(|l| l.trim_end().to_string()));
        }

        let mut kept: Vec<String> = Vec::with_capacity(lines.len());
        for line in lines {
            if !line.is_empty() || kept.last().is_some_and(|l| !l.is_empty()) {
                kept.push(line);
            }
        }
        if kept.last().is_some_and(|l| l.is_empty()) {
            kept.pop();
        }
        if kept.is_empty() {
            return String::new();
        }

        let mut text = kept.join("\n");
        text.push('\n');
        text
    }
}

/// Text of an optional group, empty when absent.
pub fn group_text(group: Option<CommentGroup<'_>>) -> String {
    group.map(|g| g.text()).unwrap_or_default()
}

/// `//line `, `//extern `, `//export ` and `[a-z0-9]+:[a-z0-9]` comments are
/// directives for tools, not documentation.
fn is_directive(c: &str) -> bool {
    if c.starts_with("line ") || c.starts_with("extern ") || c.starts_with("export ") {
        return true;
    }

    let bytes = c.as_bytes();
    let Some(colon) = c.find(':') else {
        return false;
    };
    if colon == 0 || colon + 1 >= bytes.len() {
        return false;
    }
    bytes[..=colon + 1]
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != colon)
        .all(|(_, b)| b.is_ascii_lowercase() || b.is_ascii_digit())
}
