//! Template renderer implementation.
//!
//! Supports:
//! - Variable substitution (`{{name}}`, `{{item.field}}`, `{{this.field}}`)
//! - Iteration (`{{#each collection}}...{{/each}}`), nested up to
//!   [`MAX_NESTING_DEPTH`] levels
//! - Conditionals (`{{#if name}}...{{/if}}`), true for non-empty values
//!
//! Inside an iteration the current item is addressed by the singular of
//! the collection name (`dates` -> `date`, `entries` -> `entry`) or by
//! `this`. A bare name resolves against the innermost item first, then
//! outward, then the top-level context.
//!
//! Block tags alone on their line are removed together with that line.

use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Maximum number of items in one iteration.
const MAX_ITERATION_ITEMS: usize = 10_000;

/// Maximum nesting depth of blocks.
pub const MAX_NESTING_DEPTH: usize = 4;

/// Any `{{ ... }}` tag.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(#each|#if|/each|/if)?\s*([\w.]*)\s*\}\}").unwrap_or_else(|_| unreachable!())
});

/// A value that can be rendered in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderValue {
    /// A simple string value.
    String(String),
    /// A list of items for iteration.
    List(Vec<RenderContext>),
    /// A nested object.
    Object(RenderContext),
}

impl RenderValue {
    /// Returns true if the value counts as set in `{{#if}}`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::String(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Object(_) => true,
        }
    }
}

impl From<String> for RenderValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RenderValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<Vec<RenderContext>> for RenderValue {
    fn from(l: Vec<RenderContext>) -> Self {
        Self::List(l)
    }
}

/// Context for rendering a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    values: HashMap<String, RenderValue>,
}

impl RenderContext {
    /// Creates a new empty render context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a string value.
    pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), RenderValue::String(value.into()));
    }

    /// Adds a list value for iteration.
    pub fn add_list(&mut self, name: impl Into<String>, items: Vec<Self>) {
        self.values.insert(name.into(), RenderValue::List(items));
    }

    /// Adds any render value.
    pub fn add_value(&mut self, name: impl Into<String>, value: RenderValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`Self::add_string`].
    #[must_use]
    pub fn with_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_string(name, value);
        self
    }

    /// Builder form of [`Self::add_list`].
    #[must_use]
    pub fn with_list(mut self, name: impl Into<String>, items: Vec<Self>) -> Self {
        self.add_list(name, items);
        self
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RenderValue> {
        self.values.get(name)
    }

    /// Gets a string value.
    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(RenderValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Gets a list value.
    #[must_use]
    pub fn get_list(&self, name: &str) -> Option<&[Self]> {
        match self.values.get(name) {
            Some(RenderValue::List(l)) => Some(l),
            _ => None,
        }
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Node {
    Text(String),
    Var(String),
    Each { collection: String, body: Vec<Node> },
    If { path: String, body: Vec<Node> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Each,
    If,
}

impl BlockKind {
    const fn name(self) -> &'static str {
        match self {
            Self::Each => "each",
            Self::If => "if",
        }
    }
}

struct Frame {
    kind: BlockKind,
    name: String,
    nodes: Vec<Node>,
}

struct Scope<'a> {
    prefix: String,
    item: &'a RenderContext,
}

/// Template rendering engine.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    /// Creates a new template renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `template` with `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publish`] if the template is malformed (unbalanced
    /// or too deeply nested blocks), references an unknown variable or
    /// collection, or iterates over too many items.
    pub fn render(&self, template: &str, ctx: &RenderContext) -> Result<String> {
        let nodes = parse(template)?;
        let mut out = String::with_capacity(template.len());
        let mut scopes = Vec::new();
        render_nodes(&nodes, ctx, &mut scopes, &mut out)?;
        Ok(out)
    }
}

fn template_error(cause: impl std::fmt::Display) -> Error {
    Error::publish("render_template", cause)
}

/// Splits the template into a block tree.
fn parse(template: &str) -> Result<Vec<Node>> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for captures in TAG_PATTERN.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let keyword = captures.get(1).map(|m| m.as_str());
        let name = captures.get(2).map_or("", |m| m.as_str()).to_string();

        // Standalone block tags take their whole line with them.
        let (text_end, next_cursor) = match keyword {
            Some(_) => standalone_span(template, cursor, whole.start(), whole.end()),
            None => (whole.start(), whole.end()),
        };

        let current = stack.last_mut().map_or(&mut root, |frame| &mut frame.nodes);
        if text_end > cursor {
            current.push(Node::Text(template[cursor..text_end].to_string()));
        }
        cursor = next_cursor;

        match keyword {
            None => {
                if name.is_empty() {
                    return Err(template_error("empty tag"));
                }
                current.push(Node::Var(name));
            },
            Some(open @ ("#each" | "#if")) => {
                if name.is_empty() {
                    return Err(template_error(format!("{{{{{open}}}}} needs a name")));
                }
                if stack.len() >= MAX_NESTING_DEPTH {
                    return Err(template_error(format!(
                        "blocks nested deeper than {MAX_NESTING_DEPTH} levels"
                    )));
                }
                let kind = if open == "#each" {
                    BlockKind::Each
                } else {
                    BlockKind::If
                };
                stack.push(Frame {
                    kind,
                    name,
                    nodes: Vec::new(),
                });
            },
            Some(close) => {
                let kind = if close == "/each" {
                    BlockKind::Each
                } else {
                    BlockKind::If
                };
                let frame = stack
                    .pop()
                    .ok_or_else(|| template_error(format!("unexpected {{{{{close}}}}}")))?;
                if frame.kind != kind {
                    return Err(template_error(format!(
                        "{{{{/{}}}}} closes a {{{{#{}}}}} block",
                        kind.name(),
                        frame.kind.name()
                    )));
                }
                let node = match frame.kind {
                    BlockKind::Each => Node::Each {
                        collection: frame.name,
                        body: frame.nodes,
                    },
                    BlockKind::If => Node::If {
                        path: frame.name,
                        body: frame.nodes,
                    },
                };
                stack
                    .last_mut()
                    .map_or(&mut root, |frame| &mut frame.nodes)
                    .push(node);
            },
        }
    }

    if let Some(frame) = stack.last() {
        return Err(template_error(format!(
            "unclosed {{{{#{} {}}}}}",
            frame.kind.name(),
            frame.name
        )));
    }

    if cursor < template.len() {
        root.push(Node::Text(template[cursor..].to_string()));
    }
    Ok(root)
}

/// Returns where preceding text ends and where the next text starts.
///
/// When the tag is the only thing on its line, the line is dropped.
fn standalone_span(template: &str, cursor: usize, start: usize, end: usize) -> (usize, usize) {
    let line_start = template[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = template[end..]
        .find('\n')
        .map_or(template.len(), |i| end + i + 1);

    let before_blank = line_start >= cursor && template[line_start..start].trim().is_empty();
    let after_blank = template[end..line_end].trim().is_empty();

    if before_blank && after_blank {
        (line_start, line_end)
    } else {
        (start, end)
    }
}

fn render_nodes<'a>(
    nodes: &[Node],
    root: &'a RenderContext,
    scopes: &mut Vec<Scope<'a>>,
    out: &mut String,
) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => match resolve(path, root, scopes) {
                Some(RenderValue::String(s)) => out.push_str(s),
                Some(_) => {
                    return Err(template_error(format!("'{path}' is not a plain value")));
                },
                None => return Err(template_error(format!("unknown variable '{path}'"))),
            },
            Node::If { path, body } => {
                if resolve(path, root, scopes).is_some_and(RenderValue::is_truthy) {
                    render_nodes(body, root, scopes, out)?;
                }
            },
            Node::Each { collection, body } => {
                let items = match resolve(collection, root, scopes) {
                    Some(RenderValue::List(items)) => items,
                    _ => {
                        return Err(template_error(format!(
                            "iteration collection '{collection}' not found or not a list"
                        )));
                    },
                };
                if items.len() > MAX_ITERATION_ITEMS {
                    return Err(template_error(format!(
                        "iteration collection '{collection}' has {} items, max is {MAX_ITERATION_ITEMS}",
                        items.len()
                    )));
                }

                let last_segment = collection.rsplit('.').next().unwrap_or(collection);
                let prefix = get_item_prefix(last_segment);
                for item in items {
                    scopes.push(Scope {
                        prefix: prefix.clone(),
                        item,
                    });
                    let rendered = render_nodes(body, root, scopes, out);
                    scopes.pop();
                    rendered?;
                }
            },
        }
    }
    Ok(())
}

/// Looks up a dotted path.
fn resolve<'a>(
    path: &str,
    root: &'a RenderContext,
    scopes: &[Scope<'a>],
) -> Option<&'a RenderValue> {
    let segments: Vec<&str> = path.split('.').collect();
    let (first, rest) = segments.split_first()?;

    let scoped = if rest.is_empty() {
        None
    } else {
        scopes
            .iter()
            .rev()
            .find(|scope| *first == "this" || scope.prefix == *first)
            .map(|scope| (scope.item.get(rest[0]), &rest[1..]))
    };

    let (mut value, rest) = match scoped {
        Some(found) => found,
        None => {
            let bare = scopes
                .iter()
                .rev()
                .find_map(|scope| scope.item.get(first))
                .or_else(|| root.get(first));
            (bare, rest)
        },
    };

    for segment in rest {
        value = match value? {
            RenderValue::Object(ctx) => ctx.get(segment),
            _ => None,
        };
    }
    value
}

/// Gets the item prefix for a collection name.
///
/// Converts plural collection names to singular item prefixes.
fn get_item_prefix(collection_name: &str) -> String {
    if let Some(stripped) = collection_name.strip_suffix("ies") {
        return format!("{stripped}y");
    }
    if let Some(stripped) = collection_name.strip_suffix('s') {
        return stripped.to_string();
    }
    collection_name.to_string()
}
