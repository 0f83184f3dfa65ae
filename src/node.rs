//! Abstract markup tree shared by the layout engine and the serializer.
//!
//! A [`Node`] is either a leaf carrying literal text or an element carrying
//! ordered children. Attributes keep insertion order, and that order is the
//! order they are written out in.

use std::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_float(*value)),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Integral floats keep a trailing `.0` so coordinates read the same
/// whether or not they happen to land on a whole pixel.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Children(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: String,
    pub attrs: Vec<(String, AttrValue)>,
    pub content: Content,
}

impl Node {
    /// Element with no attributes and no children yet.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            content: Content::Children(Vec::new()),
        }
    }

    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            content: Content::Text(text.into()),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content = Content::Text(text.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.content = Content::Children(children);
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn children(&self) -> &[Node] {
        match &self.content {
            Content::Children(children) => children,
            Content::Text(_) => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Children(_) => None,
        }
    }

    pub fn to_markup(&self) -> String {
        serialize(self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self, f)
    }
}

/// Renders a node tree to markup text. Values are interpolated verbatim;
/// nothing is escaped.
pub fn serialize(node: &Node) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_node(node, &mut out);
    out
}

fn write_node<W: Write>(node: &Node, out: &mut W) -> fmt::Result {
    let empty = match &node.content {
        Content::Text(text) => text.is_empty(),
        Content::Children(children) => children.is_empty(),
    };
    write!(out, "<{}", node.tag)?;
    for (name, value) in &node.attrs {
        write!(out, " {name}=\"{value}\"")?;
    }
    if empty {
        return out.write_str("/>");
    }
    out.write_char('>')?;
    match &node.content {
        Content::Text(text) => out.write_str(text)?,
        Content::Children(children) => {
            for child in children {
                write_node(child, out)?;
            }
        }
    }
    write!(out, "</{}>", node.tag)
}
