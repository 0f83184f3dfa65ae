use crate::config::OptionsSpec;
use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// One field of a register, in declaration order (least significant first).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Segment {
    pub bits: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attr: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<SegmentKind>,
}

impl Segment {
    pub fn new(bits: i64) -> Self {
        Self {
            bits,
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>, bits: i64) -> Self {
        Self {
            bits,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<SegmentKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Highlight category. Register descriptions write it either as a number or
/// as a string; both are compared by their string form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SegmentKind {
    Number(i64),
    Text(String),
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i32> for SegmentKind {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<i64> for SegmentKind {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SegmentKind {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A segment with its absolute and lane-relative bit positions resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSegment {
    pub segment: Segment,
    pub lsb: i64,
    pub msb: i64,
    pub lsbm: i64,
    pub msbm: i64,
    /// Appended by the engine to cover bits no declared segment reaches.
    pub implicit: bool,
}

impl PlacedSegment {
    pub fn name(&self) -> Option<&str> {
        self.segment.name.as_deref()
    }

    pub fn attr(&self) -> Option<&str> {
        self.segment.attr.as_deref()
    }

    pub fn kind(&self) -> Option<&SegmentKind> {
        self.segment.kind.as_ref()
    }
}

/// A register description: the segment list plus any options it carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Register {
    pub segments: Vec<Segment>,
    pub options: OptionsSpec,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegisterFile {
    Bare(Vec<Segment>),
    Document {
        reg: Vec<Segment>,
        #[serde(default)]
        options: OptionsSpec,
    },
}

/// Parses either a bare segment array or `{ "reg": [...], "options": {...} }`.
/// JSON5 syntax (comments, trailing commas) is accepted.
pub fn parse_register(input: &str) -> Result<Register> {
    let parsed: RegisterFile = json5::from_str(input)?;
    Ok(match parsed {
        RegisterFile::Bare(segments) => Register {
            segments,
            options: OptionsSpec::default(),
        },
        RegisterFile::Document { reg, options } => Register {
            segments: reg,
            options,
        },
    })
}

pub fn load_register(path: &Path) -> Result<Register> {
    let contents = std::fs::read_to_string(path)?;
    parse_register(&contents)
}
