use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::node::Node;

/// Style categories in the order their attributes are emitted.
const CATEGORIES: [&str; 6] = [
    "text-decoration",
    "font-weight",
    "font-style",
    "baseline-shift",
    "font-size",
    "font-family",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy)]
struct TagRule {
    effect: Effect,
    styles: &'static [(&'static str, &'static str)],
}

const OVERLINE: &[(&str, &str)] = &[("text-decoration", "overline")];
const UNDERLINE: &[(&str, &str)] = &[("text-decoration", "underline")];
const STRIKE: &[(&str, &str)] = &[("text-decoration", "line-through")];
const BOLD: &[(&str, &str)] = &[("font-weight", "bold")];
const ITALIC: &[(&str, &str)] = &[("font-style", "italic")];
const SUB: &[(&str, &str)] = &[("baseline-shift", "sub"), ("font-size", ".7em")];
const SUPER: &[(&str, &str)] = &[("baseline-shift", "super"), ("font-size", ".7em")];
const MONO: &[(&str, &str)] = &[("font-family", "monospace")];

const TAGS: [(&str, Effect, &[(&str, &str)]); 16] = [
    ("<o>", Effect::Add, OVERLINE),
    ("</o>", Effect::Remove, OVERLINE),
    ("<ins>", Effect::Add, UNDERLINE),
    ("</ins>", Effect::Remove, UNDERLINE),
    ("<s>", Effect::Add, STRIKE),
    ("</s>", Effect::Remove, STRIKE),
    ("<b>", Effect::Add, BOLD),
    ("</b>", Effect::Remove, BOLD),
    ("<i>", Effect::Add, ITALIC),
    ("</i>", Effect::Remove, ITALIC),
    ("<sub>", Effect::Add, SUB),
    ("</sub>", Effect::Remove, SUB),
    ("<sup>", Effect::Add, SUPER),
    ("</sup>", Effect::Remove, SUPER),
    ("<tt>", Effect::Add, MONO),
    ("</tt>", Effect::Remove, MONO),
];

static TAG_RULES: Lazy<HashMap<&'static str, TagRule>> = Lazy::new(|| {
    TAGS.iter()
        .map(|&(tag, effect, styles)| (tag, TagRule { effect, styles }))
        .collect()
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = TAGS
        .iter()
        .map(|(tag, _, _)| regex::escape(tag))
        .collect::<Vec<_>>()
        .join("|");
    // ASCII folding only: `ſ` and `K` must not match `s` or `k`.
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .unicode(false)
        .build()
        .unwrap()
});

/// Active style values per category. Each value is an on/off flag, so a
/// nested repeat of the same tag is switched off by the first close.
#[derive(Debug, Clone, Default)]
struct StyleState {
    active: [Vec<&'static str>; CATEGORIES.len()],
}

impl StyleState {
    fn slot(&mut self, category: &str) -> Option<&mut Vec<&'static str>> {
        let idx = CATEGORIES.iter().position(|c| *c == category)?;
        Some(&mut self.active[idx])
    }

    fn apply(&mut self, rule: TagRule) {
        for &(category, value) in rule.styles {
            let Some(values) = self.slot(category) else {
                continue;
            };
            match rule.effect {
                Effect::Add => {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
                Effect::Remove => values.retain(|v| *v != value),
            }
        }
    }

    fn snapshot(&self) -> Vec<(&'static str, &'static str)> {
        CATEGORIES
            .iter()
            .zip(&self.active)
            .filter_map(|(category, values)| values.last().map(|value| (*category, *value)))
            .collect()
    }
}

/// A piece of label text with the SVG presentation attributes active over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub style: Vec<(&'static str, &'static str)>,
    pub text: String,
}

impl TextRun {
    pub fn is_plain(&self) -> bool {
        self.style.is_empty()
    }

    pub fn style_value(&self, category: &str) -> Option<&'static str> {
        self.style
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, value)| *value)
    }

    pub fn to_node(&self) -> Node {
        self.style
            .iter()
            .fold(Node::leaf("tspan", self.text.clone()), |node, (name, value)| {
                node.attr(*name, *value)
            })
    }
}

/// Splits `input` on the inline style tags, returning the text between them
/// with the styles in effect. Text without tags comes back as a single
/// unstyled run, even when empty.
pub fn parse_rich_text(input: &str) -> Vec<TextRun> {
    let mut state = StyleState::default();
    let mut runs = Vec::new();
    let mut rest = input;

    loop {
        let Some(found) = TAG_RE.find(rest) else {
            runs.push(TextRun {
                style: state.snapshot(),
                text: rest.to_string(),
            });
            break;
        };
        if found.start() > 0 {
            runs.push(TextRun {
                style: state.snapshot(),
                text: rest[..found.start()].to_string(),
            });
        }
        let tag = found.as_str().to_ascii_lowercase();
        if let Some(rule) = TAG_RULES.get(tag.as_str()) {
            state.apply(*rule);
        }
        rest = &rest[found.end()..];
        if rest.is_empty() {
            break;
        }
    }

    runs
}

/// Parses `input` and wraps each run in a `tspan` node.
pub fn tspans(input: &str) -> Vec<Node> {
    parse_rich_text(input).iter().map(TextRun::to_node).collect()
}
