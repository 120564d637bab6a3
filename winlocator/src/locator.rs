//! Locator grammar.
//!
//! A locator string is a chain of ` > `-separated segments, each a run of
//! `strategy:value` tokens and bare words:
//!
//! ```text
//! name:'Save As' and type:Button > id:confirm offset:10,-5
//! ```
//!
//! Values may be single-quoted to permit embedded spaces. Unknown
//! `strategy:` prefixes are not errors; they fall through to ordinary name
//! text, which existing locator corpora rely on.

use crate::element::WindowsElement;
use crate::errors::LocatorError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// One matching dimension with its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Name(String),
    SubName(String),
    RegexName(String),
    AutomationId(String),
    ClassName(String),
    ControlType(String),
    SearchDepth(u32),
    FoundIndex(u32),
    Offset(String),
    Desktop,
    Process(String),
    Handle(isize),
    Executable(String),
}

/// One matched grammar unit, tied to its `>`-chain segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorToken {
    pub strategy: Strategy,
    pub tree_level: usize,
}

/// Whether all tokens of a segment must match, or any.
///
/// `Any` is accepted syntactically (`or`) but search parameters are still
/// merged into a single conjunctive query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    All,
    Any,
}

/// Resolver input: either a raw locator expression or an already-resolved
/// element, which passes through unchanged.
#[derive(Debug, Clone, Serialize)]
pub enum Locator {
    Expression(String),
    Element(WindowsElement),
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator::Expression(s.to_string())
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Locator::Expression(s)
    }
}

impl From<WindowsElement> for Locator {
    fn from(element: WindowsElement) -> Self {
        Locator::Element(element)
    }
}

/// Aggregate of tokens for one locator string.
#[derive(Debug, Clone, Default)]
pub struct ParsedLocator {
    pub tokens: Vec<LocatorToken>,
    pub match_type: MatchType,
    /// Highest tree level seen.
    pub max_level: usize,
    /// Out-of-band regex override set by `regex:`.
    pub regex: Option<String>,
    /// Lower-cased class names, deduplicated, in order of first appearance.
    pub class_names: Vec<String>,
    pub was_alias_substituted: bool,
    pub had_unknown_prefix_fallback: bool,
}

// Longer alternatives precede their prefixes so `class_name:` is not eaten
// by `class:`. Anything not matching a known `strategy:value` pair falls to
// the bare-word branch verbatim, colon included.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<strategy>automationid|class_name|friendly_class_name|friendly
          |class|control|depth|desktop|executable|handle|id|index|name
          |offset|process|regex|subname|type)
        :(?:'(?P<quoted>[^']*)'|(?P<value>\S+))
        |(?P<word>\S+)",
    )
    .expect("locator token pattern is valid")
});

fn parse_int<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    strategy: &'static str,
    value: &str,
) -> Result<T, LocatorError> {
    value
        .parse()
        .map_err(|source| LocatorError::InvalidInteger { strategy, source })
}

impl ParsedLocator {
    /// Parse a raw locator string.
    ///
    /// Fails only on non-numeric `depth:`/`index:`/`handle:` values; those
    /// are locator-authoring bugs and surface the native parse error.
    pub fn parse(locator: &str) -> Result<Self, LocatorError> {
        let mut parsed = Self::default();

        for (level, segment) in locator.split(" > ").enumerate() {
            parsed.max_level = level;
            parsed.parse_segment(level, segment)?;
        }

        // A string that produced nothing at all is one big name.
        if parsed.tokens.is_empty() && parsed.regex.is_none() {
            parsed.tokens.push(LocatorToken {
                strategy: Strategy::Name(locator.trim().to_string()),
                tree_level: 0,
            });
        }

        Ok(parsed)
    }

    fn parse_segment(&mut self, level: usize, segment: &str) -> Result<(), LocatorError> {
        let mut bare_words: Vec<&str> = Vec::new();
        let mut explicit_name = false;

        for caps in TOKEN_RE.captures_iter(segment) {
            if let Some(word) = caps.name("word") {
                match word.as_str() {
                    "and" => self.match_type = MatchType::All,
                    "or" => {
                        warn!("locator uses 'or'; search still matches all constraints");
                        self.match_type = MatchType::Any;
                    }
                    "desktop" => self.push(level, Strategy::Desktop),
                    other => {
                        if other.contains(':') {
                            self.had_unknown_prefix_fallback = true;
                        }
                        bare_words.push(other);
                    }
                }
                continue;
            }

            let strategy = caps.name("strategy").map(|m| m.as_str()).unwrap_or_default();
            let value = caps
                .name("quoted")
                .or_else(|| caps.name("value"))
                .map(|m| m.as_str())
                .unwrap_or_default();

            match strategy {
                "name" => {
                    explicit_name = true;
                    self.push(level, Strategy::Name(value.to_string()));
                }
                "subname" => {
                    explicit_name = true;
                    self.push(level, Strategy::SubName(value.to_string()));
                }
                "id" | "automationid" => {
                    self.push(level, Strategy::AutomationId(value.to_string()));
                }
                "class" | "class_name" | "friendly" | "friendly_class_name" => {
                    let lowered = value.to_lowercase();
                    if !self.class_names.contains(&lowered) {
                        self.class_names.push(lowered);
                    }
                    self.push(level, Strategy::ClassName(value.to_string()));
                }
                "control" | "type" => {
                    let control_type = if value.ends_with("Control") {
                        value.to_string()
                    } else {
                        format!("{value}Control")
                    };
                    self.push(level, Strategy::ControlType(control_type));
                }
                "depth" => {
                    let depth = parse_int("depth", value)?;
                    self.push(level, Strategy::SearchDepth(depth));
                }
                "index" => {
                    let index = parse_int("index", value)?;
                    self.push(level, Strategy::FoundIndex(index));
                }
                "handle" => {
                    let handle: i64 = parse_int("handle", value)?;
                    self.push(level, Strategy::Handle(handle as isize));
                }
                "offset" => self.push(level, Strategy::Offset(value.to_string())),
                "desktop" => self.push(level, Strategy::Desktop),
                "process" => self.push(level, Strategy::Process(value.to_string())),
                "executable" => self.push(level, Strategy::Executable(value.to_string())),
                "regex" => self.regex = Some(value.to_string()),
                other => {
                    // The pattern and this match agree on the strategy set.
                    warn!("unhandled locator strategy '{other}'");
                }
            }
        }

        // Leftover words form one trailing name, unless the segment already
        // named the control explicitly.
        if !bare_words.is_empty() && !explicit_name {
            self.push(level, Strategy::Name(bare_words.join(" ")));
        }

        Ok(())
    }

    fn push(&mut self, level: usize, strategy: Strategy) {
        self.tokens.push(LocatorToken {
            strategy,
            tree_level: level,
        });
    }

    /// Tokens belonging to one chain segment.
    pub fn tokens_at(&self, level: usize) -> impl Iterator<Item = &LocatorToken> {
        self.tokens.iter().filter(move |t| t.tree_level == level)
    }
}
