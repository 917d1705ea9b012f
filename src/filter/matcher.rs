//! Leaf filters comparing one field of an item against a parsed literal.
//!
//! Every leaf validates its literal when it is constructed, so a filter that
//! exists is ready to be evaluated against any number of items.

use super::comparison::Comparison;
use super::error::FilterSyntaxError;
use super::timespec;
use crate::fields::{FieldDescriptor, FieldError, FieldValue};
use crate::item::ItemAccessor;
use chrono::{DateTime, Local};
use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::sync::Arc;

pub const TRUE_TOKENS: [&str; 6] = ["true", "t", "yes", "y", "1", "+"];
pub const FALSE_TOKENS: [&str; 6] = ["false", "f", "no", "n", "0", "-"];

/// Scale factors of the byte size unit suffixes.
pub const BYTE_UNITS: [(char, f64); 4] = [
    ('b', 1.0),
    ('k', 1024.0),
    ('m', 1024.0 * 1024.0),
    ('g', 1024.0 * 1024.0 * 1024.0),
];

/// Convert a boolean token (any case) to its truth value.
pub fn truth(value: &str) -> Option<bool> {
    let lower = value.to_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Body of a `/regex/` literal.
pub(crate) fn regex_body(literal: &str) -> Option<&str> {
    if literal.len() >= 2 && literal.starts_with('/') && literal.ends_with('/') {
        Some(&literal[1..literal.len() - 1])
    } else {
        None
    }
}

fn byte_unit(value: &str) -> Option<f64> {
    let last = value.chars().last()?.to_ascii_lowercase();
    BYTE_UNITS
        .iter()
        .find(|(unit, _)| *unit == last)
        .map(|(_, scale)| *scale)
}

/// Lower-cased glob source with braces and unclosed `[` escaped as literal characters.
///
/// A `]` right after `[` or `[!` belongs to the class, so `[]]` stays a class.
fn glob_source(literal: &str) -> String {
    let chars: Vec<char> = literal.to_lowercase().chars().collect();
    let mut source = String::with_capacity(literal.len());
    let mut idx = 0;
    while idx < chars.len() {
        match chars[idx] {
            '{' => source.push_str("[{]"),
            '}' => source.push_str("[}]"),
            '[' => {
                let mut start = idx + 1;
                if chars.get(start) == Some(&'!') {
                    start += 1;
                }
                if chars.get(start) == Some(&']') {
                    start += 1;
                }
                match chars[start..].iter().position(|c| *c == ']') {
                    Some(offset) => {
                        let end = start + offset;
                        source.extend(&chars[idx..=end]);
                        idx = end;
                    }
                    None => source.push_str("[[]"),
                }
            }
            c => source.push(c),
        }
        idx += 1;
    }
    source
}

#[derive(Debug, Clone)]
enum Pattern {
    Regex(Regex),
    Glob(GlobMatcher),
    Empty,
}

impl Pattern {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(value),
            Pattern::Glob(glob) => glob.is_match(value),
            Pattern::Empty => value.is_empty(),
        }
    }
}

/// Case-insensitive glob or `/regex/` match on text values, or on file paths.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    field: Arc<FieldDescriptor>,
    literal: String,
    pattern: Pattern,
}

impl PatternFilter {
    pub fn new(field: Arc<FieldDescriptor>, literal: &str) -> Result<Self, FilterSyntaxError> {
        let pattern = if let Some(body) = regex_body(literal) {
            let re = RegexBuilder::new(body)
                .case_insensitive(true)
                .build()
                .map_err(|e| FilterSyntaxError::bad_value(&field.name, "regex", body, literal, e))?;
            Pattern::Regex(re)
        } else if literal.is_empty() {
            Pattern::Empty
        } else {
            let glob = GlobBuilder::new(&glob_source(literal))
                .case_insensitive(true)
                .literal_separator(false)
                .backslash_escape(false)
                .build()
                .map_err(|e| {
                    FilterSyntaxError::bad_value(&field.name, "glob", literal, literal, e)
                })?;
            Pattern::Glob(glob.compile_matcher())
        };

        Ok(Self {
            field,
            literal: literal.to_string(),
            pattern,
        })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self.pattern, Pattern::Regex(_))
    }

    pub fn matches(&self, item: &dyn ItemAccessor) -> Result<bool, FieldError> {
        let value = self.field.value(item)?;
        Ok(self.pattern.is_match(&value.as_text().to_lowercase()))
    }

    /// True if any path of the file list matches; no files never match.
    pub fn matches_any_file(&self, item: &dyn ItemAccessor) -> Result<bool, FieldError> {
        let matched = match self.field.value(item)? {
            FieldValue::Null => false,
            FieldValue::Files(files) => files
                .iter()
                .any(|file| self.pattern.is_match(&file.path.to_lowercase())),
            FieldValue::List(paths) => paths
                .iter()
                .any(|path| self.pattern.is_match(&path.to_lowercase())),
            other => self.pattern.is_match(&other.as_text().to_lowercase()),
        };
        Ok(matched)
    }
}

/// Membership in, or exact equality with, a whitespace separated tag set.
#[derive(Debug, Clone)]
pub struct TagFilter {
    field: Arc<FieldDescriptor>,
    literal: String,
    exact: Option<BTreeSet<String>>,
    tag: String,
}

impl TagFilter {
    pub fn new(field: Arc<FieldDescriptor>, literal: &str) -> Self {
        let lower = literal.to_lowercase();
        let (exact, tag) = match lower.strip_prefix('=') {
            Some(tags) => (
                Some(tags.split_whitespace().map(str::to_string).collect()),
                String::new(),
            ),
            // An empty literal asks for an empty tag set
            None if lower.is_empty() => (Some(BTreeSet::new()), String::new()),
            None => (None, lower),
        };

        Self {
            field,
            literal: literal.to_string(),
            exact,
            tag,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.exact.is_some()
    }

    pub fn matches(&self, item: &dyn ItemAccessor) -> Result<bool, FieldError> {
        let tags = self.field.value(item)?.tag_set();
        Ok(match &self.exact {
            Some(expected) => *expected == tags,
            None => tags.contains(&self.tag),
        })
    }
}

/// Compares the truthiness of a value.
#[derive(Debug, Clone)]
pub struct BoolFilter {
    field: Arc<FieldDescriptor>,
    literal: String,
    expected: bool,
}

impl BoolFilter {
    pub fn new(field: Arc<FieldDescriptor>, literal: &str) -> Result<Self, FilterSyntaxError> {
        let expected = truth(literal).ok_or_else(|| {
            let reason = format!(
                "expected one of '{}', or '{}'",
                TRUE_TOKENS.join("' '"),
                FALSE_TOKENS.join("' '")
            );
            FilterSyntaxError::bad_value(&field.name, "boolean", literal, literal, reason)
        })?;

        Ok(Self {
            field,
            literal: literal.to_string(),
            expected,
        })
    }

    pub fn expected(&self) -> bool {
        self.expected
    }

    pub fn matches(&self, item: &dyn ItemAccessor) -> Result<bool, FieldError> {
        Ok(self.field.value(item)?.is_truthy() == self.expected)
    }
}

/// Ordered comparison of numbers, byte sizes, timestamps, or durations.
#[derive(Debug, Clone)]
pub struct NumericFilter {
    field: Arc<FieldDescriptor>,
    literal: String,
    comparison: Comparison,
    value: f64,
    not_null: bool,
}

impl NumericFilter {
    pub fn float(field: Arc<FieldDescriptor>, literal: &str) -> Result<Self, FilterSyntaxError> {
        let (comparison, rest) = Comparison::split_sign(literal);
        let value = rest
            .parse::<f64>()
            .map_err(|e| FilterSyntaxError::bad_value(&field.name, "numerical", rest, literal, e))?;
        Ok(Self::build(field, literal, comparison, value))
    }

    pub fn byte_size(
        field: Arc<FieldDescriptor>,
        literal: &str,
    ) -> Result<Self, FilterSyntaxError> {
        let (comparison, rest) = Comparison::split_sign(literal);
        let (number, scale) = match byte_unit(rest) {
            Some(scale) => (&rest[..rest.len() - 1], scale),
            None => (rest, 1.0),
        };
        let value = number
            .parse::<f64>()
            .map_err(|e| {
                FilterSyntaxError::bad_value(&field.name, "numerical", number, literal, e)
            })?;
        Ok(Self::build(field, literal, comparison, value * scale))
    }

    /// A timestamp comparison; relative deltas are taken back from `now`.
    pub fn time(
        field: Arc<FieldDescriptor>,
        literal: &str,
        not_null: bool,
        now: DateTime<Local>,
    ) -> Result<Self, FilterSyntaxError> {
        let (comparison, rest) = Comparison::split_sign(literal);
        let bad = |reason: String| {
            FilterSyntaxError::bad_value(&field.name, "timestamp", rest, literal, reason)
        };

        let (comparison, value) = if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            (comparison, rest.parse::<f64>().map_err(|e| bad(e.to_string()))?)
        } else if let Some(timestamp) = timespec::subtract_delta(now, rest).map_err(bad)? {
            // "+2w" means older than two weeks, i.e. an earlier timestamp
            (comparison.inverted(), timestamp)
        } else {
            (comparison, timespec::parse_absolute(rest).map_err(bad)?)
        };

        let mut filter = Self::build(field, literal, comparison, value);
        filter.not_null = not_null;
        Ok(filter)
    }

    /// A span in seconds, given as a relative delta or as the distance of a date from `now`.
    pub fn duration(
        field: Arc<FieldDescriptor>,
        literal: &str,
        now: DateTime<Local>,
    ) -> Result<Self, FilterSyntaxError> {
        let (comparison, rest) = Comparison::split_sign(literal);
        let bad = |reason: String| {
            FilterSyntaxError::bad_value(&field.name, "timestamp", rest, literal, reason)
        };
        let now_ts = timespec::to_timestamp(now);

        let value = if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            rest.parse::<f64>().map_err(|e| bad(e.to_string()))?
        } else if let Some(timestamp) = timespec::subtract_delta(now, rest).map_err(bad)? {
            now_ts - timestamp
        } else {
            timespec::parse_absolute(rest).map_err(bad)? - now_ts
        };

        Ok(Self::build(field, literal, comparison, value))
    }

    fn build(
        field: Arc<FieldDescriptor>,
        literal: &str,
        comparison: Comparison,
        value: f64,
    ) -> Self {
        Self {
            field,
            literal: literal.to_string(),
            comparison,
            value,
            not_null: false,
        }
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// The parsed comparison value, scaled to bytes or seconds.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn matches(&self, item: &dyn ItemAccessor) -> Result<bool, FieldError> {
        let value = self.field.value(item)?;
        self.compare(&value)
    }

    /// Unknown durations never match, except a comparison below zero.
    pub fn matches_duration(&self, item: &dyn ItemAccessor) -> Result<bool, FieldError> {
        let value = self.field.value(item)?;
        if value.is_null() {
            return Ok(self.value == 0.0 && self.comparison.compare(-1.0, 0.0));
        }
        self.compare(&value)
    }

    fn compare(&self, value: &FieldValue) -> Result<bool, FieldError> {
        let actual = value.as_number(&self.field.name)?;
        if self.not_null && self.value != 0.0 && actual == 0.0 {
            return Ok(false);
        }
        Ok(self.comparison.compare(actual, self.value))
    }
}

/// Leaf filters carry their field and the literal they were built from.
macro_rules! leaf_accessors {
    ($($ty:ty),*) => {
        $(
            impl $ty {
                pub fn field(&self) -> &Arc<FieldDescriptor> {
                    &self.field
                }

                pub fn literal(&self) -> &str {
                    &self.literal
                }
            }
        )*
    };
}

leaf_accessors!(PatternFilter, TagFilter, BoolFilter, NumericFilter);
