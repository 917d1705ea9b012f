use super::error::FilterSyntaxError;
use super::matcher::{
    BYTE_UNITS, BoolFilter, FALSE_TOKENS, NumericFilter, PatternFilter, TRUE_TOKENS, TagFilter,
    regex_body,
};
use super::timespec;
use crate::fields::{FieldDescriptor, FieldError, MatcherType};
use crate::item::ItemAccessor;
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;

/// A parsed condition: leaf filters on single fields, combined by `All`, `Any` and `Not`.
#[derive(Debug, Clone)]
pub enum Filter {
    TextPattern(PatternFilter),
    FileListPattern(PatternFilter),
    TagSet(TagFilter),
    Boolean(BoolFilter),
    Numeric(NumericFilter),
    ByteSize(NumericFilter),
    Time(NumericFilter),
    Duration(NumericFilter),
    Magic(MagicFilter),
    All(Vec<Filter>),
    Any(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Build the leaf filter of the given family, validating `literal`.
    pub fn leaf(
        matcher: MatcherType,
        field: Arc<FieldDescriptor>,
        literal: &str,
    ) -> Result<Self, FilterSyntaxError> {
        Self::leaf_at(matcher, field, literal, Local::now())
    }

    /// Like [`Filter::leaf`], with relative times taken back from `now`.
    pub fn leaf_at(
        matcher: MatcherType,
        field: Arc<FieldDescriptor>,
        literal: &str,
        now: DateTime<Local>,
    ) -> Result<Self, FilterSyntaxError> {
        Ok(match matcher {
            MatcherType::Pattern => Filter::TextPattern(PatternFilter::new(field, literal)?),
            MatcherType::Files => Filter::FileListPattern(PatternFilter::new(field, literal)?),
            MatcherType::Tagged => Filter::TagSet(TagFilter::new(field, literal)),
            MatcherType::Bool => Filter::Boolean(BoolFilter::new(field, literal)?),
            MatcherType::Float => Filter::Numeric(NumericFilter::float(field, literal)?),
            MatcherType::ByteSize => Filter::ByteSize(NumericFilter::byte_size(field, literal)?),
            MatcherType::Time => Filter::Time(NumericFilter::time(field, literal, false, now)?),
            MatcherType::TimeNotNull => {
                Filter::Time(NumericFilter::time(field, literal, true, now)?)
            }
            MatcherType::Duration => {
                Filter::Duration(NumericFilter::duration(field, literal, now)?)
            }
            MatcherType::Magic => Filter::Magic(MagicFilter::new(field, literal, now)?),
        })
    }

    pub fn matches(&self, item: &dyn ItemAccessor) -> Result<bool, FieldError> {
        match self {
            Filter::TextPattern(filter) => filter.matches(item),
            Filter::FileListPattern(filter) => filter.matches_any_file(item),
            Filter::TagSet(filter) => filter.matches(item),
            Filter::Boolean(filter) => filter.matches(item),
            Filter::Numeric(filter) | Filter::ByteSize(filter) | Filter::Time(filter) => {
                filter.matches(item)
            }
            Filter::Duration(filter) => filter.matches_duration(item),
            Filter::Magic(filter) => filter.inner.matches(item),
            Filter::All(members) => {
                for member in members {
                    if !member.matches(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Any(members) => {
                for member in members {
                    if member.matches(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(inner) => Ok(!inner.matches(item)?),
        }
    }

    /// Field name and literal of a leaf filter.
    pub fn leaf_parts(&self) -> Option<(&str, &str)> {
        let (field, literal) = match self {
            Filter::TextPattern(f) | Filter::FileListPattern(f) => (f.field(), f.literal()),
            Filter::TagSet(f) => (f.field(), f.literal()),
            Filter::Boolean(f) => (f.field(), f.literal()),
            Filter::Numeric(f) | Filter::ByteSize(f) | Filter::Time(f) | Filter::Duration(f) => {
                (f.field(), f.literal())
            }
            Filter::Magic(f) => return f.inner.leaf_parts(),
            Filter::All(_) | Filter::Any(_) | Filter::Not(_) => return None,
        };
        Some((field.name.as_str(), literal))
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_compound() && !matches!(self, Filter::Not(_))
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Filter::All(_) | Filter::Any(_))
    }

    /// All members of a disjunction are plain leaves on one field.
    fn is_single_field_disjunction(members: &[Filter]) -> bool {
        let mut names = members.iter().map(|member| member.leaf_parts().map(|(name, _)| name));
        match names.next() {
            Some(Some(first)) => names.all(|name| name == Some(first)),
            _ => false,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All(members) => {
                for (idx, member) in members.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Filter::Any(members) if Filter::is_single_field_disjunction(members) => {
                let mut parts = members.iter().filter_map(Filter::leaf_parts);
                let Some((name, first)) = parts.next() else {
                    return Ok(());
                };
                let mut token = format!("{name}={first}");
                for (_, literal) in parts {
                    token.push(',');
                    token.push_str(literal);
                }
                write_token(f, &token)
            }
            Filter::Any(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "[ {} ]", parts.join(" OR "))
            }
            Filter::Not(inner) => match inner.leaf_parts() {
                Some((name, literal)) => write_token(f, &format!("{name}=!{literal}")),
                None if inner.is_compound() => write!(f, "[ NOT [ {inner} ] ]"),
                None => write!(f, "[ NOT {inner} ]"),
            },
            leaf => match leaf.leaf_parts() {
                Some((name, literal)) => write_token(f, &format!("{name}={literal}")),
                None => Ok(()),
            },
        }
    }
}

/// Write a condition token so that the tokenizer reads it back unchanged.
fn write_token(f: &mut fmt::Formatter<'_>, token: &str) -> fmt::Result {
    let needs_quotes = token
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));
    if needs_quotes {
        let escaped = token.replace('\\', r"\\").replace('"', r#"\""#);
        write!(f, "\"{escaped}\"")
    } else {
        f.write_str(token)
    }
}

/// Picks a concrete leaf filter by looking at the literal.
#[derive(Debug, Clone)]
pub struct MagicFilter {
    inner: Box<Filter>,
}

impl MagicFilter {
    pub fn new(
        field: Arc<FieldDescriptor>,
        literal: &str,
        now: DateTime<Local>,
    ) -> Result<Self, FilterSyntaxError> {
        let matcher = Self::detect(literal);
        let inner = Filter::leaf_at(matcher, field, literal, now)?;
        Ok(Self {
            inner: Box::new(inner),
        })
    }

    /// The leaf family a literal selects, checked in order: pattern, number,
    /// boolean, byte size, time delta, and pattern as the fallback.
    pub fn detect(literal: &str) -> MatcherType {
        let lower = literal.to_lowercase();
        let value = lower
            .strip_prefix('+')
            .or_else(|| lower.strip_prefix('-'))
            .unwrap_or(&lower);

        let is_number = value.bytes().any(|b| b.is_ascii_digit())
            && value.bytes().all(|b| b.is_ascii_digit() || b == b'.')
            && value.bytes().filter(|b| *b == b'.').count() <= 1;
        let is_byte_size = value.len() > 1
            && BYTE_UNITS.iter().any(|(unit, _)| value.ends_with(*unit))
            && value[..value.len() - 1].bytes().all(|b| b.is_ascii_digit());

        if value.is_empty() || regex_body(value).is_some() {
            MatcherType::Pattern
        } else if is_number {
            MatcherType::Float
        } else if TRUE_TOKENS.contains(&literal) || FALSE_TOKENS.contains(&literal) {
            MatcherType::Bool
        } else if is_byte_size {
            MatcherType::ByteSize
        } else if timespec::is_time_delta(value) {
            MatcherType::Time
        } else {
            MatcherType::Pattern
        }
    }

    /// The concrete filter doing the work.
    pub fn inner(&self) -> &Filter {
        &self.inner
    }
}
