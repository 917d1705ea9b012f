use super::descriptor::{FieldDescriptor, Formatter, MatcherType};
use super::error::FieldError;
use super::traits;
use super::value::{FieldValue, FileEntry, ValueType};
use crate::item::ItemAccessor;
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Site-specific settings the built-in fields depend on.
#[derive(Debug, Clone, Default)]
pub struct BuiltinOptions {
    /// Tracker alias to its announce URLs.
    pub announce: BTreeMap<String, Vec<String>>,
    /// Tracker alias to a content theme, e.g. a music-only tracker to `audio`.
    pub traits_by_alias: HashMap<String, String>,
}

fn now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn raw_text(item: &dyn ItemAccessor, name: &str) -> Result<String, FieldError> {
    Ok(ValueType::Text.convert(name, item.get_raw(name)?)?.as_text())
}

fn raw_number(item: &dyn ItemAccessor, name: &str) -> Result<f64, FieldError> {
    ValueType::Float
        .convert(name, item.get_raw(name)?)?
        .as_number(name)
}

fn raw_timestamp(item: &dyn ItemAccessor, name: &str) -> Result<Option<f64>, FieldError> {
    match ValueType::Timestamp.convert(name, item.get_raw(name)?)? {
        FieldValue::Null => Ok(None),
        value => value.as_number(name).map(Some),
    }
}

fn raw_files(item: &dyn ItemAccessor) -> Result<Vec<FileEntry>, FieldError> {
    match ValueType::FileList.convert("files", item.get_raw("files")?)? {
        FieldValue::Files(files) => Ok(files),
        _ => Ok(Vec::new()),
    }
}

fn span(end: Option<f64>, start: Option<f64>) -> Value {
    match (end, start) {
        (Some(end), Some(start)) => json!(end - start),
        _ => Value::Null,
    }
}

/// First announce URL of an item.
fn tracker_url(item: &dyn ItemAccessor) -> Result<String, FieldError> {
    let tracker = raw_text(item, "tracker")?;
    if !tracker.is_empty() {
        return Ok(tracker);
    }

    match item.get_raw("announce")? {
        Value::Array(urls) => Ok(urls
            .iter()
            .find_map(|url| url.as_str())
            .unwrap_or_default()
            .to_string()),
        Value::String(url) => Ok(url),
        _ => Ok(String::new()),
    }
}

fn split_url(url: &str) -> (&str, &str) {
    let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
    let netloc = rest.split(['/', '?', '#']).next().unwrap_or_default();
    (scheme, netloc)
}

/// Tracker alias for an announce URL, or its second level domain.
pub fn map_announce2alias(url: &str, announce: &BTreeMap<String, Vec<String>>) -> String {
    if let Some((alias, _)) = announce
        .iter()
        .find(|(_, urls)| urls.iter().any(|known| known == url))
    {
        return alias.clone();
    }

    let (scheme, netloc) = split_url(url);
    let server = format!("{scheme}://{netloc}/");
    if let Some((alias, _)) = announce
        .iter()
        .find(|(_, urls)| urls.iter().any(|known| known.starts_with(&server)))
    {
        return alias.clone();
    }

    let host = netloc.split(':').next().unwrap_or_default();
    let labels: Vec<&str> = host.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}

fn tracker_alias(
    item: &dyn ItemAccessor,
    announce: &BTreeMap<String, Vec<String>>,
) -> Result<String, FieldError> {
    let stored = raw_text(item, "alias")?;
    if !stored.is_empty() {
        return Ok(stored);
    }
    let url = tracker_url(item)?;
    if url.is_empty() {
        return Ok(String::new());
    }
    Ok(map_announce2alias(&url, announce))
}

fn kind_field(name: String, limit: u32) -> FieldDescriptor {
    let doc = if limit == 0 {
        "ALL kinds of files in this item (the same as kind_0)".to_string()
    } else {
        format!("kinds of files that make up at least {limit}% of this item's size")
    };

    FieldDescriptor::on_demand(ValueType::TagSet, name, doc)
        .with_matcher(MatcherType::Tagged)
        .with_accessor(move |item| {
            Ok(json!(traits::dominant_kinds(&raw_files(item)?, limit)))
        })
}

/// Descriptor for a parametric field name, if `name` is one.
pub(crate) fn parametric_field(name: &str) -> Result<Option<FieldDescriptor>, FieldError> {
    if let Some(digits) = name.strip_prefix("kind_") {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            let limit = digits.parse::<u32>().ok().filter(|limit| *limit <= 100);
            return match limit {
                Some(limit) => Ok(Some(kind_field(name.to_string(), limit))),
                None => Err(FieldError::PercentOutOfRange {
                    name: name.to_string(),
                    percent: digits.to_string(),
                }),
            };
        }
    }

    if let Some(key) = name.strip_prefix("custom_") {
        if !key.is_empty() {
            return Ok(Some(
                FieldDescriptor::on_demand(
                    ValueType::Untyped,
                    name,
                    format!("custom attribute '{key}'"),
                )
                .with_matcher(MatcherType::Magic),
            ));
        }
    }

    Ok(None)
}

/// The fixed set of fields every registry starts with.
pub(crate) fn builtin_fields(options: &BuiltinOptions) -> Vec<FieldDescriptor> {
    let announce = Arc::new(options.announce.clone());
    let themes = Arc::new(options.traits_by_alias.clone());

    let mut fields = vec![
        // Identity
        FieldDescriptor::constant(ValueType::Text, "hash", "info hash")
            .with_matcher(MatcherType::Pattern),
        FieldDescriptor::constant(ValueType::Text, "name", "name (file or root directory)")
            .with_matcher(MatcherType::Pattern),
        FieldDescriptor::constant(
            ValueType::Boolean,
            "is_private",
            "private flag set (no DHT/PEX)?",
        )
        .with_matcher(MatcherType::Bool)
        .with_formatter(Formatter::YesNo),
        FieldDescriptor::constant(
            ValueType::Boolean,
            "is_multi_file",
            "single- or multi-file download?",
        )
        .with_matcher(MatcherType::Bool)
        .with_formatter(Formatter::YesNo),
        // State flags
        FieldDescriptor::dynamic(ValueType::Boolean, "is_open", "download open?")
            .with_matcher(MatcherType::Bool)
            .with_formatter(Formatter::YesNo),
        FieldDescriptor::dynamic(ValueType::Boolean, "is_active", "download active?")
            .with_matcher(MatcherType::Bool)
            .with_formatter(Formatter::YesNo),
        FieldDescriptor::dynamic(ValueType::Boolean, "is_complete", "download complete?")
            .with_matcher(MatcherType::Bool)
            .with_formatter(Formatter::YesNo),
        FieldDescriptor::dynamic(ValueType::Boolean, "is_ignored", "ignore commands?")
            .with_matcher(MatcherType::Bool)
            .with_formatter(Formatter::YesNo),
        FieldDescriptor::dynamic(ValueType::Boolean, "is_ghost", "has no data file or directory?")
            .with_matcher(MatcherType::Bool)
            .with_formatter(Formatter::YesNo)
            .with_accessor(|item| {
                let path = raw_text(item, "path")?;
                Ok(json!(!path.is_empty() && !Path::new(&path).exists()))
            }),
        // Size and transfer metrics
        FieldDescriptor::constant(ValueType::Integer, "size", "data size")
            .with_matcher(MatcherType::ByteSize)
            .with_formatter(Formatter::HumanSize),
        FieldDescriptor::dynamic(ValueType::Float, "done", "completion in percent")
            .with_matcher(MatcherType::Float)
            .with_formatter(Formatter::Percent),
        FieldDescriptor::dynamic(ValueType::Ratio, "ratio", "normalized ratio (1:1 = 1.0)")
            .with_matcher(MatcherType::Float),
        FieldDescriptor::dynamic(ValueType::Integer, "up", "upload rate")
            .with_matcher(MatcherType::ByteSize)
            .with_formatter(Formatter::HumanSize),
        FieldDescriptor::dynamic(ValueType::Integer, "down", "download rate")
            .with_matcher(MatcherType::ByteSize)
            .with_formatter(Formatter::HumanSize),
        FieldDescriptor::dynamic(ValueType::Integer, "xfer", "transfer rate")
            .with_matcher(MatcherType::ByteSize)
            .with_formatter(Formatter::HumanSize)
            .with_accessor(|item| {
                let total = raw_number(item, "up")? + raw_number(item, "down")?;
                Ok(json!(total as i64))
            }),
        FieldDescriptor::dynamic(ValueType::Integer, "uploaded", "amount of uploaded data")
            .with_matcher(MatcherType::ByteSize)
            .with_formatter(Formatter::HumanSize),
        FieldDescriptor::dynamic(
            ValueType::Integer,
            "prio",
            "priority (0=off, 1=low, 2=normal, 3=high)",
        )
        .with_matcher(MatcherType::Float),
        FieldDescriptor::dynamic(ValueType::Text, "throttle", "throttle group name")
            .with_matcher(MatcherType::Pattern),
        // Lifecycle timestamps
        FieldDescriptor::dynamic(ValueType::Timestamp, "loaded", "time metafile was loaded")
            .with_matcher(MatcherType::TimeNotNull)
            .with_formatter(Formatter::IsoDatetime),
        FieldDescriptor::dynamic(ValueType::Timestamp, "started", "time download was FIRST started")
            .with_matcher(MatcherType::TimeNotNull)
            .with_formatter(Formatter::IsoDatetime),
        FieldDescriptor::dynamic(ValueType::Timestamp, "completed", "time download was finished")
            .with_matcher(MatcherType::TimeNotNull)
            .with_formatter(Formatter::IsoDatetime),
        // ...and the spans derived from them
        FieldDescriptor::dynamic(ValueType::Duration, "age", "time since metafile was loaded")
            .with_matcher(MatcherType::Duration)
            .with_formatter(Formatter::HumanDuration)
            .with_accessor(|item| Ok(span(Some(now()), raw_timestamp(item, "loaded")?))),
        FieldDescriptor::dynamic(
            ValueType::Duration,
            "leechtime",
            "time taken from start to completion",
        )
        .with_matcher(MatcherType::Duration)
        .with_formatter(Formatter::HumanDuration)
        .with_accessor(|item| {
            let end = raw_timestamp(item, "completed")?.unwrap_or_else(now);
            Ok(span(Some(end), raw_timestamp(item, "started")?))
        }),
        FieldDescriptor::dynamic(
            ValueType::Duration,
            "seedtime",
            "total seeding time after completion",
        )
        .with_matcher(MatcherType::Duration)
        .with_formatter(Formatter::HumanDuration)
        .with_accessor(|item| Ok(span(Some(now()), raw_timestamp(item, "completed")?))),
        // Paths
        FieldDescriptor::dynamic(ValueType::Text, "path", "path to download data")
            .with_matcher(MatcherType::Pattern),
        FieldDescriptor::dynamic(ValueType::Text, "realpath", "real path to download data")
            .with_matcher(MatcherType::Pattern)
            .with_accessor(|item| {
                let path = raw_text(item, "path")?;
                if path.is_empty() {
                    return Ok(Value::Null);
                }
                let real = std::fs::canonicalize(&path)
                    .map(|real| real.to_string_lossy().into_owned())
                    .unwrap_or(path);
                Ok(json!(real))
            }),
        FieldDescriptor::dynamic(ValueType::Text, "metafile", "path to torrent file")
            .with_matcher(MatcherType::Pattern),
        FieldDescriptor::on_demand(
            ValueType::Text,
            "directory",
            "directory containing download data",
        )
        .with_matcher(MatcherType::Pattern),
        FieldDescriptor::on_demand(ValueType::FileList, "files", "list of files in this item")
            .with_matcher(MatcherType::Files),
        // Trackers
        FieldDescriptor::dynamic(ValueType::Text, "tracker", "first in the list of announce URLs")
            .with_matcher(MatcherType::Pattern)
            .with_accessor(|item| Ok(json!(tracker_url(item)?))),
        FieldDescriptor::on_demand(ValueType::Text, "message", "current tracker message")
            .with_matcher(MatcherType::Pattern),
        // Classification
        FieldDescriptor::dynamic(
            ValueType::TagSet,
            "tagged",
            "has certain tags? (not related to the 'tagged' view)",
        )
        .with_matcher(MatcherType::Tagged),
        FieldDescriptor::on_demand(ValueType::TagSet, "views", "views this item is attached to")
            .with_matcher(MatcherType::Tagged),
        kind_field("kind".to_string(), 0),
    ];

    let alias_announce = Arc::clone(&announce);
    fields.push(
        FieldDescriptor::constant(ValueType::Text, "alias", "tracker alias or domain")
            .with_matcher(MatcherType::Pattern)
            .with_accessor(move |item| Ok(json!(tracker_alias(item, &alias_announce)?))),
    );

    fields.push(
        FieldDescriptor::dynamic(
            ValueType::List,
            "traits",
            "automatic classification of this item (audio, video, tv, movie, etc.)",
        )
        .with_matcher(MatcherType::Tagged)
        .with_formatter(Formatter::TraitPath)
        .with_accessor(move |item| {
            let name = raw_text(item, "name")?;
            let alias = tracker_alias(item, &announce)?;
            let files = raw_files(item)?;
            let dominant = traits::get_filetypes(&files)
                .into_iter()
                .find(|(_, ext)| !ext.is_empty())
                .map(|(_, ext)| ext)
                .or_else(|| {
                    Path::new(&name)
                        .extension()
                        .map(|ext| ext.to_string_lossy().to_lowercase())
                });
            let alias = (!alias.is_empty()).then_some(alias.as_str());
            Ok(json!(traits::detect_traits(
                &name,
                alias,
                dominant.as_deref(),
                &themes
            )))
        }),
    );

    fields
}
