//! Condition expressions and the filter trees they compile to.
//!
//! # Syntax
//!
//! ```text
//! field=value          compare a field, the value's form depends on the field's type
//! field=a,b            any of the values (comma means OR on one field)
//! field=!value         negate one comparison
//! a=1 b=2              all conditions must match
//! a=1 OR b=2           either side must match
//! [ ... ]              grouping, NOT at the start of a group negates it
//! field<v  field<=v    inline comparisons, also >, >=, <>, != and ~ (regex)
//! ```
//!
//! # Values
//!
//! ```text
//! *.iso  /^ubuntu/     glob, or regex between slashes (case-insensitive)
//! +5  -5  5            greater than, less than, equal
//! +4g  -100k           byte sizes with b, k, m, g units
//! +2w  -1d12h          relative times: older than / within the last
//! 2024-01-31T12:00     absolute dates (also 01/31/2024 and 31.01.2024)
//! yes  no              booleans (also true/false, t/f, y/n, 1/0, +/-)
//! =tag1 tag2           exact tag set, while a plain tag tests membership
//! ```

mod comparison;
mod error;
mod matcher;
mod parser;
mod timespec;
mod tree;

pub use comparison::Comparison;
pub use error::FilterSyntaxError;
pub use matcher::{
    BYTE_UNITS, BoolFilter, FALSE_TOKENS, NumericFilter, PatternFilter, TRUE_TOKENS, TagFilter,
    truth,
};
pub use parser::{ConditionParser, parse};
pub use timespec::{is_time_delta, parse_absolute};
pub use tree::{Filter, MagicFilter};
