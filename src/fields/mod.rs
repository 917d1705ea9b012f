//! Field descriptors and the registry that resolves field names.
//!
//! Every addressable attribute of a download item is described by a
//! [`FieldDescriptor`]: its semantic value type, its caching policy, an
//! optional accessor deriving it from other values, the leaf filter family
//! that may compare it, and an optional display formatter.
//!
//! Besides the fixed built-in set, two parametric families exist:
//!
//! ```text
//! custom_<key>    custom attribute of the item, compared with the magic matcher
//! kind_<percent>  file types making up at least <percent>% of the item's size
//! ```

mod builtin;
mod descriptor;
mod error;
pub mod format;
mod registry;
pub mod traits;
mod value;

pub use builtin::{BuiltinOptions, map_announce2alias};
pub use descriptor::{Accessor, CachePolicy, FieldDescriptor, Formatter, MatcherType};
pub use error::{DuplicateFieldError, FieldError};
pub use registry::{Amenable, FieldLookup, Registry, get_value};
pub use value::{FieldValue, FileEntry, ValueType};
