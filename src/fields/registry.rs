use super::builtin::{self, BuiltinOptions};
use super::descriptor::{CachePolicy, FieldDescriptor};
use super::error::{DuplicateFieldError, FieldError};
use super::value::FieldValue;
use crate::item::ItemAccessor;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::debug;

/// Resolves field names to descriptors for the condition parser.
pub trait FieldLookup {
    /// `Ok(None)` for unknown names.
    fn lookup(&self, name: &str) -> Result<Option<Arc<FieldDescriptor>>, FieldError>;
}

/// Catalog of all known fields.
///
/// Parametric names (`custom_<key>`, `kind_<percent>`) are materialized into
/// concrete descriptors the first time they are looked up.
#[derive(Debug, Default)]
pub struct Registry {
    fields: RwLock<HashMap<String, Arc<FieldDescriptor>>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in fields.
    pub fn with_builtins(options: &BuiltinOptions) -> Result<Self, DuplicateFieldError> {
        let registry = Self::new();
        registry.register_all(builtin::builtin_fields(options))?;
        Ok(registry)
    }

    /// Process-wide registry with the default built-in fields.
    pub fn global() -> &'static Registry {
        static GLOBAL: LazyLock<Registry> = LazyLock::new(|| {
            Registry::with_builtins(&BuiltinOptions::default())
                .expect("built-in field names are unique")
        });
        &GLOBAL
    }

    pub fn register(
        &self,
        descriptor: FieldDescriptor,
    ) -> Result<Arc<FieldDescriptor>, DuplicateFieldError> {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        if fields.contains_key(&descriptor.name) {
            return Err(DuplicateFieldError {
                name: descriptor.name,
            });
        }

        let descriptor = Arc::new(descriptor);
        fields.insert(descriptor.name.clone(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Register everything a custom field factory yields.
    pub fn register_all<I>(&self, descriptors: I) -> Result<(), DuplicateFieldError>
    where
        I: IntoIterator<Item = FieldDescriptor>,
    {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(())
    }

    /// Registered descriptor by name, without parametric materialization.
    pub fn get(&self, name: &str) -> Option<Arc<FieldDescriptor>> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn lookup(&self, name: &str) -> Result<Option<Arc<FieldDescriptor>>, FieldError> {
        if let Some(descriptor) = self.get(name) {
            return Ok(Some(descriptor));
        }

        let Some(descriptor) = builtin::parametric_field(name)? else {
            return Ok(None);
        };

        // Materialization is pure, so whichever concurrent caller wins is equivalent
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        let entry = fields.entry(name.to_string()).or_insert_with(|| {
            debug!(field = name, "materialized parametric field");
            Arc::new(descriptor)
        });
        Ok(Some(Arc::clone(entry)))
    }

    /// Current value of the named field for `item`.
    pub fn get_value(&self, item: &dyn ItemAccessor, name: &str) -> Result<FieldValue, FieldError> {
        match self.lookup(name)? {
            Some(descriptor) => get_value(&descriptor, item),
            None => Err(FieldError::Unknown(name.to_string())),
        }
    }

    /// All registered field names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// All registered descriptors, sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<FieldDescriptor>> {
        let mut descriptors: Vec<Arc<FieldDescriptor>> = self
            .fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

impl FieldLookup for Registry {
    fn lookup(&self, name: &str) -> Result<Option<Arc<FieldDescriptor>>, FieldError> {
        Registry::lookup(self, name)
    }
}

/// Lookup for ad-hoc records: every identifier is an untyped field compared
/// with the auto-detecting matcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct Amenable;

impl FieldLookup for Amenable {
    fn lookup(&self, name: &str) -> Result<Option<Arc<FieldDescriptor>>, FieldError> {
        Ok(Some(Arc::new(
            FieldDescriptor::dynamic(super::ValueType::Untyped, name, "untyped record field")
                .with_matcher(super::MatcherType::Magic),
        )))
    }
}

/// Apply the descriptor's cache policy to read its value from `item`.
pub fn get_value(
    descriptor: &FieldDescriptor,
    item: &dyn ItemAccessor,
) -> Result<FieldValue, FieldError> {
    match descriptor.cache_policy {
        CachePolicy::Constant | CachePolicy::Dynamic => descriptor.fetch(item),
        CachePolicy::OnDemand => {
            if let Some(cached) = item.get_cached(&descriptor.name) {
                return Ok(cached);
            }

            let value = descriptor.fetch(item)?;
            debug!(field = %descriptor.name, "fetched on-demand value");
            item.set_cached(&descriptor.name, value.clone());
            Ok(value)
        }
    }
}
