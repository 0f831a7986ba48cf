//! Path lookup against the state schema.

use screenkit_model::{StateDefinition, TypeTag};
use std::collections::BTreeMap;

/// Flattened view of the effective state schema
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    fields: BTreeMap<String, TypeTag>,
}

impl SchemaIndex {
    pub fn new(fields: BTreeMap<String, TypeTag>) -> Self {
        Self { fields }
    }

    /// Index the declared schema, or the one inferred from initial values
    pub fn from_state(state: &StateDefinition) -> Self {
        Self::new(state.effective_schema())
    }

    pub fn type_of(&self, path: &str) -> Option<TypeTag> {
        self.fields.get(path).copied()
    }

    /// Whether `segments` resolves to a declared field.
    ///
    /// A path also resolves when it is an intermediate object of a declared
    /// field, or when it descends into an object declared without children
    /// (schemas may be shallow). Descending into any other leaf does not
    /// resolve.
    pub fn contains(&self, segments: &[String]) -> bool {
        if segments.is_empty() {
            return false;
        }

        let joined = segments.join(".");
        if self.fields.contains_key(&joined) || self.has_children(&joined) {
            return true;
        }

        for depth in (1..segments.len()).rev() {
            let prefix = segments[..depth].join(".");
            match self.fields.get(&prefix) {
                Some(TypeTag::Object) => return !self.has_children(&prefix),
                Some(_) => return false,
                None => continue,
            }
        }

        false
    }

    fn has_children(&self, prefix: &str) -> bool {
        let lower = format!("{}.", prefix);
        self.fields
            .range(lower.clone()..)
            .next()
            .map(|(key, _)| key.starts_with(&lower))
            .unwrap_or(false)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &TypeTag)> {
        self.fields.iter()
    }
}
