use std::collections::HashMap;

use super::error::{QueryParseError, QueryResult};
use crate::schema::{FieldType, RecordShape};

/// Display-label to property-name substitutions for the first path segment.
#[derive(Debug, Clone, Default)]
pub struct FieldAliases {
    map: HashMap<String, String>,
}

impl FieldAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl AsRef<str>, property: impl Into<String>) {
        self.map.insert(label.as_ref().to_lowercase(), property.into());
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.map.get(&label.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for FieldAliases {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut aliases = FieldAliases::new();
        aliases.extend(iter);
        aliases
    }
}

impl<K: AsRef<str>, V: Into<String>> Extend<(K, V)> for FieldAliases {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (label, property) in iter {
            self.insert(label, property);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub ty: FieldType,
    pub nullable: bool,
}

/// Resolved property chain from the record root to the compared value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessChain {
    steps: Vec<Step>,
}

impl AccessChain {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name.as_str())
    }

    fn last(&self) -> &Step {
        // resolve() never builds an empty chain
        &self.steps[self.steps.len() - 1]
    }

    pub fn final_type(&self) -> &FieldType {
        &self.last().ty
    }

    pub fn is_nullable(&self) -> bool {
        self.last().nullable
    }

    /// True when any segment can be null, including references crossed on the way.
    pub fn may_be_null(&self) -> bool {
        self.steps.iter().any(|s| s.nullable)
    }

    /// Canonical dotted path, e.g. `Mentor.Age`.
    pub fn path(&self) -> String {
        self.names().collect::<Vec<_>>().join(".")
    }
}

pub fn resolve(
    path: &str,
    root: RecordShape<'_>,
    aliases: Option<&FieldAliases>,
) -> QueryResult<AccessChain> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    let first = aliases.and_then(|a| a.get(first)).unwrap_or(first);

    // An alias may itself name a dotted path.
    let segments: Vec<&str> = first.split('.').chain(segments).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(QueryParseError::new(format!("Invalid field path '{}'", path)));
    }

    let mut current = root.shape;
    let mut steps = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let Some(property) = current.find(segment) else {
            return Err(QueryParseError::new(format!(
                "Unknown field '{}' on {}. Available fields: {}",
                segment,
                current.name,
                current.property_names().join(", ")
            )));
        };

        steps.push(Step {
            name: property.name.clone(),
            ty: property.ty.clone(),
            nullable: property.is_nullable(),
        });

        if i + 1 == segments.len() {
            break;
        }

        current = match &property.ty {
            FieldType::Record(target) => root.schema.shape(target).ok_or_else(|| {
                QueryParseError::new(format!(
                    "Field '{}' refers to unknown record type '{}'",
                    property.name, target
                ))
            })?,
            other => {
                return Err(QueryParseError::new(format!(
                    "Field '{}' on {} is of type {} and has no field '{}'. Available fields: none",
                    property.name,
                    current.name,
                    other,
                    segments[i + 1]
                )));
            }
        };
    }

    Ok(AccessChain { steps })
}
