use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid schema file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("property '{shape}.{property}' has an empty type")]
    EmptyType { shape: String, property: String },

    #[error("property '{shape}.{property}' refers to unknown shape '{target}'")]
    UnknownShape {
        shape: String,
        property: String,
        target: String,
    },

    #[error("unknown root shape '{0}'")]
    UnknownRoot(String),

    #[error("schema does not name a root shape")]
    MissingRoot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    Bool,
    Char,
    String,
    DateTime,
    Date,
    Duration,
    /// Navigable reference to another shape of the same schema.
    Record(String),
}

impl FieldType {
    pub fn record(shape: impl Into<String>) -> Self {
        FieldType::Record(shape.into())
    }

    /// Value types can only hold null when declared optional.
    pub fn is_value_type(&self) -> bool {
        !matches!(self, FieldType::String | FieldType::Record(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::Int32 | FieldType::Int64 | FieldType::UInt32 | FieldType::UInt64
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(self, FieldType::Float32 | FieldType::Float64 | FieldType::Decimal)
    }

    /// Types that support `<`, `<=`, `>` and `>=`.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric()
            || matches!(self, FieldType::DateTime | FieldType::Date | FieldType::Duration)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Int32 => "i32",
            FieldType::Int64 => "i64",
            FieldType::UInt32 => "u32",
            FieldType::UInt64 => "u64",
            FieldType::Float32 => "f32",
            FieldType::Float64 => "f64",
            FieldType::Decimal => "decimal",
            FieldType::Bool => "bool",
            FieldType::Char => "char",
            FieldType::String => "string",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::Duration => "duration",
            FieldType::Record(name) => name,
        };
        f.write_str(s)
    }
}

impl FromStr for FieldType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_lowercase().as_str() {
            "" => return Err(()),
            "i32" | "int" => FieldType::Int32,
            "i64" | "long" => FieldType::Int64,
            "u32" => FieldType::UInt32,
            "u64" => FieldType::UInt64,
            "f32" | "float" => FieldType::Float32,
            "f64" | "double" => FieldType::Float64,
            "decimal" => FieldType::Decimal,
            "bool" | "boolean" => FieldType::Bool,
            "char" => FieldType::Char,
            "string" => FieldType::String,
            "datetime" => FieldType::DateTime,
            "date" => FieldType::Date,
            "duration" | "timespan" => FieldType::Duration,
            _ => FieldType::Record(s.to_string()),
        };
        Ok(ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub ty: FieldType,
    pub optional: bool,
}

impl Property {
    pub fn is_nullable(&self) -> bool {
        self.optional || !self.ty.is_value_type()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shape {
    pub name: String,
    pub properties: Vec<Property>,
    pub aliases: IndexMap<String, String>,
}

impl Shape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn property(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.properties.push(Property {
            name: name.into(),
            ty,
            optional: false,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.properties.push(Property {
            name: name.into(),
            ty,
            optional: true,
        });
        self
    }

    pub fn alias(mut self, label: impl Into<String>, property: impl Into<String>) -> Self {
        self.aliases.insert(label.into(), property.into());
        self
    }

    /// Case-insensitive property lookup.
    pub fn find(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                let lower = name.to_lowercase();
                self.properties.iter().find(|p| p.name.to_lowercase() == lower)
            })
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    shapes: IndexMap<String, Shape>,
    root: Option<String>,
}

/// A shape together with the schema it lives in, so references can be followed.
#[derive(Debug, Clone, Copy)]
pub struct RecordShape<'s> {
    pub schema: &'s Schema,
    pub shape: &'s Shape,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.insert(shape);
        self
    }

    pub fn insert(&mut self, shape: Shape) {
        self.shapes.insert(shape.name.clone(), shape);
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.get(name)
    }

    pub fn record(&self, name: &str) -> Option<RecordShape<'_>> {
        self.shape(name).map(|shape| RecordShape {
            schema: self,
            shape,
        })
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// The shape queries run against, `name` overriding the schema's own root.
    pub fn root(&self, name: Option<&str>) -> Result<RecordShape<'_>, SchemaError> {
        let name = name.or(self.root.as_deref()).ok_or(SchemaError::MissingRoot)?;
        self.record(name)
            .ok_or_else(|| SchemaError::UnknownRoot(name.to_string()))
    }

    /// Checks that every record reference points at a known shape.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for shape in self.shapes.values() {
            for property in &shape.properties {
                if let FieldType::Record(target) = &property.ty {
                    if !self.shapes.contains_key(target) {
                        return Err(SchemaError::UnknownShape {
                            shape: shape.name.clone(),
                            property: property.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        if let Some(root) = &self.root {
            if !self.shapes.contains_key(root) {
                return Err(SchemaError::UnknownRoot(root.clone()));
            }
        }
        Ok(())
    }

    pub fn from_yaml(text: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_yaml::from_str(text)?;
        let mut schema = Schema {
            shapes: IndexMap::new(),
            root: file.root,
        };

        for (name, def) in file.shapes {
            let mut shape = Shape::new(name.clone());
            for (property, ty) in def.properties {
                let (ty, optional) = match ty.trim().strip_suffix('?') {
                    Some(inner) => (inner.trim(), true),
                    None => (ty.trim(), false),
                };
                let ty = FieldType::from_str(ty).map_err(|_| SchemaError::EmptyType {
                    shape: name.clone(),
                    property: property.clone(),
                })?;
                shape.properties.push(Property {
                    name: property,
                    ty,
                    optional,
                });
            }
            shape.aliases = def.aliases;
            schema.insert(shape);
        }

        schema.validate()?;
        Ok(schema)
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

#[derive(Deserialize)]
struct SchemaFile {
    root: Option<String>,
    shapes: IndexMap<String, ShapeFile>,
}

#[derive(Deserialize)]
struct ShapeFile {
    #[serde(default)]
    properties: IndexMap<String, String>,
    #[serde(default)]
    aliases: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &str = r#"
root: Person
shapes:
  Person:
    properties:
      Id: i32
      Name: string
      Age: int
      Salary: decimal?
      Mentor: Person
    aliases:
      Years: Age
"#;

    #[test]
    fn test_load_yaml() {
        let schema = Schema::from_yaml(PEOPLE).unwrap();
        let person = schema.root(None).unwrap().shape;
        assert_eq!(person.property_names(), vec!["Id", "Name", "Age", "Salary", "Mentor"]);

        let salary = person.find("salary").unwrap();
        assert_eq!(salary.ty, FieldType::Decimal);
        assert!(salary.is_nullable());

        let mentor = person.find("MENTOR").unwrap();
        assert_eq!(mentor.ty, FieldType::record("Person"));
        assert!(mentor.is_nullable());

        assert!(!person.find("Age").unwrap().is_nullable());
        assert_eq!(person.aliases.get("Years").map(String::as_str), Some("Age"));
    }

    #[test]
    fn test_unknown_reference() {
        let text = "shapes:\n  A:\n    properties:\n      B: Missing\n";
        let err = Schema::from_yaml(text).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownShape { .. }));
    }

    #[test]
    fn test_root_override_and_missing_root() {
        let text = "shapes:\n  A:\n    properties:\n      X: bool\n";
        let schema = Schema::from_yaml(text).unwrap();
        assert!(matches!(schema.root(None), Err(SchemaError::MissingRoot)));
        assert_eq!(schema.root(Some("A")).unwrap().shape.name, "A");
        assert!(matches!(schema.root(Some("B")), Err(SchemaError::UnknownRoot(_))));
    }

    #[test]
    fn test_type_names() {
        assert_eq!("timespan".parse::<FieldType>(), Ok(FieldType::Duration));
        assert_eq!("DateTime".parse::<FieldType>(), Ok(FieldType::DateTime));
        assert!(FieldType::Duration.is_ordered());
        assert!(!FieldType::Bool.is_ordered());
        assert!(!FieldType::String.is_value_type());
    }
}
