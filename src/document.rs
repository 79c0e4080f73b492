use std::borrow::Cow;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::record::{Field, Record, RecordRef, Scalar};
use crate::schema::{FieldType, Schema, Shape};
use crate::temporal::{parse_date, parse_datetime, parse_duration};

/// A YAML (or JSON) mapping read as a record of `shape`.
pub struct Document<'a> {
    schema: &'a Schema,
    shape: &'a Shape,
    mapping: &'a Mapping,
}

impl<'a> Document<'a> {
    pub fn new(schema: &'a Schema, shape: &'a Shape, value: &'a YamlValue) -> Option<Self> {
        Some(Self {
            schema,
            shape,
            mapping: value.as_mapping()?,
        })
    }
}

impl Record for Document<'_> {
    fn field(&self, name: &str) -> Field<'_> {
        let Some(property) = self.shape.find(name) else {
            return Field::Null;
        };
        let Some(value) = get_field_case_insensitive(self.mapping, &property.name) else {
            return Field::Null;
        };
        if value.is_null() {
            return Field::Null;
        }

        if let FieldType::Record(target) = &property.ty {
            let nested = self
                .schema
                .shape(target)
                .and_then(|shape| Document::new(self.schema, shape, value));
            return match nested {
                Some(doc) => Field::Record(RecordRef::Owned(Box::new(doc))),
                None => Field::Null,
            };
        }

        match yaml_to_scalar(value, &property.ty) {
            Some(scalar) => Field::Scalar(scalar),
            None => {
                tracing::trace!(
                    shape = %self.shape.name,
                    field = %property.name,
                    expected = %property.ty,
                    "value does not match declared type"
                );
                Field::Null
            }
        }
    }
}

fn get_field_case_insensitive<'a>(mapping: &'a Mapping, field: &str) -> Option<&'a YamlValue> {
    if let Some(value) = mapping.get(field) {
        return Some(value);
    }
    let field_lower = field.to_lowercase();
    for (key, value) in mapping {
        if let Some(key_str) = key.as_str() {
            if key_str.to_lowercase() == field_lower {
                return Some(value);
            }
        }
    }
    None
}

fn yaml_to_scalar<'a>(v: &'a YamlValue, ty: &FieldType) -> Option<Scalar<'a>> {
    let scalar = match ty {
        FieldType::Int32 | FieldType::Int64 => Scalar::Int(v.as_i64()?),
        FieldType::UInt32 | FieldType::UInt64 => Scalar::UInt(v.as_u64()?),
        FieldType::Float32 | FieldType::Float64 => Scalar::Float(yaml_to_number(v)?),
        FieldType::Decimal => Scalar::Decimal(Cow::Owned(yaml_to_decimal(v)?)),
        FieldType::Bool => Scalar::Bool(v.as_bool()?),
        FieldType::Char => {
            let s = v.as_str()?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Scalar::Char(c),
                _ => return None,
            }
        }
        FieldType::String => match v {
            YamlValue::String(s) => Scalar::Text(Cow::Borrowed(s.as_str())),
            YamlValue::Number(n) => Scalar::Text(Cow::Owned(n.to_string())),
            YamlValue::Bool(b) => Scalar::Text(Cow::Owned(b.to_string())),
            _ => return None,
        },
        FieldType::DateTime => Scalar::DateTime(parse_datetime(v.as_str()?).ok()?),
        FieldType::Date => Scalar::Date(parse_date(v.as_str()?).ok()?),
        FieldType::Duration => Scalar::Duration(parse_duration(v.as_str()?).ok()?),
        FieldType::Record(_) => return None,
    };
    Some(scalar)
}

fn yaml_to_number(v: &YamlValue) -> Option<f64> {
    v.as_f64().or_else(|| v.as_i64().map(|i| i as f64))
}

fn yaml_to_decimal(v: &YamlValue) -> Option<BigDecimal> {
    match v {
        YamlValue::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        YamlValue::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_predicate;
    use serde_yaml::from_str;

    const SCHEMA: &str = r#"
root: Person
shapes:
  Person:
    properties:
      Name: string
      Age: i32
      Salary: decimal?
      Joined: date?
      Mentor: Person
"#;

    fn check(query: &str, yaml: &str) -> bool {
        let schema = Schema::from_yaml(SCHEMA).unwrap();
        let root = schema.root(None).unwrap();
        let value: YamlValue = from_str(yaml).unwrap();
        let doc = Document::new(&schema, root.shape, &value).unwrap();
        build_predicate(query, root, None).unwrap().matches(&doc)
    }

    #[test]
    fn test_case_insensitive_keys() {
        assert!(check("Age = 30", "age: 30"));
        assert!(check(r#"Name = "Ann""#, "NAME: Ann"));
    }

    #[test]
    fn test_nested_record() {
        let yaml = "Name: Ann\nMentor:\n  Name: Bob\n  Age: 61\n";
        assert!(check("Mentor.Age > 60", yaml));
        assert!(!check("Mentor.Age > 60", "Name: Ann\nMentor: ~\n"));
    }

    #[test]
    fn test_decimal_and_date_values() {
        let yaml = "Salary: 1200.50\nJoined: \"2023-04-01\"\n";
        assert!(check("Salary > 1200.49", yaml));
        assert!(check(r#"Joined < "2024-01-01""#, yaml));
        assert!(check("Salary is not null", yaml));
        assert!(check("Joined is null", "Name: x"));
    }

    #[test]
    fn test_mistyped_value_reads_as_null() {
        assert!(!check("Age > 1", "Age: lots"));
        assert!(check("Age != 1", "Age: lots"));
    }
}
