use std::borrow::Cow;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};

use super::ast::Literal;
use super::error::{QueryParseError, QueryResult};
use crate::record::Scalar;
use crate::schema::FieldType;
use crate::temporal::{
    parse_date, parse_datetime, parse_duration, DATETIME_FORMAT_HINT, DATE_FORMAT_HINT,
    DURATION_FORMAT_HINT,
};

/// Coerces a query literal to the declared type of `field`.
///
/// Returns `None` for `null`, which is accepted only when the field is nullable.
pub fn convert_value(
    literal: &Literal,
    ty: &FieldType,
    nullable: bool,
    field: &str,
) -> QueryResult<Option<Scalar<'static>>> {
    if let Literal::Null = literal {
        if nullable {
            return Ok(None);
        }
        return Err(QueryParseError::new(format!(
            "Field '{}' of type {} cannot be compared with null",
            field, ty
        )));
    }

    let mismatch = |expected: &str| {
        QueryParseError::new(format!(
            "Cannot convert {} to {} for field '{}': expected {}",
            literal, ty, field, expected
        ))
    };

    let value = match (ty, literal) {
        (FieldType::String, Literal::String(s)) => Scalar::Text(Cow::Owned(s.clone())),
        (FieldType::String, Literal::Number(n)) => Scalar::Text(Cow::Owned(n.to_plain_string())),
        (FieldType::String, Literal::Bool(b)) => Scalar::Text(Cow::Owned(b.to_string())),

        (FieldType::Bool, Literal::Bool(b)) => Scalar::Bool(*b),
        (FieldType::Bool, _) => return Err(mismatch("true or false")),

        (FieldType::DateTime, Literal::String(s)) => match parse_datetime(s) {
            Ok(dt) => Scalar::DateTime(dt),
            Err(e) => return Err(mismatch(DATETIME_FORMAT_HINT).with_cause(e)),
        },
        (FieldType::DateTime, _) => return Err(mismatch(DATETIME_FORMAT_HINT)),

        (FieldType::Date, Literal::String(s)) => match parse_date(s) {
            Ok(d) => Scalar::Date(d),
            Err(e) => return Err(mismatch(DATE_FORMAT_HINT).with_cause(e)),
        },
        (FieldType::Date, _) => return Err(mismatch(DATE_FORMAT_HINT)),

        (FieldType::Duration, Literal::String(s)) => match parse_duration(s) {
            Ok(d) => Scalar::Duration(d),
            Err(e) => return Err(mismatch(DURATION_FORMAT_HINT).with_cause(e)),
        },
        (FieldType::Duration, _) => return Err(mismatch(DURATION_FORMAT_HINT)),

        (ty, Literal::Number(n)) if ty.is_numeric() => number_to(n, ty, field)?,

        _ => convert_fallback(literal, ty, field)?,
    };

    Ok(Some(value))
}

fn number_to(n: &BigDecimal, ty: &FieldType, field: &str) -> QueryResult<Scalar<'static>> {
    let out_of_range = || {
        QueryParseError::new(format!(
            "Number {} is out of range for field '{}' of type {}",
            n, field, ty
        ))
    };

    if ty.is_integer() && !n.is_integer() {
        return Err(QueryParseError::new(format!(
            "Number {} is not a whole number, field '{}' is of type {}",
            n, field, ty
        )));
    }

    let value = match ty {
        FieldType::Int32 => {
            let v = n.to_i64().ok_or_else(out_of_range)?;
            let v = i32::try_from(v).map_err(|e| out_of_range().with_cause(e))?;
            Scalar::Int(i64::from(v))
        }
        FieldType::Int64 => Scalar::Int(n.to_i64().ok_or_else(out_of_range)?),
        FieldType::UInt32 => {
            let v = n.to_u64().ok_or_else(out_of_range)?;
            let v = u32::try_from(v).map_err(|e| out_of_range().with_cause(e))?;
            Scalar::UInt(u64::from(v))
        }
        FieldType::UInt64 => Scalar::UInt(n.to_u64().ok_or_else(out_of_range)?),
        FieldType::Float32 => Scalar::Float(f64::from(n.to_f32().ok_or_else(out_of_range)?)),
        FieldType::Float64 => Scalar::Float(n.to_f64().ok_or_else(out_of_range)?),
        FieldType::Decimal => Scalar::Decimal(Cow::Owned(n.clone())),
        _ => return Err(out_of_range()),
    };
    Ok(value)
}

/// Last-resort conversions: parse string literals into numbers and chars.
fn convert_fallback(literal: &Literal, ty: &FieldType, field: &str) -> QueryResult<Scalar<'static>> {
    let failed = || {
        QueryParseError::new(format!(
            "Cannot convert {} to {} for field '{}'",
            literal, ty, field
        ))
    };

    let Literal::String(s) = literal else {
        return Err(failed());
    };
    let s = s.trim();

    let value = match ty {
        FieldType::Char => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Scalar::Char(c),
                _ => return Err(failed()),
            }
        }
        FieldType::Int32 => Scalar::Int(i64::from(
            s.parse::<i32>().map_err(|e| failed().with_cause(e))?,
        )),
        FieldType::Int64 => Scalar::Int(s.parse::<i64>().map_err(|e| failed().with_cause(e))?),
        FieldType::UInt32 => Scalar::UInt(u64::from(
            s.parse::<u32>().map_err(|e| failed().with_cause(e))?,
        )),
        FieldType::UInt64 => Scalar::UInt(s.parse::<u64>().map_err(|e| failed().with_cause(e))?),
        FieldType::Float32 => Scalar::Float(f64::from(
            s.parse::<f32>().map_err(|e| failed().with_cause(e))?,
        )),
        FieldType::Float64 => Scalar::Float(s.parse::<f64>().map_err(|e| failed().with_cause(e))?),
        FieldType::Decimal => Scalar::Decimal(Cow::Owned(
            BigDecimal::from_str(s).map_err(|e| failed().with_cause(e))?,
        )),
        _ => return Err(failed()),
    };
    Ok(value)
}
