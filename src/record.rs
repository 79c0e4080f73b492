use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta};

/// A record that can be filtered.
///
/// `name` is always the canonical property name declared in the record's
/// [`Shape`](crate::schema::Shape); the resolver maps user-typed names onto it.
pub trait Record {
    fn field(&self, name: &str) -> Field<'_>;
}

pub enum Field<'a> {
    Null,
    Scalar(Scalar<'a>),
    Record(RecordRef<'a>),
}

/// A navigable reference to a related record.
pub enum RecordRef<'a> {
    Borrowed(&'a dyn Record),
    Owned(Box<dyn Record + 'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Cow<'a, BigDecimal>),
    Bool(bool),
    Char(char),
    Text(Cow<'a, str>),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
    Duration(TimeDelta),
}

impl RecordRef<'_> {
    pub fn as_record(&self) -> &dyn Record {
        match self {
            RecordRef::Borrowed(r) => *r,
            RecordRef::Owned(r) => r.as_ref(),
        }
    }
}

impl<'a> Field<'a> {
    pub fn record(record: &'a dyn Record) -> Self {
        Field::Record(RecordRef::Borrowed(record))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }
}

impl Scalar<'_> {
    /// Orders two scalars of compatible kinds. Mixed numeric kinds are widened;
    /// anything else that does not match yields `None`.
    pub fn compare(&self, other: &Scalar<'_>) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::UInt(a), Scalar::UInt(b)) => Some(a.cmp(b)),
            (Scalar::Int(a), Scalar::UInt(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (Scalar::UInt(a), Scalar::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
            (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b),
            (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Scalar::Decimal(a), Scalar::Decimal(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Scalar::Int(a), Scalar::Decimal(b)) => Some(BigDecimal::from(*a).cmp(b.as_ref())),
            (Scalar::Decimal(a), Scalar::Int(b)) => Some(a.as_ref().cmp(&BigDecimal::from(*b))),
            (Scalar::UInt(a), Scalar::Decimal(b)) => Some(BigDecimal::from(*a).cmp(b.as_ref())),
            (Scalar::Decimal(a), Scalar::UInt(b)) => Some(a.as_ref().cmp(&BigDecimal::from(*b))),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Char(a), Scalar::Char(b)) => Some(a.cmp(b)),
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Scalar::DateTime(a), Scalar::DateTime(b)) => Some(a.cmp(b)),
            (Scalar::Date(a), Scalar::Date(b)) => Some(a.cmp(b)),
            (Scalar::Duration(a), Scalar::Duration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn equals(&self, other: &Scalar<'_>) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn into_owned(self) -> Scalar<'static> {
        match self {
            Scalar::Int(v) => Scalar::Int(v),
            Scalar::UInt(v) => Scalar::UInt(v),
            Scalar::Float(v) => Scalar::Float(v),
            Scalar::Decimal(v) => Scalar::Decimal(Cow::Owned(v.into_owned())),
            Scalar::Bool(v) => Scalar::Bool(v),
            Scalar::Char(v) => Scalar::Char(v),
            Scalar::Text(v) => Scalar::Text(Cow::Owned(v.into_owned())),
            Scalar::DateTime(v) => Scalar::DateTime(v),
            Scalar::Date(v) => Scalar::Date(v),
            Scalar::Duration(v) => Scalar::Duration(v),
        }
    }
}

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::UInt(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Decimal(v) => write!(f, "{}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Char(v) => write!(f, "{}", v),
            Scalar::Text(v) => f.write_str(v),
            Scalar::DateTime(v) => f.write_str(&v.to_rfc3339()),
            Scalar::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Scalar::Duration(v) => write_duration(f, v),
        }
    }
}

fn write_duration(f: &mut fmt::Formatter<'_>, d: &TimeDelta) -> fmt::Result {
    let sign = if *d < TimeDelta::zero() { "-" } else { "" };
    let d = d.abs();
    let secs = d.num_seconds();
    let (days, rest) = (secs / 86_400, secs % 86_400);
    f.write_str(sign)?;
    if days > 0 {
        write!(f, "{}.", days)?;
    }
    write!(f, "{:02}:{:02}:{:02}", rest / 3_600, rest % 3_600 / 60, rest % 60)?;
    let nanos = d.subsec_nanos();
    if nanos > 0 {
        write!(f, ".{:09}", nanos)?;
    }
    Ok(())
}

macro_rules! impl_scalar_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl<'a> From<$ty> for Field<'a> {
                fn from(v: $ty) -> Self {
                    Field::Scalar(Scalar::$variant($conv(v)))
                }
            }
        )*
    };
}

impl_scalar_from! {
    i8 => Int(i64::from),
    i16 => Int(i64::from),
    i32 => Int(i64::from),
    i64 => Int(i64::from),
    u8 => UInt(u64::from),
    u16 => UInt(u64::from),
    u32 => UInt(u64::from),
    u64 => UInt(u64::from),
    f32 => Float(f64::from),
    f64 => Float(f64::from),
    bool => Bool(bool::from),
    char => Char(char::from),
    NaiveDate => Date(NaiveDate::from),
    DateTime<FixedOffset> => DateTime(DateTime::<FixedOffset>::from),
    TimeDelta => Duration(TimeDelta::from),
    BigDecimal => Decimal(Cow::Owned),
    String => Text(Cow::Owned),
}

impl<'a> From<&'a str> for Field<'a> {
    fn from(v: &'a str) -> Self {
        Field::Scalar(Scalar::Text(Cow::Borrowed(v)))
    }
}

impl<'a> From<&'a String> for Field<'a> {
    fn from(v: &'a String) -> Self {
        Field::Scalar(Scalar::Text(Cow::Borrowed(v.as_str())))
    }
}

impl<'a> From<&'a BigDecimal> for Field<'a> {
    fn from(v: &'a BigDecimal) -> Self {
        Field::Scalar(Scalar::Decimal(Cow::Borrowed(v)))
    }
}

impl<'a> From<DateTime<chrono::Utc>> for Field<'a> {
    fn from(v: DateTime<chrono::Utc>) -> Self {
        Field::Scalar(Scalar::DateTime(v.fixed_offset()))
    }
}

impl<'a, T: Into<Field<'a>>> From<Option<T>> for Field<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Field::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_mixed_integer_compare() {
        assert_eq!(Scalar::Int(-1).compare(&Scalar::UInt(1)), Some(Ordering::Less));
        assert!(Scalar::UInt(7).equals(&Scalar::Int(7)));
    }

    #[test]
    fn test_decimal_scale_is_ignored() {
        let a = Scalar::Decimal(Cow::Owned(BigDecimal::from_str("1.50").unwrap()));
        let b = Scalar::Decimal(Cow::Owned(BigDecimal::from_str("1.5").unwrap()));
        assert!(a.equals(&b));
        assert!(Scalar::Int(2).compare(&b) == Some(Ordering::Greater));
    }

    #[test]
    fn test_mismatched_kinds_do_not_compare() {
        assert_eq!(Scalar::Bool(true).compare(&Scalar::Int(1)), None);
        assert!(!Scalar::Text(Cow::Borrowed("1")).equals(&Scalar::Int(1)));
    }

    #[test]
    fn test_nan_is_unordered() {
        assert_eq!(Scalar::Float(f64::NAN).compare(&Scalar::Float(1.0)), None);
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<i32> = None;
        assert!(Field::from(none).is_null());
        assert!(matches!(Field::from(Some(3)), Field::Scalar(Scalar::Int(3))));
    }

    #[test]
    fn test_duration_display() {
        let d = Scalar::Duration(TimeDelta::hours(26) + TimeDelta::seconds(5));
        assert_eq!(d.to_string(), "1.02:00:05");
    }
}
