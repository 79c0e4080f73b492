use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::plan::{CompareOp, Plan, Test, TextOp};
use crate::record::{Field, Record, Scalar};

type TestFn = dyn Fn(&dyn Record) -> bool + Send + Sync;

/// A compiled filter. Cloning is cheap and the predicate can be shared across threads.
#[derive(Clone)]
pub struct Predicate {
    test: Arc<TestFn>,
    match_all: bool,
}

impl Predicate {
    /// The predicate an empty query compiles to.
    pub fn always() -> Self {
        Self {
            test: Arc::new(|_: &dyn Record| true),
            match_all: true,
        }
    }

    pub fn compile(plan: Plan) -> Self {
        Self {
            test: Arc::from(compile(plan)),
            match_all: false,
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.match_all
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        (self.test)(record)
    }

    pub fn matches_dyn(&self, record: &dyn Record) -> bool {
        (self.test)(record)
    }

    pub fn filter<'a, R, I>(&'a self, records: I) -> impl Iterator<Item = &'a R> + 'a
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
        I::IntoIter: 'a,
    {
        records.into_iter().filter(move |r| self.matches(*r))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("match_all", &self.match_all)
            .finish_non_exhaustive()
    }
}

fn compile(plan: Plan) -> Box<TestFn> {
    match plan {
        Plan::Const(value) => Box::new(move |_: &dyn Record| value),
        Plan::And(left, right) => {
            let (left, right) = (compile(*left), compile(*right));
            Box::new(move |r: &dyn Record| left(r) && right(r))
        }
        Plan::Or(left, right) => {
            let (left, right) = (compile(*left), compile(*right));
            Box::new(move |r: &dyn Record| left(r) || right(r))
        }
        Plan::Not(operand) => {
            let operand = compile(*operand);
            Box::new(move |r: &dyn Record| !operand(r))
        }
        Plan::Test { chain, test } => {
            let path: Vec<String> = chain.names().map(str::to_string).collect();
            Box::new(move |r: &dyn Record| with_field(r, &path, |field| evaluate(&test, field)))
        }
    }
}

/// Walks `path` from `record`, handing the final field to `f`. A null or
/// non-record value part way along yields `Field::Null`.
fn with_field<T>(record: &dyn Record, path: &[String], f: impl FnOnce(Field<'_>) -> T) -> T {
    match path {
        [] => f(Field::Null),
        [last] => f(record.field(last)),
        [head, rest @ ..] => match record.field(head) {
            Field::Record(next) => with_field(next.as_record(), rest, f),
            _ => f(Field::Null),
        },
    }
}

fn evaluate(test: &Test, field: Field<'_>) -> bool {
    match test {
        Test::IsNull => field.is_null(),
        Test::IsNotNull => !field.is_null(),
        Test::Compare(op, expected) => match field {
            Field::Scalar(actual) => compare(&actual, *op, expected),
            // Lifted null semantics: null only differs from a value.
            _ => *op == CompareOp::Ne,
        },
        Test::Text(op, needle) => match &field {
            Field::Scalar(actual) => actual.as_text().is_some_and(|s| match op {
                TextOp::Contains => s.contains(needle.as_str()),
                TextOp::StartsWith => s.starts_with(needle.as_str()),
                TextOp::EndsWith => s.ends_with(needle.as_str()),
            }),
            _ => false,
        },
        Test::In(values) => match &field {
            Field::Scalar(actual) => values.iter().any(|v| actual.equals(v)),
            _ => false,
        },
    }
}

fn compare(actual: &Scalar<'_>, op: CompareOp, expected: &Scalar<'_>) -> bool {
    let ordering = actual.compare(expected);
    match op {
        CompareOp::Eq => ordering == Some(Ordering::Equal),
        CompareOp::Ne => ordering != Some(Ordering::Equal),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::lower;
    use crate::query::{lexer::tokenize, parser::parse};
    use crate::schema::{FieldType, Schema, Shape};

    struct Person {
        age: i32,
        name: Option<String>,
        mentor: Option<Box<Person>>,
    }

    impl Record for Person {
        fn field(&self, name: &str) -> Field<'_> {
            match name {
                "Age" => self.age.into(),
                "Name" => self.name.as_ref().into(),
                "Mentor" => self.mentor.as_deref().map_or(Field::Null, |m| Field::record(m)),
                _ => Field::Null,
            }
        }
    }

    fn person(age: i32, name: Option<&str>, mentor: Option<Person>) -> Person {
        Person {
            age,
            name: name.map(str::to_string),
            mentor: mentor.map(Box::new),
        }
    }

    fn compile_query(query: &str) -> Predicate {
        let schema = Schema::new().with_shape(
            Shape::new("Person")
                .property("Age", FieldType::Int32)
                .property("Name", FieldType::String)
                .optional("Mentor", FieldType::record("Person")),
        );
        let node = parse(tokenize(query).unwrap()).unwrap();
        Predicate::compile(lower(&node, schema.record("Person").unwrap(), None).unwrap())
    }

    #[test]
    fn test_age_threshold() {
        let p = compile_query("Age >= 18");
        assert!(!p.matches(&person(17, None, None)));
        assert!(p.matches(&person(18, None, None)));
    }

    #[test]
    fn test_navigation() {
        let p = compile_query("Mentor.Age > 30");
        assert!(p.matches(&person(20, None, Some(person(40, None, None)))));
        assert!(!p.matches(&person(20, None, Some(person(30, None, None)))));
        assert!(!p.matches(&person(20, None, None)));
    }

    #[test]
    fn test_null_reference_with_not_equal() {
        let p = compile_query("Mentor.Age != 30");
        assert!(p.matches(&person(20, None, None)));
    }

    #[test]
    fn test_text_operators_and_null_strings() {
        let p = compile_query(r#"Name startsWith "Ann" OR Name endsWith "ie""#);
        assert!(p.matches(&person(1, Some("Annabel"), None)));
        assert!(p.matches(&person(1, Some("Julie"), None)));
        assert!(!p.matches(&person(1, Some("Bob"), None)));
        assert!(!p.matches(&person(1, None, None)));
    }

    #[test]
    fn test_string_compare_is_case_sensitive() {
        let p = compile_query(r#"Name = "bob""#);
        assert!(p.matches(&person(1, Some("bob"), None)));
        assert!(!p.matches(&person(1, Some("Bob"), None)));
    }

    #[test]
    fn test_not() {
        let p = compile_query("NOT Age < 18");
        assert!(p.matches(&person(18, None, None)));
        assert!(!p.matches(&person(5, None, None)));
    }

    #[test]
    fn test_filter_iterator() {
        let people = vec![person(10, None, None), person(20, None, None), person(30, None, None)];
        let p = compile_query("Age > 15");
        let ages: Vec<i32> = p.filter(&people).map(|p| p.age).collect();
        assert_eq!(ages, vec![20, 30]);
    }

    #[test]
    fn test_predicate_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predicate>();
    }
}
