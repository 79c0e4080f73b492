use std::str::FromStr;
use std::thread;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, TimeDelta};
use rfq::{
    build_predicate, build_sql_filter, try_build_predicate, Field, FieldAliases, FieldType,
    Record, Schema, Shape,
};

#[derive(Default)]
struct Person {
    id: i32,
    age: i32,
    is_teacher: bool,
    name: Option<String>,
    salary: Option<BigDecimal>,
    birthday: Option<NaiveDate>,
    shift: Option<TimeDelta>,
    mentor: Option<Box<Person>>,
}

impl Record for Person {
    fn field(&self, name: &str) -> Field<'_> {
        match name {
            "Id" => self.id.into(),
            "Age" => self.age.into(),
            "IsTeacher" => self.is_teacher.into(),
            "Name" => self.name.as_ref().into(),
            "Salary" => self.salary.as_ref().into(),
            "Birthday" => self.birthday.into(),
            "Shift" => self.shift.into(),
            "Mentor" => self.mentor.as_deref().map_or(Field::Null, |m| Field::record(m)),
            _ => Field::Null,
        }
    }
}

fn schema() -> Schema {
    Schema::new().with_shape(
        Shape::new("Person")
            .property("Id", FieldType::Int32)
            .property("Age", FieldType::Int32)
            .property("IsTeacher", FieldType::Bool)
            .property("Name", FieldType::String)
            .optional("Salary", FieldType::Decimal)
            .optional("Birthday", FieldType::Date)
            .optional("Shift", FieldType::Duration)
            .optional("Mentor", FieldType::record("Person")),
    )
}

fn aged(age: i32) -> Person {
    Person {
        age,
        ..Default::default()
    }
}

fn matches(query: &str, person: &Person) -> bool {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    build_predicate(query, shape, None).unwrap().matches(person)
}

#[test]
fn age_threshold() {
    assert!(!matches("Age >= 18", &aged(17)));
    assert!(matches("Age >= 18", &aged(18)));
}

#[test]
fn and_binds_tighter_than_or() {
    // A = 1 only; B and C both 0. (A OR B) AND C would be false.
    let person = Person {
        id: 1,
        ..Default::default()
    };
    let flat = "Id = 1 OR Age = 1 AND IsTeacher = true";
    let grouped = "Id = 1 OR (Age = 1 AND IsTeacher = true)";
    let other = "(Id = 1 OR Age = 1) AND IsTeacher = true";
    assert!(matches(flat, &person));
    assert!(matches(grouped, &person));
    assert!(!matches(other, &person));
}

#[test]
fn mixed_logic_with_navigation() {
    let query = "Age >= 18 AND (IsTeacher = true OR Mentor.Age > 50)";
    let mentored = Person {
        age: 20,
        mentor: Some(Box::new(aged(60))),
        ..Default::default()
    };
    let teacher = Person {
        age: 40,
        is_teacher: true,
        ..Default::default()
    };
    assert!(matches(query, &mentored));
    assert!(matches(query, &teacher));
    assert!(!matches(query, &aged(30)));
}

#[test]
fn missing_mentor_evaluates_to_false() {
    assert!(!matches("Mentor.Age > 30", &aged(20)));
    assert!(matches("Mentor is null", &aged(20)));
    assert!(matches("NOT Mentor.Age > 30", &aged(20)));
}

#[test]
fn is_null_on_value_type_is_constant() {
    assert!(!matches("Age is null", &aged(0)));
    assert!(matches("Age is not null", &aged(0)));
}

#[test]
fn in_operator() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let predicate = build_predicate("Id in (1,2,3)", shape, None).unwrap();
    for id in 0..6 {
        let person = Person {
            id,
            ..Default::default()
        };
        assert_eq!(predicate.matches(&person), (1..=3).contains(&id));
    }

    let err = build_predicate("Id in ()", shape, None).unwrap_err();
    assert_eq!(err.position, Some(7));
}

#[test]
fn errors_are_positional() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let err = build_predicate("Age >> 5", shape, None).unwrap_err();
    assert_eq!(err.position, Some(5));
    assert!(err.to_string().contains("position 5"));
}

#[test]
fn blank_query_matches_everything() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let predicate = build_predicate(" \t\n", shape, None).unwrap();
    assert!(predicate.is_match_all());
    assert!(predicate.matches(&aged(1)));
}

#[test]
fn string_operator_on_number_is_compile_error() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let err = build_predicate(r#"Age contains "1""#, shape, None).unwrap_err();
    assert!(err.message.contains("Age"));
}

#[test]
fn non_throwing_entry_point_reports_message() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let message = try_build_predicate("Agee > 1", shape, None).unwrap_err();
    assert!(message.contains("Unknown field 'Agee'"));
    assert!(message.contains("Available fields"));
    assert!(try_build_predicate("Age > 1", shape, None).is_ok());
}

#[test]
fn aliases_substitute_display_labels() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let aliases: FieldAliases = [("Years Old", "Age"), ("Coach", "Mentor")].into_iter().collect();
    let predicate = build_predicate("coach.age > 50", shape, Some(&aliases)).unwrap();
    let person = Person {
        mentor: Some(Box::new(aged(51))),
        ..Default::default()
    };
    assert!(predicate.matches(&person));
}

#[test]
fn typed_literals() {
    let person = Person {
        name: Some("Grace Hopper".to_string()),
        salary: Some(BigDecimal::from_str("1000.25").unwrap()),
        birthday: NaiveDate::from_ymd_opt(1906, 12, 9),
        shift: Some(TimeDelta::hours(8)),
        ..Default::default()
    };
    assert!(matches(r#"Name contains "Hop""#, &person));
    assert!(matches("Salary >= 1000.25 AND Salary < 1000.3", &person));
    assert!(matches(r#"Birthday < "1910-01-01""#, &person));
    assert!(matches(r#"Shift > "07:59:59""#, &person));
    assert!(!matches("Salary is null", &person));
}

#[test]
fn predicate_is_shareable_across_threads() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let predicate = build_predicate("Age > 10", shape, None).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let p = predicate.clone();
            thread::spawn(move || p.matches(&aged(i * 10)))
        })
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![false, false, true, true]);
}

#[test]
fn sql_backend_shares_the_front_end() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let filter = build_sql_filter("Age >= 18 AND Mentor.Name startsWith \"A\"", shape, None).unwrap();
    assert_eq!(
        filter.clause,
        r#"("Age" >= ? AND ("Mentor"."Name" LIKE ? ESCAPE '\' AND "Mentor"."Name" IS NOT NULL))"#
    );
    assert_eq!(filter.params.len(), 2);
    assert_eq!(build_sql_filter("", shape, None).unwrap().clause, "1 = 1");
    assert!(build_sql_filter("Age contains \"1\"", shape, None).is_err());
}

#[test]
fn deeply_nested_query_is_an_error_not_a_crash() {
    let schema = schema();
    let shape = schema.record("Person").unwrap();
    let query = format!("{}Age > 1", "NOT ".repeat(20_000));
    let message = try_build_predicate(&query, shape, None).unwrap_err();
    assert!(message.contains("nested too deeply"));
    assert!(build_sql_filter(&query, shape, None).is_err());
}
