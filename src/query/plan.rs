use super::ast::{Comparison, ComparisonOp, Literal, LogicalOp, Node, Value};
use super::convert::convert_value;
use super::error::{QueryParseError, QueryResult};
use super::resolve::{resolve, AccessChain, FieldAliases};
use crate::record::Scalar;
use crate::schema::{FieldType, RecordShape};

#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Const(bool),
    And(Box<Plan>, Box<Plan>),
    Or(Box<Plan>, Box<Plan>),
    Not(Box<Plan>),
    Test { chain: AccessChain, test: Test },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    IsNull,
    IsNotNull,
    Compare(CompareOp, Scalar<'static>),
    Text(TextOp, String),
    /// Matches when the value equals any element. A null value never matches.
    In(Vec<Scalar<'static>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

pub fn lower(
    node: &Node,
    shape: RecordShape<'_>,
    aliases: Option<&FieldAliases>,
) -> QueryResult<Plan> {
    match node {
        Node::Binary { left, op, right } => {
            let left = Box::new(lower(left, shape, aliases)?);
            let right = Box::new(lower(right, shape, aliases)?);
            Ok(match op {
                LogicalOp::And => Plan::And(left, right),
                LogicalOp::Or => Plan::Or(left, right),
            })
        }
        Node::Not(operand) => Ok(Plan::Not(Box::new(lower(operand, shape, aliases)?))),
        Node::Comparison(comparison) => {
            lower_comparison(comparison, shape, aliases).map_err(|e| {
                let position = e.position.or(Some(comparison.position));
                e.with_position(position)
            })
        }
    }
}

fn lower_comparison(
    cmp: &Comparison,
    shape: RecordShape<'_>,
    aliases: Option<&FieldAliases>,
) -> QueryResult<Plan> {
    let chain = resolve(&cmp.field, shape, aliases)?;
    let ty = chain.final_type().clone();
    let nullable = chain.is_nullable();
    let field = chain.path();

    let test = |test: Test| Plan::Test {
        chain: chain.clone(),
        test,
    };

    match cmp.op {
        ComparisonOp::IsNull if !nullable => return Ok(Plan::Const(false)),
        ComparisonOp::IsNotNull if !nullable => return Ok(Plan::Const(true)),
        ComparisonOp::IsNull => return Ok(test(Test::IsNull)),
        ComparisonOp::IsNotNull => return Ok(test(Test::IsNotNull)),
        _ => {}
    }

    if let FieldType::Record(_) = ty {
        return match (cmp.op, single(cmp)?) {
            (ComparisonOp::Equal, Literal::Null) => Ok(test(Test::IsNull)),
            (ComparisonOp::NotEqual, Literal::Null) => Ok(test(Test::IsNotNull)),
            _ => Err(unsupported(cmp.op, &field, &ty)),
        };
    }

    if ty == FieldType::String {
        let allowed = matches!(cmp.op, ComparisonOp::Equal | ComparisonOp::NotEqual) || cmp.op.is_text();
        if !allowed {
            return Err(unsupported(cmp.op, &field, &ty));
        }
    } else if cmp.op.is_text() {
        return Err(QueryParseError::new(format!(
            "Operator '{}' requires a string field, but '{}' is of type {}",
            cmp.op, field, ty
        )));
    }

    if cmp.op.is_text() {
        let Literal::String(needle) = single(cmp)? else {
            return Err(QueryParseError::new(format!(
                "Operator '{}' on field '{}' requires a string value",
                cmp.op, field
            )));
        };
        let op = match cmp.op {
            ComparisonOp::Contains => TextOp::Contains,
            ComparisonOp::StartsWith => TextOp::StartsWith,
            _ => TextOp::EndsWith,
        };
        return Ok(test(Test::Text(op, needle.clone())));
    }

    if cmp.op == ComparisonOp::In {
        let Some(Value::List(items)) = &cmp.value else {
            return Err(QueryParseError::new(format!(
                "Operator 'in' on field '{}' requires a list of values",
                field
            )));
        };
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            if let Literal::Null = item {
                return Err(QueryParseError::new(format!(
                    "'in' cannot match null on field '{}', use 'is null' instead",
                    field
                )));
            }
            if let Some(value) = convert_value(item, &ty, false, &field)? {
                values.push(value);
            }
        }
        return Ok(test(Test::In(values)));
    }

    if cmp.op.is_ordering() && !ty.is_ordered() {
        return Err(unsupported(cmp.op, &field, &ty));
    }

    let op = match cmp.op {
        ComparisonOp::Equal => CompareOp::Eq,
        ComparisonOp::NotEqual => CompareOp::Ne,
        ComparisonOp::LessThan => CompareOp::Lt,
        ComparisonOp::LessThanOrEqual => CompareOp::Le,
        ComparisonOp::GreaterThan => CompareOp::Gt,
        ComparisonOp::GreaterThanOrEqual => CompareOp::Ge,
        other => unreachable!("operator {} handled above", other),
    };

    match convert_value(single(cmp)?, &ty, nullable, &field)? {
        Some(value) => Ok(test(Test::Compare(op, value))),
        None => Ok(match op {
            CompareOp::Eq => test(Test::IsNull),
            CompareOp::Ne => test(Test::IsNotNull),
            _ => Plan::Const(false),
        }),
    }
}

fn single(cmp: &Comparison) -> QueryResult<&Literal> {
    match &cmp.value {
        Some(Value::Scalar(literal)) => Ok(literal),
        _ => Err(QueryParseError::new(format!(
            "Operator '{}' on field '{}' requires a single value",
            cmp.op, cmp.field
        ))),
    }
}

fn unsupported(op: ComparisonOp, field: &str, ty: &FieldType) -> QueryParseError {
    QueryParseError::new(format!(
        "Operator '{}' is not supported for field '{}' of type {}",
        op, field, ty
    ))
}
