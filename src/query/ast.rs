use std::fmt;

use bigdecimal::BigDecimal;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Binary {
        left: Box<Node>,
        op: LogicalOp,
        right: Box<Node>,
    },
    Not(Box<Node>),
    Comparison(Comparison),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A single `path op value` test.
///
/// `value` is `None` only for `IsNull`/`IsNotNull` and a `Value::List` only for `In`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub op: ComparisonOp,
    pub value: Option<Value>,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    In,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(BigDecimal),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Literal),
    List(Vec<Literal>),
}

impl Node {
    pub fn and(left: Node, right: Node) -> Self {
        Node::Binary {
            left: Box::new(left),
            op: LogicalOp::And,
            right: Box::new(right),
        }
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Binary {
            left: Box::new(left),
            op: LogicalOp::Or,
            right: Box::new(right),
        }
    }

    pub fn negate(operand: Node) -> Self {
        Node::Not(Box::new(operand))
    }
}

impl ComparisonOp {
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            ComparisonOp::LessThan
                | ComparisonOp::LessThanOrEqual
                | ComparisonOp::GreaterThan
                | ComparisonOp::GreaterThanOrEqual
        )
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            ComparisonOp::Contains | ComparisonOp::StartsWith | ComparisonOp::EndsWith
        )
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
            ComparisonOp::Contains => "contains",
            ComparisonOp::StartsWith => "startsWith",
            ComparisonOp::EndsWith => "endsWith",
            ComparisonOp::In => "in",
            ComparisonOp::IsNull => "is null",
            ComparisonOp::IsNotNull => "is not null",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Number(n) => write!(f, "{}", n.to_plain_string()),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}
