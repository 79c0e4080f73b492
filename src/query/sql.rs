use std::fmt::Write;

use super::plan::{CompareOp, Plan, Test, TextOp};
use super::resolve::AccessChain;
use crate::record::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<Scalar<'static>>,
}

impl SqlFilter {
    pub fn match_all() -> Self {
        Self {
            clause: "1 = 1".to_string(),
            params: Vec::new(),
        }
    }

    pub fn render(plan: &Plan) -> Self {
        let mut out = SqlFilter {
            clause: String::new(),
            params: Vec::new(),
        };
        out.write_plan(plan);
        out
    }

    fn write_plan(&mut self, plan: &Plan) {
        match plan {
            Plan::Const(true) => self.clause.push_str("1 = 1"),
            Plan::Const(false) => self.clause.push_str("1 = 0"),
            Plan::And(left, right) => self.write_binary(left, "AND", right),
            Plan::Or(left, right) => self.write_binary(left, "OR", right),
            Plan::Not(operand) => {
                self.clause.push_str("NOT (");
                self.write_plan(operand);
                self.clause.push(')');
            }
            Plan::Test { chain, test } => self.write_test(chain, test),
        }
    }

    fn write_binary(&mut self, left: &Plan, op: &str, right: &Plan) {
        self.clause.push('(');
        self.write_plan(left);
        let _ = write!(self.clause, " {} ", op);
        self.write_plan(right);
        self.clause.push(')');
    }

    fn write_test(&mut self, chain: &AccessChain, test: &Test) {
        let column = column(chain);
        // Keep tests two-valued: a NULL column yields FALSE, or TRUE for `<>`.
        let guarded = chain.may_be_null();
        match test {
            Test::IsNull => {
                let _ = write!(self.clause, "{} IS NULL", column);
            }
            Test::IsNotNull => {
                let _ = write!(self.clause, "{} IS NOT NULL", column);
            }
            Test::Compare(CompareOp::Ne, value) if guarded => {
                let _ = write!(self.clause, "({0} <> ? OR {0} IS NULL)", column);
                self.params.push(value.clone());
            }
            Test::Compare(op, value) => {
                let condition = format!("{} {} ?", column, sql_operator(*op));
                self.write_guarded(&column, &condition, guarded);
                self.params.push(value.clone());
            }
            Test::Text(op, needle) => {
                let escaped = escape_like(needle);
                let pattern = match op {
                    TextOp::Contains => format!("%{}%", escaped),
                    TextOp::StartsWith => format!("{}%", escaped),
                    TextOp::EndsWith => format!("%{}", escaped),
                };
                let condition = format!("{} LIKE ? ESCAPE '\\'", column);
                self.write_guarded(&column, &condition, guarded);
                self.params.push(Scalar::Text(pattern.into()));
            }
            Test::In(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                let condition = format!("{} IN ({})", column, placeholders);
                self.write_guarded(&column, &condition, guarded);
                self.params.extend(values.iter().cloned());
            }
        }
    }

    fn write_guarded(&mut self, column: &str, condition: &str, guarded: bool) {
        if guarded {
            let _ = write!(self.clause, "({} AND {} IS NOT NULL)", condition, column);
        } else {
            self.clause.push_str(condition);
        }
    }
}

// `"Mentor"."Age"`; joins that make these names resolvable are up to the caller.
fn column(chain: &AccessChain) -> String {
    chain
        .names()
        .map(|name| format!("\"{}\"", name.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn sql_operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
