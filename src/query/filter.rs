//! Module implement the filter language over document bodies.

use crate::{db::Value, Error, Result};

const OPERATORS: [&str; 9] = [
    "eq", "ne", "gt", "gte", "lt", "lte", "in", "nin", "exists",
];

fn is_operator(key: &str) -> bool {
    OPERATORS.iter().any(|op| *op == key)
}

/// Single operator applied to a field's value. Comparisons use the
/// total value order; `ne` and `nin` also match documents missing the
/// field, the comparison operators never do.
#[derive(Clone, Debug)]
pub enum Cond {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl Cond {
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Cond::Eq(v) => value.map_or(false, |x| x == v),
            Cond::Ne(v) => value.map_or(true, |x| x != v),
            Cond::Gt(v) => value.map_or(false, |x| x > v),
            Cond::Gte(v) => value.map_or(false, |x| x >= v),
            Cond::Lt(v) => value.map_or(false, |x| x < v),
            Cond::Lte(v) => value.map_or(false, |x| x <= v),
            Cond::In(vs) => value.map_or(false, |x| vs.iter().any(|v| v == x)),
            Cond::Nin(vs) => value.map_or(true, |x| !vs.iter().any(|v| v == x)),
            Cond::Exists(b) => value.is_some() == *b,
        }
    }
}

/// Top-level clause within a filter.
#[derive(Clone, Debug)]
pub enum Clause {
    Field { field: String, conds: Vec<Cond> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Clause {
    pub fn matches(&self, body: &Value) -> bool {
        match self {
            Clause::Field { field, conds } => {
                let value = body.get(field);
                conds.iter().all(|cond| cond.matches(value))
            }
            Clause::And(filters) => filters.iter().all(|f| f.matches(body)),
            Clause::Or(filters) => filters.iter().any(|f| f.matches(body)),
            Clause::Not(filter) => !filter.matches(body),
        }
    }
}

/// Parsed filter, a conjunction of clauses in declaration order. The
/// empty filter matches every document.
#[derive(Clone, Debug)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Parse a filter document. Malformed shapes and unsupported
    /// operators fail with `InvalidQuery`.
    pub fn parse(filter: &Value) -> Result<Filter> {
        let props = match filter {
            Value::Object(props) => props,
            _ => err_at!(InvalidQuery, msg: "filter must be an object, got {}", filter)?,
        };

        let mut clauses = vec![];
        for prop in props.iter() {
            let clause = match prop.key.as_str() {
                "and" => Clause::And(Self::parse_list("and", &prop.value)?),
                "or" => Clause::Or(Self::parse_list("or", &prop.value)?),
                "not" => Clause::Not(Box::new(Filter::parse(&prop.value)?)),
                field => Clause::Field {
                    field: field.to_string(),
                    conds: Self::parse_criterion(field, &prop.value)?,
                },
            };
            clauses.push(clause);
        }
        Ok(Filter { clauses })
    }

    fn parse_list(op: &str, value: &Value) -> Result<Vec<Filter>> {
        match value {
            Value::Array(items) if !items.is_empty() => {
                let mut filters = vec![];
                for item in items.iter() {
                    filters.push(Filter::parse(item)?);
                }
                Ok(filters)
            }
            _ => err_at!(InvalidQuery, msg: "{} expects a non-empty array", op),
        }
    }

    // an object whose keys are all operators is an operator map, any
    // other value is a literal equality criterion; mixing the two is
    // malformed.
    fn parse_criterion(field: &str, value: &Value) -> Result<Vec<Cond>> {
        match value {
            Value::Object(props)
                if !props.is_empty() && props.iter().all(|p| is_operator(&p.key)) =>
            {
                let mut conds = vec![];
                for prop in props.iter() {
                    conds.push(Self::parse_cond(field, &prop.key, &prop.value)?);
                }
                Ok(conds)
            }
            Value::Object(props) if props.iter().any(|p| is_operator(&p.key)) => {
                err_at!(
                    InvalidQuery,
                    msg: "field {} mixes operators and literals", field
                )
            }
            _ => Ok(vec![Cond::Eq(value.clone())]),
        }
    }

    fn parse_cond(field: &str, op: &str, operand: &Value) -> Result<Cond> {
        let cond = match op {
            "eq" => Cond::Eq(operand.clone()),
            "ne" => Cond::Ne(operand.clone()),
            "gt" => Cond::Gt(operand.clone()),
            "gte" => Cond::Gte(operand.clone()),
            "lt" => Cond::Lt(operand.clone()),
            "lte" => Cond::Lte(operand.clone()),
            "in" => match operand {
                Value::Array(vs) => Cond::In(vs.clone()),
                _ => err_at!(InvalidQuery, msg: "field {} in expects an array", field)?,
            },
            "nin" => match operand {
                Value::Array(vs) => Cond::Nin(vs.clone()),
                _ => err_at!(InvalidQuery, msg: "field {} nin expects an array", field)?,
            },
            "exists" => match operand {
                Value::Bool(b) => Cond::Exists(*b),
                _ => err_at!(InvalidQuery, msg: "field {} exists expects a bool", field)?,
            },
            _ => err_at!(InvalidQuery, msg: "field {} unsupported operator {}", field, op)?,
        };
        Ok(cond)
    }

    /// Evaluate this filter against a document body, the residual
    /// predicate of the execution pipeline.
    pub fn matches(&self, body: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(body))
    }

    /// Top-level clauses, in declaration order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
