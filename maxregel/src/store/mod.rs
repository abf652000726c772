//! External tables exposed as fact sets.

use std::fmt::Debug;

use anyhow::Result;
use as_any::AsAny;

use crate::{
    error::{error, Error},
    predicate::{CmpOp, Comparator, Predicate},
    term::Term,
    value::Val,
};

pub mod memory;

/// A source of rows, organized in named tables.
pub trait FactStore: Debug + Send + Sync + AsAny + 'static {
    fn tables(&self) -> Vec<String>;

    /// Number of rows in `table` passing `restriction`.
    fn count(&self, table: &str, restriction: Option<&Restriction>) -> usize;

    /// Rows of `table` passing `restriction`.
    fn select(&self, table: &str, restriction: Option<&Restriction>) -> Vec<Term>;
}

/// A row filter pushed down to a store, both as an SQL `WHERE` clause and
/// as the predicate it was translated from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Restriction {
    sql: String,
    predicate: Predicate,
}

impl Restriction {
    pub fn new(predicate: Predicate) -> Result<Self> {
        Ok(Self {
            sql: to_sql(&predicate)?,
            predicate,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Both restrictions at once.
    pub fn and(&self, other: &Restriction) -> Self {
        Self {
            sql: format!("{} AND {}", self.sql, other.sql),
            predicate: self.predicate.clone().and(other.predicate.clone()),
        }
    }
}

/// Translates a bound predicate into an SQL condition.
pub fn to_sql(predicate: &Predicate) -> Result<String> {
    match predicate {
        Predicate::Not(p) => Ok(format!("NOT ({})", to_sql(p)?)),
        Predicate::And(a, b) => Ok(format!("{} AND {}", to_sql(a)?, to_sql(b)?)),
        Predicate::Or(a, b) => Ok(format!("({} OR {})", to_sql(a)?, to_sql(b)?)),
        Predicate::Compare(cmp) => compare_to_sql(cmp),
        other => error(Error::UnsupportedOperation(other.ast().op().to_owned())),
    }
}

fn compare_to_sql(cmp: &Comparator) -> Result<String> {
    let value = match cmp.value() {
        Some(value) => sql_value(value)?,
        None => return error(Error::UnboundDynamicValue(cmp.ast().to_string())),
    };

    let op = match cmp.op() {
        CmpOp::Eq => "=",
        CmpOp::Neq => "<>",
        CmpOp::Gt => ">",
        CmpOp::Geq => ">=",
        CmpOp::Lt => "<",
        CmpOp::Leq => "<=",
    };

    Ok(format!("(\"{}\" {op} {value})", cmp.field()))
}

fn sql_value(value: &Val) -> Result<String> {
    match value {
        Val::Null => Ok("NULL".to_owned()),
        Val::Bool(_) | Val::S32(_) | Val::S64(_) | Val::F64(_) => Ok(value.to_string()),
        Val::String(s) => Ok(format!("'{}'", escape(s))),
        Val::List(_) => error(Error::UnsupportedOperation(format!(
            "list value {value} in SQL condition"
        ))),
    }
}

fn escape(s: &str) -> String {
    s.replace(['\r', '\n'], " ").replace('\'', "''")
}
