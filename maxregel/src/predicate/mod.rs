//! Boolean tests over facts and fact sets.

use std::{
    hash::{Hash, Hasher},
    ops::Not,
};

use anyhow::Result;

use crate::{
    ast::{Arg, AstNode},
    error::{error, Error},
    fact::Fact,
    fact_set::FactSet,
    value::Val,
};

mod comparator;

pub use comparator::{CmpOp, Comparator, Operand};
pub(crate) use comparator::values_equal;

/// A test over one fact.
#[derive(Clone, Debug)]
pub enum Predicate {
    Compare(Comparator),
    /// The field value occurs in a list, or is a substring of a string.
    FieldIn { field: String, values: Val },
    /// The field holds a list containing `value`, or a string containing it.
    FieldContains { field: String, value: Val },
    /// The field is missing, null, an empty string or an empty list.
    FieldEmpty { field: String },
    True,
    False,
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

macro_rules! comparator_constructors {
    ($($name:ident => $op:ident),* $(,)?) => {
        paste::item! {
            $(
                pub fn [< field_ $name >](field: impl Into<String>, y: impl Into<Operand>) -> Self {
                    Self::Compare(Comparator::new(CmpOp::$op, field, y))
                }
            )*
        }
    };
}

impl Predicate {
    comparator_constructors! {
        eq => Eq,
        neq => Neq,
        gt => Gt,
        geq => Geq,
        lt => Lt,
        leq => Leq,
    }

    /// A comparator from an operator name or symbol such as `">="`.
    pub fn compare(field: impl Into<String>, op: &str, y: impl Into<Operand>) -> Result<Self> {
        Ok(Self::Compare(Comparator::new(CmpOp::parse(op)?, field, y)))
    }

    pub fn field_in(field: impl Into<String>, values: impl Into<Val>) -> Self {
        Self::FieldIn {
            field: field.into(),
            values: values.into(),
        }
    }

    pub fn field_contains(field: impl Into<String>, value: impl Into<Val>) -> Self {
        Self::FieldContains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_empty(field: impl Into<String>) -> Self {
        Self::FieldEmpty {
            field: field.into(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Conjunction of all `predicates`, `True` when there are none.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        predicates.into_iter().fold(Self::True, Self::and)
    }

    /// Disjunction of all `predicates`, `False` when there are none.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        predicates.into_iter().fold(Self::False, Self::or)
    }

    /// `(field, value)` when this is an equality test against a constant.
    pub fn as_field_eq(&self) -> Option<(&str, &Val)> {
        match self {
            Predicate::Compare(cmp) if cmp.op() == CmpOp::Eq => {
                cmp.value().map(|value| (cmp.field(), value))
            }
            _ => None,
        }
    }

    pub fn test(&self, fact: &Fact) -> Result<bool> {
        match self {
            Predicate::Compare(cmp) => cmp.test(fact),
            Predicate::FieldIn { field, values } => Ok(match fact.get(field) {
                None | Some(Val::Null) => false,
                Some(x) => match values {
                    Val::List(ys) => ys.iter().any(|y| values_equal(x, y)),
                    ys => ys.key_string().contains(&x.key_string()),
                },
            }),
            Predicate::FieldContains { field, value } => Ok(match fact.get(field) {
                None | Some(Val::Null) => false,
                Some(Val::List(xs)) => xs.iter().any(|x| values_equal(x, value)),
                Some(x) => x.key_string().contains(&value.key_string()),
            }),
            Predicate::FieldEmpty { field } => Ok(match fact.get(field) {
                None | Some(Val::Null) => true,
                Some(Val::String(s)) => s.is_empty(),
                Some(Val::List(xs)) => xs.is_empty(),
                Some(_) => false,
            }),
            Predicate::True => Ok(true),
            Predicate::False => Ok(false),
            Predicate::Not(p) => Ok(!p.test(fact)?),
            Predicate::And(a, b) => Ok(a.test(fact)? && b.test(fact)?),
            Predicate::Or(a, b) => Ok(a.test(fact)? || b.test(fact)?),
        }
    }

    /// Resolves every rule-valued comparand against `data`.
    pub fn bind(&self, data: &FactSet) -> Result<Self> {
        Ok(match self {
            Predicate::Compare(cmp) => Predicate::Compare(cmp.bind(data)?),
            Predicate::Not(p) => !p.bind(data)?,
            Predicate::And(a, b) => a.bind(data)?.and(b.bind(data)?),
            Predicate::Or(a, b) => a.bind(data)?.or(b.bind(data)?),
            other => other.clone(),
        })
    }

    pub fn ast(&self) -> AstNode {
        match self {
            Predicate::Compare(cmp) => cmp.ast(),
            Predicate::FieldIn { field, values } => AstNode::leaf(
                "field_in",
                [field.as_str().into(), values.clone().into()],
            ),
            Predicate::FieldContains { field, value } => AstNode::leaf(
                "field_contains",
                [field.as_str().into(), value.clone().into()],
            ),
            Predicate::FieldEmpty { field } => AstNode::leaf("field_empty", [field.as_str().into()]),
            Predicate::True => AstNode::leaf("true", []),
            Predicate::False => AstNode::leaf("false", []),
            Predicate::Not(p) => AstNode::leaf("not", [p.ast().into()]),
            Predicate::And(a, b) => AstNode::leaf("and", [a.ast().into(), b.ast().into()]),
            Predicate::Or(a, b) => AstNode::leaf("or", [a.ast().into(), b.ast().into()]),
        }
    }

    pub fn parse(node: &AstNode) -> Result<Self> {
        Ok(match node.op() {
            "field_in" | "in" => Self::field_in(node.str_arg(0)?, node.val_arg(1)?.clone()),
            "field_contains" => Self::field_contains(node.str_arg(0)?, node.val_arg(1)?.clone()),
            "field_empty" => Self::field_empty(node.str_arg(0)?),
            "true" => Self::True,
            "false" => Self::False,
            "not" | "!" => !Self::parse(node.node_arg(0)?)?,
            "and" | "&" => Self::parse(node.node_arg(0)?)?.and(Self::parse(node.node_arg(1)?)?),
            "or" | "|" => Self::parse(node.node_arg(0)?)?.or(Self::parse(node.node_arg(1)?)?),
            op => match CmpOp::parse(op) {
                Ok(cmp) => Self::Compare(Comparator::parse(cmp, node)?),
                Err(_) => return error(Error::UnsupportedPredicate(op.to_owned())),
            },
        })
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}

impl From<Comparator> for Predicate {
    fn from(cmp: Comparator) -> Self {
        Predicate::Compare(cmp)
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.ast() == other.ast()
    }
}

impl Eq for Predicate {}

impl Hash for Predicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ast().hash(state)
    }
}

/// A test over a whole fact set.
#[derive(Clone, Debug)]
pub enum FactSetPredicate {
    /// The set is non-empty.
    Exists,
    Any(Predicate),
    All(Predicate),
    /// The set is non-empty and its first fact satisfies the predicate.
    First(Predicate),
    True,
    False,
    Not(Box<FactSetPredicate>),
    And(Box<FactSetPredicate>, Box<FactSetPredicate>),
    Or(Box<FactSetPredicate>, Box<FactSetPredicate>),
}

impl FactSetPredicate {
    pub fn and(self, other: FactSetPredicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: FactSetPredicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    pub fn test(&self, facts: &FactSet) -> Result<bool> {
        match self {
            FactSetPredicate::Exists => Ok(!facts.is_empty()),
            FactSetPredicate::Any(p) => facts.any(p),
            FactSetPredicate::All(p) => facts.all(p),
            FactSetPredicate::First(p) => match facts.first() {
                Some(fact) => p.test(&fact),
                None => Ok(false),
            },
            FactSetPredicate::True => Ok(true),
            FactSetPredicate::False => Ok(false),
            FactSetPredicate::Not(p) => Ok(!p.test(facts)?),
            FactSetPredicate::And(a, b) => Ok(a.test(facts)? && b.test(facts)?),
            FactSetPredicate::Or(a, b) => Ok(a.test(facts)? || b.test(facts)?),
        }
    }

    pub fn bind(&self, data: &FactSet) -> Result<Self> {
        Ok(match self {
            FactSetPredicate::Any(p) => FactSetPredicate::Any(p.bind(data)?),
            FactSetPredicate::All(p) => FactSetPredicate::All(p.bind(data)?),
            FactSetPredicate::First(p) => FactSetPredicate::First(p.bind(data)?),
            FactSetPredicate::Not(p) => !p.bind(data)?,
            FactSetPredicate::And(a, b) => a.bind(data)?.and(b.bind(data)?),
            FactSetPredicate::Or(a, b) => a.bind(data)?.or(b.bind(data)?),
            other => other.clone(),
        })
    }

    pub fn ast(&self) -> AstNode {
        match self {
            FactSetPredicate::Exists => AstNode::leaf("exists", []),
            FactSetPredicate::Any(p) => AstNode::leaf("any", [p.ast().into()]),
            FactSetPredicate::All(p) => AstNode::leaf("all", [p.ast().into()]),
            FactSetPredicate::First(p) => AstNode::leaf("as_factset_predicate", [p.ast().into()]),
            FactSetPredicate::True => AstNode::leaf("true", []),
            FactSetPredicate::False => AstNode::leaf("false", []),
            FactSetPredicate::Not(p) => AstNode::leaf("not", [p.ast().into()]),
            FactSetPredicate::And(a, b) => AstNode::leaf("and", [a.ast().into(), b.ast().into()]),
            FactSetPredicate::Or(a, b) => AstNode::leaf("or", [a.ast().into(), b.ast().into()]),
        }
    }

    pub fn parse(node: &AstNode) -> Result<Self> {
        Ok(match node.op() {
            "exists" => Self::Exists,
            "any" => Self::Any(Predicate::parse(node.node_arg(0)?)?),
            "all" => Self::All(Predicate::parse(node.node_arg(0)?)?),
            "as_factset_predicate" => Self::First(Predicate::parse(node.node_arg(0)?)?),
            "true" => Self::True,
            "false" => Self::False,
            "not" | "!" => !Self::parse(node.node_arg(0)?)?,
            "and" | "&" => Self::parse(node.node_arg(0)?)?.and(Self::parse(node.node_arg(1)?)?),
            "or" | "|" => Self::parse(node.node_arg(0)?)?.or(Self::parse(node.node_arg(1)?)?),
            op => return error(Error::UnsupportedPredicate(op.to_owned())),
        })
    }
}

impl Not for FactSetPredicate {
    type Output = FactSetPredicate;

    fn not(self) -> Self::Output {
        FactSetPredicate::Not(Box::new(self))
    }
}

impl PartialEq for FactSetPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.ast() == other.ast()
    }
}

impl Eq for FactSetPredicate {}

impl Hash for FactSetPredicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ast().hash(state)
    }
}

impl From<Predicate> for Arg {
    fn from(predicate: Predicate) -> Self {
        Arg::Node(predicate.ast())
    }
}
