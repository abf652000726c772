use std::{cmp::Ordering, fmt, sync::Arc};

use anyhow::Result;
use ordered_float::OrderedFloat;

use crate::{
    ast::{Arg, AstNode},
    error::{error, Error},
    fact::Fact,
    fact_set::FactSet,
    rule::Rule,
    value::Val,
};

/// Field comparison operators.
///
/// Numbers compare as doubles whatever their width. Values that cannot be
/// ordered against each other (null, or a number against a string) match
/// no operator at all, `Neq` included.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CmpOp {
    Eq,
    Neq,
    Gt,
    Geq,
    Lt,
    Leq,
}

impl CmpOp {
    pub const ALL: [CmpOp; 6] = [
        CmpOp::Eq,
        CmpOp::Neq,
        CmpOp::Gt,
        CmpOp::Geq,
        CmpOp::Lt,
        CmpOp::Leq,
    ];

    /// The AST operator name.
    pub fn name(self) -> &'static str {
        match self {
            CmpOp::Eq => "field_eq",
            CmpOp::Neq => "field_neq",
            CmpOp::Gt => "field_gt",
            CmpOp::Geq => "field_geq",
            CmpOp::Lt => "field_lt",
            CmpOp::Leq => "field_leq",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
            CmpOp::Gt => ">",
            CmpOp::Geq => ">=",
            CmpOp::Lt => "<",
            CmpOp::Leq => "<=",
        }
    }

    /// Accepts both operator names and symbols.
    pub fn parse(op: &str) -> Result<Self> {
        match Self::ALL
            .into_iter()
            .find(|cmp| cmp.name() == op || cmp.symbol() == op)
        {
            Some(cmp) => Ok(cmp),
            None => error(Error::UnsupportedPredicate(op.to_owned())),
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering.is_eq(),
            CmpOp::Neq => ordering.is_ne(),
            CmpOp::Gt => ordering.is_gt(),
            CmpOp::Geq => ordering.is_ge(),
            CmpOp::Lt => ordering.is_lt(),
            CmpOp::Leq => ordering.is_le(),
        }
    }

    /// Compares a field value `x` to `y`. A missing or null `x` never matches,
    /// and neither does an `x` that is incomparable to `y`.
    pub fn test(self, x: Option<&Val>, y: &Val) -> bool {
        let x = match x {
            Some(x) if !x.is_null() => x,
            _ => return false,
        };

        match self {
            CmpOp::Eq => values_equal(x, y),
            _ => x.compare(y).map_or(false, |ordering| self.holds(ordering)),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Equality where numbers of any width compare as doubles.
pub(crate) fn values_equal(x: &Val, y: &Val) -> bool {
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => OrderedFloat(x) == OrderedFloat(y),
        _ => x == y,
    }
}

/// The right-hand side of a comparator.
#[derive(Clone, Debug)]
pub enum Operand {
    Value(Val),
    /// Evaluated against the data handed to `bind`.
    Rule(Arc<Rule>),
}

impl Operand {
    fn to_arg(&self) -> Arg {
        match self {
            Operand::Value(v) => Arg::Val(v.clone()),
            Operand::Rule(rule) => Arg::Node(rule.ast()),
        }
    }
}

impl From<Rule> for Operand {
    fn from(rule: Rule) -> Self {
        Operand::Rule(Arc::new(rule))
    }
}

macro_rules! operand_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Operand {
                fn from(value: $t) -> Self {
                    Operand::Value(value.into())
                }
            }
        )*
    };
}

operand_from!(Val, bool, i32, i64, f64, usize, &str, String);

#[derive(Clone, Debug)]
pub struct Comparator {
    op: CmpOp,
    field: String,
    y: Operand,
}

impl Comparator {
    pub fn new(op: CmpOp, field: impl Into<String>, y: impl Into<Operand>) -> Self {
        Self {
            op,
            field: field.into(),
            y: y.into(),
        }
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn y(&self) -> &Operand {
        &self.y
    }

    /// The constant right-hand side, if it is not a rule.
    pub fn value(&self) -> Option<&Val> {
        match &self.y {
            Operand::Value(v) => Some(v),
            Operand::Rule(_) => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.y, Operand::Value(_))
    }

    pub fn test(&self, fact: &Fact) -> Result<bool> {
        match &self.y {
            Operand::Value(y) => Ok(self.op.test(fact.get(&self.field), y)),
            Operand::Rule(_) => error(Error::UnboundDynamicValue(self.ast().to_string())),
        }
    }

    /// Replaces a rule right-hand side by the first value it yields on `data`.
    pub fn bind(&self, data: &FactSet) -> Result<Self> {
        match &self.y {
            Operand::Value(_) => Ok(self.clone()),
            Operand::Rule(rule) => {
                let y = rule.apply(data)?.value().unwrap_or_default();

                Ok(Self::new(self.op, self.field.clone(), y))
            }
        }
    }

    pub fn ast(&self) -> AstNode {
        AstNode::leaf(
            self.op.name(),
            [self.field.as_str().into(), self.y.to_arg()],
        )
    }

    pub(crate) fn parse(op: CmpOp, node: &AstNode) -> Result<Self> {
        let field = node.str_arg(0)?;
        let y = match node.arg(1)? {
            Arg::Val(v) => Operand::Value(v.clone()),
            Arg::Node(rule) => Rule::parse(rule)?.into(),
            other => return error(node.malformed(format!("unexpected comparand {other}"))),
        };

        Ok(Self::new(op, field, y))
    }
}
