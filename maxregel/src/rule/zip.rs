use anyhow::Result;
use paste::paste;

use super::Rule;
use crate::{
    ast::AstNode,
    error::{error, Error},
    fact::Fact,
    fact_set::{FactSet, SinglePart, DEFAULT_PART},
    predicate::CmpOp,
    session::Session,
    term::Term,
    value::Val,
};

/// Arithmetic on the first values of two facts, as doubles.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Pow,
}

impl ArithOp {
    pub const ALL: [ArithOp; 7] = [
        ArithOp::Add,
        ArithOp::Sub,
        ArithOp::Mul,
        ArithOp::Div,
        ArithOp::Max,
        ArithOp::Min,
        ArithOp::Pow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Max => "max",
            ArithOp::Min => "min",
            ArithOp::Pow => "pow",
        }
    }

    pub fn parse(op: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|arith| arith.name() == op)
    }

    pub fn eval(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Max => a.max(b),
            ArithOp::Min => a.min(b),
            ArithOp::Pow => a.powf(b),
        }
    }
}

/// How a pair of facts is combined.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ZipOp {
    /// The union of both terms; `b` wins on shared fields.
    Merge,
    Arithmetic { op: ArithOp, result_field: String },
    Compare { op: CmpOp, result_field: String },
}

impl ZipOp {
    pub fn name(&self) -> &'static str {
        match self {
            ZipOp::Merge => "merge",
            ZipOp::Arithmetic { op, .. } => op.name(),
            ZipOp::Compare { .. } => "compare",
        }
    }

    pub fn apply(&self, a: &Fact, b: &Fact) -> Fact {
        match self {
            ZipOp::Merge => Fact::new(a.term().union(b.term())),
            ZipOp::Arithmetic { op, result_field } => {
                let x = op.eval(first_f64(a), first_f64(b));

                Fact::new(Term::new([(result_field.as_str(), Val::f64(x))]))
            }
            ZipOp::Compare { op, result_field } => {
                let x = a.term().first().cloned().unwrap_or_default();
                let y = b.term().first().cloned().unwrap_or_default();

                Fact::new(Term::new([(result_field.as_str(), op.test(Some(&x), &y))]))
            }
        }
    }
}

fn first_f64(fact: &Fact) -> f64 {
    fact.term()
        .first()
        .and_then(Val::as_f64)
        .unwrap_or(f64::NAN)
}

/// Combines the facts of two selections pairwise, by position. The longer
/// selection is cut off.
#[derive(Clone, Debug)]
pub struct Zip {
    op: ZipOp,
    a: Box<Rule>,
    b: Box<Rule>,
}

macro_rules! arithmetic_zip {
    ($($op:ident),*) => {
        paste! {
            $(
                pub fn [< $op:lower >](result_field: impl Into<String>, a: Rule, b: Rule) -> Self {
                    Self::arithmetic(ArithOp::$op, result_field, a, b)
                }
            )*
        }
    };
}

impl Zip {
    pub fn new(op: ZipOp, a: Rule, b: Rule) -> Self {
        Self {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn merge(a: Rule, b: Rule) -> Self {
        Self::new(ZipOp::Merge, a, b)
    }

    pub fn arithmetic(op: ArithOp, result_field: impl Into<String>, a: Rule, b: Rule) -> Self {
        Self::new(
            ZipOp::Arithmetic {
                op,
                result_field: result_field.into(),
            },
            a,
            b,
        )
    }

    arithmetic_zip!(Add, Sub, Mul, Div, Max, Min, Pow);

    pub fn compare(result_field: impl Into<String>, op: CmpOp, a: Rule, b: Rule) -> Self {
        Self::new(
            ZipOp::Compare {
                op,
                result_field: result_field.into(),
            },
            a,
            b,
        )
    }

    pub fn op(&self) -> &ZipOp {
        &self.op
    }

    pub(super) fn apply(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        let a = self.a.apply_in(facts, session)?;
        let b = self.b.apply_in(facts, session)?;

        let zipped = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| self.op.apply(&x, &y))
            .collect();

        Ok(SinglePart::new(DEFAULT_PART, zipped).into())
    }

    pub(super) fn ast(&self) -> AstNode {
        let a = self.a.ast().into();
        let b = self.b.ast().into();

        match &self.op {
            ZipOp::Merge => AstNode::leaf("merge", [a, b]),
            ZipOp::Arithmetic { op, result_field } => {
                AstNode::leaf(op.name(), [result_field.as_str().into(), a, b])
            }
            ZipOp::Compare { op, result_field } => AstNode::leaf(
                "compare",
                [result_field.as_str().into(), op.symbol().into(), a, b],
            ),
        }
    }

    pub(super) fn parse(node: &AstNode) -> Result<Self> {
        match node.op() {
            "merge" => Ok(Self::merge(
                Rule::parse(node.node_arg(0)?)?,
                Rule::parse(node.node_arg(1)?)?,
            )),
            "compare" => Ok(Self::compare(
                node.str_arg(0)?,
                CmpOp::parse(&node.str_arg(1)?)?,
                Rule::parse(node.node_arg(2)?)?,
                Rule::parse(node.node_arg(3)?)?,
            )),
            op => match ArithOp::parse(op) {
                Some(arith) => Ok(Self::arithmetic(
                    arith,
                    node.str_arg(0)?,
                    Rule::parse(node.node_arg(1)?)?,
                    Rule::parse(node.node_arg(2)?)?,
                )),
                None => error(Error::UnsupportedRule(op.to_owned())),
            },
        }
    }
}

/// Inner join of two selections on the string form of a field.
#[derive(Clone, Debug)]
pub struct Join {
    a: Box<Rule>,
    b: Box<Rule>,
    field_a: String,
    field_b: String,
}

impl Join {
    pub fn new(a: Rule, b: Rule, field_a: impl Into<String>, field_b: impl Into<String>) -> Self {
        Self {
            a: Box::new(a),
            b: Box::new(b),
            field_a: field_a.into(),
            field_b: field_b.into(),
        }
    }

    pub(super) fn apply(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        let a = self.a.apply_in(facts, session)?;
        let b = self.b.apply_in(facts, session)?;

        Ok(a.join_on_field(&b, &self.field_a, &self.field_b))
    }

    pub(super) fn ast(&self) -> AstNode {
        AstNode::leaf(
            "join",
            [
                self.a.ast().into(),
                self.b.ast().into(),
                self.field_a.as_str().into(),
                self.field_b.as_str().into(),
            ],
        )
    }

    pub(super) fn parse(node: &AstNode) -> Result<Self> {
        Ok(Self::new(
            Rule::parse(node.node_arg(0)?)?,
            Rule::parse(node.node_arg(1)?)?,
            node.str_arg(2)?,
            node.str_arg(3)?,
        ))
    }
}
