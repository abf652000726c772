use std::{cmp::Ordering, collections::HashMap};

use anyhow::Result;

use super::Rule;
use crate::{
    ast::{Arg, AstNode},
    error::{error, Error},
    fact::Fact,
    fact_set::{FactSet, SinglePart, DEFAULT_PART},
    session::Session,
    term::Term,
    value::Val,
};

/// Reductions over the first value of every fact.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 4] = [
        AggregateKind::Count,
        AggregateKind::Sum,
        AggregateKind::Min,
        AggregateKind::Max,
    ];

    pub fn op(self) -> &'static str {
        match self {
            AggregateKind::Count => "aggregate_count",
            AggregateKind::Sum => "aggregate_sum",
            AggregateKind::Min => "aggregate_min",
            AggregateKind::Max => "aggregate_max",
        }
    }

    pub fn parse(op: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.op() == op)
    }

    /// Folds `new` into the running result. Nulls are skipped.
    pub fn step(self, cur: Option<Val>, new: Val) -> Option<Val> {
        if new.is_null() {
            return cur;
        }

        let cur = match cur {
            Some(cur) => cur,
            None => return Some(new),
        };

        Some(match self {
            AggregateKind::Count => cur,
            AggregateKind::Sum => match (cur.as_f64(), new.as_f64()) {
                (Some(a), Some(b)) => Val::f64(a + b),
                _ => Val::f64(f64::NAN),
            },
            AggregateKind::Min => match cur.compare(&new) {
                Some(Ordering::Greater) => new,
                _ => cur,
            },
            AggregateKind::Max => match cur.compare(&new) {
                Some(Ordering::Less) => new,
                _ => cur,
            },
        })
    }

    /// The aggregate of `facts`, null when there is nothing to aggregate.
    pub fn aggregate(self, facts: &FactSet) -> Val {
        match self {
            AggregateKind::Count => facts.size().into(),
            // A lone value is a sum of one: report it as a double.
            AggregateKind::Sum => first_values(facts)
                .fold(None, |cur, v| self.step(cur, v))
                .map(|v| v.as_f64().map_or(Val::f64(f64::NAN), Val::f64))
                .unwrap_or_default(),
            _ => first_values(facts)
                .fold(None, |cur, v| self.step(cur, v))
                .unwrap_or_default(),
        }
    }

    /// A single fact, `{<op>: aggregate}`, in the default part.
    pub fn apply(self, facts: &FactSet) -> FactSet {
        FactSet::terms([Term::new([(self.op(), self.aggregate(facts))])])
    }
}

fn first_values(facts: &FactSet) -> impl Iterator<Item = Val> + '_ {
    facts
        .iter()
        .map(|fact| fact.term().first().cloned().unwrap_or_default())
}

/// Aggregates `value_field` per distinct combination of `group_fields`.
#[derive(Clone, Debug)]
pub struct AggregateBy {
    select: Box<Rule>,
    group_fields: Vec<String>,
    value_field: String,
    kind: AggregateKind,
}

impl AggregateBy {
    pub fn new<S: AsRef<str>>(
        select: Rule,
        group_fields: &[S],
        value_field: impl Into<String>,
        kind: AggregateKind,
    ) -> Self {
        Self {
            select: Box::new(select),
            group_fields: group_fields.iter().map(|f| f.as_ref().to_owned()).collect(),
            value_field: value_field.into(),
            kind,
        }
    }

    pub fn group_fields(&self) -> &[String] {
        &self.group_fields
    }

    pub fn value_field(&self) -> &str {
        &self.value_field
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    /// Output field name, e.g. `aggregate_max_age`.
    pub fn output_field(&self) -> String {
        format!("{}_{}", self.kind.op(), self.value_field)
    }

    pub(super) fn apply(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        let selection = self.select.apply_in(facts, session)?;

        let mut keys: Vec<Term> = Vec::new();
        let mut groups: HashMap<Term, Vec<Fact>> = HashMap::new();

        for fact in selection.iter() {
            let key = fact.term().pick(&self.group_fields);
            let value = fact.term().pick(&[self.value_field.as_str()]);

            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    keys.push(key);
                    Vec::new()
                })
                .push(fact.with_term(value));
        }

        let output_field = self.output_field();
        let result = keys
            .into_iter()
            .filter_map(|key| {
                let group = groups.remove(&key)?;
                let x = self.kind.aggregate(&SinglePart::new(DEFAULT_PART, group).into());

                Some(Fact::new(key.with(output_field.as_str(), x)))
            })
            .collect();

        Ok(SinglePart::new(DEFAULT_PART, result).into())
    }

    pub(super) fn ast(&self) -> AstNode {
        AstNode::leaf(
            "aggregate_by",
            [
                self.select.ast().into(),
                Arg::strings(&self.group_fields),
                self.value_field.as_str().into(),
                AstNode::leaf(self.kind.op(), [Rule::Identity.ast().into()]).into(),
            ],
        )
    }

    pub(super) fn parse(node: &AstNode) -> Result<Self> {
        let aggregate = node.node_arg(3)?;

        let kind = match AggregateKind::parse(aggregate.op()) {
            Some(kind) => kind,
            None => return error(Error::UnsupportedRule(aggregate.op().to_owned())),
        };

        Ok(Self::new(
            Rule::parse(node.node_arg(0)?)?,
            &node.strings_arg(1)?,
            node.str_arg(2)?,
            kind,
        ))
    }
}
