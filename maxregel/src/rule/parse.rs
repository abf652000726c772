use anyhow::Result;

use super::{
    AggregateBy, AggregateKind, ArithOp, Assign, AssignKind, Case, FactSetCase, Join, ReturnIf,
    Rule, Zip,
};
use crate::{
    ast::AstNode,
    error::{error, Error},
    predicate::{FactSetPredicate, Predicate},
};

impl Rule {
    /// Rebuilds a rule from its AST. Every operator [`Rule::ast`] produces
    /// is accepted, plus the `=` and `+=` aliases for assignments.
    pub fn parse(node: &AstNode) -> Result<Rule> {
        let sub = |i: usize| -> Result<Box<Rule>> { Ok(Box::new(Rule::parse(node.node_arg(i)?)?)) };

        Ok(match node.op() {
            "identity" => Rule::Identity,
            "from" => Rule::From(node.str_arg(0)?),
            "const" => Rule::Const(node.facts_arg(0)?.clone()),
            "filter" => Rule::Filter {
                select: sub(0)?,
                predicate: Predicate::parse(node.node_arg(1)?)?,
            },
            "concat" => Rule::Concat(sub(0)?, sub(1)?),
            "then" => Rule::Then(sub(0)?, sub(1)?),
            "script" => Rule::Script(
                (0..node.args().len())
                    .map(|i| Rule::parse(node.node_arg(i)?))
                    .collect::<Result<_>>()?,
            ),
            "case" => Rule::Case(Case::parse(node)?),
            "factsetcase" => Rule::FactSetCase(FactSetCase::parse(node)?),
            "returnif" => Rule::ReturnIf(ReturnIf::parse(node)?),
            "aggregate_by" => Rule::AggregateBy(AggregateBy::parse(node)?),
            "count" => Rule::Count {
                select: sub(0)?,
                variable: node.str_arg(1)?,
            },
            "merge" | "compare" => Rule::Zip(Zip::parse(node)?),
            "join" => Rule::Join(Join::parse(node)?),
            "assert" => Rule::Assert {
                select: sub(0)?,
                predicate: FactSetPredicate::parse(node.node_arg(1)?)?,
            },
            "limit" => Rule::Limit {
                select: sub(0)?,
                n: match node.val_arg(1)?.as_f64() {
                    Some(n) if n >= 0.0 => n as usize,
                    _ => return error(node.malformed("limit is not a non-negative number")),
                },
            },
            "sort" => Rule::Sort {
                select: sub(0)?,
                field: node.str_arg(1)?,
                descending: node.val_arg(2)?.as_bool().unwrap_or(false),
            },
            "remove" => Rule::Remove(node.str_arg(0)?),
            "set_part" => Rule::SetPart(node.str_arg(0)?),
            "select" => Rule::SelectFields {
                select: sub(0)?,
                fields: node.strings_arg(1)?,
            },
            "name_prefix" => Rule::NamePrefix {
                select: sub(0)?,
                prefix: node.str_arg(1)?,
            },
            "flatmap" => Rule::FlatMap {
                select: sub(0)?,
                transform: sub(1)?,
            },
            "consolidate" => Rule::Consolidate,
            "allEqual" => Rule::AllEqual {
                select: sub(0)?,
                field: node.str_arg(1)?,
            },
            "cached" => Rule::Cached(sub(0)?),
            "once" => Rule::Once(sub(0)?),
            "add_fact_info" => Rule::AddFactInfo {
                select: sub(0)?,
                info: node.info().clone(),
            },
            "rename_field" => Rule::RenameField {
                select: sub(0)?,
                old: node.str_arg(1)?,
                new: node.str_arg(2)?,
            },
            "print" => Rule::Print {
                select: sub(0)?,
                message: node.str_arg(1)?,
            },
            op => {
                if AssignKind::parse(op).is_some() {
                    Rule::Assign(Assign::parse(node)?)
                } else if let Some(kind) = AggregateKind::parse(op) {
                    Rule::Aggregate {
                        kind,
                        select: sub(0)?,
                    }
                } else if ArithOp::parse(op).is_some() {
                    Rule::Zip(Zip::parse(node)?)
                } else {
                    return error(Error::UnsupportedRule(op.to_owned()));
                }
            }
        })
    }
}
