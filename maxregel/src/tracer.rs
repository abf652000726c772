//! Provenance bookkeeping on derived facts.

use std::fmt::Debug;

use tracing::warn;

use crate::{
    ast::{Arg, AstNode},
    fact_set::FactSet,
    pretty::Pretty,
    rule::Rule,
    value::Info,
};

/// Called with the facts a rule contributed, right after it was applied.
pub trait Tracer: Debug {
    fn apply(&self, rule: &Rule, new_facts: &FactSet);

    /// Called when evaluating `rule` on `facts` failed.
    fn except(&self, err: &anyhow::Error, rule: &Rule, facts: &FactSet) {
        warn!(
            error = %err,
            parts = ?facts.parts(),
            "rule failed:\n{}",
            rule.to_pretty(80)
        );
    }
}

/// Leaves facts untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTracer;

impl Tracer for NoTracer {
    fn apply(&self, _rule: &Rule, _new_facts: &FactSet) {}
}

/// Records every rule on the facts it produced.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullTracer;

impl Tracer for FullTracer {
    fn apply(&self, rule: &Rule, new_facts: &FactSet) {
        let ast = rule.ast();

        for fact in new_facts.iter() {
            fact.add_rule(ast.clone());
            fact.increment_epoch();
        }
    }
}

/// Records assignments only, without their nested rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssignmentTracer;

impl Tracer for AssignmentTracer {
    fn apply(&self, rule: &Rule, new_facts: &FactSet) {
        let simplified = rule.is_assignment().then(|| {
            let ast = rule.ast();
            let args = ast
                .args()
                .iter()
                .filter(|arg| !arg.is_node())
                .cloned()
                .collect::<Vec<Arg>>();

            AstNode::new(ast.op(), ast.info().clone(), args)
        });

        for fact in new_facts.iter() {
            if let Some(simplified) = &simplified {
                fact.add_rule_once(simplified.clone());
            }

            fact.increment_epoch();
        }
    }
}

/// Records only the name of the variable an assignment defined.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssignmentNameTracer;

impl Tracer for AssignmentNameTracer {
    fn apply(&self, rule: &Rule, new_facts: &FactSet) {
        let named = match rule {
            Rule::Assign(assign) => Some(AstNode::new(
                rule.op(),
                Info::unit("rule_name".to_owned(), assign.variable().into()),
                [],
            )),
            _ => None,
        };

        for fact in new_facts.iter() {
            if let Some(named) = &named {
                fact.add_rule_once(named.clone());
            }

            fact.increment_epoch();
        }
    }
}
