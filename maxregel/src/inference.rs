//! Forward chaining: rules are applied in order, over and over, until an
//! iteration no longer adds anything.

use anyhow::Result;
use tracing::debug;

use crate::{
    config::{Convergence, InferenceConfig},
    error::{error, Error},
    fact_set::FactSet,
    rule::{Rule, RuleResult},
    session::Session,
    tracer::Tracer,
};

/// Runs `rules` over `facts` to a fixpoint and returns the derived facts.
pub fn infer(
    facts: &FactSet,
    rules: &[Rule],
    tracer: impl Tracer + 'static,
    config: InferenceConfig,
) -> Result<FactSet> {
    let mut session = Session::new(tracer);

    match config.convergence {
        Convergence::UpdateGrowth => {
            infer_update_growth(facts, rules, &mut session, config.max_iterations)
        }
        Convergence::PartDifference => {
            infer_part_difference(facts, rules, &mut session, config.max_iterations)
        }
    }
}

/// Accumulates the update of every rule application; an iteration is quiet
/// when the deduplicated accumulation did not grow.
pub fn infer_update_growth(
    facts: &FactSet,
    rules: &[Rule],
    session: &mut Session,
    max_iterations: usize,
) -> Result<FactSet> {
    let mut total = facts.clone();
    let mut update = FactSet::Empty;
    let mut last_size = 0;

    for iteration in 0..max_iterations {
        let mut changed = false;

        for rule in rules {
            let result = evaluate_reporting(rule, &total, session)?;

            total = result.total;
            update = update.union(&result.update).distinct();

            let size = update.size();
            changed |= size > last_size;
            last_size = size;
        }

        debug!(iteration, update_size = last_size, changed, "inference iteration");

        if !changed {
            return Ok(update);
        }
    }

    error(Error::MaxIterationsReached(max_iterations))
}

/// Tracks the parts of the running total that the input did not have; an
/// iteration is quiet when those stopped growing.
pub fn infer_part_difference(
    facts: &FactSet,
    rules: &[Rule],
    session: &mut Session,
    max_iterations: usize,
) -> Result<FactSet> {
    let mut total = facts.clone();
    let mut derived = FactSet::Empty;
    let mut last_size = 0;

    for iteration in 0..max_iterations {
        let mut changed = false;

        for rule in rules {
            total = evaluate_reporting(rule, &total, session)?.total;
            derived = total.part_difference(facts);

            let size = derived.size();
            changed |= size > last_size;
            last_size = size;
        }

        debug!(iteration, derived_size = last_size, changed, "inference iteration");

        if !changed {
            return Ok(derived);
        }
    }

    error(Error::MaxIterationsReached(max_iterations))
}

/// Evaluates a top-level rule, handing a failure to the tracer before
/// passing it on.
pub(crate) fn evaluate_reporting(
    rule: &Rule,
    facts: &FactSet,
    session: &mut Session,
) -> Result<RuleResult> {
    match rule.evaluate(facts, session) {
        Ok(result) => Ok(result),
        Err(err) => {
            session.tracer().except(&err, rule, facts);
            Err(err)
        }
    }
}
