//! Backward chaining: only the assignments needed for the requested goals
//! are evaluated. A `from` of a missing part evaluates the assignment that
//! defines it, at the moment the `from` itself is evaluated, so parts read
//! only by branches that are not taken are never derived.

use anyhow::Result;
use tracing::debug;

use crate::{
    config::BackwardConfig,
    error::{error, Error},
    fact_set::FactSet,
    inference::evaluate_reporting,
    rule::{Assign, Rule},
    session::Session,
    tracer::Tracer,
};

/// The single defining assignment of every variable in a script, plus the
/// epoch budget of one resolution run.
#[derive(Debug)]
pub struct AssignmentStructure {
    definitions: im::OrdMap<String, Assign>,
    max_epochs: usize,
    epoch: usize,
}

impl AssignmentStructure {
    /// Collects the assignments of `script`, which may be a single rule.
    /// Wildcard assignments and variables assigned twice are rejected.
    pub fn new(script: &Rule, config: BackwardConfig) -> Result<Self> {
        let rules = match script {
            Rule::Script(rules) => rules.as_slice(),
            rule => std::slice::from_ref(rule),
        };

        let mut definitions = im::OrdMap::new();

        for rule in rules {
            if let Rule::Assign(assign) = rule {
                if assign.is_wildcard() {
                    return error(Error::WildcardBackwardChaining);
                }

                if definitions.contains_key(assign.variable()) {
                    return error(Error::DuplicateDefinition(assign.variable().to_owned()));
                }

                definitions.insert(assign.variable().to_owned(), assign.clone());
            }
        }

        Ok(Self {
            definitions,
            max_epochs: config.max_epochs,
            epoch: 0,
        })
    }

    pub fn get(&self, variable: &str) -> Option<&Assign> {
        self.definitions.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn exceeded(&self) -> bool {
        self.epoch >= self.max_epochs
    }

    pub fn increment_epoch(&mut self) -> Result<()> {
        self.epoch += 1;

        if self.epoch > self.max_epochs {
            return error(Error::EpochBudgetExceeded(self.max_epochs));
        }

        Ok(())
    }
}

/// Derives every goal missing from `facts` and returns the accumulated
/// total, the input included.
pub fn resolve<S: AsRef<str>>(
    facts: &FactSet,
    script: &Rule,
    goals: &[S],
    tracer: impl Tracer + 'static,
    config: BackwardConfig,
) -> Result<FactSet> {
    let backward = Backward {
        structure: AssignmentStructure::new(script, config)?,
        total: facts.clone(),
    };
    let mut session = Session::new(tracer).with_backward(backward);

    for goal in goals {
        resolve_part(goal.as_ref(), &mut session)?;
    }

    Ok(session
        .backward()
        .map(|backward| backward.total.clone())
        .unwrap_or_else(|| facts.clone()))
}

/// The state of one backward chaining run, kept in its [`Session`].
#[derive(Debug)]
pub(crate) struct Backward {
    structure: AssignmentStructure,
    /// Everything known so far: the input plus every resolved part.
    total: FactSet,
}

/// The facts of `part` in the running total, evaluating its defining
/// assignment first when the part is missing. Outside backward chaining
/// a missing part is simply empty.
pub(crate) fn resolve_part(part: &str, session: &mut Session) -> Result<FactSet> {
    let (assign, total) = match session.backward() {
        None => return Ok(FactSet::Empty),
        Some(backward) if backward.total.has(part) => return Ok(backward.total.get(part)),
        Some(backward) => {
            backward.structure.increment_epoch()?;

            match backward.structure.get(part) {
                Some(assign) => {
                    debug!(goal = part, epoch = backward.structure.epoch(), "resolving goal");

                    (assign.clone(), backward.total.clone())
                }
                None => {
                    debug!(goal = part, "no assignment defines goal");

                    return Ok(FactSet::Empty);
                }
            }
        }
    };

    let result = evaluate_reporting(&Rule::Assign(assign), &total, session)?;

    match session.backward() {
        Some(backward) => {
            // Parts resolved while the assignment ran are not in its total.
            backward.total = result
                .total
                .union(&backward.total.part_difference(&result.total));

            Ok(backward.total.get(part))
        }
        None => Ok(result.total.get(part)),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        rule::{
            build::{any_then, append, cnst, fact_set_case, filter_by, filter_part, from, let_, script},
            Zip,
        },
        term,
        test_utils::simpsons,
        tracer::{AssignmentNameTracer, NoTracer},
        value::Val,
    };

    fn chain() -> Rule {
        script([
            let_("a", from("input")),
            let_("b", from("input")),
            let_("c", from("a")),
        ])
    }

    fn input() -> FactSet {
        FactSet::cnst("x", 1).set_part("input")
    }

    #[test]
    fn test_resolves_only_what_the_goal_needs() -> Result<()> {
        let total = resolve(&input(), &chain(), &["c"], NoTracer, BackwardConfig::default())?;

        assert!(total.has("input"));
        assert!(total.has("a"));
        assert!(total.has("c"));
        assert!(!total.has("b"));

        Ok(())
    }

    #[test]
    fn test_untaken_branches_are_not_resolved() -> Result<()> {
        let rules = script([
            let_("b", from("input")),
            let_(
                "c",
                fact_set_case(vec![any_then(from("switch"), from("input"))], from("b")),
            ),
        ]);

        let switched = input().union(&FactSet::cnst("on", true).set_part("switch"));
        let total = resolve(&switched, &rules, &["c"], NoTracer, BackwardConfig::default())?;

        assert!(total.has("c"));
        assert!(!total.has("b"));

        let total = resolve(&input(), &rules, &["c"], NoTracer, BackwardConfig::default())?;

        assert!(total.has("c"));
        assert!(total.has("b"));

        Ok(())
    }

    #[test]
    fn test_merged_constants_resolve_minimally() -> Result<()> {
        let merge = |part: &str, field: &str, value: i32| {
            Rule::Zip(Zip::merge(from(part), cnst(FactSet::cnst(field, value))))
        };
        let rules = script([
            let_("B", merge("C", "b", 2)),
            let_("C", merge("A", "c", 3)),
            let_("D", from("A")),
        ]);
        let facts = FactSet::from_terms("A", [term! {"a" => 1}]);

        let total = resolve(&facts, &rules, &["C"], NoTracer, BackwardConfig::default())?;

        assert!(total.has("A"));
        assert!(total.has("C"));
        assert!(!total.has("B"));
        assert!(!total.has("D"));
        assert_eq!(
            total.get("C").first().map(|fact| fact.term().clone()),
            Some(term! {"a" => 1, "c" => 3})
        );

        let total = resolve(&facts, &rules, &["B"], NoTracer, BackwardConfig::default())?;

        assert!(total.has("A"));
        assert!(total.has("B"));
        assert!(total.has("C"));
        assert!(!total.has("D"));
        assert_eq!(
            total.get("B").first().map(|fact| fact.term().clone()),
            Some(term! {"a" => 1, "c" => 3, "b" => 2})
        );

        Ok(())
    }

    #[test]
    fn test_present_goals_are_left_alone() -> Result<()> {
        let facts = input().union(&FactSet::cnst("y", 2).set_part("c"));
        let total = resolve(&facts, &chain(), &["c"], NoTracer, BackwardConfig::default())?;

        assert_eq!(total, facts);

        Ok(())
    }

    #[test]
    fn test_santa_backwards() -> Result<()> {
        let rules = script([
            let_(
                "old_males",
                filter_part("simpsons", "gender", "==", "male")?.then(filter_by("age", ">", 40)?),
            ),
            let_(
                "santa_candidates",
                filter_part("old_males", "hair", "==", "middle")?,
            ),
        ]);

        let total = resolve(
            &simpsons(),
            &rules,
            &["santa_candidates"],
            AssignmentNameTracer,
            BackwardConfig::default(),
        )?;

        let santa = total.get("santa_candidates");

        assert_eq!(santa.field_values("name"), vec![Val::from("Krusty")]);
        let rule_names: Vec<Val> = santa
            .first()
            .map(|fact| {
                fact.rules()
                    .iter()
                    .filter_map(|rule| rule.info().get("rule_name").cloned())
                    .collect()
            })
            .unwrap_or_default();

        assert!(rule_names.contains(&Val::from("santa_candidates")));

        Ok(())
    }

    #[test]
    fn test_epoch_budget() -> Result<()> {
        let structure_err = |config| {
            resolve(&input(), &chain(), &["c"], NoTracer, config)
                .unwrap_err()
                .downcast_ref::<Error>()
                .cloned()
        };

        assert_eq!(
            structure_err(BackwardConfig::default().with_max_epochs(1)),
            Some(Error::EpochBudgetExceeded(1))
        );
        assert!(resolve(
            &input(),
            &chain(),
            &["c"],
            NoTracer,
            BackwardConfig::default().with_max_epochs(2)
        )
        .is_ok());

        let cyclic = script([let_("p", from("q")), let_("q", from("p"))]);
        let err = resolve(&input(), &cyclic, &["p"], NoTracer, BackwardConfig::default())
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::EpochBudgetExceeded(100))
        );

        Ok(())
    }

    #[test]
    fn test_rejected_structures() {
        let wildcard = script([let_("*", from("input"))]);
        let duplicate = script([let_("a", from("input")), append("a", from("input"))]);

        let err = |rule: &Rule| {
            AssignmentStructure::new(rule, BackwardConfig::default())
                .unwrap_err()
                .downcast_ref::<Error>()
                .cloned()
        };

        assert_eq!(err(&wildcard), Some(Error::WildcardBackwardChaining));
        assert_eq!(err(&duplicate), Some(Error::DuplicateDefinition("a".to_owned())));
    }

    #[test]
    fn test_structure_lookup() -> Result<()> {
        let mut structure = AssignmentStructure::new(&chain(), BackwardConfig::default())?;

        assert_eq!(structure.variables().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(structure.get("c").map(|a| a.variable()), Some("c"));
        assert!(structure.get("input").is_none());

        structure.increment_epoch()?;
        assert_eq!(structure.epoch(), 1);
        assert!(!structure.exceeded());

        Ok(())
    }
}
