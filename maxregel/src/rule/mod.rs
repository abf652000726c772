//! Fact set transformations.
//!
//! Every [`Rule`] renders to an [`AstNode`], which is also the basis of rule
//! equality and hashing, and [`Rule::parse`] turns such a node back into a
//! rule.

use std::{
    cmp::Ordering,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use anyhow::Result;
use tracing::{info, trace};

use crate::{
    assignment::resolve_part,
    ast::{Arg, AstNode},
    error::{error, Error},
    fact_set::{Concat, FactOperation, FactSet, MultiPart, SinglePart, DEFAULT_PART},
    predicate::{values_equal, FactSetPredicate, Predicate},
    pretty::Pretty,
    session::Session,
    term,
    value::{Info, Val},
};

mod aggregate;
pub mod analysis;
mod assign;
mod branch;
pub mod build;
mod parse;
mod zip;

pub use aggregate::{AggregateBy, AggregateKind};
pub use assign::{Assign, AssignKind, WILDCARD};
pub use branch::{Case, CaseEntry, FactSetCase, FactSetCaseEntry, ReturnIf};
pub use zip::{ArithOp, Join, Zip, ZipOp};

/// The outcome of a traced evaluation.
#[derive(Clone, Debug)]
pub struct RuleResult {
    /// The facts this rule newly contributed.
    pub update: FactSet,
    /// Everything to feed into the next rule.
    pub total: FactSet,
}

impl RuleResult {
    pub fn new(update: FactSet, total: FactSet) -> Self {
        Self { update, total }
    }
}

#[derive(Clone, Debug)]
pub enum Rule {
    Identity,
    From(String),
    Const(FactSet),
    Filter {
        select: Box<Rule>,
        predicate: Predicate,
    },
    Concat(Box<Rule>, Box<Rule>),
    Then(Box<Rule>, Box<Rule>),
    Script(Vec<Rule>),
    Assign(Assign),
    Case(Case),
    FactSetCase(FactSetCase),
    ReturnIf(ReturnIf),
    Aggregate {
        kind: AggregateKind,
        select: Box<Rule>,
    },
    AggregateBy(AggregateBy),
    Count {
        select: Box<Rule>,
        variable: String,
    },
    Zip(Zip),
    Join(Join),
    Assert {
        select: Box<Rule>,
        predicate: FactSetPredicate,
    },
    Limit {
        select: Box<Rule>,
        n: usize,
    },
    Sort {
        select: Box<Rule>,
        field: String,
        descending: bool,
    },
    Remove(String),
    SetPart(String),
    SelectFields {
        select: Box<Rule>,
        fields: Vec<String>,
    },
    NamePrefix {
        select: Box<Rule>,
        prefix: String,
    },
    FlatMap {
        select: Box<Rule>,
        transform: Box<Rule>,
    },
    Consolidate,
    AllEqual {
        select: Box<Rule>,
        field: String,
    },
    /// Evaluates the wrapped rule once per session and replays the result.
    Cached(Box<Rule>),
    /// Evaluates the wrapped rule the first time only; afterwards yields nothing.
    Once(Box<Rule>),
    AddFactInfo {
        select: Box<Rule>,
        info: Info,
    },
    RenameField {
        select: Box<Rule>,
        old: String,
        new: String,
    },
    Print {
        select: Box<Rule>,
        message: String,
    },
}

impl Rule {
    /// `self` followed by `next`.
    pub fn then(self, next: Rule) -> Rule {
        Rule::Then(Box::new(self), Box::new(next))
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Rule::Identity)
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self, Rule::Assign(_))
    }

    pub fn op(&self) -> &'static str {
        match self {
            Rule::Identity => "identity",
            Rule::From(_) => "from",
            Rule::Const(_) => "const",
            Rule::Filter { .. } => "filter",
            Rule::Concat(..) => "concat",
            Rule::Then(..) => "then",
            Rule::Script(_) => "script",
            Rule::Assign(assign) => assign.kind().op(),
            Rule::Case(_) => "case",
            Rule::FactSetCase(_) => "factsetcase",
            Rule::ReturnIf(_) => "returnif",
            Rule::Aggregate { kind, .. } => kind.op(),
            Rule::AggregateBy(_) => "aggregate_by",
            Rule::Count { .. } => "count",
            Rule::Zip(zip) => zip.op().name(),
            Rule::Join(_) => "join",
            Rule::Assert { .. } => "assert",
            Rule::Limit { .. } => "limit",
            Rule::Sort { .. } => "sort",
            Rule::Remove(_) => "remove",
            Rule::SetPart(_) => "set_part",
            Rule::SelectFields { .. } => "select",
            Rule::NamePrefix { .. } => "name_prefix",
            Rule::FlatMap { .. } => "flatmap",
            Rule::Consolidate => "consolidate",
            Rule::AllEqual { .. } => "allEqual",
            Rule::Cached(_) => "cached",
            Rule::Once(_) => "once",
            Rule::AddFactInfo { .. } => "add_fact_info",
            Rule::RenameField { .. } => "rename_field",
            Rule::Print { .. } => "print",
        }
    }

    /// Metadata carried in the AST. Only assignments carry any.
    pub fn info(&self) -> Info {
        match self {
            Rule::Assign(assign) => assign.info().clone(),
            Rule::AddFactInfo { info, .. } => info.clone(),
            _ => Info::default(),
        }
    }

    pub fn ast(&self) -> AstNode {
        let op = self.op();

        match self {
            Rule::Identity | Rule::Consolidate => AstNode::leaf(op, []),
            Rule::From(part) | Rule::Remove(part) | Rule::SetPart(part) => {
                AstNode::leaf(op, [part.as_str().into()])
            }
            Rule::Const(facts) => AstNode::leaf(op, [facts.clone().into()]),
            Rule::Filter { select, predicate } => {
                AstNode::leaf(op, [select.ast().into(), predicate.ast().into()])
            }
            Rule::Concat(a, b) | Rule::Then(a, b) => AstNode::leaf(op, [a.ast().into(), b.ast().into()]),
            Rule::Script(rules) => AstNode::leaf(op, rules.iter().map(|r| r.ast().into())),
            Rule::Assign(assign) => assign.ast(),
            Rule::Case(case) => case.ast(),
            Rule::FactSetCase(case) => case.ast(),
            Rule::ReturnIf(ri) => ri.ast(),
            Rule::Aggregate { select, .. } | Rule::Cached(select) | Rule::Once(select) => {
                AstNode::leaf(op, [select.ast().into()])
            }
            Rule::AggregateBy(by) => by.ast(),
            Rule::Count { select, variable } => {
                AstNode::leaf(op, [select.ast().into(), variable.as_str().into()])
            }
            Rule::Zip(zip) => zip.ast(),
            Rule::Join(join) => join.ast(),
            Rule::Assert { select, predicate } => {
                AstNode::leaf(op, [select.ast().into(), predicate.ast().into()])
            }
            Rule::Limit { select, n } => AstNode::leaf(op, [select.ast().into(), Val::from(*n).into()]),
            Rule::Sort {
                select,
                field,
                descending,
            } => AstNode::leaf(
                op,
                [
                    select.ast().into(),
                    field.as_str().into(),
                    Val::Bool(*descending).into(),
                ],
            ),
            Rule::SelectFields { select, fields } => {
                AstNode::leaf(op, [select.ast().into(), Arg::strings(fields)])
            }
            Rule::NamePrefix { select, prefix } => {
                AstNode::leaf(op, [select.ast().into(), prefix.as_str().into()])
            }
            Rule::FlatMap { select, transform } => {
                AstNode::leaf(op, [select.ast().into(), transform.ast().into()])
            }
            Rule::AllEqual { select, field } => {
                AstNode::leaf(op, [select.ast().into(), field.as_str().into()])
            }
            Rule::AddFactInfo { select, info } => AstNode::new(op, info.clone(), [select.ast().into()]),
            Rule::RenameField { select, old, new } => AstNode::leaf(
                op,
                [select.ast().into(), old.as_str().into(), new.as_str().into()],
            ),
            Rule::Print { select, message } => {
                AstNode::leaf(op, [select.ast().into(), message.as_str().into()])
            }
        }
    }

    /// Applies this rule with a fresh, untraced session.
    pub fn apply(&self, facts: &FactSet) -> Result<FactSet> {
        self.apply_in(facts, &mut Session::default())
    }

    /// Applies this rule, sharing memoized state with other rules in `session`.
    pub fn apply_in(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        trace!(op = self.op(), "applying rule");

        match self {
            Rule::Identity => Ok(facts.clone()),
            Rule::From(part) if facts.has(part) => Ok(facts.get(part)),
            Rule::From(part) => resolve_part(part, session),
            Rule::Const(constant) => Ok(constant.clone()),
            Rule::Filter { select, predicate } => {
                let predicate = predicate.bind(facts)?;

                select.apply_in(facts, session)?.filter(&predicate)
            }
            Rule::Concat(a, b) => {
                let a = a.apply_in(facts, session)?;

                if a.is_empty() {
                    return b.apply_in(facts, session);
                }

                let b = b.apply_in(facts, session)?;

                if b.is_empty() {
                    return Ok(a);
                }

                Ok(Concat::new(a, b).into())
            }
            Rule::Then(a, b) => apply_sequence(&[a, b], facts, session),
            Rule::Script(rules) => apply_sequence(rules, facts, session),
            Rule::Assign(assign) => assign.apply(facts, session),
            Rule::Case(case) => case.apply(facts, session),
            Rule::FactSetCase(case) => case.apply(facts, session),
            Rule::ReturnIf(ri) => ri.apply(facts, session),
            Rule::Aggregate { kind, select } => Ok(kind.apply(&select.apply_in(facts, session)?)),
            Rule::AggregateBy(by) => by.apply(facts, session),
            Rule::Count { select, variable } => {
                let size = select.apply_in(facts, session)?.size();

                Ok(FactSet::terms([term! {variable.as_str() => size}]))
            }
            Rule::Zip(zip) => zip.apply(facts, session),
            Rule::Join(join) => join.apply(facts, session),
            Rule::Assert { select, predicate } => {
                let selection = select.apply_in(facts, session)?;

                if !predicate.bind(facts)?.test(&selection)? {
                    return error(Error::AssertionFailed(predicate.ast().to_string()));
                }

                Ok(FactSet::Empty)
            }
            Rule::Limit { select, n } => {
                let selection = select.apply_in(facts, session)?;

                Ok(SinglePart::new(DEFAULT_PART, selection.iter().take(*n).collect()).into())
            }
            Rule::Sort {
                select,
                field,
                descending,
            } => {
                let mut sorted = select.apply_in(facts, session)?.facts();

                sorted.sort_by(|a, b| match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) if !x.is_null() && !y.is_null() => {
                        let ordering = x.compare(y).unwrap_or(Ordering::Equal);

                        if *descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    }
                    (Some(x), _) if !x.is_null() => Ordering::Less,
                    (_, Some(y)) if !y.is_null() => Ordering::Greater,
                    _ => Ordering::Equal,
                });

                Ok(SinglePart::new(DEFAULT_PART, sorted).into())
            }
            Rule::Remove(part) => Ok(facts.remove(part)),
            Rule::SetPart(name) => Ok(facts.set_part(name)),
            Rule::SelectFields { select, fields } => Ok(select
                .apply_in(facts, session)?
                .add_fact_operation(&FactOperation::select_fields(fields))),
            Rule::NamePrefix { select, prefix } => {
                let selection = select.apply_in(facts, session)?;

                Ok(MultiPart::from_named(selection.parts().into_iter().map(|part| {
                    let name = format!("{prefix}{part}");
                    let renamed = selection.get(&part).set_part(&name);

                    (name.into(), renamed)
                }))
                .into())
            }
            Rule::FlatMap { select, transform } => {
                let selection = select.apply_in(facts, session)?;
                let mut result = Vec::new();

                for fact in selection.iter() {
                    let single = FactSet::from_facts(DEFAULT_PART, [fact]);
                    result.extend(transform.apply_in(&single, session)?.iter());
                }

                Ok(SinglePart::new(DEFAULT_PART, result).into())
            }
            Rule::Consolidate => Ok(facts.consolidate()),
            Rule::AllEqual { select, field } => {
                let selection = select.apply_in(facts, session)?;
                let mut values = selection
                    .iter()
                    .map(|fact| fact.get(field).cloned().unwrap_or_default());

                let all_equal = match values.next() {
                    Some(first) => values.all(|value| {
                        (first.is_null() && value.is_null()) || values_equal(&first, &value)
                    }),
                    None => true,
                };

                Ok(FactSet::terms([term! {"allEqual" => all_equal}]))
            }
            Rule::Cached(rule) => {
                let key = rule.ast();

                if let Some(cached) = session.cached(&key) {
                    return Ok(cached);
                }

                let result = rule.apply_in(facts, session)?;
                session.cache(key, result.clone());

                Ok(result)
            }
            Rule::Once(rule) => {
                if session.fire(rule.ast()) {
                    rule.apply_in(facts, session)
                } else {
                    Ok(FactSet::Empty)
                }
            }
            Rule::AddFactInfo { select, info } => Ok(select
                .apply_in(facts, session)?
                .add_fact_operation(&FactOperation::add_fact_info(info.clone()))),
            Rule::RenameField { select, old, new } => Ok(select
                .apply_in(facts, session)?
                .add_fact_operation(&FactOperation::rename_field(old.as_str(), new.as_str()))),
            Rule::Print { select, message } => {
                let selection = select.apply_in(facts, session)?;
                info!(label = message.as_str(), "\n{}", selection.to_pretty(80));

                Ok(facts.clone())
            }
        }
    }

    /// Applies this rule and reports the facts it contributed separately
    /// from the total to continue with. The session's tracer sees every
    /// rule application.
    pub fn evaluate(&self, facts: &FactSet, session: &mut Session) -> Result<RuleResult> {
        match self {
            Rule::Then(a, b) => evaluate_sequence(&[a, b], facts, session),
            Rule::Script(rules) => evaluate_sequence(rules, facts, session),
            Rule::Assign(assign) => assign.evaluate(self, facts, session),
            Rule::ReturnIf(ri) => ri.evaluate(facts, session),
            _ => {
                let update = self.apply_in(facts, session)?;
                session.tracer().apply(self, &update);

                Ok(RuleResult::new(update, facts.clone()))
            }
        }
    }
}

/// Threads `facts` through `rules`, as the right-nested chain
/// `then(r1, then(r2, .. identity))` would.
fn apply_sequence<R: AsRef<Rule>>(rules: &[R], facts: &FactSet, session: &mut Session) -> Result<FactSet> {
    let mut facts = facts.clone();
    let mut rest = rules;

    while let Some((first, tail)) = rest.split_first() {
        let rule = first.as_ref();
        rest = tail;

        if rule.is_identity() {
            continue;
        }

        if let Rule::ReturnIf(ri) = rule {
            if ri.condition(&facts, session)? {
                return ri.result(&facts, session);
            }

            continue;
        }

        facts = rule.apply_in(&facts, session)?;
    }

    Ok(facts)
}

/// The traced counterpart of [`apply_sequence`]. Updates accumulate; the
/// total of each rule feeds the next one.
fn evaluate_sequence<R: AsRef<Rule>>(
    rules: &[R],
    facts: &FactSet,
    session: &mut Session,
) -> Result<RuleResult> {
    let mut total = facts.clone();
    let mut update = FactSet::Empty;
    let mut rest = rules;

    while let Some((first, tail)) = rest.split_first() {
        let rule = first.as_ref();
        rest = tail;

        if rule.is_identity() {
            continue;
        }

        if let Rule::ReturnIf(ri) = rule {
            if ri.condition(&total, session)? {
                let result = ri.result(&total, session)?;

                return Ok(RuleResult::new(update, result));
            }

            continue;
        }

        let result = rule.evaluate(&total, session)?;
        update = update.union(&result.update);
        total = result.total;
    }

    Ok(RuleResult::new(update, total))
}

impl AsRef<Rule> for Rule {
    fn as_ref(&self) -> &Rule {
        self
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule::Identity
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.ast() == other.ast()
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ast().hash(state)
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.ast(), f)
    }
}

impl From<Rule> for Arg {
    fn from(rule: Rule) -> Self {
        Arg::Node(rule.ast())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::{build::*, *};
    use crate::{
        fact::Fact,
        predicate::CmpOp,
        test_utils::simpsons,
        tracer::AssignmentTracer,
    };

    fn input() -> FactSet {
        FactSet::from_terms("input", [term! {"x" => 1}])
    }

    fn doubled() -> Rule {
        arithmetic(ArithOp::Add, "y", from("input"), from("input"))
    }

    #[test]
    fn test_set_part_and_remove() -> Result<()> {
        let a = FactSet::from_terms("a", [term! {"x" => 1}]);
        let b = FactSet::from_terms("b", [term! {"y" => 2}]);
        let facts = a.union(&b);

        let renamed = Rule::SetPart("c".to_owned()).apply(&facts)?;

        assert_eq!(renamed.parts(), vec!["c"]);
        assert_eq!(renamed.size(), 2);

        assert_eq!(Rule::Remove("a".to_owned()).apply(&facts)?, b);
        assert_eq!(Rule::Remove("b".to_owned()).apply(&facts)?, a);
        assert_eq!(Rule::Remove("c".to_owned()).apply(&facts)?, facts);

        Ok(())
    }

    #[test]
    fn test_assign_set() -> Result<()> {
        let rule = let_("output", doubled());
        let expected = input().union(&FactSet::from_terms("output", [term! {"y" => 2.0}]));

        assert_eq!(rule.apply(&input())?, expected);

        let mut session = Session::new(AssignmentTracer);
        let result = rule.evaluate(&input(), &mut session)?;

        assert_eq!(result.total, expected);
        assert_eq!(result.update, result.total.remove("input"));

        Ok(())
    }

    #[test]
    fn test_assign_set_wildcard() -> Result<()> {
        let rule = let_("*", doubled().then(Rule::SetPart("output".to_owned())));
        let expected = input().union(&FactSet::from_terms("output", [term! {"y" => 2.0}]));

        let output = rule.apply(&input())?;

        assert_eq!(output, expected);
        assert!(output.has("input"));
        assert!(output.has("output"));

        let mut session = Session::new(AssignmentTracer);
        let result = rule.evaluate(&input(), &mut session)?;

        assert_eq!(result.total, expected);
        assert!(!result.update.has("input"));
        assert!(result.update.has("output"));
        assert_eq!(result.update, result.total.remove("input"));

        Ok(())
    }

    #[test]
    fn test_assign_set_replaces_and_assign_update_appends() -> Result<()> {
        let set = let_("out", doubled());
        let twice = set.apply(&set.apply(&input())?)?;

        assert_eq!(twice.get("out").size(), 1);
        assert_eq!(twice.get("out"), FactSet::from_terms("out", [term! {"y" => 2.0}]));

        let update = append("out", doubled());
        let twice = update.apply(&update.apply(&input())?)?;

        assert_eq!(twice.get("out").size(), 2);
        assert!(twice.get("out").all(&Predicate::field_eq("y", 2.0))?);

        let mut session = Session::new(AssignmentTracer);
        let result = update.evaluate(&input(), &mut session)?;

        assert_eq!(result.update, result.total.remove("input"));

        Ok(())
    }

    #[test]
    fn test_sort() -> Result<()> {
        let facts = FactSet::terms([
            term! {"name" => "Charlie", "amount" => 42},
            term! {"name" => "Alice", "amount" => 7},
            term! {"name" => Val::Null, "amount" => 15},
            term! {"name" => "Bob", "amount" => 15},
        ]);

        let names = |rule: Rule| -> Result<Vec<Val>> {
            Ok(rule.apply(&facts)?.field_values("name"))
        };
        let sort = |field: &str, descending| Rule::Sort {
            select: Box::new(Rule::Identity),
            field: field.to_owned(),
            descending,
        };

        assert_eq!(
            names(sort("name", false))?,
            vec!["Alice".into(), "Bob".into(), "Charlie".into(), Val::Null]
        );
        assert_eq!(
            names(sort("name", true))?,
            vec!["Charlie".into(), "Bob".into(), "Alice".into(), Val::Null]
        );
        assert_eq!(
            sort("amount", true).apply(&facts)?.field_values("amount"),
            vec![Val::S32(42), Val::S32(15), Val::S32(15), Val::S32(7)]
        );

        Ok(())
    }

    #[test]
    fn test_all_equal() -> Result<()> {
        let all_equal = |terms: Vec<crate::term::Term>| -> Result<Val> {
            let rule = Rule::AllEqual {
                select: Box::new(Rule::Identity),
                field: "x".to_owned(),
            };

            Ok(rule.apply(&FactSet::terms(terms))?.value().unwrap_or_default())
        };

        assert_eq!(all_equal(vec![term! {"x" => 42}, term! {"x" => 42}])?, Val::Bool(true));
        assert_eq!(all_equal(vec![term! {"x" => 42}, term! {"x" => 41}])?, Val::Bool(false));
        assert_eq!(all_equal(vec![term! {"x" => 99}])?, Val::Bool(true));
        assert_eq!(all_equal(vec![])?, Val::Bool(true));
        assert_eq!(
            all_equal(vec![term! {"x" => Val::Null}, term! {"x" => Val::Null}])?,
            Val::Bool(true)
        );
        assert_eq!(
            all_equal(vec![term! {"x" => Val::Null}, term! {"x" => 1}])?,
            Val::Bool(false)
        );

        Ok(())
    }

    #[test]
    fn test_older_than_homer() -> Result<()> {
        let homer_age = filter_by("name", "==", "Homer")?.then(select(&["age"]));
        let older = filter(Predicate::field_gt("age", homer_age.clone()));
        let not_older = filter(!Predicate::field_gt("age", homer_age));

        assert_eq!(older.apply(&simpsons())?.size(), 4);
        assert_eq!(not_older.apply(&simpsons())?.size(), 5);

        Ok(())
    }

    #[test]
    fn test_filter_on_part() -> Result<()> {
        let kids = filter_part("simpsons", "age", "<", 18)?;
        let boys = kids.clone().then(filter(Predicate::field_eq("gender", "male")));

        assert_eq!(kids.apply(&simpsons())?.size(), 3);
        assert_eq!(boys.apply(&simpsons())?.size(), 1);

        Ok(())
    }

    #[test]
    fn test_limit_count_and_name_prefix() -> Result<()> {
        let people = simpsons();

        let limited = Rule::Limit {
            select: Box::new(from("simpsons")),
            n: 2,
        };
        assert_eq!(limited.apply(&people)?.size(), 2);

        let count = Rule::Count {
            select: Box::new(from("simpsons")),
            variable: "n".to_owned(),
        };
        assert_eq!(count.apply(&people)?.field_value("n"), Some(Val::S64(9)));

        let prefixed = Rule::NamePrefix {
            select: Box::new(Rule::Identity),
            prefix: "sub_".to_owned(),
        };
        assert_eq!(prefixed.apply(&people)?.parts(), vec!["sub_simpsons"]);

        Ok(())
    }

    #[test]
    fn test_flat_map_and_rename_field() -> Result<()> {
        let rule = Rule::FlatMap {
            select: Box::new(from("simpsons")),
            transform: Box::new(Rule::RenameField {
                select: Box::new(select(&["name", "age"])),
                old: "age".to_owned(),
                new: "leeftijd".to_owned(),
            }),
        };

        let result = rule.apply(&simpsons())?;

        assert_eq!(result.size(), 9);
        assert_eq!(
            result.first().map(|fact| fact.term().keys().map(str::to_owned).collect::<Vec<_>>()),
            Some(vec!["name".to_owned(), "leeftijd".to_owned()])
        );

        Ok(())
    }

    #[test]
    fn test_assert() -> Result<()> {
        let people = simpsons();
        let ok = Rule::Assert {
            select: Box::new(from("simpsons")),
            predicate: FactSetPredicate::Exists,
        };
        assert!(ok.apply(&people)?.is_empty());

        let failing = Rule::Assert {
            select: Box::new(from("simpsons")),
            predicate: FactSetPredicate::All(Predicate::field_lt("age", 18)),
        };
        let err = failing.apply(&people).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::AssertionFailed(_))
        ));

        Ok(())
    }

    #[test]
    fn test_cached_and_once_keep_state_in_session() -> Result<()> {
        let mut session = Session::default();
        let cached = Rule::Cached(Box::new(from("simpsons")));

        let first = cached.apply_in(&simpsons(), &mut session)?;
        let replayed = cached.apply_in(&FactSet::empty(), &mut session)?;

        assert_eq!(first.size(), 9);
        assert_eq!(replayed.size(), 9);
        assert!(cached.apply(&FactSet::empty())?.is_empty());

        let once = Rule::Once(Box::new(from("simpsons")));

        assert_eq!(once.apply_in(&simpsons(), &mut session)?.size(), 9);
        assert!(once.apply_in(&simpsons(), &mut session)?.is_empty());

        Ok(())
    }

    #[test]
    fn test_add_fact_info() -> Result<()> {
        let rule = Rule::AddFactInfo {
            select: Box::new(from("simpsons")),
            info: Info::unit("source".to_owned(), "census".into()),
        };

        let result = rule.apply(&simpsons())?;

        assert!(result
            .iter()
            .all(|fact: Fact| fact.info().get("source") == Some(&Val::from("census"))));

        Ok(())
    }

    #[test]
    fn test_equality_follows_ast() {
        let a = filter(Predicate::field_eq("name", "Homer"));
        let b = Rule::Filter {
            select: Box::new(Rule::Identity),
            predicate: Predicate::Compare(crate::predicate::Comparator::new(
                CmpOp::Eq,
                "name",
                "Homer",
            )),
        };

        assert_eq!(a, b);
        assert_eq!(a.to_string(), r#"filter(identity(), field_eq("name", "Homer"))"#);
    }
}
