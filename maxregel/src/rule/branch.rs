use anyhow::Result;

use super::{Rule, RuleResult};
use crate::{
    ast::{Arg, AstNode},
    fact_set::{FactSet, DEFAULT_PART},
    predicate::{FactSetPredicate, Predicate},
    session::Session,
};

/// `if condition holds for a fact, apply consequence to it`.
#[derive(Clone, Debug)]
pub struct CaseEntry {
    pub condition: Predicate,
    pub consequence: Rule,
}

impl CaseEntry {
    pub fn new(condition: Predicate, consequence: Rule) -> Self {
        Self {
            condition,
            consequence,
        }
    }
}

/// Per-fact branching. Each selected fact goes through the first entry
/// whose condition it satisfies, or through the default; the outputs are
/// collected in the part `variable`.
#[derive(Clone, Debug)]
pub struct Case {
    select: Box<Rule>,
    entries: Vec<CaseEntry>,
    default: Box<Rule>,
    variable: String,
}

impl Case {
    pub fn new(
        select: Rule,
        entries: Vec<CaseEntry>,
        default: Rule,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            select: Box::new(select),
            entries,
            default: Box::new(default),
            variable: variable.into(),
        }
    }

    pub fn entries(&self) -> &[CaseEntry] {
        &self.entries
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub(super) fn apply(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        let conditions = self
            .entries
            .iter()
            .map(|entry| entry.condition.bind(facts))
            .collect::<Result<Vec<_>>>()?;

        let selection = self.select.apply_in(facts, session)?;
        let mut result = FactSet::Empty;

        for fact in selection.iter() {
            let mut consequence: &Rule = &self.default;

            for (condition, entry) in conditions.iter().zip(&self.entries) {
                if condition.test(&fact)? {
                    consequence = &entry.consequence;
                    break;
                }
            }

            let single = FactSet::from_facts(DEFAULT_PART, [fact]);
            result = result.union(&consequence.apply_in(&single, session)?);
        }

        Ok(result.set_part(&self.variable))
    }

    pub(super) fn ast(&self) -> AstNode {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                Arg::List(vec![
                    entry.condition.ast().into(),
                    entry.consequence.ast().into(),
                ])
            })
            .collect();

        AstNode::leaf(
            "case",
            [
                self.select.ast().into(),
                Arg::List(entries),
                self.default.ast().into(),
                self.variable.as_str().into(),
            ],
        )
    }

    pub(super) fn parse(node: &AstNode) -> Result<Self> {
        let entries = node
            .list_arg(1)?
            .iter()
            .map(|entry| {
                let pair = entry_items(node, entry, 2)?;

                Ok(CaseEntry::new(
                    Predicate::parse(pair[0])?,
                    Rule::parse(pair[1])?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(
            Rule::parse(node.node_arg(0)?)?,
            entries,
            Rule::parse(node.node_arg(2)?)?,
            node.str_arg(3)?,
        ))
    }
}

/// `if condition holds for the selection, apply consequence`.
#[derive(Clone, Debug)]
pub struct FactSetCaseEntry {
    pub select: Rule,
    pub condition: FactSetPredicate,
    pub consequence: Rule,
}

impl FactSetCaseEntry {
    pub fn new(select: Rule, condition: FactSetPredicate, consequence: Rule) -> Self {
        Self {
            select,
            condition,
            consequence,
        }
    }
}

/// Branching on whole fact sets: the first entry whose condition holds on
/// its selection decides the outcome.
#[derive(Clone, Debug)]
pub struct FactSetCase {
    entries: Vec<FactSetCaseEntry>,
    default: Box<Rule>,
}

impl FactSetCase {
    pub fn new(entries: Vec<FactSetCaseEntry>, default: Rule) -> Self {
        Self {
            entries,
            default: Box::new(default),
        }
    }

    pub fn entries(&self) -> &[FactSetCaseEntry] {
        &self.entries
    }

    pub fn default_rule(&self) -> &Rule {
        &self.default
    }

    pub(super) fn apply(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        for entry in &self.entries {
            let selection = entry.select.apply_in(facts, session)?;

            if entry.condition.bind(facts)?.test(&selection)? {
                return entry.consequence.apply_in(facts, session);
            }
        }

        self.default.apply_in(facts, session)
    }

    pub(super) fn ast(&self) -> AstNode {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                Arg::List(vec![
                    entry.select.ast().into(),
                    entry.condition.ast().into(),
                    entry.consequence.ast().into(),
                ])
            })
            .collect();

        AstNode::leaf("factsetcase", [Arg::List(entries), self.default.ast().into()])
    }

    pub(super) fn parse(node: &AstNode) -> Result<Self> {
        let entries = node
            .list_arg(0)?
            .iter()
            .map(|entry| {
                let triple = entry_items(node, entry, 3)?;

                Ok(FactSetCaseEntry::new(
                    Rule::parse(triple[0])?,
                    FactSetPredicate::parse(triple[1])?,
                    Rule::parse(triple[2])?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(entries, Rule::parse(node.node_arg(1)?)?))
    }
}

fn entry_items<'a>(node: &AstNode, entry: &'a Arg, len: usize) -> Result<Vec<&'a AstNode>> {
    let items = entry
        .as_list()
        .filter(|items| items.len() == len)
        .ok_or_else(|| node.malformed(format!("expected an entry of {len} nodes, got {entry}")))?;

    items
        .iter()
        .map(|item| {
            item.as_node()
                .ok_or_else(|| node.malformed(format!("entry item {item} is not a node")).into())
        })
        .collect()
}

/// Early exit from a sequence: when `condition` holds on the selection,
/// the sequence stops and yields `result` applied to its current facts.
#[derive(Clone, Debug)]
pub struct ReturnIf {
    select: Box<Rule>,
    condition: FactSetPredicate,
    result: Box<Rule>,
}

impl ReturnIf {
    pub fn new(select: Rule, condition: FactSetPredicate, result: Rule) -> Self {
        Self {
            select: Box::new(select),
            condition,
            result: Box::new(result),
        }
    }

    /// Returns if anything was selected, with the facts as they are.
    pub fn exists(select: Rule) -> Self {
        Self::new(select, FactSetPredicate::Exists, Rule::Identity)
    }

    pub fn condition(&self, facts: &FactSet, session: &mut Session) -> Result<bool> {
        let selection = self.select.apply_in(facts, session)?;

        self.condition.bind(facts)?.test(&selection)
    }

    pub fn result(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        self.result.apply_in(facts, session)
    }

    /// Outside of a sequence there is nothing to skip: the facts pass
    /// through unless the condition holds.
    pub(super) fn apply(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        if self.condition(facts, session)? {
            self.result(facts, session)
        } else {
            Ok(facts.clone())
        }
    }

    pub(super) fn evaluate(&self, facts: &FactSet, session: &mut Session) -> Result<RuleResult> {
        let total = self.apply(facts, session)?;

        Ok(RuleResult::new(FactSet::Empty, total))
    }

    pub(super) fn ast(&self) -> AstNode {
        AstNode::leaf(
            "returnif",
            [
                self.select.ast().into(),
                self.condition.ast().into(),
                self.result.ast().into(),
            ],
        )
    }

    pub(super) fn parse(node: &AstNode) -> Result<Self> {
        Ok(Self::new(
            Rule::parse(node.node_arg(0)?)?,
            FactSetPredicate::parse(node.node_arg(1)?)?,
            Rule::parse(node.node_arg(2)?)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        rule::build::{cnst_value, filter_part, from, script},
        test_utils::simpsons,
        value::Val,
    };

    #[test]
    fn test_case_on_age() -> Result<()> {
        let case = Case::new(
            Rule::Identity,
            vec![
                CaseEntry::new(Predicate::field_lt("age", 19), cnst_value("minor")),
                CaseEntry::new(Predicate::field_lt("age", 68), cnst_value("adult")),
                CaseEntry::new(Predicate::field_geq("age", 68), cnst_value("adult (AOW)")),
            ],
            cnst_value("?"),
            "x",
        );

        let result = case.apply(&simpsons(), &mut Session::default())?;

        assert_eq!(result.parts(), vec!["x"]);
        assert_eq!(result.size(), 9);
        assert_eq!(result.filter(&Predicate::field_eq("x", "minor"))?.size(), 3);
        assert_eq!(result.filter(&Predicate::field_eq("x", "adult (AOW)"))?.size(), 1);

        Ok(())
    }

    #[test]
    fn test_fact_set_case_on_age() -> Result<()> {
        let case = FactSetCase::new(
            vec![
                FactSetCaseEntry::new(
                    filter_part("simpsons", "age", ">", 100)?,
                    FactSetPredicate::Exists,
                    cnst_value("includes dinosaurs"),
                ),
                FactSetCaseEntry::new(
                    filter_part("simpsons", "age", ">", 60)?,
                    FactSetPredicate::Exists,
                    cnst_value("includes elderly"),
                ),
            ],
            cnst_value("somewhat young population"),
        );

        let result = case.apply(&simpsons(), &mut Session::default())?;

        assert_eq!(result.value(), Some(Val::from("includes elderly")));

        Ok(())
    }

    #[test]
    fn test_return_if_stops_the_sequence() -> Result<()> {
        let early = script([
            Rule::ReturnIf(ReturnIf::new(
                filter_part("simpsons", "name", "==", "Homer")?,
                FactSetPredicate::Exists,
                cnst_value("found"),
            )),
            cnst_value("not found"),
        ]);
        let late = script([
            Rule::ReturnIf(ReturnIf::exists(filter_part("simpsons", "name", "==", "Ned")?)),
            cnst_value("not found"),
        ]);

        assert_eq!(early.apply(&simpsons())?.value(), Some(Val::from("found")));
        assert_eq!(late.apply(&simpsons())?.value(), Some(Val::from("not found")));

        let mut session = Session::default();
        let result = early.evaluate(&simpsons(), &mut session)?;

        assert_eq!(result.total.value(), Some(Val::from("found")));

        Ok(())
    }

    #[test]
    fn test_return_if_alone_passes_facts_through() -> Result<()> {
        let rule = Rule::ReturnIf(ReturnIf::exists(from("nobody")));

        assert_eq!(rule.apply(&simpsons())?, simpsons());

        Ok(())
    }
}
