use anyhow::Result;

use super::{Rule, RuleResult};
use crate::{
    ast::AstNode,
    error::{error, Error},
    fact_set::FactSet,
    session::Session,
    value::Info,
};

/// The variable name that assigns every part of the body's output under
/// its own name.
pub const WILDCARD: &str = "*";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AssignKind {
    /// `variable = body`: replaces the part.
    Set,
    /// `variable += body`: appends to the part.
    Update,
}

impl AssignKind {
    pub fn op(self) -> &'static str {
        match self {
            AssignKind::Set => "assign_set",
            AssignKind::Update => "assign_update",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignKind::Set => "=",
            AssignKind::Update => "+=",
        }
    }

    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "assign_set" | "=" => Some(AssignKind::Set),
            "assign_update" | "+=" => Some(AssignKind::Update),
            _ => None,
        }
    }
}

/// Stores the output of `body` as the part `variable`.
#[derive(Clone, Debug)]
pub struct Assign {
    kind: AssignKind,
    variable: String,
    body: Box<Rule>,
    info: Info,
}

impl Assign {
    pub fn new(kind: AssignKind, variable: impl Into<String>, body: Rule) -> Self {
        Self {
            kind,
            variable: variable.into(),
            body: Box::new(body),
            info: Info::default(),
        }
    }

    pub fn with_info(self, info: Info) -> Self {
        Self { info, ..self }
    }

    pub fn kind(&self) -> AssignKind {
        self.kind
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn body(&self) -> &Rule {
        &self.body
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn is_wildcard(&self) -> bool {
        self.variable == WILDCARD
    }

    /// Files `output` under the assigned name(s) and merges it into `facts`.
    fn assign(&self, facts: &FactSet, output: &FactSet) -> RuleResult {
        let mut total = facts.clone();

        let update = if self.is_wildcard() {
            let mut update = FactSet::Empty;

            for part in output.parts() {
                if self.kind == AssignKind::Set {
                    total = total.remove(&part);
                }

                update = update.union(&output.get(&part).set_part(&part));
            }

            update
        } else {
            if self.kind == AssignKind::Set {
                total = total.remove(&self.variable);
            }

            output.set_part(&self.variable)
        };

        RuleResult::new(update.clone(), total.union(&update))
    }

    pub(super) fn apply(&self, facts: &FactSet, session: &mut Session) -> Result<FactSet> {
        let output = self.body.apply_in(facts, session)?;

        Ok(self.assign(facts, &output).total)
    }

    /// `rule` is the enclosing [`Rule::Assign`], handed to the tracer.
    pub(super) fn evaluate(
        &self,
        rule: &Rule,
        facts: &FactSet,
        session: &mut Session,
    ) -> Result<RuleResult> {
        let output = self.body.apply_in(facts, session)?;
        let result = self.assign(facts, &output);

        session.tracer().apply(rule, &result.update);

        Ok(result)
    }

    pub(super) fn ast(&self) -> AstNode {
        AstNode::new(
            self.kind.op(),
            self.info.clone(),
            [self.variable.as_str().into(), self.body.ast().into()],
        )
    }

    pub(super) fn parse(node: &AstNode) -> Result<Self> {
        let kind = match AssignKind::parse(node.op()) {
            Some(kind) => kind,
            None => return error(Error::UnsupportedRule(node.op().to_owned())),
        };

        Ok(Self::new(kind, node.str_arg(0)?, Rule::parse(node.node_arg(1)?)?)
            .with_info(node.info().clone()))
    }
}
