use std::sync::Arc;

use anyhow::Result;
use im::Vector;

use super::{group_facts, FactOperation, FactSet, KeyFn, SinglePart};
use crate::{fact::Fact, predicate::Predicate};

/// An ordered mapping from part name to the fact set holding that part.
///
/// Every stored fact set only contains its own part.
#[derive(Clone, Debug, Default)]
pub struct MultiPart {
    parts: Vector<(Arc<str>, FactSet)>,
    operation: FactOperation,
}

impl MultiPart {
    /// Collects the parts of every set; same-named parts are unioned.
    pub fn new(sets: impl IntoIterator<Item = FactSet>) -> Self {
        let mut parts: Vector<(Arc<str>, FactSet)> = Vector::new();

        for set in sets {
            for name in set.parts() {
                let part = set.get(&name);

                match parts.iter().position(|(n, _)| **n == *name) {
                    Some(i) => {
                        let (name, existing) = parts[i].clone();
                        parts.set(i, (name, existing.union(&part)));
                    }
                    None => parts.push_back((name.into(), part)),
                }
            }
        }

        Self {
            parts,
            operation: FactOperation::identity(),
        }
    }

    /// Trusts the caller to hand in distinct names, each paired with a set
    /// containing only that part.
    pub(crate) fn from_named(parts: impl IntoIterator<Item = (Arc<str>, FactSet)>) -> Self {
        Self {
            parts: parts.into_iter().collect(),
            operation: FactOperation::identity(),
        }
    }

    pub fn operation(&self) -> &FactOperation {
        &self.operation
    }

    pub fn with_operation(&self, operation: FactOperation) -> Self {
        Self {
            parts: self.parts.clone(),
            operation,
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Fact> + '_> {
        let facts = self.parts.iter().flat_map(|(_, part)| part.iter());

        if self.operation.is_identity() {
            Box::new(facts)
        } else {
            Box::new(facts.map(move |fact| self.operation.apply(fact)))
        }
    }

    pub fn size(&self) -> usize {
        self.parts.iter().map(|(_, part)| part.size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|(_, part)| part.is_empty())
    }

    pub fn has(&self, part: &str) -> bool {
        self.parts.iter().any(|(name, _)| &**name == part)
    }

    pub fn get(&self, part: &str) -> FactSet {
        match self.parts.iter().find(|(name, _)| &**name == part) {
            Some((_, facts)) => facts.add_fact_operation(&self.operation),
            None => FactSet::Empty,
        }
    }

    pub fn parts(&self) -> Vec<String> {
        self.parts.iter().map(|(name, _)| name.to_string()).collect()
    }

    pub fn set_part(&self, name: &str) -> FactSet {
        if self.parts.len() == 1 {
            return self.get(&self.parts[0].0).set_part(name);
        }

        SinglePart::new(name, self.iter().collect()).into()
    }

    pub fn remove(&self, part: &str) -> FactSet {
        let parts = self
            .parts
            .iter()
            .filter(|(name, _)| &**name != part)
            .cloned()
            .collect();

        Self {
            parts,
            operation: self.operation.clone(),
        }
        .into()
    }

    /// Applies `f` to every part and tags the result with the part's name.
    /// Every part survives, also when its result is empty.
    pub fn try_map_parts(&self, mut f: impl FnMut(FactSet) -> Result<FactSet>) -> Result<Self> {
        let mut parts = Vector::new();

        for (name, _) in self.parts.iter() {
            let result = f(self.get(name))?;
            parts.push_back((Arc::clone(name), retag(name, result)));
        }

        Ok(Self {
            parts,
            operation: FactOperation::identity(),
        })
    }

    pub fn map_parts(&self, mut f: impl FnMut(FactSet) -> FactSet) -> Self {
        let mut parts = Vector::new();

        for (name, _) in self.parts.iter() {
            let result = f(self.get(name));
            parts.push_back((Arc::clone(name), retag(name, result)));
        }

        Self {
            parts,
            operation: FactOperation::identity(),
        }
    }

    pub fn filter(&self, predicate: &Predicate) -> Result<Self> {
        self.try_map_parts(|part| part.filter(predicate))
    }

    pub fn group(&self, key: KeyFn<'_>) -> FactSet {
        group_facts(self.iter(), key)
    }

    pub fn join(&self, other: &FactSet, left: KeyFn<'_>, right: KeyFn<'_>) -> Self {
        self.map_parts(|part| part.join(other, left, right))
    }

    pub fn distinct(&self) -> Self {
        self.map_parts(|part| part.distinct())
    }

    pub fn intersection(&self, other: &FactSet) -> Self {
        self.map_parts(|part| part.intersection(other))
    }
}

/// `facts` filed under `name`. An empty result still keeps the part.
fn retag(name: &Arc<str>, facts: FactSet) -> FactSet {
    if facts.is_empty() {
        SinglePart::new(Arc::clone(name), Vec::new()).into()
    } else {
        facts.set_part(name)
    }
}
