use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug},
    sync::{Arc, PoisonError, RwLock},
};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::trace;

use super::{group_facts, hash_join, FactOperation, FactSet, KeyFn};
use crate::{fact::Fact, predicate::Predicate, term::Term, value::Val};

type ValueIndex = HashMap<Val, Arc<Vec<Fact>>>;

/// Field name to lazily built value index. Shared between the renamed and
/// re-operated views of the same facts, since it only covers raw facts.
#[derive(Default)]
struct FieldIndex {
    fields: RwLock<HashMap<String, Arc<OnceCell<ValueIndex>>>>,
}

impl FieldIndex {
    fn cell(&self, field: &str) -> Arc<OnceCell<ValueIndex>> {
        if let Some(cell) = self
            .fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(field)
        {
            return Arc::clone(cell);
        }

        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);

        Arc::clone(fields.entry(field.to_owned()).or_default())
    }

    fn lookup(&self, field: &str, value: &Val, facts: &[Fact]) -> Option<Arc<Vec<Fact>>> {
        let cell = self.cell(field);
        let values = cell.get_or_init(|| Self::build(field, facts));

        values.get(&value.index_key()).cloned()
    }

    fn build(field: &str, facts: &[Fact]) -> ValueIndex {
        trace!(field, facts = facts.len(), "building field index");

        let mut index: HashMap<Val, Vec<Fact>> = HashMap::new();

        for fact in facts {
            match fact.get(field) {
                Some(value) if !value.is_null() => {
                    index
                        .entry(value.index_key())
                        .or_default()
                        .push(fact.clone());
                }
                _ => {}
            }
        }

        index
            .into_iter()
            .map(|(k, v)| (k, Arc::new(v)))
            .collect()
    }
}

/// One named partition of in-memory facts.
#[derive(Clone)]
pub struct SinglePart {
    name: Arc<str>,
    facts: Arc<Vec<Fact>>,
    distinct: bool,
    operation: FactOperation,
    index: Arc<FieldIndex>,
}

impl SinglePart {
    pub fn new(name: impl Into<Arc<str>>, facts: Vec<Fact>) -> Self {
        Self::with_facts(name.into(), facts, false)
    }

    /// Drops repeated facts, keeping the first occurrence of each.
    pub fn new_distinct(name: impl Into<Arc<str>>, facts: impl IntoIterator<Item = Fact>) -> Self {
        let mut seen = HashSet::new();
        let facts = facts
            .into_iter()
            .filter(|fact| seen.insert(fact.clone()))
            .collect();

        Self::with_facts(name.into(), facts, true)
    }

    fn with_facts(name: Arc<str>, facts: Vec<Fact>, distinct: bool) -> Self {
        Self {
            name,
            facts: Arc::new(facts),
            distinct,
            operation: FactOperation::identity(),
            index: Arc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn operation(&self) -> &FactOperation {
        &self.operation
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Fact> + '_> {
        if self.operation.is_identity() {
            Box::new(self.facts.iter().cloned())
        } else {
            Box::new(
                self.facts
                    .iter()
                    .cloned()
                    .map(move |fact| self.operation.apply(fact)),
            )
        }
    }

    pub fn set_part(&self, name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_operation(&self, operation: FactOperation) -> Self {
        Self {
            operation,
            ..self.clone()
        }
    }

    /// The transformed facts, stored under an identity operation.
    fn materialize(&self) -> Self {
        if self.operation.is_identity() {
            return self.clone();
        }

        Self::with_facts(Arc::clone(&self.name), self.iter().collect(), false)
    }

    /// Facts whose `field` equals `value`, served from the field index.
    pub fn lookup(&self, field: &str, value: &Val) -> Self {
        let facts = self
            .index
            .lookup(field, value, &self.facts)
            .unwrap_or_default();

        Self {
            name: Arc::clone(&self.name),
            facts,
            distinct: self.distinct,
            operation: self.operation.clone(),
            index: Arc::default(),
        }
    }

    pub fn filter(&self, predicate: &Predicate) -> Result<Self> {
        if self.operation.is_identity() {
            if let Some((field, value)) = predicate.as_field_eq() {
                if !value.is_null() {
                    return Ok(self.lookup(field, value));
                }
            }
        }

        let source = self.materialize();
        let mut facts = Vec::new();

        for fact in source.facts.iter() {
            if predicate.test(fact)? {
                facts.push(fact.clone());
            }
        }

        Ok(Self::with_facts(source.name, facts, source.distinct))
    }

    pub fn group(&self, key: KeyFn<'_>) -> FactSet {
        group_facts(self.iter(), key)
    }

    /// Inner hash join. The result lands in the default part.
    pub fn join(&self, other: &FactSet, left: KeyFn<'_>, right: KeyFn<'_>) -> FactSet {
        hash_join(self.iter(), other, left, right).into()
    }

    pub fn distinct(&self) -> Self {
        if self.distinct && self.operation.is_identity() {
            return self.clone();
        }

        Self::new_distinct(Arc::clone(&self.name), self.iter())
    }

    /// Facts of `self` whose term also occurs in `other`.
    pub fn intersection(&self, other: &FactSet) -> Self {
        let terms: HashSet<Term> = other.iter().map(|fact| fact.term().clone()).collect();
        let facts = self
            .iter()
            .filter(|fact| terms.contains(fact.term()))
            .collect();

        Self::with_facts(Arc::clone(&self.name), facts, self.distinct)
    }

    #[cfg(test)]
    fn indexed_fields(&self) -> usize {
        self.index
            .fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Debug for SinglePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinglePart")
            .field("name", &self.name)
            .field("facts", &self.facts.len())
            .field("distinct", &self.distinct)
            .field("operation", &self.operation)
            .finish()
    }
}
