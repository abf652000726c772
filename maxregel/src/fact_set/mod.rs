//! Partitioned collections of facts.
//!
//! A [`FactSet`] is an ordered collection of facts, grouped into named
//! parts. Every variant is an immutable value: operations return new sets
//! that share storage with the set they were derived from.

use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
    hash::{Hash, Hasher},
    sync::Arc,
};

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    fact::Fact,
    predicate::Predicate,
    store::FactStore,
    term::Term,
    value::Val,
};

mod concat;
mod external;
mod multi_part;
mod operation;
mod single_part;

pub use concat::Concat;
pub use external::ExternalFactSet;
pub use multi_part::MultiPart;
pub use operation::{FactOp, FactOperation};
pub use single_part::SinglePart;

/// The part facts land in when no name is given.
pub const DEFAULT_PART: &str = "*";

/// Derives a grouping or join key from a fact.
pub type KeyFn<'a> = &'a dyn Fn(&Fact) -> String;

#[derive(Clone, Debug, Default)]
pub enum FactSet {
    #[default]
    Empty,
    SinglePart(SinglePart),
    MultiPart(MultiPart),
    Concat(Concat),
    External(ExternalFactSet),
}

impl From<SinglePart> for FactSet {
    fn from(facts: SinglePart) -> Self {
        FactSet::SinglePart(facts)
    }
}

impl From<MultiPart> for FactSet {
    fn from(facts: MultiPart) -> Self {
        FactSet::MultiPart(facts)
    }
}

impl From<Concat> for FactSet {
    fn from(facts: Concat) -> Self {
        FactSet::Concat(facts)
    }
}

impl From<ExternalFactSet> for FactSet {
    fn from(facts: ExternalFactSet) -> Self {
        FactSet::External(facts)
    }
}

impl FactSet {
    pub fn empty() -> Self {
        FactSet::Empty
    }

    pub fn from_facts(part: &str, facts: impl IntoIterator<Item = Fact>) -> Self {
        SinglePart::new(part, facts.into_iter().collect()).into()
    }

    pub fn from_terms(part: &str, terms: impl IntoIterator<Item = Term>) -> Self {
        Self::from_facts(part, terms.into_iter().map(Fact::new))
    }

    /// Facts in the default part.
    pub fn terms(terms: impl IntoIterator<Item = Term>) -> Self {
        Self::from_terms(DEFAULT_PART, terms)
    }

    /// Merges the parts of all `sets`; same-named parts are unioned.
    pub fn parts_of(sets: impl IntoIterator<Item = FactSet>) -> Self {
        MultiPart::new(sets).into()
    }

    /// A single fact with a single field, in the default part.
    pub fn cnst(field: &str, value: impl Into<Val>) -> Self {
        Self::terms([Term::new([(field, value.into())])])
    }

    pub fn external(store: Arc<dyn FactStore>) -> Self {
        ExternalFactSet::new(store).into()
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Fact> + '_> {
        match self {
            FactSet::Empty => Box::new(std::iter::empty()),
            FactSet::SinglePart(facts) => facts.iter(),
            FactSet::MultiPart(facts) => facts.iter(),
            FactSet::Concat(facts) => facts.iter(),
            FactSet::External(facts) => facts.iter(),
        }
    }

    pub fn facts(&self) -> Vec<Fact> {
        self.iter().collect()
    }

    pub fn size(&self) -> usize {
        match self {
            FactSet::Empty => 0,
            FactSet::SinglePart(facts) => facts.len(),
            FactSet::MultiPart(facts) => facts.size(),
            FactSet::Concat(facts) => facts.size(),
            FactSet::External(facts) => facts.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FactSet::Empty => true,
            FactSet::SinglePart(facts) => facts.is_empty(),
            FactSet::MultiPart(facts) => facts.is_empty(),
            FactSet::Concat(facts) => facts.is_empty(),
            FactSet::External(facts) => facts.size() == 0,
        }
    }

    pub fn has(&self, part: &str) -> bool {
        match self {
            FactSet::Empty => false,
            FactSet::SinglePart(facts) => facts.name() == part,
            FactSet::MultiPart(facts) => facts.has(part),
            FactSet::Concat(facts) => facts.has(part),
            FactSet::External(facts) => facts.has(part),
        }
    }

    /// The facts of one part, or an empty set when there is no such part.
    pub fn get(&self, part: &str) -> FactSet {
        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) if facts.name() == part => self.clone(),
            FactSet::SinglePart(_) => FactSet::Empty,
            FactSet::MultiPart(facts) => facts.get(part),
            FactSet::Concat(facts) => facts.get(part),
            FactSet::External(facts) => facts.get(part),
        }
    }

    /// Part names in order of first appearance.
    pub fn parts(&self) -> Vec<String> {
        match self {
            FactSet::Empty => Vec::new(),
            FactSet::SinglePart(facts) => vec![facts.name().to_owned()],
            FactSet::MultiPart(facts) => facts.parts(),
            FactSet::Concat(facts) => facts.parts(),
            FactSet::External(facts) => facts.parts(),
        }
    }

    /// Moves every fact into the single part `name`.
    pub fn set_part(&self, name: &str) -> FactSet {
        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) => facts.set_part(name).into(),
            FactSet::MultiPart(facts) => facts.set_part(name),
            FactSet::Concat(facts) => facts.set_part(name).into(),
            FactSet::External(facts) => facts.set_part(name).into(),
        }
    }

    pub fn remove(&self, part: &str) -> FactSet {
        if !self.has(part) {
            return self.clone();
        }

        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(_) => FactSet::Empty,
            FactSet::MultiPart(facts) => facts.remove(part),
            FactSet::Concat(facts) => facts.remove(part),
            FactSet::External(facts) => facts.remove(part),
        }
    }

    /// The per-fact transformation applied on iteration.
    pub fn fact_operation(&self) -> FactOperation {
        match self {
            FactSet::Empty | FactSet::Concat(_) => FactOperation::identity(),
            FactSet::SinglePart(facts) => facts.operation().clone(),
            FactSet::MultiPart(facts) => facts.operation().clone(),
            FactSet::External(facts) => facts.operation().clone(),
        }
    }

    /// Replaces the per-fact transformation.
    pub fn set_fact_operation(&self, operation: FactOperation) -> FactSet {
        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) => facts.with_operation(operation).into(),
            FactSet::MultiPart(facts) => facts.with_operation(operation).into(),
            FactSet::Concat(facts) => facts.set_fact_operation(&operation).into(),
            FactSet::External(facts) => facts.with_operation(operation).into(),
        }
    }

    /// Appends `operation` to the per-fact transformation.
    pub fn add_fact_operation(&self, operation: &FactOperation) -> FactSet {
        if operation.is_identity() {
            return self.clone();
        }

        match self {
            FactSet::Concat(facts) => facts.add_fact_operation(operation).into(),
            _ => self.set_fact_operation(self.fact_operation().then(operation)),
        }
    }

    pub fn filter(&self, predicate: &Predicate) -> Result<FactSet> {
        Ok(match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) => facts.filter(predicate)?.into(),
            FactSet::MultiPart(facts) => facts.filter(predicate)?.into(),
            FactSet::Concat(facts) => facts.filter(predicate)?,
            FactSet::External(facts) => facts.filter(predicate)?.into(),
        })
    }

    /// One part per distinct key, in order of first appearance.
    pub fn group(&self, key: KeyFn<'_>) -> FactSet {
        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) => facts.group(key),
            FactSet::MultiPart(facts) => facts.group(key),
            FactSet::Concat(facts) => facts.group(key),
            FactSet::External(_) => group_facts(self.iter(), key),
        }
    }

    /// Inner join: every pair of facts with equal keys yields their union.
    pub fn join(&self, other: &FactSet, left: KeyFn<'_>, right: KeyFn<'_>) -> FactSet {
        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) => facts.join(other, left, right),
            FactSet::MultiPart(facts) => facts.join(other, left, right).into(),
            FactSet::Concat(facts) => facts.join(other, left, right),
            FactSet::External(_) => hash_join(self.iter(), other, left, right).into(),
        }
    }

    pub fn distinct(&self) -> FactSet {
        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) => facts.distinct().into(),
            FactSet::MultiPart(facts) => facts.distinct().into(),
            FactSet::Concat(facts) => facts.distinct(),
            FactSet::External(facts) => facts.materialize().distinct(),
        }
    }

    /// A lazy union. Empty sides are dropped rather than concatenated.
    pub fn union(&self, other: &FactSet) -> FactSet {
        if self.is_empty() {
            other.clone()
        } else if other.is_empty() {
            self.clone()
        } else {
            Concat::new(self.clone(), other.clone()).into()
        }
    }

    /// The facts of `self` whose term also occurs in `other`, parts kept.
    pub fn intersection(&self, other: &FactSet) -> FactSet {
        if other.is_empty() {
            return FactSet::Empty;
        }

        match self {
            FactSet::Empty => FactSet::Empty,
            FactSet::SinglePart(facts) => facts.intersection(other).into(),
            FactSet::MultiPart(facts) => facts.intersection(other).into(),
            FactSet::Concat(facts) => facts.intersection(other),
            FactSet::External(facts) => facts.materialize().intersection(other),
        }
    }

    pub fn any(&self, predicate: &Predicate) -> Result<bool> {
        for fact in self.iter() {
            if predicate.test(&fact)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    pub fn all(&self, predicate: &Predicate) -> Result<bool> {
        for fact in self.iter() {
            if !predicate.test(&fact)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn first(&self) -> Option<Fact> {
        self.iter().next()
    }

    /// The first value of the first fact.
    pub fn value(&self) -> Option<Val> {
        self.first()
            .and_then(|fact| fact.term().first().cloned())
    }

    /// The value of `field` in the first fact.
    pub fn field_value(&self, field: &str) -> Option<Val> {
        self.first().and_then(|fact| fact.get(field).cloned())
    }

    /// The value of `field` in every fact, null where it is missing.
    pub fn field_values(&self, field: &str) -> Vec<Val> {
        self.iter()
            .map(|fact| fact.get(field).cloned().unwrap_or_default())
            .collect()
    }

    pub fn as_map(&self) -> Vec<(String, Vec<Fact>)> {
        self.parts()
            .into_iter()
            .map(|part| {
                let facts = self.get(&part).facts();

                (part, facts)
            })
            .collect()
    }

    /// Per part, the field names of its first fact mapped to their type names.
    pub fn schema(&self) -> FactSet {
        MultiPart::new(self.parts().into_iter().map(|part| match self.get(&part).first() {
            Some(fact) => {
                let types = fact
                    .term()
                    .iter()
                    .map(|(k, v)| (k, v.type_name()))
                    .collect::<Term>();

                FactSet::from_terms(&part, [types])
            }
            None => FactSet::Empty,
        }))
        .into()
    }

    /// Rebuilds the set as a multi-part set over materialized parts.
    pub fn consolidate(&self) -> FactSet {
        MultiPart::from_named(self.parts().into_iter().map(|part| {
            let facts = SinglePart::new(part.as_str(), self.get(&part).facts());

            (part.into(), facts.into())
        }))
        .into()
    }

    pub fn group_by_field(&self, field: &str) -> FactSet {
        self.group(&|fact: &Fact| field_key(fact, field))
    }

    /// Joins on the string form of two fields; a missing field keys as `null`.
    pub fn join_on_field(&self, other: &FactSet, field_a: &str, field_b: &str) -> FactSet {
        self.join(
            other,
            &|fact: &Fact| field_key(fact, field_a),
            &|fact: &Fact| field_key(fact, field_b),
        )
    }

    pub fn select_parts<S: AsRef<str>>(&self, parts: &[S]) -> FactSet {
        parts
            .iter()
            .fold(FactSet::Empty, |result, part| result.union(&self.get(part.as_ref())))
    }

    /// The parts of `self` that `other` also has.
    pub fn part_intersection(&self, other: &FactSet) -> FactSet {
        let shared = self
            .parts()
            .into_iter()
            .filter(|part| other.has(part))
            .collect::<Vec<_>>();

        self.select_parts(&shared)
    }

    /// The parts of `self` that `other` lacks.
    pub fn part_difference(&self, other: &FactSet) -> FactSet {
        other
            .parts()
            .iter()
            .fold(self.clone(), |result, part| result.remove(part))
    }

    fn term_set(&self) -> HashSet<Term> {
        self.iter().map(|fact| fact.term().clone()).collect()
    }
}

fn field_key(fact: &Fact, field: &str) -> String {
    fact.get(field)
        .map(Val::key_string)
        .unwrap_or_else(|| "null".to_owned())
}

pub(crate) fn group_facts(facts: impl Iterator<Item = Fact>, key: KeyFn<'_>) -> FactSet {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Fact>> = HashMap::new();

    for fact in facts {
        let k = key(&fact);

        groups
            .entry(k.clone())
            .or_insert_with(|| {
                order.push(k);
                Vec::new()
            })
            .push(fact);
    }

    MultiPart::from_named(order.into_iter().filter_map(|k| {
        let facts = groups.remove(&k)?;
        let part = SinglePart::new(k.as_str(), facts);

        Some((k.into(), part.into()))
    }))
    .into()
}

pub(crate) fn hash_join(
    facts: impl Iterator<Item = Fact>,
    other: &FactSet,
    left: KeyFn<'_>,
    right: KeyFn<'_>,
) -> SinglePart {
    let mut index: HashMap<String, Vec<Fact>> = HashMap::new();

    for fact in other.iter() {
        index.entry(right(&fact)).or_default().push(fact);
    }

    let mut joined = Vec::new();

    for fact in facts {
        if let Some(matches) = index.get(&left(&fact)) {
            joined.extend(matches.iter().map(|other| fact.union(other)));
        }
    }

    SinglePart::new(DEFAULT_PART, joined)
}

impl PartialEq for FactSet {
    /// Set equality over terms, ignoring parts, order and provenance.
    fn eq(&self, other: &Self) -> bool {
        if self.is_empty() && other.is_empty() {
            return true;
        }

        self.term_set() == other.term_set()
    }
}

impl Eq for FactSet {}

impl Hash for FactSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term_set().len().hash(state)
    }
}

impl Serialize for FactSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let parts = self
            .parts()
            .into_iter()
            .map(|part| {
                let terms = self
                    .get(&part)
                    .iter()
                    .map(|fact| fact.term().clone())
                    .collect::<Vec<Term>>();

                (part, terms)
            })
            .collect::<Vec<_>>();

        parts.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FactSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = Vec::<(String, Vec<Term>)>::deserialize(deserializer)?;

        if parts.is_empty() {
            return Ok(FactSet::Empty);
        }

        Ok(FactSet::parts_of(
            parts
                .into_iter()
                .map(|(part, terms)| FactSet::from_terms(&part, terms)),
        ))
    }
}

impl Display for FactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;

        for (i, (part, facts)) in self.as_map().into_iter().enumerate() {
            if i > 0 {
                writeln!(f, ",")?;
            }

            writeln!(f, "  {part} = [")?;

            for (j, fact) in facts.iter().enumerate() {
                if j > 0 {
                    writeln!(f, ",")?;
                }

                write!(f, "    {}", fact.term())?;
            }

            write!(f, "\n  ]")?;
        }

        write!(f, "\n}}")
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{term, test_utils::simpsons};

    #[test]
    fn test_union_skips_empty_sides() {
        let a = FactSet::from_terms("a", [term! {"x" => 1}]);

        assert!(matches!(FactSet::Empty.union(&a), FactSet::SinglePart(_)));
        assert!(matches!(a.union(&FactSet::Empty), FactSet::SinglePart(_)));
        assert!(matches!(a.union(&a), FactSet::Concat(_)));
        assert_eq!(a.union(&a).size(), 2);
        assert_eq!(a.union(&a).distinct().size(), 1);
    }

    #[test]
    fn test_equality_ignores_parts_and_order() {
        let a = FactSet::from_terms("a", [term! {"x" => 1}, term! {"x" => 2}]);
        let b = FactSet::from_terms("b", [term! {"x" => 2}, term! {"x" => 1}, term! {"x" => 1}]);

        assert_eq!(a, b);
        assert_eq!(FactSet::Empty, FactSet::from_terms("c", []));
        assert_ne!(a, FactSet::Empty);
    }

    #[test]
    fn test_group_by_field() {
        let groups = simpsons().group_by_field("hair");

        assert_eq!(groups.parts(), vec!["short", "long", "middle"]);
        assert_eq!(groups.get("short").size(), 3);
        assert_eq!(groups.get("long").size(), 3);
        assert_eq!(groups.get("middle").size(), 3);
    }

    #[test]
    fn test_join_on_field() {
        let people = FactSet::from_terms(
            "people",
            [
                term! {"name" => "Homer", "town" => "springfield"},
                term! {"name" => "Ned", "town" => "springfield"},
                term! {"name" => "Kent"},
            ],
        );
        let towns = FactSet::from_terms(
            "towns",
            [
                term! {"city" => "springfield", "state" => "unknown"},
                term! {"city" => "shelbyville", "state" => "unknown"},
            ],
        );

        let joined = people.join_on_field(&towns, "town", "city");

        assert_eq!(joined.parts(), vec![DEFAULT_PART]);
        assert_eq!(joined.size(), 2);
        assert!(joined.iter().all(|fact| fact.get("state") == Some(&"unknown".into())));
    }

    #[test]
    fn test_part_algebra() {
        let facts = FactSet::parts_of([
            FactSet::from_terms("a", [term! {"x" => 1}]),
            FactSet::from_terms("b", [term! {"x" => 2}]),
            FactSet::from_terms("c", [term! {"x" => 3}]),
        ]);
        let other = FactSet::parts_of([
            FactSet::from_terms("b", [term! {"y" => 1}]),
            FactSet::from_terms("d", [term! {"y" => 2}]),
        ]);

        assert_eq!(facts.select_parts(&["a", "c", "z"]).parts(), vec!["a", "c"]);
        assert_eq!(facts.part_intersection(&other).parts(), vec!["b"]);
        assert_eq!(facts.part_difference(&other).parts(), vec!["a", "c"]);
    }

    #[test]
    fn test_queries() -> Result<()> {
        let people = simpsons();

        assert_eq!(people.size(), 9);
        assert_eq!(people.value(), Some("Homer".into()));
        assert_eq!(people.field_value("age"), Some(Val::S32(36)));
        assert!(people.any(&Predicate::field_eq("name", "Lisa"))?);
        assert!(!people.all(&Predicate::field_lt("age", 18))?);
        assert_eq!(
            people.schema().first().map(|fact| fact.term().clone()),
            Some(term! {
                "name" => "string",
                "hair" => "string",
                "weight" => "s32",
                "age" => "s32",
                "gender" => "string",
            })
        );

        Ok(())
    }

    #[test]
    fn test_consolidate_keeps_parts() {
        let facts = FactSet::from_terms("a", [term! {"x" => 1}])
            .union(&FactSet::from_terms("b", [term! {"x" => 2}]))
            .union(&FactSet::from_terms("a", [term! {"x" => 3}]));

        let consolidated = facts.consolidate();

        assert!(matches!(consolidated, FactSet::MultiPart(_)));
        assert_eq!(consolidated.parts(), vec!["a", "b"]);
        assert_eq!(consolidated.get("a").size(), 2);
    }

    #[test]
    fn test_add_fact_operation_composes() {
        let facts = simpsons()
            .add_fact_operation(&FactOperation::select_fields(&["name", "age"]))
            .add_fact_operation(&FactOperation::rename_field("age", "years"));

        let homer = facts.first().map(|fact| fact.term().clone());

        assert_eq!(homer, Some(term! {"name" => "Homer", "years" => 36}));
    }
}
