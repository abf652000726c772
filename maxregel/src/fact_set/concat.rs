use std::sync::Arc;

use anyhow::Result;

use super::{group_facts, FactOperation, FactSet, KeyFn, MultiPart};
use crate::{fact::Fact, predicate::Predicate};

/// The lazy union of two fact sets. Neither side is materialized.
///
/// Lookups by part consult `b` before `a`, so the most recently added side
/// wins when only one of them holds a part.
#[derive(Clone, Debug)]
pub struct Concat {
    a: Arc<FactSet>,
    b: Arc<FactSet>,
}

impl Concat {
    pub fn new(a: FactSet, b: FactSet) -> Self {
        Self {
            a: Arc::new(a),
            b: Arc::new(b),
        }
    }

    pub fn left(&self) -> &FactSet {
        &self.a
    }

    pub fn right(&self) -> &FactSet {
        &self.b
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Fact> + '_> {
        Box::new(self.a.iter().chain(self.b.iter()))
    }

    pub fn size(&self) -> usize {
        self.a.size() + self.b.size()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty()
    }

    pub fn has(&self, part: &str) -> bool {
        self.b.has(part) || self.a.has(part)
    }

    pub fn get(&self, part: &str) -> FactSet {
        match (self.a.has(part), self.b.has(part)) {
            (true, true) => Concat::new(self.a.get(part), self.b.get(part)).into(),
            (false, true) => self.b.get(part),
            (true, false) => self.a.get(part),
            (false, false) => FactSet::Empty,
        }
    }

    pub fn parts(&self) -> Vec<String> {
        let mut parts = self.a.parts();

        for part in self.b.parts() {
            if !parts.contains(&part) {
                parts.push(part);
            }
        }

        parts
    }

    pub fn set_part(&self, name: &str) -> Self {
        Self::new(self.a.set_part(name), self.b.set_part(name))
    }

    pub fn remove(&self, part: &str) -> FactSet {
        both(self.a.remove(part), self.b.remove(part))
    }

    pub fn set_fact_operation(&self, operation: &FactOperation) -> Self {
        Self::new(
            self.a.set_fact_operation(operation.clone()),
            self.b.set_fact_operation(operation.clone()),
        )
    }

    pub fn add_fact_operation(&self, operation: &FactOperation) -> Self {
        Self::new(
            self.a.add_fact_operation(operation),
            self.b.add_fact_operation(operation),
        )
    }

    pub fn filter(&self, predicate: &Predicate) -> Result<FactSet> {
        Ok(both(self.a.filter(predicate)?, self.b.filter(predicate)?))
    }

    pub fn group(&self, key: KeyFn<'_>) -> FactSet {
        group_facts(self.iter(), key)
    }

    pub fn join(&self, other: &FactSet, left: KeyFn<'_>, right: KeyFn<'_>) -> FactSet {
        both(
            self.a.join(other, left, right),
            self.b.join(other, left, right),
        )
    }

    /// Deduplicates per part, across both sides.
    pub fn distinct(&self) -> FactSet {
        MultiPart::from_named(
            self.parts()
                .into_iter()
                .map(|part| (part.as_str().into(), self.get(&part).distinct())),
        )
        .into()
    }

    pub fn intersection(&self, other: &FactSet) -> FactSet {
        both(self.a.intersection(other), self.b.intersection(other))
    }
}

/// Like [`FactSet::union`], but only drops sides without any part, so a
/// part that became empty stays visible.
fn both(a: FactSet, b: FactSet) -> FactSet {
    match (a.parts().is_empty(), b.parts().is_empty()) {
        (true, _) => b,
        (_, true) => a,
        _ => Concat::new(a, b).into(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::term;

    #[test]
    fn test_size_is_sum_of_sides() {
        let a = FactSet::from_terms("a", [term! {"x" => 1}, term! {"x" => 2}]);
        let b = FactSet::from_terms("a", [term! {"x" => 2}]);
        let concat = Concat::new(a, b);

        assert_eq!(concat.size(), 3);
        assert_eq!(concat.iter().count(), 3);
        assert_eq!(concat.distinct().size(), 2);
    }

    #[test]
    fn test_shared_part_concatenates_both_sides() {
        let concat = Concat::new(
            FactSet::from_terms("a", [term! {"x" => 1}]),
            FactSet::parts_of([
                FactSet::from_terms("a", [term! {"x" => 2}]),
                FactSet::from_terms("b", [term! {"y" => 1}]),
            ]),
        );

        assert_eq!(concat.parts(), vec!["a", "b"]);
        assert_eq!(concat.get("a").size(), 2);
        assert_eq!(concat.get("b").size(), 1);
        assert!(concat.get("c").is_empty());
        assert_eq!(concat.remove("a").parts(), vec!["b"]);
    }

    #[test]
    fn test_filter_distributes() -> Result<()> {
        let concat = Concat::new(
            FactSet::from_terms("a", [term! {"x" => 1}, term! {"x" => 5}]),
            FactSet::from_terms("b", [term! {"x" => 7}]),
        );

        let filtered = concat.filter(&Predicate::field_gt("x", 3))?;

        assert_eq!(filtered.size(), 2);
        assert_eq!(filtered.parts(), vec!["a", "b"]);

        Ok(())
    }

    #[test]
    fn test_filter_keeps_emptied_side() -> Result<()> {
        let concat = Concat::new(
            FactSet::from_terms("a", [term! {"x" => 1}]),
            FactSet::from_terms("b", [term! {"x" => 7}]),
        );

        let filtered = concat.filter(&Predicate::field_gt("x", 3))?;

        assert_eq!(filtered.parts(), vec!["a", "b"]);
        assert!(filtered.get("a").is_empty());
        assert_eq!(filtered.get("b").size(), 1);

        Ok(())
    }
}
