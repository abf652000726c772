use std::{fmt, sync::Arc};

use anyhow::Result;
use tracing::debug;

use super::{FactOperation, FactSet, MultiPart, SinglePart};
use crate::{
    fact::Fact,
    predicate::Predicate,
    store::{FactStore, Restriction},
};

/// A fact set over the tables of a [`FactStore`]. Every table is a part.
///
/// Nothing is fetched until the facts are iterated. Sizes are counted by
/// the store and filters are pushed down to it as restrictions.
#[derive(Clone)]
pub struct ExternalFactSet {
    store: Arc<dyn FactStore>,
    tables: Arc<Vec<String>>,
    restriction: Option<Restriction>,
    operation: FactOperation,
}

impl ExternalFactSet {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        let tables = store.tables();

        Self {
            store,
            tables: Arc::new(tables),
            restriction: None,
            operation: FactOperation::identity(),
        }
    }

    pub fn store(&self) -> &Arc<dyn FactStore> {
        &self.store
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    pub fn operation(&self) -> &FactOperation {
        &self.operation
    }

    pub fn with_operation(&self, operation: FactOperation) -> Self {
        Self {
            operation,
            ..self.clone()
        }
    }

    fn with_tables(&self, tables: Vec<String>) -> Self {
        Self {
            tables: Arc::new(tables),
            ..self.clone()
        }
    }

    fn table_facts(&self, table: &str) -> impl Iterator<Item = Fact> + '_ {
        self.store
            .select(table, self.restriction.as_ref())
            .into_iter()
            .map(move |term| self.operation.apply(Fact::new(term)))
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Fact> + '_> {
        Box::new(self.tables.iter().flat_map(|table| self.table_facts(table)))
    }

    pub fn size(&self) -> usize {
        self.tables
            .iter()
            .map(|table| self.store.count(table, self.restriction.as_ref()))
            .sum()
    }

    pub fn has(&self, part: &str) -> bool {
        self.tables.iter().any(|table| table == part)
    }

    pub fn get(&self, part: &str) -> FactSet {
        if !self.has(part) {
            return FactSet::Empty;
        }

        if self.tables.len() == 1 {
            return self.clone().into();
        }

        self.with_tables(vec![part.to_owned()]).into()
    }

    pub fn parts(&self) -> Vec<String> {
        self.tables.to_vec()
    }

    /// Tables cannot be renamed, so the rows are fetched into a part
    /// called `name`.
    pub fn set_part(&self, name: &str) -> SinglePart {
        SinglePart::new(name, self.iter().collect())
    }

    pub fn remove(&self, part: &str) -> FactSet {
        let tables = self
            .tables
            .iter()
            .filter(|table| *table != part)
            .cloned()
            .collect();

        self.with_tables(tables).into()
    }

    /// Pushes `predicate` down to the store. Predicates the store cannot
    /// express are an error rather than a silent full scan.
    ///
    /// When a fact operation is set the rows seen by the store differ from
    /// the facts seen by the predicate, so the facts are filtered in memory.
    pub fn filter(&self, predicate: &Predicate) -> Result<FactSet> {
        if !self.operation.is_identity() {
            return self.materialize().filter(predicate);
        }

        let restriction = Restriction::new(predicate.clone())?;
        let restriction = match &self.restriction {
            Some(existing) => existing.and(&restriction),
            None => restriction,
        };

        debug!(restriction = restriction.sql(), "pushing down filter");

        Ok(Self {
            restriction: Some(restriction),
            ..self.clone()
        }
        .into())
    }

    /// Fetches every table into memory.
    pub fn materialize(&self) -> FactSet {
        MultiPart::from_named(self.tables.iter().map(|table| {
            let facts = SinglePart::new(table.as_str(), self.table_facts(table).collect());

            (table.as_str().into(), facts.into())
        }))
        .into()
    }
}

impl fmt::Debug for ExternalFactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalFactSet")
            .field("store", &self.store)
            .field("tables", &self.tables)
            .field("restriction", &self.restriction.as_ref().map(Restriction::sql))
            .field("operation", &self.operation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{error::Error, store::memory::MemoryStore, term, value::Val};

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_table(
                    "people",
                    [
                        term! {"name" => "Homer", "age" => 36},
                        term! {"name" => "Marge", "age" => 35},
                        term! {"name" => "Bart", "age" => 10},
                    ],
                )
                .with_table("pets", [term! {"name" => "Santa's Little Helper"}]),
        )
    }

    #[test]
    fn test_parts_are_tables() {
        let facts = FactSet::external(store());

        assert_eq!(facts.parts(), vec!["people", "pets"]);
        assert_eq!(facts.size(), 4);
        assert_eq!(facts.get("people").size(), 3);
        assert!(facts.get("cars").is_empty());
        assert_eq!(facts.remove("people").parts(), vec!["pets"]);
    }

    #[test]
    fn test_filters_are_pushed_down() -> Result<()> {
        let store = store();
        let facts = FactSet::external(store.clone()).get("people");

        let adults = facts
            .filter(&Predicate::field_gt("age", 18))?
            .filter(&Predicate::field_neq("name", "Homer"))?;

        assert!(matches!(adults, FactSet::External(_)));
        assert_eq!(adults.field_values("name"), vec![Val::from("Marge")]);
        assert_eq!(
            store.queries().last().map(String::as_str),
            Some(r#"SELECT * FROM people WHERE ("age" > 18) AND ("name" <> 'Homer')"#)
        );

        Ok(())
    }

    #[test]
    fn test_untranslatable_filter_fails() {
        let facts = FactSet::external(store());
        let err = facts
            .filter(&Predicate::field_in("name", vec!["Bart"]))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_set_part_materializes() {
        let facts = FactSet::external(store()).set_part("everyone");

        assert!(matches!(facts, FactSet::SinglePart(_)));
        assert_eq!(facts.parts(), vec!["everyone"]);
        assert_eq!(facts.size(), 4);
    }
}
