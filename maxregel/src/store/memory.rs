use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::{FactStore, Restriction};
use crate::term::Term;

/// A [`FactStore`] holding its tables in memory.
///
/// Restrictions are evaluated with their source predicate. Every issued
/// query is logged, so tests can check what was pushed down.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Vec<(String, Vec<Term>)>,
    queries: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: impl IntoIterator<Item = Term>) -> Self {
        let name = name.into();
        let rows: Vec<Term> = rows.into_iter().collect();

        match self.tables.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.extend(rows),
            None => self.tables.push((name, rows)),
        }

        self
    }

    /// The queries issued so far, in SQL form.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn log(&self, query: String) {
        debug!(query = query.as_str(), "memory store query");

        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query);
    }

    fn rows<'a>(
        &'a self,
        table: &'a str,
        restriction: Option<&'a Restriction>,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.tables
            .iter()
            .filter(move |(name, _)| name == table)
            .flat_map(|(_, rows)| rows.iter())
            .filter(move |row| match restriction {
                Some(r) => r
                    .predicate()
                    .test(&(*row).clone().into())
                    .unwrap_or(false),
                None => true,
            })
    }
}

fn query(select: &str, table: &str, restriction: Option<&Restriction>) -> String {
    match restriction {
        Some(r) => format!("SELECT {select} FROM {table} WHERE {}", r.sql()),
        None => format!("SELECT {select} FROM {table}"),
    }
}

impl FactStore for MemoryStore {
    fn tables(&self) -> Vec<String> {
        self.tables.iter().map(|(name, _)| name.clone()).collect()
    }

    fn count(&self, table: &str, restriction: Option<&Restriction>) -> usize {
        self.log(query("COUNT(*)", table, restriction));

        self.rows(table, restriction).count()
    }

    fn select(&self, table: &str, restriction: Option<&Restriction>) -> Vec<Term> {
        self.log(query("*", table, restriction));

        self.rows(table, restriction).cloned().collect()
    }
}
