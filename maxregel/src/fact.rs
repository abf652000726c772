use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    ast::AstNode,
    term::Term,
    value::{Info, Val},
};

/// Provenance metadata attached to a [`Fact`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Provenance {
    pub info: Info,
    pub rules: Vec<AstNode>,
    pub epoch: u64,
}

/// A [`Term`] plus mutable provenance.
///
/// Clones of a fact share their provenance, so a tracer that records a rule
/// on a fact is visible through every fact set holding that fact. Equality
/// and hashing only look at the term.
#[derive(Clone)]
pub struct Fact {
    term: Term,
    provenance: Arc<RwLock<Provenance>>,
}

impl Fact {
    pub fn new(term: Term) -> Self {
        Self::with_provenance(term, Provenance::default())
    }

    pub fn with_info(term: Term, info: Info) -> Self {
        Self::with_provenance(
            term,
            Provenance {
                info,
                ..Default::default()
            },
        )
    }

    pub fn with_provenance(term: Term, provenance: Provenance) -> Self {
        Self {
            term,
            provenance: Arc::new(RwLock::new(provenance)),
        }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn get(&self, key: &str) -> Option<&Val> {
        self.term.get(key)
    }

    /// The same fact seen through another term, as fact operations such as
    /// select or rename produce it. The provenance stays shared, so tracing
    /// the reshaped fact records on the stored one.
    pub fn with_term(&self, term: Term) -> Self {
        Self {
            term,
            provenance: Arc::clone(&self.provenance),
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.read().clone()
    }

    pub fn info(&self) -> Info {
        self.read().info.clone()
    }

    pub fn set_info(&self, info: Info) {
        self.write().info = info;
    }

    /// Merges `info` into the current info; `info` wins on collisions.
    pub fn merge_info(&self, info: &Info) {
        let mut provenance = self.write();
        provenance.info = info.clone().union(provenance.info.clone());
    }

    pub fn rules(&self) -> Vec<AstNode> {
        self.read().rules.clone()
    }

    pub fn add_rule(&self, rule: AstNode) {
        self.write().rules.push(rule);
    }

    /// Adds `rule` unless an equal rule was recorded before.
    pub fn add_rule_once(&self, rule: AstNode) {
        let mut provenance = self.write();

        if !provenance.rules.contains(&rule) {
            provenance.rules.push(rule);
        }
    }

    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    pub fn set_epoch(&self, epoch: u64) {
        self.write().epoch = epoch;
    }

    pub fn increment_epoch(&self) {
        self.write().epoch += 1;
    }

    /// Field union of both terms (right wins), merged info (right wins),
    /// concatenated rules and the maximum epoch.
    pub fn union(&self, other: &Fact) -> Fact {
        let left = self.provenance();
        let right = other.provenance();

        let mut rules = left.rules;
        rules.extend(right.rules);

        Fact::with_provenance(
            self.term.union(&other.term),
            Provenance {
                info: right.info.union(left.info),
                rules,
                epoch: left.epoch.max(right.epoch),
            },
        )
    }

    fn read(&self) -> RwLockReadGuard<'_, Provenance> {
        self.provenance
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Provenance> {
        self.provenance
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Term> for Fact {
    fn from(term: Term) -> Self {
        Fact::new(term)
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term.hash(state)
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provenance = self.read();

        f.debug_struct("Fact")
            .field("term", &self.term)
            .field("info", &provenance.info)
            .field("rules", &provenance.rules.len())
            .field("epoch", &provenance.epoch)
            .finish()
    }
}

impl Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provenance = self.read();

        write!(f, "{} @ {}", self.term, provenance.epoch)
    }
}
