use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::value::Val;

/// An immutable record of named fields.
///
/// Fields keep their insertion order, which is observable through
/// [`Term::keys`] and [`Term::first`]. Equality and hashing ignore that
/// order: two terms are equal when they hold the same keys with the same
/// values.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Term {
    fields: Arc<Vec<(Arc<str>, Val)>>,
}

/// Builds a [`Term`] from `key => value` pairs.
#[macro_export]
macro_rules! term {
    () => {
        $crate::term::Term::default()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::term::Term::new([
            $((::std::sync::Arc::<str>::from($key), $crate::value::Val::from($value))),+
        ])
    };
}

impl Term {
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Arc<str>>,
        V: Into<Val>,
    {
        let mut result: Vec<(Arc<str>, Val)> = Vec::new();

        for (k, v) in fields {
            let k = k.into();
            let v = v.into();

            match result.iter_mut().find(|(key, _)| *key == k) {
                Some(slot) => slot.1 = v,
                None => result.push((k, v)),
            }
        }

        Self {
            fields: Arc::new(result),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| &**k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Val> {
        self.fields
            .iter()
            .find_map(|(k, v)| (&**k == key).then_some(v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| &**k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Val> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Val)> {
        self.fields.iter().map(|(k, v)| (&**k, v))
    }

    /// The first value in insertion order.
    pub fn first(&self) -> Option<&Val> {
        self.fields.first().map(|(_, v)| v)
    }

    /// Field union; on a key collision the value of `other` wins.
    pub fn union(&self, other: &Term) -> Term {
        if other.is_empty() {
            return self.clone();
        }

        if self.is_empty() {
            return other.clone();
        }

        Term::new(
            self.fields
                .iter()
                .chain(other.fields.iter())
                .map(|(k, v)| (Arc::clone(k), v.clone())),
        )
    }

    /// Projects onto `keys`, in that order. Missing fields become null.
    pub fn pick<S: AsRef<str>>(&self, keys: &[S]) -> Term {
        Term::new(keys.iter().map(|k| {
            let k = k.as_ref();

            (k, self.get(k).cloned().unwrap_or_default())
        }))
    }

    /// Fields of `self` whose key is also present in `other`.
    pub fn intersection(&self, other: &Term) -> Term {
        Term::new(
            self.fields
                .iter()
                .filter(|(k, _)| other.has(k))
                .map(|(k, v)| (Arc::clone(k), v.clone())),
        )
    }

    pub fn with(&self, key: impl Into<Arc<str>>, value: impl Into<Val>) -> Term {
        let mut fields = (*self.fields).clone();
        let key = key.into();
        let value = value.into();

        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => fields.push((key, value)),
        }

        Term {
            fields: Arc::new(fields),
        }
    }

    pub fn rename(&self, old: &str, new: &str) -> Term {
        let value = self.get(old).cloned().unwrap_or_default();

        Term::new(
            self.fields
                .iter()
                .filter(|(k, _)| &**k != old)
                .map(|(k, v)| (Arc::clone(k), v.clone()))
                .chain([(Arc::<str>::from(new), value)]),
        )
    }

    fn sorted(&self) -> Vec<&(Arc<str>, Val)> {
        let mut sorted: Vec<_> = self.fields.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        sorted
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
            || (self.len() == other.len() && self.sorted() == other.sorted())
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (k, v) in self.sorted() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<String>>()
            .join(", ");

        write!(f, "{{{fields}}}")
    }
}

impl<K: Into<Arc<str>>, V: Into<Val>> FromIterator<(K, V)> for Term {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Term::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use pretty_assertions::assert_eq;

    use super::*;

    fn hash_of(term: &Term) -> u64 {
        let mut hasher = DefaultHasher::new();
        term.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_field_order() {
        let a = term! {"name" => "Homer", "age" => 36};
        let b = term! {"age" => 36, "name" => "Homer"};

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(b.first(), Some(&Val::S32(36)));
    }

    #[test]
    fn test_different_number_kinds_are_different_terms() {
        assert!(term! {"x" => 1} != term! {"x" => 1.0});
    }

    #[test]
    fn test_union_right_wins() {
        let a = term! {"A1" => 1, "B1" => 2};
        let b = term! {"A2" => 4, "B1" => 5};

        assert_eq!(a.union(&b), term! {"A1" => 1, "B1" => 5, "A2" => 4});
        assert_eq!(
            a.union(&b).keys().collect::<Vec<_>>(),
            vec!["A1", "B1", "A2"]
        );
    }

    #[test]
    fn test_pick_and_rename() {
        let homer = term! {"name" => "Homer", "age" => 36, "gender" => "male"};

        assert_eq!(
            homer.pick(&["gender", "hair"]),
            term! {"gender" => "male", "hair" => Val::Null}
        );
        assert_eq!(
            homer.rename("age", "leeftijd"),
            term! {"name" => "Homer", "gender" => "male", "leeftijd" => 36}
        );
        assert_eq!(
            homer.intersection(&term! {"age" => 1}),
            term! {"age" => 36}
        );
    }

    #[test]
    fn test_duplicate_keys_keep_last_value() {
        let t = Term::new([("a", Val::S32(1)), ("b", Val::S32(2)), ("a", Val::S32(3))]);

        assert_eq!(t.len(), 2);
        assert_eq!(t.get("a"), Some(&Val::S32(3)));
        assert_eq!(t.to_string(), "{a: 3, b: 2}");
    }
}
