//! Fixtures and `proptest` strategies.

use proptest::prelude::*;

use crate::{fact_set::FactSet, term, term::Term, value::Val};

/// Nine residents of Springfield in the part `simpsons`.
pub fn simpsons() -> FactSet {
    let people = [
        ("Homer", "short", 250, 36, "male"),
        ("Marge", "long", 150, 35, "female"),
        ("Bart", "short", 90, 10, "male"),
        ("Lisa", "middle", 78, 8, "female"),
        ("Maggie", "middle", 20, 1, "female"),
        ("Abe", "short", 170, 70, "male"),
        ("Selma", "long", 160, 41, "female"),
        ("Otto", "long", 180, 38, "male"),
        ("Krusty", "middle", 200, 45, "male"),
    ];

    FactSet::from_terms(
        "simpsons",
        people.into_iter().map(|(name, hair, weight, age, gender)| {
            term! {
                "name" => name,
                "hair" => hair,
                "weight" => weight,
                "age" => age,
                "gender" => gender,
            }
        }),
    )
}

/// Where some of [`simpsons`] live, in the part `residents`.
pub fn residents() -> FactSet {
    let addresses = [
        ("Homer", "742 Evergreen Terrace"),
        ("Marge", "742 Evergreen Terrace"),
        ("Bart", "742 Evergreen Terrace"),
        ("Lisa", "742 Evergreen Terrace"),
        ("Maggie", "742 Evergreen Terrace"),
        ("Abe", "Springfield Retirement Castle"),
        ("Ned", "744 Evergreen Terrace"),
    ];

    FactSet::from_terms(
        "residents",
        addresses
            .into_iter()
            .map(|(name, address)| term! {"name" => name, "address" => address}),
    )
}

pub fn arb_val() -> impl Strategy<Value = Val> {
    prop_oneof![
        Just(Val::Null),
        any::<bool>().prop_map(Val::from),
        any::<i32>().prop_map(Val::from),
        any::<i64>().prop_map(Val::from),
        (-1.0e6..1.0e6).prop_map(Val::f64),
        "[a-z]{0,8}".prop_map(Val::from),
    ]
}

pub fn arb_term() -> impl Strategy<Value = Term> {
    prop::collection::btree_map("[a-e]", arb_val(), 0..4).prop_map(Term::new)
}

/// Up to three parts of up to six terms each.
pub fn arb_fact_set() -> impl Strategy<Value = FactSet> {
    prop::collection::vec(("[p-r]", prop::collection::vec(arb_term(), 0..6)), 0..3).prop_map(
        |parts| {
            parts
                .into_iter()
                .fold(FactSet::Empty, |facts, (part, terms)| {
                    facts.union(&FactSet::from_terms(&part, terms))
                })
        },
    )
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn union_with_empty_is_identity(facts in arb_fact_set()) {
            prop_assert_eq!(facts.union(&FactSet::Empty), facts.clone());
            prop_assert_eq!(FactSet::Empty.union(&facts), facts);
        }

        #[test]
        fn union_size_adds_up(a in arb_fact_set(), b in arb_fact_set()) {
            prop_assert_eq!(a.union(&b).size(), a.size() + b.size());
        }

        #[test]
        fn distinct_is_idempotent(facts in arb_fact_set()) {
            let once = facts.distinct();

            prop_assert_eq!(once.distinct(), once.clone());
            prop_assert_eq!(once, facts);
        }

        #[test]
        fn size_agrees_with_iteration(facts in arb_fact_set()) {
            prop_assert_eq!(facts.size(), facts.iter().count());
            prop_assert_eq!(facts.is_empty(), facts.iter().next().is_none());
        }
    }

    #[test]
    fn test_fixtures() {
        assert_eq!(simpsons().size(), 9);
        assert_eq!(simpsons().parts(), vec!["simpsons"]);
        assert_eq!(residents().size(), 7);
    }
}
