//! Shorthands for assembling rules by hand.
//!
//! ```
//! use maxregel::rule::build::{filter_part, let_, script};
//!
//! # fn main() -> anyhow::Result<()> {
//! let rules = script([
//!     let_("kids", filter_part("simpsons", "age", "<", 18)?),
//!     let_("boys", filter_part("kids", "gender", "==", "male")?),
//! ]);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;

use super::{ArithOp, Assign, AssignKind, FactSetCase, FactSetCaseEntry, Join, Rule, Zip};
use crate::{
    fact_set::FactSet,
    predicate::{CmpOp, FactSetPredicate, Operand, Predicate},
    value::Val,
};

/// `variable = body`
pub fn let_(variable: impl Into<String>, body: Rule) -> Rule {
    Rule::Assign(Assign::new(AssignKind::Set, variable, body))
}

/// `variable += body`
pub fn append(variable: impl Into<String>, body: Rule) -> Rule {
    Rule::Assign(Assign::new(AssignKind::Update, variable, body))
}

pub fn from(part: &str) -> Rule {
    Rule::From(part.to_owned())
}

/// The concatenation of several parts, or a constant empty set for none.
pub fn from_parts(parts: &[&str]) -> Rule {
    let mut parts = parts.iter();

    match parts.next() {
        Some(first) => parts.fold(from(first), |acc, part| {
            Rule::Concat(Box::new(acc), Box::new(from(part)))
        }),
        None => Rule::Const(FactSet::Empty),
    }
}

pub fn cnst(facts: FactSet) -> Rule {
    Rule::Const(facts)
}

/// A single-fact constant `{x: value}`.
pub fn cnst_value(value: impl Into<Val>) -> Rule {
    Rule::Const(FactSet::cnst("x", value))
}

pub fn filter(predicate: Predicate) -> Rule {
    Rule::Filter {
        select: Box::new(Rule::Identity),
        predicate,
    }
}

/// Keeps the facts whose `field` compares to `value` under `op`, e.g. `">="`.
pub fn filter_by(field: &str, op: &str, value: impl Into<Operand>) -> Result<Rule> {
    Ok(filter(predicate(field, op, value)?))
}

/// [`filter_by`] restricted to the facts of `part`.
pub fn filter_part(part: &str, field: &str, op: &str, value: impl Into<Operand>) -> Result<Rule> {
    Ok(from(part).then(filter_by(field, op, value)?))
}

pub fn select<S: AsRef<str>>(fields: &[S]) -> Rule {
    Rule::SelectFields {
        select: Box::new(Rule::Identity),
        fields: fields.iter().map(|f| f.as_ref().to_owned()).collect(),
    }
}

pub fn join(a: Rule, b: Rule, field_a: &str, field_b: &str) -> Rule {
    Rule::Join(Join::new(a, b, field_a, field_b))
}

pub fn arithmetic(op: ArithOp, result_field: impl Into<String>, a: Rule, b: Rule) -> Rule {
    Rule::Zip(Zip::arithmetic(op, result_field, a, b))
}

pub fn add(a: Rule, b: Rule) -> Rule {
    arithmetic(ArithOp::Add, "x", a, b)
}

pub fn sub(a: Rule, b: Rule) -> Rule {
    arithmetic(ArithOp::Sub, "x", a, b)
}

pub fn mul(a: Rule, b: Rule) -> Rule {
    arithmetic(ArithOp::Mul, "x", a, b)
}

pub fn div(a: Rule, b: Rule) -> Rule {
    arithmetic(ArithOp::Div, "x", a, b)
}

/// The right-nested chain `then(r1, then(r2, .. identity))`.
pub fn sequence(rules: impl IntoIterator<Item = Rule>) -> Rule {
    let rules: Vec<Rule> = rules.into_iter().collect();

    rules
        .into_iter()
        .rev()
        .fold(Rule::Identity, |acc, rule| rule.then(acc))
}

pub fn script(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Script(rules.into_iter().collect())
}

pub fn predicate(field: &str, op: &str, value: impl Into<Operand>) -> Result<Predicate> {
    Predicate::compare(field, op, value)
}

/// The comparison operator for a symbol such as `"<="`.
pub fn unbound_predicate(op: &str) -> Result<CmpOp> {
    CmpOp::parse(op)
}

/// An entry that fires when `select` yields anything.
pub fn any_then(select: Rule, then: Rule) -> FactSetCaseEntry {
    FactSetCaseEntry::new(select, FactSetPredicate::Exists, then)
}

pub fn fact_set_case(entries: Vec<FactSetCaseEntry>, default: Rule) -> Rule {
    Rule::FactSetCase(FactSetCase::new(entries, default))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{error::Error, test_utils::simpsons};

    #[test]
    fn test_from_parts() -> Result<()> {
        let facts = simpsons().union(&FactSet::cnst("x", 1));

        assert_eq!(from_parts(&[]).apply(&facts)?, FactSet::Empty);
        assert_eq!(from_parts(&["simpsons"]).apply(&facts)?.size(), 9);
        assert_eq!(from_parts(&["simpsons", "*"]).apply(&facts)?.size(), 10);

        Ok(())
    }

    #[test]
    fn test_sequence_is_right_nested() {
        let rule = sequence([from("a"), from("b")]);

        assert_eq!(
            rule,
            from("a").then(from("b").then(Rule::Identity))
        );
        assert_eq!(sequence(Vec::new()), Rule::Identity);
    }

    #[test]
    fn test_unknown_operator() {
        let err = filter_by("age", "~", 1).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedPredicate(_))
        ));
        assert!(unbound_predicate("<=").is_ok());
    }

    #[test]
    fn test_any_then() -> Result<()> {
        let rule = fact_set_case(
            vec![any_then(
                filter_part("simpsons", "name", "==", "Bart")?,
                cnst_value("bart is home"),
            )],
            cnst_value("nobody home"),
        );

        assert_eq!(rule.apply(&simpsons())?.value(), Some(Val::from("bart is home")));

        Ok(())
    }
}
