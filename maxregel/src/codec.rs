//! Wire encoding of rules and predicates. Both travel as their AST, so
//! decoding goes through the same parsers as any other AST.

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

use crate::{ast::AstNode, predicate::Predicate, rule::Rule};

pub trait Codec {
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T>;

    fn encode_rule(rule: &Rule) -> Result<Vec<u8>> {
        Self::encode(&rule.ast())
    }

    fn decode_rule(bytes: &[u8]) -> Result<Rule> {
        Rule::parse(&Self::decode::<AstNode>(bytes)?)
    }

    fn encode_predicate(predicate: &Predicate) -> Result<Vec<u8>> {
        Self::encode(&predicate.ast())
    }

    fn decode_predicate(bytes: &[u8]) -> Result<Predicate> {
        Predicate::parse(&Self::decode::<AstNode>(bytes)?)
    }
}

/// DAG-CBOR, the deterministic CBOR profile of IPLD.
#[derive(Clone, Copy, Debug, Default)]
pub struct DagCbor;

impl Codec for DagCbor {
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_ipld_dagcbor::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_ipld_dagcbor::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        fact_set::FactSet,
        predicate::Predicate,
        rule::build::{cnst, filter, filter_part, from, let_, script},
        term,
        test_utils::simpsons,
        value::Info,
    };

    #[test]
    fn test_rule_round_trip() -> Result<()> {
        let rules = script([
            let_("old_males", filter_part("simpsons", "age", ">", 40)?),
            let_(
                "santa_candidates",
                from("old_males").then(filter(
                    Predicate::field_eq("hair", "middle").and(Predicate::field_gt("weight", 150)),
                )),
            ),
            let_(
                "constants",
                cnst(FactSet::from_terms("k", [term! {"x" => 1.5, "y" => "z"}])),
            ),
        ]);

        let bytes = DagCbor::encode_rule(&rules)?;
        let decoded = DagCbor::decode_rule(&bytes)?;

        assert_eq!(decoded, rules);
        assert_eq!(decoded.apply(&simpsons())?, rules.apply(&simpsons())?);

        Ok(())
    }

    #[test]
    fn test_predicate_round_trip() -> Result<()> {
        let predicate = Predicate::field_eq("hair", "middle")
            .and(!Predicate::field_lt("age", 18))
            .or(Predicate::field_empty("weight"));

        let decoded = DagCbor::decode_predicate(&DagCbor::encode_predicate(&predicate)?)?;

        assert_eq!(decoded, predicate);
        assert_eq!(
            simpsons().filter(&decoded)?.size(),
            simpsons().filter(&predicate)?.size()
        );

        Ok(())
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(DagCbor::decode_rule(&[0xff, 0x00, 0x13]).is_err());
    }

    #[test]
    fn test_info_survives() -> Result<()> {
        let node = from("simpsons")
            .ast()
            .with_info("rule_name", "everybody");

        let decoded: AstNode = DagCbor::decode(&DagCbor::encode(&node)?)?;

        assert_eq!(decoded, node);
        assert_eq!(
            decoded.info(),
            &Info::unit("rule_name".to_owned(), "everybody".into())
        );

        Ok(())
    }

    #[test]
    fn test_fact_set_round_trip() -> Result<()> {
        let facts = simpsons();
        let decoded: FactSet = DagCbor::decode(&DagCbor::encode(&facts)?)?;

        assert_eq!(decoded, facts);
        assert_eq!(decoded.parts(), vec!["simpsons"]);

        Ok(())
    }
}
