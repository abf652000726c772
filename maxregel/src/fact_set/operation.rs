use std::{
    fmt::{self, Debug},
    sync::Arc,
};

use as_any::{AsAny, Downcast};
use dyn_clone::DynClone;

use crate::{
    ast::{Arg, AstNode},
    fact::Fact,
    value::Info,
};

/// A transformation applied lazily to every fact when a fact set is iterated.
pub trait FactOp: Debug + DynClone + Send + Sync + AsAny + 'static {
    fn apply(&self, fact: Fact) -> Fact;

    fn ast(&self) -> AstNode;
}

dyn_clone::clone_trait_object!(FactOp);

#[derive(Clone, Debug)]
pub struct FactOperation(Box<dyn FactOp>);

impl FactOperation {
    pub fn new(op: impl FactOp) -> Self {
        Self(Box::new(op))
    }

    pub fn identity() -> Self {
        Self::new(Identity)
    }

    /// An operation backed by a closure. `name` is only used in its AST.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Fact) -> Fact + Send + Sync + 'static,
    {
        Self::new(FnOp {
            name: name.into(),
            f: Arc::new(f),
        })
    }

    pub fn select_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        Self::new(SelectFields {
            fields: fields.iter().map(|f| f.as_ref().to_owned()).collect(),
        })
    }

    pub fn rename_field(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self::new(RenameField {
            old: old.into(),
            new: new.into(),
        })
    }

    pub fn add_fact_info(info: Info) -> Self {
        Self::new(AddFactInfo { info })
    }

    pub fn is_identity(&self) -> bool {
        (*self.0).downcast_ref::<Identity>().is_some()
    }

    pub fn apply(&self, fact: Fact) -> Fact {
        self.0.apply(fact)
    }

    /// `self` followed by `next`, skipping identities.
    pub fn then(&self, next: &FactOperation) -> FactOperation {
        if self.is_identity() {
            next.clone()
        } else if next.is_identity() {
            self.clone()
        } else {
            Self::new(Then {
                first: self.clone(),
                second: next.clone(),
            })
        }
    }

    pub fn ast(&self) -> AstNode {
        self.0.ast()
    }
}

impl Default for FactOperation {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Identity;

impl FactOp for Identity {
    fn apply(&self, fact: Fact) -> Fact {
        fact
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf("identity", [])
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Then {
    first: FactOperation,
    second: FactOperation,
}

impl FactOp for Then {
    fn apply(&self, fact: Fact) -> Fact {
        self.second.apply(self.first.apply(fact))
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf("then", [self.first.ast().into(), self.second.ast().into()])
    }
}

/// Projects every fact onto `fields`; missing fields become null.
#[derive(Clone, Debug)]
pub(crate) struct SelectFields {
    fields: Vec<String>,
}

impl FactOp for SelectFields {
    fn apply(&self, fact: Fact) -> Fact {
        fact.with_term(fact.term().pick(&self.fields))
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf("select", [Arg::strings(&self.fields)])
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RenameField {
    old: String,
    new: String,
}

impl FactOp for RenameField {
    fn apply(&self, fact: Fact) -> Fact {
        if !fact.term().has(&self.old) {
            return fact;
        }

        fact.with_term(fact.term().rename(&self.old, &self.new))
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(
            "rename_field",
            [self.old.as_str().into(), self.new.as_str().into()],
        )
    }
}

/// Merges `info` into the provenance of every fact it sees.
#[derive(Clone, Debug)]
pub(crate) struct AddFactInfo {
    info: Info,
}

impl FactOp for AddFactInfo {
    fn apply(&self, fact: Fact) -> Fact {
        fact.merge_info(&self.info);
        fact
    }

    fn ast(&self) -> AstNode {
        AstNode::new("add_fact_info", self.info.clone(), [])
    }
}

#[derive(Clone)]
pub(crate) struct FnOp {
    name: String,
    f: Arc<dyn Fn(Fact) -> Fact + Send + Sync>,
}

impl Debug for FnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOp").field("name", &self.name).finish()
    }
}

impl FactOp for FnOp {
    fn apply(&self, fact: Fact) -> Fact {
        (self.f)(fact)
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf("fact_fn", [self.name.as_str().into()])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{term, value::Val};

    #[test]
    fn test_then_skips_identities() {
        let select = FactOperation::select_fields(&["name"]);

        assert!(FactOperation::identity().is_identity());
        assert!(FactOperation::identity()
            .then(&FactOperation::identity())
            .is_identity());
        assert_eq!(
            FactOperation::identity().then(&select).ast(),
            select.ast()
        );
        assert_eq!(select.then(&FactOperation::identity()).ast(), select.ast());
    }

    #[test]
    fn test_select_then_rename() {
        let op = FactOperation::select_fields(&["name", "age"])
            .then(&FactOperation::rename_field("age", "leeftijd"));
        let fact = Fact::new(term! {"name" => "Homer", "age" => 36, "hair" => "short"});

        assert_eq!(
            op.apply(fact).term(),
            &term! {"name" => "Homer", "leeftijd" => 36}
        );
        assert_eq!(op.ast().op(), "then");
    }

    #[test]
    fn test_add_fact_info() {
        let op = FactOperation::add_fact_info(Info::unit("source".to_owned(), "census".into()));
        let fact = op.apply(Fact::new(term! {"x" => 1}));

        assert_eq!(fact.info().get("source"), Some(&Val::from("census")));
    }

    #[test]
    fn test_from_fn() {
        let op = FactOperation::from_fn("double", |fact| {
            let x = fact.get("x").and_then(Val::as_f64).unwrap_or_default();
            fact.with_term(term! {"x" => x * 2.0})
        });

        assert_eq!(
            op.apply(Fact::new(term! {"x" => 2})).term(),
            &term! {"x" => 4.0}
        );
        assert_eq!(op.ast().to_string(), r#"fact_fn("double")"#);
    }
}
