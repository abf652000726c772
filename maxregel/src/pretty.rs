use pretty::RcDoc;

use crate::{
    ast::{Arg, AstNode},
    fact::Fact,
    fact_set::FactSet,
    predicate::{FactSetPredicate, Predicate},
    rule::Rule,
    term::Term,
    value::Val,
};

pub trait Pretty {
    fn to_doc(&self) -> RcDoc<'_, ()>;

    fn to_pretty(&self, width: usize) -> String {
        self.to_doc().pretty(width).to_string()
    }
}

fn node_doc<'a>(node: &AstNode) -> RcDoc<'a, ()> {
    if node.args().is_empty() {
        return RcDoc::text(format!("{}()", node.op()));
    }

    RcDoc::text(format!("{}(", node.op()))
        .append(
            RcDoc::line_()
                .append(RcDoc::intersperse(
                    node.args().iter().map(arg_doc),
                    RcDoc::text(",").append(RcDoc::line()),
                ))
                .nest(2),
        )
        .append(RcDoc::line_())
        .append(RcDoc::text(")"))
        .group()
}

fn arg_doc<'a>(arg: &Arg) -> RcDoc<'a, ()> {
    match arg {
        Arg::Val(v) => RcDoc::as_string(v),
        Arg::Node(node) => node_doc(node),
        Arg::List(items) => RcDoc::text("[")
            .append(
                RcDoc::intersperse(
                    items.iter().map(arg_doc),
                    RcDoc::text(",").append(RcDoc::line()),
                )
                .nest(1),
            )
            .append(RcDoc::text("]"))
            .group(),
        Arg::Facts(facts) => RcDoc::text(format!("<{} facts>", facts.size())),
    }
}

fn term_doc<'a>(term: &Term) -> RcDoc<'a, ()> {
    RcDoc::text("{")
        .append(
            RcDoc::intersperse(
                term.iter()
                    .map(|(k, v)| RcDoc::text(format!("{k}: ")).append(RcDoc::as_string(v))),
                RcDoc::text(",").append(RcDoc::line()),
            )
            .nest(1),
        )
        .append(RcDoc::text("}"))
        .group()
}

impl Pretty for Val {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        RcDoc::as_string(self)
    }
}

impl Pretty for Term {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        term_doc(self)
    }
}

impl Pretty for Fact {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        term_doc(self.term())
    }
}

impl Pretty for AstNode {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        node_doc(self)
    }
}

impl Pretty for Rule {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        node_doc(&self.ast())
    }
}

impl Pretty for Predicate {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        node_doc(&self.ast())
    }
}

impl Pretty for FactSetPredicate {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        node_doc(&self.ast())
    }
}

impl Pretty for FactSet {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        let parts = self.as_map().into_iter().map(|(part, facts)| {
            RcDoc::text(format!("{part} = ["))
                .append(
                    RcDoc::hardline()
                        .append(RcDoc::intersperse(
                            facts.iter().map(|fact| term_doc(fact.term())),
                            RcDoc::text(",").append(RcDoc::hardline()),
                        ))
                        .nest(2),
                )
                .append(RcDoc::hardline())
                .append(RcDoc::text("]"))
        });

        RcDoc::text("{")
            .append(
                RcDoc::hardline()
                    .append(RcDoc::intersperse(
                        parts,
                        RcDoc::text(",").append(RcDoc::hardline()),
                    ))
                    .nest(2),
            )
            .append(RcDoc::hardline())
            .append(RcDoc::text("}"))
    }
}
