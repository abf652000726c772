use std::fmt::{self, Display};

use anyhow::Result;
use derive_more::{From, IsVariant};
use serde::{Deserialize, Serialize};

use crate::{
    error::{error, Error},
    fact_set::FactSet,
    value::{Info, Val},
};

/// The canonical `(operator, metadata, arguments)` form of every rule and
/// predicate.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    op: String,
    info: Info,
    args: Vec<Arg>,
}

#[derive(Clone, Debug, Eq, From, Hash, IsVariant, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    Val(Val),
    Node(AstNode),
    List(Vec<Arg>),
    Facts(FactSet),
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Val(value.into())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Val(value.into())
    }
}

impl Arg {
    pub fn strings<S: AsRef<str>>(values: &[S]) -> Self {
        Arg::List(values.iter().map(|v| Arg::from(v.as_ref())).collect())
    }

    pub fn as_node(&self) -> Option<&AstNode> {
        match self {
            Arg::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_val(&self) -> Option<&Val> {
        match self {
            Arg::Val(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Arg]> {
        match self {
            Arg::List(items) => Some(items),
            _ => None,
        }
    }
}

impl AstNode {
    pub fn new(op: impl Into<String>, info: Info, args: impl IntoIterator<Item = Arg>) -> Self {
        Self {
            op: op.into(),
            info,
            args: args.into_iter().collect(),
        }
    }

    pub fn leaf(op: impl Into<String>, args: impl IntoIterator<Item = Arg>) -> Self {
        Self::new(op, Info::default(), args)
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn with_info(&self, key: impl Into<String>, value: impl Into<Val>) -> Self {
        Self {
            op: self.op.clone(),
            info: self.info.update(key.into(), value.into()),
            args: self.args.clone(),
        }
    }

    pub fn with_args(&self, args: Vec<Arg>) -> Self {
        Self {
            op: self.op.clone(),
            info: self.info.clone(),
            args,
        }
    }

    pub fn arg(&self, i: usize) -> Result<&Arg> {
        match self.args.get(i) {
            Some(arg) => Ok(arg),
            None => error(self.malformed(format!("missing argument {i}"))),
        }
    }

    pub fn node_arg(&self, i: usize) -> Result<&AstNode> {
        match self.arg(i)? {
            Arg::Node(node) => Ok(node),
            other => error(self.malformed(format!("argument {i} is not a node: {other}"))),
        }
    }

    pub fn val_arg(&self, i: usize) -> Result<&Val> {
        match self.arg(i)? {
            Arg::Val(v) => Ok(v),
            other => error(self.malformed(format!("argument {i} is not a value: {other}"))),
        }
    }

    /// A string argument. Other scalar values are converted to their key string.
    pub fn str_arg(&self, i: usize) -> Result<String> {
        Ok(self.val_arg(i)?.key_string())
    }

    pub fn list_arg(&self, i: usize) -> Result<&[Arg]> {
        match self.arg(i)? {
            Arg::List(items) => Ok(items),
            other => error(self.malformed(format!("argument {i} is not a list: {other}"))),
        }
    }

    pub fn strings_arg(&self, i: usize) -> Result<Vec<String>> {
        self.list_arg(i)?
            .iter()
            .map(|item| match item {
                Arg::Val(v) => Ok(v.key_string()),
                other => error(self.malformed(format!("list item is not a value: {other}"))),
            })
            .collect()
    }

    pub fn facts_arg(&self, i: usize) -> Result<&FactSet> {
        match self.arg(i)? {
            Arg::Facts(facts) => Ok(facts),
            other => error(self.malformed(format!("argument {i} is not a fact set: {other}"))),
        }
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedAst(self.op.clone(), reason.into())
    }

    /// Pre-order walk over this node and every node nested in its arguments.
    /// Returning `false` from `visit` skips the children of that node.
    pub fn walk(&self, visit: &mut impl FnMut(&AstNode) -> bool) {
        if visit(self) {
            for arg in &self.args {
                arg.walk(visit);
            }
        }
    }

    /// Rebuilds the tree bottom-up, passing every node through `f`.
    pub fn map_nodes(&self, f: &mut impl FnMut(AstNode) -> AstNode) -> AstNode {
        let args = self.args.iter().map(|arg| arg.map_nodes(f)).collect();

        f(self.with_args(args))
    }

    pub fn sub_nodes(&self) -> Vec<&AstNode> {
        let mut nodes = Vec::new();
        self.collect_nodes(&mut nodes);

        nodes
    }

    fn collect_nodes<'a>(&'a self, nodes: &mut Vec<&'a AstNode>) {
        nodes.push(self);

        for arg in &self.args {
            arg.collect_nodes(nodes);
        }
    }
}

impl Arg {
    fn walk(&self, visit: &mut impl FnMut(&AstNode) -> bool) {
        match self {
            Arg::Node(node) => node.walk(visit),
            Arg::List(items) => items.iter().for_each(|item| item.walk(visit)),
            Arg::Val(_) | Arg::Facts(_) => {}
        }
    }

    fn map_nodes(&self, f: &mut impl FnMut(AstNode) -> AstNode) -> Arg {
        match self {
            Arg::Node(node) => Arg::Node(node.map_nodes(f)),
            Arg::List(items) => Arg::List(items.iter().map(|item| item.map_nodes(f)).collect()),
            other => other.clone(),
        }
    }

    fn collect_nodes<'a>(&'a self, nodes: &mut Vec<&'a AstNode>) {
        match self {
            Arg::Node(node) => node.collect_nodes(nodes),
            Arg::List(items) => items.iter().for_each(|item| item.collect_nodes(nodes)),
            Arg::Val(_) | Arg::Facts(_) => {}
        }
    }
}

impl Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<String>>()
            .join(", ");

        write!(f, "{}({})", self.op, args)
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Val(v) => Display::fmt(v, f),
            Arg::Node(node) => Display::fmt(node, f),
            Arg::List(items) => {
                let items = items
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");

                write!(f, "[{items}]")
            }
            Arg::Facts(facts) => write!(f, "<{} facts>", facts.size()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn example() -> AstNode {
        AstNode::leaf(
            "assign_set",
            [
                "old".into(),
                AstNode::leaf(
                    "filter",
                    [
                        AstNode::leaf("from", ["simpsons".into()]).into(),
                        AstNode::leaf("field_gt", ["age".into(), Val::S32(40).into()]).into(),
                    ],
                )
                .into(),
            ],
        )
    }

    #[test]
    fn test_display() {
        assert_eq!(
            example().to_string(),
            r#"assign_set("old", filter(from("simpsons"), field_gt("age", 40)))"#
        );
    }

    #[test]
    fn test_walk_and_sub_nodes() {
        let node = example();
        let ops = node
            .sub_nodes()
            .into_iter()
            .map(|n| n.op().to_owned())
            .collect::<Vec<_>>();

        assert_eq!(ops, vec!["assign_set", "filter", "from", "field_gt"]);

        let mut visited = Vec::new();
        node.walk(&mut |n| {
            visited.push(n.op().to_owned());
            n.op() != "filter"
        });

        assert_eq!(visited, vec!["assign_set", "filter"]);
    }

    #[test]
    fn test_info_participates_in_equality() {
        let node = example();
        let annotated = node.with_info("rule_name", "old");

        assert!(node != annotated);
        assert_eq!(annotated.info().get("rule_name"), Some(&Val::from("old")));
    }

    #[test]
    fn test_malformed_arguments() {
        let node = example();

        assert_eq!(node.str_arg(0).ok(), Some("old".to_owned()));
        assert!(node.node_arg(0).is_err());
        assert!(node.arg(5).is_err());
    }
}
