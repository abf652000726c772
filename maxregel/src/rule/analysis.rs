//! Static inspection and rewriting of rule trees.

use std::collections::BTreeSet;

use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};

use super::{AssignKind, FactSetCase, ReturnIf, Rule};
use crate::{
    ast::{Arg, AstNode},
    value::{Info, Val},
};

pub const RULE_NAME: &str = "rule_name";
pub const DEPENDS_ON: &str = "depends_on";

pub fn is_assignment(node: &AstNode) -> bool {
    AssignKind::parse(node.op()).is_some()
}

/// Every node of the tree in pre-order, leaving out the subtrees rooted at
/// nodes for which `skip` holds.
pub fn sub_nodes(node: &AstNode, skip: impl Fn(&AstNode) -> bool) -> Vec<&AstNode> {
    let mut nodes = Vec::new();
    collect_node(node, &skip, &mut nodes);

    nodes
}

fn collect_node<'a>(node: &'a AstNode, skip: &impl Fn(&AstNode) -> bool, nodes: &mut Vec<&'a AstNode>) {
    if skip(node) {
        return;
    }

    nodes.push(node);

    for arg in node.args() {
        collect_arg(arg, skip, nodes);
    }
}

fn collect_arg<'a>(arg: &'a Arg, skip: &impl Fn(&AstNode) -> bool, nodes: &mut Vec<&'a AstNode>) {
    match arg {
        Arg::Node(node) => collect_node(node, skip, nodes),
        Arg::List(items) => {
            for item in items {
                collect_arg(item, skip, nodes);
            }
        }
        Arg::Val(_) | Arg::Facts(_) => {}
    }
}

/// The parts read by `node` through `from`, in order of first appearance.
pub fn parts_read(node: &AstNode) -> Vec<String> {
    let mut parts = Vec::new();

    node.walk(&mut |n| {
        if n.op() == "from" {
            if let Ok(part) = n.str_arg(0) {
                if !parts.contains(&part) {
                    parts.push(part);
                }
            }
        }
        true
    });

    parts
}

/// The parts an assignment's body reads; empty for anything else.
pub fn dependencies(rule: &Rule) -> Vec<String> {
    match rule {
        Rule::Assign(assign) => parts_read(&assign.body().ast()),
        _ => Vec::new(),
    }
}

/// Tags every assignment in the tree with its `rule_name` and, when its
/// body reads any parts, the `depends_on` list of those parts.
pub fn annotate_dependencies(node: &AstNode) -> AstNode {
    node.map_nodes(&mut |n| {
        if !is_assignment(&n) {
            return n;
        }

        let (name, body) = match (n.str_arg(0), n.node_arg(1)) {
            (Ok(name), Ok(body)) => (name, parts_read(body)),
            _ => return n,
        };

        let n = n.with_info(RULE_NAME, name);

        if body.is_empty() {
            n
        } else {
            n.with_info(DEPENDS_ON, Val::from(body))
        }
    })
}

/// The `(variable, body)` pairs of every assignment in the tree.
fn assignments(node: &AstNode) -> Vec<(String, &AstNode)> {
    let mut found = Vec::new();

    for n in node.sub_nodes() {
        if is_assignment(n) {
            if let (Ok(name), Ok(body)) = (n.str_arg(0), n.node_arg(1)) {
                found.push((name, body));
            }
        }
    }

    found
}

/// Variables as nodes, with an edge from every part an assignment reads to
/// the variable it assigns.
pub fn dependency_graph(rule: &Rule) -> DiGraph<String, ()> {
    let ast = rule.ast();
    let mut graph = DiGraph::<String, ()>::default();
    let mut nodes = im::HashMap::<String, NodeIndex>::default();

    let mut node_for = |graph: &mut DiGraph<String, ()>, name: &str| -> NodeIndex {
        *nodes
            .entry(name.to_owned())
            .or_insert_with(|| graph.add_node(name.to_owned()))
    };

    for (variable, body) in assignments(&ast) {
        let to = node_for(&mut graph, &variable);

        for part in parts_read(body) {
            let from = node_for(&mut graph, &part);

            if graph.find_edge(from, to).is_none() {
                graph.add_edge(from, to, ());
            }
        }
    }

    graph
}

/// The variables that, directly or through others, depend on themselves.
pub fn recursive_variables(rule: &Rule) -> Vec<String> {
    let graph = dependency_graph(rule);
    let mut recursive = BTreeSet::new();

    for scc in petgraph::algo::kosaraju_scc(&graph) {
        let cyclic = scc.len() > 1
            || scc.iter().any(|node| {
                graph
                    .edges_directed(*node, Direction::Outgoing)
                    .any(|edge| edge.target() == *node)
            });

        if cyclic {
            recursive.extend(scc.iter().filter_map(|node| graph.node_weight(*node).cloned()));
        }
    }

    recursive.into_iter().collect()
}

/// Rewrites `then(then(a, b), c)` into `then(a, then(b, c))`, at every
/// depth.
pub fn ensure_right_associative_then(rule: Rule) -> Rule {
    match rule {
        Rule::Then(a, b) => {
            let left = ensure_right_associative_then(*a);
            let right = ensure_right_associative_then(*b);

            match left {
                Rule::Then(la, lb) => Rule::Then(
                    la,
                    Box::new(ensure_right_associative_then((*lb).then(right))),
                ),
                left => left.then(right),
            }
        }
        rule => rule,
    }
}

/// The same branching as a script of early returns followed by the
/// default.
pub fn fact_set_case_to_script(case: &FactSetCase) -> Rule {
    let mut rules: Vec<Rule> = case
        .entries()
        .iter()
        .map(|entry| {
            Rule::ReturnIf(ReturnIf::new(
                entry.select.clone(),
                entry.condition.clone(),
                entry.consequence.clone(),
            ))
        })
        .collect();

    rules.push(case.default_rule().clone());

    Rule::Script(rules)
}

/// The metadata of the assignments directly in `rule`, descending into
/// scripts only.
pub fn top_level_infos(rule: &Rule) -> Vec<Info> {
    match rule {
        Rule::Script(rules) => rules.iter().flat_map(top_level_infos).collect(),
        Rule::Assign(assign) => vec![assign.info().clone()],
        _ => Vec::new(),
    }
}
