use std::collections::{HashMap, HashSet};

use crate::{
    assignment::Backward,
    ast::AstNode,
    fact_set::FactSet,
    tracer::{NoTracer, Tracer},
};

/// State shared by the rules of one evaluation run: the tracer, the results
/// of `cached` rules and the `once` rules that already fired. During
/// backward chaining it also holds the assignments that missing parts are
/// resolved from.
#[derive(Debug)]
pub struct Session {
    tracer: Box<dyn Tracer>,
    cache: HashMap<AstNode, FactSet>,
    fired: HashSet<AstNode>,
    backward: Option<Backward>,
}

impl Session {
    pub fn new(tracer: impl Tracer + 'static) -> Self {
        Self::with_tracer(Box::new(tracer))
    }

    pub fn with_tracer(tracer: Box<dyn Tracer>) -> Self {
        Self {
            tracer,
            cache: HashMap::default(),
            fired: HashSet::default(),
            backward: None,
        }
    }

    pub fn tracer(&self) -> &dyn Tracer {
        self.tracer.as_ref()
    }

    pub(crate) fn cached(&self, rule: &AstNode) -> Option<FactSet> {
        self.cache.get(rule).cloned()
    }

    pub(crate) fn cache(&mut self, rule: AstNode, facts: FactSet) {
        self.cache.insert(rule, facts);
    }

    pub(crate) fn with_backward(mut self, backward: Backward) -> Self {
        self.backward = Some(backward);
        self
    }

    pub(crate) fn backward(&mut self) -> Option<&mut Backward> {
        self.backward.as_mut()
    }

    /// Marks `rule` as fired. Returns whether this is the first time.
    pub(crate) fn fire(&mut self, rule: AstNode) -> bool {
        self.fired.insert(rule)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(NoTracer)
    }
}
