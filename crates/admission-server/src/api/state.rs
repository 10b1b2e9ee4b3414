use admission_evaluator::DecisionEngine;

pub(crate) struct ApiServerState {
    pub(crate) engine: DecisionEngine,
}
