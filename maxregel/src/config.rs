use serde::{Deserialize, Serialize};

/// When forward chaining considers an iteration quiet.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Convergence {
    /// Quiet when the accumulated update stopped growing.
    #[default]
    UpdateGrowth,
    /// Quiet when the derived parts (those not in the input) stopped
    /// changing.
    PartDifference,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InferenceConfig {
    pub max_iterations: usize,
    pub convergence: Convergence,
}

impl InferenceConfig {
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    pub fn with_convergence(self, convergence: Convergence) -> Self {
        Self {
            convergence,
            ..self
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            convergence: Convergence::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BackwardConfig {
    /// Upper bound on goal resolutions in one run.
    pub max_epochs: usize,
}

impl BackwardConfig {
    pub fn with_max_epochs(self, max_epochs: usize) -> Self {
        Self { max_epochs }
    }
}

impl Default for BackwardConfig {
    fn default() -> Self {
        Self { max_epochs: 100 }
    }
}
