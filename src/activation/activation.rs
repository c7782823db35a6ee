use serde::{Deserialize, Serialize};
use std::f64::consts::E;

/// Per-neuron activation function.
///
/// Softmax is not a variant: it is vector-valued and applied at the layer
/// level by `Layer::apply_softmax()`, after the element-wise activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Sigmoid,
    Tanh,
    ReLU,
    Identity,
}

impl Activation {
    /// Element-wise activation of a pre-activation sum.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            Activation::Tanh => x.tanh(),
            Activation::ReLU => {
                if x > 0.0 {
                    x
                } else {
                    0.0
                }
            }
            Activation::Identity => x,
        }
    }

    /// Derivative expressed in terms of the activation's own output.
    ///
    /// Callers pass the already-activated value, not the pre-activation
    /// sum; backpropagation feeds each neuron's stored output through this.
    pub fn derivative(self, output: f64) -> f64 {
        match self {
            Activation::Sigmoid => output * (1.0 - output),
            Activation::Tanh => 1.0 - output * output,
            Activation::ReLU => {
                if output > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Identity => 1.0,
        }
    }
}
