use std::io::{Read, Write};

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::error::{Error, Result};

/// Gradients are clamped to this magnitude on every write.
const GRADIENT_CLIP: f64 = 10.0;

/// A single artificial neuron: the inputs it currently sees, the weights
/// applied to them, a fixed bias, and the output/gradient slots written
/// during propagation.
///
/// The weight vector always has the same length as the input vector; every
/// setter either enforces or restores that.
#[derive(Debug, Clone)]
pub struct Neuron {
    inputs: Vec<f64>,
    weights: Vec<f64>,
    bias: f64,
    output: f64,
    gradient: f64,
}

impl Default for Neuron {
    /// An unconnected neuron: no inputs, no weights, bias 1.0.
    fn default() -> Neuron {
        Neuron {
            inputs: Vec::new(),
            weights: Vec::new(),
            bias: 1.0,
            output: 0.0,
            gradient: 0.0,
        }
    }
}

impl Neuron {
    /// Creates a neuron with `fan_in` zeroed inputs and freshly drawn
    /// weights. A fan-in of zero builds an input-layer neuron that carries
    /// no weights at all.
    pub fn new(fan_in: usize, rng: &mut StdRng) -> Neuron {
        let mut neuron = Neuron {
            inputs: vec![0.0; fan_in],
            ..Neuron::default()
        };
        neuron.initialize_weights(fan_in, rng);
        neuron
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn gradient(&self) -> f64 {
        self.gradient
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Mutable view of the weights. A slice, so values can be tuned in
    /// place but the fan-in cannot change.
    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Replaces the inputs without touching the weights. The new inputs
    /// must match the current fan-in exactly.
    pub fn set_inputs(&mut self, new_inputs: Vec<f64>) -> Result<()> {
        if new_inputs.len() != self.inputs.len() {
            return Err(Error::ShapeMismatch(format!(
                "expected {} inputs, got {}",
                self.inputs.len(),
                new_inputs.len()
            )));
        }
        self.inputs = new_inputs;
        Ok(())
    }

    /// Replaces the inputs and redraws the weight vector for the new
    /// fan-in. Used when a layer is wired to a new predecessor.
    pub fn rebind_inputs(&mut self, new_inputs: Vec<f64>, rng: &mut StdRng) {
        let fan_in = new_inputs.len();
        self.inputs = new_inputs;
        self.weights.clear();
        self.initialize_weights(fan_in, rng);
    }

    /// Replaces the weight vector; the new weights must match the current
    /// fan-in.
    pub fn set_weights(&mut self, new_weights: Vec<f64>) -> Result<()> {
        if new_weights.len() != self.weights.len() {
            return Err(Error::ShapeMismatch(format!(
                "expected {} weights, got {}",
                self.weights.len(),
                new_weights.len()
            )));
        }
        self.weights = new_weights;
        Ok(())
    }

    pub fn set_output(&mut self, new_output: f64) {
        self.output = new_output;
    }

    /// Stores a gradient, clamped to `[-GRADIENT_CLIP, GRADIENT_CLIP]`.
    pub fn set_gradient(&mut self, new_gradient: f64) {
        self.gradient = new_gradient.clamp(-GRADIENT_CLIP, GRADIENT_CLIP);
    }

    /// He-style initialization: `fan_in` independent uniform draws from
    /// `[0, sqrt(2 / fan_in))`. A fan-in of zero leaves the weight vector
    /// untouched.
    pub fn initialize_weights(&mut self, fan_in: usize, rng: &mut StdRng) {
        if fan_in == 0 {
            return;
        }
        let stddev = (2.0 / fan_in as f64).sqrt();
        let dist = Uniform::new(0.0, stddev);
        self.weights = (0..fan_in).map(|_| dist.sample(rng)).collect();
    }

    // -----------------------------------------------------------------------
    // Computation
    // -----------------------------------------------------------------------

    /// Weighted sum of the inputs plus the bias. Writes nothing; the caller
    /// decides what to do with the raw sum.
    pub fn calculate_pre_output(&self) -> Result<f64> {
        if self.inputs.len() != self.weights.len() {
            return Err(Error::ShapeMismatch(format!(
                "neuron has {} inputs but {} weights",
                self.inputs.len(),
                self.weights.len()
            )));
        }
        let sum: f64 = self
            .inputs
            .iter()
            .zip(&self.weights)
            .map(|(input, weight)| input * weight)
            .sum();
        Ok(self.bias + sum)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Writes the weight count followed by the weights.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        bincode::serialize_into(writer, &self.weights)?;
        Ok(())
    }

    /// Reads a weight vector previously written by `save`, replacing the
    /// current weights and resizing the inputs to the stored fan-in.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let weights: Vec<f64> = bincode::deserialize_from(reader)?;
        self.inputs.resize(weights.len(), 0.0);
        self.weights = weights;
        Ok(())
    }
}
