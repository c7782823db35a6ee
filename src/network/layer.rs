use std::io::{Read, Write};

use rand::rngs::StdRng;

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::network::neuron::Neuron;

/// Added to the variance before taking the square root, so a layer of
/// identical pre-activations still normalizes to finite values.
const NORM_EPSILON: f64 = 1e-5;

/// An ordered collection of neurons sharing one activation function.
///
/// The neuron count is fixed at construction; only `load` may resize it,
/// to whatever count the stored stream carries.
#[derive(Debug, Clone)]
pub struct Layer {
    neurons: Vec<Neuron>,
    normalize: bool,
    activation: Activation,
}

impl Layer {
    /// Creates a layer of `size` neurons, each with `inputs_per_neuron`
    /// freshly drawn weights.
    pub fn new(
        size: usize,
        inputs_per_neuron: usize,
        activation: Activation,
        normalize: bool,
        rng: &mut StdRng,
    ) -> Layer {
        let neurons = (0..size).map(|_| Neuron::new(inputs_per_neuron, rng)).collect();
        Layer {
            neurons,
            normalize,
            activation,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn is_normalized(&self) -> bool {
        self.normalize
    }

    /// The outputs of all neurons, in neuron order.
    pub fn outputs(&self) -> Vec<f64> {
        self.neurons.iter().map(Neuron::output).collect()
    }

    // -----------------------------------------------------------------------
    // Wiring and bulk mutation
    // -----------------------------------------------------------------------

    /// Wires every neuron's inputs to `previous`'s current outputs,
    /// redrawing each weight vector for the new fan-in.
    pub fn connect_layer(&mut self, previous: &Layer, rng: &mut StdRng) {
        let inputs = previous.outputs();
        for neuron in &mut self.neurons {
            neuron.rebind_inputs(inputs.clone(), rng);
        }
    }

    /// Presents `inputs` to every neuron without touching weights.
    pub fn set_inputs(&mut self, inputs: &[f64]) -> Result<()> {
        for (index, neuron) in self.neurons.iter_mut().enumerate() {
            neuron
                .set_inputs(inputs.to_vec())
                .map_err(|err| at_neuron(index, err))?;
        }
        Ok(())
    }

    /// Overwrites every neuron's weights. `new_weights[i]` must match
    /// neuron `i`'s current weight count.
    pub fn set_all_weights(&mut self, new_weights: &[Vec<f64>]) -> Result<()> {
        if new_weights.len() != self.neurons.len() {
            return Err(Error::ShapeMismatch(format!(
                "layer has {} neurons, got {} weight vectors",
                self.neurons.len(),
                new_weights.len()
            )));
        }
        for (index, (neuron, weights)) in self.neurons.iter_mut().zip(new_weights).enumerate() {
            neuron
                .set_weights(weights.clone())
                .map_err(|err| at_neuron(index, err))?;
        }
        Ok(())
    }

    /// Overwrites the stored outputs directly, one value per neuron. This
    /// is how input values enter the network: the first layer's outputs are
    /// set verbatim, with no activation applied.
    pub fn set_outputs(&mut self, outputs: &[f64]) -> Result<()> {
        if outputs.len() != self.neurons.len() {
            return Err(Error::ShapeMismatch(format!(
                "layer has {} neurons, got {} outputs",
                self.neurons.len(),
                outputs.len()
            )));
        }
        for (neuron, &value) in self.neurons.iter_mut().zip(outputs) {
            neuron.set_output(value);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Computation
    // -----------------------------------------------------------------------

    /// Computes every neuron's output from its current inputs.
    ///
    /// Without normalization each neuron's raw sum goes straight through
    /// the activation. With it, the raw sums are stored first, then every
    /// stored value is normalized against the layer mean and variance and
    /// activated in a second pass.
    pub fn calculate_outputs(&mut self) -> Result<()> {
        let activation = self.activation;
        if !self.normalize {
            for neuron in &mut self.neurons {
                let pre_output = neuron.calculate_pre_output()?;
                neuron.set_output(activation.apply(pre_output));
            }
            return Ok(());
        }

        let mut sum = 0.0;
        let mut sq_sum = 0.0;
        for neuron in &mut self.neurons {
            let pre_output = neuron.calculate_pre_output()?;
            neuron.set_output(pre_output);
            sum += pre_output;
            sq_sum += pre_output * pre_output;
        }

        let count = self.neurons.len() as f64;
        let mean = sum / count;
        let variance = sq_sum / count - mean * mean;
        let stddev = (variance + NORM_EPSILON).sqrt();

        for neuron in &mut self.neurons {
            let normalized = (neuron.output() - mean) / stddev;
            neuron.set_output(activation.apply(normalized));
        }
        Ok(())
    }

    /// Replaces each output `o_i` with `exp(o_i) / sum_j exp(o_j)`.
    ///
    /// There is no max-subtraction; very large outputs overflow to
    /// infinity rather than being rescaled first.
    pub fn apply_softmax(&mut self) {
        let sum_of_exponentials: f64 = self.neurons.iter().map(|n| n.output().exp()).sum();
        for neuron in &mut self.neurons {
            let output = neuron.output();
            neuron.set_output(output.exp() / sum_of_exponentials);
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Writes the neuron count, then each neuron's weights.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        bincode::serialize_into(&mut *writer, &(self.neurons.len() as u64))?;
        for neuron in &self.neurons {
            neuron.save(writer)?;
        }
        Ok(())
    }

    /// Reads a layer written by `save`, resizing to the stored neuron
    /// count. Neurons added by the resize start unconnected.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let stored: u64 = bincode::deserialize_from(&mut *reader)?;
        let count = usize::try_from(stored).map_err(|_| {
            Error::ShapeMismatch(format!("stored neuron count {stored} does not fit this platform"))
        })?;
        self.neurons.resize_with(count, Neuron::default);
        for neuron in &mut self.neurons {
            neuron.load(reader)?;
        }
        Ok(())
    }
}

/// Prefixes a shape error with the neuron it occurred at.
fn at_neuron(index: usize, err: Error) -> Error {
    match err {
        Error::ShapeMismatch(msg) => Error::ShapeMismatch(format!("neuron {index}: {msg}")),
        other => other,
    }
}
