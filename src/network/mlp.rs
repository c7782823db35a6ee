use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use log::{debug, log_enabled, Level};
use rand::rngs::StdRng;

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::network::init::WeightInit;
use crate::network::layer::Layer;

/// A multilayer perceptron: an ordered stack of layers, a learning rate,
/// and the random source all weight draws come from.
///
/// The first layer added is the input layer; its neurons carry no weights
/// and its outputs are set verbatim from the caller's values. Training is
/// strictly sample at a time: one forward pass, one backward pass, one
/// weight update per sample.
#[derive(Debug)]
pub struct Mlp {
    layers: Vec<Layer>,
    learning_rate: f64,
    softmax: bool,
    rng: StdRng,
}

impl Mlp {
    /// A network with no layers yet, no output softmax, and entropy-seeded
    /// weights.
    pub fn new(learning_rate: f64) -> Mlp {
        Mlp::with_options(learning_rate, false, WeightInit::Random)
    }

    /// A network with no layers yet and explicit softmax and weight
    /// initialization choices.
    pub fn with_options(learning_rate: f64, softmax: bool, weight_init: WeightInit) -> Mlp {
        Mlp {
            layers: Vec::new(),
            learning_rate,
            softmax,
            rng: weight_init.build_rng(),
        }
    }

    /// Builds a fully wired network in one call. `shape[0]` is the input
    /// width; every other entry adds a layer of that many neurons using
    /// `activation`, without normalization.
    pub fn from_shape(
        shape: &[usize],
        learning_rate: f64,
        activation: Activation,
        softmax: bool,
        weight_init: WeightInit,
    ) -> Result<Mlp> {
        if shape.len() < 2 {
            return Err(Error::ShapeMismatch(format!(
                "a network needs an input and an output layer, got {} layer sizes",
                shape.len()
            )));
        }

        let mut mlp = Mlp::with_options(learning_rate, softmax, weight_init);
        for (i, &size) in shape.iter().enumerate() {
            let layer_activation = if i == 0 { Activation::Identity } else { activation };
            let inputs_per_neuron = if i == 0 { 0 } else { shape[i - 1] };
            let layer = Layer::new(size, inputs_per_neuron, layer_activation, false, &mut mlp.rng);
            mlp.layers.push(layer);
        }
        for i in 1..mlp.layers.len() {
            let (head, tail) = mlp.layers.split_at_mut(i);
            tail[0].connect_layer(&head[i - 1], &mut mlp.rng);
        }
        Ok(mlp)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn is_softmax(&self) -> bool {
        self.softmax
    }

    /// The output layer's current values, untouched by this call.
    pub fn output(&self) -> Result<Vec<f64>> {
        match self.layers.last() {
            Some(layer) => Ok(layer.outputs()),
            None => Err(Error::EmptyNetwork),
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Appends a layer of `num_nodes` neurons and wires it to the previous
    /// layer. The first layer added becomes the input layer and is left
    /// unwired; its activation never runs.
    pub fn add_layer(&mut self, num_nodes: usize, activation: Activation, normalize: bool) {
        let inputs_per_neuron = self.layers.last().map_or(0, Layer::size);
        let layer = Layer::new(num_nodes, inputs_per_neuron, activation, normalize, &mut self.rng);
        self.layers.push(layer);

        let count = self.layers.len();
        if count > 1 {
            let (head, tail) = self.layers.split_at_mut(count - 1);
            tail[0].connect_layer(&head[count - 2], &mut self.rng);
        }
    }

    /// Overwrites every layer's weights; `new_weights[i]` addresses layer
    /// `i`, one vector per neuron.
    pub fn set_all_weights(&mut self, new_weights: &[Vec<Vec<f64>>]) -> Result<()> {
        if new_weights.len() != self.layers.len() {
            return Err(Error::ShapeMismatch(format!(
                "network has {} layers, got {} weight sets",
                self.layers.len(),
                new_weights.len()
            )));
        }
        for (index, (layer, weights)) in self.layers.iter_mut().zip(new_weights).enumerate() {
            layer.set_all_weights(weights).map_err(|err| match err {
                Error::ShapeMismatch(msg) => {
                    Error::ShapeMismatch(format!("layer {index}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Propagation
    // -----------------------------------------------------------------------

    /// Runs `input_values` through the network. The input layer takes the
    /// values as-is; every later layer recomputes from its predecessor, and
    /// the output layer gets the softmax pass if one was configured.
    pub fn feed_forward(&mut self, input_values: &[f64]) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::EmptyNetwork);
        }

        self.layers[0].set_outputs(input_values)?;

        for i in 1..self.layers.len() {
            let previous_outputs = self.layers[i - 1].outputs();
            let layer = &mut self.layers[i];
            layer.set_inputs(&previous_outputs)?;
            layer.calculate_outputs()?;
        }

        if self.softmax {
            if let Some(last) = self.layers.last_mut() {
                last.apply_softmax();
            }
        }
        Ok(())
    }

    /// Propagates the error against `target_values` backward, then applies
    /// one learning-rate-scaled weight update per weight.
    ///
    /// Stored outputs are not recomputed here; they keep the values of the
    /// preceding forward pass throughout.
    pub fn back_propagate(&mut self, target_values: &[f64]) -> Result<()> {
        let last = match self.layers.len().checked_sub(1) {
            Some(last) => last,
            None => return Err(Error::EmptyNetwork),
        };

        let output_layer = &mut self.layers[last];
        if target_values.len() != output_layer.size() {
            return Err(Error::ShapeMismatch(format!(
                "output layer has {} neurons, got {} targets",
                output_layer.size(),
                target_values.len()
            )));
        }
        for (neuron, &target) in output_layer.neurons_mut().iter_mut().zip(target_values) {
            let gradient = neuron.output() - target;
            neuron.set_gradient(gradient);
        }

        // Hidden layers, back to front. Each neuron's own incoming weights
        // are indexed by next-layer neuron position; positions missing on
        // either side contribute nothing.
        for i in (1..last).rev() {
            let next_gradients: Vec<f64> = self.layers[i + 1]
                .neurons()
                .iter()
                .map(|neuron| neuron.gradient())
                .collect();
            let activation = self.layers[i].activation();
            for neuron in self.layers[i].neurons_mut() {
                let downstream: f64 = neuron
                    .weights()
                    .iter()
                    .zip(&next_gradients)
                    .map(|(weight, gradient)| weight * gradient)
                    .sum();
                let gradient = downstream * activation.derivative(neuron.output());
                neuron.set_gradient(gradient);
            }
        }

        // Weight updates, front to back, against the stored outputs.
        let learning_rate = self.learning_rate;
        for i in 1..=last {
            let previous_outputs = self.layers[i - 1].outputs();
            for neuron in self.layers[i].neurons_mut() {
                let gradient = neuron.gradient();
                for (weight, &output) in neuron.weights_mut().iter_mut().zip(&previous_outputs) {
                    *weight -= learning_rate * gradient * output;
                }
            }
        }
        Ok(())
    }

    /// Online SGD: every sample once per epoch, in dataset order, for
    /// `epochs` epochs. With debug logging enabled, reports each epoch's
    /// mean squared error.
    pub fn train(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>], epochs: usize) -> Result<()> {
        if inputs.len() != targets.len() {
            return Err(Error::ShapeMismatch(format!(
                "got {} input rows but {} target rows",
                inputs.len(),
                targets.len()
            )));
        }

        let track_loss = log_enabled!(Level::Debug);
        for epoch in 1..=epochs {
            let mut squared_error = 0.0;
            for (input, target) in inputs.iter().zip(targets) {
                self.feed_forward(input)?;
                if track_loss {
                    squared_error += self.sample_squared_error(target)?;
                }
                self.back_propagate(target)?;
            }
            if track_loss && !inputs.is_empty() {
                debug!(
                    "epoch {}/{}: mse {:.6}",
                    epoch,
                    epochs,
                    squared_error / inputs.len() as f64
                );
            }
        }
        Ok(())
    }

    /// One forward pass, then the output layer's values.
    pub fn predict(&mut self, input_values: &[f64]) -> Result<Vec<f64>> {
        self.feed_forward(input_values)?;
        self.output()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Writes every layer's weights to `path`, in layer order. The stream
    /// carries neuron and weight counts but no architecture header.
    pub fn save(&self, path: &str) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::ModelIo {
            path: path.to_string(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        for layer in &self.layers {
            layer.save(&mut writer)?;
        }
        writer.flush().map_err(|source| Error::ModelIo {
            path: path.to_string(),
            source,
        })?;
        debug!("saved {} layers to {path}", self.layers.len());
        Ok(())
    }

    /// Restores weights previously written by `save`.
    ///
    /// The network must already have the architecture the file was saved
    /// from; nothing in the stream checks it. Loading into a different
    /// shape reshapes neurons to the stored counts and leaves later
    /// operations to reject or mispredict.
    pub fn load(&mut self, path: &str) -> Result<()> {
        let file = File::open(path).map_err(|source| Error::ModelIo {
            path: path.to_string(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        for layer in &mut self.layers {
            layer.load(&mut reader)?;
        }
        debug!("loaded {} layers from {path}", self.layers.len());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Sum of squared errors of the current outputs against `target`.
    fn sample_squared_error(&self, target: &[f64]) -> Result<f64> {
        let outputs = self.output()?;
        Ok(outputs
            .iter()
            .zip(target)
            .map(|(output, target)| (output - target) * (output - target))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Layers 2-3-2, every weight 0.5, identity activation.
    fn half_weight_net() -> Mlp {
        let mut mlp = Mlp::from_shape(
            &[2, 3, 2],
            0.1,
            Activation::Identity,
            false,
            WeightInit::Reproducible,
        )
        .unwrap();
        mlp.set_all_weights(&[
            vec![vec![], vec![]],
            vec![vec![0.5, 0.5], vec![0.5, 0.5], vec![0.5, 0.5]],
            vec![vec![0.5, 0.5, 0.5], vec![0.5, 0.5, 0.5]],
        ])
        .unwrap();
        mlp
    }

    #[test]
    fn feed_forward_matches_hand_computed_sums() {
        let mut mlp = half_weight_net();
        mlp.feed_forward(&[1.0, 1.0]).unwrap();

        // Hidden sums: 1 + 0.5 + 0.5 = 2; output sums: 1 + 3 * 0.5 * 2 = 4.
        let outputs = mlp.output().unwrap();
        assert_eq!(outputs, vec![4.0, 4.0]);
    }

    #[test]
    fn back_propagate_moves_weights_but_not_outputs() {
        let mut mlp = Mlp::with_options(0.001, false, WeightInit::Reproducible);
        mlp.add_layer(2, Activation::Identity, false);
        mlp.add_layer(3, Activation::Identity, false);
        mlp.add_layer(1, Activation::Identity, false);
        mlp.set_all_weights(&[
            vec![vec![], vec![]],
            vec![vec![0.5, 0.5], vec![0.5, 0.5], vec![0.5, 0.5]],
            vec![vec![0.5, 0.5, 0.5]],
        ])
        .unwrap();

        mlp.feed_forward(&[1.0, 1.0]).unwrap();
        assert_eq!(mlp.output().unwrap(), vec![4.0]);

        mlp.back_propagate(&[1.0]).unwrap();

        // Outputs stay stale until the next forward pass.
        assert_eq!(mlp.output().unwrap(), vec![4.0]);

        // Output neuron: gradient 3, previous outputs 2, so each weight
        // drops by 0.001 * 3 * 2.
        for &weight in mlp.layers()[2].neurons()[0].weights() {
            assert!(approx(weight, 0.494));
        }
        // Hidden neurons: the single downstream gradient through the own
        // first weight: 0.5 * 3 = 1.5; inputs are 1, so weights drop by
        // 0.001 * 1.5.
        for neuron in mlp.layers()[1].neurons() {
            assert!(approx(neuron.gradient(), 1.5));
            for &weight in neuron.weights() {
                assert!(approx(weight, 0.4985));
            }
        }
    }

    #[test]
    fn hidden_gradients_use_own_incoming_weights() {
        // Hidden neurons have one incoming weight but three downstream
        // neurons; only the first downstream gradient pairs up.
        let mut mlp = Mlp::with_options(0.1, false, WeightInit::Reproducible);
        mlp.add_layer(1, Activation::Identity, false);
        mlp.add_layer(2, Activation::Identity, false);
        mlp.add_layer(3, Activation::Identity, false);
        mlp.set_all_weights(&[
            vec![vec![]],
            vec![vec![0.5], vec![0.25]],
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        ])
        .unwrap();

        mlp.feed_forward(&[2.0]).unwrap();
        // Hidden outputs: 2.0 and 1.5; final outputs: 6, 13, 20.
        assert_eq!(mlp.output().unwrap(), vec![6.0, 13.0, 20.0]);

        mlp.back_propagate(&[5.5, 12.5, 19.5]).unwrap();

        let hidden = &mlp.layers()[1];
        assert!(approx(hidden.neurons()[0].gradient(), 0.5 * 0.5));
        assert!(approx(hidden.neurons()[1].gradient(), 0.25 * 0.5));
    }

    #[test]
    fn wider_weight_vectors_ignore_the_tail() {
        // Hidden neurons carry three incoming weights but only two
        // downstream neurons exist; the third weight contributes nothing.
        let mut mlp = Mlp::with_options(0.1, false, WeightInit::Reproducible);
        mlp.add_layer(3, Activation::Identity, false);
        mlp.add_layer(2, Activation::Identity, false);
        mlp.add_layer(2, Activation::Identity, false);
        mlp.set_all_weights(&[
            vec![vec![], vec![], vec![]],
            vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]],
            vec![vec![1.0, 1.0], vec![2.0, 2.0]],
        ])
        .unwrap();

        mlp.feed_forward(&[1.0, 1.0, 1.0]).unwrap();
        // Hidden outputs: 1.6 and 2.5; final outputs: 5.1 and 9.2.
        mlp.back_propagate(&[4.1, 8.2]).unwrap();

        let hidden = &mlp.layers()[1];
        assert!(approx(hidden.neurons()[0].gradient(), 0.1 + 0.2));
        assert!(approx(hidden.neurons()[1].gradient(), 0.4 + 0.5));
    }

    #[test]
    fn xor_training_converges() {
        let mut mlp = Mlp::with_options(0.05, false, WeightInit::Reproducible);
        mlp.add_layer(2, Activation::Identity, false);
        mlp.add_layer(6, Activation::ReLU, false);
        mlp.add_layer(6, Activation::ReLU, false);
        mlp.add_layer(1, Activation::Sigmoid, false);

        let inputs = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let targets = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];

        mlp.train(&inputs, &targets, 10_000).unwrap();

        for (input, target) in inputs.iter().zip(&targets) {
            let prediction = mlp.predict(input).unwrap();
            assert!(
                (prediction[0] - target[0]).abs() < 0.5,
                "{input:?} predicted {:.4}, wanted {}",
                prediction[0],
                target[0]
            );
        }
    }

    #[test]
    fn reproducible_networks_start_identical() {
        let build = || {
            Mlp::from_shape(
                &[3, 4, 2],
                0.1,
                Activation::Sigmoid,
                false,
                WeightInit::Reproducible,
            )
            .unwrap()
        };
        let mut a = build();
        let mut b = build();

        for (la, lb) in a.layers().iter().zip(b.layers()) {
            for (na, nb) in la.neurons().iter().zip(lb.neurons()) {
                assert_eq!(na.weights(), nb.weights());
            }
        }
        assert_eq!(
            a.predict(&[0.3, 0.6, 0.9]).unwrap(),
            b.predict(&[0.3, 0.6, 0.9]).unwrap()
        );
    }

    #[test]
    fn save_then_load_restores_predictions_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let path = path.to_str().unwrap();

        let mut trained = Mlp::from_shape(
            &[2, 3, 1],
            0.0001,
            Activation::Identity,
            false,
            WeightInit::Reproducible,
        )
        .unwrap();
        trained
            .train(
                &[vec![0.0, 0.0], vec![1.0, 1.0]],
                &[vec![0.0], vec![1.0]],
                100,
            )
            .unwrap();
        trained.save(path).unwrap();

        let mut restored = Mlp::from_shape(
            &[2, 3, 1],
            0.0001,
            Activation::Identity,
            false,
            WeightInit::Random,
        )
        .unwrap();
        restored.load(path).unwrap();

        assert_eq!(
            trained.predict(&[0.0, 0.0]).unwrap(),
            restored.predict(&[0.0, 0.0]).unwrap()
        );
        assert_eq!(
            trained.predict(&[1.0, 1.0]).unwrap(),
            restored.predict(&[1.0, 1.0]).unwrap()
        );
    }

    #[test]
    fn train_rejects_mismatched_dataset_lengths() {
        let mut mlp = Mlp::from_shape(
            &[2, 2, 1],
            0.1,
            Activation::Sigmoid,
            false,
            WeightInit::Reproducible,
        )
        .unwrap();
        let before: Vec<f64> = mlp.layers()[1].neurons()[0].weights().to_vec();

        let err = mlp
            .train(&[vec![0.0, 0.0], vec![1.0, 1.0]], &[vec![0.0]], 5)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));

        // No sample was consumed, so no weight moved.
        assert_eq!(mlp.layers()[1].neurons()[0].weights(), before.as_slice());
    }

    #[test]
    fn empty_network_operations_fail() {
        let mut mlp = Mlp::new(0.1);
        assert!(matches!(mlp.feed_forward(&[1.0]), Err(Error::EmptyNetwork)));
        assert!(matches!(
            mlp.back_propagate(&[1.0]),
            Err(Error::EmptyNetwork)
        ));
        assert!(matches!(mlp.output(), Err(Error::EmptyNetwork)));
        assert!(matches!(mlp.predict(&[1.0]), Err(Error::EmptyNetwork)));
    }

    #[test]
    fn feed_forward_checks_the_input_width() {
        let mut mlp = Mlp::from_shape(
            &[2, 2, 1],
            0.1,
            Activation::Sigmoid,
            false,
            WeightInit::Reproducible,
        )
        .unwrap();
        assert!(matches!(
            mlp.feed_forward(&[1.0]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn back_propagate_checks_the_target_width() {
        let mut mlp = Mlp::from_shape(
            &[2, 2, 1],
            0.1,
            Activation::Sigmoid,
            false,
            WeightInit::Reproducible,
        )
        .unwrap();
        mlp.feed_forward(&[0.5, 0.5]).unwrap();
        assert!(matches!(
            mlp.back_propagate(&[1.0, 0.0]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn softmax_outputs_form_a_distribution() {
        let mut mlp = Mlp::with_options(0.1, true, WeightInit::Reproducible);
        mlp.add_layer(3, Activation::Identity, false);
        mlp.add_layer(4, Activation::ReLU, false);
        mlp.add_layer(3, Activation::Identity, false);

        let outputs = mlp.predict(&[0.2, 0.4, 0.6]).unwrap();
        let total: f64 = outputs.iter().sum();
        assert!(approx(total, 1.0));
        assert!(outputs.iter().all(|&o| (0.0..=1.0).contains(&o)));
    }

    #[test]
    fn from_shape_needs_two_layers() {
        let err = Mlp::from_shape(
            &[3],
            0.1,
            Activation::Sigmoid,
            false,
            WeightInit::Reproducible,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn set_all_weights_checks_the_layer_count() {
        let mut mlp = Mlp::from_shape(
            &[2, 1],
            0.1,
            Activation::Identity,
            false,
            WeightInit::Reproducible,
        )
        .unwrap();
        let err = mlp.set_all_weights(&[vec![vec![]]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));

        let err = mlp
            .set_all_weights(&[vec![vec![], vec![]], vec![vec![1.0]]])
            .unwrap_err();
        match err {
            Error::ShapeMismatch(msg) => assert!(msg.contains("layer 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
