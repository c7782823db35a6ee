use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::network::init::WeightInit;
use crate::network::mlp::Mlp;

/// Describes one layer in a model architecture.
///
/// Fields:
/// - `size`: number of neurons in the layer
/// - `activation`: activation applied after the weighted sum
/// - `normalize`: whether the layer normalizes its sums before activating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub activation: Activation,
    #[serde(default)]
    pub normalize: bool,
}

/// A serializable description of a network architecture.
///
/// The binary weight stream carries no shape information, so a `ModelSpec`
/// saved next to the weights is how a matching network gets rebuilt before
/// `Mlp::load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Ordered layer descriptions, input layer first.
    pub layers: Vec<LayerSpec>,
    pub learning_rate: f64,
    /// Whether the output layer gets a softmax pass.
    #[serde(default)]
    pub softmax: bool,
}

impl ModelSpec {
    /// Captures the architecture of a live network.
    pub fn describe(mlp: &Mlp) -> ModelSpec {
        let layers = mlp
            .layers()
            .iter()
            .map(|layer| LayerSpec {
                size: layer.size(),
                activation: layer.activation(),
                normalize: layer.is_normalized(),
            })
            .collect();
        ModelSpec {
            layers,
            learning_rate: mlp.learning_rate(),
            softmax: mlp.is_softmax(),
        }
    }

    /// Builds a freshly wired network with this architecture. Weights are
    /// newly drawn; load a weight file over them to restore a model.
    pub fn build(&self, weight_init: WeightInit) -> Mlp {
        let mut mlp = Mlp::with_options(self.learning_rate, self.softmax, weight_init);
        for layer in &self.layers {
            mlp.add_layer(layer.size, layer.activation, layer.normalize);
        }
        mlp
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::ModelIo {
            path: path.to_string(),
            source,
        })?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `ModelSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<ModelSpec> {
        let file = File::open(path).map_err(|source| Error::ModelIo {
            path: path.to_string(),
            source,
        })?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
