pub mod activation;
pub mod data;
pub mod error;
pub mod network;

// Convenience re-exports
pub use activation::activation::Activation;
pub use error::{Error, Result};
pub use network::init::WeightInit;
pub use network::layer::Layer;
pub use network::mlp::Mlp;
pub use network::neuron::Neuron;
pub use network::spec::{LayerSpec, ModelSpec};
