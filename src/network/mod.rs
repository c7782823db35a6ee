pub mod init;
pub mod layer;
pub mod mlp;
pub mod neuron;
pub mod spec;

pub use init::WeightInit;
pub use layer::Layer;
pub use mlp::Mlp;
pub use neuron::Neuron;
pub use spec::{LayerSpec, ModelSpec};
