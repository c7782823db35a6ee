/// XOR training walkthrough for neurite.
///
/// Architecture: 2 -> 6 (ReLU) -> 6 (ReLU) -> 1 (Sigmoid)
/// Learning rate: 0.05, sample-at-a-time SGD, 10,000 epochs
///
/// Run with:
///   cargo run --example xor
///
/// Set RUST_LOG=debug to see per-epoch loss from the training loop.

use neurite::{Activation, Mlp, WeightInit};

fn main() -> neurite::Result<()> {
    env_logger::init();

    let mut network = Mlp::with_options(0.05, false, WeightInit::Reproducible);
    network.add_layer(2, Activation::Identity, false);
    network.add_layer(6, Activation::ReLU, false);
    network.add_layer(6, Activation::ReLU, false);
    network.add_layer(1, Activation::Sigmoid, false);

    let inputs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let targets = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];

    for round in 1..=10 {
        network.train(&inputs, &targets, 1_000)?;

        let mut loss = 0.0;
        for (input, target) in inputs.iter().zip(&targets) {
            let prediction = network.predict(input)?;
            loss += (prediction[0] - target[0]).powi(2);
        }
        println!(
            "epoch {}: loss = {:.6}",
            round * 1_000,
            loss / inputs.len() as f64
        );
    }

    for input in &inputs {
        let output = network.predict(input)?[0];
        println!("Input: {input:?} -> Output: {output:.4}");
    }
    Ok(())
}
