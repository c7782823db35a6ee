/// Iris species classification for neurite.
/// https://archive.ics.uci.edu/dataset/53/iris
///
/// Architecture: 4 -> 10 (ReLU) -> 10 (ReLU) -> 3 (Identity + Softmax)
/// Learning rate: 0.00001, sample-at-a-time SGD, 10,000 epochs
///
/// Run with:
///   cargo run --example iris_train --release
///
/// Expects `iris.csv` in the working directory (or under `demos/`): the
/// plain UCI file, four measurements and the species name per row. Writes
/// the trained weights to `iris_model.bin` and the matching architecture
/// to `iris_model.json` for `iris_predict`.

use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use neurite::data::{one_hot, parse_csv};
use neurite::{Activation, Mlp, ModelSpec, WeightInit};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let file = File::open("iris.csv").or_else(|_| File::open("demos/iris.csv"))?;
    let conversion_rules = HashMap::from([
        ("Iris-setosa".to_string(), 0.0),
        ("Iris-versicolor".to_string(), 1.0),
        ("Iris-virginica".to_string(), 2.0),
    ]);
    let mut dataset = parse_csv(BufReader::new(file), 0, &[], &conversion_rules)?;

    // Deterministic shuffle so the held-out tail is the same every run.
    let mut rng = StdRng::seed_from_u64(42);
    dataset.shuffle(&mut rng);

    let training_size = (0.8 * dataset.len() as f64) as usize;
    let mut training_inputs = Vec::with_capacity(training_size);
    let mut training_targets = Vec::with_capacity(training_size);
    for row in &dataset[..training_size] {
        training_inputs.push(row[..4].to_vec());
        training_targets.push(one_hot(row[4], 3)?);
    }

    let mut mlp = Mlp::with_options(0.00001, true, WeightInit::Random);
    mlp.add_layer(4, Activation::ReLU, false);
    mlp.add_layer(10, Activation::ReLU, false);
    mlp.add_layer(10, Activation::ReLU, false);
    mlp.add_layer(3, Activation::Identity, false);

    println!(
        "Training on {} samples for 10,000 epochs...",
        training_inputs.len()
    );
    mlp.train(&training_inputs, &training_targets, 10_000)?;

    // Evaluate over the whole dataset; the last 20% was never trained on.
    let mut confusion_matrix = [[0u32; 3]; 3];
    let mut correct = 0;
    for row in &dataset {
        let output = mlp.predict(&row[..4])?;
        let predicted = argmax(&output);
        let actual = row[4] as usize;
        confusion_matrix[actual][predicted] += 1;
        if predicted == actual {
            correct += 1;
        }
    }

    println!("Confusion matrix:");
    for row in &confusion_matrix {
        for cell in row {
            print!("{cell} ");
        }
        println!();
    }
    let accuracy = correct as f64 / dataset.len() as f64;
    println!("Accuracy: {:.2}%", accuracy * 100.0);

    mlp.save("iris_model.bin")?;
    ModelSpec::describe(&mlp).save_json("iris_model.json")?;
    println!("Saved iris_model.bin and iris_model.json");

    Ok(())
}

/// Index of the maximum element in a slice.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
