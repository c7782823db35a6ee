/// Inference with the model trained by `iris_train`.
///
/// Rebuilds the architecture from `iris_model.json`, loads the weights
/// from `iris_model.bin`, and answers measurements typed on stdin.
///
/// Run with:
///   cargo run --example iris_predict

use std::error::Error;
use std::io::{self, BufRead, Write};

use neurite::{ModelSpec, WeightInit};

const CLASS_NAMES: [&str; 3] = ["Iris-setosa", "Iris-versicolor", "Iris-virginica"];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let spec = ModelSpec::load_json("iris_model.json")?;
    let mut mlp = spec.build(WeightInit::Random);
    mlp.load("iris_model.bin")?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!(
            "Enter the 4 features of the iris flower (sepal length, sepal width, \
             petal length, petal width), separated by spaces, or 'q' to quit:"
        );
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.trim() == "q" {
            break;
        }

        let input: Vec<f64> = line
            .split_whitespace()
            .filter_map(|cell| cell.parse().ok())
            .collect();
        if input.len() != 4 {
            println!("Invalid input. Please enter 4 numbers.\n");
            continue;
        }

        let output = mlp.predict(&input)?;
        let class = argmax(&output);
        println!(
            "Predicted class: {} ({:.2}%)\n",
            CLASS_NAMES[class],
            output[class] * 100.0
        );
    }

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
