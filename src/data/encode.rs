use crate::error::{Error, Result};

/// One-hot encodes a class index into a vector of `categories` length.
///
/// The index arrives as a float because dataset loaders produce floats; it
/// is truncated to an integer. Anything not landing in `0..categories` is
/// a data error.
pub fn one_hot(class_index: f64, categories: usize) -> Result<Vec<f64>> {
    let index = class_index as usize;
    if class_index.is_nan() || class_index < 0.0 || index >= categories {
        return Err(Error::Data(format!(
            "class index {class_index} outside 0..{categories}"
        )));
    }
    let mut encoded = vec![0.0; categories];
    encoded[index] = 1.0;
    Ok(encoded)
}
