pub mod csv;
pub mod encode;

pub use csv::parse_csv;
pub use encode::one_hot;
