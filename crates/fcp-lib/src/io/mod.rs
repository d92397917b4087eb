pub mod delimited;
#[cfg(feature = "polars")]
pub mod frame;

pub use delimited::{load_dataset, read_table, LoadOptions};
