pub mod columns;
pub mod cycles;
pub mod dataset;
pub mod error;
pub mod io;
pub mod plot;
pub mod table;
pub mod transforms;

pub use columns::*;
pub use cycles::*;
pub use dataset::*;
pub use error::{FcpError, Result};
pub use table::*;
