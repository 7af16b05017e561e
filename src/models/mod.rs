pub mod dataset;
pub mod feature;
pub mod segment;

pub use dataset::*;
pub use feature::*;
pub use segment::*;
