// Compound protocol knowledge: contract tables and transaction classification

pub mod registry;
pub mod classifier;

pub use registry::*;
pub use classifier::*;
