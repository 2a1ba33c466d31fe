// CSV input and output

pub mod wallet_input;
pub mod results_writer;

pub use wallet_input::*;
pub use results_writer::*;
