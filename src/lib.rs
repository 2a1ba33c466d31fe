pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod protocol;
pub mod risk;
pub mod services;
pub mod utils;

pub use error::types::*;
