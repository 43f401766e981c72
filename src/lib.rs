pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod linalg;
pub mod models;
pub mod utils;

pub use error::FilterError;
