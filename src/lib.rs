pub mod config;
pub mod driver;
pub mod error;
pub mod session;
pub mod tree;
pub mod variables;

pub use error::TreeError;
