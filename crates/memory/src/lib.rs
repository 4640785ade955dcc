//! Memory implementations for overseer.

pub mod history;

pub use history::{DEFAULT_CAPACITY, History};
