#[macro_use]
extern crate serde;

mod circuit;
mod error;
mod events;
mod registry;
mod store;
mod tally;

pub use circuit::*;
pub use error::*;
pub use events::*;
pub use registry::*;
pub use store::*;
pub use tally::*;

#[cfg(test)]
mod tests;
