//! Model evaluation output reshaped for plotting.

pub mod component;
pub mod frame;
pub mod schema;

pub use component::*;
pub use frame::*;
pub use schema::*;
