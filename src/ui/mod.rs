pub mod node;

pub use node::{to_binding_value, CellMargins, Node};
