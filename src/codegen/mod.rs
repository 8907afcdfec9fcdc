//! Generation-shared selection layer.
//!
//! This module contains the parts of instruction selection every hardware
//! generation shares:
//! - The closed catalog of instruction shapes (`catalog`)
//! - The selection-IR stream and the lowering-engine interface (`selection`)

pub mod catalog;
pub mod selection;

pub use catalog::{MathFunction, SelectionOpcode, Shape};
pub use selection::{SelectionEngine, SelectionInstruction, SelectionStream};
