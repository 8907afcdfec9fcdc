// This module serves as the central hub for the backend's shared infrastructure,
// providing the building blocks that are common to every hardware generation: session
// management (arena-based allocation and compilation statistics), the append-only
// register and tuple file that gives the IR its addressing scheme, the collaborator
// query traits (kernel metadata), and the error taxonomy. Generation-specific code
// lives under gen/; the generation-shared selection layer lives under codegen/. All
// components here are free of hardware types so that analysis passes can depend on
// them without pulling in an instruction set.

//! Shared backend infrastructure.
//!
//! # Key Components
//!
//! ## Register & Tuple File (`register_file`)
//! - Append-only arena of abstract registers with stable indices
//! - Variable-length register tuples for gather/scatter/sample operands
//!
//! ## Session Management (`session`)
//! - Arena-based allocation using `bumpalo`
//! - Compilation statistics
//!
//! ## Collaborator Interfaces (`adaptor`)
//! - Read-only kernel metadata queries
//!
//! ## Errors (`error`)
//! - Build failures as `Result`, contract violations as assertions

pub mod adaptor;
pub mod error;
pub mod register_file;
pub mod session;

pub use adaptor::KernelInfo;
pub use error::{CompileError, CompileResult};
pub use register_file::{
    Register, RegisterFamily, RegisterFile, RegisterIndex, TupleIndex, MAX_REGISTER_INDEX,
};
pub use session::{CompilationSession, SessionStats};
