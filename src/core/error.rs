// This module defines error types for the backend using the thiserror crate for idiomatic
// Rust error handling. CompileError covers the recoverable build failures of the pipeline:
// an IR operation with no selection mapping for the targeted hardware generation, and a
// kernel declaring a SIMD execution width the hardware cannot run. Contract violations
// (out-of-range indices, tuple forward references, table overflow, shape/operand
// mismatches) are deliberately NOT represented here: those are internal compiler defects
// and abort compilation immediately via assertions. The module also provides
// CompileResult<T> as a convenience type alias for Result<T, CompileError>.

//! Error types for kernel compilation.
//!
//! Using thiserror for more idiomatic error handling. Compilation of a
//! kernel is all-or-nothing; there is no partial-result path.

use thiserror::Error;

use crate::ir::Opcode;

/// Main error type for kernel compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("no selection mapping for {opcode:?} on {generation}")]
    UnsupportedOpcode {
        opcode: Opcode,
        generation: &'static str,
    },

    #[error("unsupported SIMD execution width {width} (must be 8 or 16)")]
    UnsupportedSimdWidth { width: u32 },
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
