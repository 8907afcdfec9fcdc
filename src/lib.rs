//! gpugen - GPU machine-code generation backend.
//!
//! gpugen lowers a hardware-independent IR of parallel kernels into the
//! native instruction set of a specific GPU hardware generation: it selects
//! equivalent instruction sequences from a closed catalog of shapes, gives
//! the IR a stable register/tuple addressing scheme, and emits the
//! generation-specific prologue sequences (shared-memory relocation,
//! per-lane stack pointers) around the selected stream.
//!
//! # Primary Usage
//!
//! ```
//! use bumpalo::Bump;
//! use gpugen::core::CompilationSession;
//! use gpugen::gen::{Gen75, GenContext, PassthroughAllocator};
//! use gpugen::ir::Kernel;
//!
//! let arena = Bump::new();
//! let session = CompilationSession::new(&arena);
//!
//! let mut kernel = Kernel::new("scale", 16);
//! kernel.stack_size = 256;
//!
//! let mut ctx = GenContext::new(
//!     Box::new(Gen75::new()),
//!     &kernel,
//!     Box::new(PassthroughAllocator),
//!     &session,
//! ).expect("SIMD width is supported");
//! ctx.new_selection();
//! ctx.emit_prologue();
//! assert!(!ctx.instructions().is_empty());
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Shared infrastructure (session, register file, errors)
//! - [`ir`] - Hardware-independent IR read surface
//! - [`codegen`] - Generation-shared selection catalog and stream
//! - [`gen`] - Generation-specific code (designators, encoder, contexts)

pub mod codegen;
pub mod core;
pub mod gen;
pub mod ir;

// Re-export common types from organized modules
pub use crate::core::{
    // Collaborator interfaces
    KernelInfo,
    // Register & tuple file
    Register, RegisterFamily, RegisterFile, RegisterIndex, TupleIndex,
    // Session management
    CompilationSession, SessionStats,
    // Errors
    CompileError, CompileResult,
};
pub use codegen::{MathFunction, SelectionEngine, SelectionInstruction, SelectionOpcode, Shape};
pub use gen::{GenContext, GenEncoder, GenRegister, Generation, RegisterAllocator};
