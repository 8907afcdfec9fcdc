// This module defines the query traits through which the generation context consumes its
// collaborators. KernelInfo is the read-only kernel-metadata interface: whether the kernel
// uses shared local memory, its declared per-lane private stack size, and its SIMD
// execution width. The context never inspects kernel internals beyond these queries, so
// any front end able to answer them can drive prologue emission. The register-allocator
// query interface lives with the generation layer (it speaks in physical register
// designators); this module stays free of hardware types.

//! Collaborator query interfaces.
//!
//! The generation context consumes kernel metadata read-only through
//! [`KernelInfo`] rather than depending on a concrete kernel representation.

/// Read-only kernel metadata queries.
pub trait KernelInfo {
    /// Kernel name, for diagnostics.
    fn name(&self) -> &str;

    /// Does the kernel use shared local memory?
    fn use_slm(&self) -> bool;

    /// Declared per-lane private stack size in bytes. 0 means no stack use.
    fn stack_size(&self) -> u32;

    /// SIMD execution width the kernel was compiled for (8 or 16 lanes).
    fn simd_width(&self) -> u32;
}
