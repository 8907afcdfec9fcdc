//! Hardware-generation-specific components.
//!
//! This module contains everything that speaks the target ISA:
//! - Physical register designators and typed immediates (`registers`)
//! - The typed emission primitives with scoped state (`encoder`)
//! - The generation context and per-generation hook interface (`context`)
//! - The Gen 7.5 generation (`gen75`)

pub mod context;
pub mod encoder;
pub mod gen75;
pub mod registers;

pub use context::{EmitEnv, GenContext, Generation, PassthroughAllocator, RegisterAllocator};
pub use encoder::{EmissionState, EncodedInst, GenEncoder, InstExtra, Predicate, StateScope};
pub use gen75::{Gen75, Selection75};
pub use registers::{ArchFile, GenRegister, RegType, REGISTER_BYTES};
