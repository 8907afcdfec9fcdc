// This module implements the abstract register and register-tuple file that gives the
// hardware-independent IR its addressing scheme. RegisterFile owns two append-only tables
// for exactly one function under compilation: the register table (each entry a Register
// carrying its family, i.e. per-lane bit width) and the tuple table (contiguous runs of
// register indices used where an instruction needs a variable-length operand list, such
// as gathers, scatters and texture sampling). Indices are handed out in strictly
// increasing order and are never reused or invalidated, so later passes can key side
// tables (liveness ranges, physical assignments) by a small integer without tracking
// object lifetime. All preconditions are internal-compiler contracts enforced with
// assertions; none of them is reachable from user input.

//! Append-only register and tuple file.
//!
//! One [`RegisterFile`] exists per function being compiled. It is populated
//! during IR-to-selection lowering and read-only afterwards, which makes it
//! trivially shareable with analysis passes that only query it.

/// Register family, fixed at creation. Determines the per-lane bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterFamily {
    /// Predicate / boolean registers.
    Bool,
    Byte,
    Word,
    Dword,
    Qword,
}

impl RegisterFamily {
    /// Per-lane width in bits.
    pub fn bit_width(self) -> u32 {
        match self {
            RegisterFamily::Bool => 1,
            RegisterFamily::Byte => 8,
            RegisterFamily::Word => 16,
            RegisterFamily::Dword => 32,
            RegisterFamily::Qword => 64,
        }
    }
}

/// One abstract storage location. Immutable after creation; two registers
/// compare equal iff they have the same family. Distinctness comes from the
/// position in the owning [`RegisterFile`], not from object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub family: RegisterFamily,
}

impl Register {
    pub fn new(family: RegisterFamily) -> Self {
        Self { family }
    }
}

/// Position of a register in the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterIndex(pub u16);

/// Position of the first element of a tuple in the tuple table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleIndex(pub u32);

/// Highest index a register file may hand out.
pub const MAX_REGISTER_INDEX: u32 = u16::MAX as u32;

/// Owns all registers and all tuples for one function under compilation.
///
/// Invariants:
/// - `reg_num()` equals the number of `append` calls so far.
/// - `tuple_num()` equals the number of indices appended across all tuples.
/// - Every index stored in the tuple table referenced an existing register
///   at the time the tuple was created (back-references only).
#[derive(Debug, Default)]
pub struct RegisterFile {
    regs: Vec<Register>,
    tuples: Vec<RegisterIndex>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next register index for a register of the given family.
    ///
    /// Exceeding the index capacity is a build-system limit, not a
    /// recoverable error.
    pub fn append(&mut self, family: RegisterFamily) -> RegisterIndex {
        let index = self.reg_num();
        assert!(
            index <= MAX_REGISTER_INDEX,
            "register file capacity exceeded ({index} registers)"
        );
        self.regs.push(Register::new(family));
        RegisterIndex(index as u16)
    }

    /// Append a run of existing register indices and return the index of its
    /// first element.
    ///
    /// Every supplied index must already be in the file; a forward reference
    /// is an internal compiler bug.
    pub fn append_tuple(&mut self, indices: &[RegisterIndex]) -> TupleIndex {
        let start = TupleIndex(self.tuples.len() as u32);
        for &index in indices {
            assert!(
                (index.0 as u32) < self.reg_num(),
                "tuple references unknown register {index:?}"
            );
            self.tuples.push(index);
        }
        start
    }

    /// Return a copy of the register at `index`.
    pub fn get(&self, index: RegisterIndex) -> Register {
        assert!(
            (index.0 as u32) < self.reg_num(),
            "register index {index:?} out of range"
        );
        self.regs[index.0 as usize]
    }

    /// Return the register index stored at `tuple + which`.
    pub fn get_tuple(&self, tuple: TupleIndex, which: u32) -> RegisterIndex {
        let pos = tuple.0 as usize + which as usize;
        assert!(pos < self.tuples.len(), "tuple index {tuple:?}+{which} out of range");
        self.tuples[pos]
    }

    /// Number of registers appended so far.
    pub fn reg_num(&self) -> u32 {
        self.regs.len() as u32
    }

    /// Number of indices appended across all tuples.
    pub fn tuple_num(&self) -> u32 {
        self.tuples.len() as u32
    }
}
