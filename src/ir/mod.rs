// This module defines the hardware-independent IR surface the backend consumes read-only:
// operation codes for the arithmetic/logic/control/memory operations of parallel kernels,
// a flat instruction representation whose operands are RegisterIndex values into the
// owning function's RegisterFile, the per-function container tying instructions and
// register file together, and the kernel metadata record (SIMD width, shared-local-memory
// use, per-lane stack size) that generation contexts query through the KernelInfo trait.
// The backend never mutates IR; fronts ends build it, selection walks it once per
// function. Memory operations carry their variable-length address/data operand lists as
// register tuples so that instruction shapes stay fixed-arity.

//! Hardware-independent IR read surface.
//!
//! Selection consumes [`Function`] bodies instruction by instruction; the
//! generation context consumes [`Kernel`] metadata through
//! [`KernelInfo`](crate::core::KernelInfo).

use crate::core::adaptor::KernelInfo;
use crate::core::register_file::{RegisterFile, RegisterIndex, TupleIndex};

/// Hardware-independent operation codes.
///
/// Every reachable opcode has exactly one selection shape on every supported
/// hardware generation; a missing mapping is a build failure for the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Branch-target marker.
    Label,
    // Unary.
    Mov,
    Not,
    /// Leading-zero count.
    Lzd,
    /// Round toward zero.
    RndZ,
    /// Round to nearest even.
    RndE,
    /// Round down.
    RndD,
    /// Round up.
    RndU,
    /// Fractional part.
    Frc,
    // Binary.
    Sel,
    And,
    Or,
    Xor,
    Shr,
    Shl,
    /// Rotate right.
    Rsr,
    /// Rotate left.
    Rsl,
    /// Arithmetic shift right.
    Asr,
    Add,
    Mul,
    /// Multiply-accumulate high.
    MulHi,
    // Compare.
    Cmp,
    SelCmp,
    // Ternary.
    Mad,
    // Control.
    Br,
    Ret,
    Nop,
    Wait,
    Barrier,
    // Extended-math unit.
    Sqrt,
    Rsq,
    Inv,
    Log,
    Exp,
    Sin,
    Cos,
    Pow,
    Div,
    Rem,
    // Memory.
    Load,
    Store,
    Sample,
}

/// Comparison condition selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Position of a branch target in a function's label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelIndex(pub u16);

/// Tuple-indexed operand lists of a memory operation.
///
/// `addr` and `data` name contiguous runs in the function's tuple table;
/// the counts are fixed by the operation, the tuple length is not encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRef {
    pub addr: TupleIndex,
    pub addr_num: u8,
    pub data: TupleIndex,
    pub data_num: u8,
    /// Element width in bytes (1, 2 or 4).
    pub elem_bytes: u8,
}

/// One IR instruction. Operands are indices into the owning function's
/// register file; only the fields meaningful for the opcode are populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dst: Option<RegisterIndex>,
    /// Flag destination of a comparison.
    pub flag: Option<RegisterIndex>,
    pub src: Vec<RegisterIndex>,
    pub cmp: Option<CmpOp>,
    pub target: Option<LabelIndex>,
    /// Predicate register of a conditional branch.
    pub predicate: Option<RegisterIndex>,
    pub mem: Option<MemoryRef>,
}

impl Instruction {
    fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            dst: None,
            flag: None,
            src: Vec::new(),
            cmp: None,
            target: None,
            predicate: None,
            mem: None,
        }
    }

    /// Build a no-operand instruction (`Ret`, `Nop`, `Wait`, `Barrier`).
    pub fn nullary(opcode: Opcode) -> Self {
        Self::bare(opcode)
    }

    /// Build a branch-target marker.
    pub fn label(target: LabelIndex) -> Self {
        let mut inst = Self::bare(Opcode::Label);
        inst.target = Some(target);
        inst
    }

    /// Build a one-source instruction.
    pub fn unary(opcode: Opcode, dst: RegisterIndex, src: RegisterIndex) -> Self {
        let mut inst = Self::bare(opcode);
        inst.dst = Some(dst);
        inst.src = vec![src];
        inst
    }

    /// Build a two-source instruction.
    pub fn binary(
        opcode: Opcode,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: RegisterIndex,
    ) -> Self {
        let mut inst = Self::bare(opcode);
        inst.dst = Some(dst);
        inst.src = vec![src0, src1];
        inst
    }

    /// Build a comparison. `dst` carries the value destination of `SelCmp`.
    pub fn compare(
        opcode: Opcode,
        cmp: CmpOp,
        flag: RegisterIndex,
        dst: Option<RegisterIndex>,
        src0: RegisterIndex,
        src1: RegisterIndex,
    ) -> Self {
        let mut inst = Self::bare(opcode);
        inst.flag = Some(flag);
        inst.dst = dst;
        inst.cmp = Some(cmp);
        inst.src = vec![src0, src1];
        inst
    }

    /// Build a multiply-add. The destination doubles as accumulator.
    pub fn mad(dst: RegisterIndex, src0: RegisterIndex, src1: RegisterIndex) -> Self {
        let mut inst = Self::bare(Opcode::Mad);
        inst.dst = Some(dst);
        inst.src = vec![src0, src1];
        inst
    }

    /// Build a branch, conditional when `predicate` is set.
    pub fn branch(target: LabelIndex, predicate: Option<RegisterIndex>) -> Self {
        let mut inst = Self::bare(Opcode::Br);
        inst.target = Some(target);
        inst.predicate = predicate;
        inst
    }

    /// Build an extended-math operation. `src1` is only present for the
    /// two-source functions (`Pow`, `Div`, `Rem`).
    pub fn math(
        opcode: Opcode,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: Option<RegisterIndex>,
    ) -> Self {
        let mut inst = Self::bare(opcode);
        inst.dst = Some(dst);
        inst.src = match src1 {
            Some(s1) => vec![src0, s1],
            None => vec![src0],
        };
        inst
    }

    /// Build a memory operation over tuple-indexed operand lists.
    pub fn memory(opcode: Opcode, mem: MemoryRef) -> Self {
        let mut inst = Self::bare(opcode);
        inst.mem = Some(mem);
        inst
    }
}

/// One function under compilation: its register file, label table size and
/// instruction body.
#[derive(Debug, Default)]
pub struct Function {
    pub name: String,
    file: RegisterFile,
    insts: Vec<Instruction>,
    label_num: u16,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn file(&self) -> &RegisterFile {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut RegisterFile {
        &mut self.file
    }

    /// Allocate the next label index.
    pub fn new_label(&mut self) -> LabelIndex {
        let index = LabelIndex(self.label_num);
        self.label_num += 1;
        index
    }

    pub fn label_num(&self) -> u16 {
        self.label_num
    }

    pub fn push(&mut self, inst: Instruction) {
        self.insts.push(inst);
    }

    pub fn insts(&self) -> &[Instruction] {
        &self.insts
    }
}

/// Kernel metadata record.
///
/// The generation context reads this through the
/// [`KernelInfo`](crate::core::KernelInfo) query trait only.
#[derive(Debug, Clone)]
pub struct Kernel {
    pub name: String,
    pub simd_width: u32,
    pub use_slm: bool,
    /// Per-lane private stack size in bytes; 0 means no stack use.
    pub stack_size: u32,
}

impl Kernel {
    pub fn new(name: impl Into<String>, simd_width: u32) -> Self {
        Self {
            name: name.into(),
            simd_width,
            use_slm: false,
            stack_size: 0,
        }
    }
}

impl KernelInfo for Kernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn use_slm(&self) -> bool {
        self.use_slm
    }

    fn stack_size(&self) -> u32 {
        self.stack_size
    }

    fn simd_width(&self) -> u32 {
        self.simd_width
    }
}

/// Well-known virtual register numbers preassigned in every kernel.
pub mod ocl {
    /// Virtual register carrying the per-lane stack pointer.
    pub const STACK_PTR: u32 = 22;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::register_file::RegisterFamily;

    #[test]
    fn test_function_labels_are_sequential() {
        let mut func = Function::new("f");
        assert_eq!(func.new_label(), LabelIndex(0));
        assert_eq!(func.new_label(), LabelIndex(1));
        assert_eq!(func.label_num(), 2);
    }

    #[test]
    fn test_instruction_builders_populate_operands() {
        let mut func = Function::new("f");
        let a = func.file_mut().append(RegisterFamily::Dword);
        let b = func.file_mut().append(RegisterFamily::Dword);
        let d = func.file_mut().append(RegisterFamily::Dword);

        let add = Instruction::binary(Opcode::Add, d, a, b);
        assert_eq!(add.dst, Some(d));
        assert_eq!(add.src, vec![a, b]);

        let mov = Instruction::unary(Opcode::Mov, d, a);
        assert_eq!(mov.src.len(), 1);

        let ret = Instruction::nullary(Opcode::Ret);
        assert!(ret.dst.is_none() && ret.src.is_empty());
    }

    #[test]
    fn test_kernel_metadata_queries() {
        let mut kernel = Kernel::new("k", 16);
        kernel.use_slm = true;
        kernel.stack_size = 256;
        let info: &dyn KernelInfo = &kernel;
        assert_eq!(info.name(), "k");
        assert!(info.use_slm());
        assert_eq!(info.stack_size(), 256);
        assert_eq!(info.simd_width(), 16);
    }
}
