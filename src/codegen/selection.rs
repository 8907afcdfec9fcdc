// This module defines the selection IR: the hardware-shaped instruction representation
// produced once per lowered IR operation and consumed by scheduling, allocation and
// encoding. SelectionInstruction is a tagged variant type with one variant per catalog
// shape, each carrying exactly the operand slots that shape requires; the constructors
// assert that the opcode passed actually belongs to the variant's shape, so a selection
// engine cannot build a malformed entry. SelectionStream is the per-function ordered
// stream, allocated in the compilation session's arena so that entries share the
// session lifetime without reference counting. SelectionEngine is the seam behind which
// each hardware generation installs its own IR-opcode mapping; an IR operation the
// engine cannot map is a build failure for the kernel, never a silent substitution.

//! Selection IR stream and the per-generation lowering engine interface.

use bumpalo::collections::Vec as BumpVec;

use super::catalog::{MathFunction, SelectionOpcode, Shape};
use crate::core::error::CompileResult;
use crate::core::register_file::RegisterIndex;
use crate::core::session::CompilationSession;
use crate::ir::{CmpOp, Function, LabelIndex, MemoryRef};

/// One selection-IR entry. Variants mirror the catalog shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionInstruction {
    Label {
        target: LabelIndex,
    },
    Nullary {
        op: SelectionOpcode,
    },
    Unary {
        op: SelectionOpcode,
        dst: RegisterIndex,
        src: RegisterIndex,
    },
    Binary {
        op: SelectionOpcode,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: RegisterIndex,
    },
    /// The destination doubles as accumulator.
    Ternary {
        op: SelectionOpcode,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: RegisterIndex,
    },
    Compare {
        op: SelectionOpcode,
        cmp: CmpOp,
        flag: RegisterIndex,
        dst: Option<RegisterIndex>,
        src0: RegisterIndex,
        src1: RegisterIndex,
    },
    Jump {
        target: LabelIndex,
        predicate: Option<RegisterIndex>,
    },
    Math {
        function: MathFunction,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: Option<RegisterIndex>,
    },
    Memory {
        op: SelectionOpcode,
        mem: MemoryRef,
    },
}

impl SelectionInstruction {
    pub fn nullary(op: SelectionOpcode) -> Self {
        assert_eq!(op.shape(), Shape::Nullary, "{op} is not a nullary opcode");
        Self::Nullary { op }
    }

    pub fn unary(op: SelectionOpcode, dst: RegisterIndex, src: RegisterIndex) -> Self {
        assert_eq!(op.shape(), Shape::Unary, "{op} is not a unary opcode");
        Self::Unary { op, dst, src }
    }

    pub fn binary(
        op: SelectionOpcode,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: RegisterIndex,
    ) -> Self {
        assert_eq!(op.shape(), Shape::Binary, "{op} is not a binary opcode");
        Self::Binary { op, dst, src0, src1 }
    }

    pub fn ternary(
        op: SelectionOpcode,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: RegisterIndex,
    ) -> Self {
        assert_eq!(op.shape(), Shape::Ternary, "{op} is not a ternary opcode");
        Self::Ternary { op, dst, src0, src1 }
    }

    pub fn compare(
        op: SelectionOpcode,
        cmp: CmpOp,
        flag: RegisterIndex,
        dst: Option<RegisterIndex>,
        src0: RegisterIndex,
        src1: RegisterIndex,
    ) -> Self {
        assert_eq!(op.shape(), Shape::Compare, "{op} is not a compare opcode");
        Self::Compare {
            op,
            cmp,
            flag,
            dst,
            src0,
            src1,
        }
    }

    pub fn jump(target: LabelIndex, predicate: Option<RegisterIndex>) -> Self {
        Self::Jump { target, predicate }
    }

    pub fn math(
        function: MathFunction,
        dst: RegisterIndex,
        src0: RegisterIndex,
        src1: Option<RegisterIndex>,
    ) -> Self {
        let given = 1 + src1.is_some() as usize;
        assert_eq!(
            function.src_num(),
            given,
            "math function {function:?} takes {} source(s), got {given}",
            function.src_num()
        );
        Self::Math {
            function,
            dst,
            src0,
            src1,
        }
    }

    pub fn memory(op: SelectionOpcode, mem: MemoryRef) -> Self {
        assert_eq!(op.shape(), Shape::Memory, "{op} is not a memory opcode");
        Self::Memory { op, mem }
    }

    /// Catalog opcode of this entry.
    pub fn opcode(&self) -> SelectionOpcode {
        match self {
            SelectionInstruction::Label { .. } => SelectionOpcode::Label,
            SelectionInstruction::Nullary { op }
            | SelectionInstruction::Unary { op, .. }
            | SelectionInstruction::Binary { op, .. }
            | SelectionInstruction::Ternary { op, .. }
            | SelectionInstruction::Compare { op, .. }
            | SelectionInstruction::Memory { op, .. } => *op,
            SelectionInstruction::Jump { .. } => SelectionOpcode::Jmpi,
            SelectionInstruction::Math { .. } => SelectionOpcode::Math,
        }
    }

    /// Catalog shape of this entry.
    pub fn shape(&self) -> Shape {
        self.opcode().shape()
    }
}

/// Arena-backed, ordered selection-IR stream of one function.
pub struct SelectionStream<'arena> {
    insts: BumpVec<'arena, SelectionInstruction>,
}

impl<'arena> SelectionStream<'arena> {
    pub fn new(session: &CompilationSession<'arena>) -> Self {
        Self {
            insts: BumpVec::new_in(session.arena()),
        }
    }

    pub fn push(&mut self, inst: SelectionInstruction) {
        self.insts.push(inst);
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionInstruction> {
        self.insts.iter()
    }

    pub fn as_slice(&self) -> &[SelectionInstruction] {
        &self.insts
    }
}

/// Per-generation lowering engine.
///
/// Installed once at context construction via
/// [`Generation::new_selection`](crate::gen::Generation::new_selection);
/// generations may use structurally different engines behind this interface.
pub trait SelectionEngine {
    /// Name of the hardware generation this engine targets.
    fn generation(&self) -> &'static str;

    /// Lower one function's IR body into a selection stream.
    fn lower<'arena>(
        &mut self,
        func: &Function,
        session: &CompilationSession<'arena>,
    ) -> CompileResult<SelectionStream<'arena>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::register_file::RegisterIndex;

    #[test]
    fn test_constructors_carry_shape() {
        let d = RegisterIndex(0);
        let a = RegisterIndex(1);
        let b = RegisterIndex(2);

        let inst = SelectionInstruction::binary(SelectionOpcode::Add, d, a, b);
        assert_eq!(inst.shape(), Shape::Binary);
        assert_eq!(inst.opcode(), SelectionOpcode::Add);

        let inst = SelectionInstruction::nullary(SelectionOpcode::Barrier);
        assert_eq!(inst.shape(), Shape::Nullary);
    }

    #[test]
    #[should_panic(expected = "not a unary opcode")]
    fn test_shape_mismatch_is_fatal() {
        SelectionInstruction::unary(SelectionOpcode::Add, RegisterIndex(0), RegisterIndex(1));
    }

    #[test]
    #[should_panic(expected = "takes 2 source(s)")]
    fn test_math_arity_mismatch_is_fatal() {
        SelectionInstruction::math(MathFunction::Pow, RegisterIndex(0), RegisterIndex(1), None);
    }
}
