// This module provides the typed, validated emission primitives the generation context
// and the post-scheduling handoff drive. GenEncoder records a stream of EncodedInst
// entries: the catalog opcode, the execution width and predicate state captured at
// emission time, and the physical operand designators. Emission calls correspond 1:1 to
// the catalog shapes, with thin ALU conveniences on top so prologue code reads like the
// instruction sequence it produces. The current execution width and predicate enable are
// scoped mutable hardware state: scope() returns a guard that captures the caller's
// state and restores it on every exit path, including early returns, so emission hooks
// compose safely back-to-back. Operand preconditions (destination not an immediate,
// destination width matching the execution width, packed-vector immediates only at
// width 8) are internal contracts enforced with assertions. Bit-level packing of the
// recorded stream into hardware instruction words happens outside this crate.

//! Typed instruction emission with scoped state overrides.

use std::fmt;
use std::ops::{Deref, DerefMut};

use hashbrown::HashMap;

use crate::codegen::catalog::{MathFunction, SelectionOpcode, Shape};
use crate::gen::registers::{ArchFile, GenRegister, RegType};
use crate::ir::{CmpOp, LabelIndex};

/// Per-lane enable mask control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Predication disabled; all lanes execute.
    None,
    /// Predicated on the current flag register.
    Normal,
}

/// The scoped "current emission state".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionState {
    pub exec_width: u32,
    pub predicate: Predicate,
}

/// Shape-specific payload of a recorded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstExtra {
    None,
    Cmp(CmpOp),
    Math(MathFunction),
    Jump(LabelIndex),
    Label(LabelIndex),
    Memory { elem_bytes: u8 },
}

/// One recorded instruction, ready for bit-level packing downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInst {
    pub opcode: SelectionOpcode,
    pub exec_width: u32,
    pub predicate: Predicate,
    pub dst: Option<GenRegister>,
    pub srcs: Vec<GenRegister>,
    pub extra: InstExtra,
}

impl fmt::Display for EncodedInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.extra {
            InstExtra::Label(label) => return write!(f, "L{}:", label.0),
            InstExtra::Math(function) => write!(f, "math.{function:?}({})", self.exec_width)?,
            _ => write!(f, "{}({})", self.opcode, self.exec_width)?,
        }
        let mut parts: Vec<String> = Vec::new();
        if let Some(ref dst) = self.dst {
            parts.push(dst.to_string());
        }
        parts.extend(self.srcs.iter().map(|src| src.to_string()));
        match self.extra {
            InstExtra::Jump(label) => parts.push(format!("-> L{}", label.0)),
            InstExtra::Cmp(cmp) => parts.push(format!(".{cmp:?}")),
            InstExtra::Memory { elem_bytes } => parts.push(format!("elem:{elem_bytes}")),
            _ => {}
        }
        if !parts.is_empty() {
            write!(f, " {}", parts.join(", "))?;
        }
        if self.predicate == Predicate::None {
            write!(f, " {{nopred}}")?;
        }
        Ok(())
    }
}

/// Instruction recorder with scoped emission state.
pub struct GenEncoder {
    /// Current emission state; override through [`GenEncoder::scope`].
    pub curr: EmissionState,
    insts: Vec<EncodedInst>,
    labels: HashMap<LabelIndex, usize>,
}

impl GenEncoder {
    /// Create an encoder whose default execution width is the kernel's SIMD
    /// width.
    pub fn new(simd_width: u32) -> Self {
        Self {
            curr: EmissionState {
                exec_width: simd_width,
                predicate: Predicate::Normal,
            },
            insts: Vec::new(),
            labels: HashMap::new(),
        }
    }

    fn check_dst(&self, dst: &GenRegister) {
        assert!(!dst.is_imm(), "destination cannot be an immediate");
        assert_eq!(
            dst.width, self.curr.exec_width,
            "destination width {} does not match execution width {}",
            dst.width, self.curr.exec_width
        );
    }

    fn check_src(&self, src: &GenRegister) {
        if src.ty == RegType::V {
            assert_eq!(
                self.curr.exec_width, 8,
                "packed-vector immediates require execution width 8"
            );
        }
        if src.file == ArchFile::Grf {
            assert!(
                src.width == 1 || src.width == self.curr.exec_width,
                "source width {} is neither scalar nor execution width {}",
                src.width,
                self.curr.exec_width
            );
        }
    }

    fn record(
        &mut self,
        opcode: SelectionOpcode,
        dst: Option<GenRegister>,
        srcs: Vec<GenRegister>,
        extra: InstExtra,
    ) {
        if let Some(ref dst) = dst {
            self.check_dst(dst);
        }
        for src in &srcs {
            self.check_src(src);
        }
        log::trace!(
            "emit {opcode} width={} pred={:?}",
            self.curr.exec_width,
            self.curr.predicate
        );
        self.insts.push(EncodedInst {
            opcode,
            exec_width: self.curr.exec_width,
            predicate: self.curr.predicate,
            dst,
            srcs,
            extra,
        });
    }

    /// Record a no-operand instruction.
    pub fn emit_nullary(&mut self, op: SelectionOpcode) {
        assert_eq!(op.shape(), Shape::Nullary, "{op} is not a nullary opcode");
        self.record(op, None, Vec::new(), InstExtra::None);
    }

    /// Record a one-source instruction.
    pub fn emit_unary(&mut self, op: SelectionOpcode, dst: GenRegister, src: GenRegister) {
        assert_eq!(op.shape(), Shape::Unary, "{op} is not a unary opcode");
        self.record(op, Some(dst), vec![src], InstExtra::None);
    }

    /// Record a two-source instruction.
    pub fn emit_binary(
        &mut self,
        op: SelectionOpcode,
        dst: GenRegister,
        src0: GenRegister,
        src1: GenRegister,
    ) {
        assert_eq!(op.shape(), Shape::Binary, "{op} is not a binary opcode");
        self.record(op, Some(dst), vec![src0, src1], InstExtra::None);
    }

    /// Record a multiply-add; the destination doubles as accumulator.
    pub fn emit_ternary(
        &mut self,
        op: SelectionOpcode,
        dst: GenRegister,
        src0: GenRegister,
        src1: GenRegister,
    ) {
        assert_eq!(op.shape(), Shape::Ternary, "{op} is not a ternary opcode");
        self.record(op, Some(dst), vec![src0, src1], InstExtra::None);
    }

    /// Record a comparison; `dst` is the value destination of a
    /// select-by-compare.
    pub fn emit_compare(
        &mut self,
        op: SelectionOpcode,
        cmp: CmpOp,
        dst: Option<GenRegister>,
        src0: GenRegister,
        src1: GenRegister,
    ) {
        assert_eq!(op.shape(), Shape::Compare, "{op} is not a compare opcode");
        self.record(op, dst, vec![src0, src1], InstExtra::Cmp(cmp));
    }

    /// Record a jump to `target`; conditional under the current predicate
    /// state.
    pub fn emit_jump(&mut self, target: LabelIndex) {
        self.record(SelectionOpcode::Jmpi, None, Vec::new(), InstExtra::Jump(target));
    }

    /// Record an extended-math operation.
    pub fn emit_math(
        &mut self,
        function: MathFunction,
        dst: GenRegister,
        src0: GenRegister,
        src1: Option<GenRegister>,
    ) {
        let mut srcs = vec![src0];
        srcs.extend(src1);
        assert_eq!(
            function.src_num(),
            srcs.len(),
            "math function {function:?} takes {} source(s)",
            function.src_num()
        );
        self.record(SelectionOpcode::Math, Some(dst), srcs, InstExtra::Math(function));
    }

    /// Record a memory operation over already-flattened operand lists.
    pub fn emit_memory(
        &mut self,
        op: SelectionOpcode,
        addr: &[GenRegister],
        data: &[GenRegister],
        elem_bytes: u8,
    ) {
        assert_eq!(op.shape(), Shape::Memory, "{op} is not a memory opcode");
        let mut srcs = Vec::with_capacity(addr.len() + data.len());
        srcs.extend_from_slice(addr);
        srcs.extend_from_slice(data);
        self.record(op, None, srcs, InstExtra::Memory { elem_bytes });
    }

    /// Place `target` at the current stream position. Placing a label twice
    /// is an internal compiler bug.
    pub fn place_label(&mut self, target: LabelIndex) {
        let pos = self.insts.len();
        let prev = self.labels.insert(target, pos);
        assert!(prev.is_none(), "label {target:?} placed twice");
        self.insts.push(EncodedInst {
            opcode: SelectionOpcode::Label,
            exec_width: self.curr.exec_width,
            predicate: self.curr.predicate,
            dst: None,
            srcs: Vec::new(),
            extra: InstExtra::Label(target),
        });
    }

    /// Stream position of a placed label.
    pub fn label_position(&self, target: LabelIndex) -> Option<usize> {
        self.labels.get(&target).copied()
    }

    // ALU conveniences used by prologue emission.

    pub fn mov(&mut self, dst: GenRegister, src: GenRegister) {
        self.emit_unary(SelectionOpcode::Mov, dst, src);
    }

    pub fn and(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::And, dst, src0, src1);
    }

    pub fn or(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::Or, dst, src0, src1);
    }

    pub fn xor(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::Xor, dst, src0, src1);
    }

    pub fn shr(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::Shr, dst, src0, src1);
    }

    pub fn shl(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::Shl, dst, src0, src1);
    }

    pub fn asr(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::Asr, dst, src0, src1);
    }

    pub fn add(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::Add, dst, src0, src1);
    }

    pub fn mul(&mut self, dst: GenRegister, src0: GenRegister, src1: GenRegister) {
        self.emit_binary(SelectionOpcode::Mul, dst, src0, src1);
    }

    /// Open a scoped override of the emission state. The caller-visible
    /// state is restored when the guard drops, on every exit path.
    pub fn scope(&mut self) -> StateScope<'_> {
        let saved = self.curr;
        StateScope { enc: self, saved }
    }

    /// Instructions recorded so far.
    pub fn insts(&self) -> &[EncodedInst] {
        &self.insts
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    /// Hand the recorded stream onward.
    pub fn into_insts(self) -> Vec<EncodedInst> {
        self.insts
    }
}

/// Scope guard over [`GenEncoder::curr`]. Captures the prior state on
/// construction and restores it on drop.
pub struct StateScope<'a> {
    enc: &'a mut GenEncoder,
    saved: EmissionState,
}

impl Deref for StateScope<'_> {
    type Target = GenEncoder;

    fn deref(&self) -> &GenEncoder {
        self.enc
    }
}

impl DerefMut for StateScope<'_> {
    fn deref_mut(&mut self) -> &mut GenEncoder {
        self.enc
    }
}

impl Drop for StateScope<'_> {
    fn drop(&mut self) {
        self.enc.curr = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_restores_state() {
        let mut enc = GenEncoder::new(16);
        let before = enc.curr;
        {
            let mut p = enc.scope();
            p.curr.exec_width = 1;
            p.curr.predicate = Predicate::None;
            p.mov(GenRegister::ud1grf(1, 0), GenRegister::immud(42));
        }
        assert_eq!(enc.curr, before);
    }

    #[test]
    fn test_scopes_nest() {
        let mut enc = GenEncoder::new(8);
        {
            let mut outer = enc.scope();
            outer.curr.exec_width = 1;
            {
                let mut inner = outer.scope();
                inner.curr.predicate = Predicate::None;
            }
            assert_eq!(outer.curr.predicate, Predicate::Normal);
            assert_eq!(outer.curr.exec_width, 1);
        }
        assert_eq!(enc.curr.exec_width, 8);
    }

    #[test]
    fn test_emission_captures_state() {
        let mut enc = GenEncoder::new(16);
        {
            let mut p = enc.scope();
            p.curr.exec_width = 1;
            p.curr.predicate = Predicate::None;
            p.shr(
                GenRegister::sr(0, 1),
                GenRegister::ud1grf(0, 0),
                GenRegister::immud(16),
            );
        }
        let inst = &enc.insts()[0];
        assert_eq!(inst.exec_width, 1);
        assert_eq!(inst.predicate, Predicate::None);
        assert_eq!(inst.opcode, SelectionOpcode::Shr);
    }

    #[test]
    #[should_panic(expected = "destination cannot be an immediate")]
    fn test_immediate_destination_is_fatal() {
        let mut enc = GenEncoder::new(8);
        let imm = GenRegister::immud(1);
        enc.mov(imm, GenRegister::ud8grf(2));
    }

    #[test]
    #[should_panic(expected = "placed twice")]
    fn test_duplicate_label_is_fatal() {
        let mut enc = GenEncoder::new(8);
        enc.place_label(LabelIndex(3));
        enc.place_label(LabelIndex(3));
    }

    #[test]
    fn test_shape_level_emission() {
        let mut enc = GenEncoder::new(8);
        enc.emit_nullary(SelectionOpcode::Barrier);
        enc.emit_ternary(
            SelectionOpcode::Mad,
            GenRegister::ud8grf(4),
            GenRegister::ud8grf(5),
            GenRegister::ud8grf(6),
        );
        enc.emit_compare(
            SelectionOpcode::Cmp,
            CmpOp::Lt,
            None,
            GenRegister::ud8grf(5),
            GenRegister::ud8grf(6),
        );
        enc.emit_jump(LabelIndex(2));
        enc.emit_math(
            MathFunction::Pow,
            GenRegister::ud8grf(4),
            GenRegister::ud8grf(5),
            Some(GenRegister::ud8grf(6)),
        );
        enc.emit_memory(
            SelectionOpcode::UntypedRead,
            &[GenRegister::ud8grf(7)],
            &[GenRegister::ud8grf(8)],
            4,
        );
        assert_eq!(enc.len(), 6);
        assert_eq!(enc.insts()[3].extra, InstExtra::Jump(LabelIndex(2)));
        assert_eq!(enc.insts()[5].extra, InstExtra::Memory { elem_bytes: 4 });
    }

    #[test]
    fn test_label_positions() {
        let mut enc = GenEncoder::new(8);
        enc.place_label(LabelIndex(0));
        enc.mov(GenRegister::ud8grf(1), GenRegister::ud8grf(2));
        enc.place_label(LabelIndex(1));
        assert_eq!(enc.label_position(LabelIndex(0)), Some(0));
        assert_eq!(enc.label_position(LabelIndex(1)), Some(2));
        assert_eq!(enc.label_position(LabelIndex(2)), None);
    }
}
