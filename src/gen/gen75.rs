// This module implements the Gen 7.5 hardware generation: its fixed prologue sequences,
// its scratch-buffer size rounding and its selection engine. The SLM relocation moves
// the 4-KiB-granularity shared-memory base index that arrives in r0.0 bits 24-27 into
// sr0.1 bits 8-11 with a single width-1 shift. The stack-pointer sequence loads a lane
// identifier per SIMD lane, extracts the two thread-identifier components from r0.5 at
// width 1, scales lane ids by the per-lane stack size, combines the components into a
// per-thread base index, and scales that base by the per-thread size: one multiply when
// the size fits a word immediate, a chained per-lane-size-then-width pair when it does
// not. Selection75 is this generation's lowering engine; it maps every IR opcode onto
// the catalog except extended math on qword registers, which the math unit cannot run.

//! Gen 7.5 generation hooks and selection engine.

use crate::codegen::catalog::{MathFunction, SelectionOpcode};
use crate::codegen::selection::{SelectionEngine, SelectionInstruction, SelectionStream};
use crate::core::error::{CompileError, CompileResult};
use crate::core::register_file::RegisterFamily;
use crate::core::session::CompilationSession;
use crate::gen::context::{EmitEnv, Generation};
use crate::gen::encoder::Predicate;
use crate::gen::registers::GenRegister;
use crate::ir::{self, Function, Instruction, Opcode};

/// Minimum scratch-buffer granularity in bytes.
const SCRATCH_GRANULARITY: u32 = 2048;

/// Largest value a word immediate can carry.
const WORD_IMM_MAX: u32 = 0xffff;

/// The Gen 7.5 hardware generation.
#[derive(Debug, Default)]
pub struct Gen75;

impl Gen75 {
    pub fn new() -> Self {
        Self
    }
}

impl Generation for Gen75 {
    fn name(&self) -> &'static str {
        "gen75"
    }

    fn align_scratch_size(&self, size: u32) -> u32 {
        if size == 0 {
            return 0;
        }
        let mut i = SCRATCH_GRANULARITY;
        while i < size {
            i *= 2;
        }
        i
    }

    fn emit_slm_offset(&self, env: &mut EmitEnv<'_>) {
        if !env.kernel.use_slm() {
            return;
        }

        let slm_index = GenRegister::ud1grf(0, 0);
        // The SLM index sits in r0.0 bits 24-27, in 4K units; move it into
        // sr0.1 bits 8-11.
        let mut p = env.encoder.scope();
        p.curr.exec_width = 1;
        p.curr.predicate = Predicate::None;
        let sr0 = GenRegister::sr(0, 1);
        p.shr(sr0, slm_index, GenRegister::immud(16));
    }

    fn emit_stack_pointer(&self, env: &mut EmitEnv<'_>) {
        // Only emit stack pointer computation if we use a stack.
        if env.kernel.stack_size() == 0 {
            return;
        }

        let per_lane_size = env.kernel.stack_size();
        let per_thread_size = per_lane_size * env.simd_width;
        assert!(
            per_lane_size <= WORD_IMM_MAX,
            "per-lane stack size must fit a word immediate"
        );

        let sel_stack_ptr = if env.simd_width == 8 {
            GenRegister::ud8grf(ir::ocl::STACK_PTR)
        } else {
            GenRegister::ud16grf(ir::ocl::STACK_PTR)
        };
        let stackptr = env.ra.gen_reg(sel_stack_ptr);

        env.load_lane_id(stackptr);

        // Per-lane stack pointers; private addresses start from zero.
        let simd_width = env.simd_width;
        let mut p = env.encoder.scope();
        p.curr.exec_width = 1;
        p.curr.predicate = Predicate::None;
        p.and(
            GenRegister::ud1grf(126, 0),
            GenRegister::ud1grf(0, 5),
            GenRegister::immud(0x7f),
        );
        p.and(
            GenRegister::ud1grf(126, 4),
            GenRegister::ud1grf(0, 5),
            GenRegister::immud(0x180),
        );
        p.shr(
            GenRegister::ud1grf(126, 4),
            GenRegister::ud1grf(126, 4),
            GenRegister::immud(7),
        );
        p.curr.exec_width = simd_width;
        p.mul(stackptr, stackptr, GenRegister::immuw(per_lane_size as u16));
        p.curr.exec_width = 1;
        p.shl(
            GenRegister::ud1grf(126, 0),
            GenRegister::ud1grf(126, 0),
            GenRegister::immud(2),
        );
        p.add(
            GenRegister::ud1grf(126, 0),
            GenRegister::ud1grf(126, 0),
            GenRegister::ud1grf(126, 4),
        );
        if per_thread_size > WORD_IMM_MAX {
            // The per-thread size overflows a word immediate; scale by the
            // per-lane size and the width in two steps.
            p.mul(
                GenRegister::ud1grf(126, 0),
                GenRegister::ud1grf(126, 0),
                GenRegister::immuw(per_lane_size as u16),
            );
            p.mul(
                GenRegister::ud1grf(126, 0),
                GenRegister::ud1grf(126, 0),
                GenRegister::immuw(simd_width as u16),
            );
        } else {
            p.mul(
                GenRegister::ud1grf(126, 0),
                GenRegister::ud1grf(126, 0),
                GenRegister::immuw(per_thread_size as u16),
            );
        }
        p.curr.exec_width = simd_width;
        p.add(stackptr, stackptr, GenRegister::ud1grf(126, 0));
    }

    fn new_selection(&self) -> Box<dyn SelectionEngine> {
        Box::new(Selection75::new())
    }
}

/// Gen 7.5 selection engine.
#[derive(Debug, Default)]
pub struct Selection75;

impl Selection75 {
    pub fn new() -> Self {
        Self
    }

    fn math_function(opcode: Opcode) -> MathFunction {
        match opcode {
            Opcode::Sqrt => MathFunction::Sqrt,
            Opcode::Rsq => MathFunction::Rsq,
            Opcode::Inv => MathFunction::Inv,
            Opcode::Log => MathFunction::Log,
            Opcode::Exp => MathFunction::Exp,
            Opcode::Sin => MathFunction::Sin,
            Opcode::Cos => MathFunction::Cos,
            Opcode::Pow => MathFunction::Pow,
            Opcode::Div => MathFunction::IntDivQuotient,
            Opcode::Rem => MathFunction::IntDivRemainder,
            _ => unreachable!("{opcode:?} is not an extended-math opcode"),
        }
    }

    fn lower_inst(
        &self,
        func: &Function,
        inst: &Instruction,
        stream: &mut SelectionStream<'_>,
    ) -> CompileResult<()> {
        use SelectionOpcode as S;

        let dst = || inst.dst.expect("instruction is missing its destination");
        let src = |i: usize| {
            *inst
                .src
                .get(i)
                .unwrap_or_else(|| panic!("instruction is missing source {i}"))
        };

        let lowered = match inst.opcode {
            Opcode::Label => {
                SelectionInstruction::Label {
                    target: inst.target.expect("label marker without a label"),
                }
            }
            // Unary.
            Opcode::Mov => SelectionInstruction::unary(S::Mov, dst(), src(0)),
            Opcode::Not => SelectionInstruction::unary(S::Not, dst(), src(0)),
            Opcode::Lzd => SelectionInstruction::unary(S::Lzd, dst(), src(0)),
            Opcode::RndZ => SelectionInstruction::unary(S::Rndz, dst(), src(0)),
            Opcode::RndE => SelectionInstruction::unary(S::Rnde, dst(), src(0)),
            Opcode::RndD => SelectionInstruction::unary(S::Rndd, dst(), src(0)),
            Opcode::RndU => SelectionInstruction::unary(S::Rndu, dst(), src(0)),
            Opcode::Frc => SelectionInstruction::unary(S::Frc, dst(), src(0)),
            // Binary.
            Opcode::Sel => SelectionInstruction::binary(S::Sel, dst(), src(0), src(1)),
            Opcode::And => SelectionInstruction::binary(S::And, dst(), src(0), src(1)),
            Opcode::Or => SelectionInstruction::binary(S::Or, dst(), src(0), src(1)),
            Opcode::Xor => SelectionInstruction::binary(S::Xor, dst(), src(0), src(1)),
            Opcode::Shr => SelectionInstruction::binary(S::Shr, dst(), src(0), src(1)),
            Opcode::Shl => SelectionInstruction::binary(S::Shl, dst(), src(0), src(1)),
            Opcode::Rsr => SelectionInstruction::binary(S::Rsr, dst(), src(0), src(1)),
            Opcode::Rsl => SelectionInstruction::binary(S::Rsl, dst(), src(0), src(1)),
            Opcode::Asr => SelectionInstruction::binary(S::Asr, dst(), src(0), src(1)),
            Opcode::Add => SelectionInstruction::binary(S::Add, dst(), src(0), src(1)),
            Opcode::Mul => SelectionInstruction::binary(S::Mul, dst(), src(0), src(1)),
            Opcode::MulHi => SelectionInstruction::binary(S::Mach, dst(), src(0), src(1)),
            // Compare.
            Opcode::Cmp | Opcode::SelCmp => {
                let op = if inst.opcode == Opcode::Cmp { S::Cmp } else { S::SelCmp };
                SelectionInstruction::compare(
                    op,
                    inst.cmp.expect("comparison without a condition"),
                    inst.flag.expect("comparison without a flag destination"),
                    inst.dst,
                    src(0),
                    src(1),
                )
            }
            // Ternary.
            Opcode::Mad => SelectionInstruction::ternary(S::Mad, dst(), src(0), src(1)),
            // Control.
            Opcode::Br => SelectionInstruction::jump(
                inst.target.expect("branch without a target"),
                inst.predicate,
            ),
            Opcode::Ret => SelectionInstruction::nullary(S::Eot),
            Opcode::Nop => SelectionInstruction::nullary(S::Nop),
            Opcode::Wait => SelectionInstruction::nullary(S::Wait),
            Opcode::Barrier => SelectionInstruction::nullary(S::Barrier),
            // Extended math. The math unit has no 64-bit support on this
            // generation.
            Opcode::Sqrt
            | Opcode::Rsq
            | Opcode::Inv
            | Opcode::Log
            | Opcode::Exp
            | Opcode::Sin
            | Opcode::Cos => {
                self.check_math_operands(func, inst)?;
                SelectionInstruction::math(Self::math_function(inst.opcode), dst(), src(0), None)
            }
            Opcode::Pow | Opcode::Div | Opcode::Rem => {
                self.check_math_operands(func, inst)?;
                SelectionInstruction::math(
                    Self::math_function(inst.opcode),
                    dst(),
                    src(0),
                    Some(src(1)),
                )
            }
            // Memory. Dword-multiple elements go through the untyped
            // messages, narrower elements through the byte messages.
            Opcode::Load | Opcode::Store | Opcode::Sample => {
                let mem = inst.mem.expect("memory operation without operand tuples");
                let op = match inst.opcode {
                    Opcode::Load if mem.elem_bytes % 4 == 0 => S::UntypedRead,
                    Opcode::Load => S::ByteGather,
                    Opcode::Store if mem.elem_bytes % 4 == 0 => S::UntypedWrite,
                    Opcode::Store => S::ByteScatter,
                    _ => S::Sample,
                };
                SelectionInstruction::memory(op, mem)
            }
        };
        stream.push(lowered);
        Ok(())
    }

    /// The extended-math unit cannot operate on qword registers.
    fn check_math_operands(&self, func: &Function, inst: &Instruction) -> CompileResult<()> {
        let regs = inst.dst.iter().chain(inst.src.iter());
        for &reg in regs {
            if func.file().get(reg).family == RegisterFamily::Qword {
                return Err(CompileError::UnsupportedOpcode {
                    opcode: inst.opcode,
                    generation: self.generation(),
                });
            }
        }
        Ok(())
    }
}

impl SelectionEngine for Selection75 {
    fn generation(&self) -> &'static str {
        "gen75"
    }

    fn lower<'arena>(
        &mut self,
        func: &Function,
        session: &CompilationSession<'arena>,
    ) -> CompileResult<SelectionStream<'arena>> {
        log::debug!(
            "selection: lowering {} ({} instruction(s))",
            func.name,
            func.insts().len()
        );
        let mut stream = SelectionStream::new(session);
        for inst in func.insts() {
            self.lower_inst(func, inst, &mut stream)?;
        }
        Ok(stream)
    }
}
