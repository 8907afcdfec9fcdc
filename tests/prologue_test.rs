//! Prologue emission tests.
//!
//! These tests drive the Gen 7.5 emission hooks through a GenContext and
//! check the recorded stream three ways: instruction counts for the no-op
//! and active branches, scope discipline (caller-visible emission state is
//! identical before and after every hook), and a small interpreter that
//! executes the recorded stream against seeded thread-identifier inputs and
//! checks every lane's final stack pointer.

use std::collections::HashMap;

use bumpalo::Bump;

use gpugen::core::CompilationSession;
use gpugen::gen::{
    ArchFile, EncodedInst, Gen75, GenContext, GenRegister, PassthroughAllocator, Predicate,
    RegType,
};
use gpugen::ir::Kernel;
use gpugen::SelectionOpcode;

/// Register state identifying the hardware thread, delivered in r0.5.
const THREAD_ID_RAW: u32 = 0x1d3;

fn make_context<'a>(
    kernel: &'a Kernel,
    session: &'a CompilationSession<'a>,
) -> GenContext<'a> {
    GenContext::new(
        Box::new(Gen75::new()),
        kernel,
        Box::new(PassthroughAllocator),
        session,
    )
    .expect("valid SIMD width")
}

/// Element-wise interpreter over the recorded prologue stream.
///
/// Storage is dword-granular and byte-addressed: a GRF designator addresses
/// `width` consecutive dwords starting at `nr * 32 + subnr`.
#[derive(Default)]
struct Machine {
    grf: HashMap<u32, u32>,
    state: HashMap<u32, u32>,
}

impl Machine {
    fn seed_grf(&mut self, nr: u32, subnr_dwords: u32, value: u32) {
        self.grf.insert(nr * 32 + subnr_dwords * 4, value);
    }

    fn read_grf(&self, nr: u32, subnr_dwords: u32) -> u32 {
        *self.grf.get(&(nr * 32 + subnr_dwords * 4)).unwrap_or(&0)
    }

    fn read_state(&self, nr: u32, subnr_dwords: u32) -> u32 {
        *self.state.get(&(nr * 32 + subnr_dwords * 4)).unwrap_or(&0)
    }

    fn read_elem(&self, reg: &GenRegister, lane: u32) -> u32 {
        match reg.file {
            ArchFile::Imm => match reg.ty {
                // Packed nibble vector: lane i reads nibble i.
                RegType::V => (reg.value >> (4 * lane)) & 0xf,
                _ => reg.value,
            },
            ArchFile::Grf => {
                // Scalar sources broadcast lane 0.
                let lane = if reg.width == 1 { 0 } else { lane };
                let byte = reg.nr * 32 + reg.subnr + lane * reg.ty.size();
                *self.grf.get(&byte).unwrap_or(&0)
            }
            ArchFile::State => *self.state.get(&(reg.nr * 32 + reg.subnr)).unwrap_or(&0),
        }
    }

    fn write_elem(&mut self, reg: &GenRegister, lane: u32, value: u32) {
        let byte = reg.nr * 32 + reg.subnr + lane * reg.ty.size();
        match reg.file {
            ArchFile::Grf => {
                self.grf.insert(byte, value);
            }
            ArchFile::State => {
                self.state.insert(byte, value);
            }
            ArchFile::Imm => panic!("immediate destination"),
        }
    }

    fn run(&mut self, insts: &[EncodedInst]) {
        for inst in insts {
            let dst = inst.dst.as_ref().expect("prologue instructions have destinations");
            for lane in 0..inst.exec_width {
                let a = self.read_elem(&inst.srcs[0], lane);
                let result = match inst.opcode {
                    SelectionOpcode::Mov => a,
                    SelectionOpcode::And => a & self.read_elem(&inst.srcs[1], lane),
                    SelectionOpcode::Shr => a >> self.read_elem(&inst.srcs[1], lane),
                    SelectionOpcode::Shl => a << self.read_elem(&inst.srcs[1], lane),
                    SelectionOpcode::Add => a.wrapping_add(self.read_elem(&inst.srcs[1], lane)),
                    SelectionOpcode::Mul => a.wrapping_mul(self.read_elem(&inst.srcs[1], lane)),
                    other => panic!("prologue simulator does not model {other}"),
                };
                self.write_elem(dst, lane, result);
            }
        }
    }
}

/// Combined per-thread base index the hardware sequence reconstructs from
/// the two components of r0.5.
fn thread_base(raw: u32) -> u32 {
    ((raw & 0x7f) << 2) + ((raw & 0x180) >> 7)
}

fn run_stack_pointer(per_lane: u32, simd_width: u32) -> (Vec<u32>, Vec<EncodedInst>) {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut kernel = Kernel::new("sp", simd_width);
    kernel.stack_size = per_lane;
    let mut ctx = make_context(&kernel, &session);

    let before = ctx.emission_state();
    ctx.emit_stack_pointer();
    assert_eq!(ctx.emission_state(), before, "hook leaked emission state");

    let insts = ctx.instructions().to_vec();
    let mut machine = Machine::default();
    machine.seed_grf(0, 5, THREAD_ID_RAW);
    machine.run(&insts);

    let stackptr_nr = gpugen::ir::ocl::STACK_PTR;
    let lanes = (0..simd_width)
        .map(|lane| machine.read_grf(stackptr_nr + lane / 8, lane % 8))
        .collect();
    (lanes, insts)
}

#[test]
fn test_slm_offset_noop_without_slm() {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let kernel = Kernel::new("noslm", 16);
    let mut ctx = make_context(&kernel, &session);

    let before = ctx.emission_state();
    ctx.emit_slm_offset();
    assert!(ctx.instructions().is_empty());
    assert_eq!(ctx.emission_state(), before);
}

#[test]
fn test_slm_offset_emits_one_relocation() {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut kernel = Kernel::new("slm", 16);
    kernel.use_slm = true;
    let mut ctx = make_context(&kernel, &session);

    let before = ctx.emission_state();
    ctx.emit_slm_offset();
    assert_eq!(ctx.emission_state(), before);

    let insts = ctx.instructions();
    assert_eq!(insts.len(), 1);
    let inst = &insts[0];
    assert_eq!(inst.opcode, SelectionOpcode::Shr);
    assert_eq!(inst.exec_width, 1);
    assert_eq!(inst.predicate, Predicate::None);
    let dst = inst.dst.expect("relocation has a destination");
    assert_eq!(dst.file, ArchFile::State);

    // The 4K-unit SLM index from r0.0 bits 24-27 must land in bits 8-11.
    let mut machine = Machine::default();
    machine.seed_grf(0, 0, 0x0a00_0000);
    machine.run(insts);
    assert_eq!(machine.read_state(0, 1), 0x0a00);
    assert_eq!((machine.read_state(0, 1) >> 8) & 0xf, 0xa);
}

#[test]
fn test_stack_pointer_noop_without_stack() {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let kernel = Kernel::new("nostack", 8);
    let mut ctx = make_context(&kernel, &session);

    let before = ctx.emission_state();
    ctx.emit_stack_pointer();
    assert!(ctx.instructions().is_empty());
    assert_eq!(ctx.emission_state(), before);
}

#[test]
fn test_stack_pointer_single_multiply_path() {
    // T = 256 * 16 = 4096 fits a word immediate.
    let (lanes, insts) = run_stack_pointer(256, 16);

    let muls = insts
        .iter()
        .filter(|i| i.opcode == SelectionOpcode::Mul)
        .count();
    // One lane-scaling multiply plus one combined per-thread multiply.
    assert_eq!(muls, 2);

    let base = thread_base(THREAD_ID_RAW);
    for (lane, &sp) in lanes.iter().enumerate() {
        assert_eq!(sp, lane as u32 * 256 + base * 4096, "lane {lane}");
    }
}

#[test]
fn test_stack_pointer_single_multiply_path_wide_lane_size() {
    // T = 2000 * 16 = 32000 still fits a word immediate.
    let (lanes, insts) = run_stack_pointer(2000, 16);

    let muls = insts
        .iter()
        .filter(|i| i.opcode == SelectionOpcode::Mul)
        .count();
    assert_eq!(muls, 2);

    let base = thread_base(THREAD_ID_RAW);
    for (lane, &sp) in lanes.iter().enumerate() {
        assert_eq!(sp, lane as u32 * 2000 + base * 32_000, "lane {lane}");
    }
}

#[test]
fn test_stack_pointer_two_step_multiply_path() {
    // T = 4096 * 16 = 65536 overflows a word immediate; the per-thread
    // scale must be applied as two chained word-immediate multiplies.
    let (lanes, insts) = run_stack_pointer(4096, 16);

    let muls = insts
        .iter()
        .filter(|i| i.opcode == SelectionOpcode::Mul)
        .count();
    assert_eq!(muls, 3);
    // Every multiply still carries a word-width immediate.
    for inst in insts.iter().filter(|i| i.opcode == SelectionOpcode::Mul) {
        let imm = inst.srcs[1];
        assert_eq!(imm.file, ArchFile::Imm);
        assert_eq!(imm.ty, RegType::Uw);
    }

    let base = thread_base(THREAD_ID_RAW);
    for (lane, &sp) in lanes.iter().enumerate() {
        assert_eq!(sp, lane as u32 * 4096 + base * 65_536, "lane {lane}");
    }
}

#[test]
fn test_stack_pointer_simd8() {
    let (lanes, _) = run_stack_pointer(512, 8);
    let base = thread_base(THREAD_ID_RAW);
    assert_eq!(lanes.len(), 8);
    for (lane, &sp) in lanes.iter().enumerate() {
        assert_eq!(sp, lane as u32 * 512 + base * 4096, "lane {lane}");
    }
}

#[test]
fn test_lane_ids_cover_every_lane() {
    // With a unit per-lane size and a zeroed thread id the stack pointers
    // collapse to the lane identifiers themselves.
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut kernel = Kernel::new("lanes", 16);
    kernel.stack_size = 1;
    let mut ctx = make_context(&kernel, &session);
    ctx.emit_stack_pointer();

    let mut machine = Machine::default();
    machine.seed_grf(0, 5, 0);
    machine.run(ctx.instructions());

    let nr = gpugen::ir::ocl::STACK_PTR;
    for lane in 0..16 {
        assert_eq!(machine.read_grf(nr + lane / 8, lane % 8), lane);
    }
}

#[test]
fn test_full_prologue_composes() {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let mut kernel = Kernel::new("full", 16);
    kernel.use_slm = true;
    kernel.stack_size = 128;
    let mut ctx = make_context(&kernel, &session);

    let before = ctx.emission_state();
    ctx.emit_prologue();
    assert_eq!(ctx.emission_state(), before);

    // SLM relocation first, then the stack sequence.
    let insts = ctx.instructions();
    assert_eq!(insts[0].opcode, SelectionOpcode::Shr);
    assert!(insts.len() > 1);
    assert_eq!(session.stats().prologue_instructions, insts.len());
}
