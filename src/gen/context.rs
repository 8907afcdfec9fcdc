// This module defines the per-hardware-generation orchestrator. GenContext owns the
// active encoder, the register-allocator query handle, the kernel's SIMD execution
// width and the Generation strategy object chosen once at construction; it emits the
// generation-specific fixed sequences (shared-memory offset relocation, per-lane stack
// pointer computation) outside the general selection/scheduling/allocation pipeline and
// installs the generation's selection engine. Generation is a capability object: each
// hardware generation supplies its own implementation of the emission hooks and its own
// catalog-to-opcode mapping, selected at construction time rather than branched on at
// runtime. EmitEnv bundles the resources a hook may touch, plus the shared lane-ID load
// helper every generation's stack-pointer sequence starts from. Nothing here is shared
// across kernels; one context serves one kernel compilation.

//! Generation context and the per-generation hook interface.

use crate::codegen::selection::{SelectionEngine, SelectionStream};
use crate::core::adaptor::KernelInfo;
use crate::core::error::{CompileError, CompileResult};
use crate::core::session::CompilationSession;
use crate::gen::encoder::{EncodedInst, GenEncoder, Predicate};
use crate::gen::registers::GenRegister;
use crate::ir::Function;

/// Register-allocator query interface.
///
/// Given a selection-level designator (virtual register number), returns the
/// assigned physical designator. Allocation heuristics live outside this
/// crate.
pub trait RegisterAllocator {
    fn gen_reg(&self, reg: GenRegister) -> GenRegister;
}

/// Identity mapping, for drivers and tests that pre-assign physical numbers.
pub struct PassthroughAllocator;

impl RegisterAllocator for PassthroughAllocator {
    fn gen_reg(&self, reg: GenRegister) -> GenRegister {
        reg
    }
}

/// Resources an emission hook may touch.
pub struct EmitEnv<'a> {
    pub kernel: &'a dyn KernelInfo,
    pub simd_width: u32,
    pub encoder: &'a mut GenEncoder,
    pub ra: &'a dyn RegisterAllocator,
}

impl EmitEnv<'_> {
    /// Load one identifier per SIMD lane into `dst`.
    ///
    /// The packed nibble-vector immediate covers eight lanes; at SIMD16 the
    /// upper half is derived from the lower by adding 8.
    pub fn load_lane_id(&mut self, dst: GenRegister) {
        let lane_seq = GenRegister::immv(0x7654_3210);
        let low = GenRegister { width: 8, ..dst };
        let mut p = self.encoder.scope();
        p.curr.exec_width = 8;
        p.curr.predicate = Predicate::None;
        p.mov(low, lane_seq);
        if self.simd_width == 16 {
            let high = GenRegister::suboffset(low, 8);
            p.add(high, low, GenRegister::immud(8));
        }
    }
}

/// Hooks one hardware generation implements.
///
/// A generation is chosen once, at context construction; shared code never
/// branches on the generation at runtime.
pub trait Generation {
    /// Generation name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Round a requested scratch-buffer size up to the hardware granularity.
    fn align_scratch_size(&self, size: u32) -> u32;

    /// Relocate the shared-local-memory base index for later addressing.
    /// Must emit nothing when the kernel does not use shared local memory.
    fn emit_slm_offset(&self, env: &mut EmitEnv<'_>);

    /// Compute every lane's private stack pointer. Must emit nothing when
    /// the kernel declares no stack use.
    fn emit_stack_pointer(&self, env: &mut EmitEnv<'_>);

    /// Build this generation's selection engine.
    fn new_selection(&self) -> Box<dyn SelectionEngine>;
}

/// Per-compile orchestrator for one kernel on one hardware generation.
pub struct GenContext<'a> {
    kernel: &'a dyn KernelInfo,
    session: &'a CompilationSession<'a>,
    simd_width: u32,
    encoder: GenEncoder,
    ra: Box<dyn RegisterAllocator>,
    isa: Box<dyn Generation>,
    sel: Option<Box<dyn SelectionEngine>>,
}

impl<'a> GenContext<'a> {
    /// Bind a generation to a kernel compilation.
    ///
    /// Rejects SIMD execution widths the hardware cannot run.
    pub fn new(
        isa: Box<dyn Generation>,
        kernel: &'a dyn KernelInfo,
        ra: Box<dyn RegisterAllocator>,
        session: &'a CompilationSession<'a>,
    ) -> CompileResult<Self> {
        let simd_width = kernel.simd_width();
        if simd_width != 8 && simd_width != 16 {
            return Err(CompileError::UnsupportedSimdWidth { width: simd_width });
        }
        session.set_current_kernel(kernel.name());
        log::debug!(
            "context: kernel {} on {} at SIMD{simd_width}",
            kernel.name(),
            isa.name()
        );
        Ok(Self {
            kernel,
            session,
            simd_width,
            encoder: GenEncoder::new(simd_width),
            ra,
            isa,
            sel: None,
        })
    }

    pub fn simd_width(&self) -> u32 {
        self.simd_width
    }

    pub fn generation_name(&self) -> &'static str {
        self.isa.name()
    }

    /// Round a requested scratch-buffer size up to the hardware granularity.
    pub fn align_scratch_size(&self, size: u32) -> u32 {
        self.isa.align_scratch_size(size)
    }

    /// Emit the shared-local-memory base relocation, if the kernel needs it.
    pub fn emit_slm_offset(&mut self) {
        let before = self.encoder.len();
        let mut env = EmitEnv {
            kernel: self.kernel,
            simd_width: self.simd_width,
            encoder: &mut self.encoder,
            ra: self.ra.as_ref(),
        };
        self.isa.emit_slm_offset(&mut env);
        self.session
            .record_prologue_instructions(self.encoder.len() - before);
    }

    /// Emit the per-lane stack pointer computation, if the kernel needs it.
    pub fn emit_stack_pointer(&mut self) {
        let before = self.encoder.len();
        let mut env = EmitEnv {
            kernel: self.kernel,
            simd_width: self.simd_width,
            encoder: &mut self.encoder,
            ra: self.ra.as_ref(),
        };
        self.isa.emit_stack_pointer(&mut env);
        self.session
            .record_prologue_instructions(self.encoder.len() - before);
    }

    /// Emit the full fixed prologue: SLM relocation, then stack pointers.
    pub fn emit_prologue(&mut self) {
        self.emit_slm_offset();
        self.emit_stack_pointer();
        log::debug!(
            "context: prologue of {} is {} instruction(s)",
            self.kernel.name(),
            self.encoder.len()
        );
    }

    /// Install this generation's selection engine.
    pub fn new_selection(&mut self) {
        self.sel = Some(self.isa.new_selection());
    }

    /// Lower one function through the installed selection engine.
    ///
    /// Calling this before [`GenContext::new_selection`] is an internal
    /// compiler bug.
    pub fn lower(&mut self, func: &Function) -> CompileResult<SelectionStream<'a>> {
        let sel = self
            .sel
            .as_mut()
            .expect("no selection engine installed; call new_selection first");
        log::trace!("context: lowering {} via {}", func.name, sel.generation());
        let stream = sel.lower(func, self.session)?;
        self.session.record_selected_instructions(stream.len());
        self.session
            .record_register_file(func.file().reg_num(), func.file().tuple_num());
        Ok(stream)
    }

    /// Instructions emitted so far by the prologue hooks.
    pub fn instructions(&self) -> &[EncodedInst] {
        self.encoder.insts()
    }

    /// Caller-visible emission state, for scope-discipline checks.
    pub fn emission_state(&self) -> (u32, Predicate) {
        (self.encoder.curr.exec_width, self.encoder.curr.predicate)
    }

    /// Hand the finalized prologue stream onward.
    pub fn into_instructions(self) -> Vec<EncodedInst> {
        self.encoder.into_insts()
    }
}
