//! Prologue inspection tool.
//!
//! Builds a kernel from command-line metadata, runs the Gen 7.5 prologue
//! hooks, and prints the recorded instruction listing.

use bumpalo::Bump;
use clap::Parser;

use gpugen::core::CompilationSession;
use gpugen::gen::{Gen75, GenContext, PassthroughAllocator};
use gpugen::ir::Kernel;

#[derive(Parser)]
#[command(name = "prologue-dump", about = "Emit and print a kernel prologue")]
struct Args {
    /// SIMD execution width (8 or 16).
    #[arg(long, default_value_t = 16)]
    simd_width: u32,

    /// Per-lane private stack size in bytes; 0 means no stack use.
    #[arg(long, default_value_t = 0)]
    stack_size: u32,

    /// Kernel uses shared local memory.
    #[arg(long)]
    slm: bool,

    /// Also print the aligned size for this requested scratch size.
    #[arg(long)]
    scratch: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);

    let mut kernel = Kernel::new("dump", args.simd_width);
    kernel.stack_size = args.stack_size;
    kernel.use_slm = args.slm;

    let mut ctx = GenContext::new(
        Box::new(Gen75::new()),
        &kernel,
        Box::new(PassthroughAllocator),
        &session,
    )?;
    ctx.emit_prologue();

    println!(
        "; {} prologue, SIMD{}, {} instruction(s)",
        ctx.generation_name(),
        ctx.simd_width(),
        ctx.instructions().len()
    );
    for inst in ctx.instructions() {
        println!("{inst}");
    }
    if let Some(scratch) = args.scratch {
        println!("scratch: {scratch} -> {}", ctx.align_scratch_size(scratch));
    }
    eprintln!("{}", session.stats());
    Ok(())
}
