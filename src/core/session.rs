// This module provides arena-based compilation session management using the bumpalo crate.
// CompilationSession owns the arena allocator that backs per-function selection streams
// and tracks compilation statistics with a unified lifetime: every selection-IR entry is
// allocated in the arena and lives exactly as long as the session, eliminating complex
// lifetime annotations between the lowering engine, the scheduler queries and the
// encoder handoff. SessionStats records kernel counts, selected and prologue instruction
// counts, and register/tuple table sizes, which the driver can dump for debugging.
// Independent kernels may be compiled in parallel provided each uses its own session;
// nothing here is shared mutable state across kernels.

//! Arena-based compilation session management.
//!
//! All per-compile objects are tied to the session lifetime. One session
//! serves one kernel compilation from IR traversal to encoder handoff.

use bumpalo::Bump;
use std::cell::RefCell;
use std::fmt;

/// Arena-based compilation session.
pub struct CompilationSession<'arena> {
    /// Arena allocator for compilation objects.
    arena: &'arena Bump,

    /// Session statistics for debugging.
    stats: RefCell<SessionStats>,

    /// Kernel currently being compiled.
    current_kernel: RefCell<Option<String>>,
}

impl<'arena> CompilationSession<'arena> {
    /// Create a new compilation session with the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
            current_kernel: RefCell::new(None),
        }
    }

    /// Get access to the arena allocator.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Allocate an object in the session arena.
    pub fn alloc<T>(&self, value: T) -> &'arena mut T {
        self.arena.alloc(value)
    }

    /// Set the kernel currently being compiled.
    pub fn set_current_kernel(&self, name: &str) {
        log::debug!("session: compiling kernel {name}");
        *self.current_kernel.borrow_mut() = Some(name.to_string());
        self.stats.borrow_mut().kernels_compiled += 1;
    }

    /// Kernel currently being compiled, if any.
    pub fn current_kernel(&self) -> Option<String> {
        self.current_kernel.borrow().clone()
    }

    /// Record instructions produced by selection lowering.
    pub fn record_selected_instructions(&self, count: usize) {
        self.stats.borrow_mut().instructions_selected += count;
    }

    /// Record instructions emitted by generation-specific prologue hooks.
    pub fn record_prologue_instructions(&self, count: usize) {
        self.stats.borrow_mut().prologue_instructions += count;
    }

    /// Record the final register/tuple table sizes of a function.
    pub fn record_register_file(&self, reg_num: u32, tuple_num: u32) {
        let mut stats = self.stats.borrow_mut();
        stats.registers_appended += reg_num as usize;
        stats.tuple_entries_appended += tuple_num as usize;
    }

    /// Snapshot of the current statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Compilation metrics gathered over a session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub kernels_compiled: usize,
    pub instructions_selected: usize,
    pub prologue_instructions: usize,
    pub registers_appended: usize,
    pub tuple_entries_appended: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kernel(s), {} selected, {} prologue, {} regs, {} tuple entries",
            self.kernels_compiled,
            self.instructions_selected,
            self.prologue_instructions,
            self.registers_appended,
            self.tuple_entries_appended
        )
    }
}
