//! Sample Runner Module
//!
//! Executes one external command per call, strictly one at a time: co-resident
//! benchmarks would contend for the same CPU, memory and instrumentation and
//! invalidate each other's timings.
//!
//! No timeout is enforced on an invocation; a hung benchmark blocks the sweep.

pub mod executor;
pub mod guard;
pub mod sample;

pub use executor::{CommandExecutor, ProcessOutput, ShellExecutor};
pub use guard::DirGuard;
pub use sample::{InstrumentationMode, RunCapture, RunFailure, RunOutcome, SampleRunner};
