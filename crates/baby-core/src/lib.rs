//! Compile-and-run core for the baby language playground.
//!
//! A submission travels through a fixed pipeline:
//!
//! - **Workspace management**: an isolated, uniquely named directory per request
//! - **Compile phase**: the external compiler, bounded by a deadline, with artifact verification
//! - **Run phase**: the produced executable, bounded by its own deadline and an output ceiling
//! - **Classification**: both phases reduced to exactly one [`CompileResult`]
//!
//! The compiler and the compiled program are opaque external processes. The
//! only shared resource between requests is the filesystem, and each request
//! owns its own subtree of it.

pub mod classifier;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod executor;
pub mod pipeline;
pub mod process;
pub mod types;
pub mod workspace;

pub use classifier::classify;
pub use config::{ConfigLoader, PlaygroundConfig};
pub use errors::PlaygroundError;
pub use pipeline::{CodeRunner, Pipeline};
pub use process::{ProcessOutcome, Termination};
pub use types::{CompileRequest, CompileResult, Phase};
pub use workspace::{Workspace, WorkspaceManager};
