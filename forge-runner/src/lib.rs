//! Forge pipeline driver: stage sequencing, listeners, run lock and the
//! interactive prompter.
//!
//! ```no_run
//! use forge_core::{Stage, WriteOptions};
//! use forge_runner::{Forge, Runner, RunError};
//!
//! let forge = Forge::builder("service").source("templates").target(".").build();
//! let mut runner = Runner::new(forge);
//! runner.on(Stage::Write, |forge| {
//!     forge.staging()?.write_file("hello.txt", "hello", WriteOptions::default())?;
//!     Ok::<(), RunError>(())
//! });
//! let outcome = runner.run()?;
//! # Ok::<(), RunError>(())
//! ```

mod error;
pub mod events;
pub mod forge;
pub mod lock;
pub mod paths;
pub mod prompt_tty;
pub mod runner;
mod runtime;

pub use error::RunError;
pub use events::{EventBus, Listener};
pub use forge::{Forge, ForgeBuilder, VariablesOptions};
pub use lock::{is_locked, RunLock, LOCK_FILE_NAME};
pub use paths::{executions_root, new_execution_dir};
pub use prompt_tty::DialoguerPrompter;
pub use runner::{RunOutcome, Runner};
pub use runtime::init_tracing;
