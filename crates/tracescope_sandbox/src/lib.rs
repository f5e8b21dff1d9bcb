//! tracescope interpreter boundary
//!
//! Runs programs in an external, instrumented interpreter and hands back
//! their traces. The interpreter is reached only through request/response
//! messages; one run may be in flight per interpreter.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handle;
pub mod interpreter;
pub mod protocol;
pub mod session;

pub use config::SandboxConfig;
pub use error::SandboxError;
pub use handle::InterpreterHandle;
pub use interpreter::{Interpreter, ProcessInterpreter};
pub use protocol::{Request, Response, RunRequest};
pub use session::Session;
