//! Command trait for the hostward CLI
//!
//! Every subcommand that needs the loaded configuration implements
//! [`Command`], receiving the shared [`RuntimeContext`].
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::command::Command;
//! use crate::common::RuntimeContext;
//! use crate::error::Result;
//! use clap::Args;
//!
//! #[derive(Debug, Args)]
//! pub struct MyCommand {
//!     #[arg(short, long)]
//!     pub some_flag: bool,
//! }
//!
//! impl Command for MyCommand {
//!     type Output = ();
//!
//!     fn execute(&self, context: &RuntimeContext) -> Result<()> {
//!         // context.config, context.registry
//!         Ok(())
//!     }
//! }
//! ```

use crate::common::RuntimeContext;
use crate::error::Result;

/// Trait for all hostward commands
pub trait Command {
    /// The type returned by this command
    type Output;

    /// Execute the command with the given runtime context
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` describing what went wrong
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
