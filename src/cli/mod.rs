//! # Command-Line Interface
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `compile <file>` | Run the cache pool pass, print or write the resulting container |
//! | `pools <file>` | List pools with name, namespace, clearer and lifetime |
//! | `namespace <name> --seed <seed>` | Compute one pool namespace |
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Use `--verbose` (or `POOLWIRE_LOG=debug`) for pass diagnostics on stderr.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod compile;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
