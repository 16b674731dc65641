//! # tdconsole engine
//!
//! The console's completion engine and instance orchestration layer.
//!
//! The completion half answers, on every keystroke of the console input
//! box, "what are the valid next tokens": a read-only grammar tree of
//! subcommands and flags is walked against the tokenized input, and flag
//! values are resolved against live server state through the
//! [`resolver::ValueResolver`] capability trait. The entry point is
//! [`complete::CompletionEngine`].
//!
//! The orchestration half owns local instance state: filesystem discovery
//! of instance directories, the JSON-backed instance store with its
//! single-working-instance invariant, and the `tdserver`/`td` subprocess
//! lifecycle tasks.

pub mod catalog;
pub mod complete;
pub mod filter;
pub mod grammar;
pub mod instances;
pub mod resolver;
pub mod walk;

pub use catalog::{CatalogCache, CatalogResolver};
pub use complete::CompletionEngine;
pub use grammar::{FLAG_MARKER, GrammarTree, NodeId, build_grammar};
pub use resolver::{NullResolver, ValueResolver};
