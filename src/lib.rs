//! # gitledger-core
//!
//! Foundation layer for an embeddable, Git-native append-only ledger: a
//! pluggable allocator, a reference-counted [`Context`] that owns it, and a
//! reference-counted [`ErrorHandle`] graph with causal chains and
//! deterministic JSON rendering.
//!
//! ## Layout
//!
//! - [`allocator`] — the pluggable [`Allocator`] trait and the default
//!   heap-backed implementation.
//! - [`buffer`] — allocator-owned byte buffers used for messages and cached
//!   JSON.
//! - [`taxonomy`] — the frozen `Domain`/`Code`/`Flags` taxonomy and the
//!   default-flags policy table.
//! - [`context`] — the reference-counted [`Context`] and its lifecycle
//!   contract.
//! - [`error`] — the reference-counted [`ErrorHandle`] and its causal chain.
//! - [`json`] — deterministic JSON rendering of an error and its chain.
//! - [`diagnostics`] — the single structured diagnostic emitted on a
//!   lifecycle-contract violation.
//! - [`convenience`] — call-site location-capturing macros.
//!
//! ## Quick start
//!
//! ```rust
//! use gitledger_core::{Context, ErrorHandle};
//! use gitledger_core::taxonomy::{Code, Domain};
//!
//! let ctx = Context::create(None);
//! let err = ErrorHandle::create(&ctx, Domain::Git, Code::NotFound, None, "object not found")
//!     .expect("allocation should succeed");
//! assert_eq!(err.domain(), Domain::Git);
//! drop(err);
//! ctx.release();
//! ```
//!
//! ## Lifecycle contract
//!
//! A [`Context`] tracks every [`ErrorHandle`] created against it so that
//! [`Context::try_release`] can refuse to tear down while errors remain
//! outstanding. This is the one place the crate departs from plain `Drop`:
//! `Drop` cannot be refused, so the checked release is an explicit,
//! consuming method that hands the context back intact on refusal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod buffer;
pub mod context;
pub mod convenience;
pub mod diagnostics;
pub mod error;
pub mod json;
pub mod taxonomy;

pub use allocator::{Allocator, AllocatorBinding, FnAllocator, SystemAllocator};
pub use buffer::AllocBuf;
pub use context::{Context, ReleaseOutcome};
pub use error::{code, domain, flags, message, ErrorHandle, SourceLocation};
pub use json::{render, render_json};
pub use taxonomy::{default_flags, Code, Domain, Flags};

/// Maximum causal-chain depth walked or rendered by [`ErrorHandle::walk`] and
/// [`json::render_json`]. A chain deeper than this is truncated, never
/// followed further or rejected outright.
pub const MAX_DEPTH: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_start_example_round_trips() {
        let ctx = Context::create(None);
        let err = ErrorHandle::create(&ctx, Domain::Git, Code::NotFound, None, "object not found")
            .unwrap();
        assert_eq!(err.domain(), Domain::Git);
        assert_eq!(domain(Some(&err)), Domain::Git);
        drop(err);
        ctx.release();
    }
}
