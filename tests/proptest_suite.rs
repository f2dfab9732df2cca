//! Property-based tests for gitledger-core.
//!
//! These generate random message content, chain shapes, and allocator
//! behavior to check the invariants the unit tests only sample directly.

use gitledger_core::taxonomy::{Code, Domain, Flags};
use gitledger_core::{default_flags, Context, ErrorHandle};
use proptest::prelude::*;
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

fn all_domains() -> Vec<Domain> {
    (0u8..=7).filter_map(Domain::from_u8).collect()
}

fn all_codes() -> Vec<Code> {
    (0u8..=10).filter_map(Code::from_u8).collect()
}

fn domain_strategy() -> impl Strategy<Value = Domain> {
    prop::sample::select(all_domains())
}

fn code_strategy() -> impl Strategy<Value = Code> {
    prop::sample::select(all_codes())
}

// ============================================================================
// MESSAGE AND RENDERING PROPERTIES
// ============================================================================

proptest! {
    /// Arbitrary UTF-8 messages survive construction and round-trip through
    /// `message()` unchanged.
    #[test]
    fn message_round_trips(message in "\\PC{0,200}") {
        let ctx = Context::create(None);
        let err = ErrorHandle::create(&ctx, Domain::Generic, Code::Unknown, None, &message).unwrap();
        prop_assert_eq!(err.message(), message.as_str());
        drop(err);
        ctx.release();
    }

    /// JSON rendering never panics and always produces valid UTF-8 for any
    /// domain/code/message combination, including control characters that
    /// must be escaped.
    #[test]
    fn json_rendering_is_utf8_and_deterministic(
        domain in domain_strategy(),
        code in code_strategy(),
        message in "\\PC{0,200}",
    ) {
        let ctx = Context::create(None);
        let err = ErrorHandle::create(&ctx, domain, code, None, &message).unwrap();
        let first = gitledger_core::render_json(Some(&err));
        let second = gitledger_core::render_json(Some(&err));
        prop_assert!(std::str::from_utf8(first.as_bytes()).is_ok());
        prop_assert_eq!(first, second);
        drop(err);
        ctx.release();
    }

    /// The default-flags policy table never panics and always returns a
    /// subset of the three known flags.
    #[test]
    fn default_flags_subset_of_known(domain in domain_strategy(), code in code_strategy()) {
        let flags = default_flags(domain, code);
        let known = Flags::RETRYABLE.union(Flags::PERMANENT).union(Flags::AUTH);
        prop_assert_eq!(flags.union(known), known);
    }
}

// ============================================================================
// CAUSAL CHAIN PROPERTIES
// ============================================================================

proptest! {
    /// A chain of any depth up to a few hundred links releases without
    /// overflowing the stack, and `walk` never visits more than `MAX_DEPTH`
    /// nodes regardless of how deep the chain actually is.
    #[test]
    fn chain_release_and_walk_bound(depth in 0usize..300) {
        let ctx = Context::create(None);
        let mut head = ErrorHandle::create(&ctx, Domain::Generic, Code::Unknown, None, "root").unwrap();
        for _ in 0..depth {
            head = ErrorHandle::create_with_cause(
                &ctx,
                Domain::Generic,
                Code::Unknown,
                head,
                None,
                "link",
            )
            .unwrap();
        }

        let mut visited = 0usize;
        ErrorHandle::walk(&head, |_| {
            visited += 1;
            true
        });
        prop_assert_eq!(visited, (depth + 1).min(gitledger_core::MAX_DEPTH));

        drop(head);
        ctx.release();
    }
}

// ============================================================================
// REFERENCE-COUNT / ALLOCATION BALANCE PROPERTIES
// ============================================================================

proptest! {
    /// Under an instrumented allocator, the number of outstanding allocations
    /// returns to zero once every error and the context itself are released,
    /// regardless of how many errors were created along the way.
    #[test]
    fn allocation_balance_after_full_release(chain_len in 0usize..50) {
        let live = Arc::new(AtomicIsize::new(0));
        let live_alloc = Arc::clone(&live);
        let live_free = Arc::clone(&live);
        let binding = gitledger_core::AllocatorBinding::new(gitledger_core::FnAllocator::new(
            move |size| {
                live_alloc.fetch_add(1, Ordering::SeqCst);
                NonNull::new(unsafe { alloc::alloc(Layout::from_size_align(size.max(1), 1).unwrap()) })
            },
            move |ptr, size| {
                live_free.fetch_sub(1, Ordering::SeqCst);
                unsafe { alloc::dealloc(ptr.as_ptr(), Layout::from_size_align(size.max(1), 1).unwrap()) };
            },
        ));

        let ctx = Context::create(Some(binding));
        let mut head = ErrorHandle::create(&ctx, Domain::Generic, Code::Unknown, None, "root").unwrap();
        for _ in 0..chain_len {
            head = ErrorHandle::create_with_cause(
                &ctx,
                Domain::Generic,
                Code::Unknown,
                head,
                None,
                "link",
            )
            .unwrap();
        }

        drop(head);
        ctx.release();

        prop_assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}

// ============================================================================
// DETACHMENT PROPERTIES
// ============================================================================

proptest! {
    /// An error born while the allocator is exhausted for tracking is
    /// detached, and stays fully self-sufficient (accessors keep working,
    /// `json_cached` still returns the neutral `"{}"`) for any message.
    #[test]
    fn detached_error_survives_context_release(message in "\\PC{0,100}") {
        let allow = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let allow_alloc = Arc::clone(&allow);
        let binding = gitledger_core::AllocatorBinding::new(gitledger_core::FnAllocator::new(
            move |size| {
                let count = allow_alloc.fetch_add(1, Ordering::SeqCst);
                // Allow the message allocation (call 0) but fail the tracking
                // probe (call 1), forcing detachment.
                if count == 0 {
                    NonNull::new(unsafe {
                        alloc::alloc(Layout::from_size_align(size.max(1), 1).unwrap())
                    })
                } else {
                    None
                }
            },
            |ptr, size| unsafe {
                alloc::dealloc(ptr.as_ptr(), Layout::from_size_align(size.max(1), 1).unwrap())
            },
        ));

        let ctx = Context::create(Some(binding));
        let err = ErrorHandle::create(&ctx, Domain::Generic, Code::Unknown, None, &message).unwrap();
        prop_assert!(!err.is_attached());
        prop_assert_eq!(err.message(), message.as_str());
        prop_assert_eq!(gitledger_core::render_json(Some(&err)), "{}".to_string());

        // Context has nothing tracked, so release succeeds even with the
        // detached error still alive.
        match ctx.try_release() {
            gitledger_core::ReleaseOutcome::Released => {}
            other => prop_assert!(false, "expected Released, got {other:?}"),
        }
        drop(err);
    }
}

// ============================================================================
// CONCURRENT PROPERTIES
// ============================================================================

proptest! {
    /// Multiple threads creating and releasing errors against independent
    /// contexts never panics or deadlocks.
    #[test]
    fn concurrent_error_creation(thread_count in 1usize..8, errors_per_thread in 1usize..50) {
        let handles: Vec<_> = (0..thread_count)
            .map(|t| {
                std::thread::spawn(move || {
                    let ctx = Context::create(None);
                    for i in 0..errors_per_thread {
                        let err = ErrorHandle::create(
                            &ctx,
                            Domain::Generic,
                            Code::Unknown,
                            None,
                            &format!("thread {t} error {i}"),
                        )
                        .unwrap();
                        drop(err);
                    }
                    ctx.release();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
