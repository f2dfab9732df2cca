//! Reference-counted context owning an allocator binding and a weak
//! registry of the errors allocated against it.
//!
//! A [`Context`] is the root of the foundation layer: every [`ErrorHandle`](crate::error::ErrorHandle)
//! is created against one, inherits its allocator, and is weakly tracked by
//! it so that a teardown attempt can detect leaked errors.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use spin::Mutex as SpinMutex;

use crate::allocator::{Allocator, AllocatorBinding};
use crate::diagnostics;
use crate::error::ErrorInner;

/// Outcome of attempting to release a [`Context`].
#[derive(Debug)]
pub enum ReleaseOutcome {
    /// This was the last reference and the context has been torn down.
    Released,
    /// Other references remain; the context is untouched.
    StillAlive,
    /// Teardown was attempted but at least one error is still tracked. The
    /// context is handed back fully intact; the caller remains responsible
    /// for releasing it.
    Refused(Context),
}

pub(crate) struct ContextInner {
    allocator: AllocatorBinding,
    generation: AtomicU32,
    tracked: SpinMutex<Vec<Weak<ErrorInner>>>,
}

impl ContextInner {
    pub(crate) fn allocator(&self) -> &AllocatorBinding {
        &self.allocator
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// Register an error for leak detection. Probes the bound allocator for
    /// a one-byte marker before pushing the weak handle, so an exhausted or
    /// adversarial allocator can make tracking fail exactly as the contract
    /// requires.
    pub(crate) fn track_error(&self, error: &Arc<ErrorInner>) -> bool {
        let Some(marker) = self.allocator.alloc_bytes(1, 1) else {
            return false;
        };
        // SAFETY: `marker` came from this same binding with size=1, align=1,
        // and is freed immediately; it is never read or written.
        unsafe { self.allocator.dealloc_bytes(marker, 1, 1) };
        self.tracked.lock().push(Arc::downgrade(error));
        true
    }

    pub(crate) fn untrack_error(&self, error: *const ErrorInner) {
        let mut tracked = self.tracked.lock();
        if let Some(index) = tracked.iter().position(|weak| weak.as_ptr() == error) {
            tracked.swap_remove(index);
        }
    }
}

/// Reference-counted owner of an allocator binding and a leak-detecting
/// registry of the errors created against it.
///
/// Cloning a `Context` is the idiomatic-Rust form of `Retain`; dropping the
/// last clone without tracked errors remaining tears it down automatically.
/// [`Context::try_release`] exposes the explicit, checked form described by
/// the lifecycle contract, which is needed because plain `Drop` cannot
/// refuse to run.
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a context bound to `allocator`, or to [`AllocatorBinding::system`]
    /// if `allocator` is `None`.
    pub fn create(allocator: Option<AllocatorBinding>) -> Context {
        Context {
            inner: Arc::new(ContextInner {
                allocator: allocator.unwrap_or_default(),
                generation: AtomicU32::new(1),
                tracked: SpinMutex::new(Vec::new()),
            }),
        }
    }

    /// Create a context bound to a concrete [`Allocator`] implementation.
    pub fn create_with<A: Allocator + 'static>(allocator: A) -> Context {
        Self::create(Some(AllocatorBinding::new(allocator)))
    }

    /// Explicit `Retain`: add one reference. Equivalent to [`Clone::clone`].
    pub fn retain(&self) -> Context {
        self.clone()
    }

    /// Attempt to release one reference.
    ///
    /// If this is the last reference and at least one error remains
    /// tracked, this is a lifecycle-contract violation: debug builds abort
    /// after emitting a diagnostic, release builds emit the same diagnostic
    /// and return [`ReleaseOutcome::Refused`] with the context intact.
    pub fn try_release(self) -> ReleaseOutcome {
        let Context { inner } = self;
        if Arc::strong_count(&inner) > 1 {
            drop(inner);
            return ReleaseOutcome::StillAlive;
        }

        let live = inner.tracked.lock().len();
        if live > 0 {
            let detail = format!("{live} error(s) still tracked");
            diagnostics::emit("teardown_refused", &detail);
            if cfg!(debug_assertions) {
                panic!("gitledger_core: context released with {live} error(s) still tracked");
            }
            return ReleaseOutcome::Refused(Context { inner });
        }

        inner.generation.fetch_add(1, Ordering::Release);
        drop(inner);
        ReleaseOutcome::Released
    }

    /// Release one reference, discarding the outcome.
    pub fn release(self) {
        let _ = self.try_release();
    }

    /// Read-only view of the bound allocator.
    pub fn allocator_of(&self) -> &AllocatorBinding {
        &self.inner.allocator
    }

    /// Allocate `size` bytes through the bound allocator.
    pub fn alloc(&self, size: usize, align: usize) -> Option<std::ptr::NonNull<u8>> {
        self.inner.allocator.alloc_bytes(size, align)
    }

    /// Free bytes previously returned by [`Self::alloc`] with the same
    /// `size`/`align`.
    ///
    /// # Safety
    /// Same contract as [`AllocatorBinding::dealloc_bytes`].
    pub unsafe fn free(&self, ptr: std::ptr::NonNull<u8>, size: usize, align: usize) {
        // SAFETY: forwarded from caller.
        unsafe { self.inner.allocator.dealloc_bytes(ptr, size, align) };
    }

    /// Number of errors currently tracked. Exposed for tests and leak
    /// diagnostics; not part of the lifecycle contract itself.
    pub fn tracked_count(&self) -> usize {
        self.inner.tracked.lock().len()
    }

    pub(crate) fn inner(&self) -> &Arc<ContextInner> {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<ContextInner> {
        Arc::downgrade(&self.inner)
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Context {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("generation", &self.inner.generation())
            .field("tracked", &self.tracked_count())
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
