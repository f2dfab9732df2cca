//! Pluggable allocator binding for the context/error foundation.
//!
//! # Design
//!
//! The embeddable core never allocates through the global allocator directly.
//! Every owned byte buffer it hands out — error messages, rendered JSON, the
//! tracking-list nodes — is allocated through an [`Allocator`] trait object
//! bound to a [`Context`](crate::context::Context) at creation time. This
//! mirrors the C-shaped contract of "a pair of callbacks plus an opaque user
//! pointer": the Rust translation is a trait object, and the opaque pointer
//! becomes whatever state the implementing type closes over.
//!
//! # Safety
//!
//! Implementors must uphold the same contract a `GlobalAlloc` implementor
//! would: pointers returned by `allocate` must be valid for reads and writes
//! of `layout.size()` bytes, aligned to `layout.align()`, until passed back to
//! `deallocate` with the identical layout.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

/// A pluggable memory allocator.
///
/// # Safety
///
/// - `allocate` must return either `None` (allocation failure) or a pointer
///   valid for `layout.size()` bytes aligned to `layout.align()`.
/// - `deallocate` must only be called with a pointer previously returned by
///   `allocate` on the *same* allocator instance, with the identical layout.
/// - Implementations intended for use by a [`Context`](crate::context::Context)
///   shared across threads must be `Send + Sync`.
pub unsafe trait Allocator: Send + Sync {
    /// Allocate `layout.size()` bytes aligned to `layout.align()`.
    ///
    /// Returns `None` on allocation failure. Zero-sized layouts are valid and
    /// must return a dangling-but-non-null, well-aligned pointer.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Deallocate a pointer previously returned by `allocate` with the same
    /// layout.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from a prior `allocate` call on `self` with an
    /// identical `layout`, and must not have already been deallocated.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Default allocator: wraps the process heap via [`std::alloc`].
///
/// This is substituted whenever [`Context::create`](crate::context::Context::create)
/// is called without an explicit allocator, matching the spec's "default
/// heap-backed allocator when none is supplied".
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

// SAFETY: `std::alloc::{alloc, dealloc}` satisfy the `Allocator` contract
// directly; they are thread-safe by construction.
unsafe impl Allocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return Some(NonNull::new(layout.align() as *mut u8).unwrap_or(NonNull::dangling()));
        }
        // SAFETY: layout has non-zero size, as checked above.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: caller guarantees `ptr`/`layout` match a prior `allocate` call.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// Adapter exposing a raw `alloc`/`free` callback pair plus captured state,
/// the closest Rust analogue of the spec's C-shaped allocator binding.
///
/// `A` and `F` typically close over a shared opaque "user" value (an `Arc<T>`,
/// a raw pointer, a counter for testing) the way the C contract threads a
/// `user: *mut c_void` through both callbacks.
pub struct FnAllocator<A, F>
where
    A: Fn(usize) -> Option<NonNull<u8>> + Send + Sync,
    F: Fn(NonNull<u8>, usize) + Send + Sync,
{
    alloc_fn: A,
    free_fn: F,
}

impl<A, F> FnAllocator<A, F>
where
    A: Fn(usize) -> Option<NonNull<u8>> + Send + Sync,
    F: Fn(NonNull<u8>, usize) + Send + Sync,
{
    /// Build an allocator from a raw `alloc`/`free` callback pair.
    pub fn new(alloc_fn: A, free_fn: F) -> Self {
        Self { alloc_fn, free_fn }
    }
}

impl<A, F> fmt::Debug for FnAllocator<A, F>
where
    A: Fn(usize) -> Option<NonNull<u8>> + Send + Sync,
    F: Fn(NonNull<u8>, usize) + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAllocator").finish_non_exhaustive()
    }
}

// SAFETY: the `size`-only callbacks are required to uphold the same contract
// as `Allocator::allocate`/`deallocate`; alignment is fixed at
// `std::mem::align_of::<usize>()`, which is sufficient for every type this
// crate allocates (bytes, never over-aligned structures).
unsafe impl<A, F> Allocator for FnAllocator<A, F>
where
    A: Fn(usize) -> Option<NonNull<u8>> + Send + Sync,
    F: Fn(NonNull<u8>, usize) + Send + Sync,
{
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (self.alloc_fn)(layout.size())
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (self.free_fn)(ptr, layout.size());
    }
}

/// Shared handle to a bound allocator, snapshotted by value into both a
/// [`Context`](crate::context::Context) and every [`ErrorHandle`](crate::error::ErrorHandle)
/// it allocates, so a detached error can still free its own storage after its
/// context has been destroyed.
#[derive(Clone)]
pub struct AllocatorBinding {
    inner: Arc<dyn Allocator>,
}

impl AllocatorBinding {
    /// Bind a concrete allocator implementation.
    pub fn new<A: Allocator + 'static>(allocator: A) -> Self {
        Self {
            inner: Arc::new(allocator),
        }
    }

    /// The default, heap-backed binding.
    pub fn system() -> Self {
        Self::new(SystemAllocator)
    }

    /// Allocate `size` bytes with `align`-byte alignment. Returns `None` on
    /// failure.
    pub fn alloc_bytes(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size, align).ok()?;
        self.inner.allocate(layout)
    }

    /// Deallocate bytes previously returned by [`Self::alloc_bytes`] with the
    /// same `size`/`align`.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from a matching `alloc_bytes` call on this same
    /// binding and must not already have been freed.
    pub unsafe fn dealloc_bytes(&self, ptr: NonNull<u8>, size: usize, align: usize) {
        if let Ok(layout) = Layout::from_size_align(size, align) {
            // SAFETY: forwarded from caller's contract.
            unsafe { self.inner.deallocate(ptr, layout) };
        }
    }
}

impl fmt::Debug for AllocatorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatorBinding").finish_non_exhaustive()
    }
}

impl Default for AllocatorBinding {
    fn default() -> Self {
        Self::system()
    }
}
