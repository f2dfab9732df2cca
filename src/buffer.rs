//! Allocator-owned byte buffers.
//!
//! Error messages and rendered JSON are both "allocator-owned byte buffers"
//! per the data model: storage that outlives the [`Context`](crate::context::Context)
//! that produced it, freed through the allocator binding snapshotted at
//! construction time rather than through the context itself.

use std::ptr::NonNull;
use std::slice;
use std::str;

use crate::allocator::AllocatorBinding;

/// A fixed-size, allocator-owned buffer of bytes.
///
/// Never reallocated in place; any growth produces a new `AllocBuf`. This
/// matches the spec's "allocate once, render once" shape for messages and
/// cached JSON.
pub struct AllocBuf {
    ptr: NonNull<u8>,
    len: usize,
    allocator: AllocatorBinding,
}

// SAFETY: `AllocBuf` owns its bytes exclusively and the underlying allocator
// binding is `Send + Sync`; there is no interior mutability here.
unsafe impl Send for AllocBuf {}
unsafe impl Sync for AllocBuf {}

impl AllocBuf {
    /// Copy `bytes` into a freshly allocated buffer. Returns `None` on
    /// allocation failure.
    pub fn copy_from(allocator: &AllocatorBinding, bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return Some(Self {
                ptr: NonNull::dangling(),
                len: 0,
                allocator: allocator.clone(),
            });
        }
        let ptr = allocator.alloc_bytes(bytes.len(), 1)?;
        // SAFETY: `ptr` is valid for `bytes.len()` writable bytes.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };
        Some(Self {
            ptr,
            len: bytes.len(),
            allocator: allocator.clone(),
        })
    }

    /// Copy a UTF-8 string into a freshly allocated buffer.
    pub fn copy_from_str(allocator: &AllocatorBinding, s: &str) -> Option<Self> {
        Self::copy_from(allocator, s.as_bytes())
    }

    /// Number of bytes in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow the buffer's contents as bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: `ptr` is valid for `len` bytes for the lifetime of `self`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Borrow the buffer's contents as a UTF-8 string.
    ///
    /// All buffers in this crate are constructed from either `&str` or
    /// internally-generated UTF-8 JSON, so this never fails in practice; it
    /// is still checked rather than assumed.
    pub fn as_str(&self) -> &str {
        str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

impl Drop for AllocBuf {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: `ptr` came from `self.allocator.alloc_bytes(len, 1)` and is
        // dropped exactly once.
        unsafe { self.allocator.dealloc_bytes(self.ptr, self.len, 1) };
    }
}

impl std::fmt::Debug for AllocBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocBuf").field("len", &self.len).finish()
    }
}
