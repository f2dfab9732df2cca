//! Reference-counted error objects with causal chains.
//!
//! An [`ErrorHandle`] is an immutable record once constructed, save for its
//! refcount (handled by `Arc`), its JSON cache, its generation snapshot, and
//! the weak back-pointer to its owning [`Context`] that detachment clears.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use spin::Mutex as SpinMutex;

use crate::allocator::AllocatorBinding;
use crate::buffer::AllocBuf;
use crate::context::{Context, ContextInner};
use crate::json;
use crate::taxonomy::{default_flags, Code, Domain, Flags};

/// The call-site location captured by the convenience macros. File and
/// function names are `'static` string slices (`file!()`/`module_path!()`),
/// so no allocation is needed to carry them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceLocation {
    pub file: Option<&'static str>,
    pub line: u32,
    pub func: Option<&'static str>,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, func: &'static str) -> Self {
        Self {
            file: Some(file),
            line,
            func: Some(func),
        }
    }
}

pub(crate) struct ErrorInner {
    domain: Domain,
    code: Code,
    flags: Flags,
    message: AllocBuf,
    location: Option<SourceLocation>,
    cause: Option<ErrorHandle>,
    allocator: AllocatorBinding,
    back: SpinMutex<Option<Weak<ContextInner>>>,
    ctx_generation: AtomicU32,
    json_cache: SpinMutex<Option<Arc<AllocBuf>>>,
}

impl ErrorInner {
    pub(crate) fn domain(&self) -> Domain {
        self.domain
    }

    pub(crate) fn code(&self) -> Code {
        self.code
    }

    pub(crate) fn flags(&self) -> Flags {
        self.flags
    }

    pub(crate) fn message(&self) -> &str {
        self.message.as_str()
    }

    pub(crate) fn location(&self) -> Option<SourceLocation> {
        self.location
    }

    pub(crate) fn cause(&self) -> Option<&ErrorHandle> {
        self.cause.as_ref()
    }
}

/// Iterative release for long causal chains: dropping the top `ErrorInner`
/// must not recurse through `cause` on the native call stack, or a chain of
/// 10,000+ links would blow it. Each loop iteration unwraps the next link
/// (if we hold the last reference to it) and clears its own `cause` field
/// before letting it drop, so the nested `Drop::drop` call that Rust makes
/// for the unwrapped value does zero work for the chain.
impl Drop for ErrorInner {
    fn drop(&mut self) {
        if let Some(weak) = self.back.lock().take() {
            if let Some(ctx) = weak.upgrade() {
                ctx.untrack_error(self as *const ErrorInner);
            }
        }

        let mut next = self.cause.take();
        while let Some(handle) = next {
            match Arc::try_unwrap(handle.0) {
                Ok(mut inner) => {
                    next = inner.cause.take();
                    // `inner` drops here; its `cause` is already `None`, so
                    // the recursive call this triggers does no further work.
                }
                Err(_still_shared) => {
                    // Another handle still owns this link; not ours to free.
                    next = None;
                }
            }
        }
    }
}

/// A reference-counted, causally-chained error value.
#[derive(Clone)]
pub struct ErrorHandle(pub(crate) Arc<ErrorInner>);

impl ErrorHandle {
    /// Construct an error with no cause.
    ///
    /// Returns `None` only if duplicating `message` through the context's
    /// allocator fails.
    pub fn create(
        ctx: &Context,
        domain: Domain,
        code: Code,
        location: Option<SourceLocation>,
        message: &str,
    ) -> Option<ErrorHandle> {
        Self::build(ctx, domain, code, location, message, None)
    }

    /// Construct an error retaining `cause` as its parent.
    pub fn create_with_cause(
        ctx: &Context,
        domain: Domain,
        code: Code,
        cause: ErrorHandle,
        location: Option<SourceLocation>,
        message: &str,
    ) -> Option<ErrorHandle> {
        Self::build(ctx, domain, code, location, message, Some(cause))
    }

    fn build(
        ctx: &Context,
        domain: Domain,
        code: Code,
        location: Option<SourceLocation>,
        message: &str,
        cause: Option<ErrorHandle>,
    ) -> Option<ErrorHandle> {
        let allocator = ctx.allocator_of().clone();
        let message = AllocBuf::copy_from_str(&allocator, message)?;
        let flags = default_flags(domain, code);

        let inner = Arc::new(ErrorInner {
            domain,
            code,
            flags,
            message,
            location,
            cause,
            allocator,
            back: SpinMutex::new(None),
            ctx_generation: AtomicU32::new(0),
            json_cache: SpinMutex::new(None),
        });

        if ctx.inner().track_error(&inner) {
            *inner.back.lock() = Some(ctx.downgrade());
            inner
                .ctx_generation
                .store(ctx.inner().generation(), Ordering::Release);
        }
        // Track failure leaves `back` as `None`: the error is born detached,
        // fully self-sufficient via its allocator snapshot.

        Some(ErrorHandle(inner))
    }

    /// Explicit `Retain`. Equivalent to [`Clone::clone`].
    pub fn retain(&self) -> ErrorHandle {
        self.clone()
    }

    /// Explicit `Release`. Equivalent to dropping the handle.
    pub fn release(self) {
        drop(self);
    }

    pub fn domain(&self) -> Domain {
        self.0.domain()
    }

    pub fn code(&self) -> Code {
        self.0.code()
    }

    pub fn flags(&self) -> Flags {
        self.0.flags()
    }

    pub fn message(&self) -> &str {
        self.0.message()
    }

    pub fn file(&self) -> Option<&'static str> {
        self.0.location().and_then(|loc| loc.file)
    }

    pub fn line(&self) -> u32 {
        self.0.location().map(|loc| loc.line).unwrap_or(0)
    }

    pub fn func(&self) -> Option<&'static str> {
        self.0.location().and_then(|loc| loc.func)
    }

    pub fn cause(&self) -> Option<&ErrorHandle> {
        self.0.cause()
    }

    /// Whether this error still has a live back-pointer to its context.
    pub fn is_attached(&self) -> bool {
        self.0
            .back
            .lock()
            .as_ref()
            .map(|weak| weak.upgrade().is_some())
            .unwrap_or(false)
    }

    fn attached_context(&self) -> Option<Arc<ContextInner>> {
        self.0.back.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Memoized JSON rendering, recomputed when the owning context's
    /// generation has advanced since the last render, and fixed at the
    /// literal `"{}"` for a detached error (there is no generation to
    /// validate memoization against).
    ///
    /// Implemented as a mutex-guarded slot rather than a raw
    /// compare-and-swap pointer: the essential contract — no caller ever
    /// observes a freed buffer, no buffer leaks under a race — holds
    /// trivially once the slot holds an `Arc`.
    pub fn json_cached(&self) -> Arc<AllocBuf> {
        let Some(ctx) = self.attached_context() else {
            return empty_json_buf(&self.0.allocator);
        };

        let current_generation = ctx.generation();
        let snapshot = self.0.ctx_generation.load(Ordering::Acquire);
        if current_generation != snapshot {
            *self.0.json_cache.lock() = None;
            self.0
                .ctx_generation
                .store(current_generation, Ordering::Release);
        }

        let mut guard = self.0.json_cache.lock();
        if let Some(cached) = guard.as_ref() {
            return Arc::clone(cached);
        }

        let rendered = json::render_json(Some(self));
        let buf = AllocBuf::copy_from_str(&self.0.allocator, &rendered)
            .unwrap_or_else(|| empty_json_buf_contents(&self.0.allocator));
        let buf = Arc::new(buf);
        *guard = Some(Arc::clone(&buf));
        buf
    }

    /// Duplicate the current JSON rendering into a buffer owned through
    /// `ctx`'s allocator. `None` on allocation failure.
    pub fn json_copy(ctx: &Context, err: Option<&ErrorHandle>) -> Option<AllocBuf> {
        let text = match err {
            None => "{}".to_string(),
            Some(handle) => handle.json_cached().as_str().to_string(),
        };
        AllocBuf::copy_from_str(ctx.allocator_of(), &text)
    }

    /// Duplicate the plain message into a buffer owned through `ctx`'s
    /// allocator. `None` on allocation failure.
    pub fn message_copy(ctx: &Context, err: Option<&ErrorHandle>) -> Option<AllocBuf> {
        let text = err.map(ErrorHandle::message).unwrap_or("");
        AllocBuf::copy_from_str(ctx.allocator_of(), text)
    }

    /// Iteratively visit this node and each `cause` in turn until `visitor`
    /// returns `false` or `MAX_DEPTH` nodes have been visited.
    pub fn walk(top: &ErrorHandle, mut visitor: impl FnMut(&ErrorHandle) -> bool) {
        let mut current = Some(top);
        let mut visited = 0usize;
        while let Some(handle) = current {
            if visited >= crate::MAX_DEPTH {
                break;
            }
            visited += 1;
            if !visitor(handle) {
                break;
            }
            current = handle.cause();
        }
    }
}

fn empty_json_buf(allocator: &AllocatorBinding) -> Arc<AllocBuf> {
    Arc::new(empty_json_buf_contents(allocator))
}

fn empty_json_buf_contents(allocator: &AllocatorBinding) -> AllocBuf {
    AllocBuf::copy_from_str(allocator, "{}")
        .unwrap_or_else(|| AllocBuf::copy_from_str(&AllocatorBinding::system(), "{}").unwrap())
}

/// Domain of a possibly-null error, defaulting to `GENERIC`.
pub fn domain(err: Option<&ErrorHandle>) -> Domain {
    err.map(ErrorHandle::domain).unwrap_or_default()
}

/// Code of a possibly-null error, defaulting to `UNKNOWN`.
pub fn code(err: Option<&ErrorHandle>) -> Code {
    err.map(ErrorHandle::code).unwrap_or_default()
}

/// Flags of a possibly-null error, defaulting to none.
pub fn flags(err: Option<&ErrorHandle>) -> Flags {
    err.map(ErrorHandle::flags).unwrap_or_default()
}

/// Message of a possibly-null error, defaulting to `""`.
pub fn message(err: Option<&ErrorHandle>) -> &str {
    err.map(ErrorHandle::message).unwrap_or("")
}
