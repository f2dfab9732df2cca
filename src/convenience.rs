//! Call-site location capture for error construction.
//!
//! [`ErrorHandle::create`](crate::error::ErrorHandle::create) and
//! [`ErrorHandle::create_with_cause`](crate::error::ErrorHandle::create_with_cause)
//! take an optional [`SourceLocation`](crate::error::SourceLocation) but do
//! not capture one themselves — there is no call-site reflection available to
//! a plain function. The macros here close that gap the same way `file!()`
//! and `line!()` always have: by expanding at the call site instead of
//! running as a function.
//!
//! # Example
//!
//! ```rust
//! use gitledger_core::{create_error, Context};
//! use gitledger_core::taxonomy::{Code, Domain};
//!
//! let ctx = Context::create(None);
//! let err = create_error!(&ctx, Domain::Git, Code::NotFound, "object {} not found", "abc123")
//!     .expect("allocation should succeed");
//! assert_eq!(err.line() > 0, true);
//! drop(err);
//! ctx.release();
//! ```

/// Capture the enclosing function's name as a `'static` string slice.
///
/// Stable Rust has no `function!()` built-in; this is the standard
/// workaround, reading the type name of a locally defined zero-sized
/// function item and trimming the trailing `::marker`.
#[doc(hidden)]
#[macro_export]
macro_rules! __gitledger_function_name {
    () => {{
        fn marker() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(marker);
        &name[..name.len() - "::marker".len()]
    }};
}

/// Construct a [`SourceLocation`](crate::error::SourceLocation) for the
/// expansion site.
#[macro_export]
macro_rules! here {
    () => {
        $crate::error::SourceLocation::new(file!(), line!(), $crate::__gitledger_function_name!())
    };
}

/// Create an error, capturing the call site and formatting the message.
///
/// `$domain` and `$code` are expressions; the trailing `$fmt $(, $arg)*` is
/// forwarded to [`format!`] exactly as written, so ordinary `format!` rules
/// (including the literal format-string requirement for compile-time
/// argument checking) apply.
///
/// # Example
///
/// ```rust
/// use gitledger_core::{create_error, Context};
/// use gitledger_core::taxonomy::{Code, Domain};
///
/// let ctx = Context::create(None);
/// let err = create_error!(&ctx, Domain::Io, Code::IoError, "disk full on {}", "/dev/sda1");
/// assert!(err.is_some());
/// drop(err);
/// ctx.release();
/// ```
#[macro_export]
macro_rules! create_error {
    ($ctx:expr, $domain:expr, $code:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::error::ErrorHandle::create(
            $ctx,
            $domain,
            $code,
            Some($crate::here!()),
            &format!($fmt $(, $arg)*),
        )
    };
}

/// Create an error retaining `$cause` as its parent, capturing the call site.
///
/// See [`create_error!`] for the format-argument rules.
///
/// # Example
///
/// ```rust
/// use gitledger_core::{create_error, create_error_with_cause, Context};
/// use gitledger_core::taxonomy::{Code, Domain};
///
/// let ctx = Context::create(None);
/// let cause = create_error!(&ctx, Domain::Git, Code::NotFound, "object missing").unwrap();
/// let err = create_error_with_cause!(
///     &ctx,
///     Domain::Policy,
///     Code::PolicyViolation,
///     cause,
///     "update blocked"
/// );
/// assert!(err.is_some());
/// drop(err);
/// ctx.release();
/// ```
#[macro_export]
macro_rules! create_error_with_cause {
    ($ctx:expr, $domain:expr, $code:expr, $cause:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::error::ErrorHandle::create_with_cause(
            $ctx,
            $domain,
            $code,
            $cause,
            Some($crate::here!()),
            &format!($fmt $(, $arg)*),
        )
    };
}
