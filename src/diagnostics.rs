//! Structured diagnostics for lifecycle violations.
//!
//! The foundation layer never logs implicitly except for the single line
//! described in the teardown contract: a lifecycle-contract violation (a
//! [`Context`](crate::context::Context) torn down while errors remain
//! tracked) emits one diagnostic record. This module isolates that side
//! effect into a small, borrowed record type plus a pluggable sink, rather
//! than scattering `eprintln!` through the lifecycle code.

use std::fmt;
use std::sync::OnceLock;

/// A single diagnostic record, borrowed for the duration of the emitting
/// call. It cannot outlive the call that produced it.
#[derive(Debug)]
pub struct Diagnostic<'a> {
    pub event: &'a str,
    pub detail: &'a str,
}

impl<'a> Diagnostic<'a> {
    fn new(event: &'a str, detail: &'a str) -> Self {
        Self { event, detail }
    }

    /// Write the record as a single human-readable line.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "[gitledger_core] {}: {}", self.event, self.detail)
    }
}

/// A diagnostic sink. The default sink writes to stderr.
pub trait Sink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic<'_>);
}

struct StderrSink;

impl Sink for StderrSink {
    fn emit(&self, diagnostic: &Diagnostic<'_>) {
        let mut line = String::new();
        if diagnostic.write_to(&mut line).is_ok() {
            eprintln!("{line}");
        }
    }
}

static SINK: OnceLock<Box<dyn Sink>> = OnceLock::new();

/// Install a custom diagnostic sink. Only the first call takes effect;
/// subsequent calls are ignored, matching the "process-wide, set once early"
/// shape of this kind of hook.
pub fn set_sink(sink: Box<dyn Sink>) {
    let _ = SINK.set(sink);
}

fn current_sink() -> &'static dyn Sink {
    SINK.get_or_init(|| Box::new(StderrSink)).as_ref()
}

/// Emit a diagnostic for an event with free-form detail.
pub fn emit(event: &str, detail: &str) {
    current_sink().emit(&Diagnostic::new(event, detail));
}
