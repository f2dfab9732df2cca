//! Deterministic JSON rendering for errors and their causal chains.
//!
//! Traversal is iterative: the causal chain is first collected into a
//! frame stack bounded by [`crate::MAX_DEPTH`] (inline for shallow chains via
//! `SmallVec`, spilling to the heap beyond 16 frames), then rendered forward
//! in a single pass with a running count of closing braces — the chain is a
//! simple right-nested list, not a tree, so no recursive descent is needed
//! either to measure depth or to emit it.

use smallvec::SmallVec;

use crate::error::ErrorHandle;
use crate::taxonomy::Flags;

/// Sentinel returned by [`render`] when the required size overflows `usize`.
pub const TOO_LARGE: usize = usize::MAX;

struct Frame<'a> {
    domain: &'static str,
    code: &'static str,
    flags: Flags,
    message: &'a str,
    file: Option<&'static str>,
    line: u32,
    func: Option<&'static str>,
}

impl<'a> Frame<'a> {
    fn from(handle: &'a ErrorHandle) -> Self {
        Self {
            domain: handle.domain().name(),
            code: handle.code().name(),
            flags: handle.flags(),
            message: handle.message(),
            file: handle.file(),
            line: handle.line(),
            func: handle.func(),
        }
    }
}

fn collect_frames(top: &ErrorHandle) -> (SmallVec<[Frame<'_>; 16]>, bool) {
    let mut frames = SmallVec::new();
    let mut current = Some(top);
    let mut truncated = false;
    while let Some(handle) = current {
        if frames.len() == crate::MAX_DEPTH {
            truncated = true;
            break;
        }
        frames.push(Frame::from(handle));
        current = handle.cause();
    }
    (frames, truncated)
}

fn write_frame_fields(out: &mut String, frame: &Frame<'_>) {
    out.push_str("{\"domain\":\"");
    out.push_str(frame.domain);
    out.push_str("\",\"code\":\"");
    out.push_str(frame.code);
    out.push_str("\",\"flags\":[");
    for (i, name) in frame.flags.iter_names().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(name);
        out.push('"');
    }
    out.push_str("],\"message\":\"");
    escape_into(out, frame.message);
    out.push('"');
    if let Some(file) = frame.file {
        out.push_str(",\"file\":\"");
        escape_into(out, file);
        out.push_str("\",\"line\":");
        out.push_str(itoa(frame.line).as_str());
    }
    if let Some(func) = frame.func {
        out.push_str(",\"func\":\"");
        escape_into(out, func);
        out.push('"');
    }
}

fn itoa(value: u32) -> String {
    value.to_string()
}

/// RFC 8259 string escaping: the six named two-character escapes, `\u00xx`
/// for the remaining control bytes below `0x20`, everything else unchanged.
fn escape_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
}

/// Render `err` (or the causal chain rooted at it) to a JSON string.
pub fn render_json(err: Option<&ErrorHandle>) -> String {
    let Some(top) = err else {
        return "{}".to_string();
    };

    let (frames, truncated) = collect_frames(top);
    let mut out = String::new();
    let mut closers = 0usize;

    for (i, frame) in frames.iter().enumerate() {
        write_frame_fields(&mut out, frame);
        closers += 1;
        let is_last = i + 1 == frames.len();
        if !is_last || truncated {
            out.push_str(",\"cause\":");
        }
    }
    if truncated {
        out.push_str("{\"truncated\":true}");
    }
    for _ in 0..closers {
        out.push('}');
    }
    out
}

/// Render `err` into `buffer`/`capacity`, writing up to `capacity - 1` bytes
/// plus a terminating NUL, and return the byte count (NUL included) the
/// unbounded rendering would require. [`TOO_LARGE`] if that count overflows
/// `usize`.
pub fn render(err: Option<&ErrorHandle>, buffer: Option<&mut [u8]>, capacity: usize) -> usize {
    let text = render_json(err);
    let Some(required) = text.len().checked_add(1) else {
        return TOO_LARGE;
    };

    if let Some(buffer) = buffer {
        if capacity > 0 {
            let writable = text.len().min(capacity - 1);
            buffer[..writable].copy_from_slice(&text.as_bytes()[..writable]);
            buffer[writable] = 0;
        }
    }
    required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::SourceLocation;
    use crate::taxonomy::{Code, Domain};

    #[test]
    fn null_error_renders_empty_object() {
        assert_eq!(render_json(None), "{}");
        let mut buffer = [0u8; 8];
        let required = render(None, Some(&mut buffer), 8);
        assert_eq!(required, 3);
        assert_eq!(&buffer[..3], b"{}\0");
    }

    #[test]
    fn scenario_a_git_not_found_with_location() {
        let ctx = Context::create(None);
        let loc = SourceLocation::new("src/x.c", 42, "f");
        let err = ErrorHandle::create(
            &ctx,
            Domain::Git,
            Code::NotFound,
            Some(loc),
            "Object abc123 not found",
        )
        .unwrap();
        assert_eq!(
            render_json(Some(&err)),
            r#"{"domain":"GIT","code":"NOT_FOUND","flags":[],"message":"Object abc123 not found","file":"src/x.c","line":42,"func":"f"}"#
        );
        drop(err);
        ctx.release();
    }

    #[test]
    fn scenario_b_policy_violation_with_cause() {
        let ctx = Context::create(None);
        let loc_a = SourceLocation::new("src/x.c", 42, "f");
        let cause = ErrorHandle::create(
            &ctx,
            Domain::Git,
            Code::NotFound,
            Some(loc_a),
            "Object abc123 not found",
        )
        .unwrap();
        let loc_b = SourceLocation::new("src/y.c", 7, "g");
        let err = ErrorHandle::create_with_cause(
            &ctx,
            Domain::Policy,
            Code::PolicyViolation,
            cause,
            Some(loc_b),
            "Policy blocked update for refs/main",
        )
        .unwrap();
        let expected = concat!(
            r#"{"domain":"POLICY","code":"POLICY_VIOLATION","flags":["PERMANENT"],"#,
            r#""message":"Policy blocked update for refs/main","file":"src/y.c","line":7,"func":"g","#,
            r#""cause":{"domain":"GIT","code":"NOT_FOUND","flags":[],"message":"Object abc123 not found","file":"src/x.c","line":42,"func":"f"}}"#
        );
        assert_eq!(render_json(Some(&err)), expected);
        drop(err);
        ctx.release();
    }

    #[test]
    fn scenario_c_io_error_retryable_no_location() {
        let ctx = Context::create(None);
        let err =
            ErrorHandle::create(&ctx, Domain::Io, Code::IoError, None, "disk full").unwrap();
        assert_eq!(
            render_json(Some(&err)),
            r#"{"domain":"IO","code":"IO_ERROR","flags":["RETRYABLE"],"message":"disk full"}"#
        );
        drop(err);
        ctx.release();
    }

    #[test]
    fn scenario_d_empty_error() {
        let ctx = Context::create(None);
        let err = ErrorHandle::create(&ctx, Domain::Generic, Code::Unknown, None, "").unwrap();
        assert_eq!(
            render_json(Some(&err)),
            r#"{"domain":"GENERIC","code":"UNKNOWN","flags":[],"message":""}"#
        );
        drop(err);
        ctx.release();
    }

    #[test]
    fn scenario_e_sixty_five_deep_chain_truncates() {
        let ctx = Context::create(None);
        let mut head =
            ErrorHandle::create(&ctx, Domain::Generic, Code::Unknown, None, "root").unwrap();
        for _ in 0..64 {
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
        let rendered = render_json(Some(&head));
        assert_eq!(rendered.matches(r#""cause":{"#).count(), 64);
        assert_eq!(rendered.matches(r#"{"truncated":true}"#).count(), 1);
        drop(head);
        ctx.release();
    }

    #[test]
    fn escapes_control_and_quote_characters() {
        let ctx = Context::create(None);
        let err = ErrorHandle::create(
            &ctx,
            Domain::Generic,
            Code::Unknown,
            None,
            "line1\nline2\t\"quoted\"\u{01}",
        )
        .unwrap();
        let rendered = render_json(Some(&err));
        assert!(rendered.contains(r#"line1\nline2\t\"quoted\""#));
        drop(err);
        ctx.release();
    }
}
