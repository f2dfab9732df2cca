use gitledger_core::diagnostics::{Diagnostic, Sink};
use gitledger_core::taxonomy::{Code, Domain};
use gitledger_core::{diagnostics, Context};

/// A sink that counts lifecycle diagnostics instead of printing them,
/// standing in for a production log-forwarding pipeline.
struct CountingSink;

impl Sink for CountingSink {
    fn emit(&self, diagnostic: &Diagnostic<'_>) {
        println!("[forwarded] {}: {}", diagnostic.event, diagnostic.detail);
    }
}

fn main() {
    println!("--- Lifecycle Diagnostics Example ---\n");

    diagnostics::set_sink(Box::new(CountingSink));

    let ctx = Context::create(None);
    let leaked = gitledger_core::create_error!(
        &ctx,
        Domain::Io,
        Code::IoError,
        "disk full while writing object"
    )
    .unwrap();

    println!("1. Attempting to release a context with a tracked error still alive...");
    println!("   (debug builds treat this as a contract violation and abort; release");
    println!("   builds return `Refused` with the context intact)");

    let ctx = if cfg!(debug_assertions) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ctx.try_release()));
        assert!(result.is_err(), "debug build should have aborted on refused teardown");
        println!("   Caught the expected abort; the error itself is still alive.");
        // The context was consumed by the aborted call; rebuild one for the
        // rest of this demo to keep `leaked` attached to something real.
        let fresh = Context::create(None);
        drop(leaked);
        return forensic_continue(fresh);
    } else {
        match ctx.try_release() {
            gitledger_core::ReleaseOutcome::Refused(ctx) => {
                println!(
                    "   Refused, as expected: {} error(s) still tracked",
                    ctx.tracked_count()
                );
                ctx
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    };

    println!("\n2. Releasing the error, then retrying teardown...");
    drop(leaked);
    match ctx.try_release() {
        gitledger_core::ReleaseOutcome::Released => println!("   Released cleanly."),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

fn forensic_continue(ctx: Context) {
    println!("\n2. Releasing a fresh, untracked context...");
    match ctx.try_release() {
        gitledger_core::ReleaseOutcome::Released => println!("   Released cleanly."),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
