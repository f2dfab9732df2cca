use gitledger_core::taxonomy::{Code, Domain};
use gitledger_core::{create_error, create_error_with_cause, render_json, Context, ErrorHandle};

/// Simulates a policy check rejecting a ref update because the underlying
/// git object it depends on is missing, producing a two-link causal chain.
fn update_ref(ctx: &Context, object_id: &str) -> Result<(), ErrorHandle> {
    let missing = create_error!(
        ctx,
        Domain::Git,
        Code::NotFound,
        "object {} not found",
        object_id
    )
    .expect("allocation should succeed");

    Err(create_error_with_cause!(
        ctx,
        Domain::Policy,
        Code::PolicyViolation,
        missing,
        "update rejected for refs/heads/main"
    )
    .expect("allocation should succeed"))
}

fn main() {
    println!("--- Causal Chain Example ---\n");

    let ctx = Context::create(None);

    match update_ref(&ctx, "abc123") {
        Ok(()) => println!("update succeeded"),
        Err(err) => {
            println!("1. [JSON RENDERING]");
            println!("   {}\n", render_json(Some(&err)));

            println!("2. [WALKING THE CHAIN]");
            let mut depth = 0;
            ErrorHandle::walk(&err, |node| {
                println!(
                    "   [{depth}] {} / {} / {}",
                    node.domain(),
                    node.code(),
                    node.message()
                );
                depth += 1;
                true
            });

            drop(err);
        }
    }

    ctx.release();
}
