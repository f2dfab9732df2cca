use gitledger_core::taxonomy::{Code, Domain};
use gitledger_core::{render_json, Context};

fn load_configuration(ctx: &Context, path: &str) -> Result<(), gitledger_core::ErrorHandle> {
    if path == "bad_config.toml" {
        return Err(gitledger_core::create_error!(
            ctx,
            Domain::Config,
            Code::InvalidArgument,
            "syntax error at line 42: unexpected EOF"
        )
        .expect("allocation should succeed"));
    }
    Ok(())
}

fn main() {
    println!("--- Basic Usage Example ---\n");

    let ctx = Context::create(None);

    match load_configuration(&ctx, "bad_config.toml") {
        Ok(_) => println!("Success!"),
        Err(err) => {
            println!("1. [ACCESSORS]");
            println!("   domain:  {}", err.domain());
            println!("   code:    {}", err.code());
            println!("   flags:   {}", err.flags());
            println!("   message: {}", err.message());

            println!("\n2. [JSON RENDERING]");
            println!("   {}", render_json(Some(&err)));

            drop(err);
        }
    }

    ctx.release();
}
