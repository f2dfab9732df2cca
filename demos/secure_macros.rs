use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gitledger_core::taxonomy::{Code, Domain};
use gitledger_core::{create_error, AllocatorBinding, Context, FnAllocator};

fn main() {
    println!("--- Call-Site Macros & Allocator Binding Example ---\n");

    let err = {
        let ctx = Context::create(None);
        let err = create_error!(
            &ctx,
            Domain::Config,
            Code::InvalidArgument,
            "invalid configuration value: {}",
            42
        )
        .expect("allocation should succeed");

        println!("1. [CALL-SITE LOCATION]");
        println!("   file: {}", err.file().unwrap());
        println!("   line: {}", err.line());
        println!("   func: {}", err.func().unwrap());

        ctx.release();
        err
    };
    drop(err);

    println!("\n2. [ALLOCATOR EXHAUSTION]");
    let exhausted = Arc::new(AtomicBool::new(true));
    let exhausted_for_alloc = Arc::clone(&exhausted);
    let binding = AllocatorBinding::new(FnAllocator::new(
        move |size| {
            if exhausted_for_alloc.load(Ordering::SeqCst) {
                return None;
            }
            NonNull::new(unsafe { alloc::alloc(Layout::from_size_align(size.max(1), 1).unwrap()) })
        },
        |ptr, size| unsafe {
            alloc::dealloc(ptr.as_ptr(), Layout::from_size_align(size.max(1), 1).unwrap())
        },
    ));
    let ctx = Context::create(Some(binding));

    let result = create_error!(&ctx, Domain::Allocator, Code::Oom, "out of memory");
    println!("   construction under exhaustion: {:?}", result.is_none());

    ctx.release();
}
