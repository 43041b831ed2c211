use graphpersist::common::ContextId;
use graphpersist::errors::PersistResult;
use graphpersist::transaction::OperationDescriptor;
use graphpersist_int_test::test_util::{cleanup, create_test_context, RepositoryError, ACCOUNT_REPOSITORY};
use std::thread;

fn main() -> PersistResult<()> {
    colog::init();
    println!("Starting stress test...");
    let ctx = create_test_context()?;

    let threads = 8;
    let calls_per_thread = 10_000;
    let deposit = OperationDescriptor::new("deposit").declared_in(ACCOUNT_REPOSITORY);

    let start = std::time::Instant::now();
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let interceptor = ctx.interceptor().clone();
            let deposit = deposit.clone();
            thread::spawn(move || {
                let context = ContextId::new();
                for i in 0..calls_per_thread {
                    let result: Result<usize, RepositoryError> =
                        interceptor.invoke(context, &deposit, |_session| Ok(i));
                    if let Err(e) = result {
                        log::error!("Deposit {} failed: {}", i, e);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            log::error!("Worker thread panicked");
        }
    }
    let elapsed = start.elapsed();

    println!(
        "Ran {} transactional calls in {:?} ({} commits, {} sessions opened)",
        threads * calls_per_thread,
        elapsed,
        ctx.stats().commits(),
        ctx.stats().sessions_opened()
    );

    cleanup(ctx)
}
