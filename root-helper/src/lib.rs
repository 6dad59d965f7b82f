//! The elevated worker.
//!
//! This is the entire trusted computing base running with escalated rights: a
//! purely reactive loop that reads one request line, runs it, and writes one
//! response line. It deliberately accepts an unbounded vocabulary of argument
//! vectors rather than a fixed allowlist – the unprivileged caller and this
//! worker are the same codebase running as different identities, so the
//! protocol only has to survive malformed messages, not hostile ones.

mod server;

pub use server::serve;

/// Entry point for the `--root-helper` role of the binary. Serves the wire
/// protocol over real stdin/stdout until the parent closes the pipe, then
/// exits. Never returns to the caller.
pub fn run_main() -> ! {
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .and_then(|runtime| {
            runtime.block_on(async {
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                let stdout = tokio::io::stdout();
                serve(stdin, stdout).await
            })
        });

    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            // Stderr is discarded by the parent; this is diagnostic only.
            eprintln!("root helper terminated: {err}");
            std::process::exit(1);
        }
    }
}
