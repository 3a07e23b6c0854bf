//! rfieldclock main entrypoint.

use rfieldclock::run;
use rfieldclock::ui::messages::error;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,rfieldclock=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!();
    if let Err(e) = run().await {
        error(e);
        std::process::exit(1);
    }
}
