//! Trivial driver for `unique-client`: reads a file (or stdin), submits it
//! for dedup, and reports what came back. Not part of the daemon/client
//! contract itself — just enough to exercise the library end to end.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "unique-demo-client",
    version,
    about = "Submit a file to uniqued and report the mapped result"
)]
struct Cli {
    /// File to submit; reads stdin if omitted.
    path: Option<PathBuf>,

    /// Use the deferred path instead of waiting on the daemon.
    #[arg(short, long)]
    deferred: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let data = match &cli.path {
        Some(path) => std::fs::read(path).unwrap_or_else(|e| {
            eprintln!("failed to read {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).unwrap_or_else(|e| {
                eprintln!("failed to read stdin: {e}");
                std::process::exit(1);
            });
            buf
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build the tokio runtime");
    let local = tokio::task::LocalSet::new();

    local.block_on(&rt, async {
        let view = if cli.deferred {
            let view = unique_client::unique_deferred(&data);
            // Give the background submission a moment to land before we
            // exit; this demo has nothing else to keep the process alive.
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            view
        } else {
            unique_client::unique_sync(&data).await
        };

        println!("mapped {} bytes", view.len());
        log::debug!("first 16 bytes: {:02x?}", &view[..view.len().min(16)]);
    });
}
