use std::io;

use anyhow::Result;

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod backfill;
pub mod calculation;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod logging;
pub mod report;
pub mod util;

/// 90 天內只有單一流程，fetch 之間不需要併發
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let (store, summary) = backfill::exchange_rate::execute().await;
    if !summary.failures.is_empty() || summary.timed_out {
        logging::info_console(format!("Report covers partial data: {}", summary));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = report::write_to(&store, &mut out);
    logging::shutdown();
    written?;

    Ok(())
}
