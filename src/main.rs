use anyhow::{Context, Result};
use practice_hub::commands::serve;
use practice_hub::services::CancelToken;
use practice_hub::{logging, AppConfig, AppState};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    logging::init(config.log_level, &config.log_path())?;

    log::info!(
        "practice-hub {} starting on {}, data dir {}",
        env!("CARGO_PKG_VERSION"),
        practice_hub::utils::get_platform(),
        config.data_dir.display()
    );

    // Ctrl-C 取消正在进行的判题，并结束请求循环
    let (cancel_handle, cancel) = CancelToken::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, cancelling running validation");
            cancel_handle.cancel();
        }
    });

    let state = AppState::open(&config, cancel)?;

    serve(
        &state,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
    .context("request loop failed")?;

    let cancelled = state.cancel.is_cancelled();
    drop(state);
    log::info!("practice-hub shutting down");

    if cancelled {
        // 挂起中的 stdin 读取无法取消，运行时关闭会等待它
        log::logger().flush();
        std::process::exit(130);
    }
    Ok(())
}
