use std::{fs::OpenOptions, io, path::Path};

use chrono::Local;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Tracing guards를 보관하는 구조체
/// 이 구조체가 drop되기 전까지 로깅이 계속 작동합니다
pub struct TracingGuards {
    _file: non_blocking::WorkerGuard,
    _stdout: non_blocking::WorkerGuard,
}

/// Tracing 초기화
/// 파일 로깅과 stdout 로깅을 모두 설정합니다 (`RUST_LOG`가 없으면 info)
pub fn init_tracing(log_dir: &Path) -> io::Result<TracingGuards> {
    let (file_writer, file_guard) = daily_file_writer(log_dir, "dashboard")?;
    let (stdout_writer, stdout_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    // 파일에는 sync 루프의 debug 로그까지 남긴다
    let file_filter = EnvFilter::new("info,dashboard=debug");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(stdout_writer)
                .with_ansi(true)
                .with_filter(env_filter),
        )
        .init();

    Ok(TracingGuards {
        _file: file_guard,
        _stdout: stdout_guard,
    })
}

/// `logs/dashboard.2025-11-29.log` 형식으로 파일을 연다
fn daily_file_writer(
    log_dir: &Path,
    prefix: &str,
) -> io::Result<(non_blocking::NonBlocking, non_blocking::WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;

    let date = Local::now().format("%Y-%m-%d").to_string();
    let path = log_dir.join(format!("{prefix}.{date}.log"));

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(non_blocking(file))
}
