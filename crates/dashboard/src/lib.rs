pub mod config;
pub mod controller;
pub mod logger;
pub mod render;
pub mod server;
pub mod sync;

pub use config::{ConfigError, DashboardConfig};
pub use controller::{Dashboard, MutationReport};
pub use sync::{DashboardView, RefreshOutcome, SyncConfig, SyncHealth, SyncLoop};

use std::sync::Once;

static INIT: Once = Once::new();

/// .env 파일에서 환경변수를 읽어온다
fn init() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
    });
}

// 라이브러리가 로드될 때 자동으로 초기화
#[ctor::ctor]
fn setup() {
    init();
}
