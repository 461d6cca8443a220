//! 트레이딩 서비스 스냅샷 동기화 루프
//!
//! 고정 주기로 status / portfolio / trades / equity를 가져와 [`DashboardView`]로 발행한다.
//! - 틱끼리는 겹치지 않는다. 이전 틱의 fetch가 끝나야 다음 틱이 시작된다.
//! - fetch가 실패하면 이전 스냅샷을 유지하고 stale로 표시한 뒤 다음 틱을 그대로 진행한다.
//! - `stop()` 이후에 끝난 fetch는 버려진다.
//! - `refresh_now()`는 예약된 틱의 위상을 바꾸지 않는다.

mod cell;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use interface::{ApiError, Snapshot};
use trading_api::TradingService;

use cell::{Settled, ViewCell};
pub use cell::{DashboardView, DiscardReason, SyncHealth};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// 조회 전에 `/refresh_prices`를 호출할지 여부
    pub refresh_prices: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_prices: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchSource {
    Scheduled,
    Manual,
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchSource::Scheduled => f.write_str("scheduled"),
            FetchSource::Manual => f.write_str("manual"),
        }
    }
}

/// fetch 한 번의 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// 새 스냅샷이 발행됨
    Published { seq: u64 },
    /// fetch 실패, 이전 스냅샷 유지
    Failed {
        seq: u64,
        consecutive_failures: u32,
        error: ApiError,
    },
    /// fetch 결과를 버림
    Discarded { seq: u64, reason: DiscardReason },
    /// 루프가 멈춰 있어서 fetch하지 않음
    Skipped,
}

impl RefreshOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RefreshOutcome::Published { .. })
    }
}

/// 스냅샷 하나를 가져온다. 네 조회는 동시에 보내고 하나라도 실패하면 전체가 실패한다.
pub async fn fetch_snapshot(
    service: &dyn TradingService,
    refresh_prices: bool,
) -> Result<Snapshot, ApiError> {
    if refresh_prices {
        service.refresh_prices().await?;
    }

    let (status, portfolio, trades, equity) = tokio::try_join!(
        service.status(),
        service.portfolio(),
        service.trades(),
        service.equity(),
    )?;

    Ok(Snapshot {
        status,
        portfolio,
        trades,
        equity,
    })
}

struct Inner {
    service: Arc<dyn TradingService>,
    config: SyncConfig,
    cell: ViewCell,
}

impl Inner {
    async fn refresh(&self, source: FetchSource) -> RefreshOutcome {
        let Some(ticket) = self.cell.begin() else {
            debug!("{} fetch skipped: sync loop is stopped", source);
            return RefreshOutcome::Skipped;
        };
        let seq = ticket.seq;

        let started = Instant::now();
        let result = fetch_snapshot(self.service.as_ref(), self.config.refresh_prices).await;
        let elapsed = started.elapsed();

        let error = result.as_ref().err().cloned();
        match self.cell.settle(ticket, result) {
            Settled::Published => {
                debug!("{} fetch #{} published ({:?})", source, seq, elapsed);
                RefreshOutcome::Published { seq }
            }
            Settled::MarkedStale {
                consecutive_failures,
            } => {
                let error = error.unwrap_or_else(|| ApiError::Network("unknown failure".to_string()));
                warn!(
                    "{} fetch #{} failed ({} in a row), keeping last snapshot: {}",
                    source, seq, consecutive_failures, error
                );
                RefreshOutcome::Failed {
                    seq,
                    consecutive_failures,
                    error,
                }
            }
            Settled::Discarded(reason) => {
                debug!("{} fetch #{} discarded: {:?}", source, seq, reason);
                RefreshOutcome::Discarded { seq, reason }
            }
        }
    }
}

struct Running {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// 스냅샷 폴링 루프. 상태는 Stopped / Polling 두 가지뿐이다.
pub struct SyncLoop {
    inner: Arc<Inner>,
    running: Mutex<Option<Running>>,
}

impl SyncLoop {
    pub fn new(service: Arc<dyn TradingService>, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                config,
                cell: ViewCell::new(),
            }),
            running: Mutex::new(None),
        }
    }

    fn running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.cell.is_active()
    }

    /// 즉시 한 번 가져오고 이후 `poll_interval`마다 반복한다.
    /// tokio 런타임 안에서 호출해야 한다. 이미 돌고 있으면 false.
    pub fn start(&self) -> bool {
        let mut running = self.running();
        if !self.inner.cell.activate() {
            return false;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(run_loop(inner, stop_rx));

        info!(
            "sync loop started: every {}ms, refresh_prices={}",
            self.inner.config.poll_interval.as_millis(),
            self.inner.config.refresh_prices
        );
        *running = Some(Running { stop_tx, handle });
        true
    }

    /// 예약 틱 없이 Polling 상태로만 바꾼다. fetch는 `refresh_now()`로만 일어난다.
    /// 한 번 가져오고 끝나는 명령에서 쓴다. 이미 Polling이면 false.
    pub fn start_manual(&self) -> bool {
        let _running = self.running();
        if !self.inner.cell.activate() {
            return false;
        }
        info!("sync loop started without scheduled ticks");
        true
    }

    /// 예약된 틱을 취소한다. 진행 중인 fetch는 끝까지 가지만 결과는 버려진다.
    ///
    /// 루프 태스크의 핸들을 돌려주므로 진행 중인 fetch가 끝나기를 기다릴 수 있다.
    /// 이미 멈춰 있으면 None.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let mut running = self.running();
        if !self.inner.cell.deactivate() {
            return None;
        }

        // start_manual로 시작했으면 태스크가 없다
        let Some(Running { stop_tx, handle }) = running.take() else {
            info!("sync loop stopped");
            return None;
        };
        // 태스크가 이미 끝났으면 수신자가 없다
        let _ = stop_tx.send(());
        info!("sync loop stopped");
        Some(handle)
    }

    /// 예약 주기와 별개로 지금 바로 가져온다. 멈춰 있으면 아무것도 하지 않는다.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.inner.refresh(FetchSource::Manual).await
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.inner.cell.subscribe()
    }

    pub fn view(&self) -> DashboardView {
        self.inner.cell.current()
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        if let Some(Running { stop_tx, .. }) = self.running().take() {
            self.inner.cell.deactivate();
            let _ = stop_tx.send(());
        }
    }
}

async fn run_loop(inner: Arc<Inner>, mut stop_rx: oneshot::Receiver<()>) {
    let mut ticker = interval(inner.config.poll_interval);
    // 한 틱이 주기를 넘기면 밀린 틱을 몰아서 쏘지 않고 거기서부터 다시 센다
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        if inner.refresh(FetchSource::Scheduled).await == RefreshOutcome::Skipped {
            break;
        }
    }

    debug!("sync loop task exited");
}
