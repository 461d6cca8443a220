use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use interface::{ApiError, Snapshot};

/// 렌더 레이어가 보는 값: 마지막으로 성공한 스냅샷과 동기화 상태
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub snapshot: Option<Arc<Snapshot>>,
    /// 현재 스냅샷을 만든 fetch의 시퀀스 번호 (0 = 아직 없음)
    pub seq: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    pub health: SyncHealth,
}

impl DashboardView {
    pub fn is_stale(&self) -> bool {
        matches!(self.health, SyncHealth::Stale { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncHealth {
    /// 아직 정산된 fetch가 없다
    #[default]
    Waiting,
    Fresh,
    /// 마지막 fetch(들)가 실패해서 이전 스냅샷을 그대로 보여주는 중
    Stale {
        since: DateTime<Utc>,
        consecutive_failures: u32,
        last_error: ApiError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// fetch 도중 루프가 멈췄다 (혹은 멈췄다가 다시 시작했다)
    Stopped,
    /// 더 나중에 시작한 fetch가 이미 화면을 갱신했다
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchTicket {
    epoch: u64,
    pub(crate) seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Settled {
    Published,
    MarkedStale { consecutive_failures: u32 },
    Discarded(DiscardReason),
}

#[derive(Debug, Default)]
struct Control {
    active: bool,
    epoch: u64,
    next_seq: u64,
    /// 화면에 올라간 스냅샷의 시퀀스
    published_seq: u64,
    /// 마지막으로 stale 표시를 남긴 실패의 시퀀스
    failed_seq: u64,
}

/// 발행된 뷰를 담는 단일 writer 셀.
///
/// 발행 여부 판단(epoch, 시퀀스)과 발행은 같은 락 안에서 일어나므로
/// `deactivate` 이후에는 어떤 fetch 결과도 뷰를 바꾸지 못한다.
pub(crate) struct ViewCell {
    control: Mutex<Control>,
    tx: watch::Sender<DashboardView>,
}

impl ViewCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(DashboardView::default());
        Self {
            control: Mutex::new(Control::default()),
            tx,
        }
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stopped → Polling. 이미 Polling이면 false
    pub(crate) fn activate(&self) -> bool {
        let mut control = self.control();
        if control.active {
            return false;
        }
        control.active = true;
        control.epoch += 1;
        true
    }

    /// Polling → Stopped. 이미 Stopped면 false
    pub(crate) fn deactivate(&self) -> bool {
        let mut control = self.control();
        if !control.active {
            return false;
        }
        control.active = false;
        control.epoch += 1;
        true
    }

    pub(crate) fn is_active(&self) -> bool {
        self.control().active
    }

    /// Stopped 상태면 None
    pub(crate) fn begin(&self) -> Option<FetchTicket> {
        let mut control = self.control();
        if !control.active {
            return None;
        }
        control.next_seq += 1;
        Some(FetchTicket {
            epoch: control.epoch,
            seq: control.next_seq,
        })
    }

    pub(crate) fn settle(&self, ticket: FetchTicket, result: Result<Snapshot, ApiError>) -> Settled {
        let mut control = self.control();
        if !control.active || ticket.epoch != control.epoch {
            return Settled::Discarded(DiscardReason::Stopped);
        }
        // 성공은 화면의 스냅샷보다 새롭기만 하면 올린다.
        // 실패는 화면의 스냅샷이나 이미 기록된 실패보다 새로울 때만 stale로 표시한다.
        let superseded = match &result {
            Ok(_) => ticket.seq <= control.published_seq,
            Err(_) => ticket.seq <= control.published_seq.max(control.failed_seq),
        };
        if superseded {
            return Settled::Discarded(DiscardReason::Superseded);
        }

        let now = Utc::now();
        match result {
            Ok(snapshot) => {
                control.published_seq = ticket.seq;
                let newer_failure = control.failed_seq > ticket.seq;
                self.tx.send_modify(|view| {
                    view.snapshot = Some(Arc::new(snapshot));
                    view.seq = ticket.seq;
                    view.fetched_at = Some(now);
                    // 더 나중에 시작한 fetch가 실패했으면 stale 표시는 그대로 둔다
                    if !newer_failure {
                        view.health = SyncHealth::Fresh;
                    }
                });
                Settled::Published
            }
            Err(error) => {
                control.failed_seq = ticket.seq;
                let mut failures = 0;
                self.tx.send_modify(|view| {
                    let (since, previous) = match &view.health {
                        SyncHealth::Stale {
                            since,
                            consecutive_failures,
                            ..
                        } => (*since, *consecutive_failures),
                        _ => (now, 0),
                    };
                    failures = previous + 1;
                    view.health = SyncHealth::Stale {
                        since,
                        consecutive_failures: failures,
                        last_error: error,
                    };
                });
                Settled::MarkedStale {
                    consecutive_failures: failures,
                }
            }
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> DashboardView {
        self.tx.borrow().clone()
    }
}
