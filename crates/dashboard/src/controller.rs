use std::sync::Arc;

use tracing::{info, warn};

use interface::{ApiError, MutationAck};
use trading_api::{Mutation, TradingService};

use crate::sync::{RefreshOutcome, SyncConfig, SyncLoop};

/// 변경 요청 → 즉시 새로고침, 두 단계의 결과를 모두 담는다.
///
/// 서비스는 변경 결과를 따로 확인해 주지 않으므로, 변경이 실제로 반영됐는지는
/// 새로고침된 스냅샷으로만 알 수 있다.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationReport {
    pub mutation: Mutation,
    pub result: Result<MutationAck, ApiError>,
    pub refresh: RefreshOutcome,
}

impl MutationReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 서비스 클라이언트와 동기화 루프를 묶은 대시보드 본체
pub struct Dashboard {
    service: Arc<dyn TradingService>,
    sync: SyncLoop,
}

impl Dashboard {
    pub fn new(service: Arc<dyn TradingService>, config: SyncConfig) -> Self {
        let sync = SyncLoop::new(Arc::clone(&service), config);
        Self { service, sync }
    }

    pub fn sync(&self) -> &SyncLoop {
        &self.sync
    }

    /// 변경 요청을 보내고, 성공 여부와 상관없이 바로 새로고침한다
    pub async fn apply(&self, mutation: Mutation) -> MutationReport {
        let result = self.service.mutate(&mutation).await;
        match &result {
            Ok(ack) => info!("{} accepted: {}", mutation, ack.message),
            Err(e) => warn!("{} failed: {}", mutation, e),
        }

        let refresh = self.sync.refresh_now().await;

        MutationReport {
            mutation,
            result,
            refresh,
        }
    }
}
