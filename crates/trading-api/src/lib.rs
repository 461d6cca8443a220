use async_trait::async_trait;

use interface::{ApiError, EquityPoint, MutationAck, Position, Status, Trade};

pub mod http;
pub mod mutation;

pub use http::{HttpTradingClient, DEFAULT_BASE_URL};
pub use mutation::{Method, Mutation};

/// 원격 페이퍼 트레이딩 서비스
///
/// 조회 네 개는 스냅샷을 구성하고, 나머지는 서비스 상태를 바꾼다.
#[async_trait]
pub trait TradingService: Send + Sync {
    async fn status(&self) -> Result<Status, ApiError>;

    async fn portfolio(&self) -> Result<Vec<Position>, ApiError>;

    /// 최신 거래가 먼저 온다
    async fn trades(&self) -> Result<Vec<Trade>, ApiError>;

    /// 오래된 점이 먼저 온다
    async fn equity(&self) -> Result<Vec<EquityPoint>, ApiError>;

    /// 조회 전에 서버가 보유 포지션의 현재가를 다시 계산하게 한다
    async fn refresh_prices(&self) -> Result<MutationAck, ApiError>;

    async fn mutate(&self, mutation: &Mutation) -> Result<MutationAck, ApiError>;
}
