use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ApiError;

/// `/status` 응답. 서비스에 상태 행이 아직 없으면 `is_running` 외 필드는 `null`로 온다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub cash: Option<f64>,
    #[serde(default)]
    pub is_running: bool,
    pub interval_minutes: Option<u32>,
    pub current_strategy: Option<String>,
    #[serde(default, with = "crate::timestamp::option")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Status {
    pub fn strategy(&self) -> Option<StrategyName> {
        self.current_strategy.as_deref()?.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub current_price: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
    pub total_equity: f64,
}

/// 한 틱에서 가져온 status / portfolio / trades / equity 묶음.
///
/// 네 부분은 각각 독립된 요청으로 가져오므로 서로 같은 시점이라는 보장이 없다.
/// status는 T 시점, portfolio는 T+ε 시점일 수 있다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: Status,
    pub portfolio: Vec<Position>,
    /// 최신 거래가 먼저 온다
    pub trades: Vec<Trade>,
    /// 오래된 점이 먼저 온다
    pub equity: Vec<EquityPoint>,
}

impl Snapshot {
    pub fn total_unrealized_pnl(&self) -> f64 {
        self.portfolio.iter().map(|p| p.unrealized_pnl).sum()
    }

    pub fn total_realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.realized_pnl).sum()
    }

    pub fn latest_equity(&self) -> Option<f64> {
        self.equity.last().map(|p| p.total_equity)
    }
}

/// 서비스가 아는 전략 이름
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyName {
    Random,
    Momentum,
}

impl StrategyName {
    pub const ALL: [StrategyName; 2] = [StrategyName::Random, StrategyName::Momentum];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyName::Random => "random",
            StrategyName::Momentum => "momentum",
        }
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyName {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(StrategyName::Random),
            "momentum" => Ok(StrategyName::Momentum),
            other => Err(ApiError::InvalidArgument(format!(
                "unknown strategy: {other} (expected random or momentum)"
            ))),
        }
    }
}

/// 변경 요청에 대한 서비스 응답 (`{"message": "..."}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAck {
    #[serde(default)]
    pub message: String,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
