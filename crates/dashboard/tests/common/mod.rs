#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::time::Instant;

use interface::{
    ApiError, EquityPoint, MutationAck, Position, Side, Snapshot, Status, Trade,
};
use trading_api::{Mutation, TradingService};

pub const INITIAL_CASH: f64 = 100000.0;

#[derive(Default)]
pub struct FakeState {
    pub snapshot: Snapshot,
    pub failing: bool,
    pub fail_mutations: bool,
    pub status_delay: Duration,
    pub status_calls: Vec<Instant>,
    pub status_in_flight: usize,
    pub max_status_in_flight: usize,
    pub refresh_calls: usize,
    pub mutations: Vec<Mutation>,
}

/// 메모리 안에서 동작하는 트레이딩 서비스
pub struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new(snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                snapshot,
                ..Default::default()
            }),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> Result<T, ApiError> {
        self.with(|s| {
            if s.failing {
                Err(ApiError::Network("connection refused".to_string()))
            } else {
                Ok(f(&s.snapshot))
            }
        })
    }
}

#[async_trait]
impl TradingService for FakeService {
    async fn status(&self) -> Result<Status, ApiError> {
        let delay = self.with(|s| {
            s.status_calls.push(Instant::now());
            s.status_in_flight += 1;
            s.max_status_in_flight = s.max_status_in_flight.max(s.status_in_flight);
            s.status_delay
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| s.status_in_flight -= 1);
        self.read(|snapshot| snapshot.status.clone())
    }

    async fn portfolio(&self) -> Result<Vec<Position>, ApiError> {
        self.read(|snapshot| snapshot.portfolio.clone())
    }

    async fn trades(&self) -> Result<Vec<Trade>, ApiError> {
        self.read(|snapshot| snapshot.trades.clone())
    }

    async fn equity(&self) -> Result<Vec<EquityPoint>, ApiError> {
        self.read(|snapshot| snapshot.equity.clone())
    }

    async fn refresh_prices(&self) -> Result<MutationAck, ApiError> {
        self.with(|s| s.refresh_calls += 1);
        self.read(|_| MutationAck {
            message: "Prices refreshed".to_string(),
        })
    }

    async fn mutate(&self, mutation: &Mutation) -> Result<MutationAck, ApiError> {
        mutation.validate()?;
        self.with(|s| {
            s.mutations.push(*mutation);
            if s.fail_mutations {
                return Err(ApiError::server(500, "Internal Server Error"));
            }
            let status = &mut s.snapshot.status;
            let message = match *mutation {
                Mutation::StartTrading => {
                    status.is_running = true;
                    "Trading started".to_string()
                }
                Mutation::StopTrading => {
                    status.is_running = false;
                    "Trading stopped".to_string()
                }
                Mutation::Reset => {
                    status.is_running = false;
                    status.cash = Some(INITIAL_CASH);
                    s.snapshot.portfolio.clear();
                    s.snapshot.trades.clear();
                    s.snapshot.equity.clear();
                    "Account reset successful".to_string()
                }
                Mutation::SetCash(amount) => {
                    status.cash = Some(amount);
                    format!("Cash updated to {amount}")
                }
                Mutation::SetStrategy(name) => {
                    status.current_strategy = Some(name.to_string());
                    format!("Strategy changed to {name}")
                }
                Mutation::SetInterval(minutes) => {
                    status.interval_minutes = Some(minutes);
                    format!("Interval set to {minutes} minutes")
                }
                Mutation::RunTick => "Order Executed".to_string(),
            };
            Ok(MutationAck { message })
        })
    }
}

pub fn sample_snapshot() -> Snapshot {
    let ts = Utc.with_ymd_and_hms(2025, 11, 29, 9, 15, 0).unwrap();
    Snapshot {
        status: Status {
            cash: Some(INITIAL_CASH),
            is_running: false,
            interval_minutes: Some(5),
            current_strategy: Some("random".to_string()),
            last_heartbeat: None,
        },
        portfolio: vec![Position {
            symbol: "RELIANCE.NS".to_string(),
            quantity: 10.0,
            avg_price: 2500.0,
            current_price: 2512.05,
            unrealized_pnl: 120.5,
        }],
        trades: vec![Trade {
            timestamp: ts,
            symbol: "RELIANCE.NS".to_string(),
            side: Side::Sell,
            quantity: 10.0,
            price: 2520.0,
            realized_pnl: 200.0,
        }],
        equity: vec![EquityPoint {
            timestamp: ts,
            total_equity: INITIAL_CASH,
        }],
    }
}
