use std::fmt;

use serde::Serialize;

use interface::{ApiError, StrategyName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// 서비스 상태를 바꾸는 요청. 파라미터는 모두 경로에 들어간다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum Mutation {
    StartTrading,
    StopTrading,
    Reset,
    SetCash(f64),
    SetStrategy(StrategyName),
    SetInterval(u32),
    /// 스케줄과 상관없이 트레이딩 틱 한 번 실행
    RunTick,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::StartTrading => "start",
            Mutation::StopTrading => "stop",
            Mutation::Reset => "reset",
            Mutation::SetCash(_) => "set_cash",
            Mutation::SetStrategy(_) => "set_strategy",
            Mutation::SetInterval(_) => "set_interval",
            Mutation::RunTick => "tick",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Mutation::RunTick => Method::Get,
            _ => Method::Post,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Mutation::SetCash(amount) => format!("/set_cash/{amount}"),
            Mutation::SetStrategy(name) => format!("/set_strategy/{name}"),
            Mutation::SetInterval(minutes) => format!("/set_interval/{minutes}"),
            other => format!("/{}", other.name()),
        }
    }

    /// 서버는 값을 검증하지 않으므로 보내기 전에 거른다
    pub fn validate(&self) -> Result<(), ApiError> {
        match *self {
            Mutation::SetCash(amount) if !amount.is_finite() || amount < 0.0 => Err(
                ApiError::InvalidArgument(format!("cash must be a finite amount >= 0, got {amount}")),
            ),
            Mutation::SetInterval(0) => Err(ApiError::InvalidArgument(
                "interval must be at least 1 minute".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::SetCash(amount) => write!(f, "set_cash({amount})"),
            Mutation::SetStrategy(name) => write!(f, "set_strategy({name})"),
            Mutation::SetInterval(minutes) => write!(f, "set_interval({minutes}m)"),
            other => f.write_str(other.name()),
        }
    }
}
