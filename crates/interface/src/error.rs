use serde::Serialize;
use thiserror::Error;

/// 트레이딩 서비스 호출 실패 분류
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ApiError {
    /// 연결 거부, 타임아웃 등 응답을 받지 못한 경우
    #[error("network error: {0}")]
    Network(String),
    /// 2xx 이외의 응답
    #[error("server error: status {status}, response: {body}")]
    Server { status: u16, body: String },
    /// 응답 본문 파싱 실패
    #[error("decode error: {0}")]
    Decode(String),
    /// 요청 전에 걸러진 잘못된 파라미터
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ApiError {
    pub fn server(status: u16, body: &str) -> Self {
        ApiError::Server {
            status,
            body: body.chars().take(200).collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Server { .. } => "server",
            ApiError::Decode(_) => "decode",
            ApiError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Server {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
