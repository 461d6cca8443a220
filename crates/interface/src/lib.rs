mod error;
mod model;
pub mod timestamp;

pub use error::ApiError;
pub use model::{
    EquityPoint, MutationAck, Position, Side, Snapshot, Status, StrategyName, Trade,
};
