//! 발행된 뷰를 터미널 텍스트로 그린다. 상태를 갖지 않는 순수 함수.

use chrono::{DateTime, Utc};

use interface::{EquityPoint, Snapshot, Status};

use crate::sync::{DashboardView, SyncHealth};

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WIDTH: usize = 60;

pub fn render(view: &DashboardView) -> String {
    let mut out = String::new();
    out.push_str("=== PaperTrader Dashboard ===\n");
    out.push_str(&sync_line(view));
    out.push('\n');

    let Some(snapshot) = &view.snapshot else {
        out.push_str("\n(no snapshot yet)\n");
        return out;
    };

    out.push('\n');
    out.push_str(&status_block(&snapshot.status));
    out.push('\n');
    out.push_str(&equity_block(&snapshot.equity));
    out.push('\n');
    out.push_str(&portfolio_block(snapshot));
    out.push('\n');
    out.push_str(&trades_block(snapshot));
    out
}

fn sync_line(view: &DashboardView) -> String {
    let fetched = view
        .fetched_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    match &view.health {
        SyncHealth::Waiting => "Sync: waiting for first snapshot".to_string(),
        SyncHealth::Fresh => format!("Sync: #{} at {}", view.seq, fetched),
        SyncHealth::Stale {
            since,
            consecutive_failures,
            last_error,
        } => format!(
            "Sync: #{} at {} [STALE since {}, {} failed] {}",
            view.seq,
            fetched,
            since.format("%H:%M:%S"),
            consecutive_failures,
            last_error
        ),
    }
}

fn status_block(status: &Status) -> String {
    let cash = status
        .cash
        .map(|c| format!("₹{:.2}", c))
        .unwrap_or_else(|| "-".to_string());
    let interval = status
        .interval_minutes
        .map(|m| format!("{} min", m))
        .unwrap_or_else(|| "-".to_string());
    let strategy = status.current_strategy.as_deref().unwrap_or("-");
    let heartbeat = status
        .last_heartbeat
        .map(format_time)
        .unwrap_or_else(|| "-".to_string());

    format!(
        "Status\n  Cash:      {}\n  Running:   {}\n  Interval:  {}\n  Strategy:  {}\n  Heartbeat: {}\n",
        cash, status.is_running, interval, strategy, heartbeat
    )
}

fn equity_block(equity: &[EquityPoint]) -> String {
    let (Some(first), Some(last)) = (equity.first(), equity.last()) else {
        return "Equity Curve\n  (empty)\n".to_string();
    };

    let values: Vec<f64> = equity.iter().map(|p| p.total_equity).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    format!(
        "Equity Curve ({} points)\n  {}\n  first ₹{:.2}  last ₹{:.2}  min ₹{:.2}  max ₹{:.2}\n",
        values.len(),
        sparkline(&values, SPARK_WIDTH),
        first.total_equity,
        last.total_equity,
        min,
        max
    )
}

fn portfolio_block(snapshot: &Snapshot) -> String {
    let total = snapshot.total_unrealized_pnl();
    let mut out = format!("Portfolio — {}\n", signed_rupees(total));
    out.push_str(&format!(
        "  {:<14} {:>10} {:>12} {:>12} {:>14}\n",
        "Symbol", "Quantity", "Avg Price", "Cur Price", "Unrealized"
    ));
    for p in &snapshot.portfolio {
        out.push_str(&format!(
            "  {:<14} {:>10} {:>12.2} {:>12.2} {:>14.2}\n",
            p.symbol, p.quantity, p.avg_price, p.current_price, p.unrealized_pnl
        ));
    }
    out
}

fn trades_block(snapshot: &Snapshot) -> String {
    let total = snapshot.total_realized_pnl();
    let mut out = format!("Trades — {}\n", signed_rupees(total));
    out.push_str(&format!(
        "  {:<10} {:<14} {:<5} {:>8} {:>12} {:>12}\n",
        "Time", "Symbol", "Side", "Qty", "Price", "Realized"
    ));
    for t in &snapshot.trades {
        out.push_str(&format!(
            "  {:<10} {:<14} {:<5} {:>8} {:>12.2} {:>12.2}\n",
            t.timestamp.format("%H:%M:%S").to_string(),
            t.symbol,
            t.side.to_string(),
            t.quantity,
            t.price,
            t.realized_pnl
        ));
    }
    out
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn signed_rupees(value: f64) -> String {
    if value < 0.0 {
        format!("-₹{:.2}", value.abs())
    } else {
        format!("+₹{:.2}", value)
    }
}

/// 값들을 `width`개 이하의 막대로 줄여 그린다. 구간마다 마지막 값을 쓴다.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let step = values.len().div_ceil(width);
    let sampled: Vec<f64> = values
        .chunks(step)
        .filter_map(|chunk| chunk.last().copied())
        .collect();

    let min = sampled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sampled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let top = (SPARK_BARS.len() - 1) as f64;

    sampled
        .iter()
        .map(|v| {
            if range <= f64::EPSILON {
                SPARK_BARS[SPARK_BARS.len() / 2]
            } else {
                SPARK_BARS[(((v - min) / range) * top).round() as usize]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use interface::{ApiError, Position, Side, Trade};

    fn sample_snapshot() -> Snapshot {
        let ts = Utc.with_ymd_and_hms(2025, 11, 29, 9, 20, 0).unwrap();
        Snapshot {
            status: Status {
                cash: Some(100000.0),
                is_running: true,
                interval_minutes: Some(5),
                current_strategy: Some("random".to_string()),
                last_heartbeat: Some(ts),
            },
            portfolio: vec![
                Position {
                    symbol: "RELIANCE.NS".to_string(),
                    quantity: 10.0,
                    avg_price: 2500.0,
                    current_price: 2512.05,
                    unrealized_pnl: 120.5,
                },
                Position {
                    symbol: "TCS.NS".to_string(),
                    quantity: 5.0,
                    avg_price: 3900.0,
                    current_price: 3893.95,
                    unrealized_pnl: -30.25,
                },
            ],
            trades: vec![Trade {
                timestamp: ts,
                symbol: "INFY.NS".to_string(),
                side: Side::Sell,
                quantity: 10.0,
                price: 1500.0,
                realized_pnl: -12.0,
            }],
            equity: vec![
                EquityPoint {
                    timestamp: ts,
                    total_equity: 100000.0,
                },
                EquityPoint {
                    timestamp: ts,
                    total_equity: 100090.25,
                },
            ],
        }
    }

    #[test]
    fn test_render_waiting() {
        let text = render(&DashboardView::default());
        assert!(text.contains("waiting for first snapshot"));
        assert!(text.contains("(no snapshot yet)"));
    }

    #[test]
    fn test_render_snapshot() {
        let view = DashboardView {
            snapshot: Some(Arc::new(sample_snapshot())),
            seq: 7,
            fetched_at: Some(Utc.with_ymd_and_hms(2025, 11, 29, 9, 21, 0).unwrap()),
            health: SyncHealth::Fresh,
        };
        let text = render(&view);
        assert!(text.contains("Sync: #7 at 09:21:00"));
        assert!(text.contains("₹100000.00"));
        assert!(text.contains("Running:   true"));
        assert!(text.contains("5 min"));
        assert!(text.contains("Portfolio — +₹90.25"));
        assert!(text.contains("Trades — -₹12.00"));
        assert!(text.contains("RELIANCE.NS"));
        assert!(text.contains("Equity Curve (2 points)"));
        assert!(!text.contains("STALE"));
    }

    #[test]
    fn test_render_stale_marker() {
        let view = DashboardView {
            snapshot: Some(Arc::new(sample_snapshot())),
            seq: 3,
            fetched_at: None,
            health: SyncHealth::Stale {
                since: Utc.with_ymd_and_hms(2025, 11, 29, 9, 22, 0).unwrap(),
                consecutive_failures: 2,
                last_error: ApiError::Network("connection refused".to_string()),
            },
        };
        let text = render(&view);
        assert!(text.contains("[STALE since 09:22:00, 2 failed]"));
        assert!(text.contains("connection refused"));
        // 이전 스냅샷은 그대로 보인다
        assert!(text.contains("RELIANCE.NS"));
    }

    #[test]
    fn test_sparkline() {
        assert_eq!(sparkline(&[], 10), "");
        assert_eq!(sparkline(&[1.0, 2.0, 3.0], 10).chars().count(), 3);
        assert_eq!(sparkline(&[5.0, 5.0], 10), "▅▅");

        let line = sparkline(&[0.0, 7.0], 10);
        assert_eq!(line, "▁█");

        let long: Vec<f64> = (0..500).map(f64::from).collect();
        assert!(sparkline(&long, 60).chars().count() <= 60);
    }
}
