use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// 開始直後に一回目を発火するかどうか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    Immediate,
    AfterPeriod,
}

/// 開始・停止できる一定周期のタイマー。
///
/// 停止中の `tick` は永久に完了しないので、`tokio::select!` の分岐に
/// そのまま置いておける。バックオフやジッターは無い。
#[derive(Debug)]
pub struct RepeatTimer {
    period: Duration,
    first_tick: FirstTick,
    interval: Option<Interval>,
}

impl RepeatTimer {
    /// `period` は 0 より大きいこと
    pub fn new(period: Duration, first_tick: FirstTick) -> Self {
        Self {
            period,
            first_tick,
            interval: None,
        }
    }

    /// 停止中なら開始する。開始した場合は true
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }

        let start = match self.first_tick {
            FirstTick::Immediate => Instant::now(),
            FirstTick::AfterPeriod => Instant::now() + self.period,
        };
        let mut interval = time::interval_at(start, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        true
    }

    /// 動作中なら停止する。停止した場合は true
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    /// 周期を最初からやり直す
    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    /// 停止中なら開始、動作中なら停止。切り替え後に動作中なら true
    pub fn toggle(&mut self) -> bool {
        if !self.stop() {
            self.start();
        }
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 次の発火まで待つ
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}
