/// 全体グラフの集計幅（秒）
pub const GLOBAL_WINDOW: usize = 30;
/// キー別グラフの集計幅（秒）
pub const DRILLDOWN_WINDOW: usize = 60;

/// 1秒単位のバケット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub second: i64,
    pub count: u64,
}

/// タイムスタンプ列を `now` で終わる `window` 秒分のヒストグラムに変換する。
///
/// 結果は常に `window` 件で、秒の昇順に並ぶ。範囲は `[now - window + 1, now]`。
/// 範囲外や有限でない値は黙って捨てる。
pub fn bucketize(timestamps: &[f64], now: i64, window: usize) -> Vec<Bucket> {
    let start = now - window as i64 + 1;
    let mut buckets: Vec<Bucket> = (start..=now)
        .map(|second| Bucket { second, count: 0 })
        .collect();

    for &timestamp in timestamps {
        if !timestamp.is_finite() {
            continue;
        }
        // 0方向への切り捨て
        let second = timestamp.trunc() as i64;
        if (start..=now).contains(&second) {
            buckets[(second - start) as usize].count += 1;
        }
    }

    buckets
}

/// 現在時刻（UNIX秒）
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_at(buckets: &[Bucket], second: i64) -> u64 {
        buckets
            .iter()
            .find(|b| b.second == second)
            .map(|b| b.count)
            .unwrap_or_default()
    }

    #[test]
    fn empty_input_is_all_zero() {
        let buckets = bucketize(&[], 100, GLOBAL_WINDOW);
        assert_eq!(buckets.len(), GLOBAL_WINDOW);
        assert!(buckets.iter().all(|b| b.count == 0));
    }

    #[test]
    fn duplicates_accumulate() {
        let buckets = bucketize(&[100.0, 100.0, 95.0], 100, 30);

        assert_eq!(buckets.len(), 30);
        assert_eq!(buckets.first().unwrap().second, 71);
        assert_eq!(buckets.last().unwrap().second, 100);
        assert_eq!(count_at(&buckets, 100), 2);
        assert_eq!(count_at(&buckets, 95), 1);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 3);
    }

    #[test]
    fn window_lower_edge_is_exclusive() {
        let outside = bucketize(&[70.0], 100, 30);
        assert!(outside.iter().all(|b| b.count == 0));

        let inside = bucketize(&[71.0], 100, 30);
        assert_eq!(count_at(&inside, 71), 1);
    }

    #[test]
    fn now_is_inclusive_and_future_is_dropped() {
        let buckets = bucketize(&[100.0, 100.999, 101.0, 250.0], 100, 30);
        assert_eq!(count_at(&buckets, 100), 2);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 2);
    }

    #[test]
    fn fractional_seconds_truncate() {
        let buckets = bucketize(&[1_700_000_041.73, 1_700_000_041.01], 1_700_000_050, 60);
        assert_eq!(count_at(&buckets, 1_700_000_041), 2);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let buckets = bucketize(&[f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 99.5], 100, 30);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 1);
    }

    #[test]
    fn length_order_and_sum_hold_across_windows() {
        let now = 1_000;
        let timestamps: Vec<f64> = (0..400).map(|i| 850.0 + i as f64 * 0.43).collect();

        for window in [0usize, 1, 2, 30, 60, 200] {
            let buckets = bucketize(&timestamps, now, window);
            assert_eq!(buckets.len(), window);
            assert!(buckets.windows(2).all(|w| w[0].second + 1 == w[1].second));

            let start = now - window as i64 + 1;
            let expected = timestamps
                .iter()
                .filter(|t| (start..=now).contains(&(t.trunc() as i64)))
                .count() as u64;
            assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), expected);
        }
    }

    #[test]
    fn calls_with_different_now_are_independent() {
        let timestamps = [100.0, 101.0];
        let first = bucketize(&timestamps, 100, 30);
        let second = bucketize(&timestamps, 101, 30);

        assert_eq!(first.iter().map(|b| b.count).sum::<u64>(), 1);
        assert_eq!(second.iter().map(|b| b.count).sum::<u64>(), 2);
        assert_eq!(second.first().unwrap().second, 72);
    }
}
