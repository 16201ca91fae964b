use ratatui::style::Color;

use crate::bucket::Bucket;

/// グラフの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
}

/// 描画対象となるグラフの状態。
///
/// 起動時に一度だけ作られ、以降は `update` でのみ中身が書き換わる。
/// ラベル列と値列は常に同じ長さ。
#[derive(Debug, Clone)]
pub struct ChartSurface {
    kind: ChartKind,
    label: String,
    color: Color,
    labels: Vec<String>,
    values: Vec<u64>,
    revision: u64,
}

impl ChartSurface {
    pub fn initialize(kind: ChartKind, label: impl Into<String>, color: Color) -> Self {
        Self {
            kind,
            label: label.into(),
            color,
            labels: Vec::new(),
            values: Vec::new(),
            revision: 0,
        }
    }

    /// バケット列でラベルと値を置き換える（既存のバッファを再利用）
    pub fn update(&mut self, buckets: &[Bucket]) {
        self.labels.clear();
        self.labels
            .extend(buckets.iter().map(|bucket| bucket.second.to_string()));

        self.values.clear();
        self.values.extend(buckets.iter().map(|bucket| bucket.count));

        self.revision += 1;
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// これまでの `update` 回数
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_value(&self) -> u64 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }

    /// 折れ線グラフ用の座標列（x はバケットの位置）
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| (i as f64, *value as f64))
            .collect()
    }
}
