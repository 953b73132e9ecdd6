//! 标签页布局
//!
//! 每个标签页：第一行是表头，每次写入占用一列 "{date} Results"，
//! 第 2–7 行依次是 mobile 的三项指标和 desktop 的三项指标。

use super::format::{MetricKind, Rating};
use crate::models::MetricPair;

/// 空标签页首列的表头
pub const LABEL_HEADER: &str = "Metric";

/// 首列的行标签
pub const ROW_LABELS: [&str; 6] = [
    "Mobile Performance",
    "Mobile FCP (s)",
    "Mobile Speed Index (s)",
    "Desktop Performance",
    "Desktop FCP (s)",
    "Desktop Speed Index (s)",
];

/// 日期列的表头
pub fn column_title(date: &str) -> String {
    format!("{} Results", date)
}

/// 日期列的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPlan {
    /// 0 起的列号
    pub index: usize,
    /// 是否需要新建表头
    pub append: bool,
}

/// 已有同名列则复用，否则追加到末尾
pub fn plan_column(headers: &[String], title: &str) -> ColumnPlan {
    match headers.iter().position(|h| h == title) {
        Some(index) => ColumnPlan {
            index,
            append: false,
        },
        None => ColumnPlan {
            index: headers.len(),
            append: true,
        },
    }
}

/// 一个待写入的单元格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricCell {
    pub value: f64,
    pub kind: MetricKind,
}

impl MetricCell {
    pub fn rating(&self) -> Rating {
        self.kind.rate(self.value)
    }
}

/// 按行顺序展开 6 个单元格
pub fn metric_cells(metrics: &MetricPair) -> [MetricCell; 6] {
    let cell = |value: f64, kind: MetricKind| MetricCell { value, kind };
    [
        cell(metrics.mobile.performance as f64, MetricKind::Performance),
        cell(metrics.mobile.first_contentful_paint, MetricKind::FirstContentfulPaint),
        cell(metrics.mobile.speed_index, MetricKind::SpeedIndex),
        cell(metrics.desktop.performance as f64, MetricKind::Performance),
        cell(metrics.desktop.first_contentful_paint, MetricKind::FirstContentfulPaint),
        cell(metrics.desktop.speed_index, MetricKind::SpeedIndex),
    ]
}

/// 0 起的列号转 A1 列名：0 → A，25 → Z，26 → AA
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
