//! 进程内表格
//!
//! 与 Sheets 使用相同的布局规则，用于开发、演示和测试。

use super::format::Rating;
use super::layout::{self, LABEL_HEADER, ROW_LABELS};
use super::ResultSink;
use crate::error::SinkError;
use crate::models::MetricPair;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

/// 单元格：值和背景评级
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCell {
    pub value: Value,
    pub rating: Option<Rating>,
}

/// 一个标签页
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTab {
    pub title: String,
    pub headers: Vec<String>,
    /// (行, 列)，0 起，第 0 行是表头
    pub cells: BTreeMap<(usize, usize), MemoryCell>,
}

impl MemoryTab {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&MemoryCell> {
        self.cells.get(&(row, col))
    }

    fn set(&mut self, row: usize, col: usize, value: Value, rating: Option<Rating>) {
        self.cells.insert((row, col), MemoryCell { value, rating });
    }

    fn write(&mut self, metrics: &MetricPair, date: &str) {
        if self.headers.is_empty() {
            self.headers.push(LABEL_HEADER.to_string());
            self.set(0, 0, Value::from(LABEL_HEADER), None);
            for (i, label) in ROW_LABELS.iter().enumerate() {
                self.set(i + 1, 0, Value::from(*label), None);
            }
        }

        let title = layout::column_title(date);
        let plan = layout::plan_column(&self.headers, &title);
        if plan.append {
            self.headers.push(title.clone());
            self.set(0, plan.index, Value::from(title), None);
        }

        for (i, cell) in layout::metric_cells(metrics).iter().enumerate() {
            self.set(i + 1, plan.index, Value::from(cell.value), Some(cell.rating()));
        }
    }
}

/// 内存表格
#[derive(Debug, Default)]
pub struct MemorySink {
    tabs: Mutex<Vec<MemoryTab>>,
}

impl MemorySink {
    /// 按给定顺序创建空标签页
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tabs: Mutex::new(domains.into_iter().map(MemoryTab::new).collect()),
        }
    }

    /// 取一个标签页的副本
    pub fn tab(&self, domain: &str) -> Option<MemoryTab> {
        self.lock().iter().find(|t| t.title == domain).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MemoryTab>> {
        // 写入过程中不会 panic，中毒后数据仍然一致
        self.tabs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn list_domains(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.lock().iter().map(|t| t.title.clone()).collect())
    }

    async fn write_result(
        &self,
        domain: &str,
        metrics: &MetricPair,
        date: &str,
    ) -> Result<(), SinkError> {
        let mut tabs = self.lock();
        let tab = tabs
            .iter_mut()
            .find(|t| t.title == domain)
            .ok_or_else(|| SinkError::TabNotFound {
                domain: domain.to_string(),
            })?;

        tab.write(metrics, date);
        debug!("[域名 {}] 已写入内存表格", domain);
        Ok(())
    }
}
