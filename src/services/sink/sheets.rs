//! Google Sheets 结果写入

use super::layout::{self, ColumnPlan, LABEL_HEADER, ROW_LABELS};
use super::ResultSink;
use crate::clients::sheets_client::{quote_tab, SheetTab, SheetsClient};
use crate::error::SinkError;
use crate::models::MetricPair;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Sheets 写入服务
///
/// 同一标签页的写入用一把异步锁串行化，不同标签页可以并发。
pub struct SheetsSink {
    client: SheetsClient,
    tab_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SheetsSink {
    pub fn new(client: SheetsClient) -> Self {
        Self {
            client,
            tab_locks: DashMap::new(),
        }
    }

    fn tab_lock(&self, domain: &str) -> Arc<Mutex<()>> {
        self.tab_locks
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn find_tab(&self, domain: &str) -> Result<SheetTab, SinkError> {
        let tabs = self
            .client
            .sheet_tabs()
            .await
            .map_err(|e| SinkError::write_failed(domain, e))?;
        tabs.into_iter()
            .find(|t| t.title == domain)
            .ok_or_else(|| SinkError::TabNotFound {
                domain: domain.to_string(),
            })
    }

    async fn write_locked(
        &self,
        domain: &str,
        metrics: &MetricPair,
        date: &str,
    ) -> Result<(), SinkError> {
        let tab = self.find_tab(domain).await?;
        let quoted = quote_tab(domain);
        let fail = |e: crate::clients::sheets_client::SheetsClientError| SinkError::write_failed(domain, e);

        let mut headers = self.client.header_row(domain).await.map_err(fail)?;
        if headers.is_empty() {
            debug!("[域名 {}] 空标签页，写入行标签", domain);
            let mut rows = vec![vec![Value::from(LABEL_HEADER)]];
            rows.extend(ROW_LABELS.iter().map(|label| vec![Value::from(*label)]));
            self.client
                .write_values(&format!("{}!A1:A7", quoted), rows)
                .await
                .map_err(fail)?;
            headers.push(LABEL_HEADER.to_string());
        }

        let title = layout::column_title(date);
        let plan = layout::plan_column(&headers, &title);
        let column = layout::column_letter(plan.index);

        if plan.append {
            self.client
                .write_values(&format!("{}!{}1", quoted, column), vec![vec![Value::from(title)]])
                .await
                .map_err(fail)?;
        }

        let cells = layout::metric_cells(metrics);
        let rows = cells.iter().map(|c| vec![Value::from(c.value)]).collect();
        self.client
            .write_values(&format!("{}!{}2:{}7", quoted, column, column), rows)
            .await
            .map_err(fail)?;

        self.client
            .batch_update(vec![color_request(tab.sheet_id, plan, &cells)])
            .await
            .map_err(fail)?;

        Ok(())
    }
}

/// 6 个单元格的背景色请求
fn color_request(sheet_id: i64, plan: ColumnPlan, cells: &[layout::MetricCell]) -> Value {
    let rows: Vec<Value> = cells
        .iter()
        .map(|cell| {
            json!({
                "values": [{
                    "userEnteredFormat": { "backgroundColor": cell.rating().color() }
                }]
            })
        })
        .collect();

    json!({
        "updateCells": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": 1,
                "endRowIndex": 1 + cells.len(),
                "startColumnIndex": plan.index,
                "endColumnIndex": plan.index + 1
            },
            "rows": rows,
            "fields": "userEnteredFormat.backgroundColor"
        }
    })
}

#[async_trait]
impl ResultSink for SheetsSink {
    async fn list_domains(&self) -> Result<Vec<String>, SinkError> {
        let tabs = self.client.sheet_tabs().await.map_err(|e| {
            error!("读取标签页失败: {}", e);
            SinkError::unavailable(e)
        })?;
        Ok(tabs.into_iter().map(|t| t.title).collect())
    }

    async fn write_result(
        &self,
        domain: &str,
        metrics: &MetricPair,
        date: &str,
    ) -> Result<(), SinkError> {
        let lock = self.tab_lock(domain);
        let _guard = lock.lock().await;
        self.write_locked(domain, metrics, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricSet;

    #[test]
    fn color_request_targets_the_date_column() {
        let set = MetricSet {
            performance: 95,
            first_contentful_paint: 2.5,
            speed_index: 7.0,
        };
        let cells = layout::metric_cells(&MetricPair {
            mobile: set,
            desktop: set,
        });
        let request = color_request(42, ColumnPlan { index: 3, append: false }, &cells);

        let range = &request["updateCells"]["range"];
        assert_eq!(range["sheetId"], 42);
        assert_eq!(range["startRowIndex"], 1);
        assert_eq!(range["endRowIndex"], 7);
        assert_eq!(range["startColumnIndex"], 3);
        assert_eq!(range["endColumnIndex"], 4);

        let rows = request["updateCells"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 6);
        let color = |row: usize| rows[row]["values"][0]["userEnteredFormat"]["backgroundColor"].clone();
        assert_eq!(color(0), json!({"red": 0.8, "green": 0.9, "blue": 0.8}));
        assert_eq!(color(1), json!({"red": 0.9, "green": 0.9, "blue": 0.8}));
        assert_eq!(color(2), json!({"red": 0.9, "green": 0.8, "blue": 0.8}));
    }

    #[test]
    fn tab_locks_are_shared_per_domain() {
        let sink = SheetsSink::new(SheetsClient::new(&crate::config::Config::default()).unwrap());
        let a1 = sink.tab_lock("a.com");
        let a2 = sink.tab_lock("a.com");
        let b = sink.tab_lock("b.com");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
