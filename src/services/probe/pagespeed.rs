//! PageSpeed Insights 探测

use super::MetricProbe;
use crate::clients::pagespeed_client::{PageSpeedClient, PageSpeedResponse};
use crate::error::ProbeError;
use crate::models::{DeviceProfile, MetricSet};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PERFORMANCE_CATEGORY: &str = "performance";
const FCP_AUDIT: &str = "first-contentful-paint";
const SPEED_INDEX_AUDIT: &str = "speed-index";

/// 基于 PageSpeed API 的探测
pub struct PageSpeedProbe {
    client: PageSpeedClient,
}

impl PageSpeedProbe {
    pub fn new(client: PageSpeedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricProbe for PageSpeedProbe {
    fn name(&self) -> &str {
        "pagespeed"
    }

    async fn probe(
        &self,
        domain: &str,
        profile: DeviceProfile,
        cancel: &CancellationToken,
    ) -> Result<MetricSet, ProbeError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ProbeError::Cancelled {
                    domain: domain.to_string(),
                    profile,
                });
            }
            response = self.client.run_pagespeed(domain, profile) => response?,
        };

        let metrics = metrics_from_response(domain, profile, &response)?;
        debug!(
            "[域名 {}] {} 指标: 性能 {} | FCP {}s | SI {}s",
            domain, profile, metrics.performance, metrics.first_contentful_paint, metrics.speed_index
        );
        Ok(metrics)
    }
}

/// 从 PageSpeed 响应中提取三项指标
///
/// 缺少性能分类或任一 audit 都视为响应格式错误。
pub fn metrics_from_response(
    domain: &str,
    profile: DeviceProfile,
    response: &PageSpeedResponse,
) -> Result<MetricSet, ProbeError> {
    let lighthouse = response
        .lighthouse_result
        .as_ref()
        .ok_or_else(|| ProbeError::malformed(domain, profile, "lighthouseResult"))?;

    let score = lighthouse
        .categories
        .get(PERFORMANCE_CATEGORY)
        .and_then(|c| c.score)
        .ok_or_else(|| ProbeError::malformed(domain, profile, "categories.performance.score"))?;

    let audit_value = |name: &str| {
        lighthouse
            .audits
            .get(name)
            .and_then(|a| a.numeric_value)
            .ok_or_else(|| ProbeError::malformed(domain, profile, name))
    };
    let fcp_ms = audit_value(FCP_AUDIT)?;
    let speed_index_ms = audit_value(SPEED_INDEX_AUDIT)?;

    MetricSet::from_raw(score, fcp_ms, speed_index_ms)
        .ok_or_else(|| ProbeError::malformed(domain, profile, "metric values"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> PageSpeedResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn extracts_and_rounds_metrics() {
        let response = parse(
            r#"{"lighthouseResult":{
                "categories":{"performance":{"score":0.87}},
                "audits":{
                    "first-contentful-paint":{"numericValue":1812.4},
                    "speed-index":{"numericValue":3456.7}
                }}}"#,
        );

        let metrics = metrics_from_response("a.com", DeviceProfile::Mobile, &response).unwrap();
        assert_eq!(
            metrics,
            MetricSet {
                performance: 87,
                first_contentful_paint: 1.81,
                speed_index: 3.46,
            }
        );
    }

    #[test]
    fn missing_performance_category_is_malformed() {
        let response = parse(
            r#"{"lighthouseResult":{"categories":{},
                "audits":{"first-contentful-paint":{"numericValue":1.0},"speed-index":{"numericValue":1.0}}}}"#,
        );
        let err = metrics_from_response("a.com", DeviceProfile::Desktop, &response).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { ref field, .. } if field == "categories.performance.score"));
    }

    #[test]
    fn null_score_is_malformed() {
        let response = parse(
            r#"{"lighthouseResult":{"categories":{"performance":{"score":null}},
                "audits":{"first-contentful-paint":{"numericValue":1.0},"speed-index":{"numericValue":1.0}}}}"#,
        );
        assert!(metrics_from_response("a.com", DeviceProfile::Mobile, &response).is_err());
    }

    #[test]
    fn missing_audit_is_malformed() {
        let response = parse(
            r#"{"lighthouseResult":{"categories":{"performance":{"score":0.5}},
                "audits":{"first-contentful-paint":{"numericValue":900.0}}}}"#,
        );
        let err = metrics_from_response("a.com", DeviceProfile::Mobile, &response).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { ref field, .. } if field == "speed-index"));
    }

    #[test]
    fn missing_lighthouse_result_is_malformed() {
        let err = metrics_from_response("a.com", DeviceProfile::Mobile, &parse("{}")).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { ref field, .. } if field == "lighthouseResult"));
    }
}
