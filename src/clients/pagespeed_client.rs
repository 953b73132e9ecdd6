/// PageSpeed Insights API 客户端
///
/// 只负责发请求和反序列化，指标换算在 `services::probe::pagespeed` 中完成
use crate::config::Config;
use crate::error::ProbeError;
use crate::models::DeviceProfile;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// `runPagespeed` 响应中用到的部分
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedResponse {
    pub lighthouse_result: Option<LighthouseResult>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LighthouseResult {
    #[serde(default)]
    pub categories: HashMap<String, Category>,
    #[serde(default)]
    pub audits: HashMap<String, Audit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Category {
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub numeric_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
}

/// PageSpeed 客户端
#[derive(Clone)]
pub struct PageSpeedClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PageSpeedClient {
    /// 创建新的 PageSpeed 客户端
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.pagespeed_request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.pagespeed_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.pagespeed_api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// 请求一次 PageSpeed 分析
    ///
    /// # 参数
    /// - `domain`: 域名（不带协议）
    /// - `profile`: 设备模式
    pub async fn run_pagespeed(
        &self,
        domain: &str,
        profile: DeviceProfile,
    ) -> Result<PageSpeedResponse, ProbeError> {
        let endpoint = format!("{}/runPagespeed", self.base_url);
        let target = format!("https://{}", domain);
        debug!("请求 PageSpeed: {} ({})", target, profile);

        let mut query = vec![
            ("url", target.as_str()),
            ("strategy", profile.as_str()),
            ("category", "performance"),
        ];
        if let Some(key) = self.api_key.as_deref() {
            query.push(("key", key));
        }

        let response = self
            .http
            .get(&endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProbeError::request_failed(domain, profile, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::request_failed(domain, profile, e))?;

        let parsed: PageSpeedResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ProbeError::HttpStatus {
                    domain: domain.to_string(),
                    profile,
                    status: status.as_u16(),
                });
            }
            Err(_) => return Err(ProbeError::malformed(domain, profile, "response body")),
        };

        if let Some(api_error) = parsed.error.as_ref() {
            return Err(ProbeError::Api {
                domain: domain.to_string(),
                profile,
                code: api_error.code.or(Some(status.as_u16())),
                message: api_error
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        if !status.is_success() {
            return Err(ProbeError::HttpStatus {
                domain: domain.to_string(),
                profile,
                status: status.as_u16(),
            });
        }

        Ok(parsed)
    }
}
