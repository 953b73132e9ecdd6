//! JS 执行器 - 基础设施层
//!
//! 持有一个 page 资源，只暴露"设备模拟、导航、执行 JS"的能力

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::models::DeviceProfile;

/// 设备视口（宽、高、像素比）
pub fn viewport(profile: DeviceProfile) -> (i64, i64, f64) {
    match profile {
        DeviceProfile::Mobile => (375, 667, 2.0),
        DeviceProfile::Desktop => (1350, 940, 1.0),
    }
}

/// JS 执行器
///
/// 职责：
/// - 持有一个 Page 资源（每次探测一个）
/// - 暴露 eval() 能力
/// - 不认识域名结果 / 任务
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 按设备模式设置视口
    pub async fn emulate(&self, profile: DeviceProfile) -> Result<()> {
        let (width, height, scale) = viewport(profile);
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                width,
                height,
                scale,
                profile == DeviceProfile::Mobile,
            ))
            .await?;
        Ok(())
    }

    /// 导航并等待页面加载
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 关闭页面，释放资源
    pub async fn close(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}
