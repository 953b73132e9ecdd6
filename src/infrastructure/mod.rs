//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（浏览器页面），只暴露能力

pub mod js_executor;

pub use js_executor::JsExecutor;
