//! 消息模板模块
//!
//! 基于 Handlebars 渲染失败通知的文本内容

use crate::error::{ConfigError, NotificationError};
use handlebars::Handlebars;
use serde::Serialize;

/// 默认的失败通知模板
pub const DEFAULT_TEMPLATE: &str = "Config {{config_name}} reload failed: {{error}}";

const TEMPLATE_NAME: &str = "message";

/// 模板上下文数据
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// 出错配置的逻辑名称
    pub config_name: String,
    /// 错误信息
    pub error: String,
    /// 时间戳
    pub timestamp: String,
}

impl TemplateContext {
    pub fn new(config_name: &str, err: &ConfigError) -> Self {
        Self {
            config_name: config_name.to_string(),
            error: err.to_string(),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// 消息模板
pub struct MessageTemplate {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for MessageTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageTemplate").finish_non_exhaustive()
    }
}

impl MessageTemplate {
    /// 编译模板
    ///
    /// # 参数
    /// * `template` - Handlebars 模板字符串，可用变量为 `config_name`、`error`、`timestamp`
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 语法错误时返回 `TemplateError`
    pub fn new(template: &str) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        // 消息是纯文本，不做 HTML 转义
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))?;
        Ok(Self { registry })
    }

    /// 使用默认模板
    pub fn default_template() -> Result<Self, NotificationError> {
        Self::new(DEFAULT_TEMPLATE)
    }

    /// 渲染模板
    pub fn render(&self, context: &TemplateContext) -> Result<String, NotificationError> {
        self.registry
            .render(TEMPLATE_NAME, context)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }
}
