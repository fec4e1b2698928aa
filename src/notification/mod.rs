//! 通知模块
//!
//! 提供重载失败通知trait、飞书机器人实现和消息模板功能

pub mod feishu;
pub mod sender;
pub mod template;

// 重新导出主要类型
pub use feishu::{FeishuBotHook, PayloadBuilder};
pub use sender::{notify_all, NoOpNotification, Notification};
pub use template::{MessageTemplate, TemplateContext, DEFAULT_TEMPLATE};
