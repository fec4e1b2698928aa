//! 重载流水线
//!
//! 读取 → 合并到聚合存储 → 解码到绑定目标 → 调用变更回调。
//! 初始加载和每次文件变更都执行同一条流水线，任何一步失败只中止本次执行的后续步骤。

use crate::config::accessor::ConfigReader;
use crate::config::descriptor::SourceDescriptor;
use crate::config::store::SourceStore;
use crate::error::{ConfigError, Result, SourceError};
use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::debug;

/// 执行一次完整的重载
///
/// 解码失败时聚合存储已经是新值，而绑定目标保留上一次成功解码的结果。
pub(crate) fn reload(aggregate: &SourceStore, descriptor: &SourceDescriptor) -> Result<()> {
    let name = descriptor.logical_name();
    let started = Instant::now();

    descriptor
        .store()
        .read_in_config()
        .map_err(|source| ConfigError::Read {
            name: name.to_string(),
            source,
        })?;

    apply(aggregate, descriptor)?;

    debug!(
        "配置 [{}] 重载完成，耗时 {}ms",
        name,
        started.elapsed().as_millis()
    );
    Ok(())
}

/// 读取之后的三个步骤：合并、解码、回调
pub(crate) fn apply(aggregate: &SourceStore, descriptor: &SourceDescriptor) -> Result<()> {
    let name = descriptor.logical_name();
    let store = descriptor.store();

    aggregate.set(name, Value::Object(store.all_settings()));

    if let Some(binding) = descriptor.binding() {
        catch_unwind(AssertUnwindSafe(|| binding.target.decode_from(store, &binding.tag_name)))
            .unwrap_or_else(|panic| {
                Err(SourceError::Decode {
                    tag: binding.tag_name.clone(),
                    message: panic_message(panic),
                })
            })
            .map_err(|source| ConfigError::Decode {
                name: name.to_string(),
                source,
            })?;
    }

    if let Some(listener) = descriptor.listener() {
        catch_unwind(AssertUnwindSafe(|| listener(store)))
            .unwrap_or_else(|panic| Err(anyhow::anyhow!("回调发生 panic: {}", panic_message(panic))))
            .map_err(|source| ConfigError::Listener {
                name: name.to_string(),
                source,
            })?;
    }

    Ok(())
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
