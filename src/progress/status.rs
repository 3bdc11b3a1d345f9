use tracing::{error, info};

use crate::core::porter::port::StatusSink;

/// 状态文本直接写日志（控制台层会显示给用户）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn status(&self, message: &str) {
        info!(target: "pack_porter::status", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "pack_porter::status", "{}", message);
    }
}
