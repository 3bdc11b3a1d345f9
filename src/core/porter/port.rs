use std::future::Future;

use tracing::{error, info};

use crate::core::porter::convert::{convert, ConvertOptions, ConvertedPack};
use crate::core::porter::manifest::RandomIds;
use crate::result::CoreResult;

/// 面向用户的状态文本输出（界面提示、控制台等）
pub trait StatusSink: Send + Sync {
    fn status(&self, message: &str);

    fn error(&self, message: &str) {
        self.status(message);
    }
}

/// 保存转换结果（相当于触发下载）
pub trait PackSaver: Send + Sync {
    fn save(&self, file_name: &str, data: &[u8]) -> impl Future<Output = CoreResult<()>> + Send;
}

/// 一次完整的转换：转换 -> 保存 -> 报告状态
pub struct PackPorter<S, P> {
    options: ConvertOptions,
    status: S,
    saver: P,
}

impl<S: StatusSink, P: PackSaver> PackPorter<S, P> {
    pub fn new(options: ConvertOptions, status: S, saver: P) -> Self {
        Self {
            options,
            status,
            saver,
        }
    }

    pub fn saver(&self) -> &P {
        &self.saver
    }

    /// 失败时不会保存任何输出
    pub async fn port(&self, bytes: Vec<u8>, file_name: &str) -> CoreResult<ConvertedPack> {
        self.status.status(&format!("Selected file: {}", file_name));

        let mut ids = RandomIds;
        let converted = match convert(bytes, file_name, &self.options, &mut ids, &self.status).await
        {
            Ok(c) => c,
            Err(e) => {
                error!("转换失败：{}，文件：{}", e, file_name);
                self.status.error(&e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = self.saver.save(&converted.file_name, &converted.bytes).await {
            error!("保存失败：{}，文件：{}", e, converted.file_name);
            self.status.error(&format!("Failed to save {}: {}", converted.file_name, e));
            return Err(e);
        }

        let secs = converted.report.elapsed.as_secs_f64();
        if converted.report.textures == 0 {
            self.status.status(&format!(
                "Conversion complete, but no textures were converted. Time taken: {:.2} seconds.",
                secs
            ));
        } else {
            self.status.status(&format!(
                "Conversion complete! Your download should start shortly. Time taken: {:.2} seconds.",
                secs
            ));
        }
        info!(
            "转换完成：{} -> {}，材质 {} 个，耗时 {:.2} 秒",
            file_name, converted.file_name, converted.report.textures, secs
        );
        Ok(converted)
    }
}
