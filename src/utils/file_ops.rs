use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::porter::port::PackSaver;
use crate::result::CoreResult;

pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn porter_dir() -> PathBuf {
    exe_dir().join("PackPorter")
}

pub fn porter_subdir<P: AsRef<Path>>(rel: P) -> PathBuf {
    porter_dir().join(rel)
}

pub fn create_initial_directories() {
    let dirs = [porter_dir(), porter_subdir("logs"), porter_subdir("config")];

    for dir in dirs {
        if let Err(e) = fs::create_dir_all(&dir) {
            eprintln!("Failed to create directory '{}': {}", dir.display(), e);
        }
    }
}

/// 把转换结果写入指定目录
#[derive(Debug, Clone)]
pub struct DirSaver {
    dir: PathBuf,
}

impl DirSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn target_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl PackSaver for DirSaver {
    async fn save(&self, file_name: &str, data: &[u8]) -> CoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.target_path(file_name);
        debug!("写入输出文件：{}，大小：{} bytes", path.display(), data.len());
        tokio::fs::write(&path, data).await?;
        info!("已保存：{}", path.display());
        Ok(())
    }
}
