use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use crate::config::config::Config;
use crate::core::porter::convert::ConvertOptions;
use crate::core::porter::port::PackPorter;
use crate::core::porter::rules::{RuleSet, RuleSetKind};
use crate::progress::status::LogStatus;
use crate::result::{CoreError, CoreResult};
use crate::utils::file_ops::DirSaver;

/// Convert a Java Edition resource pack (.zip) into a Bedrock resource pack.
#[derive(Parser, Debug, Clone)]
#[command(name = "pack-porter", version, about)]
pub struct Cli {
    /// Java 材质包（.zip）
    pub input: PathBuf,

    /// 输出目录，默认取配置或输入文件所在目录
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 使用早期规则（排除 entity，不查映射表）
    #[arg(long)]
    pub legacy: bool,

    /// assets/<namespace>/textures 中的命名空间
    #[arg(long)]
    pub namespace: Option<String>,

    /// 输出 debug 日志
    #[arg(long)]
    pub debug: bool,

    /// 指定配置文件路径
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// 命令行参数覆盖配置文件
pub fn resolve_options(cli: &Cli, config: &Config) -> CoreResult<ConvertOptions> {
    let mut options = config.convert_options()?;
    if cli.legacy || cli.namespace.is_some() {
        let kind = if cli.legacy {
            RuleSetKind::Legacy
        } else {
            options.rules.kind()
        };
        let namespace = cli
            .namespace
            .clone()
            .unwrap_or_else(|| options.rules.namespace().to_string());
        options.rules = RuleSet::from_kind(kind).with_namespace(&namespace)?;
    }
    Ok(options)
}

pub fn resolve_output_dir(cli: &Cli, config: &Config) -> PathBuf {
    if let Some(dir) = &cli.output_dir {
        return dir.clone();
    }
    if !config.porter.output_dir.trim().is_empty() {
        return PathBuf::from(config.porter.output_dir.trim());
    }
    cli.input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 输入包本身有问题时退出码为 2，其余失败为 1
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CoreError>() {
        Some(e) if e.is_input_error() => 2,
        _ => 1,
    }
}

/// 读取输入 -> 转换 -> 写入输出目录，返回输出文件路径
pub async fn run_convert(cli: &Cli, config: &Config) -> Result<PathBuf> {
    let options = resolve_options(cli, config).context("invalid conversion options")?;
    let out_dir = resolve_output_dir(cli, config);
    debug!(
        "转换参数：input={}, out_dir={}, rule_set={}, namespace={}",
        cli.input.display(),
        out_dir.display(),
        options.rules.kind(),
        options.rules.namespace()
    );

    let file_name = cli
        .input
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .context("input path has no file name")?;
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    info!("已读取输入文件：{}（{} bytes）", cli.input.display(), bytes.len());

    let saver = DirSaver::new(out_dir);
    let porter = PackPorter::new(options, LogStatus, saver);
    let converted = porter.port(bytes, &file_name).await?;

    Ok(porter.saver().target_path(&converted.file_name))
}
