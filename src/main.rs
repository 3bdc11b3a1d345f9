use std::process;

use clap::Parser;
use tracing::{debug, error, info};

use app_lib::commands::convert::{exit_code, run_convert, Cli};
use app_lib::config::config::{get_default_config, read_config, read_config_from, Config};
use app_lib::utils::app_info;
use app_lib::utils::file_ops::create_initial_directories;
use app_lib::utils::logger::init_logging;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    // 创建初始目录（同步）
    create_initial_directories();

    // 读取配置文件；失败时使用默认配置继续
    let config_result = match &cli.config {
        Some(path) => read_config_from(path),
        None => read_config(),
    };
    let (config, config_err): (Config, _) = match config_result {
        Ok(c) => (c, None),
        Err(e) => (get_default_config(), Some(e)),
    };

    init_logging(cli.debug || config.launcher.debug);

    if let Some(e) = config_err {
        error!("读取配置失败，使用默认配置: {:?}", e);
    }

    info!(
        "Pack Porter v{} ({}) | License: {}",
        app_info::get_version(),
        app_info::get_git_commit(),
        app_info::get_license()
    );
    debug!("{}", app_info::get_build_info());

    match run_convert(&cli, &config).await {
        Ok(path) => {
            info!("已保存：{}", path.display());
            process::exit(0);
        }
        Err(e) => {
            error!("转换失败: {:#}", e);
            process::exit(exit_code(&e));
        }
    }
}
