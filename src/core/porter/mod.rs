//! Java 材质包 -> Bedrock 资源包
//!
//! 模块结构:
//! - `rules`: 条目分类与重命名规则（目录改名 + 文件名映射表）。
//! - `manifest`: 读取 pack.mcmeta 描述并生成 manifest.json。
//! - `convert`: 单个压缩包的转换流程。
//! - `port`: 对外入口，负责状态文本与保存结果。

pub mod convert;
pub mod manifest;
pub mod port;
pub mod rules;
