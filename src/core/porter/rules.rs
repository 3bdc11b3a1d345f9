use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{CoreError, CoreResult};

pub const DEFAULT_NAMESPACE: &str = "minecraft";
pub const PACK_ICON_SOURCE: &str = "pack.png";
pub const PACK_ICON_TARGET: &str = "pack_icon.png";
pub const PACK_META_FILE: &str = "pack.mcmeta";
pub const TEXTURE_ROOT: &str = "textures/";

// Java 资源命名空间只允许小写字母、数字和 _ . -
static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_.\-]+$").expect("namespace regex"));

/// 单个条目的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// 包图标，固定重命名为 pack_icon.png
    Icon(String),
    /// pack.mcmeta，不复制，交给 manifest 生成
    Metadata,
    /// 材质文件，按新路径复制
    Keep(String),
    Drop,
}

/// 规则集预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetKind {
    /// 查表版：entity 参与转换，带完整文件名映射表
    #[default]
    Table,
    /// 早期版本：排除 entity，只处理盔甲层
    Legacy,
}

impl fmt::Display for RuleSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSetKind::Table => write!(f, "table"),
            RuleSetKind::Legacy => write!(f, "legacy"),
        }
    }
}

/// 文件名匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch {
    /// 文件名内任意位置
    Contains,
    /// 文件名开头
    Prefix,
    /// 整个主名（第一个 '.' 之前）
    Stem,
}

/// 文件名替换规则：scope 限定所在目录（目标路径），pattern 只在文件名内匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    pub scope: Option<String>,
    pub pattern: String,
    pub replacement: String,
    pub matching: RuleMatch,
}

impl RenameRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            scope: None,
            pattern: pattern.into(),
            replacement: replacement.into(),
            matching: RuleMatch::Contains,
        }
    }

    pub fn scoped(
        scope: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            scope: Some(scope.into()),
            ..Self::new(pattern, replacement)
        }
    }

    pub fn matching(mut self, matching: RuleMatch) -> Self {
        self.matching = matching;
        self
    }

    fn matches(&self, dir: &str, file_name: &str) -> bool {
        let in_scope = self.scope.as_deref().map_or(true, |s| dir.contains(s));
        in_scope
            && match self.matching {
                RuleMatch::Contains => file_name.contains(self.pattern.as_str()),
                RuleMatch::Prefix => file_name.starts_with(self.pattern.as_str()),
                RuleMatch::Stem => file_stem(file_name) == self.pattern,
            }
    }
}

const ARMOR_DIR: &str = "textures/models/armor/";
const BLOCKS_DIR: &str = "textures/blocks/";
const ITEMS_DIR: &str = "textures/items/";

// 盔甲层：皮革两层有固定名字，其余 xxx_layer_N -> xxx_N
const ARMOR_RULES: &[(&str, &str)] = &[
    ("leather_layer_1.png", "cloth_1.png"),
    ("leather_layer_2.png", "cloth_2.png"),
    ("_layer_", "_"),
];

// 按整个主名匹配，Java 名 -> Bedrock 名
const BLOCK_RULES: &[(&str, &str)] = &[
    ("oak_planks", "planks_oak"),
    ("spruce_planks", "planks_spruce"),
    ("birch_planks", "planks_birch"),
    ("jungle_planks", "planks_jungle"),
    ("acacia_planks", "planks_acacia"),
    ("dark_oak_planks", "planks_big_oak"),
    ("oak_log", "log_oak"),
    ("oak_log_top", "log_oak_top"),
    ("spruce_log", "log_spruce"),
    ("spruce_log_top", "log_spruce_top"),
    ("birch_log", "log_birch"),
    ("birch_log_top", "log_birch_top"),
    ("dark_oak_log", "log_big_oak"),
    ("dark_oak_log_top", "log_big_oak_top"),
    ("stone_bricks", "stonebrick"),
    ("mossy_stone_bricks", "stonebrick_mossy"),
    ("cracked_stone_bricks", "stonebrick_cracked"),
    ("chiseled_stone_bricks", "stonebrick_carved"),
    ("end_stone_bricks", "end_bricks"),
    ("bricks", "brick"),
    ("nether_bricks", "nether_brick"),
    ("red_nether_bricks", "red_nether_brick"),
    ("grass_block_top", "grass_top"),
    ("white_wool", "wool_colored_white"),
];

const ITEM_RULES: &[(&str, &str)] = &[
    ("golden_apple", "apple_golden"),
    ("golden_carrot", "carrot_golden"),
    ("cooked_beef", "beef_cooked"),
    ("beef", "beef_raw"),
];

// 工具、盔甲等：只替换开头的材质前缀
const ITEM_PREFIX_RULES: &[(&str, &str)] = &[("golden_", "gold_"), ("wooden_", "wood_")];

fn armor_rules() -> Vec<RenameRule> {
    ARMOR_RULES
        .iter()
        .map(|(p, r)| RenameRule::scoped(ARMOR_DIR, *p, *r))
        .collect()
}

fn table_rules() -> Vec<RenameRule> {
    let mut rules = armor_rules();
    let stem = |dir: &str, (p, r): &(&str, &str)| {
        RenameRule::scoped(dir, *p, *r).matching(RuleMatch::Stem)
    };
    rules.extend(BLOCK_RULES.iter().map(|rule| stem(BLOCKS_DIR, rule)));
    rules.extend(ITEM_RULES.iter().map(|rule| stem(ITEMS_DIR, rule)));
    rules.extend(
        ITEM_PREFIX_RULES
            .iter()
            .map(|(p, r)| RenameRule::scoped(ITEMS_DIR, *p, *r).matching(RuleMatch::Prefix)),
    );
    rules
}

/// Java -> Bedrock 路径重命名规则
///
/// 判定顺序：排除目录 -> pack.png -> pack.mcmeta -> textures 子树改名 -> 其余丢弃。
#[derive(Debug, Clone)]
pub struct RuleSet {
    kind: RuleSetKind,
    namespace: String,
    marker: String,
    excluded: Vec<String>,
    dir_renames: Vec<(String, String)>,
    substitutions: Vec<RenameRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::table()
    }
}

impl RuleSet {
    fn preset(kind: RuleSetKind, excluded: &[&str], substitutions: Vec<RenameRule>) -> Self {
        let mut set = Self {
            kind,
            namespace: DEFAULT_NAMESPACE.to_string(),
            marker: String::new(),
            excluded: excluded.iter().map(|d| d.to_string()).collect(),
            dir_renames: vec![
                ("/block/".to_string(), "/blocks/".to_string()),
                ("/item/".to_string(), "/items/".to_string()),
            ],
            substitutions,
        };
        set.marker = texture_marker(&set.namespace);
        set
    }

    pub fn table() -> Self {
        Self::preset(RuleSetKind::Table, &["gui", "font"], table_rules())
    }

    pub fn legacy() -> Self {
        Self::preset(RuleSetKind::Legacy, &["entity", "gui", "font"], armor_rules())
    }

    pub fn from_kind(kind: RuleSetKind) -> Self {
        match kind {
            RuleSetKind::Table => Self::table(),
            RuleSetKind::Legacy => Self::legacy(),
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> CoreResult<Self> {
        if !NAMESPACE_RE.is_match(namespace) {
            return Err(CoreError::Config(format!("invalid namespace: {:?}", namespace)));
        }
        self.namespace = namespace.to_string();
        self.marker = texture_marker(namespace);
        Ok(self)
    }

    /// 替换整张文件名映射表
    pub fn with_substitutions(mut self, rules: Vec<RenameRule>) -> Self {
        self.substitutions = rules;
        self
    }

    pub fn kind(&self) -> RuleSetKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `assets/<ns>/textures/`
    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn is_under_textures(&self, path: &str) -> bool {
        path.contains(self.marker.as_str())
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.excluded
            .iter()
            .any(|dir| path.contains(&format!("{}{}/", self.marker, dir)))
    }

    pub fn classify(&self, path: &str) -> Classification {
        if path.is_empty() || path.ends_with('/') {
            return Classification::Drop;
        }
        if self.is_excluded(path) {
            return Classification::Drop;
        }

        let (_, file_name) = split_file_name(path);
        if file_name == PACK_ICON_SOURCE {
            return Classification::Icon(PACK_ICON_TARGET.to_string());
        }
        if file_name == PACK_META_FILE {
            return Classification::Metadata;
        }

        match self.texture_destination(path) {
            Some(dest) => Classification::Keep(dest),
            None => Classification::Drop,
        }
    }

    fn texture_destination(&self, path: &str) -> Option<String> {
        // 截到最后一个 assets/<ns>/textures/ 为止
        let idx = path.rfind(self.marker.as_str())?;
        let rest = &path[idx + self.marker.len()..];
        if rest.is_empty() {
            return None;
        }

        let renamed = self.rename_dirs(&format!("{}{}", TEXTURE_ROOT, rest));
        let (dir, file_name) = split_file_name(&renamed);
        let file_name = self.substitute(dir, file_name);
        Some(format!("{}{}", dir, file_name))
    }

    /// 目录段改名，每条只替换第一次出现
    pub fn rename_dirs(&self, path: &str) -> String {
        self.dir_renames
            .iter()
            .fold(path.to_string(), |acc, (from, to)| acc.replacen(from.as_str(), to, 1))
    }

    /// 按声明顺序查表，首个命中的规则生效
    pub fn substitute(&self, dir: &str, file_name: &str) -> String {
        self.substitutions
            .iter()
            .find(|rule| rule.matches(dir, file_name))
            .map(|rule| file_name.replacen(rule.pattern.as_str(), &rule.replacement, 1))
            .unwrap_or_else(|| file_name.to_string())
    }
}

fn texture_marker(namespace: &str) -> String {
    format!("assets/{}/textures/", namespace)
}

/// 第一个 '.' 之前的部分（`a.png.mcmeta` -> `a`）
fn file_stem(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// 拆成 (目录含末尾 '/', 文件名)
fn split_file_name(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    }
}
