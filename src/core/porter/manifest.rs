use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::result::{CoreError, CoreResult};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEFAULT_ATTRIBUTION: &str = "Ported by Pepe's Pack Porter.";

pub const FORMAT_VERSION: u32 = 2;
pub const PACK_VERSION: [u32; 3] = [1, 0, 0];
pub const MIN_ENGINE_VERSION: [u32; 3] = [1, 16, 0];
pub const RESOURCES_MODULE: &str = "resources";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub description: String,
    pub uuid: String,
    pub version: [u32; 3],
    pub min_engine_version: [u32; 3],
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Module {
    #[serde(rename = "type")]
    pub module_type: String,
    pub uuid: String,
    pub version: [u32; 3],
}

/// Bedrock 资源包 manifest.json
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub format_version: u32,
    pub header: Header,
    pub modules: Vec<Module>,
}

impl Manifest {
    /// 与 `JSON.stringify(manifest, null, 4)` 相同的 4 空格缩进
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf)
            .map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// UUID 来源，测试时可替换为确定性的实现
pub trait IdSource: Send {
    fn next_uuid(&mut self) -> Uuid;
}

/// 进程级随机源（v4）
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_uuid(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// 用给定的 16 字节种子依次生成 v4 UUID（版本/变体位由 Builder 修正）
#[derive(Debug, Clone)]
pub struct SequenceIds {
    seeds: Vec<[u8; 16]>,
    pos: usize,
}

impl SequenceIds {
    pub fn new(seeds: Vec<[u8; 16]>) -> Self {
        Self { seeds, pos: 0 }
    }
}

impl IdSource for SequenceIds {
    fn next_uuid(&mut self) -> Uuid {
        let bytes = if self.seeds.is_empty() {
            [0u8; 16]
        } else {
            self.seeds[self.pos % self.seeds.len()]
        };
        self.pos += 1;
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// 从 pack.mcmeta 文本中取出 pack.description
///
/// description 可以是字符串，也可以是文本组件（对象或数组），组件会被拍平为纯文本。
pub fn parse_description(text: &str) -> CoreResult<String> {
    let clean = strip_json_comments(strip_bom(text));
    let meta: Value = serde_json::from_str(&clean)
        .map_err(|e| CoreError::ManifestParse(format!("not valid JSON: {}", e)))?;

    let pack = meta
        .get("pack")
        .ok_or_else(|| CoreError::ManifestParse("missing \"pack\" object".into()))?;
    let description = pack
        .get("description")
        .ok_or_else(|| CoreError::ManifestParse("missing \"pack.description\"".into()))?;

    Ok(flatten_text_component(description))
}

fn flatten_text_component(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts.iter().map(flatten_text_component).collect(),
        Value::Object(obj) => {
            let mut out = obj
                .get("text")
                .or_else(|| obj.get("translate"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if let Some(Value::Array(extra)) = obj.get("extra") {
                for part in extra {
                    out.push_str(&flatten_text_component(part));
                }
            }
            out
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
    }
}

/// 生成 manifest；description 末尾追加署名行
pub fn build(
    pack_name: &str,
    description: &str,
    attribution: &str,
    ids: &mut dyn IdSource,
) -> Manifest {
    let header_id = ids.next_uuid();
    let mut module_id = ids.next_uuid();
    // 两个 id 必须不同
    while module_id == header_id {
        module_id = Uuid::new_v4();
    }

    Manifest {
        format_version: FORMAT_VERSION,
        header: Header {
            name: pack_name.to_string(),
            description: format!("{}\n{}", description, attribution),
            uuid: header_id.hyphenated().to_string(),
            version: PACK_VERSION,
            min_engine_version: MIN_ENGINE_VERSION,
        },
        modules: vec![Module {
            module_type: RESOURCES_MODULE.to_string(),
            uuid: module_id.hyphenated().to_string(),
            version: PACK_VERSION,
        }],
    }
}

/// 去除 UTF-8 BOM
fn strip_bom(s: &str) -> &str {
    const BOM: &str = "\u{feff}";
    s.strip_prefix(BOM).unwrap_or(s)
}

fn strip_json_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
                output.push(c);
            }
            continue;
        }
        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }
        if in_string {
            output.push(c);
            if c == '\\' {
                if let Some(n) = chars.next() {
                    output.push(n);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            output.push(c);
            continue;
        }
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    chars.next();
                    in_line_comment = true;
                    continue;
                }
                Some('*') => {
                    chars.next();
                    in_block_comment = true;
                    continue;
                }
                _ => {}
            }
        }
        output.push(c);
    }
    output
}
