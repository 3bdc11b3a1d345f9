use std::time::{Duration, Instant};

use tokio::task;
use tracing::{debug, info, warn};

use crate::archive::zip::{finish_archive, has_zip_signature, load_archive, DestArchive, SourceArchive};
use crate::core::porter::manifest::{self, IdSource, Manifest, DEFAULT_ATTRIBUTION, MANIFEST_FILE};
use crate::core::porter::port::StatusSink;
use crate::core::porter::rules::{Classification, RuleSet};
use crate::result::{CoreError, CoreResult};

pub const DEFAULT_OUTPUT_SUFFIX: &str = " [Converted]";
const ZIP_EXT: &str = ".zip";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub rules: RuleSet,
    /// 追加在描述末尾的署名行
    pub attribution: String,
    pub output_suffix: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub entries: usize,
    pub textures: usize,
    pub icon: bool,
    pub metadata: bool,
    pub dropped: usize,
    pub duplicates: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct ConvertedPack {
    pub pack_name: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub manifest: Manifest,
    pub report: ConversionReport,
}

/// 校验文件名与 zip 签名，返回去掉 .zip 的包名
pub fn check_input(bytes: &[u8], file_name: &str) -> CoreResult<String> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    let has_ext = base.len() > ZIP_EXT.len()
        && base.is_char_boundary(base.len() - ZIP_EXT.len())
        && base[base.len() - ZIP_EXT.len()..].eq_ignore_ascii_case(ZIP_EXT);
    if !has_ext {
        return Err(CoreError::InvalidFormat(format!(
            "please upload a .zip file (got {})",
            base
        )));
    }
    if !has_zip_signature(bytes) {
        return Err(CoreError::InvalidFormat(format!("{} is not a ZIP archive", base)));
    }

    Ok(base[..base.len() - ZIP_EXT.len()].to_string())
}

pub fn output_file_name(pack_name: &str, suffix: &str) -> String {
    format!("{}{}{}", pack_name, suffix, ZIP_EXT)
}

struct CopyOutcome {
    dest: DestArchive,
    description: Option<String>,
    report: ConversionReport,
}

/// 遍历源包，按规则复制；任一 pack.mcmeta 解析失败直接中止
fn copy_entries(source: &mut SourceArchive, rules: &RuleSet) -> CoreResult<CopyOutcome> {
    let mut dest = DestArchive::new();
    let mut description = None;
    let mut report = ConversionReport {
        entries: source.len(),
        ..Default::default()
    };

    let entries = source.entries().to_vec();
    for entry in entries {
        if entry.is_dir {
            continue;
        }

        match rules.classify(&entry.name) {
            Classification::Icon(target) => {
                let data = source.read_bytes(entry.index)?;
                if dest.add_bytes(&target, data) {
                    report.icon = true;
                    info!("{} 已作为 {} 加入", entry.name, target);
                } else {
                    report.duplicates += 1;
                }
            }
            Classification::Metadata => {
                // 每个 pack.mcmeta 都要解析，后出现的覆盖先前的描述
                let text = source.read_text(entry.index)?;
                let parsed = manifest::parse_description(&text)?;
                if description.replace(parsed).is_some() {
                    debug!("pack.mcmeta 描述被覆盖：{}", entry.name);
                }
                report.metadata = true;
                info!("读取 pack.mcmeta 描述：{}", entry.name);
            }
            Classification::Keep(target) => {
                let data = source.read_bytes(entry.index)?;
                if dest.add_bytes(&target, data) {
                    report.textures += 1;
                    debug!("File converted: {} -> {}", entry.name, target);
                } else {
                    report.duplicates += 1;
                }
            }
            Classification::Drop => {
                report.dropped += 1;
            }
        }
    }

    Ok(CopyOutcome {
        dest,
        description,
        report,
    })
}

fn write_manifest(dest: &mut DestArchive, manifest: &Manifest) -> CoreResult<()> {
    if !dest.add_text(MANIFEST_FILE, &manifest.to_json_pretty()?) {
        return Err(CoreError::Config(format!(
            "{} is already taken by a converted entry",
            MANIFEST_FILE
        )));
    }
    Ok(())
}

/// Java 材质包 -> Bedrock 资源包
///
/// 任何一步失败都会整体中止，不返回部分结果。
pub async fn convert(
    bytes: Vec<u8>,
    file_name: &str,
    options: &ConvertOptions,
    ids: &mut dyn IdSource,
    status: &dyn StatusSink,
) -> CoreResult<ConvertedPack> {
    let pack_name = check_input(&bytes, file_name)?;
    let start = Instant::now();

    let mut source = load_archive(bytes).await?;
    status.status("ZIP file loaded successfully.");
    info!("ZIP 加载完成：{}，条目数：{}", file_name, source.len());

    if source.is_empty() {
        warn!("压缩包没有任何条目：{}", file_name);
    }

    let rules = options.rules.clone();
    if !source.entries().iter().any(|e| rules.is_under_textures(&e.name)) {
        let marker = rules.marker().trim_end_matches('/').to_string();
        warn!("未找到 {} 目录：{}", marker, file_name);
        return Err(CoreError::MissingAssets(marker));
    }

    let outcome = task::spawn_blocking(move || copy_entries(&mut source, &rules)).await??;
    let CopyOutcome {
        mut dest,
        description,
        mut report,
    } = outcome;

    if report.textures == 0 {
        warn!("没有任何材质被转换：{}", file_name);
    }

    let manifest = manifest::build(
        &pack_name,
        description.as_deref().unwrap_or_default(),
        &options.attribution,
        ids,
    );
    write_manifest(&mut dest, &manifest)?;
    info!("manifest.json 已生成");

    let out = finish_archive(dest).await?;
    report.elapsed = start.elapsed();

    Ok(ConvertedPack {
        file_name: output_file_name(&pack_name, &options.output_suffix),
        pack_name,
        bytes: out,
        manifest,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::zip::tests::build_zip;
    use crate::core::porter::manifest::SequenceIds;
    use crate::core::porter::port::tests::MemoryStatus;

    const MCMETA: &[u8] = br#"{"pack": {"pack_format": 15, "description": "Test Pack"}}"#;

    async fn run(bytes: Vec<u8>, name: &str, options: &ConvertOptions) -> CoreResult<ConvertedPack> {
        let mut ids = SequenceIds::new(vec![[1u8; 16], [2u8; 16]]);
        let status = MemoryStatus::default();
        convert(bytes, name, options, &mut ids, &status).await
    }

    async fn open(pack: &ConvertedPack) -> SourceArchive {
        load_archive(pack.bytes.clone()).await.unwrap()
    }

    fn read(src: &mut SourceArchive, name: &str) -> Option<Vec<u8>> {
        let idx = src.entries().iter().find(|e| e.name == name)?.index;
        src.read_bytes(idx).ok()
    }

    #[test]
    fn test_check_input() {
        let zip = build_zip(&[("a", b"a")]);
        assert_eq!(check_input(&zip, "My Pack.zip").unwrap(), "My Pack");
        assert_eq!(check_input(&zip, "C:\\packs\\Faithful.ZIP").unwrap(), "Faithful");
        assert!(matches!(check_input(&zip, "pack.rar"), Err(CoreError::InvalidFormat(_))));
        assert!(matches!(check_input(&zip, ".zip"), Err(CoreError::InvalidFormat(_))));
        assert!(matches!(
            check_input(b"not a zip", "pack.zip"),
            Err(CoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("Test", DEFAULT_OUTPUT_SUFFIX), "Test [Converted].zip");
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let bytes = build_zip(&[
            ("assets/", b""),
            ("assets/minecraft/", b""),
            ("assets/minecraft/textures/block/stone.png", b"\x89PNGstone"),
            ("assets/minecraft/textures/pack.png", b"\x89PNGicon"),
            ("assets/minecraft/pack.mcmeta", MCMETA),
        ]);
        let pack = run(bytes, "Test.zip", &ConvertOptions::default()).await.unwrap();

        assert_eq!(pack.pack_name, "Test");
        assert_eq!(pack.file_name, "Test [Converted].zip");
        assert_eq!(pack.report.textures, 1);
        assert!(pack.report.icon);
        assert!(pack.report.metadata);

        let mut out = open(&pack).await;
        let mut names: Vec<String> = out.entries().iter().map(|e| e.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["manifest.json", "pack_icon.png", "textures/blocks/stone.png"]);

        assert_eq!(read(&mut out, "textures/blocks/stone.png").unwrap(), b"\x89PNGstone");
        assert_eq!(read(&mut out, "pack_icon.png").unwrap(), b"\x89PNGicon");

        let manifest: Manifest =
            serde_json::from_slice(&read(&mut out, "manifest.json").unwrap()).unwrap();
        assert_eq!(manifest.header.name, "Test");
        assert_eq!(manifest.header.description, "Test Pack\nPorted by Pepe's Pack Porter.");
        assert_eq!(manifest, pack.manifest);
        assert_ne!(manifest.header.uuid, manifest.modules[0].uuid);
    }

    #[tokio::test]
    async fn test_missing_assets() {
        let bytes = build_zip(&[
            ("pack.mcmeta", MCMETA),
            ("assets/minecraft/models/block/stone.json", b"{}"),
        ]);
        let err = run(bytes, "x.zip", &ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::MissingAssets(ref m) if m == "assets/minecraft/textures"));
    }

    #[tokio::test]
    async fn test_malformed_mcmeta() {
        let bytes = build_zip(&[
            ("assets/minecraft/textures/block/stone.png", b"s"),
            ("pack.mcmeta", b"{ pack: "),
        ]);
        let err = run(bytes, "x.zip", &ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::ManifestParse(_)));

        let bytes = build_zip(&[
            ("assets/minecraft/textures/block/stone.png", b"s"),
            ("pack.mcmeta", br#"{"pack": {"pack_format": 4}}"#),
        ]);
        let err = run(bytes, "x.zip", &ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::ManifestParse(_)));
    }

    #[tokio::test]
    async fn test_not_a_zip() {
        let err = run(b"GIF89a".to_vec(), "x.zip", &ConvertOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_corrupt_zip_is_load_error() {
        let mut bytes = build_zip(&[("assets/minecraft/textures/block/a.png", b"aaaa")]);
        bytes.truncate(20);
        let err = run(bytes, "x.zip", &ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::Load(_)));
    }

    #[tokio::test]
    async fn test_no_mcmeta_gives_empty_description() {
        let bytes = build_zip(&[("assets/minecraft/textures/item/apple.png", b"a")]);
        let pack = run(bytes, "Apple.zip", &ConvertOptions::default()).await.unwrap();
        assert_eq!(pack.manifest.header.description, "\nPorted by Pepe's Pack Porter.");
        assert!(!pack.report.icon);
        assert!(!pack.report.metadata);
    }

    #[tokio::test]
    async fn test_legacy_drops_entity_table_keeps_it() {
        let bytes = build_zip(&[
            ("assets/minecraft/textures/entity/pig/pig.png", b"p"),
            ("assets/minecraft/textures/gui/icons.png", b"g"),
            ("assets/minecraft/textures/models/armor/leather_layer_1.png", b"l"),
        ]);

        let legacy = ConvertOptions {
            rules: RuleSet::legacy(),
            ..Default::default()
        };
        let pack = run(bytes.clone(), "a.zip", &legacy).await.unwrap();
        let out = open(&pack).await;
        let names: Vec<&str> = out.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["textures/models/armor/cloth_1.png", "manifest.json"]);

        let pack = run(bytes, "a.zip", &ConvertOptions::default()).await.unwrap();
        let out = open(&pack).await;
        let names: Vec<&str> = out.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "textures/entity/pig/pig.png",
                "textures/models/armor/cloth_1.png",
                "manifest.json"
            ]
        );
        assert_eq!(pack.report.dropped, 1);
    }

    #[tokio::test]
    async fn test_duplicate_targets_first_wins() {
        let bytes = build_zip(&[
            ("pack.png", b"root"),
            ("assets/minecraft/textures/pack.png", b"nested"),
            ("assets/minecraft/textures/block/a.png", b"a"),
        ]);
        let pack = run(bytes, "d.zip", &ConvertOptions::default()).await.unwrap();
        assert_eq!(pack.report.duplicates, 1);

        let mut out = open(&pack).await;
        assert_eq!(read(&mut out, "pack_icon.png").unwrap(), b"root");
    }

    #[tokio::test]
    async fn test_every_mcmeta_is_parsed_last_wins() {
        let bytes = build_zip(&[
            ("assets/minecraft/textures/block/a.png", b"a"),
            ("pack.mcmeta", br#"{"pack": {"description": "First"}}"#),
            ("nested/pack.mcmeta", br#"{"pack": {"description": "Second"}}"#),
        ]);
        let pack = run(bytes, "m.zip", &ConvertOptions::default()).await.unwrap();
        assert_eq!(pack.manifest.header.description, "Second\nPorted by Pepe's Pack Porter.");

        let bytes = build_zip(&[
            ("assets/minecraft/textures/block/a.png", b"a"),
            ("pack.mcmeta", br#"{"pack": {"description": "First"}}"#),
            ("nested/pack.mcmeta", b"{ broken"),
        ]);
        let err = run(bytes, "m.zip", &ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::ManifestParse(_)));
    }

    #[test]
    fn test_manifest_path_collision_is_error() {
        let mut ids = SequenceIds::new(vec![[1u8; 16], [2u8; 16]]);
        let manifest = manifest::build("p", "d", DEFAULT_ATTRIBUTION, &mut ids);

        let mut dest = DestArchive::new();
        write_manifest(&mut dest, &manifest).unwrap();
        assert!(dest.get(MANIFEST_FILE).is_some());

        let mut taken = DestArchive::new();
        taken.add_bytes(MANIFEST_FILE, b"{}".to_vec());
        assert!(matches!(
            write_manifest(&mut taken, &manifest),
            Err(CoreError::Config(_))
        ));
        assert_eq!(taken.get(MANIFEST_FILE), Some(&b"{}"[..]));
    }

    #[tokio::test]
    async fn test_custom_attribution_and_suffix() {
        let bytes = build_zip(&[
            ("assets/minecraft/textures/block/a.png", b"a"),
            ("pack.mcmeta", MCMETA),
        ]);
        let options = ConvertOptions {
            attribution: "by me".into(),
            output_suffix: "_bedrock".into(),
            ..Default::default()
        };
        let pack = run(bytes, "Mine.zip", &options).await.unwrap();
        assert_eq!(pack.file_name, "Mine_bedrock.zip");
        assert_eq!(pack.manifest.header.description, "Test Pack\nby me");
    }
}
