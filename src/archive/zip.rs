use std::io::{Cursor, Read, Write};

use indexmap::IndexMap;
use tokio::task;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::result::{CoreError, CoreResult};

const LOCAL_HEADER_SIG: &[u8] = b"PK\x03\x04";
const EMPTY_ARCHIVE_SIG: &[u8] = b"PK\x05\x06";

/// 是否以 zip 签名开头（空 zip 只有中央目录结束记录）
pub fn has_zip_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(LOCAL_HEADER_SIG) || bytes.starts_with(EMPTY_ARCHIVE_SIG)
}

#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub index: usize,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

// 条目头里声明的大小不可信，预分配最多 1 MiB，其余由 read_to_end 扩容
const MAX_PREALLOC: u64 = 1 << 20;

fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// 只读的源压缩包，整体在内存中
pub struct SourceArchive {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    entries: Vec<EntryInfo>,
}

impl SourceArchive {
    pub fn from_bytes(bytes: Vec<u8>) -> CoreResult<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| CoreError::Load(e.to_string()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let e = archive
                .by_index_raw(i)
                .map_err(|e| CoreError::Load(e.to_string()))?;
            entries.push(EntryInfo {
                index: i,
                name: e.name().replace('\\', "/"),
                is_dir: e.is_dir(),
                size: e.size(),
            });
        }

        debug!("ZipArchive 条目数：{}", entries.len());
        Ok(Self { archive, entries })
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn read_bytes(&mut self, index: usize) -> CoreResult<Vec<u8>> {
        let mut file = self
            .archive
            .by_index(index)
            .map_err(|e| CoreError::Load(e.to_string()))?;
        let mut buf = Vec::with_capacity(initial_capacity(file.size()));
        file.read_to_end(&mut buf)
            .map_err(|e| CoreError::Load(format!("{}: {}", file.name(), e)))?;
        Ok(buf)
    }

    pub fn read_text(&mut self, index: usize) -> CoreResult<String> {
        let buf = self.read_bytes(index)?;
        Ok(decode_text_bytes(&buf))
    }
}

/// 在阻塞线程中解码压缩包
pub async fn load_archive(bytes: Vec<u8>) -> CoreResult<SourceArchive> {
    task::spawn_blocking(move || SourceArchive::from_bytes(bytes)).await?
}

/// 按写入顺序保存的目标压缩包；同一路径只接受第一次写入
#[derive(Debug, Default, Clone)]
pub struct DestArchive {
    entries: IndexMap<String, Vec<u8>>,
}

impl DestArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回 false 表示路径已存在，本次写入被忽略
    pub fn add_bytes(&mut self, path: &str, data: Vec<u8>) -> bool {
        if self.entries.contains_key(path) {
            warn!("目标包中已存在 {}，忽略重复写入", path);
            return false;
        }
        self.entries.insert(path.to_string(), data);
        true
    }

    pub fn add_text(&mut self, path: &str, text: &str) -> bool {
        self.add_bytes(path, text.as_bytes().to_vec())
    }

    #[cfg(test)]
    pub(crate) fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, data) in &self.entries {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// 在阻塞线程中压缩输出
pub async fn finish_archive(dest: DestArchive) -> CoreResult<Vec<u8>> {
    task::spawn_blocking(move || dest.to_bytes()).await?
}

/// 按 BOM 判断编码，默认 UTF-8（无效字节做有损替换）
pub fn decode_text_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).to_string();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    String::from_utf8_lossy(bytes).to_string()
}
