//! レポートレコードの保存・読み込み
//!
//! 1レコード = 1 JSONファイル（`<id>.json`）。読み込みは識別子のみで行う。

use crate::error::{LesionVisionError, Result};
use lesion_vision_common::PatientRecord;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// 識別子の長さ（16進24文字）
const ID_LEN: usize = 24;

#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// 保存先ディレクトリを開く（なければ作成）
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 下書きを保存して識別子を採番
    pub fn save(&self, draft: &PatientRecord) -> Result<PatientRecord> {
        let mut record = draft.clone();
        let id = loop {
            let candidate = generate_id(&record)?;
            if !self.path_for(&candidate).exists() {
                break candidate;
            }
        };
        record.id = Some(id.clone());

        let file = File::create(self.path_for(&id))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &record)?;
        Ok(record)
    }

    /// 識別子で読み込み
    pub fn load(&self, id: &str) -> Result<PatientRecord> {
        if !is_valid_id(id) {
            return Err(LesionVisionError::RecordNotFound(id.to_string()));
        }

        let path = self.path_for(id);
        if !path.exists() {
            return Err(LesionVisionError::RecordNotFound(id.to_string()));
        }

        let reader = BufReader::new(File::open(path)?);
        let mut record: PatientRecord = serde_json::from_reader(reader)?;
        record.id = Some(id.to_string());
        Ok(record)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// 内容 + 現在時刻のハッシュから識別子を生成
fn generate_id(record: &PatientRecord) -> Result<String> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LesionVisionError::Config(format!("system clock is before the epoch: {}", e)))?
        .as_nanos();

    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(record)?);
    hasher.update(nanos.to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    Ok(digest[..ID_LEN].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_id() {
        assert!(is_valid_id("65a1b2c3d4e5f60718293a4b"));
        assert!(!is_valid_id("../../etc/passwd"));
        assert!(!is_valid_id("65a1b2c3"));
        assert!(!is_valid_id("zza1b2c3d4e5f60718293a4b"));
    }
}
