//! スキャンセッションファイル
//!
//! CLIの複数回の呼び出し（upload → detect → detect → save）の間で
//! ScanSession を保持する。別プロセスの detect が重ならないよう、
//! 実行中はロックファイルを置く。

use crate::error::Result;
use lesion_vision_common::ScanSession;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const SESSION_FILE_NAME: &str = ".lesion-session.json";
const LOCK_FILE_NAME: &str = ".lesion-session.lock";

/// セッションファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    /// バージョン（互換性チェック用）
    version: u32,
    session: ScanSession,
}

impl SessionFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn session_path(folder: &Path) -> PathBuf {
        folder.join(SESSION_FILE_NAME)
    }

    /// セッションを読み込み（なし・破損・バージョン不一致は新規）
    pub fn load(folder: &Path) -> Self {
        let path = Self::session_path(folder);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, SessionFile>(BufReader::new(file)) {
            Ok(saved) if saved.version == Self::CURRENT_VERSION => saved,
            Ok(_) => {
                warn!(path = %path.display(), "session version mismatch, starting over");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "session file unreadable, starting over");
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::session_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// セッションファイルと残ったロックを削除（どちらもなければ false）
    pub fn clear(folder: &Path) -> Result<bool> {
        let mut removed = false;
        for path in [Self::session_path(folder), RunLock::lock_path(folder)] {
            if path.exists() {
                std::fs::remove_file(path)?;
                removed = true;
            }
        }
        Ok(removed)
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ScanSession {
        &mut self.session
    }
}

impl Default for SessionFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            session: ScanSession::new(),
        }
    }
}

/// 検出実行中のロック（フォルダごとに1つ）
///
/// drop で解除される。プロセスが異常終了して残った場合は `SessionFile::clear` で消す。
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn lock_path(folder: &Path) -> PathBuf {
        folder.join(LOCK_FILE_NAME)
    }

    /// ロックを取得。既に取得されていれば `RunInProgress`
    pub fn acquire(folder: &Path) -> Result<Self> {
        let path = Self::lock_path(folder);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(lesion_vision_common::Error::RunInProgress.into())
            }
            Err(e) => return Err(e.into()),
        };

        let lock = Self { path };
        writeln!(file, "{}", std::process::id())?;
        Ok(lock)
    }

    pub fn is_locked(folder: &Path) -> bool {
        Self::lock_path(folder).exists()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release session lock");
        }
    }
}
