//! Data URL ユーティリティ
//!
//! "data:image/png;base64,iVBORw0..." 形式の埋め込み画像を扱う。

use base64::{engine::general_purpose::STANDARD, Engine};

const DATA_URL_PREFIX: &str = "data:";

/// 既にインライン化済みか
pub fn is_data_url(reference: &str) -> bool {
    reference
        .get(..DATA_URL_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DATA_URL_PREFIX))
}

/// バイト列から Data URL を生成
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Data URLからBase64データ部分を抽出
pub fn extract_base64_from_data_url(data_url: &str) -> Option<&str> {
    if !is_data_url(data_url) {
        return None;
    }
    data_url.split_once(',').map(|(_, data)| data)
}

/// Data URLからMIMEタイプを抽出（不明なら None）
pub fn extract_mime_type_from_data_url(data_url: &str) -> Option<&str> {
    if !is_data_url(data_url) {
        return None;
    }
    let header = data_url[DATA_URL_PREFIX.len()..].split(',').next()?;
    let mime = header.split(';').next()?;
    if mime.is_empty() {
        None
    } else {
        Some(mime)
    }
}

/// Data URLをデコードしてバイト列を取得
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let payload = extract_base64_from_data_url(data_url)?;
    STANDARD.decode(payload.trim()).ok()
}
