//! 検出結果・レポートの型定義
//!
//! CLIとHTTP APIで共有される型:
//! - LesionCategory: 検出対象の病変パターン（固定集合）
//! - DetectionRequest: 画像参照 + カテゴリ選択
//! - DetectionOutcome: カテゴリごとの正規化済み結果
//! - PatientRecord: 保存されるレポートレコード

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 病変パターンのカテゴリ
///
/// 宣言順がレジストリの順序（"all" 展開時の順序）になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LesionCategory {
    Streaks,
    Globules,
    PigmentNetwork,
    NegativeNetwork,
    MiliaLikeCysts,
}

impl LesionCategory {
    /// 全カテゴリ（レジストリ宣言順）
    pub const ALL: [LesionCategory; 5] = [
        LesionCategory::Streaks,
        LesionCategory::Globules,
        LesionCategory::PigmentNetwork,
        LesionCategory::NegativeNetwork,
        LesionCategory::MiliaLikeCysts,
    ];

    /// ワイヤー上の識別子
    pub fn id(&self) -> &'static str {
        match self {
            LesionCategory::Streaks => "streaks",
            LesionCategory::Globules => "globules",
            LesionCategory::PigmentNetwork => "pigmentNetwork",
            LesionCategory::NegativeNetwork => "negativeNetwork",
            LesionCategory::MiliaLikeCysts => "miliaLikeCysts",
        }
    }

    /// レポート表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            LesionCategory::Streaks => "Streaks",
            LesionCategory::Globules => "Globules",
            LesionCategory::PigmentNetwork => "Pigment Network",
            LesionCategory::NegativeNetwork => "Negative Network",
            LesionCategory::MiliaLikeCysts => "Milia-like Cysts",
        }
    }

    /// 検出サービスURLを指定する環境変数名
    pub fn env_var(&self) -> &'static str {
        match self {
            LesionCategory::Streaks => "STREAKS_API",
            LesionCategory::Globules => "GLOBULES_API",
            LesionCategory::PigmentNetwork => "PIGMENT_API",
            LesionCategory::NegativeNetwork => "NEGATIVE_API",
            LesionCategory::MiliaLikeCysts => "MILIA_API",
        }
    }
}

impl fmt::Display for LesionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for LesionCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // 検出サービス側の短縮名・ケバブケースも受け付ける
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "streaks" => Ok(LesionCategory::Streaks),
            "globules" => Ok(LesionCategory::Globules),
            "pigmentnetwork" | "pigment" => Ok(LesionCategory::PigmentNetwork),
            "negativenetwork" | "negative" => Ok(LesionCategory::NegativeNetwork),
            "milialikecysts" | "milia" | "milialike" => Ok(LesionCategory::MiliaLikeCysts),
            _ => Err(Error::InvalidRequest(format!("unknown lesion category: {}", s))),
        }
    }
}

impl Serialize for LesionCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for LesionCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// カテゴリ選択（"all" / 単一 / 明示リスト）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelection {
    All,
    Single(LesionCategory),
    Many(Vec<LesionCategory>),
}

impl CategorySelection {
    /// 具体的なカテゴリ列に展開（重複は最初の位置に集約）
    pub fn resolve(&self) -> Vec<LesionCategory> {
        match self {
            CategorySelection::All => LesionCategory::ALL.to_vec(),
            CategorySelection::Single(category) => vec![*category],
            CategorySelection::Many(categories) => {
                let mut resolved: Vec<LesionCategory> = Vec::with_capacity(categories.len());
                for category in categories {
                    if !resolved.contains(category) {
                        resolved.push(*category);
                    }
                }
                resolved
            }
        }
    }
}

impl FromStr for CategorySelection {
    type Err = Error;

    /// "all" またはカンマ区切りのカテゴリ列
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(CategorySelection::All);
        }

        let categories = trimmed
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(LesionCategory::from_str)
            .collect::<Result<Vec<_>>>()?;

        match categories.as_slice() {
            [single] => Ok(CategorySelection::Single(*single)),
            _ => Ok(CategorySelection::Many(categories)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for CategorySelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawSelection::deserialize(deserializer)? {
            RawSelection::One(value) if value.trim().eq_ignore_ascii_case("all") => {
                Ok(CategorySelection::All)
            }
            RawSelection::One(value) => value
                .parse::<LesionCategory>()
                .map(CategorySelection::Single)
                .map_err(serde::de::Error::custom),
            RawSelection::Many(values) => values
                .iter()
                .map(|v| v.parse::<LesionCategory>())
                .collect::<Result<Vec<_>>>()
                .map(CategorySelection::Many)
                .map_err(serde::de::Error::custom),
        }
    }
}

impl Serialize for CategorySelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CategorySelection::All => serializer.serialize_str("all"),
            CategorySelection::Single(category) => category.serialize(serializer),
            CategorySelection::Many(categories) => categories.serialize(serializer),
        }
    }
}

/// 検出リクエスト（検証済み）
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRequest {
    image_reference: String,
    categories: Vec<LesionCategory>,
}

impl DetectionRequest {
    /// 画像参照が空、またはカテゴリが空の場合は入力エラー
    pub fn new(image_reference: impl Into<String>, selection: &CategorySelection) -> Result<Self> {
        let image_reference = image_reference.into().trim().to_string();
        if image_reference.is_empty() {
            return Err(Error::InvalidRequest("image reference is required".into()));
        }

        let categories = selection.resolve();
        if categories.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one lesion category is required".into(),
            ));
        }

        Ok(Self {
            image_reference,
            categories,
        })
    }

    pub fn image_reference(&self) -> &str {
        &self.image_reference
    }

    pub fn categories(&self) -> &[LesionCategory] {
        &self.categories
    }
}

/// カテゴリごとの検出結果
///
/// `confidence` は予測マスクが画像に占める面積の割合（0〜100）。
/// 読み込み時は `RawOutcome` を経由し、失敗結果は必ず正規形になる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawOutcome")]
pub struct DetectionOutcome {
    pub succeeded: bool,
    pub detected: bool,
    pub confidence: Option<f64>,
    pub mask_image: Option<String>,
    pub labeled_image: Option<String>,
    pub heatmap_image: Option<String>,
}

/// 保存済みレコード・APIクライアントから来る結果（旧形式の `status` を含む）
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOutcome {
    #[serde(default)]
    succeeded: Option<bool>,
    #[serde(default, alias = "status")]
    detected: Option<bool>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    mask_image: Option<String>,
    #[serde(default)]
    labeled_image: Option<String>,
    #[serde(default)]
    heatmap_image: Option<String>,
}

impl From<RawOutcome> for DetectionOutcome {
    /// `succeeded` がなければ判定（detected/status）の有無から推定する
    fn from(raw: RawOutcome) -> Self {
        match (raw.succeeded, raw.detected) {
            (Some(false), _) | (None, None) => DetectionOutcome::failure(),
            (_, detected) => DetectionOutcome {
                succeeded: true,
                detected: detected.unwrap_or(false),
                confidence: raw.confidence,
                mask_image: raw.mask_image,
                labeled_image: raw.labeled_image,
                heatmap_image: raw.heatmap_image,
            },
        }
    }
}

impl DetectionOutcome {
    /// 失敗時の正規結果（例外は呼び出し元へ伝播しない）
    pub fn failure() -> Self {
        Self {
            succeeded: false,
            detected: false,
            confidence: Some(0.0),
            mask_image: None,
            labeled_image: None,
            heatmap_image: None,
        }
    }

    /// レポート掲載対象か（検出あり + マスク画像あり）
    pub fn is_reportable(&self) -> bool {
        self.detected && self.mask_image.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// カテゴリ → 結果のマップ
pub type DetectionAggregate = BTreeMap<LesionCategory, DetectionOutcome>;

/// 患者情報（入力フォーム）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientInfo {
    pub name: String,
    pub age: Option<u32>,
    pub gender: String,
    pub contact: String,
}

/// 保存されるレポートレコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// 保存時に採番される識別子（下書きでは None）
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub patient_name: String,

    pub patient_age: u32,

    pub patient_gender: String,

    #[serde(default)]
    pub patient_phone: String,

    /// 元画像のURI
    #[serde(default)]
    pub patient_lesion_image: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub lesions: DetectionAggregate,
}
