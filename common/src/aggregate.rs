//! スキャンセッションの結果集約
//!
//! 「1カテゴリ検出」と「全カテゴリ検出」を繰り返しても、
//! カテゴリ単位で後勝ちマージする。

use crate::error::{Error, Result};
use crate::types::{DetectionAggregate, PatientInfo, PatientRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 既存の集約に新しい実行結果をマージ
///
/// 新しい結果に含まれるカテゴリは丸ごと置き換え、それ以外は保持する。
pub fn merge_aggregates(
    existing: &DetectionAggregate,
    incoming: &DetectionAggregate,
) -> DetectionAggregate {
    let mut merged = existing.clone();
    for (category, outcome) in incoming {
        merged.insert(*category, outcome.clone());
    }
    merged
}

/// 1回のスキャン作業の状態（画像 + 累積結果）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    image_reference: Option<String>,

    #[serde(default)]
    results: DetectionAggregate,

    #[serde(skip)]
    run_in_flight: bool,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 画像と結果から復元（実行中フラグは立てない）
    pub fn from_parts(image_reference: Option<String>, results: DetectionAggregate) -> Self {
        Self {
            image_reference,
            results,
            run_in_flight: false,
        }
    }

    pub fn image_reference(&self) -> Option<&str> {
        self.image_reference.as_deref()
    }

    pub fn results(&self) -> &DetectionAggregate {
        &self.results
    }

    pub fn is_running(&self) -> bool {
        self.run_in_flight
    }

    /// 画像を設定（別画像なら過去の結果は破棄）
    pub fn set_image(&mut self, reference: impl Into<String>) {
        let reference = reference.into();
        if self.image_reference.as_deref() != Some(reference.as_str()) {
            self.results.clear();
        }
        self.image_reference = Some(reference);
    }

    /// 検出開始（同時に2つは走らせない）
    pub fn begin_run(&mut self) -> Result<()> {
        if self.run_in_flight {
            return Err(Error::RunInProgress);
        }
        if self.image_reference.is_none() {
            return Err(Error::InvalidRequest("please upload an image first".into()));
        }
        self.run_in_flight = true;
        Ok(())
    }

    /// 検出完了: 結果をマージ
    pub fn complete_run(&mut self, incoming: &DetectionAggregate) {
        self.results = merge_aggregates(&self.results, incoming);
        self.run_in_flight = false;
    }

    /// 結果を捨てて実行状態だけ解除
    pub fn abandon_run(&mut self) {
        self.run_in_flight = false;
    }

    /// 保存用の下書きレコードを作成
    pub fn to_draft(&self, patient: &PatientInfo) -> Result<PatientRecord> {
        let age = match patient.age {
            Some(age) if !patient.name.trim().is_empty() && !patient.gender.trim().is_empty() => age,
            _ => {
                return Err(Error::IncompleteDraft(
                    "please fill all patient details (name, age, gender)".into(),
                ))
            }
        };

        if self.results.is_empty() {
            return Err(Error::IncompleteDraft(
                "please detect at least one lesion".into(),
            ));
        }

        Ok(PatientRecord {
            id: None,
            patient_name: patient.name.trim().to_string(),
            patient_age: age,
            patient_gender: patient.gender.trim().to_string(),
            patient_phone: patient.contact.trim().to_string(),
            patient_lesion_image: self.image_reference.clone(),
            created_at: Utc::now(),
            lesions: self.results.clone(),
        })
    }
}
