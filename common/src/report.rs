//! レポート組み立て（描画先に依存しない文書モデル）
//!
//! 検出あり + マスク画像ありのカテゴリのみ掲載する。
//! ネットワークI/Oは行わない。画像参照はそのまま描画先へ渡す。

use crate::layout::MAX_IMAGES_PER_SECTION;
use crate::types::{LesionCategory, PatientRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const REPORT_TITLE: &str = "LesionVision – Detection Report";
pub const REPORT_SUBTITLE: &str = "AI-Powered Dermatological Assessment";
pub const NO_PATTERNS_MESSAGE: &str = "No lesion patterns were detected in this analysis.";
pub const DETECTED_LABEL: &str = "Detected";
pub const DISCLAIMER: &str =
    "AI detection is not a medical diagnosis. Always consult a certified dermatologist.";

/// 患者情報欄の1項目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientField {
    pub label: &'static str,
    pub value: String,
}

/// セクション内の画像の種類（表示順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageKind {
    Original,
    Mask,
    Labeled,
    Heatmap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportImage {
    pub kind: ImageKind,
    pub source: String,
}

/// 病変1件分のセクション
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LesionSection {
    pub category: LesionCategory,
    pub title: &'static str,
    pub status_label: &'static str,
    pub confidence: Option<String>,
    pub images: Vec<ReportImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReportSection {
    NoPatterns { message: &'static str },
    Lesion(LesionSection),
}

/// 描画前のレポート全体
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub patient_fields: Vec<PatientField>,
    pub analysis_heading: String,
    pub sections: Vec<ReportSection>,
    pub footer: &'static str,
}

impl ReportDocument {
    /// 病変セクション数（"検出なし" セクションは数えない）
    pub fn lesion_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| matches!(s, ReportSection::Lesion(_)))
            .count()
    }
}

/// PatientRecord からレポートを組み立て
pub fn assemble_report(patient: &PatientRecord) -> ReportDocument {
    let sections: Vec<ReportSection> = patient
        .lesions
        .iter()
        .filter(|(_, outcome)| outcome.is_reportable())
        .map(|(category, outcome)| {
            let candidates = [
                (ImageKind::Original, patient.patient_lesion_image.as_deref()),
                (ImageKind::Mask, outcome.mask_image.as_deref()),
                (ImageKind::Labeled, outcome.labeled_image.as_deref()),
                (ImageKind::Heatmap, outcome.heatmap_image.as_deref()),
            ];
            let images = candidates
                .into_iter()
                .filter_map(|(kind, source)| match source {
                    Some(s) if !s.trim().is_empty() => Some(ReportImage {
                        kind,
                        source: s.to_string(),
                    }),
                    _ => None,
                })
                .take(MAX_IMAGES_PER_SECTION)
                .collect();

            ReportSection::Lesion(LesionSection {
                category: *category,
                title: category.display_name(),
                status_label: DETECTED_LABEL,
                confidence: outcome.confidence.map(format_confidence),
                images,
            })
        })
        .collect();

    let detected = sections.len();
    let sections = if sections.is_empty() {
        vec![ReportSection::NoPatterns {
            message: NO_PATTERNS_MESSAGE,
        }]
    } else {
        sections
    };

    ReportDocument {
        title: REPORT_TITLE,
        subtitle: REPORT_SUBTITLE,
        patient_fields: build_patient_fields(patient),
        analysis_heading: format!("Lesion Analysis ({} Detected)", detected),
        sections,
        footer: DISCLAIMER,
    }
}

/// 患者情報欄を構築
fn build_patient_fields(patient: &PatientRecord) -> Vec<PatientField> {
    let or_dash = |value: &str| {
        if value.trim().is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        }
    };

    vec![
        PatientField { label: "Name", value: or_dash(&patient.patient_name) },
        PatientField { label: "Age", value: patient.patient_age.to_string() },
        PatientField { label: "Gender", value: or_dash(&patient.patient_gender) },
        PatientField { label: "Contact", value: or_dash(&patient.patient_phone) },
        PatientField { label: "Date", value: format_date(&patient.created_at) },
    ]
}

/// 日時フォーマット: "January 5, 2026 at 02:30 PM"
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y at %I:%M %p").to_string()
}

/// 面積率を表示用文字列に（小数2桁まで）
fn format_confidence(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("Confidence (area covered): {}%", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DetectionOutcome;
    use chrono::TimeZone;

    fn record() -> PatientRecord {
        PatientRecord {
            id: Some("65a1b2c3d4e5f60718293a4b".into()),
            patient_name: "Jane Doe".into(),
            patient_age: 42,
            patient_gender: "female".into(),
            patient_phone: String::new(),
            patient_lesion_image: Some("https://img/a.png".into()),
            created_at: Utc.with_ymd_and_hms(2026, 1, 5, 14, 30, 0).unwrap(),
            lesions: Default::default(),
        }
    }

    fn outcome(detected: bool, mask: Option<&str>) -> DetectionOutcome {
        DetectionOutcome {
            succeeded: true,
            detected,
            confidence: Some(12.346),
            mask_image: mask.map(str::to_string),
            labeled_image: Some("https://x/labeled.png".into()),
            heatmap_image: None,
        }
    }

    #[test]
    fn test_empty_aggregate_renders_no_patterns_section() {
        let doc = assemble_report(&record());
        assert_eq!(doc.sections.len(), 1);
        assert!(matches!(doc.sections[0], ReportSection::NoPatterns { .. }));
        assert_eq!(doc.lesion_count(), 0);
        assert_eq!(doc.analysis_heading, "Lesion Analysis (0 Detected)");
        assert_eq!(doc.footer, DISCLAIMER);
    }

    #[test]
    fn test_filtering_requires_detection_and_mask() {
        let mut patient = record();
        patient.lesions.insert(LesionCategory::Streaks, outcome(true, None));
        patient.lesions.insert(LesionCategory::Globules, outcome(true, Some("https://x/y.png")));
        patient.lesions.insert(LesionCategory::PigmentNetwork, outcome(false, Some("https://x/p.png")));
        patient.lesions.insert(LesionCategory::NegativeNetwork, DetectionOutcome::failure());

        let doc = assemble_report(&patient);
        assert_eq!(doc.lesion_count(), 1);
        match &doc.sections[0] {
            ReportSection::Lesion(section) => {
                assert_eq!(section.category, LesionCategory::Globules);
                assert_eq!(section.title, "Globules");
                assert_eq!(section.status_label, "Detected");
            }
            other => panic!("unexpected section: {:?}", other),
        }
    }

    #[test]
    fn test_images_in_fixed_order_skipping_absent() {
        let mut patient = record();
        patient.lesions.insert(LesionCategory::Globules, outcome(true, Some("https://x/y.png")));

        let doc = assemble_report(&patient);
        let ReportSection::Lesion(section) = &doc.sections[0] else {
            panic!("expected lesion section");
        };
        let kinds: Vec<ImageKind> = section.images.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![ImageKind::Original, ImageKind::Mask, ImageKind::Labeled]);
    }

    #[test]
    fn test_missing_primary_image_is_skipped() {
        let mut patient = record();
        patient.patient_lesion_image = None;
        patient.lesions.insert(LesionCategory::Globules, outcome(true, Some("https://x/y.png")));

        let doc = assemble_report(&patient);
        let ReportSection::Lesion(section) = &doc.sections[0] else {
            panic!("expected lesion section");
        };
        assert_eq!(section.images[0].kind, ImageKind::Mask);
    }

    #[test]
    fn test_confidence_omitted_when_absent() {
        let mut patient = record();
        let mut without = outcome(true, Some("https://x/y.png"));
        without.confidence = None;
        patient.lesions.insert(LesionCategory::Streaks, without);
        patient.lesions.insert(LesionCategory::Globules, outcome(true, Some("https://x/g.png")));

        let doc = assemble_report(&patient);
        let confidences: Vec<Option<String>> = doc
            .sections
            .iter()
            .filter_map(|s| match s {
                ReportSection::Lesion(l) => Some(l.confidence.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(confidences[0], None);
        assert_eq!(
            confidences[1].as_deref(),
            Some("Confidence (area covered): 12.35%")
        );
    }

    #[test]
    fn test_patient_fields() {
        let doc = assemble_report(&record());
        let labels: Vec<&str> = doc.patient_fields.iter().map(|f| f.label).collect();
        assert_eq!(labels, vec!["Name", "Age", "Gender", "Contact", "Date"]);
        assert_eq!(doc.patient_fields[3].value, "-");
        assert_eq!(doc.patient_fields[4].value, "January 5, 2026 at 02:30 PM");
    }
}
