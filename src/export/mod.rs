pub mod pdf;

use crate::cli::{ExportFormat, PdfQuality};
use crate::error::Result;
use crate::inline::AssetInliner;
use lesion_vision_common::{assemble_report, PatientRecord};
use std::path::{Path, PathBuf};

fn output_path_for_format(output: &Path, title: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", title, extension))
    } else {
        output.to_path_buf()
    }
}

fn output_paths_for_both(output: &Path, title: &str) -> (PathBuf, PathBuf) {
    if output.is_dir() || output.extension().is_none() {
        (
            output.join(format!("{}.pdf", title)),
            output.join(format!("{}.json", title)),
        )
    } else {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(title);
        (
            parent.join(format!("{}.pdf", stem)),
            parent.join(format!("{}.json", stem)),
        )
    }
}

/// 出力ファイル名（`LesionVision_Report_<患者名>_<日付>`）
pub fn report_file_stem(record: &PatientRecord) -> String {
    let name: String = record
        .patient_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let name = if name.is_empty() { "Patient".to_string() } else { name };
    format!(
        "LesionVision_Report_{}_{}",
        name,
        record.created_at.format("%Y%m%d")
    )
}

/// レコードを全画像インライン化したうえでPDFバイト列に描画
pub async fn render_record_pdf(
    record: &PatientRecord,
    inliner: &AssetInliner,
    quality: PdfQuality,
) -> Result<Vec<u8>> {
    let inlined = inliner.inline_record(record).await?;
    let report = assemble_report(&inlined);
    pdf::render_pdf(&report, quality)
}

/// レポートを出力し、書き出したファイルのパスを返す
///
/// JSONはリモート参照のままのプレビュー用文書、PDFは全画像インライン化後に描画する。
pub async fn export_report(
    record: &PatientRecord,
    inliner: &AssetInliner,
    format: &ExportFormat,
    output: &Path,
    pdf_quality: PdfQuality,
) -> Result<Vec<PathBuf>> {
    let title = report_file_stem(record);
    let mut written = Vec::new();

    let (pdf_path, json_path) = match format {
        ExportFormat::Pdf => (Some(output_path_for_format(output, &title, "pdf")), None),
        ExportFormat::Json => (None, Some(output_path_for_format(output, &title, "json"))),
        ExportFormat::Both => {
            let (pdf_path, json_path) = output_paths_for_both(output, &title);
            (Some(pdf_path), Some(json_path))
        }
    };

    if let Some(path) = json_path {
        println!("- レポートJSONを生成中...");
        let report = assemble_report(record);
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("✔ JSON出力: {}", path.display());
        written.push(path);
    }

    if let Some(path) = pdf_path {
        println!("- PDFを生成中... (品質: {})", pdf_quality);
        let bytes = render_record_pdf(record, inliner, pdf_quality).await?;
        std::fs::write(&path, bytes)?;
        println!("✔ PDF出力: {}", path.display());
        written.push(path);
    }

    Ok(written)
}
