//! レポートPDF描画
//!
//! 画像参照はすべて Data URL であること（描画中にネットワークへはアクセスしない）。

use crate::cli::PdfQuality;
use crate::error::{LesionVisionError, Result};
use lesion_vision_common::data_url::decode_data_url;
use lesion_vision_common::layout::*;
use lesion_vision_common::report::{LesionSection, PatientField, ReportDocument, ReportSection};
use lesion_vision_common::ReportImage;
use printpdf::image_crate::{self, imageops::FilterType, DynamicImage, GenericImageView};
use printpdf::*;

/// 画像埋め込み時のDPI
const IMAGE_DPI: f32 = 300.0;

type Rgb3 = (f32, f32, f32);

const WHITE: Rgb3 = (1.0, 1.0, 1.0);
const BLACK: Rgb3 = (0.0, 0.0, 0.0);

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// ページをまたいで描画位置を管理
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    /// 次に描画するブロックの上端（mm、下から）
    y: f32,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference, layer: PdfLayerReference) -> Self {
        paint_background(&layer);
        Self {
            doc,
            layer,
            y: A4_HEIGHT_MM - MARGIN_MM,
            pages: 1,
        }
    }

    /// 残り高さが足りなければ改ページ
    fn ensure_space(&mut self, height_mm: f32) {
        if self.y - height_mm < MARGIN_MM + FOOTER_HEIGHT_MM {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(A4_WIDTH_MM),
            Mm(A4_HEIGHT_MM),
            format!("Page {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        paint_background(&self.layer);
        self.y = A4_HEIGHT_MM - MARGIN_MM;
    }

    fn fill_rect(&self, x: f32, y_top: f32, width: f32, height: f32, color: Rgb3) {
        set_fill(&self.layer, color);
        self.layer.add_rect(Rect::new(
            Mm(x),
            Mm(y_top - height),
            Mm(x + width),
            Mm(y_top),
        ));
    }

    fn text(&self, text: &str, size_pt: f32, x: f32, baseline: f32, font: &IndirectFontRef, color: Rgb3) {
        set_fill(&self.layer, color);
        self.layer
            .use_text(pdf_text(text), size_pt, Mm(x), Mm(baseline), font);
    }
}

/// レポートをPDFバイト列に描画
pub fn render_pdf(report: &ReportDocument, quality: PdfQuality) -> Result<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(
        pdf_text(report.title),
        Mm(A4_WIDTH_MM),
        Mm(A4_HEIGHT_MM),
        "Page 1",
    );

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| LesionVisionError::PdfGeneration(format!("cannot add font: {:?}", e)))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| LesionVisionError::PdfGeneration(format!("cannot add font: {:?}", e)))?,
    };

    let layer = doc.get_page(page1).get_layer(layer1);
    let mut writer = PageWriter::new(&doc, layer);

    draw_header(&mut writer, report, &fonts);
    draw_patient_block(&mut writer, &report.patient_fields, &fonts);

    writer.ensure_space(HEADING_HEIGHT_MM);
    draw_heading(&mut writer, &report.analysis_heading, &fonts);

    for section in &report.sections {
        match section {
            ReportSection::NoPatterns { message } => draw_message_box(&mut writer, message, &fonts),
            ReportSection::Lesion(lesion) => draw_lesion_section(&mut writer, lesion, &fonts, quality)?,
        }
    }

    writer.ensure_space(FOOTER_HEIGHT_MM);
    draw_footer(&writer, report.footer, &fonts);

    doc.save_to_bytes()
        .map_err(|e| LesionVisionError::PdfGeneration(format!("cannot serialize document: {:?}", e)))
}

fn draw_header(writer: &mut PageWriter<'_>, report: &ReportDocument, fonts: &Fonts) {
    let top = writer.y;
    writer.fill_rect(MARGIN_MM, top, USABLE_WIDTH_MM, HEADER_HEIGHT_MM, COLOR_SECONDARY);

    let x = MARGIN_MM + BOX_PADDING_MM * 2.0;
    writer.text(report.title, TITLE_FONT_PT, x, top - 11.0, &fonts.bold, COLOR_LIGHT);
    writer.text(report.subtitle, SUBTITLE_FONT_PT, x, top - 18.0, &fonts.regular, COLOR_PRIMARY);

    writer.y = top - HEADER_HEIGHT_MM - BOX_GAP_MM;
}

fn draw_heading(writer: &mut PageWriter<'_>, text: &str, fonts: &Fonts) {
    let baseline = writer.y - HEADING_HEIGHT_MM + 3.0;
    writer.text(text, SECTION_FONT_PT, MARGIN_MM, baseline, &fonts.bold, COLOR_SECONDARY);
    writer.y -= HEADING_HEIGHT_MM;
}

/// 患者情報（2列）
fn draw_patient_block(writer: &mut PageWriter<'_>, fields: &[PatientField], fonts: &Fonts) {
    let rows = fields.len().div_ceil(2);
    let box_height = BOX_PADDING_MM * 2.0 + LINE_HEIGHT_MM * rows as f32;

    writer.ensure_space(HEADING_HEIGHT_MM + box_height);
    draw_heading(writer, "Patient Information", fonts);

    let top = writer.y;
    writer.fill_rect(MARGIN_MM, top, USABLE_WIDTH_MM, box_height, WHITE);

    let column_width = (USABLE_WIDTH_MM - BOX_PADDING_MM * 2.0) / 2.0;
    for (i, field) in fields.iter().enumerate() {
        let row = (i / 2) as f32;
        let col = (i % 2) as f32;
        let x = MARGIN_MM + BOX_PADDING_MM + col * column_width;
        let baseline = top - BOX_PADDING_MM - LINE_HEIGHT_MM * (row + 1.0) + 1.5;
        writer.text(
            &format!("{}: {}", field.label, field.value),
            BODY_FONT_PT,
            x,
            baseline,
            &fonts.regular,
            BLACK,
        );
    }

    writer.y = top - box_height - BOX_GAP_MM;
}

fn draw_message_box(writer: &mut PageWriter<'_>, message: &str, fonts: &Fonts) {
    let box_height = BOX_PADDING_MM * 2.0 + LINE_HEIGHT_MM;
    writer.ensure_space(box_height);

    let top = writer.y;
    writer.fill_rect(MARGIN_MM, top, USABLE_WIDTH_MM, box_height, WHITE);
    writer.text(
        message,
        BODY_FONT_PT,
        MARGIN_MM + BOX_PADDING_MM,
        top - BOX_PADDING_MM - LINE_HEIGHT_MM + 1.5,
        &fonts.regular,
        BLACK,
    );

    writer.y = top - box_height - BOX_GAP_MM;
}

fn draw_lesion_section(
    writer: &mut PageWriter<'_>,
    section: &LesionSection,
    fonts: &Fonts,
    quality: PdfQuality,
) -> Result<()> {
    // 描画前にデコードしておく（途中で失敗して中途半端なページを作らない）
    let images = section
        .images
        .iter()
        .map(|image| load_image(image, quality))
        .collect::<Result<Vec<_>>>()?;

    let box_height = lesion_section_height_mm(section.confidence.is_some(), images.len());
    writer.ensure_space(box_height);

    let top = writer.y;
    writer.fill_rect(MARGIN_MM, top, USABLE_WIDTH_MM, box_height, WHITE);

    let x = MARGIN_MM + BOX_PADDING_MM;
    let mut cursor = top - BOX_PADDING_MM - HEADING_HEIGHT_MM + 3.0;
    writer.text(section.title, LESION_TITLE_FONT_PT, x, cursor, &fonts.bold, COLOR_SECONDARY);

    cursor -= LINE_HEIGHT_MM;
    writer.text(section.status_label, BODY_FONT_PT, x, cursor, &fonts.regular, BLACK);

    if let Some(confidence) = &section.confidence {
        cursor -= LINE_HEIGHT_MM;
        writer.text(confidence, BODY_FONT_PT, x, cursor, &fonts.regular, BLACK);
    }

    if !images.is_empty() {
        let image_top = cursor - BOX_PADDING_MM;
        for (i, image) in images.iter().enumerate() {
            let tile_x = x + i as f32 * (IMAGE_TILE_MM + IMAGE_GAP_MM);
            place_image(&writer.layer, image, tile_x, image_top - IMAGE_TILE_MM);
        }
    }

    writer.y = top - box_height - BOX_GAP_MM;
    Ok(())
}

fn draw_footer(writer: &PageWriter<'_>, footer: &str, fonts: &Fonts) {
    writer.text(
        footer,
        FOOTER_FONT_PT,
        MARGIN_MM,
        MARGIN_MM + 4.0,
        &fonts.regular,
        COLOR_SECONDARY,
    );
}

/// Data URL をデコードし、品質設定の幅に収める
fn load_image(image: &ReportImage, quality: PdfQuality) -> Result<DynamicImage> {
    let bytes = decode_data_url(&image.source).ok_or_else(|| {
        LesionVisionError::PdfGeneration(format!(
            "image is not inlined ({:?})",
            image.kind
        ))
    })?;

    let decoded = image_crate::load_from_memory(&bytes).map_err(|e| {
        LesionVisionError::PdfGeneration(format!("cannot decode image ({:?}): {}", image.kind, e))
    })?;

    let max = quality.max_width();
    let resized = if decoded.width() > max || decoded.height() > max {
        decoded.resize(max, max, FilterType::Triangle)
    } else {
        decoded
    };

    // アルファチャンネルは落とす
    Ok(DynamicImage::ImageRgb8(resized.to_rgb8()))
}

/// 画像をタイル（正方形）に収まるよう縮尺して配置
fn place_image(layer: &PdfLayerReference, image: &DynamicImage, x: f32, y_bottom: f32) {
    let (width_px, height_px) = image.dimensions();
    let natural_w = width_px as f32 * 25.4 / IMAGE_DPI;
    let natural_h = height_px as f32 * 25.4 / IMAGE_DPI;
    let scale = (IMAGE_TILE_MM / natural_w).min(IMAGE_TILE_MM / natural_h);

    Image::from_dynamic_image(image).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y_bottom)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

fn paint_background(layer: &PdfLayerReference) {
    set_fill(layer, COLOR_LIGHT);
    layer.add_rect(Rect::new(Mm(0.0), Mm(0.0), Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM)));
}

fn set_fill(layer: &PdfLayerReference, (r, g, b): Rgb3) {
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

/// 組み込みフォントはASCIIのみ扱える
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '–' | '—' => '-',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_text_replaces_non_ascii() {
        assert_eq!(pdf_text("LesionVision – Report"), "LesionVision - Report");
        assert_eq!(pdf_text("José"), "Jos?");
    }

    #[test]
    fn test_load_image_rejects_remote_reference() {
        let image = ReportImage {
            kind: lesion_vision_common::ImageKind::Mask,
            source: "https://x/y.png".into(),
        };
        let err = load_image(&image, PdfQuality::Medium).unwrap_err();
        assert!(matches!(err, LesionVisionError::PdfGeneration(_)));
    }
}
