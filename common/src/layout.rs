//! レイアウト設定モジュール
//!
//! mm基準のレポートレイアウト定義（A4縦）

// ============================================
// ページ
// ============================================

/// A4サイズ（mm）
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// 余白（mm）
pub const MARGIN_MM: f32 = 9.0;

/// 利用可能幅（mm）
pub const USABLE_WIDTH_MM: f32 = A4_WIDTH_MM - MARGIN_MM * 2.0; // 192mm

// ============================================
// ブロック寸法
// ============================================

/// ヘッダー帯の高さ（mm）
pub const HEADER_HEIGHT_MM: f32 = 24.0;

/// 見出し1行分（mm）
pub const HEADING_HEIGHT_MM: f32 = 9.0;

/// 本文1行分（mm）
pub const LINE_HEIGHT_MM: f32 = 5.5;

/// ボックス内パディング（mm）
pub const BOX_PADDING_MM: f32 = 4.0;
pub const BOX_GAP_MM: f32 = 4.0;

/// 1セクションに並べる画像の上限
pub const MAX_IMAGES_PER_SECTION: usize = 4;

/// 画像タイル（正方形、4枚が1行に収まる幅）
pub const IMAGE_GAP_MM: f32 = 2.0;
pub const IMAGE_TILE_MM: f32 = (USABLE_WIDTH_MM
    - BOX_PADDING_MM * 2.0
    - IMAGE_GAP_MM * (MAX_IMAGES_PER_SECTION as f32 - 1.0))
    / MAX_IMAGES_PER_SECTION as f32; // 44.5mm

/// フッター領域（mm）
pub const FOOTER_HEIGHT_MM: f32 = 12.0;

/// フォントサイズ（pt）
pub const TITLE_FONT_PT: f32 = 20.0;
pub const SUBTITLE_FONT_PT: f32 = 11.0;
pub const SECTION_FONT_PT: f32 = 14.0;
pub const LESION_TITLE_FONT_PT: f32 = 13.0;
pub const BODY_FONT_PT: f32 = 12.0;
pub const FOOTER_FONT_PT: f32 = 9.0;

/// 配色（RGB 0.0〜1.0）
pub const COLOR_SECONDARY: (f32, f32, f32) = (0x1e as f32 / 255.0, 0x47 as f32 / 255.0, 0x59 as f32 / 255.0);
pub const COLOR_PRIMARY: (f32, f32, f32) = (0x96 as f32 / 255.0, 0x9a as f32 / 255.0, 0x9d as f32 / 255.0);
pub const COLOR_LIGHT: (f32, f32, f32) = (0xe7 as f32 / 255.0, 0xeb as f32 / 255.0, 0xee as f32 / 255.0);

/// 病変セクション1つの高さ（mm）
pub fn lesion_section_height_mm(has_confidence: bool, image_count: usize) -> f32 {
    let text_lines = if has_confidence { 2.0 } else { 1.0 };
    let images = if image_count > 0 {
        IMAGE_TILE_MM + BOX_PADDING_MM
    } else {
        0.0
    };
    BOX_PADDING_MM * 2.0 + HEADING_HEIGHT_MM + LINE_HEIGHT_MM * text_lines + images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_tiles_fit_usable_width() {
        let row = IMAGE_TILE_MM * MAX_IMAGES_PER_SECTION as f32
            + IMAGE_GAP_MM * (MAX_IMAGES_PER_SECTION as f32 - 1.0);
        assert!(row <= USABLE_WIDTH_MM - BOX_PADDING_MM * 2.0 + 0.001);
    }

    #[test]
    fn test_tile_size() {
        assert!((IMAGE_TILE_MM - 44.5).abs() < 0.01);
    }

    #[test]
    fn test_section_height_grows_with_images() {
        assert!(lesion_section_height_mm(true, 4) > lesion_section_height_mm(true, 0));
        assert!(lesion_section_height_mm(true, 1) > lesion_section_height_mm(false, 1));
    }
}
