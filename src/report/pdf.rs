use printpdf::{Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::path::Path;

use super::layout::{
    baseline_mm, estimate_text_width_mm, Element, Placed, ReportLayout, CAPTION_SIZE_PT,
    HEADER_HEIGHT_MM, HEADER_SIZE_PT, MARGIN_MM, NOTE_SIZE_PT, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    TEXT_SIZE_PT,
};
use super::{AssemblyError, ReportStyle};

const IMAGE_DPI: f32 = 300.0;
/// sfnt tag of OpenType fonts with CFF outlines
const CFF_SFNT_TAG: &[u8] = b"OTTO";
const LAYER_NAME: &str = "Layer 1";

/// What the renderer actually managed to draw
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    pub pages: usize,
    pub images_embedded: usize,
}

/// Draw `layout` into PDF bytes using the font at `font_path` for all text
pub fn render(
    layout: &ReportLayout,
    font_path: &Path,
    style: &ReportStyle,
) -> Result<(Vec<u8>, RenderStats), AssemblyError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(&style.title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);

    let font_load = |reason: String| AssemblyError::FontLoad {
        path: font_path.to_path_buf(),
        reason,
    };

    let font_bytes = fs_err::read(font_path).map_err(|e| font_load(e.to_string()))?;
    // printpdf embeds every external font as a TrueType program
    if font_bytes.starts_with(CFF_SFNT_TAG) {
        return Err(font_load(
            "CFF-flavoured OpenType is not supported, use a TrueType (glyf) font".to_string(),
        ));
    }
    let font = doc
        .add_external_font_with_subsetting(font_bytes.as_slice(), true)
        .map_err(|e| font_load(e.to_string()))?;

    let mut stats = RenderStats::default();

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_ref, layer_ref) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
            doc.get_page(page_ref).get_layer(layer_ref)
        };

        draw_running_header(&layer, &font, &style.title);
        for item in &page.items {
            if draw_item(&layer, &font, item) {
                stats.images_embedded += 1;
            }
        }
        stats.pages += 1;
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| AssemblyError::Render(e.to_string()))?;

    Ok((bytes, stats))
}

fn draw_running_header(layer: &PdfLayerReference, font: &IndirectFontRef, title: &str) {
    let width = estimate_text_width_mm(title, HEADER_SIZE_PT);
    let x = (PAGE_WIDTH_MM - MARGIN_MM - width).max(MARGIN_MM);
    let y = baseline_mm(MARGIN_MM, HEADER_HEIGHT_MM, HEADER_SIZE_PT);
    layer.use_text(title, HEADER_SIZE_PT, Mm(x), Mm(PAGE_HEIGHT_MM - y), font);
}

/// Returns true when an image was embedded
fn draw_item(layer: &PdfLayerReference, font: &IndirectFontRef, item: &Placed) -> bool {
    let text_at = |text: &str, size_pt: f32| {
        let y = baseline_mm(item.y_mm, item.height_mm, size_pt);
        layer.use_text(text, size_pt, Mm(item.x_mm), Mm(PAGE_HEIGHT_MM - y), font);
    };

    match &item.element {
        Element::Heading { text, size_pt } => text_at(text, *size_pt),
        Element::Note { text } => text_at(text, NOTE_SIZE_PT),
        Element::TextLine { text, .. } => text_at(text, TEXT_SIZE_PT),
        Element::Caption { text } => text_at(text, CAPTION_SIZE_PT),
        Element::Image {
            path,
            width_mm,
            height_mm,
        } => return draw_image(layer, item, path, *width_mm, *height_mm),
    }
    false
}

fn draw_image(
    layer: &PdfLayerReference,
    item: &Placed,
    path: &Path,
    width_mm: f32,
    height_mm: f32,
) -> bool {
    let decoded = match image::open(path) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("Skipping screenshot {}: {}", path.display(), e);
            return false;
        }
    };

    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());
    let (px_w, px_h) = (rgb.width() as f32, rgb.height() as f32);
    if px_w == 0.0 || px_h == 0.0 {
        tracing::warn!("Skipping empty screenshot {}", path.display());
        return false;
    }

    // Size the image would have at IMAGE_DPI, scaled to the box the layout chose
    let natural_w = px_w / IMAGE_DPI * 25.4;
    let natural_h = px_h / IMAGE_DPI * 25.4;

    Image::from_dynamic_image(&rgb).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(item.x_mm)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - item.y_mm - height_mm)),
            scale_x: Some(width_mm / natural_w),
            scale_y: Some(height_mm / natural_h),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::layout::{build_layout, ScreenshotInput};
    use tempfile::tempdir;

    const FIXTURE_FONT: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/RobotoMedium.ttf");

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_truetype_font_is_embedded_as_subset() {
        let dir = tempdir().unwrap();
        let shot = dir.path().join("img_001.jpg");
        image::RgbImage::from_pixel(48, 27, image::Rgb([0, 128, 0]))
            .save(&shot)
            .unwrap();

        let style = ReportStyle::default();
        let layout = build_layout(
            Some("[0:05] Hello world\n[1:30] Market is up\n"),
            &[ScreenshotInput {
                path: shot,
                dimensions: Some((48, 27)),
            }],
            &style,
        );

        let (bytes, stats) = render(&layout, Path::new(FIXTURE_FONT), &style).unwrap();
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.images_embedded, 1);

        assert!(contains(&bytes, b"/FontFile2"));
        assert!(!contains(&bytes, b"/FontFile3"));
        let font_len = std::fs::metadata(FIXTURE_FONT).unwrap().len() as usize;
        assert!(
            bytes.len() < font_len,
            "report of {} bytes embeds the whole {} byte font",
            bytes.len(),
            font_len
        );
    }

    #[test]
    fn test_cff_font_is_rejected() {
        let dir = tempdir().unwrap();
        let font = dir.path().join("NotoSansCJKtc-Regular.otf");
        let mut header = b"OTTO".to_vec();
        header.extend_from_slice(&[0, 10, 0, 128, 0, 3, 0, 32]);
        std::fs::write(&font, header).unwrap();

        let style = ReportStyle::default();
        let layout = build_layout(None, &[], &style);

        match render(&layout, &font, &style) {
            Err(AssemblyError::FontLoad { path, reason }) => {
                assert_eq!(path, font);
                assert!(reason.contains("CFF"));
            }
            other => panic!("expected FontLoad, got {:?}", other.map(|(_, stats)| stats)),
        }
    }
}
