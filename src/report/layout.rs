//! Page layout for the report, computed before anything is drawn.
//!
//! Coordinates are millimetres measured from the top-left corner of an A4
//! page. The renderer flips them into PDF space.

use std::path::PathBuf;

use super::ReportStyle;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 10.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

/// Height reserved for the running header on every page
pub const HEADER_HEIGHT_MM: f32 = 10.0;
pub const HEADER_SIZE_PT: f32 = 10.0;
const CONTENT_TOP_MM: f32 = MARGIN_MM + HEADER_HEIGHT_MM;
const CONTENT_BOTTOM_MM: f32 = PAGE_HEIGHT_MM - 20.0;

const HEADING_HEIGHT_MM: f32 = 10.0;
const HEADING_GAP_MM: f32 = 5.0;
pub const TRANSCRIPT_HEADING_PT: f32 = 16.0;
pub const SCREENSHOT_HEADING_PT: f32 = 14.0;

pub const NOTE_SIZE_PT: f32 = 9.0;
const NOTE_HEIGHT_MM: f32 = 6.0;

pub const TEXT_SIZE_PT: f32 = 10.0;
const TEXT_LINE_HEIGHT_MM: f32 = 6.0;

pub const CAPTION_SIZE_PT: f32 = 9.0;
const CAPTION_HEIGHT_MM: f32 = 8.0;
const IMAGE_GAP_MM: f32 = 2.0;
pub const IMAGE_WIDTH_MM: f32 = 170.0;
pub const IMAGES_PER_PAGE: usize = 2;

const PT_TO_MM: f32 = 25.4 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Transcript,
    Screenshots,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Heading { text: String, size_pt: f32 },
    Note { text: String },
    /// One wrapped line of transcript block `block`
    TextLine { block: usize, text: String },
    Caption { text: String },
    Image { path: PathBuf, width_mm: f32, height_mm: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub element: Element,
    pub x_mm: f32,
    pub y_mm: f32,
    pub height_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub section: Section,
    pub items: Vec<Placed>,
}

/// A screenshot handed to the layout, with its pixel size if readable
#[derive(Debug, Clone)]
pub struct ScreenshotInput {
    pub path: PathBuf,
    pub dimensions: Option<(u32, u32)>,
}

impl ScreenshotInput {
    /// `Time: img_001.jpg`
    pub fn caption(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("Time: {}", name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

impl ReportLayout {
    pub fn page_count(&self, section: Section) -> usize {
        self.pages.iter().filter(|p| p.section == section).count()
    }

    /// Transcript blocks in document order, wrapped lines joined by spaces
    pub fn transcript_blocks(&self) -> Vec<String> {
        let mut blocks: Vec<(usize, Vec<&str>)> = Vec::new();
        for item in self.items_in(Section::Transcript) {
            if let Element::TextLine { block, text } = &item.element {
                match blocks.last_mut() {
                    Some((last, lines)) if *last == *block => lines.push(text.as_str()),
                    _ => blocks.push((*block, vec![text.as_str()])),
                }
            }
        }
        blocks.into_iter().map(|(_, lines)| lines.join(" ")).collect()
    }

    /// Captions on each screenshot page
    pub fn captions_per_page(&self) -> Vec<Vec<String>> {
        self.pages
            .iter()
            .filter(|p| p.section == Section::Screenshots)
            .map(|p| {
                p.items
                    .iter()
                    .filter_map(|item| match &item.element {
                        Element::Caption { text } => Some(text.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.items_in(Section::Screenshots)
            .filter(|item| matches!(item.element, Element::Image { .. }))
            .count()
    }

    fn items_in(&self, section: Section) -> impl Iterator<Item = &Placed> {
        self.pages
            .iter()
            .filter(move |p| p.section == section)
            .flat_map(|p| p.items.iter())
    }
}

struct LayoutBuilder {
    pages: Vec<Page>,
    cursor_mm: f32,
}

impl LayoutBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            cursor_mm: CONTENT_TOP_MM,
        }
    }

    fn new_page(&mut self, section: Section) {
        self.pages.push(Page {
            section,
            items: Vec::new(),
        });
        self.cursor_mm = CONTENT_TOP_MM;
    }

    fn current_section(&self) -> Section {
        self.pages
            .last()
            .map(|p| p.section)
            .unwrap_or(Section::Transcript)
    }

    /// Start a new page in the same section if `height_mm` does not fit
    fn ensure_space(&mut self, height_mm: f32) {
        if self.pages.is_empty() {
            self.new_page(Section::Transcript);
        } else if self.cursor_mm + height_mm > CONTENT_BOTTOM_MM {
            let section = self.current_section();
            self.new_page(section);
        }
    }

    fn place(&mut self, element: Element, height_mm: f32) {
        let y_mm = self.cursor_mm;
        if let Some(page) = self.pages.last_mut() {
            page.items.push(Placed {
                element,
                x_mm: MARGIN_MM,
                y_mm,
                height_mm,
            });
        }
        self.cursor_mm += height_mm;
    }

    fn gap(&mut self, height_mm: f32) {
        self.cursor_mm += height_mm;
    }

    fn finish(self) -> ReportLayout {
        ReportLayout { pages: self.pages }
    }
}

/// Replace characters the report cannot show with `?`
pub fn sanitize_line(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\t' => ' ',
            '\u{FFFD}' => '?',
            c if c.is_control() => '?',
            c => c,
        })
        .collect()
}

/// How many narrow columns fit across `width_mm` at `size_pt`.
///
/// Narrow glyphs are taken as half an em; textwrap counts East Asian wide
/// characters as two columns, which makes them a full em.
fn columns_for(width_mm: f32, size_pt: f32) -> usize {
    let column_mm = size_pt * 0.5 * PT_TO_MM;
    ((width_mm / column_mm).floor() as usize).max(1)
}

/// Rough rendered width of `text`, for right alignment
pub fn estimate_text_width_mm(text: &str, size_pt: f32) -> f32 {
    let columns: usize = textwrap::core::display_width(text);
    columns as f32 * size_pt * 0.5 * PT_TO_MM
}

/// Largest image box that still lets two screenshots share a page
fn image_box(dimensions: (u32, u32)) -> (f32, f32) {
    let (w, h) = dimensions;
    let first_slot_top = CONTENT_TOP_MM + HEADING_HEIGHT_MM + HEADING_GAP_MM;
    let slot = (CONTENT_BOTTOM_MM - first_slot_top) / IMAGES_PER_PAGE as f32;
    let max_height = slot - CAPTION_HEIGHT_MM - IMAGE_GAP_MM;

    let aspect = h as f32 / w as f32;
    let height = IMAGE_WIDTH_MM * aspect;
    if height <= max_height {
        (IMAGE_WIDTH_MM, height)
    } else {
        (max_height / aspect, max_height)
    }
}

/// Lay out the transcript section followed by the screenshot section.
///
/// `transcript` is `None` when the transcript could not be read; the section
/// then holds only its heading.
pub fn build_layout(
    transcript: Option<&str>,
    screenshots: &[ScreenshotInput],
    style: &ReportStyle,
) -> ReportLayout {
    let mut builder = LayoutBuilder::new();

    builder.new_page(Section::Transcript);
    builder.place(
        Element::Heading {
            text: style.transcript_heading.clone(),
            size_pt: TRANSCRIPT_HEADING_PT,
        },
        HEADING_HEIGHT_MM,
    );
    if let Some(generated_at) = &style.generated_at {
        builder.place(
            Element::Note {
                text: generated_at.clone(),
            },
            NOTE_HEIGHT_MM,
        );
    }
    builder.gap(HEADING_GAP_MM);

    let columns = columns_for(CONTENT_WIDTH_MM, TEXT_SIZE_PT);
    let lines = transcript
        .into_iter()
        .flat_map(str::lines)
        .map(sanitize_line)
        .filter(|line| !line.trim().is_empty());

    for (block, line) in lines.enumerate() {
        for wrapped in textwrap::wrap(line.trim(), columns) {
            builder.ensure_space(TEXT_LINE_HEIGHT_MM);
            builder.place(
                Element::TextLine {
                    block,
                    text: wrapped.into_owned(),
                },
                TEXT_LINE_HEIGHT_MM,
            );
        }
    }

    builder.new_page(Section::Screenshots);
    builder.place(
        Element::Heading {
            text: style.screenshot_heading.clone(),
            size_pt: SCREENSHOT_HEADING_PT,
        },
        HEADING_HEIGHT_MM,
    );
    builder.gap(HEADING_GAP_MM);

    for (index, shot) in screenshots.iter().enumerate() {
        if index % IMAGES_PER_PAGE == 0 && index != 0 {
            builder.new_page(Section::Screenshots);
        }
        builder.place(
            Element::Caption {
                text: shot.caption(),
            },
            CAPTION_HEIGHT_MM,
        );
        if let Some(dimensions) = shot.dimensions.filter(|(w, h)| *w > 0 && *h > 0) {
            let (width_mm, height_mm) = image_box(dimensions);
            builder.place(
                Element::Image {
                    path: shot.path.clone(),
                    width_mm,
                    height_mm,
                },
                height_mm,
            );
            builder.gap(IMAGE_GAP_MM);
        }
    }

    builder.finish()
}

/// Baseline of text drawn in a cell starting at `y_mm`, top-down
pub fn baseline_mm(y_mm: f32, cell_height_mm: f32, size_pt: f32) -> f32 {
    y_mm + cell_height_mm / 2.0 + 0.3 * size_pt * PT_TO_MM
}
