use crate::errors::AppError;
use crate::images::decode_data_url;
use crate::models::{CompanyInfo, GalleryItem, JournalEntry, MonthlyReport, StudentProfile};
use crate::storage::keys;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::ZipWriter;

const WRAP_WIDTH: usize = 76;

/// Plain-text journal, oldest day first.
pub fn journal_text(
    profile: &StudentProfile,
    company: &CompanyInfo,
    entries: &[JournalEntry],
) -> String {
    let mut sorted: Vec<&JournalEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let indented = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent("  ")
        .subsequent_indent("  ");

    let mut out = String::from("INTERNSHIP JOURNAL\n");
    if !profile.name.is_empty() {
        out.push_str(&format!("Student: {}\n", profile.name));
    }
    if !company.name.is_empty() {
        out.push_str(&format!("Company: {}\n", company.name));
    }
    out.push_str(&format!("Entries: {}\n", sorted.len()));
    out.push_str(&"=".repeat(WRAP_WIDTH));
    out.push('\n');

    for entry in sorted {
        out.push_str(&format!("\n[{}] {}\n", entry.date, entry.activity));
        for (label, text) in [
            ("", &entry.description),
            ("Learnings: ", &entry.learnings),
            ("Obstacles: ", &entry.obstacles),
        ] {
            if text.trim().is_empty() {
                continue;
            }
            out.push_str(&textwrap::fill(&format!("{label}{text}"), &indented));
            out.push('\n');
        }
    }
    out
}

pub fn reports_pdf(profile: &StudentProfile, reports: &[MonthlyReport]) -> Vec<u8> {
    let mut doc = PdfDocument::new();
    doc.line("Monthly Internship Reports", TITLE_SIZE);
    if !profile.name.is_empty() {
        doc.line(&format!("Student: {}", profile.name), BODY_SIZE);
    }
    doc.gap();

    if reports.is_empty() {
        doc.line("No reports yet.", BODY_SIZE);
    }

    for report in reports {
        doc.keep_together(4);
        doc.line(&report.title, HEADING_SIZE);
        doc.line(&format!("Month: {}", report.month), BODY_SIZE);
        doc.paragraph(&report.content);
        if !report.achievements.trim().is_empty() {
            doc.paragraph(&format!("Achievements: {}", report.achievements));
        }
        if !report.challenges.trim().is_empty() {
            doc.paragraph(&format!("Challenges: {}", report.challenges));
        }
        doc.gap();
    }

    info!(reports = reports.len(), pages = doc.page_refs.len(), "reports pdf rendered");
    doc.finish()
}

/// Zips every storage key as `<key>.json` plus the gallery images as files.
pub fn archive_zip(items: &BTreeMap<String, String>) -> Result<Vec<u8>, AppError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (key, raw) in items {
        let body = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => serde_json::to_string_pretty(&value)?,
            Err(_) => raw.clone(),
        };
        zip.start_file(format!("{key}.json"), options)
            .map_err(std::io::Error::other)?;
        zip.write_all(body.as_bytes())?;
    }

    let gallery: Vec<GalleryItem> = items
        .get(keys::GALLERY_ITEMS)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();
    for item in &gallery {
        let image = match decode_data_url(&item.image) {
            Ok(image) => image,
            Err(err) => {
                warn!(id = item.id, "skipping gallery image: {}", err.message);
                continue;
            }
        };
        zip.start_file(format!("gallery/{}.{}", item.id, image.extension()), options)
            .map_err(std::io::Error::other)?;
        zip.write_all(&image.bytes)?;
    }

    let cursor = zip.finish().map_err(std::io::Error::other)?;
    Ok(cursor.into_inner())
}

const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN: f32 = 50.0;
const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const LINE_GAP: f32 = 1.45;
const BODY_WRAP: usize = 95;

/// Flowing single-column A4 text with page numbers.
struct PdfDocument {
    pdf: Pdf,
    catalog_id: Ref,
    pages_id: Ref,
    font_id: Ref,
    next_id: i32,
    page_refs: Vec<Ref>,
    page: Option<(Ref, Content)>,
    y: f32,
}

impl PdfDocument {
    fn new() -> Self {
        let mut pdf = Pdf::new();
        let font_id = Ref::new(3);
        pdf.type1_font(font_id).base_font(Name(b"Helvetica"));
        Self {
            pdf,
            catalog_id: Ref::new(1),
            pages_id: Ref::new(2),
            font_id,
            next_id: 4,
            page_refs: Vec::new(),
            page: None,
            y: 0.0,
        }
    }

    fn fresh_ref(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn start_page(&mut self) {
        self.end_page();
        let page_id = self.fresh_ref();
        let content_id = self.fresh_ref();
        self.page_refs.push(page_id);

        let mut page = self.pdf.page(page_id);
        page.parent(self.pages_id)
            .media_box(Rect::new(0.0, 0.0, PAGE_W, PAGE_H))
            .contents(content_id);
        page.resources().fonts().pair(Name(b"F1"), self.font_id);
        drop(page);

        let mut content = Content::new();
        let number = format!("Page {}", self.page_refs.len());
        draw_text(&mut content, PAGE_W - MARGIN - 40.0, MARGIN / 2.0, 9.0, &number);
        self.page = Some((content_id, content));
        self.y = PAGE_H - MARGIN;
    }

    fn end_page(&mut self) {
        if let Some((id, content)) = self.page.take() {
            self.pdf.stream(id, &content.finish());
        }
    }

    /// Starts a new page unless `lines` body lines still fit.
    fn keep_together(&mut self, lines: usize) {
        let needed = lines as f32 * BODY_SIZE * LINE_GAP;
        if self.page.is_none() || self.y - needed < MARGIN {
            self.start_page();
        }
    }

    fn line(&mut self, text: &str, size: f32) {
        let advance = size * LINE_GAP;
        if self.page.is_none() || self.y - advance < MARGIN {
            self.start_page();
        }
        self.y -= advance;
        let y = self.y;
        if let Some((_, content)) = self.page.as_mut() {
            draw_text(content, MARGIN, y, size, text);
        }
    }

    fn paragraph(&mut self, text: &str) {
        for raw in text.lines() {
            if raw.trim().is_empty() {
                self.gap();
                continue;
            }
            for wrapped in textwrap::wrap(raw, BODY_WRAP) {
                self.line(&wrapped, BODY_SIZE);
            }
        }
    }

    fn gap(&mut self) {
        self.y -= BODY_SIZE;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.page.is_none() {
            self.start_page();
        }
        self.end_page();
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        let mut pages = self.pdf.pages(self.pages_id);
        pages.count(self.page_refs.len() as i32);
        pages.kids(self.page_refs.clone());
        drop(pages);
        self.pdf.finish()
    }
}

fn draw_text(content: &mut Content, x: f32, y: f32, size: f32, text: &str) {
    // The standard Helvetica font only covers Latin-1.
    let latin: Vec<u8> = text
        .chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect();
    content.begin_text();
    content.set_font(Name(b"F1"), size);
    content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y]);
    content.show(Str(&latin));
    content.end_text();
}
