use std::sync::Arc;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use super::pdf_renderer::DocumentRenderer;
use crate::error::ReportError;
use crate::metrics::REPORT_PAGES;
use crate::models::{Report, ReportDocument, ReportHeader, ReportSnapshot, TranscriptLine};
use crate::utils::time::{filename_stamp, format_duration_compact, to_iso};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const UNANSWERED_PLACEHOLDER: &str = "(javob berilmagan)";
const FILENAME_JOINER: &str = "_";
const FILENAME_FALLBACK: &str = "user";
const REPORT_EXTENSION: &str = "pdf";
const REPORT_TITLE: &str = "Test natijalari";

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref FILENAME_FORBIDDEN: Regex = Regex::new(r"[^\p{L}\p{N}_-]").unwrap();
}

/// Page measurements in millimetres plus the wrap width in characters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
    pub line_height_mm: f32,
    pub block_gap_mm: f32,
    pub chars_per_line: usize,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 20.0,
            line_height_mm: 5.0,
            block_gap_mm: 3.0,
            chars_per_line: 90,
        }
    }

    pub fn usable_height(&self) -> f32 {
        self.height_mm - 2.0 * self.margin_mm
    }

    fn validate(&self) -> Result<(), ReportError> {
        if self.chars_per_line == 0 {
            return Err(ReportError::Geometry("wrap width must be positive".into()));
        }
        if self.line_height_mm <= 0.0 {
            return Err(ReportError::Geometry("line height must be positive".into()));
        }
        if self.usable_height() < self.line_height_mm {
            return Err(ReportError::Geometry(format!(
                "usable height {:.1}mm cannot fit a single line",
                self.usable_height()
            )));
        }
        Ok(())
    }
}

/// One logical transcript line after wrapping, positioned on its page.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBlock {
    pub transcript_index: usize,
    /// Distance from the top margin to the first baseline of the block.
    pub offset_mm: f32,
    pub lines: Vec<String>,
    /// Set on the second and later pieces of a block taller than a page.
    pub continued: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutPage {
    pub blocks: Vec<LayoutBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub geometry: PageGeometry,
    pub header_lines: Vec<String>,
    pub pages: Vec<LayoutPage>,
}

impl ReportLayout {
    /// Height taken by the title and header block on the first page.
    pub fn header_height(&self) -> f32 {
        let g = &self.geometry;
        // title counts as two lines
        (self.header_lines.len() as f32 + 2.0) * g.line_height_mm + g.block_gap_mm
    }
}

pub fn build_report(snapshot: &ReportSnapshot) -> Report {
    let score = snapshot.score();

    let header = ReportHeader {
        participant_name: snapshot.participant_name.trim().to_string(),
        started_at: to_iso(snapshot.started_at),
        finished_at: to_iso(snapshot.finished_at),
        duration: format_duration_compact(snapshot.elapsed_seconds()),
        score: format!("{}/{}", score.correct, score.total),
        violations: snapshot.violation_count,
    };

    let transcript = snapshot
        .questions
        .iter()
        .enumerate()
        .map(|(idx, question)| TranscriptLine {
            index: idx + 1,
            prompt: question.prompt.clone(),
            chosen: snapshot.answers.get(&question.id).map(str::to_string),
            correct: question.correct_option.clone(),
        })
        .collect();

    Report {
        header,
        score,
        transcript,
    }
}

/// Participant name reduced to letters, digits, `_` and `-`.
pub fn sanitize_name(name: &str) -> String {
    let joined = WHITESPACE_RUN.replace_all(name.trim(), FILENAME_JOINER);
    let cleaned = FILENAME_FORBIDDEN.replace_all(&joined, "");
    if cleaned.is_empty() {
        FILENAME_FALLBACK.to_string()
    } else {
        cleaned.into_owned()
    }
}

pub fn report_filename(name: &str, finished_at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        sanitize_name(name),
        filename_stamp(finished_at),
        REPORT_EXTENSION
    )
}

/// Greedy word wrap by character count. Words longer than the width are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();

        while chars.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(max_chars);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let word_len = chars.len();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars);
        current_len += word_len;
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn transcript_text(line: &TranscriptLine, max_chars: usize) -> Vec<String> {
    let chosen = line.chosen.as_deref().unwrap_or(UNANSWERED_PLACEHOLDER);
    let mut lines = wrap_text(&format!("{}. {}", line.index, line.prompt), max_chars);
    lines.extend(wrap_text(
        &format!("Javob: {}  |  To'g'ri javob: {}", chosen, line.correct),
        max_chars,
    ));
    lines
}

fn header_lines(header: &ReportHeader) -> Vec<String> {
    vec![
        format!("Ishtirokchi: {}", header.participant_name),
        format!("Boshlangan: {}", header.started_at),
        format!("Tugagan: {}", header.finished_at),
        format!("Davomiylik: {}", header.duration),
        format!("Natija: {}", header.score),
        format!("Chalg'ishlar: {}", header.violations),
    ]
}

/// Places transcript blocks on pages. A block moves to a fresh page when it
/// would cross the bottom margin and is kept whole whenever it fits on one
/// page. Only a block taller than a full page continues on the next one.
pub fn paginate(report: &Report, geometry: PageGeometry) -> Result<ReportLayout, ReportError> {
    geometry.validate()?;

    let mut layout = ReportLayout {
        title: REPORT_TITLE.to_string(),
        geometry,
        header_lines: header_lines(&report.header),
        pages: Vec::new(),
    };

    let usable = geometry.usable_height();
    let line_height = geometry.line_height_mm;
    let mut page = LayoutPage::default();
    let mut offset = layout.header_height();

    for (idx, line) in report.transcript.iter().enumerate() {
        let lines = transcript_text(line, geometry.chars_per_line);
        let block_height = lines.len() as f32 * line_height + geometry.block_gap_mm;

        let page_has_content = !page.blocks.is_empty() || layout.pages.is_empty();
        if offset + block_height > usable && page_has_content {
            layout.pages.push(std::mem::take(&mut page));
            offset = 0.0;
        }

        if offset + block_height <= usable {
            page.blocks.push(LayoutBlock {
                transcript_index: idx,
                offset_mm: offset,
                lines,
                continued: false,
            });
            offset += block_height;
            continue;
        }

        let mut remaining = lines;
        let mut continued = false;
        while !remaining.is_empty() {
            // small epsilon so float rounding never loses a line that fits exactly
            let room = ((usable - offset) / line_height + 1e-3).floor().max(0.0) as usize;
            if room == 0 {
                layout.pages.push(std::mem::take(&mut page));
                offset = 0.0;
                continue;
            }

            let rest = remaining.split_off(room.min(remaining.len()));
            let piece_height = remaining.len() as f32 * line_height;
            page.blocks.push(LayoutBlock {
                transcript_index: idx,
                offset_mm: offset,
                lines: std::mem::replace(&mut remaining, rest),
                continued,
            });
            offset += piece_height;
            continued = true;

            if remaining.is_empty() {
                offset += geometry.block_gap_mm;
            } else {
                layout.pages.push(std::mem::take(&mut page));
                offset = 0.0;
            }
        }
    }

    layout.pages.push(page);
    Ok(layout)
}

/// Turns a finish-time snapshot into the uploadable report document.
pub struct ReportBuilder {
    renderer: Arc<dyn DocumentRenderer>,
    geometry: PageGeometry,
}

impl ReportBuilder {
    pub fn new(renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self {
            renderer,
            geometry: PageGeometry::a4(),
        }
    }

    pub fn generate(&self, snapshot: &ReportSnapshot) -> Result<(Report, ReportDocument), ReportError> {
        let report = build_report(snapshot);
        let layout = paginate(&report, self.geometry)?;
        let bytes = self.renderer.render(&layout)?;
        if bytes.is_empty() {
            return Err(ReportError::EmptyDocument);
        }

        let page_count = layout.pages.len();
        REPORT_PAGES.observe(page_count as f64);

        let document = ReportDocument {
            filename: report_filename(&snapshot.participant_name, snapshot.finished_at),
            content_type: PDF_CONTENT_TYPE,
            bytes,
            page_count,
        };

        tracing::info!(
            "Report generated: file={}, pages={}, score={}",
            document.filename,
            page_count,
            report.score
        );

        Ok((report, document))
    }
}
