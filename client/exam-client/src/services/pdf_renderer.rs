use std::panic::{catch_unwind, AssertUnwindSafe};

use printpdf::{
    BuiltinFont, Color, Greyscale, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, Rgb,
    TextItem,
};

use super::report_builder::ReportLayout;
use crate::error::ReportError;

/// Turns a paginated report layout into document bytes.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, layout: &ReportLayout) -> Result<Vec<u8>, ReportError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PdfRenderer {
    title_size: f32,
    body_size: f32,
    footer_size: f32,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self {
            title_size: 16.0,
            body_size: 10.0,
            footer_size: 8.0,
        }
    }
}

impl PdfRenderer {
    fn build_pages(&self, layout: &ReportLayout) -> Vec<PdfPage> {
        let g = layout.geometry;
        let top = g.height_mm - g.margin_mm;
        let accent_color = Color::Rgb(Rgb {
            r: 0.16,
            g: 0.4,
            b: 0.69,
            icc_profile: None,
        });
        let text_color = Color::Greyscale(Greyscale::new(0.08, None));
        let muted_color = Color::Greyscale(Greyscale::new(0.45, None));
        let page_total = layout.pages.len();

        layout
            .pages
            .iter()
            .enumerate()
            .map(|(page_idx, page)| {
                let mut ops = Vec::new();

                if page_idx == 0 {
                    push_pdf_text(
                        &mut ops,
                        Point::new(Mm(g.margin_mm), Mm(top)),
                        BuiltinFont::HelveticaBold,
                        self.title_size,
                        layout.title.clone(),
                        &accent_color,
                    );
                    let mut y = top - 2.0 * g.line_height_mm;
                    for line in &layout.header_lines {
                        push_pdf_text(
                            &mut ops,
                            Point::new(Mm(g.margin_mm), Mm(y)),
                            BuiltinFont::Helvetica,
                            self.body_size + 1.0,
                            line.clone(),
                            &text_color,
                        );
                        y -= g.line_height_mm;
                    }
                }

                for block in &page.blocks {
                    let mut y = top - block.offset_mm;
                    for (line_idx, line) in block.lines.iter().enumerate() {
                        let font = if line_idx == 0 && !block.continued {
                            BuiltinFont::HelveticaBold
                        } else {
                            BuiltinFont::Helvetica
                        };
                        push_pdf_text(
                            &mut ops,
                            Point::new(Mm(g.margin_mm), Mm(y)),
                            font,
                            self.body_size,
                            line.clone(),
                            &text_color,
                        );
                        y -= g.line_height_mm;
                    }
                }

                push_pdf_text(
                    &mut ops,
                    Point::new(Mm(g.width_mm - g.margin_mm - 20.0), Mm(g.margin_mm / 2.0)),
                    BuiltinFont::HelveticaOblique,
                    self.footer_size,
                    format!("Sahifa {} / {}", page_idx + 1, page_total),
                    &muted_color,
                );

                PdfPage::new(Mm(g.width_mm), Mm(g.height_mm), ops)
            })
            .collect()
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
        let pages = self.build_pages(layout);

        // printpdf reports problems by panicking or through warnings, never through Result
        let (bytes, warnings) = catch_unwind(AssertUnwindSafe(|| {
            let mut document = PdfDocument::new(&layout.title);
            let mut warnings = Vec::new();
            let bytes = document
                .with_pages(pages)
                .save(&PdfSaveOptions::default(), &mut warnings);
            (bytes, warnings)
        }))
        .map_err(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown renderer panic".to_string());
            ReportError::Renderer(message)
        })?;

        if !warnings.is_empty() {
            tracing::debug!("PDF renderer emitted {} warnings", warnings.len());
        }

        Ok(bytes)
    }
}

fn push_pdf_text(
    ops: &mut Vec<Op>,
    pos: Point,
    font: BuiltinFont,
    font_size: f32,
    text: String,
    color: &Color,
) {
    ops.extend([
        Op::StartTextSection,
        Op::SetTextCursor { pos },
        Op::SetFontSizeBuiltinFont {
            size: Pt(font_size),
            font,
        },
        Op::SetLineHeight {
            lh: Pt(font_size * 1.2),
        },
        Op::SetFillColor { col: color.clone() },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text)],
            font,
        },
        Op::EndTextSection,
    ]);
}
