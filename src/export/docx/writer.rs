//! Article to Office Open XML.

use super::numbering::ListNumbering;
use super::styles;
use crate::export::{nodes, ExportError, Format, Node};
use crate::model::{
    Article, BlockKind, ContentBlock, ImageSource, ListKind, SECTION_HEADING_LEVEL,
};
use docx_rs::*;
use std::io::Cursor;

/// Embedded images are scaled to six inches wide, in EMU.
const IMAGE_WIDTH_EMU: u32 = 6 * 914_400;

pub(super) fn render_docx(article: &Article) -> Result<Vec<u8>, ExportError> {
    let docx = DocxWriter::new().write_article(article);
    let mut buffer = Vec::new();
    docx.build()
        .pack(&mut Cursor::new(&mut buffer))
        .map_err(|e| ExportError::render(Format::Docx, e))?;
    Ok(buffer)
}

struct DocxWriter {
    numbering: ListNumbering,
}

impl DocxWriter {
    fn new() -> Self {
        Self {
            numbering: ListNumbering::new(),
        }
    }

    fn write_article(&mut self, article: &Article) -> Docx {
        let mut docx = styles::add_styles(Docx::new());
        docx = docx.add_paragraph(
            Paragraph::new()
                .style(styles::TITLE)
                .align(AlignmentType::Center)
                .add_run(Run::new().add_text(&article.title)),
        );
        docx = docx.add_paragraph(text_paragraph(&article.byline()));
        if let Some(tags) = article.tag_line() {
            docx = docx.add_paragraph(text_paragraph(&tags));
        }
        if let Some(reading_time) = article.reading_time_label() {
            docx = docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text(reading_time).italic()));
        }
        docx = docx.add_paragraph(
            Paragraph::new().add_run(Run::new().add_break(BreakType::TextWrapping)),
        );

        for node in nodes(article) {
            docx = match node {
                Node::SectionTitle(title) => {
                    docx.add_paragraph(heading_paragraph(SECTION_HEADING_LEVEL, title))
                }
                Node::Block(block) => self.write_block(docx, block),
            };
        }
        docx
    }

    fn write_block(&mut self, docx: Docx, block: &ContentBlock) -> Docx {
        match block.kind {
            BlockKind::Heading => {
                docx.add_paragraph(heading_paragraph(block.heading_level(), &block.content))
            }
            BlockKind::Code => docx.add_paragraph(code_paragraph(&block.content)),
            BlockKind::Quote => docx.add_paragraph(
                Paragraph::new()
                    .style(styles::QUOTE)
                    .add_run(Run::new().add_text(block.content.trim())),
            ),
            BlockKind::List => self.write_list(docx, block),
            BlockKind::Image => write_image(docx, block),
            BlockKind::Text | BlockKind::Unrecognized(_) => {
                docx.add_paragraph(text_paragraph(&block.content))
            }
        }
    }

    fn write_list(&mut self, docx: Docx, block: &ContentBlock) -> Docx {
        let items = block.list_items();
        if items.is_empty() {
            return docx;
        }
        let ordered = block.list_kind() == ListKind::Ordered;
        let style = if ordered {
            styles::LIST_NUMBER
        } else {
            styles::LIST_BULLET
        };
        let (mut docx, num_id) = self.numbering.create(docx, ordered);
        for item in items {
            docx = docx.add_paragraph(
                Paragraph::new()
                    .style(style)
                    .numbering(NumberingId::new(num_id), IndentLevel::new(0))
                    .add_run(Run::new().add_text(item)),
            );
        }
        docx
    }
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn heading_paragraph(level: u8, text: &str) -> Paragraph {
    Paragraph::new()
        .style(&styles::heading(level))
        .add_run(Run::new().add_text(text.trim()))
}

/// One monospace run; source lines are joined with line breaks.
fn code_paragraph(code: &str) -> Paragraph {
    let mut run = Run::new().fonts(styles::code_fonts()).size(styles::CODE_SIZE);
    for (i, line) in code.trim_end_matches('\n').lines().enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    Paragraph::new().style(styles::CODE_BLOCK).add_run(run)
}

/// Local images are embedded; remote ones and unreadable files become the placeholder.
fn write_image(docx: Docx, block: &ContentBlock) -> Docx {
    let pic = match block.image_source() {
        ImageSource::Local(path) => match std::fs::read(path) {
            Ok(data) => match load_picture(&data) {
                Ok(pic) => Some(pic),
                Err(e) => {
                    log::warn!(
                        "Image {} could not be decoded: {}. Using placeholder.",
                        path.display(),
                        e
                    );
                    None
                }
            },
            Err(e) => {
                log::warn!(
                    "Image {} could not be read: {}. Using placeholder.",
                    path.display(),
                    e
                );
                None
            }
        },
        ImageSource::Remote(_) => None,
    };

    let docx = match pic {
        Some(pic) => docx.add_paragraph(
            Paragraph::new()
                .align(AlignmentType::Center)
                .add_run(Run::new().add_image(pic)),
        ),
        None => docx.add_paragraph(text_paragraph(&block.image_placeholder())),
    };
    match block.alt() {
        Some(alt) => docx.add_paragraph(
            Paragraph::new()
                .style(styles::CAPTION)
                .add_run(Run::new().add_text(alt)),
        ),
        None => docx,
    }
}

/// Decode any supported image and re-encode it as PNG at six inches wide.
fn load_picture(data: &[u8]) -> Result<Pic, image::ImageError> {
    let img = image::load_from_memory(data)?;
    let (width, height) = (img.width(), img.height());
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    let height_emu =
        (u64::from(IMAGE_WIDTH_EMU) * u64::from(height) / u64::from(width.max(1))) as u32;
    Ok(Pic::new_with_dimensions(png, width, height).size(IMAGE_WIDTH_EMU, height_emu))
}
