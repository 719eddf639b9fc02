//! Paragraph styles referenced by the DOCX writer.

use docx_rs::*;

pub(super) const TITLE: &str = "Title";
pub(super) const CODE_BLOCK: &str = "CodeBlock";
pub(super) const QUOTE: &str = "Quote";
pub(super) const CAPTION: &str = "Caption";
pub(super) const LIST_BULLET: &str = "ListBullet";
pub(super) const LIST_NUMBER: &str = "ListNumber";

pub(super) const CODE_FONT: &str = "Courier New";
/// 10pt, in half-points.
pub(super) const CODE_SIZE: usize = 20;

pub(super) fn heading(level: u8) -> String {
    format!("Heading{}", level)
}

fn heading_style(level: u8) -> Style {
    let size = match level {
        1 => 32,
        2 => 28,
        3 => 26,
        4 => 24,
        5 => 22,
        _ => 20,
    };
    Style::new(heading(level), StyleType::Paragraph)
        .name(format!("Heading {}", level))
        .size(size)
        .bold()
}

pub(super) fn code_fonts() -> RunFonts {
    RunFonts::new()
        .ascii(CODE_FONT)
        .hi_ansi(CODE_FONT)
        .east_asia(CODE_FONT)
        .cs(CODE_FONT)
}

/// Register the title, heading 1-9, code, quote, caption and list styles.
pub(super) fn add_styles(docx: Docx) -> Docx {
    let mut docx = docx.add_style(
        Style::new(TITLE, StyleType::Paragraph)
            .name("Title")
            .size(48)
            .bold()
            .align(AlignmentType::Center),
    );
    for level in 1..=9 {
        docx = docx.add_style(heading_style(level));
    }
    docx.add_style(
        Style::new(CODE_BLOCK, StyleType::Paragraph)
            .name("Code Block")
            .fonts(code_fonts())
            .size(CODE_SIZE),
    )
    .add_style(
        Style::new(QUOTE, StyleType::Paragraph)
            .name("Quote")
            .indent(Some(720), None, None, None)
            .italic(),
    )
    .add_style(
        Style::new(CAPTION, StyleType::Paragraph)
            .name("Caption")
            .italic()
            .size(18)
            .align(AlignmentType::Center),
    )
    .add_style(Style::new(LIST_BULLET, StyleType::Paragraph).name("List Bullet"))
    .add_style(Style::new(LIST_NUMBER, StyleType::Paragraph).name("List Number"))
}
