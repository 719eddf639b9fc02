//! List numbering definitions. Every list gets its own instance so ordered lists restart at 1.

use docx_rs::*;

#[derive(Debug)]
pub(super) struct ListNumbering {
    next_id: usize,
}

impl ListNumbering {
    pub(super) fn new() -> Self {
        Self { next_id: 1 }
    }

    fn list_level(format: &str, text: &str, hanging: i32) -> Level {
        Level::new(
            0,
            Start::new(1),
            NumberFormat::new(format),
            LevelText::new(text),
            LevelJc::new("left"),
        )
        .indent(
            Some(720),
            Some(SpecialIndentType::Hanging(hanging)),
            None,
            None,
        )
    }

    /// Register a single-level list definition; returns the numbering id for its paragraphs.
    pub(super) fn create(&mut self, docx: Docx, ordered: bool) -> (Docx, usize) {
        let id = self.next_id;
        self.next_id += 1;
        let level = if ordered {
            Self::list_level("decimal", "%1.", 420)
        } else {
            Self::list_level("bullet", "•", 360)
        };
        let docx = docx
            .add_abstract_numbering(AbstractNumbering::new(id).add_level(level))
            .add_numbering(Numbering::new(id, id));
        (docx, id)
    }
}
