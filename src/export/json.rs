//! JSON renderer: the article model as pretty-printed JSON, readable back by `convert`.

use super::{ExportError, Exporter, Format, Rendered};
use crate::model::Article;

#[derive(Debug, Clone, Default)]
pub struct JsonExporter;

impl JsonExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for JsonExporter {
    fn format(&self) -> Format {
        Format::Json
    }

    fn render(&self, article: &Article) -> Result<Rendered, ExportError> {
        let mut json =
            serde_json::to_string_pretty(article).map_err(|e| ExportError::render(Format::Json, e))?;
        json.push('\n');
        Ok(Rendered::Text(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_article;
    use std::error::Error;

    #[test]
    fn output_parses_back_to_the_same_article() -> Result<(), Box<dyn Error>> {
        let article = sample_article();
        let rendered = JsonExporter::new().render(&article)?;
        let text = rendered.as_text().ok_or("expected text")?;
        assert!(text.ends_with("}\n"));
        let back: Article = serde_json::from_str(text)?;
        assert_eq!(back, article);
        Ok(())
    }

    #[test]
    fn block_kind_serializes_as_type_field() -> Result<(), Box<dyn Error>> {
        let rendered = JsonExporter::new().render(&sample_article())?;
        let value: serde_json::Value = serde_json::from_slice(rendered.as_bytes())?;
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][1]["title"], "Sample Section");
        assert_eq!(value["content"][1]["blocks"][1]["metadata"]["language"], "python");
        Ok(())
    }
}
