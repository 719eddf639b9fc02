//! LaTeX renderer driven by a minijinja document template.

use super::{nodes, ExportError, Exporter, Format, Node, Rendered};
use crate::model::{
    Article, BlockKind, ContentBlock, ImageSource, ListKind, SECTION_HEADING_LEVEL,
};
use minijinja::{context, Environment};
use std::path::Path;

const TEMPLATE_NAME: &str = "article.tex";

/// Default document. Every variable is already LaTeX-escaped; `header` and `content` are markup.
pub const DEFAULT_LATEX_TEMPLATE: &str = r"\documentclass[11pt]{article}
\usepackage[utf8]{inputenc}
\usepackage[T1]{fontenc}
\usepackage{graphicx}
\usepackage{hyperref}
\title{ {{- title -}} }
\author{ {{- author -}} }
\date{ {{- date -}} }
\begin{document}
{{ header }}
{{ content }}
\end{document}
";

#[derive(Debug, Clone)]
pub struct LatexExporter {
    template: String,
}

impl Default for LatexExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl LatexExporter {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_LATEX_TEMPLATE.to_string(),
        }
    }

    /// Use a custom document template, compiled here so syntax errors surface at construction.
    pub fn with_template(template: impl Into<String>) -> Result<Self, ExportError> {
        let template = template.into();
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, &template)
            .map_err(|e| ExportError::Configuration {
                format: Format::Latex,
                reason: format!("invalid LaTeX template: {}", e),
            })?;
        drop(env);
        Ok(Self { template })
    }
}

impl Exporter for LatexExporter {
    fn format(&self) -> Format {
        Format::Latex
    }

    fn render(&self, article: &Article) -> Result<Rendered, ExportError> {
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, &self.template)
            .map_err(|e| ExportError::render(Format::Latex, e))?;
        let template = env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| ExportError::render(Format::Latex, e))?;

        let tags: Vec<String> = article.tags.iter().map(|t| latex_escape(t)).collect();
        let mut out = template
            .render(context! {
                title => latex_escape(&article.title),
                author => latex_escape(&article.author),
                date => latex_escape(&article.date.to_string()),
                byline => latex_escape(&article.byline()),
                url => article.url.as_deref().map(latex_escape),
                tags => tags,
                tag_line => article.tag_line().as_deref().map(latex_escape),
                reading_time => article.reading_time_label(),
                header => render_header(article),
                content => render_body(article),
            })
            .map_err(|e| ExportError::render(Format::Latex, e))?;
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(Rendered::Text(out))
    }
}

fn render_header(article: &Article) -> String {
    let mut out = String::from("\\begin{center}\n");
    out.push_str(&format!(
        "{{\\LARGE\\bfseries {}\\par}}\n\\vspace{{0.5em}}\n",
        latex_escape(&article.title)
    ));
    out.push_str(&format!("{}\\par\n", latex_escape(&article.byline())));
    if let Some(tags) = article.tag_line() {
        out.push_str(&format!("{}\\par\n", latex_escape(&tags)));
    }
    if let Some(reading_time) = article.reading_time_label() {
        out.push_str(&format!("\\emph{{{}}}\\par\n", latex_escape(&reading_time)));
    }
    out.push_str("\\end{center}\n\\noindent\\rule{\\textwidth}{0.4pt}");
    out
}

fn render_body(article: &Article) -> String {
    let mut out = String::new();
    for node in nodes(article) {
        match node {
            Node::SectionTitle(title) => push_heading(&mut out, SECTION_HEADING_LEVEL, title),
            Node::Block(block) => push_block(&mut out, block),
        }
    }
    let end = out.trim_end().len();
    out.truncate(end);
    out
}

fn push_heading(out: &mut String, level: u8, text: &str) {
    let command = match level {
        1 => "section",
        2 => "subsection",
        3 => "subsubsection",
        4 => "paragraph",
        _ => "subparagraph",
    };
    out.push_str(&format!("\\{}*{{{}}}\n\n", command, latex_escape(text.trim())));
}

fn push_block(out: &mut String, block: &ContentBlock) {
    match block.kind {
        BlockKind::Heading => push_heading(out, block.heading_level(), &block.content),
        BlockKind::Code => {
            // verbatim ends at the first literal terminator, so break any inside the code.
            let code = block
                .content
                .trim_end_matches('\n')
                .replace("\\end{verbatim}", "\\end {verbatim}");
            out.push_str(&format!("\\begin{{verbatim}}\n{}\n\\end{{verbatim}}\n\n", code));
        }
        BlockKind::Quote => {
            let text = block.content.trim();
            if !text.is_empty() {
                out.push_str(&format!(
                    "\\begin{{quote}}\n{}\n\\end{{quote}}\n\n",
                    latex_escape(text)
                ));
            }
        }
        BlockKind::List => {
            let items = block.list_items();
            if items.is_empty() {
                return;
            }
            let env = match block.list_kind() {
                ListKind::Ordered => "enumerate",
                ListKind::Unordered => "itemize",
            };
            out.push_str(&format!("\\begin{{{}}}\n", env));
            for item in items {
                out.push_str(&format!("  \\item {}\n", latex_escape(item)));
            }
            out.push_str(&format!("\\end{{{}}}\n\n", env));
        }
        BlockKind::Image => push_image(out, block),
        BlockKind::Text | BlockKind::Unrecognized(_) => {
            let text = block.content.trim();
            if !text.is_empty() {
                out.push_str(&latex_escape(text));
                out.push_str("\n\n");
            }
        }
    }
}

/// Local files become figures; remote images cannot be included by LaTeX and get the placeholder.
fn push_image(out: &mut String, block: &ContentBlock) {
    let graphic = match block.image_source() {
        ImageSource::Local(path) => graphics_path(path),
        ImageSource::Remote(_) => None,
    };
    match graphic {
        Some(path) => {
            out.push_str("\\begin{figure}[h]\n\\centering\n");
            out.push_str(&format!(
                "\\includegraphics[width=0.8\\textwidth]{{\\detokenize{{{}}}}}\n",
                path
            ));
            if let Some(alt) = block.alt() {
                out.push_str(&format!("\\caption{{{}}}\n", latex_escape(alt)));
            }
            out.push_str("\\end{figure}\n\n");
        }
        None => {
            out.push_str("\\begin{center}\n");
            out.push_str(&format!(
                "\\fbox{{{}}}\n",
                latex_escape(&block.image_placeholder())
            ));
            if let Some(alt) = block.alt() {
                out.push_str(&format!("\n\\emph{{{}}}\n", latex_escape(alt)));
            }
            out.push_str("\\end{center}\n\n");
        }
    }
}

/// A path `\detokenize` can carry verbatim. Characters that are still read as markup before
/// detokenizing (comments, groups, macros, parameters, line breaks) have no safe form.
fn graphics_path(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    if text.contains(|c: char| matches!(c, '%' | '{' | '}' | '\\' | '#' | '\n' | '\r')) {
        log::warn!(
            "Image path {} cannot be referenced from LaTeX; using placeholder.",
            path.display()
        );
        return None;
    }
    Some(text.into_owned())
}

/// Escape the characters LaTeX treats specially in running text.
pub(crate) fn latex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}
