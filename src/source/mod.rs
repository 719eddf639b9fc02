//! Article sources: URL fetch + parse, local HTML, or a JSON article file.

mod client;
mod error;
mod parser;

pub use client::{Fetcher, FetcherBuilder};
pub use error::SourceError;
pub use parser::parse_article;

pub(crate) use client::DEFAULT_TIMEOUT_SECS;

use crate::export::Format;
use crate::model::Article;
use reqwest::Url;
use std::path::{Path, PathBuf};

/// Publication domains served by Medium outside `medium.com`.
const MEDIUM_PUBLICATION_HOSTS: &[&str] = &[
    "towardsdatascience.com",
    "betterprogramming.pub",
    "levelup.gitconnected.com",
    "uxdesign.cc",
    "javascript.plainenglish.io",
    "itnext.io",
    "blog.devgenius.io",
];

const MAX_FILENAME_CHARS: usize = 100;

/// Where an article comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleSource {
    Url(String),
    Html(PathBuf),
    Json(PathBuf),
}

impl ArticleSource {
    /// Classify a CLI argument: http(s) URLs, `.json` files, and anything else existing on disk
    /// as HTML.
    pub fn detect(input: &str) -> Result<ArticleSource, SourceError> {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|e| SourceError::InvalidUrl {
                input: input.to_string(),
                reason: e.to_string(),
            })?;
            if url.host_str().is_none() {
                return Err(SourceError::InvalidUrl {
                    input: input.to_string(),
                    reason: "missing host".to_string(),
                });
            }
            return Ok(ArticleSource::Url(normalize_url(trimmed)));
        }
        let path = PathBuf::from(trimmed);
        if !path.is_file() {
            return Err(SourceError::InvalidUrl {
                input: input.to_string(),
                reason: "not an http(s) URL or an existing file".to_string(),
            });
        }
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        Ok(if is_json {
            ArticleSource::Json(path)
        } else {
            ArticleSource::Html(path)
        })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ArticleSource::Url(url) => Some(url),
            _ => None,
        }
    }
}

/// Load the article a source points at. Only URL sources touch the network.
pub fn load_article(source: &ArticleSource, fetcher: &Fetcher) -> Result<Article, SourceError> {
    match source {
        ArticleSource::Url(url) => {
            let html = fetcher.fetch_html(url)?;
            parse_article(&html, Some(url))
        }
        ArticleSource::Html(path) => {
            let html = read_file(path)?;
            parse_article(&html, None)
        }
        ArticleSource::Json(path) => {
            let json = read_file(path)?;
            serde_json::from_str(&json).map_err(|source| SourceError::Json {
                path: path.clone(),
                source,
            })
        }
    }
}

fn read_file(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn is_medium_host(host: &str) -> bool {
    host == "medium.com" || host.ends_with(".medium.com") || MEDIUM_PUBLICATION_HOSTS.contains(&host)
}

/// Drop tracking query and fragment from Medium URLs. Other URLs and unparseable input are
/// returned unchanged.
pub fn normalize_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let medium = parsed
        .host_str()
        .map(|h| is_medium_host(&h.to_lowercase()))
        .unwrap_or(false);
    if !medium {
        return url.to_string();
    }
    parsed.set_query(None);
    parsed.set_fragment(None);
    parsed.to_string()
}

/// Strip a known site suffix from the end of a page title so that titles containing " | " or
/// " - " themselves are preserved.
pub fn strip_title_site_suffix(s: &str, suffixes: &[&str]) -> String {
    let mut t = s.trim();
    for suffix in suffixes {
        if t.ends_with(suffix) {
            t = t[..t.len() - suffix.len()].trim();
            break;
        }
    }
    t.to_string()
}

/// Filename-safe form of a title: runs of non-alphanumerics become `_`, at most 100 chars.
pub fn safe_filename(title: &str) -> String {
    let mut out = String::new();
    let mut pending_sep = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    let mut out: String = out.chars().take(MAX_FILENAME_CHARS).collect();
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("article");
    }
    out
}

/// `<dir>/<safe title>_<host>.<ext>` for URL sources, `<dir>/<safe title>.<ext>` otherwise.
pub fn default_output_path(dir: &Path, title: &str, url: Option<&str>, format: Format) -> PathBuf {
    let base = safe_filename(title);
    let host = url
        .and_then(|u| Url::parse(u).ok())
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()));
    let name = match host {
        Some(host) => format!("{}_{}.{}", base, host, format.extension()),
        None => format!("{}.{}", base, format.extension()),
    };
    dir.join(name)
}

/// Sources listed one per line; blank lines and `#` comments are skipped.
pub fn read_source_list(path: &Path) -> Result<Vec<String>, SourceError> {
    let text = read_file(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_article;
    use std::error::Error;

    #[test]
    fn normalize_strips_query_on_medium_hosts() {
        assert_eq!(
            normalize_url("https://medium.com/@user/article-123?source=rss"),
            "https://medium.com/@user/article-123"
        );
        assert_eq!(
            normalize_url("https://towardsdatascience.com/article-123?source=rss#top"),
            "https://towardsdatascience.com/article-123"
        );
        assert_eq!(
            normalize_url("https://pub.medium.com/post?x=1"),
            "https://pub.medium.com/post"
        );
    }

    #[test]
    fn normalize_leaves_other_urls_alone() {
        assert_eq!(
            normalize_url("https://example.com/article?id=123"),
            "https://example.com/article?id=123"
        );
        assert_eq!(normalize_url("not a url"), "not a url");
    }

    #[test]
    fn safe_filename_replaces_separators() {
        assert_eq!(safe_filename("Hello World"), "Hello_World");
        assert_eq!(safe_filename("Hello, World!"), "Hello_World");
        assert_eq!(safe_filename("  --  a  --  b  --  "), "a_b");
        assert_eq!(safe_filename("???"), "article");
    }

    #[test]
    fn safe_filename_truncates() {
        let long = "a".repeat(150);
        assert_eq!(safe_filename(&long).len(), 100);
    }

    #[test]
    fn default_output_path_includes_host_for_urls() {
        let path = default_output_path(
            Path::new("."),
            "Test Article",
            Some("https://medium.com/test"),
            Format::Markdown,
        );
        assert_eq!(path, Path::new("./Test_Article_medium.com.md"));

        let local = default_output_path(Path::new("out"), "Test Article", None, Format::Epub);
        assert_eq!(local, Path::new("out/Test_Article.epub"));
    }

    #[test]
    fn strip_title_site_suffix_removes_trailing_suffix_only() {
        let suffixes = [" | Medium", " - Medium"];
        assert_eq!(
            strip_title_site_suffix("Part 1 | Part 2 | Medium", &suffixes),
            "Part 1 | Part 2"
        );
        assert_eq!(
            strip_title_site_suffix("Medium - Medium Rare", &suffixes),
            "Medium - Medium Rare"
        );
    }

    #[test]
    fn detect_classifies_inputs() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let json = dir.path().join("a.JSON");
        std::fs::write(&json, "{}")?;
        let html = dir.path().join("a.html");
        std::fs::write(&html, "<html></html>")?;

        assert_eq!(
            ArticleSource::detect("https://medium.com/p/1?source=x")?,
            ArticleSource::Url("https://medium.com/p/1".to_string())
        );
        assert_eq!(
            ArticleSource::detect(&json.to_string_lossy())?,
            ArticleSource::Json(json.clone())
        );
        assert_eq!(
            ArticleSource::detect(&html.to_string_lossy())?,
            ArticleSource::Html(html.clone())
        );
        assert!(matches!(
            ArticleSource::detect("definitely/not/here.html"),
            Err(SourceError::InvalidUrl { .. })
        ));
        Ok(())
    }

    #[test]
    fn json_and_html_files_load_without_network() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let json = dir.path().join("article.json");
        std::fs::write(&json, serde_json::to_string(&sample_article())?)?;
        let html = dir.path().join("article.html");
        std::fs::write(&html, "<html><head><title>Local</title></head><body><p>x</p></body></html>")?;

        let fetcher = Fetcher::new()?;
        assert_eq!(
            load_article(&ArticleSource::Json(json), &fetcher)?,
            sample_article()
        );
        let local = load_article(&ArticleSource::Html(html), &fetcher)?;
        assert_eq!(local.title, "Local");
        assert_eq!(local.url, None);
        Ok(())
    }

    #[test]
    fn invalid_json_file_is_a_json_error() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"title": "T"}"#)?;
        let result = load_article(&ArticleSource::Json(path), &Fetcher::new()?);
        assert!(matches!(result, Err(SourceError::Json { .. })));
        Ok(())
    }

    #[test]
    fn source_list_skips_blanks_and_comments() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "# reading list\nhttps://medium.com/a\n\n  https://medium.com/b  \n")?;
        assert_eq!(
            read_source_list(&path)?,
            ["https://medium.com/a", "https://medium.com/b"]
        );
        Ok(())
    }
}
