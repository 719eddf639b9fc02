//! EPUB 3 writer: mimetype, container, OPF, nav (optional NCX), a title page, and one XHTML
//! document per part of the article.
//!
//! A part is a titled section, or a run of bare blocks and untitled sections between them.
//! Local images are packaged under `images/`; remote images get the textual placeholder.

use super::html::{html_escape, render_header, render_part, ImageTarget};
use super::{ExportError, Exporter, Format, Rendered};
use crate::model::{Article, ContentBlock, ContentItem, ImageSource};
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";

#[derive(Debug, Clone, Default)]
pub struct EpubExporter {
    include_ncx: bool,
}

impl EpubExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write toc.ncx for EPUB 2 reading systems.
    pub fn with_ncx(mut self, include_ncx: bool) -> Self {
        self.include_ncx = include_ncx;
        self
    }
}

impl Exporter for EpubExporter {
    fn format(&self) -> Format {
        Format::Epub
    }

    fn render(&self, article: &Article) -> Result<Rendered, ExportError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        write_package(article, self.include_ncx, &mut zip)
            .map_err(|e| ExportError::render(Format::Epub, e))?;
        let cursor = zip
            .finish()
            .map_err(|e| ExportError::render(Format::Epub, e))?;
        Ok(Rendered::Binary(cursor.into_inner()))
    }
}

struct Part<'a> {
    title: Option<&'a str>,
    blocks: Vec<&'a ContentBlock>,
}

impl Part<'_> {
    fn label(&self, index: usize) -> String {
        match self.title {
            Some(title) => title.trim().to_string(),
            None => format!("Part {}", index + 1),
        }
    }
}

fn parts(article: &Article) -> Vec<Part<'_>> {
    let mut parts: Vec<Part<'_>> = Vec::new();
    for item in &article.content {
        match item {
            ContentItem::Section(section) if section.heading().is_some() => parts.push(Part {
                title: section.heading(),
                blocks: section.blocks.iter().collect(),
            }),
            _ => match parts.last_mut() {
                Some(part) if part.title.is_none() => part.blocks.extend(item.blocks().iter()),
                _ => parts.push(Part {
                    title: None,
                    blocks: item.blocks().iter().collect(),
                }),
            },
        }
    }
    parts
}

struct PackagedImage {
    name: String,
    media_type: &'static str,
    data: Vec<u8>,
}

fn image_media_type(path: &Path) -> Option<(&'static str, &'static str)> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some(("png", "image/png")),
        "jpg" | "jpeg" => Some(("jpg", "image/jpeg")),
        "gif" => Some(("gif", "image/gif")),
        "svg" => Some(("svg", "image/svg+xml")),
        "webp" => Some(("webp", "image/webp")),
        _ => None,
    }
}

/// Read a local image into the package, or fall back to the placeholder.
fn package_image(block: &ContentBlock, images: &mut Vec<PackagedImage>) -> ImageTarget {
    let path = match block.image_source() {
        ImageSource::Local(path) => path,
        ImageSource::Remote(_) => return ImageTarget::Placeholder,
    };
    let Some((ext, media_type)) = image_media_type(path) else {
        log::warn!(
            "Image {} has an unsupported type; using placeholder.",
            path.display()
        );
        return ImageTarget::Placeholder;
    };
    match std::fs::read(path) {
        Ok(data) => {
            let name = format!("images/image-{}.{}", images.len() + 1, ext);
            images.push(PackagedImage {
                name: name.clone(),
                media_type,
                data,
            });
            ImageTarget::Src(name)
        }
        Err(e) => {
            log::warn!(
                "Image {} could not be read: {}. Using placeholder.",
                path.display(),
                e
            );
            ImageTarget::Placeholder
        }
    }
}

fn write_package(
    article: &Article,
    include_ncx: bool,
    zip: &mut ZipWriter<impl Write + Seek>,
) -> ZipResult<()> {
    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // mimetype must be the first entry, uncompressed.
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    let parts = parts(article);
    let mut images = Vec::new();
    let bodies: Vec<String> = parts
        .iter()
        .map(|part| {
            render_part(part.title, &part.blocks, &mut |block: &ContentBlock| {
                package_image(block, &mut images)
            })
        })
        .collect();

    write_opf(article, &parts, &images, include_ncx, zip, options_deflate)?;
    write_nav_xhtml(article, &parts, zip, options_deflate)?;
    if include_ncx {
        write_ncx(article, &parts, zip, options_deflate)?;
    }

    write_xhtml(
        zip,
        options_deflate,
        "title.xhtml",
        &article.title,
        &render_header(article),
    )?;
    for (i, (part, body)) in parts.iter().zip(&bodies).enumerate() {
        write_xhtml(
            zip,
            options_deflate,
            &format!("part-{}.xhtml", i + 1),
            &part.label(i),
            body,
        )?;
    }

    for image in &images {
        zip.start_file(format!("{}{}", OEBPS_PREFIX, image.name), options_deflate)?;
        zip.write_all(&image.data)?;
    }
    Ok(())
}

fn identifier(article: &Article) -> String {
    match article.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            let slug: Vec<String> = article
                .title
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase)
                .collect();
            format!("urn:mediumconv:{}", slug.join("-"))
        }
    }
}

fn write_opf(
    article: &Article,
    parts: &[Part<'_>],
    images: &[PackagedImage],
    include_ncx: bool,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> ZipResult<()> {
    let mut metadata = format!(
        r#"    <dc:identifier id="book-id">{}</dc:identifier>
    <dc:title>{}</dc:title>
    <dc:creator>{}</dc:creator>
    <dc:language>en</dc:language>
    <dc:date>{}</dc:date>
    <meta property="dcterms:modified">{}</meta>
"#,
        xml_escape(&identifier(article)),
        xml_escape(&article.title),
        xml_escape(&article.author),
        xml_escape(&article.date.to_string()),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
    );
    for tag in &article.tags {
        metadata.push_str(&format!("    <dc:subject>{}</dc:subject>\n", xml_escape(tag)));
    }
    if let Some(url) = &article.url {
        metadata.push_str(&format!("    <dc:source>{}</dc:source>\n", xml_escape(url)));
    }

    let mut manifest = String::from(
        r#"    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="title-page" href="title.xhtml" media-type="application/xhtml+xml"/>
"#,
    );
    if include_ncx {
        manifest.push_str(
            r#"    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
"#,
        );
    }
    for i in 0..parts.len() {
        manifest.push_str(&format!(
            r#"    <item id="part-{0}" href="part-{0}.xhtml" media-type="application/xhtml+xml"/>
"#,
            i + 1
        ));
    }
    for (i, image) in images.iter().enumerate() {
        manifest.push_str(&format!(
            r#"    <item id="image-{}" href="{}" media-type="{}"/>
"#,
            i + 1,
            image.name,
            image.media_type
        ));
    }

    let mut spine = String::from("    <itemref idref=\"title-page\"/>\n");
    for i in 0..parts.len() {
        spine.push_str(&format!("    <itemref idref=\"part-{}\"/>\n", i + 1));
    }
    let spine_open = if include_ncx {
        r#"<spine toc="ncx">"#
    } else {
        "<spine>"
    };

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
{metadata}  </metadata>
  <manifest>
{manifest}  </manifest>
  {spine_open}
{spine}  </spine>
</package>
"#
    );

    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), options)?;
    zip.write_all(opf.as_bytes())?;
    Ok(())
}

fn write_nav_xhtml(
    article: &Article,
    parts: &[Part<'_>],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> ZipResult<()> {
    let mut nav_links = format!(
        "      <li><a href=\"title.xhtml\">{}</a></li>\n",
        html_escape(&article.title)
    );
    for (i, part) in parts.iter().enumerate() {
        nav_links.push_str(&format!(
            "      <li><a href=\"part-{}.xhtml\">{}</a></li>\n",
            i + 1,
            html_escape(&part.label(i))
        ));
    }
    let nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
{}    </ol>
  </nav>
</body>
</html>
"#,
        nav_links
    );
    zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(nav.as_bytes())?;
    Ok(())
}

fn write_ncx(
    article: &Article,
    parts: &[Part<'_>],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> ZipResult<()> {
    let mut nav_points = format!(
        r#"    <navPoint id="navpoint-1" playOrder="1">
      <navLabel><text>{}</text></navLabel>
      <content src="title.xhtml"/>
    </navPoint>
"#,
        xml_escape(&article.title)
    );
    for (i, part) in parts.iter().enumerate() {
        nav_points.push_str(&format!(
            r#"    <navPoint id="navpoint-{0}" playOrder="{0}">
      <navLabel><text>{1}</text></navLabel>
      <content src="part-{2}.xhtml"/>
    </navPoint>
"#,
            i + 2,
            xml_escape(&part.label(i)),
            i + 1
        ));
    }
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
{}  </navMap>
</ncx>
"#,
        xml_escape(&identifier(article)),
        xml_escape(&article.title),
        nav_points
    );
    zip.start_file(format!("{}toc.ncx", OEBPS_PREFIX), options)?;
    zip.write_all(ncx.as_bytes())?;
    Ok(())
}

fn write_xhtml(
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
    name: &str,
    title: &str,
    body: &str,
) -> ZipResult<()> {
    let xhtml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
</head>
<body>
{}
</body>
</html>
"#,
        html_escape(title),
        body
    );
    zip.start_file(format!("{}{}", OEBPS_PREFIX, name), options)?;
    zip.write_all(xhtml.as_bytes())?;
    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{sample_article, Section};
    use std::error::Error;
    use std::io::Read;
    use zip::read::ZipArchive;

    type Archive = ZipArchive<Cursor<Vec<u8>>>;

    fn archive(exporter: &EpubExporter, article: &Article) -> Result<Archive, Box<dyn Error>> {
        let rendered = exporter.render(article)?;
        assert!(matches!(rendered, Rendered::Binary(_)));
        Ok(ZipArchive::new(Cursor::new(rendered.into_bytes()))?)
    }

    fn read_entry(zip: &mut Archive, name: &str) -> Result<String, Box<dyn Error>> {
        let mut s = String::new();
        zip.by_name(name)?.read_to_string(&mut s)?;
        Ok(s)
    }

    #[test]
    fn package_layout_without_ncx() -> Result<(), Box<dyn Error>> {
        let mut zip = archive(&EpubExporter::new(), &sample_article())?;
        assert_eq!(zip.by_index(0)?.name(), "mimetype");
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        for expected in [
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/nav.xhtml",
            "OEBPS/title.xhtml",
            "OEBPS/part-1.xhtml",
            "OEBPS/part-2.xhtml",
            "OEBPS/part-3.xhtml",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert!(!names.iter().any(|n| n == "OEBPS/toc.ncx"));
        assert_eq!(read_entry(&mut zip, "mimetype")?, "application/epub+zip");
        Ok(())
    }

    #[test]
    fn with_ncx_adds_toc_ncx_and_spine_reference() -> Result<(), Box<dyn Error>> {
        let mut zip = archive(&EpubExporter::new().with_ncx(true), &sample_article())?;
        let ncx = read_entry(&mut zip, "OEBPS/toc.ncx")?;
        assert!(ncx.contains("<text>Sample Section</text>"));
        let opf = read_entry(&mut zip, "OEBPS/content.opf")?;
        assert!(opf.contains(r#"<spine toc="ncx">"#));
        Ok(())
    }

    #[test]
    fn opf_carries_article_metadata() -> Result<(), Box<dyn Error>> {
        let mut zip = archive(&EpubExporter::new(), &sample_article())?;
        let opf = read_entry(&mut zip, "OEBPS/content.opf")?;
        assert!(opf.contains(
            "<dc:identifier id=\"book-id\">https://medium.com/sample-article</dc:identifier>"
        ));
        assert!(opf.contains("<dc:title>Sample Article Title</dc:title>"));
        assert!(opf.contains("<dc:creator>Sample Author</dc:creator>"));
        assert!(opf.contains("<dc:date>2023-01-01</dc:date>"));
        let test = opf.find("<dc:subject>test</dc:subject>").unwrap_or(usize::MAX);
        let sample = opf.find("<dc:subject>sample</dc:subject>").unwrap_or(usize::MAX);
        assert!(test < sample && sample != usize::MAX);
        assert!(opf.contains("dcterms:modified"));
        Ok(())
    }

    #[test]
    fn title_page_has_header_and_parts_follow_content_order() -> Result<(), Box<dyn Error>> {
        let mut zip = archive(&EpubExporter::new(), &sample_article())?;
        let title = read_entry(&mut zip, "OEBPS/title.xhtml")?;
        assert!(title.contains("<h1>Sample Article Title</h1>"));
        assert!(title.contains("By Sample Author | 2023-01-01"));
        assert!(title.contains("#test, #sample"));
        assert!(title.contains("5 min read"));

        let first = read_entry(&mut zip, "OEBPS/part-1.xhtml")?;
        assert!(first.contains("<p>This is a sample paragraph"));
        let second = read_entry(&mut zip, "OEBPS/part-2.xhtml")?;
        let heading = second.find("<h1>Sample Section</h1>").unwrap_or(usize::MAX);
        let code = second.find("language-python").unwrap_or(usize::MAX);
        assert!(heading < code && code != usize::MAX);
        let third = read_entry(&mut zip, "OEBPS/part-3.xhtml")?;
        assert!(third.contains("[Image: Sample image]"));
        assert!(third.contains("<figcaption>Sample image</figcaption>"));
        Ok(())
    }

    #[test]
    fn bare_blocks_and_untitled_sections_share_a_part() {
        let article = Article::new("T", "A", "d")
            .with_item(ContentBlock::text("a"))
            .with_item(Section::untitled().with_block(ContentBlock::text("b")))
            .with_item(Section::new("S").with_block(ContentBlock::text("c")))
            .with_item(ContentBlock::text("d"));
        let parts = parts(&article);
        let shape: Vec<(Option<&str>, usize)> =
            parts.iter().map(|p| (p.title, p.blocks.len())).collect();
        assert_eq!(shape, [(None, 2), (Some("S"), 1), (None, 1)]);
        assert_eq!(parts[2].label(2), "Part 3");
    }

    #[test]
    fn local_image_is_packaged_and_missing_image_falls_back() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let image_path = dir.path().join("pic.png");
        std::fs::write(&image_path, b"\x89PNG\r\n\x1a\nfake")?;
        let missing = dir.path().join("missing.png");
        let article = Article::new("T", "A", "d")
            .with_item(ContentBlock::image(image_path.to_string_lossy(), Some("Pic")))
            .with_item(ContentBlock::image(missing.to_string_lossy(), None));

        let mut zip = archive(&EpubExporter::new(), &article)?;
        let part = read_entry(&mut zip, "OEBPS/part-1.xhtml")?;
        assert!(part.contains("<img src=\"images/image-1.png\" alt=\"Pic\"/>"));
        assert!(part.contains("[Image: Image]"));
        let opf = read_entry(&mut zip, "OEBPS/content.opf")?;
        assert!(opf.contains(r#"href="images/image-1.png" media-type="image/png""#));
        let mut data = Vec::new();
        zip.by_name("OEBPS/images/image-1.png")?.read_to_end(&mut data)?;
        assert_eq!(data, b"\x89PNG\r\n\x1a\nfake");
        Ok(())
    }

    #[test]
    fn empty_article_still_produces_title_page() -> Result<(), Box<dyn Error>> {
        let mut zip = archive(&EpubExporter::new(), &Article::new("", "", ""))?;
        assert!(zip.by_name("OEBPS/title.xhtml").is_ok());
        assert!(zip.by_name("OEBPS/part-1.xhtml").is_err());
        let opf = read_entry(&mut zip, "OEBPS/content.opf")?;
        assert!(opf.contains("urn:mediumconv:"));
        Ok(())
    }
}
