//! Page-oriented PDF reader

use std::path::{Path, PathBuf};

use crate::config::PdfReaderConfig;
use crate::error::{Error, Result};
use crate::types::Document;

/// Typographic characters PDF fonts emit in place of plain ASCII
const CHARACTER_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Per-page text cleanup: glyph normalisation, blank-line collapsing and
/// header/footer line deletion
#[derive(Debug, Clone, Default)]
pub struct PageTextFormatter {
    top_pages_to_skip_before_delete: usize,
    top_lines_to_delete: usize,
    bottom_lines_to_delete: usize,
    left_align: bool,
}

impl PageTextFormatter {
    /// Build a formatter from reader settings
    pub fn new(config: &PdfReaderConfig) -> Self {
        Self {
            top_pages_to_skip_before_delete: config.top_pages_to_skip_before_delete,
            top_lines_to_delete: config.top_lines_to_delete,
            bottom_lines_to_delete: config.bottom_lines_to_delete,
            left_align: config.left_align,
        }
    }

    /// Format the text of the page at `page_index` (0-based)
    pub fn format(&self, text: &str, page_index: usize) -> String {
        let normalized = normalize_characters(text);

        let mut lines: Vec<&str> = Vec::new();
        let mut previous_blank = true;
        for line in normalized.lines() {
            let line = line.trim_end();
            let blank = line.is_empty();
            if blank && previous_blank {
                continue;
            }
            lines.push(line);
            previous_blank = blank;
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        if page_index >= self.top_pages_to_skip_before_delete {
            let top = self.top_lines_to_delete.min(lines.len());
            lines.drain(..top);
            let keep = lines.len().saturating_sub(self.bottom_lines_to_delete);
            lines.truncate(keep);
        }

        let lines = lines.into_iter().map(|l| if self.left_align { l.trim_start() } else { l });
        lines.collect::<Vec<_>>().join("\n").trim().to_string()
    }
}

fn normalize_characters(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\0' {
            continue;
        }
        match CHARACTER_REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => result.push_str(to),
            None => result.push(c),
        }
    }
    result
}

/// Reads a PDF and yields one [`Document`] per group of pages
pub struct PdfPageReader {
    path: PathBuf,
    pages_per_document: usize,
    formatter: PageTextFormatter,
}

impl PdfPageReader {
    /// Create a reader from configuration
    pub fn new(config: &PdfReaderConfig) -> Self {
        Self {
            path: config.path.clone(),
            pages_per_document: config.pages_per_document,
            formatter: PageTextFormatter::new(config),
        }
    }

    /// Path of the PDF this reader loads
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the PDF and return a lazy document sequence
    pub fn read(&self) -> Result<DocumentIter> {
        let path_str = self.path.display().to_string();
        let data = std::fs::read(&self.path).map_err(|e| Error::load(&path_str, e.to_string()))?;
        let pages = extract_pages(&path_str, &data)?;

        tracing::info!("Read {} pages from {}", pages.len(), path_str);

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(path_str);

        let group = if self.pages_per_document == 0 {
            pages.len()
        } else {
            self.pages_per_document
        };

        Ok(DocumentIter {
            file_name,
            pages,
            group,
            next_page: 0,
            formatter: self.formatter.clone(),
        })
    }

    /// Read the whole PDF eagerly
    pub fn load(&self) -> Result<Vec<Document>> {
        Ok(self.read()?.collect())
    }
}

/// Lazily formats and groups extracted pages into documents
pub struct DocumentIter {
    file_name: String,
    pages: Vec<String>,
    group: usize,
    next_page: usize,
    formatter: PageTextFormatter,
}

impl Iterator for DocumentIter {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        if self.next_page >= self.pages.len() {
            return None;
        }

        let start = self.next_page;
        let end = (start + self.group).min(self.pages.len());
        self.next_page = end;

        let content = (start..end)
            .map(|index| self.formatter.format(&self.pages[index], index))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        tracing::debug!("Document for pages {}-{}: {} bytes", start + 1, end, content.len());

        Some(Document::from_pages(
            &self.file_name,
            start as u32 + 1,
            end as u32,
            content,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pages.len() - self.next_page;
        let count = remaining.div_ceil(self.group);
        (count, Some(count))
    }
}

/// Extract raw text for every page, pdf-extract first, lopdf as fallback
fn extract_pages(path: &str, data: &[u8]) -> Result<Vec<String>> {
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data));

    let pages = match extracted {
        Ok(Ok(pages)) if pages.iter().any(|p| !p.trim().is_empty()) => pages,
        Ok(Ok(_)) => {
            tracing::warn!("pdf-extract found no text in {}, trying lopdf", path);
            extract_pages_fallback(path, data)?
        }
        Ok(Err(e)) => {
            tracing::warn!("pdf-extract failed on {}: {}, trying lopdf", path, e);
            extract_pages_fallback(path, data)?
        }
        Err(_) => {
            tracing::warn!("pdf-extract panicked on {}, trying lopdf", path);
            extract_pages_fallback(path, data)?
        }
    };

    if pages.is_empty() {
        return Err(Error::load(path, "PDF has no pages"));
    }
    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(Error::load(
            path,
            "No text content could be extracted; the PDF may be image-based",
        ));
    }

    Ok(pages)
}

fn extract_pages_fallback(path: &str, data: &[u8]) -> Result<Vec<String>> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::load(path, format!("Not a valid PDF: {}", e)))?;

    let pages = doc
        .get_pages()
        .into_keys()
        .map(|page_number| match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Could not extract page {} of {}: {}", page_number, path, e);
                String::new()
            }
        })
        .collect();

    Ok(pages)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build a PDF with one text line per entry on each page
    pub(crate) fn build_pdf(pages: &[Vec<&str>]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new(
                    "Td",
                    vec![72.into(), (760 - 20 * i as i64).into()],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn write_pdf(dir: &tempfile::TempDir, pages: &[Vec<&str>]) -> PathBuf {
        let path = dir.path().join("sample.pdf");
        std::fs::write(&path, build_pdf(pages)).unwrap();
        path
    }

    fn reader(path: PathBuf, pages_per_document: usize) -> PdfPageReader {
        PdfPageReader::new(&PdfReaderConfig {
            path,
            pages_per_document,
            ..PdfReaderConfig::default()
        })
    }

    #[test]
    fn test_document_count_follows_grouping() {
        let dir = tempfile::tempdir().unwrap();
        let pages: Vec<Vec<&str>> = (0..5).map(|_| vec!["Heroic couplets"]).collect();
        let path = write_pdf(&dir, &pages);

        for (per_doc, expected) in [(1, 5), (2, 3), (3, 2), (5, 1), (7, 1), (0, 1)] {
            let docs = reader(path.clone(), per_doc).load().unwrap();
            assert_eq!(docs.len(), expected, "pages_per_document = {}", per_doc);
        }
    }

    #[test]
    fn test_documents_carry_page_metadata_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(
            &dir,
            &[vec!["Pope wrote The Dunciad"], vec!["Pope translated Homer"]],
        );

        let docs = reader(path, 1).load().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page_number(), Some(1));
        assert_eq!(docs[1].page_number(), Some(2));
        assert!(docs[0].content.contains("Dunciad"));
        assert!(docs[1].content.contains("Homer"));
        assert_eq!(docs[0].metadata["file_name"], serde_json::json!("sample.pdf"));
    }

    #[test]
    fn test_iterator_is_lazy_and_sized() {
        let dir = tempfile::tempdir().unwrap();
        let pages: Vec<Vec<&str>> = (0..4).map(|_| vec!["An Essay on Criticism"]).collect();
        let path = write_pdf(&dir, &pages);

        let mut iter = reader(path, 3).read().unwrap();
        assert_eq!(iter.size_hint(), (2, Some(2)));
        let first = iter.next().unwrap();
        assert_eq!(first.metadata["end_page_number"], serde_json::json!(3));
        assert_eq!(iter.size_hint(), (1, Some(1)));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = reader(PathBuf::from("/nonexistent/pope.pdf"), 1).load().unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn test_non_pdf_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"just some plain text, not a PDF").unwrap();

        let err = reader(path, 1).load().unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn test_formatter_deletes_footer_lines() {
        let formatter = PageTextFormatter::new(&PdfReaderConfig {
            bottom_lines_to_delete: 2,
            ..PdfReaderConfig::default()
        });
        let page = "Body line one\nBody line two\nwikipedia.org\nPage 3 of 9\n\n";
        assert_eq!(formatter.format(page, 0), "Body line one\nBody line two");
    }

    #[test]
    fn test_formatter_skips_leading_pages() {
        let formatter = PageTextFormatter::new(&PdfReaderConfig {
            top_pages_to_skip_before_delete: 1,
            top_lines_to_delete: 1,
            bottom_lines_to_delete: 1,
            ..PdfReaderConfig::default()
        });
        let page = "Header\nContent\nFooter";
        assert_eq!(formatter.format(page, 0), page);
        assert_eq!(formatter.format(page, 1), "Content");
    }

    #[test]
    fn test_formatter_normalizes_text() {
        let formatter = PageTextFormatter::new(&PdfReaderConfig {
            left_align: true,
            ..PdfReaderConfig::default()
        });
        let page = "  \u{FB01}rst\0 line\n\n\n\n   \u{201C}quoted\u{201D}";
        assert_eq!(formatter.format(page, 0), "first line\n\n\"quoted\"");
    }

    #[test]
    fn test_formatter_over_deletion_yields_empty_page() {
        let formatter = PageTextFormatter::new(&PdfReaderConfig {
            bottom_lines_to_delete: 10,
            ..PdfReaderConfig::default()
        });
        assert_eq!(formatter.format("one\ntwo", 0), "");
    }
}
