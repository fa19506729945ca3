use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lopdf::{Document as PdfDocument, Object, ObjectId};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::utils::error::ExtractError;

static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("static paragraph selector"));

/// Where a document comes from, decided by the shape of `input_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Web(String),
    Document(PathBuf),
}

impl SourceLocator {
    /// `http://` / `https://` prefixes win over the `.pdf` suffix check.
    pub fn parse(input: &str) -> Result<Self, ExtractError> {
        if input.starts_with("http://") || input.starts_with("https://") {
            Ok(SourceLocator::Web(input.to_string()))
        } else if input.to_lowercase().ends_with(".pdf") {
            Ok(SourceLocator::Document(PathBuf::from(input)))
        } else {
            Err(ExtractError::UnsupportedLocator(input.to_string()))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceLocator::Web(_) => "web page",
            SourceLocator::Document(_) => "PDF",
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Web(url) => write!(f, "{}", url),
            SourceLocator::Document(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Extracted text of one request. Never mutated after extraction.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDocument {
    pub locator: String,
    pub text: String,
    pub extracted_at: DateTime<Utc>,
}

impl SourceDocument {
    pub fn new(locator: &SourceLocator, text: String) -> Self {
        Self {
            locator: locator.to_string(),
            text,
            extracted_at: Utc::now(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, locator: &str) -> Result<String, ExtractError>;
}

/// Fetches a page once and keeps only `<p>` text.
pub struct WebPageExtractor {
    client: Client,
}

impl WebPageExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Paragraph text in document order, one paragraph per line.
    pub fn paragraph_text(html: &str) -> String {
        let document = Html::parse_document(html);

        document
            .select(&PARAGRAPH_SELECTOR)
            .map(|para| para.text().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl TextExtractor for WebPageExtractor {
    async fn extract(&self, locator: &str) -> Result<String, ExtractError> {
        debug!("Fetching web page: {}", locator);

        let response = self.client.get(locator).send().await?;

        if !response.status().is_success() {
            return Err(ExtractError::Fetch {
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await?;
        let text = Self::paragraph_text(&html);

        if text.trim().is_empty() {
            return Err(ExtractError::EmptyContent);
        }

        info!("Extracted {} characters of paragraph text from {}", text.len(), locator);
        Ok(text)
    }
}

/// Concatenates the text of every page in page order.
#[derive(Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Any page that fails to extract aborts the whole document.
    pub fn extract_pages(path: &Path) -> Result<String, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("PDF not found: {}", path.display()),
            )));
        }

        let doc = PdfDocument::load(path)?;
        let pages = doc.get_pages();

        let mut content = String::new();
        for (page_num, page_id) in &pages {
            Self::check_page_contents(&doc, *page_num, *page_id)?;
            let text = doc.extract_text(&[*page_num])?;
            content.push_str(&text);
        }

        debug!("Extracted {} pages from {:?}", pages.len(), path);
        Ok(content)
    }

    // extract_text skips content streams it cannot resolve, which would turn a
    // broken page into an empty one.
    fn check_page_contents(
        doc: &PdfDocument,
        page_num: u32,
        page_id: ObjectId,
    ) -> Result<(), ExtractError> {
        let page_error = |e: lopdf::Error| ExtractError::Pdf(format!("page {}: {}", page_num, e));

        for stream_id in doc.get_page_contents(page_id) {
            let stream = doc
                .get_object(stream_id)
                .and_then(Object::as_stream)
                .map_err(page_error)?;

            if stream.dict.has(b"Filter") {
                stream.decompressed_content().map_err(page_error)?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, locator: &str) -> Result<String, ExtractError> {
        let path = PathBuf::from(locator);

        let text = tokio::task::spawn_blocking(move || Self::extract_pages(&path))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))??;

        info!("Extracted {} characters from PDF {}", text.len(), locator);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_locator_dispatch() {
        assert_eq!(
            SourceLocator::parse("https://example.com/article").unwrap(),
            SourceLocator::Web("https://example.com/article".to_string())
        );
        assert_eq!(
            SourceLocator::parse("http://example.com/paper.pdf").unwrap(),
            SourceLocator::Web("http://example.com/paper.pdf".to_string())
        );
        assert_eq!(
            SourceLocator::parse("/tmp/SelfRAG.PDF").unwrap(),
            SourceLocator::Document(PathBuf::from("/tmp/SelfRAG.PDF"))
        );
        assert!(matches!(
            SourceLocator::parse("notes.txt"),
            Err(ExtractError::UnsupportedLocator(_))
        ));
        assert!(matches!(
            SourceLocator::parse("ftp://example.com/a.html"),
            Err(ExtractError::UnsupportedLocator(_))
        ));
    }

    #[test]
    fn test_paragraph_text_discards_non_paragraph_markup() {
        let html = r#"
            <html>
              <head><title>T</title><script>var tracking = 1;</script></head>
              <body>
                <nav><a href="/">Home</a></nav>
                <h1>Heading</h1>
                <p>First <b>bold</b> paragraph.</p>
                <div><p>Second paragraph.</p></div>
              </body>
            </html>"#;

        assert_eq!(
            WebPageExtractor::paragraph_text(html),
            "First bold paragraph.\nSecond paragraph."
        );
    }

    #[tokio::test]
    async fn test_web_extract_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><h2>x</h2><p>Mitochondria make ATP.</p></body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let extractor = WebPageExtractor::new(Client::new());
        let text = extractor
            .extract(&format!("{}/article", server.uri()))
            .await
            .unwrap();

        assert_eq!(text, "Mitochondria make ATP.");
    }

    #[tokio::test]
    async fn test_web_extract_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = WebPageExtractor::new(Client::new());
        let err = extractor
            .extract(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Fetch { status: 404 }));
    }

    #[tokio::test]
    async fn test_web_extract_without_paragraphs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body><h1>Only a title</h1></body></html>"),
            )
            .mount(&server)
            .await;

        let extractor = WebPageExtractor::new(Client::new());
        let err = extractor.extract(&server.uri()).await.unwrap_err();

        assert!(matches!(err, ExtractError::EmptyContent));
    }

    fn write_pdf(path: &Path, pages_text: &[&str]) {
        let mut doc = PdfDocument::with_version("1.5");
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

        let mut kids = Vec::new();
        for text in pages_text {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_pdf_pages_concatenated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("lecture.pdf");
        write_pdf(&pdf_path, &["Alpha page", "Beta page"]);

        let text = PdfExtractor::new()
            .extract(pdf_path.to_str().unwrap())
            .await
            .unwrap();

        let alpha = text.find("Alpha").expect("first page text");
        let beta = text.find("Beta").expect("second page text");
        assert!(alpha < beta);
    }

    #[tokio::test]
    async fn test_pdf_broken_page_aborts_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("broken.pdf");
        write_pdf(&pdf_path, &["Alpha page", "Beta page"]);

        let mut doc = PdfDocument::load(&pdf_path).unwrap();
        let second_page = doc.get_pages()[&2];
        doc.get_object_mut(second_page)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Contents", Object::Reference((9999, 0)));
        doc.save(&pdf_path).unwrap();

        let err = PdfExtractor::new()
            .extract(pdf_path.to_str().unwrap())
            .await
            .unwrap_err();

        match err {
            ExtractError::Pdf(message) => assert!(message.starts_with("page 2:")),
            other => panic!("expected a PDF error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pdf_missing_file() {
        let err = PdfExtractor::new()
            .extract("/definitely/not/here.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Io(_)));
    }

    #[test]
    fn test_source_document_records_locator() {
        let locator = SourceLocator::parse("https://example.com").unwrap();
        let doc = SourceDocument::new(&locator, "héllo".to_string());

        assert_eq!(doc.locator, "https://example.com");
        assert_eq!(doc.char_count(), 5);
        assert!(doc.extracted_at <= Utc::now());
    }
}
