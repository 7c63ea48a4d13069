//! XML parser for classifying identifier documents
//!
//! A document whose root element is `identifiers` is a *listing*: its direct
//! `identifier` children name further documents to crawl. Any other root
//! element marks a *leaf*, a terminal resource whose URL is a crawl result.
//! Namespace prefixes are ignored on both element names.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Local name of a listing document's root element
pub const LISTING_ROOT: &str = "identifiers";

/// Local name of a child entry inside a listing
pub const LISTING_ENTRY: &str = "identifier";

/// Result of classifying a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Listing document with its child URLs in document order
    Listing(Vec<String>),

    /// Terminal resource
    Leaf,
}

/// Errors raised while parsing a document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("content found outside the root element")]
    ContentOutsideRoot,

    #[error("document ended with {0} unclosed element(s)")]
    Unclosed(usize),
}

/// Strips a namespace qualifier from a tag name
///
/// Handles both the `prefix:name` form used in source documents and the
/// `{uri}name` form some tools print.
///
/// # Example
///
/// ```
/// use crs_crawler::crawler::local_name;
///
/// assert_eq!(local_name("reg:identifiers"), "identifiers");
/// assert_eq!(local_name("{http://www.opengis.net/def}identifier"), "identifier");
/// assert_eq!(local_name("identifier"), "identifier");
/// ```
pub fn local_name(tag: &str) -> &str {
    let tag = match tag.rfind('}') {
        Some(pos) => &tag[pos + 1..],
        None => tag,
    };

    match tag.rfind(':') {
        Some(pos) => &tag[pos + 1..],
        None => tag,
    }
}

/// Parses a document and classifies it as a listing or a leaf
///
/// The whole document is read even when the root already marks it as a leaf,
/// so a truncated or malformed leaf is reported as an error rather than
/// counted as a result.
///
/// # Arguments
///
/// * `xml` - Raw document bytes, decoded per the XML declaration (UTF-8 if absent)
///
/// # Returns
///
/// * `Ok(Classification)` - Well-formed document
/// * `Err(ParseError)` - The document is not well-formed XML
///
/// # Example
///
/// ```
/// use crs_crawler::crawler::{classify_document, Classification};
///
/// let xml = br#"<identifiers><identifier>https://example.com/a</identifier></identifiers>"#;
/// let classification = classify_document(xml).unwrap();
/// assert_eq!(
///     classification,
///     Classification::Listing(vec!["https://example.com/a".to_string()])
/// );
/// ```
pub fn classify_document(xml: &[u8]) -> Result<Classification, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut walker = TreeWalker::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => walker.open(e.local_name().as_ref())?,
            Event::Empty(e) => {
                walker.open(e.local_name().as_ref())?;
                walker.close()?;
            }
            Event::End(_) => walker.close()?,
            Event::Text(t) => walker.text(&t.unescape()?)?,
            Event::CData(c) => {
                let bytes = c.into_inner();
                let text = reader.decoder().decode(&bytes)?;
                walker.text(&text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
        buf.clear();
    }

    walker.finish()
}

/// Tracks element nesting while streaming through a document
#[derive(Debug, Default)]
struct TreeWalker {
    /// Number of currently open elements
    depth: usize,

    /// Set once the root element opens
    listing: Option<bool>,

    root_closed: bool,

    /// Text of the `identifier` element currently open under the root
    entry: Option<String>,

    /// An element was opened inside the current entry; later text is ignored
    entry_nested: bool,

    children: Vec<String>,
}

impl TreeWalker {
    fn open(&mut self, name: &[u8]) -> Result<(), ParseError> {
        match self.depth {
            0 => {
                if self.root_closed {
                    return Err(ParseError::ContentOutsideRoot);
                }
                self.listing = Some(name == LISTING_ROOT.as_bytes());
            }
            1 => {
                if self.listing == Some(true) && name == LISTING_ENTRY.as_bytes() {
                    self.entry = Some(String::new());
                    self.entry_nested = false;
                }
            }
            _ => self.entry_nested = true,
        }

        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ParseError> {
        if self.depth == 0 {
            return Err(ParseError::ContentOutsideRoot);
        }
        self.depth -= 1;

        match self.depth {
            0 => self.root_closed = true,
            1 => {
                if let Some(text) = self.entry.take() {
                    let text = text.trim();
                    if !text.is_empty() {
                        self.children.push(text.to_string());
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), ParseError> {
        if self.depth == 0 {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(ParseError::ContentOutsideRoot);
        }

        if self.depth == 2 && !self.entry_nested {
            if let Some(entry) = self.entry.as_mut() {
                entry.push_str(text);
            }
        }

        Ok(())
    }

    fn finish(self) -> Result<Classification, ParseError> {
        if self.depth > 0 {
            return Err(ParseError::Unclosed(self.depth));
        }

        match self.listing {
            None => Err(ParseError::MissingRoot),
            Some(true) => Ok(Classification::Listing(self.children)),
            Some(false) => Ok(Classification::Leaf),
        }
    }
}
