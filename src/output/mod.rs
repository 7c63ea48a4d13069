//! Output module for printing crawl results
//!
//! The result listing is the crawler's only stdout output: a header line
//! followed by one terminal URL per line. Downstream indexers skip lines
//! starting with `#`.

use crate::crawler::CrawlResult;
use std::io::{self, Write};

/// Header printed before the URL list
pub const RESULTS_HEADER: &str = "## Final CRS URLs:";

/// Writes the result listing
///
/// # Arguments
///
/// * `writer` - Destination, usually a locked stdout
/// * `result` - The finished crawl
pub fn write_results<W: Write>(writer: &mut W, result: &CrawlResult) -> io::Result<()> {
    writeln!(writer, "{}", RESULTS_HEADER)?;
    for url in result.urls() {
        writeln!(writer, "{}", url)?;
    }
    writer.flush()
}
