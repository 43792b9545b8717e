//! Export of previously rendered report content
//!
//! The analysis results are already somewhere in the page; this module finds
//! them and packages them as a standalone HTML download. Content is located
//! with an ordered list of strategies, first success wins:
//!
//! 1. the hidden storage element, when it holds anything
//! 2. the primary output container
//! 3. any generic output element carrying more than `generic_min_length`
//!    characters of markup
//!
//! # Usage
//!
//! ```ignore
//! let exporter = ReportExporter::new(&ExportConfig::default())?;
//! match exporter.export(&dom, &mut browser) {
//!     Ok(report) => println!("saved {}", report.filename),
//!     Err(Error::NoReportContent) => browser.alert(exporter.missing_notice()),
//!     Err(e) => return Err(e),
//! }
//! ```

pub mod html;

use crate::browser::{Blob, Browser};
use crate::config::ExportConfig;
use crate::dom::{Dom, Selector};
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    StorageElement,
    PrimaryOutput,
    GenericOutput,
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::StorageElement => write!(f, "storage element"),
            ContentSource::PrimaryOutput => write!(f, "primary output"),
            ContentSource::GenericOutput => write!(f, "generic output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedContent {
    pub source: ContentSource,
    pub html: String,
}

/// A fully assembled export, ready to be written or downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub filename: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedReport {
    pub filename: String,
    pub source: ContentSource,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
enum Strategy {
    Storage { id: String },
    Primary(Selector),
    Generic { selector: Selector, min_length: usize },
}

impl Strategy {
    fn locate<D: Dom>(&self, dom: &D) -> Option<LocatedContent> {
        match self {
            Strategy::Storage { id } => dom
                .element_by_id(id)
                .map(|node| dom.inner_html(&node))
                .filter(|html| !html.trim().is_empty())
                .map(|html| LocatedContent {
                    source: ContentSource::StorageElement,
                    html,
                }),
            Strategy::Primary(selector) => dom
                .query(selector)
                .map(|node| dom.inner_html(&node))
                .filter(|html| !html.trim().is_empty())
                .map(|html| LocatedContent {
                    source: ContentSource::PrimaryOutput,
                    html,
                }),
            Strategy::Generic { selector, min_length } => dom
                .query_all(selector)
                .into_iter()
                .map(|node| dom.inner_html(&node))
                .find(|html| !html.trim().is_empty() && html.chars().count() > *min_length)
                .map(|html| LocatedContent {
                    source: ContentSource::GenericOutput,
                    html,
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportExporter {
    strategies: Vec<Strategy>,
    title: String,
    filename_prefix: String,
    missing_notice: String,
}

impl ReportExporter {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        Ok(Self {
            strategies: vec![
                Strategy::Storage {
                    id: config.storage_id.clone(),
                },
                Strategy::Primary(Selector::parse(&config.primary_selector)?),
                Strategy::Generic {
                    selector: Selector::parse(&config.generic_selector)?,
                    min_length: config.generic_min_length,
                },
            ],
            title: config.title.clone(),
            filename_prefix: config.filename_prefix.clone(),
            missing_notice: config.missing_notice.clone(),
        })
    }

    pub fn missing_notice(&self) -> &str {
        &self.missing_notice
    }

    /// Find report content in the document, trying each strategy in order
    pub fn locate<D: Dom>(&self, dom: &D) -> Option<LocatedContent> {
        let found = self.strategies.iter().find_map(|s| s.locate(dom));
        match &found {
            Some(content) => debug!(source = %content.source, len = content.html.len(), "Located report content"),
            None => debug!("No report content in document"),
        }
        found
    }

    /// `<prefix><epoch-ms>.html`
    pub fn filename(&self, timestamp: &DateTime<Local>) -> String {
        format!("{}{}.html", self.filename_prefix, timestamp.timestamp_millis())
    }

    /// Wrap `content` in the report template
    pub fn assemble(&self, content: &str, timestamp: &DateTime<Local>) -> Result<ReportDocument> {
        if content.trim().is_empty() {
            return Err(Error::NoReportContent);
        }
        Ok(ReportDocument {
            filename: self.filename(timestamp),
            html: html::render(&self.title, &html::format_generated(timestamp), content),
        })
    }

    /// Wrap an already extracted fragment and write it into `out_dir`
    pub fn write_to_dir(&self, content: &str, out_dir: &Path, timestamp: &DateTime<Local>) -> Result<PathBuf> {
        let document = self.assemble(content, timestamp)?;
        fs::create_dir_all(out_dir)?;
        let path = out_dir.join(&document.filename);
        fs::write(&path, document.html)?;
        info!(path = %path.display(), "Report written");
        Ok(path)
    }

    /// Locate, wrap and download the report.
    ///
    /// The temporary object URL is revoked before returning, whether or not
    /// the download click succeeded.
    pub fn export<D: Dom, B: Browser>(&self, dom: &D, browser: &mut B) -> Result<ExportedReport> {
        let Some(located) = self.locate(dom) else {
            warn!("Export requested but no analysis results are available");
            return Err(Error::NoReportContent);
        };

        let document = self.assemble(&located.html, &browser.now())?;
        let bytes = document.html.len();
        let url = browser.create_object_url(&Blob::html(document.html))?;
        let clicked = browser.download(&url, &document.filename);
        browser.revoke_object_url(&url);
        clicked?;

        info!(filename = %document.filename, source = %located.source, bytes, "Report exported");
        Ok(ExportedReport {
            filename: document.filename,
            source: located.source,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::RecordingBrowser;
    use crate::dom::MemoryDom;
    use chrono::TimeZone;

    fn exporter() -> ReportExporter {
        ReportExporter::new(&ExportConfig::default()).unwrap()
    }

    fn fixed_browser() -> RecordingBrowser {
        let clock = Local.timestamp_millis_opt(1_767_225_600_123).unwrap();
        RecordingBrowser::new("/report", 2).with_clock(clock)
    }

    fn is_report_filename(name: &str) -> bool {
        name.strip_prefix("age_gender_analysis_")
            .and_then(|rest| rest.strip_suffix(".html"))
            .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }

    // ==========================================================================
    // LOCATION STRATEGY TESTS
    // ==========================================================================

    #[test]
    fn test_storage_element_wins() {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        let output = dom.append_element(body, "div", &[("class", "gr-html")]).unwrap();
        dom.set_inner_html(output, "<p>primary</p>");
        let storage = dom.append_element(body, "div", &[("id", "htmlContentStorage")]).unwrap();
        dom.set_inner_html(storage, "<p>stored</p>");

        let found = exporter().locate(&dom).unwrap();
        assert_eq!(found.source, ContentSource::StorageElement);
        assert_eq!(found.html, "<p>stored</p>");
    }

    #[test]
    fn test_empty_storage_falls_through_to_primary() {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        dom.append_element(body, "div", &[("id", "htmlContentStorage")]).unwrap();
        let output = dom.append_element(body, "div", &[("data-testid", "html-output")]).unwrap();
        dom.set_inner_html(output, "<table></table>");

        let found = exporter().locate(&dom).unwrap();
        assert_eq!(found.source, ContentSource::PrimaryOutput);
        assert_eq!(found.html, "<table></table>");
    }

    #[test]
    fn test_whitespace_storage_falls_through_to_primary() {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        let storage = dom.append_element(body, "div", &[("id", "htmlContentStorage")]).unwrap();
        dom.set_inner_html(storage, "\n    ");
        let output = dom.append_element(body, "div", &[("class", "gr-html")]).unwrap();
        dom.set_inner_html(output, "<p>real results</p>");

        let found = exporter().locate(&dom).unwrap();
        assert_eq!(found.source, ContentSource::PrimaryOutput);

        let mut browser = fixed_browser();
        exporter().export(&dom, &mut browser).unwrap();
        assert_eq!(browser.downloads.len(), 1);
        assert!(browser.downloads[0].body.as_deref().unwrap().contains("<p>real results</p>"));
    }

    #[test]
    fn test_whitespace_only_everywhere_is_no_content() {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        let storage = dom.append_element(body, "div", &[("id", "htmlContentStorage")]).unwrap();
        dom.set_inner_html(storage, " ");
        let output = dom.append_element(body, "div", &[("class", "gr-html")]).unwrap();
        dom.set_inner_html(output, &" ".repeat(1200));

        assert_eq!(exporter().locate(&dom), None);
    }

    #[test]
    fn test_generic_output_needs_enough_content() {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        let short = dom.append_element(body, "div", &[("class", "prose")]).unwrap();
        dom.set_inner_html(short, "<p>too short</p>");
        assert_eq!(exporter().locate(&dom), None);

        let long_html = format!("<p>{}</p>", "a".repeat(1000));
        let long = dom.append_element(body, "div", &[("class", "output")]).unwrap();
        dom.set_inner_html(long, &long_html);

        let found = exporter().locate(&dom).unwrap();
        assert_eq!(found.source, ContentSource::GenericOutput);
        assert_eq!(found.html, long_html);
    }

    #[test]
    fn test_generic_length_is_strictly_greater() {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        let node = dom.append_element(body, "div", &[("class", "content")]).unwrap();
        dom.set_inner_html(node, &"x".repeat(1000));
        assert_eq!(exporter().locate(&dom), None);
    }

    // ==========================================================================
    // EXPORT TESTS
    // ==========================================================================

    #[test]
    fn test_export_without_content_downloads_nothing() {
        let dom = MemoryDom::new();
        let mut browser = fixed_browser();

        let result = exporter().export(&dom, &mut browser);
        assert!(matches!(result, Err(Error::NoReportContent)));
        assert!(browser.downloads.is_empty());
        assert_eq!(browser.live_object_urls(), 0);
    }

    #[test]
    fn test_export_storage_content_verbatim() {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        let storage = dom.append_element(body, "div", &[("id", "htmlContentStorage")]).unwrap();
        dom.set_inner_html(storage, "<p>X</p>");
        let mut browser = fixed_browser();

        let report = exporter().export(&dom, &mut browser).unwrap();

        assert_eq!(report.filename, "age_gender_analysis_1767225600123.html");
        assert!(is_report_filename(&report.filename));
        assert_eq!(browser.downloads.len(), 1);
        let body = browser.downloads[0].body.as_deref().unwrap();
        assert!(body.contains("<p>X</p>"));
        assert!(body.contains("<h1>Age &amp; Gender Analysis Report</h1>"));
        assert!(body.contains("Generated on: "));
        assert_eq!(browser.live_object_urls(), 0);
    }

    #[test]
    fn test_assemble_rejects_blank_content() {
        let now = Local::now();
        assert!(matches!(exporter().assemble("  \n", &now), Err(Error::NoReportContent)));
        let doc = exporter().assemble("<p>ok</p>", &now).unwrap();
        assert!(is_report_filename(&doc.filename));
    }

    #[test]
    fn test_write_to_dir_creates_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let ts = Local.timestamp_millis_opt(1_767_225_600_123).unwrap();

        let path = exporter().write_to_dir("<p>saved</p>", &out, &ts).unwrap();

        assert_eq!(path, out.join("age_gender_analysis_1767225600123.html"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<p>saved</p>"));
        assert!(written.contains(&html::format_generated(&ts)));
    }

    #[test]
    fn test_write_to_dir_rejects_empty_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let result = exporter().write_to_dir("", dir.path(), &Local::now());
        assert!(matches!(result, Err(Error::NoReportContent)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_bad_selector_config_is_error() {
        let config = ExportConfig {
            primary_selector: ".a .b".to_string(),
            ..ExportConfig::default()
        };
        assert!(ReportExporter::new(&config).is_err());
    }
}
