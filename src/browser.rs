//! Window-level side effects: navigation, history, downloads, alerts, clock
//!
//! [`RecordingBrowser`] keeps everything in memory so a whole interaction
//! can be asserted on afterwards. The browser-backed implementation lives in
//! the `wasm-overlay` crate.

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;

/// An in-memory resource that can be turned into an object URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: String,
    pub body: String,
}

impl Blob {
    pub fn html(body: String) -> Self {
        Self {
            mime: "text/html".to_string(),
            body,
        }
    }
}

pub trait Browser {
    fn location_path(&self) -> String;
    fn history_length(&self) -> usize;
    fn history_back(&mut self);
    fn navigate(&mut self, path: &str);
    fn alert(&mut self, message: &str);

    fn create_object_url(&mut self, blob: &Blob) -> Result<String>;
    fn revoke_object_url(&mut self, url: &str);
    /// Trigger a same-page download of `href` saved as `filename`
    fn download(&mut self, href: &str, filename: &str) -> Result<()>;

    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRecord {
    pub href: String,
    pub filename: String,
    /// Resolved body when `href` was a live object URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordingBrowser {
    path: String,
    history_length: usize,
    clock: DateTime<Local>,
    next_object_url: u64,
    object_urls: BTreeMap<String, Blob>,
    pub downloads: Vec<DownloadRecord>,
    pub alerts: Vec<String>,
    pub back_calls: usize,
    pub navigations: Vec<String>,
}

impl Default for RecordingBrowser {
    fn default() -> Self {
        Self::new("/", 1)
    }
}

impl RecordingBrowser {
    pub fn new(path: &str, history_length: usize) -> Self {
        Self {
            path: path.to_string(),
            history_length,
            clock: Local::now(),
            next_object_url: 0,
            object_urls: BTreeMap::new(),
            downloads: Vec::new(),
            alerts: Vec::new(),
            back_calls: 0,
            navigations: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    /// Object URLs created and not yet revoked
    pub fn live_object_urls(&self) -> usize {
        self.object_urls.len()
    }
}

impl Browser for RecordingBrowser {
    fn location_path(&self) -> String {
        self.path.clone()
    }

    fn history_length(&self) -> usize {
        self.history_length
    }

    fn history_back(&mut self) {
        self.back_calls += 1;
    }

    fn navigate(&mut self, path: &str) {
        self.navigations.push(path.to_string());
        self.path = path.to_string();
        self.history_length += 1;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn create_object_url(&mut self, blob: &Blob) -> Result<String> {
        self.next_object_url += 1;
        let url = format!("blob:memory/{}", self.next_object_url);
        self.object_urls.insert(url.clone(), blob.clone());
        Ok(url)
    }

    fn revoke_object_url(&mut self, url: &str) {
        self.object_urls.remove(url);
    }

    fn download(&mut self, href: &str, filename: &str) -> Result<()> {
        if href.is_empty() {
            return Err(Error::Dom("download without a source".to_string()));
        }
        let body = self.object_urls.get(href).map(|b| b.body.clone());
        self.downloads.push(DownloadRecord {
            href: href.to_string(),
            filename: filename.to_string(),
            body,
        });
        Ok(())
    }

    fn now(&self) -> DateTime<Local> {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_resolves_live_blob() {
        let mut browser = RecordingBrowser::default();
        let url = browser.create_object_url(&Blob::html("<p>hi</p>".to_string())).unwrap();
        browser.download(&url, "report.html").unwrap();
        browser.revoke_object_url(&url);

        assert_eq!(browser.live_object_urls(), 0);
        assert_eq!(browser.downloads.len(), 1);
        assert_eq!(browser.downloads[0].body.as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_download_plain_url_has_no_body() {
        let mut browser = RecordingBrowser::default();
        browser.download("https://x/y.jpg", "Age_image.jpg").unwrap();
        assert_eq!(browser.downloads[0].body, None);
        assert!(browser.download("", "nothing.jpg").is_err());
    }

    #[test]
    fn test_revoke_unknown_url_is_noop() {
        let mut browser = RecordingBrowser::default();
        browser.revoke_object_url("blob:memory/404");
        assert_eq!(browser.live_object_urls(), 0);
    }
}
