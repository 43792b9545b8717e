//! `Browser` over `window`: history, location, alerts, object URLs, downloads

use chrono::{DateTime, Local};
use report_overlay::browser::{Blob, Browser};
use report_overlay::{Error, Result};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{BlobPropertyBag, Document, HtmlAnchorElement, Url, Window};

pub struct WebBrowser {
    window: Window,
    document: Document,
}

impl WebBrowser {
    pub fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }
}

fn js_error(what: &str, err: JsValue) -> Error {
    Error::Dom(format!("{}: {:?}", what, err))
}

impl Browser for WebBrowser {
    fn location_path(&self) -> String {
        self.window.location().pathname().unwrap_or_else(|_| "/".to_string())
    }

    fn history_length(&self) -> usize {
        self.window
            .history()
            .and_then(|h| h.length())
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    fn history_back(&mut self) {
        if let Ok(history) = self.window.history() {
            history.back().ok();
        }
    }

    fn navigate(&mut self, path: &str) {
        self.window.location().set_href(path).ok();
    }

    fn alert(&mut self, message: &str) {
        self.window.alert_with_message(message).ok();
    }

    fn create_object_url(&mut self, blob: &Blob) -> Result<String> {
        let options = BlobPropertyBag::new();
        options.set_type(&blob.mime);
        let parts = js_sys::Array::new();
        parts.push(&JsValue::from_str(&blob.body));
        let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)
            .map_err(|e| js_error("blob", e))?;
        Url::create_object_url_with_blob(&blob).map_err(|e| js_error("object URL", e))
    }

    fn revoke_object_url(&mut self, url: &str) {
        Url::revoke_object_url(url).ok();
    }

    fn download(&mut self, href: &str, filename: &str) -> Result<()> {
        let anchor: HtmlAnchorElement = self
            .document
            .create_element("a")
            .map_err(|e| js_error("anchor", e))?
            .dyn_into()
            .map_err(|_| Error::Dom("anchor cast failed".to_string()))?;
        anchor.set_href(href);
        anchor.set_download(filename);
        anchor.style().set_property("display", "none").ok();

        let body = self
            .document
            .body()
            .ok_or_else(|| Error::Dom("document has no body".to_string()))?;
        body.append_child(&anchor).map_err(|e| js_error("append anchor", e))?;
        anchor.click();
        anchor.remove();
        Ok(())
    }

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
