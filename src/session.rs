//! Replay of recorded interaction sessions
//!
//! A session is a JSON document describing a page and a sequence of user
//! events. Replaying it drives a real [`OverlayController`] against a
//! [`MemoryDom`] and [`RecordingBrowser`], then reports what happened.
//!
//! ```json
//! {
//!   "page": { "path": "/results", "history_length": 3 },
//!   "document": [
//!     { "tag": "div", "class": "image-card", "children": [
//!       { "tag": "img", "attrs": { "src": "age.png" } },
//!       { "tag": "button", "class": "maximize-button",
//!         "attrs": { "data-image-type": "Age" } }
//!     ]}
//!   ],
//!   "events": [
//!     { "type": "scroll", "target": "document", "offset": 450 },
//!     { "type": "click", "target": ".maximize-button" },
//!     { "type": "key", "key": "Escape" }
//!   ]
//! }
//! ```

use crate::actions::ClickEvent;
use crate::browser::{Browser, DownloadRecord, RecordingBrowser};
use crate::config::OverlayConfig;
use crate::controller::{ClickOutcome, OverlayController};
use crate::dom::{Dom, EventTarget, MemoryDom, NodeId, ScrollSurface, Selector};
use crate::error::{Error, Result};
use crate::modal::MODAL_CLASS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Target name for the page itself
pub const DOCUMENT_TARGET: &str = "document";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub page: PageSpec,
    /// Children of `<body>`
    #[serde(default)]
    pub document: Vec<ElementSpec>,
    #[serde(default)]
    pub events: Vec<SessionEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageSpec {
    pub path: String,
    pub history_length: usize,
    pub scroll_top: f64,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            history_length: 1,
            scroll_top: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Markup parsed into the element as its children
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
    #[serde(default)]
    pub scroll_top: Option<f64>,
    #[serde(default = "default_smooth_scroll")]
    pub smooth_scroll: bool,
}

fn default_smooth_scroll() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The target's offset changes to `offset`, then a scroll event fires
    Scroll { target: String, offset: f64 },
    Click { target: String },
    Key { key: String },
    /// The deferred init step
    Settle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Scrolled {
        offset: f64,
        control_visible: bool,
    },
    Clicked {
        outcome: ClickOutcome,
        default_prevented: bool,
        propagation_stopped: bool,
    },
    Key {
        closed_preview: bool,
    },
    Settled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub index: usize,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalState {
    pub active_surface: String,
    pub control_visible: bool,
    pub overlay_count: usize,
    pub active_listeners: usize,
    pub menu_open: bool,
    pub downloads: Vec<DownloadRecord>,
    pub alerts: Vec<String>,
    pub back_calls: usize,
    pub navigations: Vec<String>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub steps: Vec<Step>,
    #[serde(rename = "final")]
    pub final_state: FinalState,
}

impl Session {
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    fn build_document(&self) -> Result<MemoryDom> {
        let mut dom = MemoryDom::new();
        let body = dom.body_id();
        for spec in &self.document {
            build_element(&mut dom, body, spec)?;
        }
        dom.scroll_surface(&ScrollSurface::Page, self.page.scroll_top);
        Ok(dom)
    }
}

fn build_element(dom: &mut MemoryDom, parent: NodeId, spec: &ElementSpec) -> Result<NodeId> {
    let mut attributes: Vec<(&str, &str)> = Vec::new();
    if let Some(ref id) = spec.id {
        attributes.push(("id", id));
    }
    if let Some(ref class) = spec.class {
        attributes.push(("class", class));
    }
    for (name, value) in &spec.attrs {
        attributes.push((name, value));
    }

    let node = dom.append_element(parent, &spec.tag, &attributes)?;
    if let Some(ref text) = spec.text {
        dom.append_text(node, text);
    }
    if let Some(ref html) = spec.html {
        dom.set_inner_html(node, html);
    }
    for child in &spec.children {
        build_element(dom, node, child)?;
    }
    if !spec.smooth_scroll {
        dom.set_smooth_scroll_supported(node, false);
    }
    if let Some(top) = spec.scroll_top {
        dom.scroll_surface(&ScrollSurface::Element(node), top);
    }
    Ok(node)
}

fn resolve_node(dom: &MemoryDom, target: &str) -> Result<NodeId> {
    if target == DOCUMENT_TARGET {
        return dom
            .document_element()
            .ok_or_else(|| Error::Replay("document has no root element".to_string()));
    }
    let selector = Selector::parse(target)?;
    dom.query(&selector)
        .ok_or_else(|| Error::Replay(format!("no element matches `{}`", target)))
}

fn resolve_scroll_origin(dom: &MemoryDom, target: &str) -> Result<EventTarget<NodeId>> {
    if target == DOCUMENT_TARGET {
        Ok(EventTarget::Document)
    } else {
        resolve_node(dom, target).map(EventTarget::Element)
    }
}

/// Short human label for a node: `tag#id.class`
fn describe(dom: &MemoryDom, node: NodeId) -> String {
    let mut label = dom.tag(node).unwrap_or("#text").to_string();
    if let Some(id) = dom.attribute(&node, "id") {
        label.push('#');
        label.push_str(&id);
    }
    if let Some(class) = dom.attribute(&node, "class") {
        for c in class.split_whitespace() {
            label.push('.');
            label.push_str(c);
        }
    }
    label
}

/// Run `session` through a fresh controller built from `config`
pub fn replay(session: &Session, config: &OverlayConfig) -> Result<Transcript> {
    let mut dom = session.build_document()?;
    let mut browser = RecordingBrowser::new(&session.page.path, session.page.history_length);
    let mut controller: OverlayController<NodeId> = OverlayController::new(config)?;
    controller.install(&mut dom)?;

    let mut steps = Vec::with_capacity(session.events.len());
    for (index, event) in session.events.iter().enumerate() {
        debug!(index, ?event, "Replaying event");
        let outcome = match event {
            SessionEvent::Scroll { target, offset } => {
                let origin = resolve_scroll_origin(&dom, target)?;
                dom.scroll_surface(&ScrollSurface::from(origin.clone()), *offset);
                controller.handle_scroll(&mut dom, origin);
                StepOutcome::Scrolled {
                    offset: *offset,
                    control_visible: controller.scroll_control_visible(),
                }
            }
            SessionEvent::Click { target } => {
                let node = resolve_node(&dom, target)?;
                let mut click = ClickEvent::new(node);
                let outcome = controller.handle_click(&mut dom, &mut browser, &mut click)?;
                StepOutcome::Clicked {
                    outcome,
                    default_prevented: click.is_default_prevented(),
                    propagation_stopped: click.is_propagation_stopped(),
                }
            }
            SessionEvent::Key { key } => StepOutcome::Key {
                closed_preview: controller.handle_keydown(&mut dom, key),
            },
            SessionEvent::Settle => {
                controller.settle(&mut dom);
                StepOutcome::Settled
            }
        };
        steps.push(Step { index, outcome });
    }

    let overlay_selector = Selector::parse(&format!(".{}", MODAL_CLASS))?;
    let active_surface = match controller.active_surface() {
        ScrollSurface::Page => DOCUMENT_TARGET.to_string(),
        ScrollSurface::Element(node) => describe(&dom, *node),
    };

    let final_state = FinalState {
        active_surface,
        control_visible: controller.scroll_control_visible(),
        overlay_count: dom.query_all(&overlay_selector).len(),
        active_listeners: controller.listeners().len(),
        menu_open: controller.is_menu_open(&dom),
        location: browser.location_path(),
        downloads: browser.downloads,
        alerts: browser.alerts,
        back_calls: browser.back_calls,
        navigations: browser.navigations,
    };

    info!(events = steps.len(), "Session replayed");
    Ok(Transcript { steps, final_state })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(json: &str) -> Transcript {
        let session = Session::from_json(json).unwrap();
        replay(&session, &OverlayConfig::default()).unwrap()
    }

    const GALLERY: &str = r#"{
        "page": { "path": "/results", "history_length": 3 },
        "document": [
            { "tag": "div", "id": "pane", "children": [
                { "tag": "div", "class": "image-card", "children": [
                    { "tag": "img", "attrs": { "src": "https://x/age.png" } },
                    { "tag": "button", "class": "maximize-button",
                      "attrs": { "data-image-type": "Age" } },
                    { "tag": "button", "class": "save-button",
                      "attrs": { "data-image-type": "Age" } }
                ]}
            ]},
            { "tag": "div", "class": "close-button", "text": "Back" }
        ],
        "events": []
    }"#;

    fn gallery_with(events: &str) -> Transcript {
        let json = GALLERY.replace(r#""events": []"#, &format!(r#""events": {}"#, events));
        run(&json)
    }

    // ==========================================================================
    // PARSING TESTS
    // ==========================================================================

    #[test]
    fn test_minimal_session_defaults() {
        let session = Session::from_json("{}").unwrap();
        assert_eq!(session.page.path, "/");
        assert_eq!(session.page.history_length, 1);
        assert!(session.document.is_empty());
        assert!(session.events.is_empty());
    }

    #[test]
    fn test_event_tags() {
        let session = Session::from_json(
            r#"{"events": [
                {"type": "scroll", "target": "document", "offset": 12.5},
                {"type": "key", "key": "Escape"},
                {"type": "settle"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            session.events,
            vec![
                SessionEvent::Scroll { target: "document".to_string(), offset: 12.5 },
                SessionEvent::Key { key: "Escape".to_string() },
                SessionEvent::Settle,
            ]
        );
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        assert!(Session::from_json(r#"{"events": [{"type": "hover"}]}"#).is_err());
    }

    // ==========================================================================
    // REPLAY TESTS
    // ==========================================================================

    #[test]
    fn test_nested_scroll_then_control_click() {
        let t = gallery_with(
            r##"[
                {"type": "scroll", "target": "#pane", "offset": 640},
                {"type": "click", "target": "#scrollTopBtn"}
            ]"##,
        );

        assert_eq!(
            t.steps[0].outcome,
            StepOutcome::Scrolled { offset: 640.0, control_visible: true }
        );
        match &t.steps[1].outcome {
            StepOutcome::Clicked { outcome: ClickOutcome::ScrolledToTop { .. }, propagation_stopped, .. } => {
                assert!(*propagation_stopped)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(t.final_state.active_surface, "div#pane");
    }

    #[test]
    fn test_preview_then_escape_leaves_nothing_behind() {
        let t = gallery_with(
            r#"[
                {"type": "click", "target": ".maximize-button"},
                {"type": "key", "key": "Escape"},
                {"type": "key", "key": "Escape"}
            ]"#,
        );

        assert_eq!(t.steps[1].outcome, StepOutcome::Key { closed_preview: true });
        assert_eq!(t.steps[2].outcome, StepOutcome::Key { closed_preview: false });
        assert_eq!(t.final_state.overlay_count, 0);
        assert_eq!(t.final_state.active_listeners, 0);
    }

    #[test]
    fn test_save_and_back_recorded() {
        let t = gallery_with(
            r#"[
                {"type": "click", "target": ".save-button"},
                {"type": "click", "target": ".close-button"}
            ]"#,
        );

        assert_eq!(t.final_state.downloads.len(), 1);
        assert_eq!(t.final_state.downloads[0].href, "https://x/age.png");
        assert_eq!(t.final_state.back_calls, 1);
        assert!(t.final_state.navigations.is_empty());
    }

    #[test]
    fn test_export_without_results_alerts() {
        let t = run(r##"{
            "document": [{ "tag": "button", "id": "exportPdf" }],
            "events": [{"type": "click", "target": "#exportPdf"}]
        }"##);

        assert_eq!(
            t.final_state.alerts,
            vec!["No analysis results available. Please run estimation first.".to_string()]
        );
        assert!(t.final_state.downloads.is_empty());
    }

    #[test]
    fn test_export_from_storage_element() {
        let t = run(r##"{
            "document": [
                { "tag": "div", "id": "htmlContentStorage", "html": "<p>X</p>" },
                { "tag": "button", "id": "exportPdf" }
            ],
            "events": [{"type": "click", "target": "#exportPdf"}]
        }"##);

        let download = &t.final_state.downloads[0];
        assert!(download.filename.starts_with("age_gender_analysis_"));
        assert!(download.body.as_deref().unwrap().contains("<p>X</p>"));
    }

    #[test]
    fn test_unknown_target_names_selector() {
        let session = Session::from_json(r#"{"events": [{"type": "click", "target": ".missing"}]}"#).unwrap();
        let err = replay(&session, &OverlayConfig::default()).unwrap_err();
        assert!(err.to_string().contains(".missing"));
    }

    #[test]
    fn test_descendant_selector_target() {
        let t = gallery_with(r##"[{"type": "click", "target": "#pane .image-card .save-button"}]"##);
        assert_eq!(t.final_state.downloads.len(), 1);
        assert_eq!(t.final_state.downloads[0].href, "https://x/age.png");
    }

    #[test]
    fn test_invalid_tag_rejected() {
        let session = Session::from_json(r#"{"document": [{ "tag": "not a tag" }]}"#).unwrap();
        let err = replay(&session, &OverlayConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Dom(_)));
    }

    #[test]
    fn test_settle_returns_page_to_top() {
        let t = run(r#"{"page": {"scroll_top": 500}, "events": [{"type": "settle"}]}"#);
        assert_eq!(t.steps[0].outcome, StepOutcome::Settled);
        assert_eq!(t.final_state.active_surface, "document");
    }

    #[test]
    fn test_transcript_serializes() {
        let t = gallery_with(r#"[{"type": "click", "target": ".maximize-button"}]"#);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["steps"][0]["outcome"]["kind"], "clicked");
        assert_eq!(json["steps"][0]["outcome"]["outcome"]["kind"], "action");
        assert_eq!(json["final"]["overlay_count"], 1);
    }
}
