//! Delegated click handling for the page's action markers
//!
//! One listener at the document root sees every click. The target is
//! classified by walking up to the nearest element carrying a marker, with
//! marker kinds checked in a fixed priority order: preview, save, back,
//! export. The first kind that matches is the only action that fires.

use crate::browser::Browser;
use crate::config::MarkerConfig;
use crate::disposer::ListenerRegistry;
use crate::dom::{Dom, Selector};
use crate::error::{Error, Result};
use crate::modal::ModalController;
use crate::report::ReportExporter;
use serde::Serialize;
use tracing::{debug, info};

/// Category used when a marker carries no category attribute
const DEFAULT_CATEGORY: &str = "Image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Preview,
    Save,
    Back,
    Export,
}

impl MarkerKind {
    pub const PRIORITY: [MarkerKind; 4] = [
        MarkerKind::Preview,
        MarkerKind::Save,
        MarkerKind::Back,
        MarkerKind::Export,
    ];
}

/// A classified click: which marker matched and where
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMarker<N> {
    pub kind: MarkerKind,
    pub element: N,
    pub category: String,
}

/// A click as seen by the controller. Handlers flip the flags; the host
/// adapter applies them to the real event.
#[derive(Debug, Clone)]
pub struct ClickEvent<N> {
    pub target: N,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl<N> ClickEvent<N> {
    pub fn new(target: N) -> Self {
        Self {
            target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    fn consume(&mut self) {
        self.prevent_default();
        self.stop_propagation();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionOutcome {
    Previewed { title: String },
    Saved { filename: String },
    /// Marker matched but its card had no usable image
    NoImage { kind: MarkerKind },
    WentBack,
    NavigatedHome,
    Exported { filename: String },
    /// No report content; the missing-content notice was shown
    NothingToExport,
}

/// What the dispatcher may call into
pub struct ActionTargets<'a, N> {
    pub modal: &'a mut ModalController<N>,
    pub registry: &'a mut ListenerRegistry,
    pub exporter: &'a ReportExporter,
}

#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    markers: Vec<(MarkerKind, Selector)>,
    card: Selector,
    image: Selector,
    category_attribute: String,
}

impl ActionDispatcher {
    pub fn new(config: &MarkerConfig) -> Result<Self> {
        let mut markers = Vec::with_capacity(MarkerKind::PRIORITY.len());
        for kind in MarkerKind::PRIORITY {
            let source = match kind {
                MarkerKind::Preview => &config.preview,
                MarkerKind::Save => &config.save,
                MarkerKind::Back => &config.back,
                MarkerKind::Export => &config.export,
            };
            markers.push((kind, Selector::parse(source)?));
        }

        Ok(Self {
            markers,
            card: Selector::parse(&config.card)?,
            image: Selector::parse("img")?,
            category_attribute: config.category_attribute.clone(),
        })
    }

    /// Find the highest-priority marker enclosing `target`
    pub fn classify<D: Dom>(&self, dom: &D, target: &D::Node) -> Option<ActionMarker<D::Node>> {
        self.markers.iter().find_map(|(kind, selector)| {
            dom.closest(target, selector).map(|element| {
                let category = dom
                    .attribute(&element, &self.category_attribute)
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
                ActionMarker {
                    kind: *kind,
                    element,
                    category,
                }
            })
        })
    }

    /// Source of the single image inside the marker's card
    fn card_image<D: Dom>(&self, dom: &D, marker: &D::Node) -> Option<String> {
        let card = dom.closest(marker, &self.card)?;
        let image = dom.query_in(&card, &self.image)?;
        dom.attribute(&image, "src").filter(|src| !src.is_empty())
    }

    /// Classify and run the action for a click. `Ok(None)` means no marker
    /// matched and the event is left untouched.
    pub fn dispatch<D: Dom, B: Browser>(
        &self,
        dom: &mut D,
        browser: &mut B,
        targets: ActionTargets<'_, D::Node>,
        event: &mut ClickEvent<D::Node>,
    ) -> Result<Option<ActionOutcome>> {
        let Some(marker) = self.classify(dom, &event.target) else {
            return Ok(None);
        };
        event.consume();
        debug!(kind = ?marker.kind, category = %marker.category, "Action marker clicked");

        let outcome = match marker.kind {
            MarkerKind::Preview => match self.card_image(dom, &marker.element) {
                Some(src) => {
                    let title = format!("{} Image", marker.category);
                    targets.modal.open(dom, targets.registry, &src, &title)?;
                    ActionOutcome::Previewed { title }
                }
                None => ActionOutcome::NoImage { kind: marker.kind },
            },
            MarkerKind::Save => match self.card_image(dom, &marker.element) {
                Some(src) => {
                    let filename = format!("{}_image.jpg", marker.category);
                    browser.download(&src, &filename)?;
                    info!(%filename, "Image saved");
                    ActionOutcome::Saved { filename }
                }
                None => ActionOutcome::NoImage { kind: marker.kind },
            },
            MarkerKind::Back => {
                if browser.location_path() != "/" && browser.history_length() > 1 {
                    browser.history_back();
                    ActionOutcome::WentBack
                } else {
                    browser.navigate("/");
                    ActionOutcome::NavigatedHome
                }
            }
            MarkerKind::Export => match targets.exporter.export(dom, browser) {
                Ok(report) => ActionOutcome::Exported {
                    filename: report.filename,
                },
                Err(Error::NoReportContent) => {
                    browser.alert(targets.exporter.missing_notice());
                    ActionOutcome::NothingToExport
                }
                Err(e) => return Err(e),
            },
        };

        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::RecordingBrowser;
    use crate::config::ExportConfig;
    use crate::disposer::ListenerKind;
    use crate::dom::{MemoryDom, NodeId};

    struct Fixture {
        dom: MemoryDom,
        browser: RecordingBrowser,
        modal: ModalController<NodeId>,
        registry: ListenerRegistry,
        exporter: ReportExporter,
        dispatcher: ActionDispatcher,
    }

    impl Fixture {
        fn new(path: &str, history_length: usize) -> Self {
            Self {
                dom: MemoryDom::new(),
                browser: RecordingBrowser::new(path, history_length),
                modal: ModalController::new().unwrap(),
                registry: ListenerRegistry::new(),
                exporter: ReportExporter::new(&ExportConfig::default()).unwrap(),
                dispatcher: ActionDispatcher::new(&MarkerConfig::default()).unwrap(),
            }
        }

        fn click(&mut self, target: NodeId) -> (Option<ActionOutcome>, ClickEvent<NodeId>) {
            let mut event = ClickEvent::new(target);
            let outcome = self
                .dispatcher
                .dispatch(
                    &mut self.dom,
                    &mut self.browser,
                    ActionTargets {
                        modal: &mut self.modal,
                        registry: &mut self.registry,
                        exporter: &self.exporter,
                    },
                    &mut event,
                )
                .unwrap();
            (outcome, event)
        }

        /// An image card with preview and save buttons; returns (preview, save)
        fn card(&mut self, src: &str, category: &str) -> (NodeId, NodeId) {
            let body = self.dom.body_id();
            let card = self.dom.append_element(body, "div", &[("class", "image-card")]).unwrap();
            self.dom.append_element(card, "img", &[("src", src)]).unwrap();
            let preview = self.dom.append_element(
                card,
                "button",
                &[("class", "maximize-button"), ("data-image-type", category)],
            )
            .unwrap();
            let save = self.dom.append_element(
                card,
                "a",
                &[("class", "save-button"), ("data-image-type", category), ("href", "#")],
            )
            .unwrap();
            (preview, save)
        }
    }

    // ==========================================================================
    // CLASSIFICATION TESTS
    // ==========================================================================

    #[test]
    fn test_unmarked_click_is_unhandled() {
        let mut fx = Fixture::new("/", 1);
        let body = fx.dom.body_id();
        let plain = fx.dom.append_element(body, "p", &[]).unwrap();

        let (outcome, event) = fx.click(plain);
        assert_eq!(outcome, None);
        assert!(!event.is_default_prevented());
        assert!(!event.is_propagation_stopped());
    }

    #[test]
    fn test_nested_target_finds_marker() {
        let mut fx = Fixture::new("/", 1);
        let (preview, _) = fx.card("a.jpg", "Gender");
        let icon = fx.dom.append_element(preview, "i", &[]).unwrap();

        let marker = fx.dispatcher.classify(&fx.dom, &icon).unwrap();
        assert_eq!(marker.kind, MarkerKind::Preview);
        assert_eq!(marker.element, preview);
        assert_eq!(marker.category, "Gender");
    }

    #[test]
    fn test_priority_order_preview_over_save() {
        let mut fx = Fixture::new("/", 1);
        let body = fx.dom.body_id();
        // Element carrying both markers
        let both = fx.dom.append_element(body, "button", &[("class", "save-button maximize-button")]).unwrap();
        assert_eq!(fx.dispatcher.classify(&fx.dom, &both).unwrap().kind, MarkerKind::Preview);

        // Export nested inside a back marker: back outranks export
        let back = fx.dom.append_element(body, "div", &[("class", "close-button")]).unwrap();
        let export = fx.dom.append_element(back, "a", &[("id", "exportPdf")]).unwrap();
        assert_eq!(fx.dispatcher.classify(&fx.dom, &export).unwrap().kind, MarkerKind::Back);
    }

    #[test]
    fn test_missing_category_defaults() {
        let mut fx = Fixture::new("/", 1);
        let body = fx.dom.body_id();
        let button = fx.dom.append_element(body, "button", &[("class", "maximize-button")]).unwrap();
        assert_eq!(fx.dispatcher.classify(&fx.dom, &button).unwrap().category, "Image");
    }

    // ==========================================================================
    // PREVIEW AND SAVE TESTS
    // ==========================================================================

    #[test]
    fn test_preview_opens_modal() {
        let mut fx = Fixture::new("/", 1);
        let (preview, _) = fx.card("https://x/y.jpg", "Age");

        let (outcome, event) = fx.click(preview);
        assert_eq!(
            outcome,
            Some(ActionOutcome::Previewed {
                title: "Age Image".to_string()
            })
        );
        assert!(event.is_default_prevented());
        assert!(event.is_propagation_stopped());
        assert!(fx.modal.is_open());
        assert_eq!(fx.modal.instance().unwrap().media(), "https://x/y.jpg");
        assert_eq!(fx.registry.active_count(ListenerKind::Keydown), 1);
    }

    #[test]
    fn test_save_downloads_named_image() {
        let mut fx = Fixture::new("/report", 3);
        let (_, save) = fx.card("https://x/y.jpg", "Age");

        let (outcome, event) = fx.click(save);
        assert_eq!(
            outcome,
            Some(ActionOutcome::Saved {
                filename: "Age_image.jpg".to_string()
            })
        );
        assert!(event.is_default_prevented());
        assert_eq!(fx.browser.downloads.len(), 1);
        assert_eq!(fx.browser.downloads[0].href, "https://x/y.jpg");
        assert_eq!(fx.browser.downloads[0].filename, "Age_image.jpg");
        assert!(fx.browser.navigations.is_empty());
        assert_eq!(fx.browser.back_calls, 0);
    }

    #[test]
    fn test_marker_outside_card_does_nothing_but_is_consumed() {
        let mut fx = Fixture::new("/", 1);
        let body = fx.dom.body_id();
        let save = fx.dom.append_element(body, "a", &[("class", "save-button")]).unwrap();

        let (outcome, event) = fx.click(save);
        assert_eq!(outcome, Some(ActionOutcome::NoImage { kind: MarkerKind::Save }));
        assert!(event.is_default_prevented());
        assert!(fx.browser.downloads.is_empty());
    }

    // ==========================================================================
    // BACK NAVIGATION TESTS
    // ==========================================================================

    #[test]
    fn test_back_with_history_goes_back_once() {
        let mut fx = Fixture::new("/report", 2);
        let body = fx.dom.body_id();
        let back = fx.dom.append_element(body, "button", &[("class", "close-button")]).unwrap();

        let (outcome, _) = fx.click(back);
        assert_eq!(outcome, Some(ActionOutcome::WentBack));
        assert_eq!(fx.browser.back_calls, 1);
        assert!(fx.browser.navigations.is_empty());
    }

    #[test]
    fn test_back_at_root_navigates_root() {
        let mut fx = Fixture::new("/", 5);
        let body = fx.dom.body_id();
        let back = fx.dom.append_element(body, "button", &[("class", "close-button")]).unwrap();

        let (outcome, _) = fx.click(back);
        assert_eq!(outcome, Some(ActionOutcome::NavigatedHome));
        assert_eq!(fx.browser.back_calls, 0);
        assert_eq!(fx.browser.navigations, vec!["/".to_string()]);
    }

    #[test]
    fn test_back_without_history_navigates_root() {
        let mut fx = Fixture::new("/report", 1);
        let body = fx.dom.body_id();
        let back = fx.dom.append_element(body, "button", &[("class", "close-button")]).unwrap();

        let (outcome, _) = fx.click(back);
        assert_eq!(outcome, Some(ActionOutcome::NavigatedHome));
        assert_eq!(fx.browser.back_calls, 0);
    }

    // ==========================================================================
    // EXPORT TESTS
    // ==========================================================================

    #[test]
    fn test_export_without_content_alerts_once() {
        let mut fx = Fixture::new("/", 1);
        let body = fx.dom.body_id();
        let export = fx.dom.append_element(body, "button", &[("id", "exportPdf")]).unwrap();

        let (outcome, event) = fx.click(export);
        assert_eq!(outcome, Some(ActionOutcome::NothingToExport));
        assert!(event.is_default_prevented());
        assert!(fx.browser.downloads.is_empty());
        assert_eq!(fx.browser.alerts.len(), 1);
        assert!(fx.browser.alerts[0].starts_with("No analysis results available"));
    }

    #[test]
    fn test_export_with_storage_downloads_report() {
        let mut fx = Fixture::new("/", 1);
        let body = fx.dom.body_id();
        let storage = fx.dom.append_element(body, "div", &[("id", "htmlContentStorage")]).unwrap();
        fx.dom.set_inner_html(storage, "<p>X</p>");
        let export = fx.dom.append_element(body, "button", &[("id", "exportPdf")]).unwrap();

        let (outcome, _) = fx.click(export);
        assert!(matches!(outcome, Some(ActionOutcome::Exported { .. })));
        assert_eq!(fx.browser.downloads.len(), 1);
        assert!(fx.browser.downloads[0].body.as_deref().unwrap().contains("<p>X</p>"));
        assert!(fx.browser.alerts.is_empty());
    }
}
