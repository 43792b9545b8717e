//! Report Overlay - page-level interaction layer for analysis result pages
//!
//! A results page renders image cards, a "back" link and an export button.
//! This crate adds the behaviour around them:
//!
//! - a floating scroll-to-top control that follows whichever surface (page
//!   or nested container) the user scrolled last
//! - a full-screen image preview with close button, backdrop and Escape
//! - delegated click actions: preview, save image, back, export report
//! - export of the already-rendered results as a standalone HTML download
//!
//! # Architecture
//!
//! Everything is driven through [`OverlayController`], which is generic over
//! a [`Dom`] and a [`Browser`]. The `wasm-overlay` crate binds it to the live
//! page; [`MemoryDom`] and [`RecordingBrowser`] run the same logic in memory
//! for tests and for [`session`] replay.
//!
//! # Quick Start
//!
//! ```no_run
//! use report_overlay::{ClickEvent, Dom, MemoryDom, OverlayConfig, OverlayController, RecordingBrowser};
//!
//! let mut dom = MemoryDom::new();
//! let mut browser = RecordingBrowser::default();
//! let mut controller = OverlayController::new(&OverlayConfig::default())?;
//! controller.install(&mut dom)?;
//!
//! let target = dom.body().unwrap();
//! let outcome = controller.handle_click(&mut dom, &mut browser, &mut ClickEvent::new(target))?;
//! println!("{:?}", outcome);
//! # Ok::<(), report_overlay::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`controller`]: the single owner of overlay state
//! - [`scroll`], [`modal`], [`actions`], [`menu`]: the individual behaviours
//! - [`styles`]: the page stylesheet added on install
//! - [`report`]: content location and the export template
//! - [`dom`], [`browser`]: host abstractions and their in-memory versions
//! - [`config`]: TOML configuration
//! - [`session`]: JSON session replay

pub mod actions;
pub mod browser;
pub mod config;
pub mod controller;
pub mod disposer;
pub mod dom;
pub mod error;
pub mod menu;
pub mod modal;
pub mod report;
#[cfg(feature = "cli")]
pub mod serve;
pub mod scroll;
pub mod session;
pub mod styles;

pub use actions::{ActionOutcome, ClickEvent, MarkerKind};
pub use browser::{Blob, Browser, RecordingBrowser};
pub use config::{load_config, OverlayConfig, ScrollRoot};
pub use controller::{ClickOutcome, OverlayController};
pub use dom::{Dom, EventTarget, MemoryDom, ScrollSurface, Selector};
pub use error::{Error, Result};
pub use report::ReportExporter;
pub use session::{replay, Session, Transcript};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the root.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let config = OverlayConfig::default();
        let _controller: OverlayController<dom::NodeId> = OverlayController::new(&config).unwrap();
        let _exporter = ReportExporter::new(&config.export).unwrap();
        let _browser = RecordingBrowser::default();
    }

    #[test]
    fn test_marker_priority_order() {
        assert_eq!(
            MarkerKind::PRIORITY,
            [MarkerKind::Preview, MarkerKind::Save, MarkerKind::Back, MarkerKind::Export]
        );
    }

    #[test]
    fn test_quick_start_flow() {
        let mut dom = MemoryDom::new();
        let mut browser = RecordingBrowser::default();
        let mut controller = OverlayController::new(&OverlayConfig::default()).unwrap();
        controller.install(&mut dom).unwrap();

        let target = dom.body().unwrap();
        let outcome = controller
            .handle_click(&mut dom, &mut browser, &mut ClickEvent::new(target))
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Ignored);
    }
}
