//! Browser binding for the report overlay
//!
//! Loading the module installs the overlay with default settings. Call
//! `install(config)` to reinstall with a custom configuration object (same
//! shape as the TOML config) and `uninstall()` to detach every listener.

mod browser;
mod dom;

use browser::WebBrowser;
use dom::WebDom;
use report_overlay::{ClickEvent, EventTarget, OverlayConfig, OverlayController, ScrollSurface};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, Document, Element, Event, KeyboardEvent, MouseEvent, Window};

struct Shared {
    dom: WebDom,
    browser: WebBrowser,
    controller: OverlayController<Element>,
}

/// Snapshot handed to JS by `state()`
#[derive(Serialize)]
struct OverlayState {
    page_active: bool,
    control_visible: bool,
    preview_open: bool,
    listeners: usize,
}

struct ReportOverlay {
    shared: Rc<RefCell<Shared>>,
    window: Window,
    document: Document,
    click_closure: Closure<dyn FnMut(MouseEvent)>,
    key_closure: Closure<dyn FnMut(KeyboardEvent)>,
    scroll_closure: Closure<dyn FnMut(Event)>,
    #[allow(dead_code)] // Kept alive until the timer fires or is cleared
    settle_closure: Closure<dyn FnMut()>,
    settle_handle: Option<i32>,
}

thread_local! {
    static INSTANCE: RefCell<Option<ReportOverlay>> = const { RefCell::new(None) };
}

fn log_error(context: &str, message: &str) {
    console::error_1(&JsValue::from_str(&format!("report-overlay: {}: {}", context, message)));
}

impl ReportOverlay {
    fn new(config: OverlayConfig) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let mut dom = WebDom::new(window.clone(), document.clone());
        let mut controller = OverlayController::new(&config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        controller
            .install(&mut dom)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let delay_ms = controller.timer_delay_ms();

        let shared = Rc::new(RefCell::new(Shared {
            dom,
            browser: WebBrowser::new(window.clone(), document.clone()),
            controller,
        }));

        // A download clicks a synthetic anchor, which re-enters this listener
        // while the state is borrowed; that nested click is left alone.
        let click_closure = {
            let shared = shared.clone();
            Closure::wrap(Box::new(move |event: MouseEvent| {
                let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                    return;
                };
                let Ok(mut guard) = shared.try_borrow_mut() else {
                    return;
                };
                let state = &mut *guard;
                let mut click = ClickEvent::new(target);
                if let Err(e) = state.controller.handle_click(&mut state.dom, &mut state.browser, &mut click) {
                    log_error("click", &e.to_string());
                }
                if click.is_default_prevented() {
                    event.prevent_default();
                }
                if click.is_propagation_stopped() {
                    event.stop_propagation();
                }
            }) as Box<dyn FnMut(MouseEvent)>)
        };
        document
            .add_event_listener_with_callback("click", click_closure.as_ref().unchecked_ref())
            .ok();

        let key_closure = {
            let shared = shared.clone();
            Closure::wrap(Box::new(move |event: KeyboardEvent| {
                if let Ok(mut guard) = shared.try_borrow_mut() {
                    let state = &mut *guard;
                    state.controller.handle_keydown(&mut state.dom, &event.key());
                }
            }) as Box<dyn FnMut(KeyboardEvent)>)
        };
        document
            .add_event_listener_with_callback("keydown", key_closure.as_ref().unchecked_ref())
            .ok();

        // Capture phase: scroll does not bubble, nested containers only
        // reach a document listener this way
        let scroll_closure = {
            let shared = shared.clone();
            Closure::wrap(Box::new(move |event: Event| {
                let origin = match event.target() {
                    Some(t) if t.dyn_ref::<Document>().is_some() => EventTarget::Document,
                    Some(t) => match t.dyn_into::<Element>() {
                        Ok(element) => EventTarget::Element(element),
                        Err(_) => EventTarget::Document,
                    },
                    None => EventTarget::Document,
                };
                if let Ok(mut guard) = shared.try_borrow_mut() {
                    let state = &mut *guard;
                    state.controller.handle_scroll(&mut state.dom, origin);
                }
            }) as Box<dyn FnMut(Event)>)
        };
        document
            .add_event_listener_with_callback_and_bool("scroll", scroll_closure.as_ref().unchecked_ref(), true)
            .ok();

        let settle_closure = {
            let shared = shared.clone();
            Closure::wrap(Box::new(move || {
                if let Ok(mut guard) = shared.try_borrow_mut() {
                    let state = &mut *guard;
                    state.controller.settle(&mut state.dom);
                }
            }) as Box<dyn FnMut()>)
        };
        let settle_handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(settle_closure.as_ref().unchecked_ref(), delay_ms)
            .ok();

        console::log_1(&"report-overlay: installed".into());
        Ok(Self {
            shared,
            window,
            document,
            click_closure,
            key_closure,
            scroll_closure,
            settle_closure,
            settle_handle,
        })
    }

    fn state(&self) -> Option<OverlayState> {
        let state = self.shared.try_borrow().ok()?;
        let controller = &state.controller;
        Some(OverlayState {
            page_active: matches!(controller.active_surface(), ScrollSurface::Page),
            control_visible: controller.scroll_control_visible(),
            preview_open: controller.modal().is_open(),
            listeners: controller.listeners().len(),
        })
    }
}

impl Drop for ReportOverlay {
    fn drop(&mut self) {
        self.document
            .remove_event_listener_with_callback("click", self.click_closure.as_ref().unchecked_ref())
            .ok();
        self.document
            .remove_event_listener_with_callback("keydown", self.key_closure.as_ref().unchecked_ref())
            .ok();
        self.document
            .remove_event_listener_with_callback_and_bool("scroll", self.scroll_closure.as_ref().unchecked_ref(), true)
            .ok();
        if let Some(handle) = self.settle_handle.take() {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}

/// (Re)install the overlay. `config` may be `undefined` for defaults.
#[wasm_bindgen]
pub fn install(config: JsValue) -> Result<(), JsValue> {
    let config: OverlayConfig = if config.is_undefined() || config.is_null() {
        OverlayConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };
    uninstall();
    let overlay = ReportOverlay::new(config)?;
    INSTANCE.with(|slot| *slot.borrow_mut() = Some(overlay));
    Ok(())
}

/// Detach all listeners. The scroll control node stays until the next install.
#[wasm_bindgen]
pub fn uninstall() {
    let previous = INSTANCE.with(|slot| slot.borrow_mut().take());
    drop(previous);
}

/// Current overlay state, or `undefined` when not installed
#[wasm_bindgen]
pub fn state() -> JsValue {
    INSTANCE
        .with(|slot| slot.borrow().as_ref().and_then(ReportOverlay::state))
        .and_then(|s| serde_wasm_bindgen::to_value(&s).ok())
        .unwrap_or(JsValue::UNDEFINED)
}

/// Default configuration as a plain JS object
#[wasm_bindgen(js_name = "defaultConfig")]
pub fn default_config() -> Result<JsValue, JsValue> {
    Ok(serde_wasm_bindgen::to_value(&OverlayConfig::default())?)
}

#[wasm_bindgen(start)]
pub fn init() {
    if let Err(e) = install(JsValue::UNDEFINED) {
        log_error("install", &format!("{:?}", e));
    }
}
