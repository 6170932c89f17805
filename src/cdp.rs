//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)
//!
//! `CdpPage` launches a headless Chrome instance, manages a single tab, and
//! implements [`PageDriver`] by evaluating small page scripts for the DOM
//! side of the walk (snapshot/restore, measurement, scrolling, the
//! fixed-element scan) and by taking viewport screenshots through the tab.
//! The hidden-element registry lives in the page (`window.__pagesnap_hidden`)
//! so element references never cross the protocol boundary; the records
//! returned to the walker carry registry indices only.

use crate::walker::{DomSnapshot, FixedElementRecord, PageDriver, PageGeometry, TileImage};
use crate::{CaptureConfig, Error, FixedElementPolicy, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::warn;
use std::sync::Arc;
use std::time::Duration;

const PREPARE_JS: &str = r#"(() => {
    const doc = document.documentElement;
    const body = document.body;
    const snap = {
        scroll_y: Math.round(window.scrollY),
        overflow: doc.style.overflow,
        scroll_behavior: doc.style.scrollBehavior,
        body_scroll_behavior: body ? body.style.scrollBehavior : ""
    };
    doc.style.scrollBehavior = "auto";
    doc.style.overflow = "hidden";
    if (body) body.style.scrollBehavior = "auto";
    return JSON.stringify(snap);
})()"#;

const MEASURE_JS: &str = r#"(() => {
    const doc = document.documentElement;
    const body = document.body;
    const heights = body
        ? [body.scrollHeight, body.offsetHeight, doc.scrollHeight, doc.offsetHeight]
        : [doc.scrollHeight, doc.offsetHeight];
    return JSON.stringify({
        viewport_width: window.innerWidth,
        viewport_height: window.innerHeight,
        scroll_height: Math.max.apply(null, heights)
    });
})()"#;

// Templates are expanded with token replacement to avoid escaping every
// brace for `format!`.
const RESTORE_TEMPLATE: &str = r#"(() => {
    const snap = __SNAPSHOT__;
    const doc = document.documentElement;
    const body = document.body;
    doc.style.overflow = snap.overflow;
    doc.style.scrollBehavior = snap.scroll_behavior;
    if (body) body.style.scrollBehavior = snap.body_scroll_behavior;
    window.scrollTo(0, snap.scroll_y);
    return "ok";
})()"#;

const HIDE_FIXED_TEMPLATE: &str = r#"(() => {
    const records = [];
    window.__pagesnap_hidden = window.__pagesnap_hidden || [];
    const registry = window.__pagesnap_hidden;
    for (const el of document.querySelectorAll("*")) {
        const style = window.getComputedStyle(el);
        if (style.position !== "fixed" && style.position !== "sticky") continue;
        const rect = el.getBoundingClientRect();
        if (rect.top >= __MAX_TOP__) continue;
        if (rect.height <= __MIN_HEIGHT__ || rect.width <= __MIN_WIDTH__) continue;
        const original = el.style.display;
        records.push({ handle: registry.length, original_display: original });
        registry.push({ el: el, display: original });
        el.style.setProperty("display", "none", "important");
    }
    return JSON.stringify(records);
})()"#;

const RESTORE_FIXED_JS: &str = r#"(() => {
    const registry = window.__pagesnap_hidden || [];
    for (const entry of registry) {
        entry.el.style.display = entry.display;
    }
    window.__pagesnap_hidden = [];
    return JSON.stringify(registry.length);
})()"#;

/// CDP-backed page driver.
pub struct CdpPage {
    browser: Browser,
    tab: Arc<Tab>,
    config: CaptureConfig,
}

impl CdpPage {
    /// Launch headless Chrome with the configured viewport and user agent.
    pub fn new(config: &CaptureConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| {
                Error::InitializationError(format!("Failed to build launch options: {}", e))
            })?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_millis(config.load_timeout_ms));

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;

        Ok(Self {
            browser,
            tab,
            config: config.clone(),
        })
    }

    /// Navigate to a URL and wait for the load to settle.
    pub fn goto(&mut self, url: &str) -> Result<()> {
        crate::ensure_capturable(url)?;

        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        // Let the page stabilize before the session measures anything.
        std::thread::sleep(Duration::from_millis(self.config.load_settle_ms));
        Ok(())
    }

    /// Close the page and terminate the browser process.
    pub fn close(self) -> Result<()> {
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }

    /// Evaluate a script whose result is a `JSON.stringify`'d payload and
    /// deserialize it.
    fn eval_json<T: serde::de::DeserializeOwned>(&self, script: &str, what: &str) -> Result<T> {
        let eval = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::ScriptError(format!("{} failed: {}", what, e)))?;

        let value = eval
            .value
            .ok_or_else(|| Error::ScriptError(format!("{} returned no value", what)))?;
        let text = value
            .as_str()
            .ok_or_else(|| Error::ScriptError(format!("{} returned a non-string value", what)))?;

        serde_json::from_str(text)
            .map_err(|e| Error::ScriptError(format!("{} returned malformed JSON: {}", what, e)))
    }

    /// Evaluate a script for its side effect only.
    fn run(&self, script: &str, what: &str) -> Result<()> {
        self.tab
            .evaluate(script, false)
            .map_err(|e| Error::ScriptError(format!("{} failed: {}", what, e)))?;
        Ok(())
    }
}

impl PageDriver for CdpPage {
    fn prepare(&mut self) -> Result<DomSnapshot> {
        self.eval_json(PREPARE_JS, "prepare")
    }

    fn restore(&mut self, snapshot: &DomSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| Error::ScriptError(format!("snapshot serialization failed: {}", e)))?;
        let script = RESTORE_TEMPLATE.replace("__SNAPSHOT__", &json);
        self.run(&script, "restore")
    }

    fn measure(&mut self) -> Result<PageGeometry> {
        let mut geometry: PageGeometry = self.eval_json(MEASURE_JS, "measure")?;
        // Either height source may under-report; a page can never scroll
        // less than one viewport.
        geometry.scroll_height = geometry.scroll_height.max(geometry.viewport_height);
        Ok(geometry)
    }

    fn scroll_to(&mut self, y: u32) -> Result<()> {
        self.run(&format!("window.scrollTo(0, {})", y), "scroll")
    }

    fn hide_fixed_elements(
        &mut self,
        policy: &FixedElementPolicy,
    ) -> Result<Vec<FixedElementRecord>> {
        let script = HIDE_FIXED_TEMPLATE
            .replace("__MAX_TOP__", &policy.max_top.to_string())
            .replace("__MIN_HEIGHT__", &policy.min_height.to_string())
            .replace("__MIN_WIDTH__", &policy.min_width.to_string());
        self.eval_json(&script, "fixed-element scan")
    }

    fn restore_fixed_elements(&mut self, records: &[FixedElementRecord]) -> Result<()> {
        let restored: u32 = self.eval_json(RESTORE_FIXED_JS, "fixed-element restore")?;
        if restored as usize != records.len() {
            warn!(
                "fixed-element registry restored {} element(s), walker recorded {}",
                restored,
                records.len()
            );
        }
        Ok(())
    }

    fn capture_viewport(&mut self) -> Result<TileImage> {
        let bytes = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| Error::CaptureError(e.to_string()))?;
        Ok(TileImage::Bytes(bytes))
    }
}
