//! Pagesnap
//!
//! Full-page screenshot capture for pages taller than one viewport: scroll,
//! capture the visible viewport once per tile, and composite the tiles into
//! one seamless PNG.
//!
//! # Features
//!
//! - **Tile pipeline**: gap-free, non-duplicated coverage of the full scroll
//!   height, with fixed/sticky headers suppressed after the first tile so
//!   they appear exactly once
//! - **CDP Backend** (default): drives a headless Chrome tab via the
//!   `headless_chrome` crate
//! - **Swappable drivers**: the walker runs against a small `PageDriver`
//!   trait, so captures can be scripted in tests without a browser
//!
//! # Example
//!
//! ```no_run
//! use pagesnap::{CaptureConfig, Viewport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CaptureConfig {
//!     viewport: Viewport { width: 1280, height: 720 },
//!     ..Default::default()
//! };
//!
//! let png = pagesnap::capture_full_page("https://example.com", &config)?;
//! std::fs::write("fullpage.png", png)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod walker;
pub use walker::{PageDriver, PageGeometry, PageWalker, Tile, TileImage, WalkResult};

pub mod stitch;

pub mod output;

#[cfg(feature = "cdp")]
pub mod cdp;

// Async-friendly capture API (worker-backed abstraction)
#[cfg(feature = "cdp")]
pub mod async_api;

#[cfg(feature = "cdp")]
pub use async_api::Browser;

/// Viewport dimensions for the spawned browser window
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Heuristic thresholds for the fixed/sticky element scan.
///
/// A `position: fixed` header stays anchored to the viewport top across
/// scroll offsets, so every tile after the first would contain another copy
/// of it. The scan flags fixed/sticky elements near the viewport top that
/// are large enough to be page chrome, and the walker hides them for tiles
/// `1..N`. There is no exact signal separating repeating chrome from
/// intentionally fixed content, so these thresholds are tunable: too loose
/// and bottom banners or floating buttons get hidden, too strict and a thin
/// sticky toolbar repeats in every tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedElementPolicy {
    /// Only elements whose bounding-box top is above this offset qualify
    pub max_top: u32,
    /// Minimum height; filters decorative slivers like border stripes
    pub min_height: u32,
    /// Minimum width; filters floating action buttons
    pub min_width: u32,
}

impl Default for FixedElementPolicy {
    fn default() -> Self {
        Self {
            max_top: 200,
            min_height: 10,
            min_width: 100,
        }
    }
}

/// Configuration for one capture session
///
/// The defaults are chosen to work on most pages without tuning: settle
/// delays long enough for lazy content and reflow to finish, and the
/// fixed-element heuristic enabled. Settle waits are fixed bounded delays
/// rather than load-signal polling, trading occasional late-loading content
/// for independence from page-specific signals.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// User agent string the browser sends with requests
    pub user_agent: String,
    /// Viewport dimensions for the spawned browser
    pub viewport: Viewport,
    /// Timeout for page loads in milliseconds
    pub load_timeout_ms: u64,
    /// Pause after navigation before the session starts
    pub load_settle_ms: u64,
    /// Pause after scrolling to the top, so lazy content finishes its first
    /// layout pass before the page height is measured
    pub initial_settle_ms: u64,
    /// Pause after each per-tile scroll, long enough for reflow and repaint
    pub tile_settle_ms: u64,
    /// Pause after hiding fixed elements before the next capture
    pub hide_settle_ms: u64,
    /// Whether to hide fixed/sticky chrome for tiles after the first
    pub hide_fixed_elements: bool,
    /// Thresholds for the fixed/sticky element scan
    pub fixed_policy: FixedElementPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Pagesnap/0.1"
                .to_string(),
            viewport: Viewport::default(),
            load_timeout_ms: 30000,
            load_settle_ms: 500,
            initial_settle_ms: 300,
            tile_settle_ms: 150,
            hide_settle_ms: 100,
            hide_fixed_elements: true,
            fixed_policy: FixedElementPolicy::default(),
        }
    }
}

/// Schemes for privileged or internal surfaces that cannot be scripted.
const RESTRICTED_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "edge",
    "about",
    "devtools",
    "view-source",
];

/// Validate that a target URL points at a capturable surface.
///
/// Privileged browser surfaces reject script injection, so they are refused
/// up front, before any navigation or DOM mutation is attempted.
pub fn ensure_capturable(target: &str) -> Result<()> {
    let parsed = url::Url::parse(target)
        .map_err(|e| Error::UnreachableTarget(format!("{}: {}", target, e)))?;
    if RESTRICTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(Error::UnreachableTarget(format!(
            "{}:// pages cannot be captured",
            parsed.scheme()
        )));
    }
    Ok(())
}

/// Walk an already-prepared page and stitch the result.
///
/// Useful with custom [`PageDriver`] implementations; the convenience entry
/// points below use it with the CDP backend.
pub fn walk_and_stitch<D: PageDriver>(driver: &mut D, config: &CaptureConfig) -> Result<Vec<u8>> {
    let walk = PageWalker::new(config.clone()).capture(driver)?;
    stitch::stitch(&walk.tiles, &walk.geometry)
}

/// Capture a full-page screenshot of `url` and return the encoded PNG.
///
/// Validates the target, launches the CDP backend, navigates, runs the
/// scroll/capture walk, and stitches the tiles. The page is left exactly as
/// it was found.
#[cfg(feature = "cdp")]
pub fn capture_full_page(url: &str, config: &CaptureConfig) -> Result<Vec<u8>> {
    ensure_capturable(url)?;
    let mut page = cdp::CdpPage::new(config)?;
    page.goto(url)?;
    walk_and_stitch(&mut page, config)
}

/// Capture a full-page screenshot of `url` and save it under `dir` as
/// `fullpage-<timestamp>.png`, returning the written path.
#[cfg(feature = "cdp")]
pub fn capture_full_page_to_file(
    url: &str,
    config: &CaptureConfig,
    dir: &std::path::Path,
) -> Result<std::path::PathBuf> {
    let png = capture_full_page(url, config)?;
    output::save_png(&png, dir)
}
