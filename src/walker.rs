//! Page walker: the scroll-and-capture loop
//!
//! The walker owns one capture session against a live page. It measures the
//! scrollable height, splits it into viewport-sized tiles, scrolls to each
//! tile position, neutralizes fixed/sticky chrome after the first tile, and
//! requests one viewport capture per tile through the [`PageDriver`] seam.
//! Every DOM mutation it causes (scroll position, style overrides, hidden
//! elements) is reverted before it returns, on success and on error alike.

use crate::{CaptureConfig, Error, FixedElementPolicy, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;

/// Page dimensions in logical (CSS) pixels, measured once per session after
/// scrolling to the top and letting lazy content settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Visible viewport width
    pub viewport_width: u32,
    /// Visible viewport height
    pub viewport_height: u32,
    /// Full scrollable height of the document
    pub scroll_height: u32,
}

impl PageGeometry {
    /// Number of viewport-sized tiles needed to cover the full height.
    pub fn tile_count(&self) -> u32 {
        if self.viewport_height == 0 {
            return 0;
        }
        self.scroll_height.div_ceil(self.viewport_height)
    }

    /// The largest reachable scroll offset. Scroll targets beyond this are
    /// clamped by the browser, so the walker clamps them up front.
    pub fn max_scroll_y(&self) -> u32 {
        self.scroll_height.saturating_sub(self.viewport_height)
    }
}

/// Raster data for one captured tile.
///
/// Host primitives differ in what they hand back: the CDP screenshot call
/// returns encoded bytes, while extension-style primitives return `data:`
/// URLs. The compositor accepts both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileImage {
    /// Encoded image bytes (PNG unless the primitive says otherwise)
    Bytes(Vec<u8>),
    /// A `data:image/...;base64,` URL
    DataUrl(String),
}

impl TileImage {
    /// Raw encoded bytes, decoding the base64 payload of a data URL if needed.
    pub fn to_bytes(&self) -> Result<Cow<'_, [u8]>> {
        use base64::Engine as _;
        match self {
            TileImage::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            TileImage::DataUrl(url) => {
                let payload = url
                    .split_once("base64,")
                    .map(|(_, rest)| rest)
                    .ok_or_else(|| Error::DecodeError("malformed data URL".into()))?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(payload)
                    .map_err(|e| Error::DecodeError(format!("invalid base64 in data URL: {}", e)))?;
                Ok(Cow::Owned(bytes))
            }
        }
    }
}

/// One captured viewport image plus placement metadata.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Captured raster data for the visible viewport
    pub image: TileImage,
    /// Scroll offset (logical pixels) at which this tile was captured
    pub logical_scroll_y: u32,
    /// Scroll offset the walker intended before clamping to the document end
    pub requested_scroll_y: u32,
    /// True for the last tile in the sequence
    pub is_final: bool,
    /// Logical pixels by which this tile's top duplicates the previous tile;
    /// nonzero only on a clamped final tile
    pub overlap_offset: u32,
}

/// Snapshot of the page state the walker overrides, recorded by
/// [`PageDriver::prepare`] and replayed by [`PageDriver::restore`] on every
/// exit path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshot {
    /// Scroll offset before the session started
    pub scroll_y: u32,
    /// Inline `overflow` of the document root
    pub overflow: String,
    /// Inline `scroll-behavior` of the document root
    pub scroll_behavior: String,
    /// Inline `scroll-behavior` of `<body>`
    pub body_scroll_behavior: String,
}

/// One fixed/sticky element hidden during tiles `1..N`, keyed by a
/// driver-side handle so restoration does not need to re-run the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedElementRecord {
    /// Driver-side registry index for the hidden element
    pub handle: u32,
    /// Inline `display` value to restore
    pub original_display: String,
}

/// Driver seam between the walker and the live page.
///
/// One implementation drives a real browser over CDP (`cdp::CdpPage`); tests
/// use an in-memory fake. The capture primitive is a single-concurrency
/// resource, so all methods take `&mut self` and the walker calls them
/// strictly sequentially.
pub trait PageDriver {
    /// Record the restore snapshot, then force immediate (non-smooth)
    /// scrolling and hide the scrollbar.
    fn prepare(&mut self) -> Result<DomSnapshot>;

    /// Replay a snapshot recorded by [`prepare`](Self::prepare).
    fn restore(&mut self, snapshot: &DomSnapshot) -> Result<()>;

    /// Measure the page, taking the maximum of body and document-root heights
    /// (either may under-report depending on the browser).
    fn measure(&mut self) -> Result<PageGeometry>;

    /// Scroll the viewport to a vertical offset in logical pixels.
    fn scroll_to(&mut self, y: u32) -> Result<()>;

    /// Scan for fixed/sticky elements matching `policy`, force them out of
    /// the layout, and return one record per hidden element.
    fn hide_fixed_elements(&mut self, policy: &FixedElementPolicy)
        -> Result<Vec<FixedElementRecord>>;

    /// Restore elements hidden by
    /// [`hide_fixed_elements`](Self::hide_fixed_elements).
    fn restore_fixed_elements(&mut self, records: &[FixedElementRecord]) -> Result<()>;

    /// Capture the currently visible viewport. An error here fails only the
    /// current tile (skip-and-continue).
    fn capture_viewport(&mut self) -> Result<TileImage>;
}

/// Settle-delay seam. The wall-clock default sleeps the calling thread;
/// tests inject a recording double instead of waiting.
pub trait Sleeper {
    fn sleep(&self, ms: u64);
}

/// Default [`Sleeper`] backed by `std::thread::sleep`.
pub struct WallClock;

impl Sleeper for WallClock {
    fn sleep(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// The ordered tile sequence and geometry produced by one walk.
#[derive(Debug, Clone)]
pub struct WalkResult {
    pub tiles: Vec<Tile>,
    pub geometry: PageGeometry,
}

/// Drives one capture session over a [`PageDriver`].
pub struct PageWalker<S: Sleeper = WallClock> {
    config: CaptureConfig,
    sleeper: S,
}

impl PageWalker {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            sleeper: WallClock,
        }
    }
}

impl<S: Sleeper> PageWalker<S> {
    /// Build a walker with an injected settle-delay implementation.
    pub fn with_sleeper(config: CaptureConfig, sleeper: S) -> Self {
        Self { config, sleeper }
    }

    /// Run the full scroll/capture loop.
    ///
    /// Returns the ordered tile sequence and geometry, with failed tiles
    /// omitted. Fails with [`Error::EmptyResult`] if no tile succeeded. All
    /// page-state mutations are reverted before this returns, and a failed
    /// restore never masks the walk's own error.
    pub fn capture<D: PageDriver>(&self, driver: &mut D) -> Result<WalkResult> {
        let snapshot = driver.prepare()?;
        let mut hidden: Vec<FixedElementRecord> = Vec::new();

        let outcome = self.walk(driver, &mut hidden);

        if !hidden.is_empty() {
            if let Err(e) = driver.restore_fixed_elements(&hidden) {
                warn!("failed to restore {} hidden element(s): {}", hidden.len(), e);
            }
        }
        if let Err(e) = driver.restore(&snapshot) {
            warn!("failed to restore page state: {}", e);
        }

        outcome
    }

    fn walk<D: PageDriver>(
        &self,
        driver: &mut D,
        hidden: &mut Vec<FixedElementRecord>,
    ) -> Result<WalkResult> {
        // Measure from the top; lazy content may grow the page on its first
        // layout pass, so give it a moment before trusting scrollHeight.
        driver.scroll_to(0)?;
        self.sleeper.sleep(self.config.initial_settle_ms);

        let geometry = driver.measure()?;
        if geometry.viewport_height == 0 {
            return Err(Error::ScriptError("measured viewport height is zero".into()));
        }

        let num_tiles = geometry.tile_count();
        let max_scroll = geometry.max_scroll_y();
        info!(
            "capture params: viewport {}x{}, scroll height {}, {} tile(s)",
            geometry.viewport_width, geometry.viewport_height, geometry.scroll_height, num_tiles
        );

        let mut tiles = Vec::with_capacity(num_tiles as usize);
        for i in 0..num_tiles {
            let requested = i * geometry.viewport_height;
            let actual = requested.min(max_scroll);

            driver.scroll_to(actual)?;
            self.sleeper.sleep(self.config.tile_settle_ms);

            // The first tile keeps fixed/sticky chrome where the reader
            // expects it; every later tile would repeat it, so hide matching
            // elements once we are past tile 0.
            if i == 1 && self.config.hide_fixed_elements {
                let records = driver.hide_fixed_elements(&self.config.fixed_policy)?;
                info!("hid {} fixed/sticky element(s)", records.len());
                hidden.extend(records);
                self.sleeper.sleep(self.config.hide_settle_ms);
            }

            let image = match driver.capture_viewport() {
                Ok(image) => image,
                Err(e) => {
                    warn!("skipping tile {}/{}: {}", i + 1, num_tiles, e);
                    continue;
                }
            };

            let is_final = i == num_tiles - 1;
            let overlap_offset = if is_final && actual != requested {
                requested - actual
            } else {
                0
            };

            tiles.push(Tile {
                image,
                logical_scroll_y: actual,
                requested_scroll_y: requested,
                is_final,
                overlap_offset,
            });
            debug!("captured tile {}/{} at scroll {}", i + 1, num_tiles, actual);
        }

        if tiles.is_empty() {
            return Err(Error::EmptyResult);
        }
        Ok(WalkResult { tiles, geometry })
    }
}
