//! Capture a full-page screenshot of a URL and save it next to the binary
//!
//! Usage: cargo run --example fullpage -- https://example.com

use pagesnap::{CaptureConfig, Viewport};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    let config = CaptureConfig {
        viewport: Viewport {
            width: 1280,
            height: 720,
        },
        ..Default::default()
    };

    println!("Capturing {} ...", url);
    println!(
        "  Viewport: {}x{}",
        config.viewport.width, config.viewport.height
    );
    println!(
        "  Fixed-element heuristic: {}",
        if config.hide_fixed_elements { "on" } else { "off" }
    );

    let path = pagesnap::capture_full_page_to_file(&url, &config, Path::new("."))?;
    println!("Saved {}", path.display());
    Ok(())
}
