use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagesnap", version, about = "Capture a full-page screenshot of a URL")]
struct Args {
    /// Page to capture
    url: String,

    /// Directory the screenshot is written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Browser viewport width in CSS pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Browser viewport height in CSS pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Pause after scrolling to the top before measuring, in milliseconds
    #[arg(long, default_value_t = 300)]
    settle_ms: u64,

    /// Pause after each per-tile scroll, in milliseconds
    #[arg(long, default_value_t = 150)]
    tile_settle_ms: u64,

    /// Leave fixed/sticky headers visible in every tile
    #[arg(long)]
    keep_fixed: bool,

    /// Fixed-element scan: maximum top offset in CSS pixels
    #[arg(long, default_value_t = 200)]
    fixed_max_top: u32,
}

#[cfg(feature = "cdp")]
fn main() {
    let args = Args::parse();

    let config = pagesnap::CaptureConfig {
        viewport: pagesnap::Viewport {
            width: args.width,
            height: args.height,
        },
        initial_settle_ms: args.settle_ms,
        tile_settle_ms: args.tile_settle_ms,
        hide_fixed_elements: !args.keep_fixed,
        fixed_policy: pagesnap::FixedElementPolicy {
            max_top: args.fixed_max_top,
            ..Default::default()
        },
        ..Default::default()
    };

    match pagesnap::capture_full_page_to_file(&args.url, &config, &args.out_dir) {
        Ok(path) => println!("Saved {}", path.display()),
        Err(e) => {
            eprintln!("Capture failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "cdp"))]
fn main() {
    let _ = Args::parse();
    eprintln!("pagesnap was built without the cdp feature; no backend available");
    std::process::exit(1);
}
