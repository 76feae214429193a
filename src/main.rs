use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Headless driver for the viewer core: opens a document, applies
/// page/zoom/viewport, renders the visible region to PNG and prints
/// document status.
#[derive(Parser, Debug)]
#[command(name = "slateview", version, about)]
struct Cli {
    /// Path to the PDF document
    path: PathBuf,

    /// Page to show (1-based)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Zoom factor
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1024)]
    width: i32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 768)]
    height: i32,

    /// Scroll offset, pixels
    #[arg(long, default_value_t = 0)]
    scroll_x: i32,
    #[arg(long, default_value_t = 0)]
    scroll_y: i32,

    /// Write the rendered visible region to this PNG file
    #[arg(long)]
    out: Option<PathBuf>,

    /// Export the whole page to this PNG file
    #[arg(long)]
    export_page: Option<PathBuf>,

    /// Write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[cfg(feature = "pdf")]
fn main() -> Result<()> {
    use std::fs::File;

    use log::info;
    use simplelog::{Config, LevelFilter, WriteLogger};
    use slateview::engine::MupdfEngine;
    use slateview::recent::RecentFiles;
    use slateview::{Viewer, config, export};

    let cli = Cli::parse();

    if let Some(log_path) = &cli.log_file {
        let file = File::create(log_path)
            .with_context(|| format!("cannot create log file {}", log_path.display()))?;
        WriteLogger::init(LevelFilter::Debug, Config::default(), file)?;
    }

    let mut viewer = Viewer::new(MupdfEngine::new(), config::load());
    viewer.on_resize(cli.width, cli.height);

    viewer
        .open_document(&cli.path)
        .with_context(|| format!("failed to open {}", cli.path.display()))?;
    info!("opened {}", cli.path.display());

    if let Some(path) = RecentFiles::default_path() {
        let limit = viewer.config().max_recent;
        let mut recent = RecentFiles::load(&path, limit).unwrap_or_else(|_| RecentFiles::new(limit));
        recent.add(&cli.path);
        if let Err(error) = recent.save(&path) {
            log::warn!("could not update recent files: {error}");
        }
    }

    viewer.set_page(cli.page.saturating_sub(1))?;
    viewer.zoom(cli.zoom, None);
    viewer.scroll_by(cli.scroll_x, cli.scroll_y);

    let status = viewer.status().context("no document state")?;
    println!(
        "{}: page {} / {} at {:.0}%",
        cli.path.display(),
        status.page_index + 1,
        status.page_count,
        status.zoom * 100.0,
    );

    if let Some(out) = &cli.out {
        let rendered = viewer.render()?.context("nothing to render")?;
        export::save_frame_png(out, &rendered.frame)?;
        println!(
            "rendered {}x{} region to {} in {:.1}ms",
            rendered.frame.width,
            rendered.frame.height,
            out.display(),
            rendered.stats.elapsed.as_secs_f64() * 1000.0,
        );
    }

    if let Some(out) = &cli.export_page {
        viewer.export_current_page_png(out)?;
        println!("exported page {} to {}", status.page_index + 1, out.display());
    }

    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn main() -> Result<()> {
    let _ = Cli::parse();
    anyhow::bail!("slateview was built without the `pdf` feature; rebuild with --features pdf");
}
