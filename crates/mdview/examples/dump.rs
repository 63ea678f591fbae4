//! Renders a Markdown file once at a fixed width and prints the result as plain text.
//!
//! `cargo run -p mdview --example dump --features markdown -- README.md 80`
use mdview::core::surface::BufferSurface;
use mdview::markdown::assets::AssetSource;
use mdview::markdown::assets::FsAssets;
use mdview::markdown::ast::ParseOptions;
use mdview::markdown::ast::parse;
use mdview::markdown::builder::LayoutBuilder;
use mdview::markdown::images::ImageCache;
use mdview::markdown::layout::LayoutOptions;
use mdview::markdown::layout::Viewport;
use mdview::theme::Theme;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

fn main() -> io::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "README.md".to_string());
    let width = args.next().and_then(|w| w.parse::<u16>().ok()).unwrap_or(80);

    let assets = Arc::new(FsAssets);
    let path = assets
        .resolve(Path::new(""), &path)
        .unwrap_or_else(|| Path::new(&path).to_path_buf());
    let source = String::from_utf8_lossy(&assets.read(&path)?).into_owned();

    let mut images = ImageCache::new(assets);
    let document = parse(&source, &ParseOptions::default());
    let mut layout =
        LayoutBuilder::new(&path, &mut images, LayoutOptions::default()).build(&document);

    let deadline = Instant::now() + Duration::from_secs(2);
    while images.poll() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    layout.arrange(width);
    let height = layout.height().min(u16::MAX as u32) as u16;
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    let mut surface = BufferSurface::new(&mut buf, area);
    layout.draw(&mut surface, Viewport::new(area, 0), &Theme::default());

    for y in 0..height {
        let line = (0..width)
            .filter_map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()))
            .collect::<String>();
        println!("{}", line.trim_end());
    }
    Ok(())
}
