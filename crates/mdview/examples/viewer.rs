use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableMouseCapture;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEventKind;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use mdview::MarkdownViewer;
use mdview::MarkdownViewerOptions;
use mdview::ViewerAction;
use mdview::core::crossterm_input::input_event_from_crossterm;
use mdview::markdown::assets::FsAssets;
use mdview::markdown::history::History;
use mdview::theme::Theme;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io;
use std::sync::Arc;
use std::time::Duration;

fn main() -> io::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "README.md".to_string());

    let history = History::new().shared();
    let mut viewer = MarkdownViewer::new(
        history,
        Arc::new(FsAssets),
        MarkdownViewerOptions::default(),
    );
    if let Err(err) = viewer.open(&path) {
        eprintln!("{err}");
        return Ok(());
    }

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, &mut viewer);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    viewer: &mut MarkdownViewer,
) -> io::Result<()> {
    let theme = Theme::default();
    let mut status = String::from("q: quit  b/f: back/forward  r: source  click links to follow");

    loop {
        viewer.update();
        terminal.draw(|f| {
            let area = f.area();
            let body = Rect::new(area.x, area.y, area.width, area.height.saturating_sub(1));
            let status_area = Rect::new(area.x, body.bottom(), area.width, 1);
            let buf = f.buffer_mut();
            viewer.render(body, buf, &theme);
            buf.set_style(status_area, theme.text_muted);
            buf.set_stringn(
                status_area.x,
                status_area.y,
                &status,
                status_area.width as usize,
                theme.text_muted,
            );
        })?;

        if !crossterm::event::poll(Duration::from_millis(50))? {
            continue;
        }
        let ev = crossterm::event::read()?;
        if let Event::Key(key) = &ev {
            if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') {
                return Ok(());
            }
        }
        let Some(ev) = input_event_from_crossterm(ev) else {
            continue;
        };
        match viewer.handle_event(ev) {
            ViewerAction::OpenExternal(url) => status = format!("external link: {url}"),
            ViewerAction::Error(err) => status = err,
            ViewerAction::Redraw => {
                if let Some(path) = viewer.path() {
                    status = path.display().to_string();
                }
            }
            ViewerAction::None => {}
        }
    }
}
