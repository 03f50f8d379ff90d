use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    style::{Color, Style},
    symbols,
    widgets::canvas::{Canvas, Line as CanvasLine, Rectangle},
    widgets::{Block, Borders},
};
use std::{
    io::{self, Stdout},
    time::Duration,
};

use crate::config::{SURFACE_HEIGHT, SURFACE_WIDTH};
use crate::render::{BACKGROUND, DrawSurface, Rgb};

/// User commands from the key handler, forwarded to the pipeline driver.
pub enum Command {
    Quit,
    Calibrate,
    Demo,
}

/// Draw surface over a logical 1024x1024 pixel plane. Primitives accumulate
/// until the next clear, so ticks that skip the redraw (source not ready,
/// calibration progress) keep or extend the previous frame, and `draw_ui`
/// replays whatever is current onto the terminal canvas.
pub struct TermSurface {
    background: Rgb,
    rects: Vec<(f32, f32, f32, f32, Rgb)>,
}

impl TermSurface {
    pub fn new() -> TermSurface {
        TermSurface {
            background: BACKGROUND,
            rects: Vec::new(),
        }
    }
}

impl DrawSurface for TermSurface {
    fn clear(&mut self, color: Rgb) {
        self.background = color;
        self.rects.clear();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        if w <= 0.0 {
            return;
        }
        self.rects.push((x, y, w, h, color));
    }
}

pub type TerminalType = Terminal<CrosstermBackend<Stdout>>;

pub fn init_terminal() -> Result<TerminalType, anyhow::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal() -> Result<(), anyhow::Error> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

pub fn handle_events() -> Result<Option<Command>, anyhow::Error> {
    if event::poll(Duration::from_millis(0))? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(Command::Quit)),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(Some(Command::Quit));
                    }
                    KeyCode::Char('c') | KeyCode::Char('C') => return Ok(Some(Command::Calibrate)),
                    KeyCode::Char('d') | KeyCode::Char('D') => return Ok(Some(Command::Demo)),
                    _ => {}
                }
            }
        }
    }
    Ok(None)
}

fn to_color((r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

pub fn draw_ui(f: &mut Frame, surface: &TermSurface, calibrating: bool) {
    let title = if calibrating {
        " polara | collecting ambient noise "
    } else {
        " polara | Q quit, C calibrate, D demo "
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(96, 160, 192)));

    // Device pixels grow downward; canvas coordinates grow upward.
    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .background_color(to_color(surface.background))
        .x_bounds([0.0, SURFACE_WIDTH as f64])
        .y_bounds([0.0, SURFACE_HEIGHT as f64])
        .paint(|ctx| {
            for &(x, y, w, h, color) in &surface.rects {
                let color = to_color(color);
                if h <= 1.0 {
                    ctx.draw(&CanvasLine {
                        x1: x as f64,
                        y1: (SURFACE_HEIGHT - y) as f64,
                        x2: (x + w) as f64,
                        y2: (SURFACE_HEIGHT - y) as f64,
                        color,
                    });
                } else {
                    ctx.draw(&Rectangle {
                        x: x as f64,
                        y: (SURFACE_HEIGHT - y - h) as f64,
                        width: w as f64,
                        height: h as f64,
                        color,
                    });
                }
            }
        });

    f.render_widget(canvas, f.area());
}
