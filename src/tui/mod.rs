//! Ratatui-based figure viewer and line picker.
//!
//! Every view takes over the terminal (raw mode, alternate screen) until the user
//! closes it, then hands control back to the console menu. Picked wavelengths are
//! buffered inside the view and only returned on close.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::domain::Spectrum;
use crate::error::AppError;
use crate::plot::{Figure, Overlay, Plotter, PointPicker};

mod plotters_chart;

use plotters_chart::FigureChart;

/// Cursor steps per visible span.
const CURSOR_STEPS: f64 = 200.0;

/// Smallest zoomed span, as a fraction of the full range.
const MIN_ZOOM_FRACTION: f64 = 1e-3;

/// Terminal implementation of the plotting collaborator.
#[derive(Debug, Default)]
pub struct TuiPlotter;

impl Plotter for TuiPlotter {
    fn render(&mut self, figure: &Figure) -> Result<(), AppError> {
        let mut view = View::new(figure, false)?;
        view.run()?;
        Ok(())
    }
}

impl PointPicker for TuiPlotter {
    fn pick_points(&mut self, spectrum: &Spectrum, existing: &[f64]) -> Result<Vec<f64>, AppError> {
        let figure = Figure::spectrum(spectrum, vec![Overlay::Markers(existing.to_vec())]);
        let mut view = View::new(&figure, true)?;
        view.run()?;
        Ok(view.picks)
    }
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(1, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(1, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct View<'a> {
    figure: &'a Figure,
    picking: bool,
    full: [f64; 2],
    x_view: [f64; 2],
    cursor: f64,
    picks: Vec<f64>,
    status: String,
}

impl<'a> View<'a> {
    fn new(figure: &'a Figure, picking: bool) -> Result<Self, AppError> {
        let full = figure
            .x_bounds()
            .filter(|[lo, hi]| hi > lo)
            .ok_or_else(|| AppError::new(1, "Nothing to plot."))?;
        Ok(Self {
            figure,
            picking,
            full,
            x_view: full,
            cursor: 0.5 * (full[0] + full[1]),
            picks: Vec::new(),
            status: String::new(),
        })
    }

    fn run(&mut self) -> Result<(), AppError> {
        let _guard = TerminalGuard::new()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal =
            Terminal::new(backend).map_err(|e| AppError::new(1, format!("Failed to initialize terminal: {e}")))?;
        self.event_loop(&mut terminal)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(1, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(1, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(1, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
                    if ctrl_c || self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the view should close.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let span = self.x_view[1] - self.x_view[0];
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left => self.move_cursor(-span / CURSOR_STEPS),
            KeyCode::Right => self.move_cursor(span / CURSOR_STEPS),
            KeyCode::PageUp => self.move_cursor(-span / 10.0),
            KeyCode::PageDown => self.move_cursor(span / 10.0),
            KeyCode::Up => self.zoom(0.5),
            KeyCode::Down => self.zoom(2.0),
            KeyCode::Char('r') => {
                self.x_view = self.full;
                self.status = "zoom reset".to_string();
            }
            KeyCode::Char('w') if self.picking => {
                self.picks.push(self.cursor);
                self.status = format!("marked {:9.3}", self.cursor);
            }
            KeyCode::Char('u') | KeyCode::Backspace if self.picking => {
                if let Some(x) = self.picks.pop() {
                    self.status = format!("unmarked {x:9.3}");
                }
            }
            _ => {}
        }
        false
    }

    fn move_cursor(&mut self, delta: f64) {
        self.cursor = (self.cursor + delta).clamp(self.full[0], self.full[1]);
        let span = self.x_view[1] - self.x_view[0];
        if self.cursor < self.x_view[0] {
            self.x_view = [self.cursor, self.cursor + span];
        } else if self.cursor > self.x_view[1] {
            self.x_view = [self.cursor - span, self.cursor];
        }
    }

    fn zoom(&mut self, factor: f64) {
        let full_span = self.full[1] - self.full[0];
        let span = ((self.x_view[1] - self.x_view[0]) * factor).clamp(full_span * MIN_ZOOM_FRACTION, full_span);
        let lo = (self.cursor - 0.5 * span).min(self.full[1] - span).max(self.full[0]);
        self.x_view = [lo, lo + span];
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        let block = Block::default()
            .title(self.figure.title.as_str())
            .borders(Borders::ALL);
        let inner = block.inner(chunks[0]);
        frame.render_widget(block, chunks[0]);
        frame.render_widget(Clear, inner);

        let [x0, x1] = self.x_view;
        let chart = FigureChart {
            figure: self.figure,
            x_bounds: self.x_view,
            y_bounds: self.figure.y_bounds_within(x0, x1),
            cursor: self.picking.then_some(self.cursor),
            picks: &self.picks,
        };
        frame.render_widget(chart, inner);

        let help = if self.picking {
            "←/→ move  PgUp/PgDn jump  ↑/↓ zoom  r reset  w mark line  u undo  q done"
        } else {
            "←/→ move  ↑/↓ zoom  r reset  q close"
        };
        let mut spans = vec![Span::styled(help, Style::default().fg(Color::Gray))];
        if self.picking {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                format!("x={:9.3} picked={}", self.cursor, self.picks.len()),
                Style::default().fg(Color::Cyan),
            ));
        }
        if !self.status.is_empty() {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(self.status.as_str(), Style::default().fg(Color::Yellow)));
        }
        let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figure() -> Figure {
        let spectrum = Spectrum::new(vec![5000.0, 9000.0], vec![1.0, 1.0], vec![0.1, 0.1]).unwrap();
        Figure::spectrum(&spectrum, Vec::new())
    }

    #[test]
    fn picking_keys_buffer_marks() {
        let fig = figure();
        let mut view = View::new(&fig, true).unwrap();
        assert!(!view.handle_key(KeyCode::Char('w')));
        view.handle_key(KeyCode::Right);
        view.handle_key(KeyCode::Char('w'));
        assert_eq!(view.picks.len(), 2);
        assert!(view.picks[1] > view.picks[0]);

        view.handle_key(KeyCode::Char('u'));
        assert_eq!(view.picks, vec![7000.0]);
        assert!(view.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn render_only_view_ignores_marks() {
        let fig = figure();
        let mut view = View::new(&fig, false).unwrap();
        view.handle_key(KeyCode::Char('w'));
        assert!(view.picks.is_empty());
    }

    #[test]
    fn zoom_stays_inside_full_range() {
        let fig = figure();
        let mut view = View::new(&fig, true).unwrap();
        view.zoom(0.5);
        assert_eq!(view.x_view, [6000.0, 8000.0]);
        for _ in 0..500 {
            view.move_cursor(100.0);
        }
        assert_eq!(view.cursor, 9000.0);
        assert!(view.x_view[1] <= 9000.0 + 1e-9);
        view.zoom(10.0);
        assert_eq!(view.x_view, [5000.0, 9000.0]);
    }
}
