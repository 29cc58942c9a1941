//! Plotters-powered figure widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::plot::{Figure, Overlay};

/// A render-only view of a [`Figure`] over the given bounds.
pub struct FigureChart<'a> {
    pub figure: &'a Figure,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    /// Picking cursor position, if any.
    pub cursor: Option<f64>,
    /// Wavelengths picked in the current view.
    pub picks: &'a [f64],
}

impl<'a> Widget for FigureChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let figure = self.figure;
        let cursor = self.cursor;
        let picks = self.picks;

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(figure.x_label.as_str())
                .y_desc(figure.y_label.as_str())
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| format!("{v:.1}"))
                .y_label_formatter(&|v| format!("{v:.2}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let grey = RGBColor(160, 160, 160);
            let red = RGBColor(255, 0, 0);
            let green = RGBColor(0, 255, 0);
            let yellow = RGBColor(255, 255, 0);

            if !figure.series.is_empty() {
                chart.draw_series(LineSeries::new(
                    figure
                        .series
                        .iter()
                        .copied()
                        .filter(|&(x, _)| x >= x0 && x <= x1),
                    &grey,
                ))?;
            }

            for overlay in &figure.overlays {
                match overlay {
                    Overlay::Markers(xs) => {
                        chart.draw_series(
                            xs.iter()
                                .filter(|&&x| x >= x0 && x <= x1)
                                .map(|&x| PathElement::new(vec![(x, y0), (x, y1)], red)),
                        )?;
                    }
                    Overlay::Curve(points) => {
                        chart.draw_series(LineSeries::new(
                            points.iter().copied().filter(|&(x, _)| x >= x0 && x <= x1),
                            &red,
                        ))?;
                    }
                }
            }

            // Error bars as vertical paths plus a centre dot. `Circle` radii are mapped
            // incorrectly by the ratatui canvas backend; `Pixel` renders reliably.
            chart.draw_series(
                figure
                    .points
                    .iter()
                    .map(|p| PathElement::new(vec![(p.x, p.y - p.err), (p.x, p.y + p.err)], WHITE)),
            )?;
            chart.draw_series(figure.points.iter().map(|p| Pixel::new((p.x, p.y), WHITE)))?;

            chart.draw_series(
                picks
                    .iter()
                    .filter(|&&x| x >= x0 && x <= x1)
                    .map(|&x| PathElement::new(vec![(x, y0), (x, y1)], green)),
            )?;

            if let Some(x) = cursor {
                chart.draw_series(std::iter::once(PathElement::new(vec![(x, y0), (x, y1)], yellow)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
