use std::collections::VecDeque;

use egui::Color32;
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};

use crate::config::PlotConfig;
use crate::types::TimestampedSample;

/// Fixed six-character y labels so the plot does not jitter sideways
fn format_fixed_width_y_label(value: f64) -> String {
    let abs_value = value.abs();
    if abs_value >= 1000.0 {
        format!("{:-6.1e}", value)
    } else if abs_value >= 100.0 {
        format!("{:-6.0}", value)
    } else if abs_value >= 10.0 {
        format!("{:-6.1}", value)
    } else {
        format!("{:-6.2}", value)
    }
}

/// Min/max of the values padded by 5% of the span, the span floored at 0.1
fn value_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let (y_min, y_max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &val| (min.min(val), max.max(val)));
    if y_min > y_max {
        return None;
    }

    let range = (y_max - y_min).max(0.1);
    Some((y_min - range * 0.05, y_max + range * 0.05))
}

fn rgb(color: [u8; 3]) -> Color32 {
    Color32::from_rgb(color[0], color[1], color[2])
}

/// Rolling plots of the corrected acceleration magnitude and the
/// instantaneous kinetic energy.
#[derive(Debug)]
pub struct LivePlot {
    energy: VecDeque<f64>,
    capacity: usize,
}

impl LivePlot {
    pub fn new(capacity: usize) -> Self {
        Self {
            energy: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push_energy(&mut self, energy: f64) {
        self.energy.push_back(energy);
        while self.energy.len() > self.capacity {
            self.energy.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.energy.clear();
    }

    pub fn ui(&self, ui: &mut egui::Ui, magnitudes: &VecDeque<f64>, config: &PlotConfig) {
        ui.label("Acceleration magnitude (m/s²)");
        self.plot_series(ui, "magnitude", magnitudes, rgb(config.colors.magnitude), config);
        ui.label("Kinetic energy (J)");
        self.plot_series(ui, "energy", &self.energy, rgb(config.colors.energy), config);
    }

    fn plot_series(&self, ui: &mut egui::Ui, title: &str, buffer: &VecDeque<f64>, color: Color32, config: &PlotConfig) {
        let Some((y_min, y_max)) = value_range(buffer) else {
            ui.weak("Waiting for samples…");
            return;
        };
        let width = self.capacity as f64;

        Plot::new(title)
            .height(config.plot_height)
            .y_axis_formatter(|v, _| format_fixed_width_y_label(v.value))
            .show_x(false)
            .allow_drag(config.allow_drag)
            .allow_zoom(config.allow_zoom)
            .show(ui, |plot_ui| {
                // oldest sample on the left, newest at the right edge
                let offset = width - buffer.len() as f64;
                let points: Vec<[f64; 2]> = buffer
                    .iter()
                    .enumerate()
                    .map(|(i, &y)| [offset + i as f64, y])
                    .collect();

                plot_ui.set_plot_bounds(PlotBounds::from_min_max([0.0, y_min], [width, y_max]));
                plot_ui.line(Line::new(title, PlotPoints::from(points)).color(color).width(1.5));
            });
    }
}

/// Raw acceleration magnitude of a saved session against seconds since its
/// first sample.
pub fn history_plot(ui: &mut egui::Ui, id: &str, samples: &[TimestampedSample], config: &PlotConfig) {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return;
    };
    let start = first.timestamp as f64 / 1000.0;
    let end = (last.timestamp as f64 / 1000.0 - start).max(0.001);
    let points: Vec<[f64; 2]> = samples
        .iter()
        .map(|s| [s.timestamp as f64 / 1000.0 - start, s.vector.magnitude()])
        .collect();
    let Some((y_min, y_max)) = value_range(points.iter().map(|p| &p[1])) else {
        return;
    };

    Plot::new(id)
        .height(config.plot_height)
        .x_axis_formatter(|v, _| format!("{:.2}s", v.value))
        .y_axis_formatter(|v, _| format_fixed_width_y_label(v.value))
        .allow_drag(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([0.0, y_min], [end, y_max]));
            plot_ui.line(
                Line::new(id, PlotPoints::from(points))
                    .color(rgb(config.colors.magnitude))
                    .width(0.75),
            );
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_buffer_is_bounded() {
        let mut plot = LivePlot::new(3);
        for e in [1.0, 2.0, 3.0, 4.0] {
            plot.push_energy(e);
        }
        assert_eq!(plot.energy.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn flat_series_gets_minimum_range() {
        let buffer: VecDeque<f64> = VecDeque::from(vec![2.0, 2.0]);
        let (min, max) = value_range(&buffer).unwrap();
        assert!(min < 2.0 && max > 2.0);
        assert!((max - min - 0.01).abs() < 1e-9);
        assert!(value_range(&VecDeque::<f64>::new()).is_none());
    }

    #[test]
    fn labels_have_fixed_width() {
        for value in [0.5, -3.25, 42.0, 512.0, 12345.0] {
            assert_eq!(format_fixed_width_y_label(value).len(), 6, "{}", value);
        }
    }
}
