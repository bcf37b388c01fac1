use std::f64::consts::TAU;

use eframe::egui::{Color32, ScrollArea, Stroke, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints, Points, Polygon};

use crate::color::ColorMap;
use crate::data::aggregate::{CategoryCost, CityShare, MonthlyAggregate, YearMonth};
use crate::state::Dashboard;

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Chart grid (central panel, "Charts" view)
// ---------------------------------------------------------------------------

/// Render every chart for the current dashboard.
pub fn charts(ui: &mut Ui, dashboard: &Dashboard) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.columns(2, |cols: &mut [Ui]| {
                for (i, (column, bars)) in dashboard.category_costs.iter().enumerate() {
                    category_chart(&mut cols[i % 2], column, bars);
                }
            });
            ui.separator();

            ui.columns(2, |cols: &mut [Ui]| {
                city_pie(&mut cols[0], &dashboard.cities);
                time_chart(
                    &mut cols[1],
                    "Asset Count Over Time",
                    "Asset Number",
                    &dashboard.monthly,
                    |m| m.count as f64,
                );
            });
            time_chart(
                ui,
                "Asset Cost Over Time",
                "Asset Cost",
                &dashboard.monthly,
                |m| m.cost,
            );
        });
}

// ---------------------------------------------------------------------------
// Category vs cost bars
// ---------------------------------------------------------------------------

fn category_chart(ui: &mut Ui, column: &str, bars: &[CategoryCost]) {
    ui.strong(format!("Asset Cost by {column}"));
    let colors = ColorMap::new(bars.iter().map(|b| b.label.as_str()));
    let chart = BarChart::new(
        bars.iter()
            .enumerate()
            .map(|(i, b)| {
                Bar::new(i as f64, b.cost)
                    .name(&b.label)
                    .fill(colors.color_for(&b.label))
                    .width(0.7)
            })
            .collect(),
    )
    .name(column);

    let labels: Vec<String> = bars.iter().map(|b| b.label.clone()).collect();
    Plot::new(format!("bars_{column}"))
        .height(CHART_HEIGHT)
        .y_axis_label("Asset Cost")
        .x_axis_formatter(move |mark: GridMark, _range| {
            category_label(&labels, mark.value).unwrap_or_default()
        })
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// The label under an integral grid mark, if there is a bar there.
fn category_label(labels: &[String], value: f64) -> Option<String> {
    if value < 0.0 || value.fract() != 0.0 {
        return None;
    }
    labels.get(value as usize).cloned()
}

// ---------------------------------------------------------------------------
// City distribution pie
// ---------------------------------------------------------------------------

fn city_pie(ui: &mut Ui, cities: &[CityShare]) {
    ui.strong("Assets by City");
    let colors = ColorMap::new(cities.iter().map(|c| c.city.as_str()));

    Plot::new("city_pie")
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .legend(Legend::default())
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            let mut start = 0.0;
            for city in cities {
                let color = colors.color_for(&city.city);
                let slice = Polygon::new(PlotPoints::from(pie_slice(start, city.share)))
                    .name(format!("{} ({:.1}%)", city.city, city.share * 100.0))
                    .fill_color(color)
                    .stroke(Stroke::new(1.0, Color32::WHITE));
                plot_ui.polygon(slice);
                start += city.share;
            }
        });
}

/// Outline of a unit-circle slice starting at `start` (fraction of a full
/// turn) and spanning `share` of it.
fn pie_slice(start: f64, share: f64) -> Vec<[f64; 2]> {
    let steps = ((share * 64.0).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push([0.0, 0.0]);
    for i in 0..=steps {
        let angle = (start + share * i as f64 / steps as f64) * TAU;
        points.push([angle.cos(), angle.sin()]);
    }
    points
}

// ---------------------------------------------------------------------------
// Monthly time series
// ---------------------------------------------------------------------------

fn time_chart(
    ui: &mut Ui,
    title: &str,
    y_label: &str,
    monthly: &[MonthlyAggregate],
    value: impl Fn(&MonthlyAggregate) -> f64,
) {
    ui.strong(title);
    let series: Vec<[f64; 2]> = monthly
        .iter()
        .map(|m| [m.month.ordinal() as f64, value(m)])
        .collect();

    Plot::new(title)
        .height(CHART_HEIGHT)
        .x_axis_label("Date")
        .y_axis_label(y_label)
        .x_axis_formatter(|mark: GridMark, _range| {
            if mark.value.fract() == 0.0 {
                YearMonth::from_ordinal(mark.value as i64).to_string()
            } else {
                String::new()
            }
        })
        .label_formatter(|_name, point| {
            format!(
                "{}\n{:.0}",
                YearMonth::from_ordinal(point.x.round() as i64),
                point.y
            )
        })
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(series.clone()))
                    .name(title)
                    .color(Color32::LIGHT_BLUE)
                    .width(1.5),
            );
            plot_ui.points(
                Points::new(series)
                    .radius(3.0)
                    .color(Color32::LIGHT_BLUE),
            );
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pie_slice_runs_along_the_unit_circle() {
        let points = pie_slice(0.0, 0.25);
        assert_eq!(points[0], [0.0, 0.0]);
        let first = points[1];
        let last = points[points.len() - 1];
        assert!((first[0] - 1.0).abs() < 1e-9 && first[1].abs() < 1e-9);
        assert!(last[0].abs() < 1e-9 && (last[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn category_labels_only_on_bars() {
        let labels = vec!["IT".to_string(), "Vehicles".to_string()];
        assert_eq!(category_label(&labels, 1.0).as_deref(), Some("Vehicles"));
        assert_eq!(category_label(&labels, 0.5), None);
        assert_eq!(category_label(&labels, 2.0), None);
        assert_eq!(category_label(&labels, -1.0), None);
    }
}
