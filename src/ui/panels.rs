use anyhow::{Context, Result};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::export::{self, FILTERED_FILE_NAME, MONTHLY_FILE_NAME};
use crate::data::model::{CATEGORICAL_COLUMNS, RANGE_COLUMNS, SERVICE_DATE};
use crate::state::{AppState, Session, View};

// ---------------------------------------------------------------------------
// Left side panel – search and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Search or Filter");
    ui.separator();

    let Some(session) = state.session.as_mut() else {
        ui.label("No register loaded.");
        return;
    };

    let mut changed = false;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Search by Asset Number");
            changed |= ui
                .text_edit_singleline(&mut session.controls.search)
                .changed();
            let searching = session.search_mode();
            if searching {
                ui.label(RichText::new("Search is on; filters below are ignored.").italics());
            }
            ui.separator();

            changed |= ui
                .add_enabled_ui(!searching, |ui: &mut Ui| filter_widgets(ui, session))
                .inner;

            ui.separator();
            if ui.button("Reset filters").clicked() {
                session.reset_filters();
            }
        });

    if changed {
        session.refresh();
    }
}

/// Multi-selects, date range and sliders. Returns whether anything changed.
fn filter_widgets(ui: &mut Ui, session: &mut Session) -> bool {
    let Session {
        unique_values,
        default_ranges,
        date_bounds,
        controls,
        ..
    } = session;
    let mut changed = false;

    // ---- Per-column multi-selects (collapsible) ----
    for col in CATEGORICAL_COLUMNS {
        let Some(all_values) = unique_values.get(col) else {
            continue;
        };
        let n_selected = controls.categories.get(col).map_or(0, |s| s.len());
        let header_text = if n_selected == 0 {
            format!("{col}  (all {})", all_values.len())
        } else {
            format!("{col}  ({n_selected}/{})", all_values.len())
        };

        egui::CollapsingHeader::new(RichText::new(header_text).strong())
            .id_salt(col)
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    controls.categories.remove(col);
                    changed = true;
                }

                let selected = controls.categories.entry(col.to_string()).or_default();
                for val in all_values {
                    let mut checked = selected.contains(val);
                    if ui.checkbox(&mut checked, val.to_string()).changed() {
                        if checked {
                            selected.insert(val.clone());
                        } else {
                            selected.remove(val);
                        }
                        changed = true;
                    }
                }
            });
    }
    ui.separator();

    // ---- Service date range ----
    changed |= ui
        .checkbox(&mut controls.date_enabled, format!("Limit {SERVICE_DATE}"))
        .changed();
    if date_bounds.is_none() {
        ui.label(RichText::new("No valid service dates in this file.").weak());
    }
    ui.add_enabled_ui(controls.date_enabled, |ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            ui.label("From");
            changed |= ui
                .add(DatePickerButton::new(&mut controls.date_start).id_salt("date_start"))
                .changed();
        });
        ui.horizontal(|ui: &mut Ui| {
            ui.label("To");
            changed |= ui
                .add(DatePickerButton::new(&mut controls.date_end).id_salt("date_end"))
                .changed();
        });
    });
    ui.separator();

    // ---- Numeric range sliders ----
    for col in RANGE_COLUMNS {
        ui.strong(format!("{col} range"));
        let Some(bounds) = default_ranges.get(col).copied() else {
            ui.label(RichText::new("Not available in this file.").weak());
            continue;
        };
        let range = controls.ranges.entry(col.to_string()).or_insert(bounds);
        let min_changed = ui
            .add(egui::Slider::new(&mut range.min, bounds.min..=bounds.max).text("min"))
            .changed();
        let max_changed = ui
            .add(egui::Slider::new(&mut range.max, bounds.min..=bounds.max).text("max"))
            .changed();
        // Keep the handles from crossing.
        if min_changed && range.min > range.max {
            range.max = range.min;
        }
        if max_changed && range.max < range.min {
            range.min = range.max;
        }
        changed |= min_changed || max_changed;
    }

    changed
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let loaded = state.session.is_some();
            if ui
                .add_enabled(loaded, egui::Button::new("Download filtered data…"))
                .clicked()
            {
                save_filtered_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(loaded, egui::Button::new("Download monthly series…"))
                .clicked()
            {
                save_monthly_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &state.session {
            ui.label(format!(
                "{}: {} assets loaded, {} visible",
                session.file_name,
                session.table.len(),
                session.dashboard.rows.len()
            ));
            ui.separator();
            ui.selectable_value(&mut state.view, View::Table, "Table");
            ui.selectable_value(&mut state.view, View::Charts, "Charts");
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open asset register")
        .add_filter("Supported files", &["xlsx", "xlsm", "csv", "parquet", "pq", "json"])
        .add_filter("Excel", &["xlsx", "xlsm"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    let Some(path) = file else {
        return;
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    match std::fs::read(&path) {
        Ok(bytes) => state.load_upload(&name, &bytes),
        Err(e) => {
            log::error!("Failed to read {}: {e}", path.display());
            state.status_message = Some(format!("Error: reading {}: {e}", path.display()));
        }
    }
}

fn save_filtered_dialog(state: &mut AppState) {
    let bytes = match &state.session {
        Some(session) => export::to_csv(&session.dashboard.rows),
        None => return,
    };
    save_bytes_dialog(state, FILTERED_FILE_NAME, bytes);
}

fn save_monthly_dialog(state: &mut AppState) {
    let bytes = match &state.session {
        Some(session) => export::monthly_csv(&session.dashboard.monthly),
        None => return,
    };
    save_bytes_dialog(state, MONTHLY_FILE_NAME, bytes);
}

fn save_bytes_dialog(state: &mut AppState, default_name: &str, bytes: Result<Vec<u8>>) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save CSV")
        .set_file_name(default_name)
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };

    let written = bytes.and_then(|b| {
        std::fs::write(&path, b).with_context(|| format!("writing {}", path.display()))
    });
    match written {
        Ok(()) => {
            log::info!("Saved {}", path.display());
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to save CSV: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
