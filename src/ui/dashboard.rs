use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::Summary;
use crate::data::export::format_thousands;
use crate::data::model::AssetTable;
use crate::state::{AppState, View};
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// KPIs on top, then the table or the charts.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    let Some(session) = &state.session else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Upload an asset register to begin  (File → Open…)");
        });
        return;
    };

    let dashboard = &session.dashboard;
    if session.search_mode() {
        ui.heading("Search Result");
    } else {
        ui.heading("Filtered Asset Data");
    }

    ui.add_space(4.0);
    kpi_strip(ui, &dashboard.summary);
    ui.separator();

    match state.view {
        View::Table => data_table(ui, &dashboard.rows),
        View::Charts => plot::charts(ui, dashboard),
    }
}

// ---------------------------------------------------------------------------
// KPI strip
// ---------------------------------------------------------------------------

fn kpi_strip(ui: &mut Ui, summary: &Summary) {
    let kpis = [
        ("Total Asset Cost", summary.total_cost),
        ("Total Depreciation", summary.total_depreciation),
        ("Net Book Value", summary.total_net_book_value),
    ];
    ui.columns(kpis.len(), |cols: &mut [Ui]| {
        for (col, (label, value)) in cols.iter_mut().zip(kpis) {
            col.vertical(|ui: &mut Ui| {
                ui.label(label);
                ui.label(RichText::new(format_thousands(value)).heading().strong());
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Data table
// ---------------------------------------------------------------------------

fn data_table(ui: &mut Ui, table: &AssetTable) {
    if table.is_empty() {
        ui.label("No assets match the current filters.");
        return;
    }

    let n_cols = table.columns.len();
    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(60.0), n_cols)
            .header(20.0, |mut header| {
                for name in &table.columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, table.len(), |mut row| {
                    let rec = &table.records[row.index()];
                    for idx in 0..n_cols {
                        row.col(|ui: &mut Ui| {
                            ui.label(rec.get(idx).to_string());
                        });
                    }
                });
            });
    });
}
