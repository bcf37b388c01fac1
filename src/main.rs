use asset_dashboard::app::AssetDashboardApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Asset Management Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(AssetDashboardApp::default()))),
    )
}
