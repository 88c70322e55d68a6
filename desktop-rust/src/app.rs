use std::sync::mpsc::{self, Receiver};

use eframe::egui::{self, Color32, RichText};
use eframe::egui::{FontData, FontDefinitions, FontFamily};

use crate::io::{
    camera_access_granted, config_path, default_scan_path, load_thumbnail, persist_camera_access,
    run_upload, save_scan,
};
use crate::model::{SavedScan, ThumbData, UiMessage};
use vin_scan_common::{
    render_rows, Completion, FilterOption, ImageLocation, ScanSession, View,
};

const ACCENT: Color32 = Color32::from_rgb(246, 196, 69);

pub struct DesktopApp {
    session: ScanSession,
    status: String,
    upload_rx: Option<Receiver<UiMessage>>,
    thumb: Option<(String, egui::TextureHandle)>,
    thumb_rx: Receiver<ThumbData>,
    thumb_tx: mpsc::Sender<ThumbData>,
    thumb_inflight: Option<String>,
    /// デコードできなかった画像（再要求しない）
    thumb_failed: Option<String>,
}

impl DesktopApp {
    /// `granted` は保存済みのカメラ許可
    pub fn new(granted: bool) -> Self {
        let (thumb_tx, thumb_rx) = mpsc::channel();
        let mut app = Self {
            session: ScanSession::new(),
            status: String::new(),
            upload_rx: None,
            thumb: None,
            thumb_rx,
            thumb_tx,
            thumb_inflight: None,
            thumb_failed: None,
        };
        if granted {
            if let Err(err) = app.session.permission_granted() {
                app.status = err.to_string();
            }
        }
        app
    }

    fn grant_permission(&mut self) {
        if let Err(err) = self.session.permission_granted() {
            self.status = err.to_string();
            return;
        }
        if let Some(path) = config_path() {
            if let Err(err) = persist_camera_access(&path) {
                self.status = format!("Could not save permission: {err:#}");
            }
        }
    }

    fn capture(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "heic", "webp"])
            .pick_file();

        let result = match picked {
            Some(path) => self.session.capture_succeeded(ImageLocation::from_path(&path)),
            None => self.session.capture_failed("no image was selected"),
        };
        if let Err(err) = result {
            self.status = err.to_string();
        }
    }

    fn confirm(&mut self) {
        let (ticket, request) = match self.session.begin_upload() {
            Ok(started) => started,
            Err(err) => {
                self.status = err.to_string();
                return;
            }
        };

        let (tx, rx) = mpsc::channel();
        self.upload_rx = Some(rx);
        self.status = "Uploading...".to_string();

        std::thread::spawn(move || {
            let result = run_upload(&request).map_err(|err| format!("{err:#}"));
            let _ = tx.send(UiMessage::UploadDone { ticket, result });
        });
    }

    fn retake(&mut self) {
        if let Err(err) = self.session.retake() {
            self.status = err.to_string();
            return;
        }
        self.status.clear();
    }

    fn save_result(&mut self) {
        let Some(scan) = SavedScan::from_session(&self.session) else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(default_scan_path(&scan.image))
            .save_file()
        else {
            return;
        };
        self.status = match save_scan(&path, &scan) {
            Ok(()) => format!("Saved: {}", path.display()),
            Err(err) => format!("Save failed: {err}"),
        };
    }

    fn poll_messages(&mut self) {
        let mut finished = false;
        if let Some(rx) = &self.upload_rx {
            if let Ok(UiMessage::UploadDone { ticket, result }) = rx.try_recv() {
                let completion = match result {
                    Ok(fields) => self.session.upload_succeeded(ticket, fields),
                    Err(reason) => self.session.upload_failed(ticket, reason),
                };
                if completion == Completion::Applied {
                    self.status.clear();
                }
                finished = true;
            }
        }
        if finished {
            self.upload_rx = None;
        }
    }

    fn request_thumbnail(&mut self, ctx: &egui::Context) {
        while let Ok(data) = self.thumb_rx.try_recv() {
            if self.thumb_inflight.as_deref() == Some(data.location.as_str()) {
                self.thumb_inflight = None;
            }
            if data.pixels.is_empty() {
                self.thumb_failed = Some(data.location);
                continue;
            }
            let color_image = egui::ColorImage::from_rgba_unmultiplied(data.size, &data.pixels);
            let texture = ctx.load_texture(&data.location, color_image, egui::TextureOptions::default());
            self.thumb = Some((data.location, texture));
        }

        let Some(image) = self.session.image_location() else {
            return;
        };
        let location = image.as_str().to_string();
        let loaded = self.thumb.as_ref().is_some_and(|(loc, _)| *loc == location);
        let failed = self.thumb_failed.as_deref() == Some(location.as_str());
        if loaded || failed || self.thumb_inflight.as_deref() == Some(location.as_str()) {
            return;
        }

        let path = image.to_path();
        let tx = self.thumb_tx.clone();
        self.thumb_inflight = Some(location.clone());
        std::thread::spawn(move || {
            let _ = tx.send(load_thumbnail(location, &path));
        });
    }

    fn render_thumbnail(&self, ui: &mut egui::Ui) {
        let size = egui::vec2(480.0, 360.0);
        let current = self.session.image_location().map(|i| i.as_str());
        match &self.thumb {
            Some((location, texture)) if Some(location.as_str()) == current => {
                ui.add(egui::Image::new(texture).max_size(size));
            }
            _ => {
                let text = if self.thumb_inflight.is_some() { "Loading..." } else { "No preview" };
                ui.allocate_ui_with_layout(size, egui::Layout::centered_and_justified(egui::Direction::LeftToRight), |ui| {
                    ui.label(text);
                });
            }
        }
        if let Some(image) = self.session.image_location() {
            ui.label(RichText::new(image.file_name()).color(Color32::from_gray(170)));
        }
    }

    fn render_permission(&mut self, ui: &mut egui::Ui) {
        ui.label("We need your permission to use the camera");
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Grant permission").clicked() {
                self.grant_permission();
            }
            if ui.button("Not now").clicked() {
                if let Err(err) = self.session.permission_denied() {
                    self.status = err.to_string();
                }
            }
        });
    }

    fn render_camera(&mut self, ui: &mut egui::Ui) {
        ui.label("Point the camera at the VIN plate or service sticker.");
        ui.add_space(8.0);
        if ui.button("Capture").clicked() {
            self.capture();
        }
    }

    fn render_preview(&mut self, ui: &mut egui::Ui) {
        let loading = self.session.is_loading();
        self.render_thumbnail(ui);
        ui.add_space(8.0);

        ui.group(|ui| {
            ui.label(RichText::new("Filters").strong());
            for option in FilterOption::ALL {
                let mut checked = self.session.selected_filters().contains(option);
                let response = ui.add_enabled(!loading, egui::Checkbox::new(&mut checked, option.label()));
                if response.changed() {
                    if let Err(err) = self.session.toggle_filter(option) {
                        self.status = err.to_string();
                    }
                }
            }
        });
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.button("Retake Picture").clicked() {
                self.retake();
            }
            if ui.add_enabled(!loading, egui::Button::new("Confirm Picture")).clicked() {
                self.confirm();
            }
            if loading {
                ui.spinner();
            }
        });
    }

    fn render_result(&mut self, ui: &mut egui::Ui) {
        let Some(fields) = self.session.result_fields() else {
            return;
        };
        let rows = render_rows(fields);

        if rows.is_empty() {
            ui.label("No fields were recognized.");
        } else {
            egui::Grid::new("result_grid")
                .num_columns(2)
                .spacing([16.0, 6.0])
                .striped(true)
                .show(ui, |ui| {
                    for row in &rows {
                        ui.label(RichText::new(&row.label).strong());
                        ui.label(&row.value);
                        ui.end_row();
                    }
                });
        }
        ui.add_space(12.0);

        ui.horizontal(|ui| {
            if ui.button("Scan New").clicked() {
                if let Err(err) = self.session.scan_new() {
                    self.status = err.to_string();
                }
            }
            if ui.button("Save Result").clicked() {
                self.save_result();
            }
        });
    }
}

pub fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = FontDefinitions::default();
    let candidates = [
        r"C:\Windows\Fonts\meiryo.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    ];

    for path in candidates {
        if let Ok(data) = std::fs::read(path) {
            fonts.font_data.insert("cjk_fallback".to_string(), FontData::from_owned(data));
            for family in [FontFamily::Proportional, FontFamily::Monospace] {
                fonts.families
                    .entry(family)
                    .or_default()
                    .push("cjk_fallback".to_string());
            }
            ctx.set_fonts(fonts);
            return;
        }
    }
}

impl Default for DesktopApp {
    fn default() -> Self {
        let granted = config_path().is_some_and(|path| camera_access_granted(&path));
        Self::new(granted)
    }
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.upload_rx.is_some() || self.thumb_inflight.is_some() {
            ctx.request_repaint();
        }
        self.poll_messages();
        self.request_thumbnail(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("VIN Scan");
                ui.separator();
                if !self.status.is_empty() {
                    ui.label(RichText::new(&self.status).color(Color32::from_gray(170)));
                }
            });
        });

        let notice = self.session.notice().map(|n| n.to_string());
        if let Some(message) = notice {
            egui::TopBottomPanel::bottom("notice").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(message).color(ACCENT));
                    if ui.button("Dismiss").clicked() {
                        self.session.dismiss_notice();
                    }
                });
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match self.session.view() {
                View::AwaitingPermission => self.render_permission(ui),
                View::Camera => self.render_camera(ui),
                View::Preview | View::Loading => self.render_preview(ui),
                View::Result => self.render_result(ui),
            });
        });
    }
}
