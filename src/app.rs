use crate::panel;
use estimator::config::Settings;
use estimator::controller::HIGHLIGHT_NAME;
use estimator::document::Document;
use estimator::estimate::{self, ESTIMATE_KEY};
use estimator::host::{Bounds, Host, NodeId, NodeKind, Rgb};
use estimator::session::Session;
use eframe::{
    egui::{self, menu, Color32, FontFamily, FontId, RichText, Sense, Ui},
    App, CreationContext, Frame,
};
use rfd::FileDialog;
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use strum::IntoEnumIterator;

/// How long host notifications stay in the status bar.
const NOTICE_DISPLAY: Duration = Duration::from_secs(3);

pub struct EstimatorApp {
    session: Session,
    settings: Settings,
    document_path: Option<PathBuf>,
    status: String,
    notices: Vec<(String, Instant)>,
    show_about: bool,
    show_settings: bool,
    dragging: Option<NodeId>,
    pan: egui::Vec2,
    left_sidebar_collapsed: bool,
}

impl EstimatorApp {
    pub fn new(cc: &CreationContext<'_>, settings: Settings) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        Self::with_document(Document::sample(), settings)
    }

    fn with_document(document: Document, settings: Settings) -> Self {
        let mut session = Session::new(document);
        session.start();
        Self {
            session,
            settings,
            document_path: None,
            status: "Ready".to_string(),
            notices: vec![],
            show_about: false,
            show_settings: false,
            dragging: None,
            pan: egui::vec2(24.0, 24.0),
            left_sidebar_collapsed: false,
        }
    }

    fn replace_document(&mut self, document: Document) {
        self.session = Session::new(document);
        self.session.start();
        self.dragging = None;
    }

    fn accent(&self) -> Color32 {
        let [r, g, b, a] = self.settings.accent_color;
        Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    fn surface_panel() -> egui::Frame {
        egui::Frame::default()
            .fill(Color32::from_rgba_unmultiplied(18, 23, 34, 236))
            .stroke(egui::Stroke::new(
                1.0,
                Color32::from_rgba_unmultiplied(255, 255, 255, 20),
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(14.0))
            .outer_margin(egui::Margin::same(2.0))
    }

    fn card_frame() -> egui::Frame {
        egui::Frame::default()
            .fill(Color32::from_rgba_unmultiplied(255, 255, 255, 10))
            .rounding(egui::Rounding::same(6.0))
            .inner_margin(egui::Margin::same(10.0))
    }

    fn paint_color(fill: Rgb, opacity: f32) -> Color32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color32::from_rgba_unmultiplied(
            channel(fill.r),
            channel(fill.g),
            channel(fill.b),
            channel(opacity),
        )
    }

    /// Pumps the session and routes what came out of it to disk and the status bar.
    fn sync(&mut self) {
        let now = Instant::now();
        if let Err(err) = self.session.pump(now) {
            tracing::warn!(%err, "message pump failed");
            self.status = format!("Extension stopped: {err}");
        }
        for notice in self.session.document.take_notifications() {
            self.notices.push((notice, now + NOTICE_DISPLAY));
        }
        self.notices.retain(|(_, until)| *until > now);

        let export_dir = self.settings.resolved_export_dir();
        for download in self.session.presenter.take_downloads() {
            match download.save_into(&export_dir) {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "export written");
                    self.status = format!("Exported {}", path.display());
                }
                Err(err) => {
                    tracing::warn!(%err, "export not written");
                    self.status = format!("Export failed: {err}");
                }
            }
        }
    }

    fn save_document_to_path(&mut self, path: &Path) {
        match self.session.document.save_to_path(path) {
            Ok(()) => {
                self.document_path = Some(path.to_path_buf());
                self.status = format!("Saved {}", path.display());
            }
            Err(err) => self.status = format!("Save failed: {err}"),
        }
    }

    fn save_document(&mut self, force_dialog: bool) {
        let path = self
            .document_path
            .clone()
            .filter(|_| !force_dialog)
            .or_else(|| {
                FileDialog::new()
                    .add_filter("Estimator Document", &["json"])
                    .set_file_name(format!("{}.json", self.session.document.page_name))
                    .save_file()
            });
        if let Some(path) = path {
            self.save_document_to_path(&path);
        }
    }

    fn load_document(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("Estimator Document", &["json"])
            .pick_file()
        else {
            return;
        };
        match Document::load_from_path(&path) {
            Ok(document) => {
                self.replace_document(document);
                self.document_path = Some(path.clone());
                self.status = format!("Loaded {}", path.display());
            }
            Err(err) => self.status = format!("Load failed: {err}"),
        }
    }

    fn insert_node(&mut self, kind: NodeKind) {
        let document = &mut self.session.document;
        let parent = document
            .selection()
            .into_iter()
            .next()
            .filter(|id| document.node(id).is_some_and(|n| n.kind == NodeKind::Frame));
        let count = document.draw_order().iter().filter(|n| n.kind == kind).count();
        let (width, height) = match kind {
            NodeKind::Frame => (220.0, 300.0),
            NodeKind::Rectangle => (120.0, 60.0),
            NodeKind::Text => (140.0, 32.0),
        };
        let offset = if parent.is_some() { 16.0 } else { 40.0 };
        let id = document.add_node(
            kind,
            format!("{kind} {}", count + 1),
            Bounds {
                x: offset + 24.0 * (count % 8) as f32,
                y: offset + 24.0 * (count % 8) as f32,
                width,
                height,
            },
            parent.as_ref(),
        );
        document.set_selection(vec![id]);
    }

    fn delete_selection(&mut self) {
        let selection = self.session.document.selection();
        for id in selection {
            self.session.document.remove_node(&id);
        }
    }

    fn titlebar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("titlebar")
            .frame(Self::surface_panel())
            .show(ctx, |ui| {
                let title_rect = ui.max_rect();
                let drag = ui.interact(title_rect, ui.id().with("titlebar_drag"), Sense::drag());
                if drag.drag_started() || drag.dragged() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                }
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Frame Estimator")
                            .font(FontId::new(20.0, FontFamily::Proportional))
                            .color(self.accent()),
                    );
                    ui.separator();
                    ui.label(
                        RichText::new(format!(
                            "PAGE  {}",
                            self.session.document.page_name.to_uppercase()
                        ))
                        .font(FontId::new(11.0, FontFamily::Monospace))
                        .color(Color32::from_rgba_unmultiplied(215, 215, 220, 190)),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_sized([28.0, 22.0], egui::Button::new("✕")).clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                        if ui.add_sized([28.0, 22.0], egui::Button::new("—")).clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                        }
                    });
                });
            });
    }

    fn toolbar_dropdowns(&mut self, ui: &mut Ui) {
        menu::bar(ui, |ui| {
            ui.menu_button("📂 Document", |ui| {
                if ui.button("New").clicked() {
                    self.replace_document(Document::default());
                    self.document_path = None;
                    self.status = "New document".to_string();
                    ui.close_menu();
                }
                if ui.button("Open…").clicked() {
                    self.load_document();
                    ui.close_menu();
                }
                if ui.button("Save").clicked() {
                    self.save_document(false);
                    ui.close_menu();
                }
                if ui.button("Save As…").clicked() {
                    self.save_document(true);
                    ui.close_menu();
                }
            });
            ui.menu_button("➕ Insert", |ui| {
                for kind in NodeKind::iter() {
                    if ui.button(format!("{} {kind}", kind.icon())).clicked() {
                        self.insert_node(kind);
                        ui.close_menu();
                    }
                }
            });
            ui.menu_button("✏ Edit", |ui| {
                if ui.button("Delete selection").clicked() {
                    self.delete_selection();
                    ui.close_menu();
                }
                if ui.button("Select none").clicked() {
                    self.session.document.set_selection(vec![]);
                    ui.close_menu();
                }
            });
            ui.menu_button("⚙ View", |ui| {
                if ui.button("Settings").clicked() {
                    self.show_settings = true;
                    ui.close_menu();
                }
                if ui.button("About").clicked() {
                    self.show_about = true;
                    ui.close_menu();
                }
            });
            ui.separator();
            ui.label("Page");
            ui.add(
                egui::TextEdit::singleline(&mut self.session.document.page_name)
                    .desired_width(180.0),
            );
        });
    }

    fn left_sidebar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            if ui
                .button(if self.left_sidebar_collapsed { "⮞" } else { "⮜" })
                .clicked()
            {
                self.left_sidebar_collapsed = !self.left_sidebar_collapsed;
            }
            ui.label(RichText::new("Layers").strong());
        });
        if self.left_sidebar_collapsed {
            return;
        }

        let selection = self.session.document.selection();
        let rows: Vec<(NodeId, NodeKind, String, usize, bool)> = {
            let document = &self.session.document;
            document
                .draw_order()
                .into_iter()
                .filter(|n| !n.transient)
                .map(|n| {
                    let mut depth = 0;
                    let mut parent = n.parent.as_ref();
                    while let Some(pid) = parent {
                        depth += 1;
                        parent = document.node(pid).and_then(|p| p.parent.as_ref());
                    }
                    let estimated = n.kind == NodeKind::Frame
                        && !document.plugin_data(&n.id, ESTIMATE_KEY).is_empty();
                    (n.id.clone(), n.kind, n.name.clone(), depth, estimated)
                })
                .collect()
        };

        egui::ScrollArea::vertical().show(ui, |ui| {
            for (id, kind, name, depth, estimated) in rows {
                ui.horizontal(|ui| {
                    ui.add_space(depth as f32 * 14.0);
                    let selected = selection.contains(&id);
                    let mut text = format!("{} {name}", kind.icon());
                    if estimated {
                        text.push_str("  ⏱");
                    }
                    let label = if selected {
                        RichText::new(text).color(Color32::WHITE)
                    } else {
                        RichText::new(text).color(Color32::from_rgb(230, 235, 245))
                    };
                    if ui.selectable_label(selected, label).clicked() {
                        self.session.document.set_selection(vec![id.clone()]);
                    }
                });
            }
        });

        ui.add_space(8.0);
        self.selection_properties(ui);
    }

    fn selection_properties(&mut self, ui: &mut Ui) {
        let selection = self.session.document.selection();
        let [id] = selection.as_slice() else {
            return;
        };
        let Some(node) = self.session.document.node(id) else {
            return;
        };
        let mut name = node.name.clone();
        let kind = node.kind;
        let bounds = node.bounds;
        let stored = self.session.document.plugin_data(id, ESTIMATE_KEY);

        Self::card_frame().show(ui, |ui| {
            ui.label(RichText::new("Selection").strong());
            ui.horizontal(|ui| {
                ui.label("Name");
                if ui.text_edit_singleline(&mut name).changed() {
                    self.session.document.rename(id, name.clone());
                }
            });
            ui.label(format!("{kind} • {:.0} × {:.0}", bounds.width, bounds.height));
            if kind == NodeKind::Frame && !stored.is_empty() {
                match estimate::decode(&stored) {
                    Ok(items) => ui.label(format!(
                        "Stored estimate: {} items, {} h",
                        items.len(),
                        estimate::format_hours(estimate::total(&items))
                    )),
                    Err(_) => ui.colored_label(Color32::YELLOW, "Stored estimate is corrupt"),
                };
            }
        });
    }

    fn canvas_view(&mut self, ui: &mut Ui) {
        let desired = ui.available_size();
        let (resp, painter) = ui.allocate_painter(desired, Sense::click_and_drag());
        painter.rect_filled(
            resp.rect,
            10.0,
            Color32::from_rgba_unmultiplied(255, 255, 255, 16),
        );

        if self.settings.show_canvas_grid {
            let step = 36.0;
            let grid = egui::Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 16));
            let mut x = resp.rect.left();
            while x < resp.rect.right() {
                painter.line_segment(
                    [
                        egui::pos2(x, resp.rect.top()),
                        egui::pos2(x, resp.rect.bottom()),
                    ],
                    grid,
                );
                x += step;
            }
            let mut y = resp.rect.top();
            while y < resp.rect.bottom() {
                painter.line_segment(
                    [
                        egui::pos2(resp.rect.left(), y),
                        egui::pos2(resp.rect.right(), y),
                    ],
                    grid,
                );
                y += step;
            }
        }

        let origin = resp.rect.min + self.pan;
        let painter = painter.with_clip_rect(resp.rect);
        let selection = self.session.document.selection();
        let document = &self.session.document;
        for node in document.draw_order() {
            let Some(b) = document.absolute_bounds(&node.id) else {
                continue;
            };
            let rect = egui::Rect::from_min_size(
                origin + egui::vec2(b.x, b.y),
                egui::vec2(b.width, b.height),
            );
            match node.kind {
                NodeKind::Text => {
                    painter.text(
                        rect.left_top(),
                        egui::Align2::LEFT_TOP,
                        &node.name,
                        FontId::new(14.0, FontFamily::Proportional),
                        Color32::from_rgb(226, 233, 242),
                    );
                }
                _ => {
                    painter.rect_filled(rect, 2.0, Self::paint_color(node.fill, node.opacity));
                }
            }
            if node.kind == NodeKind::Frame {
                painter.text(
                    rect.left_top() - egui::vec2(0.0, 4.0),
                    egui::Align2::LEFT_BOTTOM,
                    &node.name,
                    FontId::new(12.0, FontFamily::Proportional),
                    Color32::from_gray(180),
                );
            }
            if selection.contains(&node.id) {
                painter.rect_stroke(rect.expand(1.0), 2.0, egui::Stroke::new(2.0, self.accent()));
            }
        }

        let to_page = |pos: egui::Pos2| pos - origin;
        if resp.drag_started() {
            if let Some(pos) = resp.interact_pointer_pos() {
                let local = to_page(pos);
                self.dragging = self.session.document.hit_test(local.x, local.y);
                if let Some(id) = &self.dragging {
                    self.session.document.set_selection(vec![id.clone()]);
                }
            }
        }
        if resp.dragged() {
            let delta = resp.drag_delta();
            match &self.dragging {
                Some(id) => self.session.document.translate(id, delta.x, delta.y),
                None => self.pan += delta,
            }
        }
        if resp.drag_stopped() {
            self.dragging = None;
        }
        if resp.clicked() {
            if let Some(pos) = resp.interact_pointer_pos() {
                let local = to_page(pos);
                let hit = self.session.document.hit_test(local.x, local.y);
                self.session.document.set_selection(hit.into_iter().collect());
            }
        }
    }

    fn extension_panel(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Estimator").strong().color(self.accent()));
        ui.separator();
        let accent = self.accent();
        let intents = panel::plugin_panel(ui, &mut self.session.presenter, accent);
        self.session.send_all(intents);
    }

    fn dialogs(&mut self, ctx: &egui::Context) {
        if self.show_about {
            egui::Window::new("About")
                .open(&mut self.show_about)
                .show(ctx, |ui| {
                    ui.label("Frame Estimator");
                    ui.label("Attach hour estimates to frames, roll them up, export to CSV.");
                    ui.separator();
                    ui.label(
                        RichText::new(format!("Overlay marker: {HIGHLIGHT_NAME}")).italics(),
                    );
                });
        }

        if self.show_settings {
            let mut save_requested = false;
            egui::Window::new("Settings")
                .open(&mut self.show_settings)
                .show(ctx, |ui| {
                    ui.label("Accent Color");
                    ui.color_edit_button_srgba_unmultiplied(&mut self.settings.accent_color);
                    ui.add(
                        egui::Slider::new(&mut self.settings.ui_scale, 0.8..=1.5).text("UI Scale"),
                    );
                    ui.checkbox(&mut self.settings.show_canvas_grid, "Show canvas grid");
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.label("Export folder");
                        ui.label(self.settings.resolved_export_dir().display().to_string());
                    });
                    ui.horizontal(|ui| {
                        if ui.button("Choose…").clicked() {
                            if let Some(dir) = FileDialog::new().pick_folder() {
                                self.settings.export_dir = Some(dir);
                            }
                        }
                        if ui.button("Use Downloads").clicked() {
                            self.settings.export_dir = None;
                        }
                    });
                    ui.separator();
                    if ui.button("Save Settings").clicked() {
                        save_requested = true;
                    }
                });
            if save_requested {
                match self.settings.save() {
                    Ok(()) => self.status = "Settings saved".to_string(),
                    Err(err) => self.status = format!("Settings not saved: {err}"),
                }
            }
        }
    }
}

impl App for EstimatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        ctx.set_pixels_per_point(self.settings.ui_scale);

        let mut style = (*ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(6.0, 6.0);
        style.visuals.window_fill = Color32::from_rgb(18, 23, 34);
        style.visuals.panel_fill = Color32::from_rgb(18, 23, 34);
        style.visuals.override_text_color = Some(Color32::from_rgb(226, 233, 242));
        style.visuals.extreme_bg_color = Color32::from_rgb(9, 12, 20);
        style.visuals.widgets.inactive.bg_fill = Color32::from_rgba_unmultiplied(28, 36, 49, 230);
        style.visuals.widgets.active.bg_fill = self.accent();
        style.visuals.widgets.hovered.bg_fill = Color32::from_rgba_unmultiplied(
            self.accent().r(),
            self.accent().g(),
            self.accent().b(),
            120,
        );
        style.visuals.selection.bg_fill = Color32::from_rgba_unmultiplied(
            self.accent().r(),
            self.accent().g(),
            self.accent().b(),
            128,
        );
        ctx.set_style(style);

        if ctx.input(|i| i.key_pressed(egui::Key::Delete)) && !ctx.wants_keyboard_input() {
            self.delete_selection();
        }

        self.sync();
        self.titlebar(ctx);
        egui::TopBottomPanel::top("toolbar")
            .frame(Self::surface_panel())
            .show(ctx, |ui| self.toolbar_dropdowns(ui));

        egui::TopBottomPanel::bottom("status")
            .frame(Self::surface_panel())
            .show(ctx, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(self.status.as_str());
                    for (notice, _) in &self.notices {
                        ui.separator();
                        ui.label(RichText::new(notice).color(self.accent()));
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(format!("{} frames", self.session.document.frames().len()));
                    });
                });
            });

        egui::SidePanel::left("layers")
            .resizable(true)
            .default_width(260.0)
            .frame(Self::surface_panel())
            .show(ctx, |ui| self.left_sidebar(ui));

        egui::SidePanel::right("extension")
            .resizable(true)
            .default_width(320.0)
            .frame(Self::surface_panel())
            .show(ctx, |ui| self.extension_panel(ui));

        egui::CentralPanel::default()
            .frame(Self::surface_panel())
            .show(ctx, |ui| self.canvas_view(ui));

        self.dialogs(ctx);
        // deliver this frame's intents before the next paint
        self.sync();
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
