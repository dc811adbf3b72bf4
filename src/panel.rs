//! The extension panel: draws the presenter and collects intents.

use estimator::estimate::format_hours;
use estimator::host::NodeId;
use estimator::presenter::{Mode, Presenter};
use estimator::protocol::PluginIntent;
use eframe::egui::{self, Color32, RichText, Sense, Ui};

pub fn plugin_panel(ui: &mut Ui, presenter: &mut Presenter, accent: Color32) -> Vec<PluginIntent> {
    let mut intents = vec![];
    match presenter.mode() {
        Mode::Editor => {
            intents.extend(presenter.hover(None));
            editor(ui, presenter, &mut intents);
        }
        Mode::List => list(ui, presenter, accent, &mut intents),
        Mode::Empty => {
            intents.extend(presenter.hover(None));
            ui.add_space(40.0);
            ui.vertical_centered(|ui| {
                ui.heading("Select Frame to continue");
            });
        }
    }

    if let Some(error) = presenter.error() {
        ui.add_space(8.0);
        ui.colored_label(Color32::from_rgb(221, 113, 113), error);
    }
    intents
}

fn editor(ui: &mut Ui, presenter: &mut Presenter, intents: &mut Vec<PluginIntent>) {
    let title = presenter
        .node()
        .map(|n| n.name.clone())
        .unwrap_or_default();
    ui.horizontal(|ui| {
        ui.label(RichText::new(title).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("+").on_hover_text("Add line item").clicked() {
                presenter.add_item();
            }
        });
    });
    ui.separator();

    let mut remove_idx = None;
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 60.0)
        .show(ui, |ui| {
            for (idx, item) in presenter.items_mut().iter_mut().enumerate() {
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut item.label)
                            .hint_text("Label")
                            .desired_width(170.0),
                    );
                    ui.add(
                        egui::TextEdit::singleline(&mut item.value)
                            .hint_text("10")
                            .desired_width(48.0),
                    );
                    if ui.button("−").clicked() {
                        remove_idx = Some(idx);
                    }
                });
            }
        });
    if let Some(idx) = remove_idx {
        presenter.remove_item(idx);
    }

    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Cancel").clicked() {
            intents.push(presenter.cancel());
        }
        if ui.button("Save").clicked() {
            intents.push(presenter.save());
        }
        if presenter.is_dirty() {
            ui.small("unsaved");
        }
    });
}

fn list(ui: &mut Ui, presenter: &mut Presenter, accent: Color32, intents: &mut Vec<PluginIntent>) {
    let rows: Vec<(NodeId, String, f64)> = presenter
        .estimates()
        .iter()
        .map(|e| (e.id.clone(), e.name.clone(), e.total))
        .collect();

    let mut hovered = None;
    let mut opened = None;
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 70.0)
        .show(ui, |ui| {
            for (id, name, total) in &rows {
                let row = ui
                    .horizontal(|ui| {
                        ui.label(name);
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.label(format_hours(*total));
                        });
                    })
                    .response
                    .interact(Sense::click());
                if row.hovered() {
                    hovered = Some(id.clone());
                    ui.painter().rect_stroke(
                        row.rect.expand(2.0),
                        4.0,
                        egui::Stroke::new(1.0, accent),
                    );
                }
                if row.clicked() {
                    opened = Some(id.clone());
                }
            }
        });

    if let Some(id) = opened {
        intents.push(presenter.open(&id));
    } else {
        intents.extend(presenter.hover(hovered.as_ref()));
    }

    ui.separator();
    ui.horizontal(|ui| {
        ui.label(RichText::new("Total").strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(format_hours(presenter.aggregate_total())).strong());
        });
    });
    if ui.button("Export CSV").clicked() {
        intents.push(presenter.export());
    }
}
