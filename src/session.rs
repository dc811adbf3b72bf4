//! Wires the host document, the controller and the presenter together and
//! moves messages between them.

use crate::channel::{self, ControllerPort, PresenterPort};
use crate::controller::Controller;
use crate::document::Document;
use crate::error::Result;
use crate::host::Host;
use crate::presenter::Presenter;
use crate::protocol::PluginIntent;
use std::time::Instant;

/// Upper bound on delivery rounds per pump.
const MAX_ROUNDS: usize = 16;

pub struct Session {
    pub document: Document,
    pub presenter: Presenter,
    controller: Controller<ControllerPort>,
    port: PresenterPort,
    started: bool,
}

impl Session {
    pub fn new(document: Document) -> Self {
        let (controller_port, presenter_port) = channel::pair();
        Self {
            document,
            presenter: Presenter::new(),
            controller: Controller::new(controller_port),
            port: presenter_port,
            started: false,
        }
    }

    pub fn controller(&self) -> &Controller<ControllerPort> {
        &self.controller
    }

    /// Runs the controller's startup hook once.
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            self.controller.start(&mut self.document);
        }
    }

    pub fn send(&mut self, intent: PluginIntent) {
        if let Err(err) = self.port.post(&intent) {
            tracing::warn!(kind = intent.kind(), %err, "intent not delivered");
        }
    }

    pub fn send_all(&mut self, intents: impl IntoIterator<Item = PluginIntent>) {
        for intent in intents {
            self.send(intent);
        }
    }

    /// Delivers host events, intents and messages until everything settles,
    /// then advances the presenter's timers.
    pub fn pump(&mut self, now: Instant) -> Result<()> {
        self.start();
        for _ in 0..MAX_ROUNDS {
            let mut moved = false;

            for event in self.document.take_events() {
                moved = true;
                self.controller.on_host_event(&mut self.document, event);
            }

            let intents = self.controller.outbox().drain()?;
            for intent in intents {
                moved = true;
                self.controller.handle(&mut self.document, intent);
            }

            for message in self.port.drain()? {
                moved = true;
                self.presenter.apply(message, now);
            }

            if !moved {
                break;
            }
        }
        self.presenter.tick(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::HIGHLIGHT_NAME;
    use crate::estimate::{self, ESTIMATE_KEY};
    use crate::host::{Bounds, NodeId, NodeKind};
    use crate::presenter::{Field, Mode};
    use crate::protocol::LineItem;
    use std::time::Duration;

    fn frame(doc: &mut Document, name: &str, x: f32) -> NodeId {
        doc.add_node(
            NodeKind::Frame,
            name,
            Bounds {
                x,
                y: 0.0,
                width: 100.0,
                height: 100.0,
            },
            None,
        )
    }

    /// A holds [Design 3, Build 5]; B was never saved.
    fn session() -> (Session, NodeId, NodeId) {
        let mut doc = Document::new("Sprint");
        let a = frame(&mut doc, "A", 0.0);
        let b = frame(&mut doc, "B", 200.0);
        let items = vec![LineItem::new("Design", "3"), LineItem::new("Build", "5")];
        doc.set_plugin_data(&a, ESTIMATE_KEY, estimate::encode(&items).unwrap());
        let mut session = Session::new(doc);
        session.pump(Instant::now()).unwrap();
        (session, a, b)
    }

    fn overlay_count(session: &Session) -> usize {
        session
            .document
            .draw_order()
            .iter()
            .filter(|n| n.name == HIGHLIGHT_NAME)
            .count()
    }

    #[test]
    fn startup_shows_only_estimated_frames() {
        let (session, a, _) = session();
        assert_eq!(session.presenter.mode(), Mode::List);
        let estimates = session.presenter.estimates();
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].id, a);
        assert_eq!(estimates[0].total, 8.0);
        assert_eq!(session.presenter.aggregate_total(), 8.0);
    }

    #[test]
    fn save_with_nothing_selected_flashes_error() {
        let (mut session, _, _) = session();
        let start = Instant::now();
        let before = session.presenter.estimates().to_vec();

        let save = session.presenter.save();
        session.send(save);
        session.pump(start).unwrap();
        assert_eq!(
            session.presenter.error(),
            Some("Error, Must have frame selected")
        );

        session
            .pump(start + Duration::from_millis(1000))
            .unwrap();
        assert_eq!(session.presenter.error(), None);
        assert_eq!(session.presenter.estimates(), before.as_slice());
    }

    #[test]
    fn selecting_editing_and_saving_a_frame() {
        let (mut session, _, b) = session();
        session.document.set_selection(vec![b.clone()]);
        session.pump(Instant::now()).unwrap();
        assert_eq!(session.presenter.mode(), Mode::Editor);
        assert_eq!(session.presenter.node().unwrap().id, b);

        session.presenter.add_item();
        session.presenter.update_item(0, Field::Label, "QA");
        session.presenter.update_item(0, Field::Value, "4");
        let save = session.presenter.save();
        session.send(save);
        session.pump(Instant::now()).unwrap();

        assert_eq!(session.presenter.mode(), Mode::List);
        assert_eq!(session.presenter.aggregate_total(), 12.0);
        assert_eq!(
            session.document.take_notifications(),
            vec!["Estimate saved".to_string()]
        );
    }

    #[test]
    fn cancel_returns_to_list_without_writing() {
        let (mut session, a, _) = session();
        let stored = session.document.plugin_data(&a, ESTIMATE_KEY);
        session.document.set_selection(vec![a.clone()]);
        session.pump(Instant::now()).unwrap();

        session.presenter.remove_item(0);
        let cancel = session.presenter.cancel();
        session.send(cancel);
        session.pump(Instant::now()).unwrap();

        assert_eq!(session.presenter.mode(), Mode::List);
        assert_eq!(session.document.plugin_data(&a, ESTIMATE_KEY), stored);
    }

    #[test]
    fn hovering_rows_keeps_a_single_overlay() {
        let (mut session, a, b) = session();
        session.document.set_selection(vec![b.clone()]);
        session.pump(Instant::now()).unwrap();
        session.send(PluginIntent::SaveEstimate {
            items: vec![LineItem::new("x", "1")],
        });
        session.pump(Instant::now()).unwrap();

        let intents = session.presenter.hover(Some(&a));
        session.send_all(intents);
        session.pump(Instant::now()).unwrap();
        assert_eq!(overlay_count(&session), 1);

        let intents = session.presenter.hover(Some(&b));
        session.send_all(intents);
        session.pump(Instant::now()).unwrap();
        assert_eq!(overlay_count(&session), 1);

        let intents = session.presenter.hover(None);
        session.send_all(intents);
        session.pump(Instant::now()).unwrap();
        assert_eq!(overlay_count(&session), 0);
    }

    #[test]
    fn opening_a_row_switches_to_editor() {
        let (mut session, a, _) = session();
        let intents = session.presenter.hover(Some(&a));
        session.send_all(intents);
        let open = session.presenter.open(&a);
        session.send(open);
        session.pump(Instant::now()).unwrap();

        assert_eq!(session.presenter.mode(), Mode::Editor);
        assert_eq!(session.presenter.items().len(), 2);
        assert_eq!(overlay_count(&session), 0);
    }

    #[test]
    fn deleting_a_selected_frame_drops_its_summary() {
        let (mut session, a, _) = session();
        session.document.set_selection(vec![a.clone()]);
        session.pump(Instant::now()).unwrap();

        session.document.remove_node(&a);
        session.pump(Instant::now()).unwrap();

        assert_eq!(session.presenter.mode(), Mode::Empty);
    }

    #[test]
    fn export_round_trip_delivers_csv() {
        let (mut session, _, _) = session();
        let export = session.presenter.export();
        session.send(export);
        session.pump(Instant::now()).unwrap();

        let downloads = session.presenter.take_downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].filename, "Sprint.csv");
        assert_eq!(
            downloads[0].data,
            "Frame,Item,Hours\nA,Design,3\nA,Build,5\n"
        );
    }
}
