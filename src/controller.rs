//! Privileged side of the extension: the only code that reads or writes the
//! host document.

use crate::channel::ControllerPort;
use crate::error::{EstimatorError, Result};
use crate::estimate::{self, ESTIMATE_KEY};
use crate::export;
use crate::host::{Host, HostEvent, NodeId, NodeKind, OverlaySpec, Rgb};
use crate::protocol::{LineItem, NodeSummary, NodeView, PluginIntent, PluginMessage};

pub const HIGHLIGHT_NAME: &str = "ESTIMATOR";
pub const HIGHLIGHT_FILL: Rgb = Rgb {
    r: 0.85,
    g: 0.92,
    b: 0.97,
};
pub const HIGHLIGHT_OPACITY: f32 = 0.85;
pub const SAVED_NOTICE: &str = "Estimate saved";

/// Where the controller's outbound messages go.
pub trait Outbox {
    fn post(&mut self, message: PluginMessage) -> Result<()>;
}

impl Outbox for ControllerPort {
    fn post(&mut self, message: PluginMessage) -> Result<()> {
        ControllerPort::post(self, &message)
    }
}

impl Outbox for Vec<PluginMessage> {
    fn post(&mut self, message: PluginMessage) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

pub struct Controller<O> {
    outbox: O,
    /// The overlay this controller created, if it still holds one.
    highlight: Option<NodeId>,
}

impl<O: Outbox> Controller<O> {
    pub fn new(outbox: O) -> Self {
        Self {
            outbox,
            highlight: None,
        }
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    pub fn highlight(&self) -> Option<&NodeId> {
        self.highlight.as_ref()
    }

    fn emit(&mut self, message: PluginMessage) {
        let kind = message.kind();
        if let Err(err) = self.outbox.post(message) {
            tracing::warn!(kind, %err, "presenter unreachable");
        }
    }

    /// Startup hook: publish the current selection and the aggregate list.
    pub fn start<H: Host + ?Sized>(&mut self, host: &mut H) {
        tracing::info!(page = host.page_name(), "estimator started");
        self.get_selection(host);
        self.list_estimates(host);
    }

    pub fn on_host_event<H: Host + ?Sized>(&mut self, host: &mut H, event: HostEvent) {
        match event {
            HostEvent::SelectionChanged => {
                self.get_selection(host);
                // sweeps summaries of frames deleted since the last scan
                self.list_estimates(host);
            }
        }
    }

    pub fn handle<H: Host + ?Sized>(&mut self, host: &mut H, intent: PluginIntent) {
        tracing::debug!(kind = intent.kind(), "intent received");
        match intent {
            PluginIntent::SaveEstimate { items } => self.save_estimate(host, items),
            PluginIntent::OpenEstimate { id } => self.open_estimate(host, &id),
            PluginIntent::CancelEstimate => self.cancel_estimate(host),
            PluginIntent::HighlightEstimate { id, toggle } => {
                self.highlight_estimate(host, &id, toggle)
            }
            PluginIntent::ExportEstimates => self.export_estimates(host),
        }
    }

    /// Totals for every frame holding a non-empty estimate.
    pub fn summaries<H: Host + ?Sized>(&self, host: &H) -> (Vec<NodeSummary>, Vec<EstimatorError>) {
        let mut summaries = vec![];
        let mut corrupt = vec![];
        for node in host.frames() {
            match estimate::read(host, node) {
                Ok(items) if items.is_empty() => {}
                Ok(items) => summaries.push(NodeSummary {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    total: estimate::total(&items),
                }),
                Err(err) => {
                    tracing::warn!(node = %node.id, %err, "skipping corrupt estimate");
                    corrupt.push(err);
                }
            }
        }
        (summaries, corrupt)
    }

    pub fn list_estimates<H: Host + ?Sized>(&mut self, host: &H) {
        let (estimates, corrupt) = self.summaries(host);
        if let Some(err) = corrupt.into_iter().next() {
            self.emit(PluginMessage::error(err.to_string()));
        }
        self.emit(PluginMessage::SetEstimates { estimates });
    }

    pub fn get_selection<H: Host + ?Sized>(&mut self, host: &H) {
        let selection = host.selection();
        let frame = match selection.as_slice() {
            [only] => host.node(only).filter(|n| n.kind == NodeKind::Frame),
            _ => None,
        };
        let Some(node) = frame else {
            self.emit(PluginMessage::SetNode { node: None });
            return;
        };
        let data = match estimate::read(host, node) {
            Ok(items) => items,
            Err(err) => {
                // still open the editor so a save can replace the bad record
                tracing::warn!(node = %node.id, %err, "selected frame has a corrupt estimate");
                let view = NodeView {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    data: vec![],
                };
                self.emit(PluginMessage::error(err.to_string()));
                self.emit(PluginMessage::SetNode { node: Some(view) });
                return;
            }
        };
        let view = NodeView {
            id: node.id.clone(),
            name: node.name.clone(),
            data,
        };
        self.emit(PluginMessage::SetNode { node: Some(view) });
    }

    pub fn save_estimate<H: Host + ?Sized>(&mut self, host: &mut H, items: Vec<LineItem>) {
        if let Err(err) = self.try_save(host, &items) {
            tracing::warn!(%err, "save rejected");
            self.emit(PluginMessage::error(err.to_string()));
            return;
        }
        host.set_selection(vec![]);
        host.notify(SAVED_NOTICE);
        self.list_estimates(host);
    }

    fn try_save<H: Host + ?Sized>(&self, host: &mut H, items: &[LineItem]) -> Result<()> {
        let target = host
            .selection()
            .into_iter()
            .next()
            .filter(|id| host.node(id).is_some_and(|n| n.kind == NodeKind::Frame))
            .ok_or(EstimatorError::NoFrameSelected)?;
        let encoded = estimate::encode(items)?;
        if !host.set_plugin_data(&target, ESTIMATE_KEY, encoded) {
            return Err(EstimatorError::NoFrameSelected);
        }
        tracing::info!(node = %target, items = items.len(), "estimate saved");
        Ok(())
    }

    pub fn open_estimate<H: Host + ?Sized>(&mut self, host: &mut H, id: &NodeId) {
        if host.node(id).is_none() {
            tracing::warn!(node = %id, "open for missing node ignored");
            return;
        }
        host.set_selection(vec![id.clone()]);
        self.release_highlight(host);
    }

    pub fn cancel_estimate<H: Host + ?Sized>(&mut self, host: &mut H) {
        host.set_selection(vec![]);
    }

    pub fn highlight_estimate<H: Host + ?Sized>(&mut self, host: &mut H, id: &NodeId, toggle: bool) {
        if !toggle {
            // the handle is ours, so leaving works even after the target is gone
            self.release_highlight(host);
            return;
        }
        let Some(target) = host.node(id) else {
            tracing::debug!(node = %id, "highlight for missing node ignored");
            return;
        };
        let spec = OverlaySpec {
            name: HIGHLIGHT_NAME.to_string(),
            parent: target.parent.clone(),
            bounds: target.bounds,
            fill: HIGHLIGHT_FILL,
            opacity: HIGHLIGHT_OPACITY,
        };
        self.release_highlight(host);
        let overlay = host.create_overlay(spec);
        tracing::debug!(node = %id, %overlay, "highlight shown");
        self.highlight = Some(overlay);
    }

    fn release_highlight<H: Host + ?Sized>(&mut self, host: &mut H) {
        if let Some(overlay) = self.highlight.take() {
            host.remove_node(&overlay);
        }
    }

    pub fn export_estimates<H: Host + ?Sized>(&mut self, host: &H) {
        let result = export::collect_rows(host).and_then(|rows| {
            let data = export::render_csv(&rows)?;
            Ok((rows.len(), data))
        });
        match result {
            Ok((rows, data)) => {
                let filename = export::export_filename(host.page_name());
                tracing::info!(%filename, rows, "export ready");
                self.emit(PluginMessage::ExportReady { filename, data });
            }
            Err(err) => {
                tracing::warn!(%err, "export failed");
                let message = match err {
                    EstimatorError::Export(_) => err.to_string(),
                    other => format!("Export failed: {other}"),
                };
                self.emit(PluginMessage::error(message));
            }
        }
    }
}
