//! Sandboxed side of the extension: a view model over the latest controller
//! messages plus the unsaved edit buffer. It never sees the document; every
//! user action comes back out as a [`PluginIntent`].

use crate::error::{EstimatorError, Result};
use crate::host::NodeId;
use crate::protocol::{LineItem, NodeSummary, NodeView, PluginIntent, PluginMessage};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// How long an error stays on screen.
pub const ERROR_DISPLAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Editor,
    List,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Label,
    Value,
}

/// An export delivered by the controller, waiting to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub data: String,
}

impl Download {
    /// Writes the body into `dir` under the delivered name. Path components in
    /// the name are ignored.
    pub fn save_into(&self, dir: &Path) -> Result<PathBuf> {
        let name = Path::new(&self.filename)
            .file_name()
            .ok_or_else(|| EstimatorError::Export(format!("bad file name {:?}", self.filename)))?;
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        fs::write(&path, &self.data)?;
        Ok(path)
    }
}

#[derive(Debug, Default)]
pub struct Presenter {
    node: Option<NodeView>,
    items: Vec<LineItem>,
    estimates: Vec<NodeSummary>,
    error: Option<(String, Instant)>,
    hovered: Option<NodeId>,
    downloads: Vec<Download>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: PluginMessage, now: Instant) {
        match message {
            PluginMessage::Error { error } => {
                self.error = Some((error, now + ERROR_DISPLAY));
            }
            PluginMessage::SetNode { node } => {
                self.items = node.as_ref().map(|n| n.data.clone()).unwrap_or_default();
                self.node = node;
            }
            PluginMessage::SetEstimates { estimates } => self.estimates = estimates,
            PluginMessage::ExportReady { filename, data } => {
                self.downloads.push(Download { filename, data })
            }
        }
    }

    /// Clears the error once its display time has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.error.as_ref().is_some_and(|(_, until)| now >= *until) {
            self.error = None;
        }
    }

    pub fn mode(&self) -> Mode {
        if self.node.is_some() {
            Mode::Editor
        } else if self.estimates.is_empty() {
            Mode::Empty
        } else {
            Mode::List
        }
    }

    pub fn node(&self) -> Option<&NodeView> {
        self.node.as_ref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn estimates(&self) -> &[NodeSummary] {
        &self.estimates
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn hovered(&self) -> Option<&NodeId> {
        self.hovered.as_ref()
    }

    /// Whether the buffer differs from what the controller last sent.
    pub fn is_dirty(&self) -> bool {
        self.node.as_ref().is_some_and(|n| n.data != self.items)
    }

    pub fn aggregate_total(&self) -> f64 {
        self.estimates.iter().map(|e| e.total).sum()
    }

    pub fn add_item(&mut self) {
        self.items.push(LineItem::default());
    }

    pub fn remove_item(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    pub fn update_item(&mut self, index: usize, field: Field, text: impl Into<String>) {
        if let Some(item) = self.items.get_mut(index) {
            match field {
                Field::Label => item.label = text.into(),
                Field::Value => item.value = text.into(),
            }
        }
    }

    /// Mutable access for in-place text widgets.
    pub fn items_mut(&mut self) -> &mut [LineItem] {
        &mut self.items
    }

    pub fn save(&self) -> PluginIntent {
        PluginIntent::SaveEstimate {
            items: self.items.clone(),
        }
    }

    pub fn cancel(&mut self) -> PluginIntent {
        self.items = self.node.as_ref().map(|n| n.data.clone()).unwrap_or_default();
        PluginIntent::CancelEstimate
    }

    pub fn open(&mut self, id: &NodeId) -> PluginIntent {
        self.hovered = None;
        PluginIntent::OpenEstimate { id: id.clone() }
    }

    /// Translates the row under the pointer into leave/enter intents.
    pub fn hover(&mut self, id: Option<&NodeId>) -> Vec<PluginIntent> {
        if self.hovered.as_ref() == id {
            return vec![];
        }
        let mut intents = vec![];
        if let Some(left) = self.hovered.take() {
            intents.push(PluginIntent::HighlightEstimate {
                id: left,
                toggle: false,
            });
        }
        if let Some(entered) = id {
            intents.push(PluginIntent::HighlightEstimate {
                id: entered.clone(),
                toggle: true,
            });
            self.hovered = Some(entered.clone());
        }
        intents
    }

    pub fn export(&self) -> PluginIntent {
        PluginIntent::ExportEstimates
    }

    pub fn take_downloads(&mut self) -> Vec<Download> {
        std::mem::take(&mut self.downloads)
    }
}
