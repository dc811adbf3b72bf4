//! Message contracts shared by the controller and the presenter.
//!
//! Both directions travel as JSON objects tagged by `type`, so every message is
//! self-contained and can cross an isolation boundary as plain text.

use crate::host::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub value: String,
}

impl LineItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// One row of the aggregate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub total: f64,
}

/// The selected frame together with its stored estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub name: String,
    pub data: Vec<LineItem>,
}

/// Presenter -> controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PluginIntent {
    SaveEstimate { items: Vec<LineItem> },
    OpenEstimate { id: NodeId },
    CancelEstimate,
    HighlightEstimate { id: NodeId, toggle: bool },
    ExportEstimates,
}

/// Controller -> presenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PluginMessage {
    Error {
        error: String,
    },
    SetNode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeView>,
    },
    SetEstimates {
        estimates: Vec<NodeSummary>,
    },
    ExportReady {
        filename: String,
        data: String,
    },
}

impl PluginMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::SetNode { .. } => "set-node",
            Self::SetEstimates { .. } => "set-estimates",
            Self::ExportReady { .. } => "export-ready",
        }
    }
}

impl PluginIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SaveEstimate { .. } => "save-estimate",
            Self::OpenEstimate { .. } => "open-estimate",
            Self::CancelEstimate => "cancel-estimate",
            Self::HighlightEstimate { .. } => "highlight-estimate",
            Self::ExportEstimates => "export-estimates",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intents_use_kebab_case_tags() {
        let raw = serde_json::to_value(PluginIntent::HighlightEstimate {
            id: NodeId::from("1:4"),
            toggle: true,
        })
        .unwrap();
        assert_eq!(
            raw,
            json!({"type": "highlight-estimate", "id": "1:4", "toggle": true})
        );

        let cancel: PluginIntent = serde_json::from_value(json!({"type": "cancel-estimate"})).unwrap();
        assert_eq!(cancel, PluginIntent::CancelEstimate);
    }

    #[test]
    fn set_node_without_node_means_nothing_selected() {
        let raw = serde_json::to_value(PluginMessage::SetNode { node: None }).unwrap();
        assert_eq!(raw, json!({"type": "set-node"}));

        let decoded: PluginMessage = serde_json::from_value(json!({"type": "set-node"})).unwrap();
        assert_eq!(decoded, PluginMessage::SetNode { node: None });
    }

    #[test]
    fn set_node_carries_items_as_data() {
        let decoded: PluginMessage = serde_json::from_value(json!({
            "type": "set-node",
            "node": {"id": "1:2", "name": "Cart", "data": [{"label": "Design", "value": "3"}]}
        }))
        .unwrap();
        let PluginMessage::SetNode { node: Some(node) } = decoded else {
            panic!("expected a node");
        };
        assert_eq!(node.name, "Cart");
        assert_eq!(node.data, vec![LineItem::new("Design", "3")]);
    }

    #[test]
    fn unknown_intent_type_is_rejected() {
        let err = serde_json::from_value::<PluginIntent>(json!({"type": "delete-everything"}));
        assert!(err.is_err());
    }
}
