//! The contract the estimator expects from the design tool hosting it.
//!
//! The controller never touches a concrete document. Everything it needs from
//! the scene graph (traversal, per-node storage, selection, geometry and
//! overlay creation) goes through [`Host`].

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter};

/// Identity of a scene node. Stable for the node's lifetime and never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumIter)]
pub enum NodeKind {
    Frame,
    Rectangle,
    Text,
}

impl NodeKind {
    pub fn icon(self) -> &'static str {
        match self {
            NodeKind::Frame => "#",
            NodeKind::Rectangle => "▭",
            NodeKind::Text => "T",
        }
    }
}

/// Position relative to the parent plus size, in canvas units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// Solid fill with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Rgb {
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 1.0,
            b: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub bounds: Bounds,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub fill: Rgb,
    #[serde(default = "full_opacity")]
    pub opacity: f32,
    /// Locked nodes are drawn but never hit-tested.
    #[serde(default)]
    pub locked: bool,
    /// Transient nodes live only for the session and are never saved.
    #[serde(default)]
    pub transient: bool,
    #[serde(default)]
    pub plugin_data: std::collections::BTreeMap<String, String>,
}

fn full_opacity() -> f32 {
    1.0
}

/// Everything needed to place a purely visual overlay node.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub name: String,
    pub parent: Option<NodeId>,
    pub bounds: Bounds,
    pub fill: Rgb,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    SelectionChanged,
}

/// Scene graph primitives provided by the host. Calls are assumed atomic and
/// succeed unless the referenced node no longer exists.
pub trait Host {
    fn page_name(&self) -> &str;

    fn node(&self, id: &NodeId) -> Option<&SceneNode>;

    /// All frame nodes on the current page, in depth-first document order.
    fn frames(&self) -> Vec<&SceneNode>;

    /// Stored text for `key`, or an empty string when unset.
    fn plugin_data(&self, id: &NodeId, key: &str) -> String;

    /// Returns `false` when the node no longer exists.
    fn set_plugin_data(&mut self, id: &NodeId, key: &str, value: String) -> bool;

    fn selection(&self) -> Vec<NodeId>;

    fn set_selection(&mut self, ids: Vec<NodeId>);

    /// Creates a locked, transient node appended last under `spec.parent`
    /// (or the page) so it draws above its siblings.
    fn create_overlay(&mut self, spec: OverlaySpec) -> NodeId;

    /// Removes a node and its subtree. Returns `false` if it was already gone.
    fn remove_node(&mut self, id: &NodeId) -> bool;

    /// User-visible toast outside the extension panel.
    fn notify(&mut self, message: &str);

    /// Drains lifecycle events raised since the last call.
    fn take_events(&mut self) -> Vec<HostEvent>;
}
