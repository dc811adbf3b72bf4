//! In-memory scene graph backing the desktop canvas.

use crate::error::Result;
use crate::host::{Bounds, Host, HostEvent, NodeId, NodeKind, OverlaySpec, Rgb, SceneNode};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub page_name: String,
    roots: Vec<NodeId>,
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u64,
    #[serde(skip)]
    selection: Vec<NodeId>,
    #[serde(skip)]
    events: Vec<HostEvent>,
    #[serde(skip)]
    notifications: Vec<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Page 1")
    }
}

impl Document {
    pub fn new(page_name: impl Into<String>) -> Self {
        Self {
            page_name: page_name.into(),
            roots: vec![],
            nodes: BTreeMap::new(),
            next_id: 1,
            selection: vec![],
            events: vec![],
            notifications: vec![],
        }
    }

    /// A small starter page so a fresh session has something to estimate.
    pub fn sample() -> Self {
        let mut doc = Self::new("Checkout Flow");
        let cart = doc.add_node(
            NodeKind::Frame,
            "Cart",
            Bounds {
                x: 40.0,
                y: 40.0,
                width: 220.0,
                height: 320.0,
            },
            None,
        );
        doc.add_node(
            NodeKind::Rectangle,
            "Line item card",
            Bounds {
                x: 16.0,
                y: 24.0,
                width: 188.0,
                height: 64.0,
            },
            Some(&cart),
        );
        doc.add_node(
            NodeKind::Frame,
            "Payment",
            Bounds {
                x: 300.0,
                y: 40.0,
                width: 220.0,
                height: 320.0,
            },
            None,
        );
        doc.add_node(
            NodeKind::Text,
            "Notes",
            Bounds {
                x: 560.0,
                y: 40.0,
                width: 160.0,
                height: 40.0,
            },
            None,
        );
        doc
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(format!("1:{}", self.next_id));
        self.next_id += 1;
        id
    }

    /// Appends a node under `parent`, or at page level when `parent` is `None`
    /// or no longer exists.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        name: impl Into<String>,
        bounds: Bounds,
        parent: Option<&NodeId>,
    ) -> NodeId {
        let id = self.allocate_id();
        let parent = parent.filter(|p| self.nodes.contains_key(*p)).cloned();
        let fill = match kind {
            NodeKind::Frame => Rgb::default(),
            NodeKind::Rectangle => Rgb {
                r: 0.82,
                g: 0.84,
                b: 0.88,
            },
            NodeKind::Text => Rgb {
                r: 0.2,
                g: 0.2,
                b: 0.2,
            },
        };
        self.insert(SceneNode {
            id: id.clone(),
            kind,
            name: name.into(),
            bounds,
            parent,
            children: vec![],
            fill,
            opacity: 1.0,
            locked: false,
            transient: false,
            plugin_data: BTreeMap::new(),
        });
        id
    }

    fn insert(&mut self, node: SceneNode) {
        match node.parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.push(node.id.clone()),
            None => self.roots.push(node.id.clone()),
        }
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn rename(&mut self, id: &NodeId, name: impl Into<String>) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn translate(&mut self, id: &NodeId, dx: f32, dy: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.bounds.x += dx;
            node.bounds.y += dy;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Depth-first pre-order walk; later entries draw above earlier ones.
    pub fn draw_order(&self) -> Vec<&SceneNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&NodeId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(node);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Bounds in page coordinates, accumulating parent offsets.
    pub fn absolute_bounds(&self, id: &NodeId) -> Option<Bounds> {
        let node = self.nodes.get(id)?;
        let mut bounds = node.bounds;
        let mut parent = node.parent.as_ref();
        while let Some(pid) = parent {
            let Some(p) = self.nodes.get(pid) else { break };
            bounds.x += p.bounds.x;
            bounds.y += p.bounds.y;
            parent = p.parent.as_ref();
        }
        Some(bounds)
    }

    /// Topmost unlocked node under the point.
    pub fn hit_test(&self, px: f32, py: f32) -> Option<NodeId> {
        self.draw_order()
            .into_iter()
            .rev()
            .filter(|n| !n.locked)
            .find(|n| {
                self.absolute_bounds(&n.id)
                    .is_some_and(|b| b.contains(px, py))
            })
            .map(|n| n.id.clone())
    }

    pub fn take_notifications(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notifications)
    }

    fn collect_subtree(&self, id: &NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(id) {
            out.push(id.clone());
            for child in &node.children {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Copy with every transient node stripped.
    fn persistent_copy(&self) -> Self {
        let mut copy = self.clone();
        let transient: Vec<NodeId> = copy
            .nodes
            .values()
            .filter(|n| n.transient)
            .map(|n| n.id.clone())
            .collect();
        for id in transient {
            copy.detach(&id);
        }
        copy
    }

    fn detach(&mut self, id: &NodeId) -> bool {
        let mut doomed = vec![];
        self.collect_subtree(id, &mut doomed);
        if doomed.is_empty() {
            return false;
        }
        let parent = self.nodes.get(id).and_then(|n| n.parent.clone());
        match parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.children.retain(|c| c != id),
            None => self.roots.retain(|c| c != id),
        }
        for gone in &doomed {
            self.nodes.remove(gone);
        }
        true
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_vec_pretty(&self.persistent_copy())?;
        fs::write(path, payload)?;
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read(path)?;
        let mut doc: Self = serde_json::from_slice(&content)?;
        doc.normalize_loaded();
        Ok(doc)
    }

    /// Repairs hand-edited files: dangling ids, cycles and nodes listed under
    /// more than one parent.
    fn normalize_loaded(&mut self) {
        self.rebuild_tree();
        let highest = self
            .nodes
            .keys()
            .filter_map(|id| id.as_str().rsplit(':').next()?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(highest + 1);
        if self.page_name.trim().is_empty() {
            self.page_name = "Page 1".to_string();
        }
    }

    /// Walks from the roots keeping only the first place each node is reached.
    /// Nodes no walk reaches become page-level roots in id order.
    fn rebuild_tree(&mut self) {
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut roots = vec![];
        let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut parents: BTreeMap<NodeId, NodeId> = BTreeMap::new();

        let starts: Vec<NodeId> = self
            .roots
            .iter()
            .chain(self.nodes.keys())
            .cloned()
            .collect();
        for start in starts {
            if !self.nodes.contains_key(&start) || !visited.insert(start.clone()) {
                continue;
            }
            roots.push(start.clone());
            let mut stack = vec![start];
            while let Some(id) = stack.pop() {
                let Some(node) = self.nodes.get(&id) else { continue };
                let kept: Vec<NodeId> = node
                    .children
                    .iter()
                    .filter(|c| self.nodes.contains_key(*c) && visited.insert((*c).clone()))
                    .cloned()
                    .collect();
                for child in &kept {
                    parents.insert(child.clone(), id.clone());
                }
                stack.extend(kept.iter().rev().cloned());
                children.insert(id, kept);
            }
        }

        for (id, node) in self.nodes.iter_mut() {
            node.children = children.remove(id).unwrap_or_default();
            node.parent = parents.remove(id);
        }
        self.roots = roots;
    }
}

impl Host for Document {
    fn page_name(&self) -> &str {
        &self.page_name
    }

    fn node(&self, id: &NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    fn frames(&self) -> Vec<&SceneNode> {
        self.draw_order()
            .into_iter()
            .filter(|n| n.kind == NodeKind::Frame)
            .collect()
    }

    fn plugin_data(&self, id: &NodeId, key: &str) -> String {
        self.nodes
            .get(id)
            .and_then(|n| n.plugin_data.get(key))
            .cloned()
            .unwrap_or_default()
    }

    fn set_plugin_data(&mut self, id: &NodeId, key: &str, value: String) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.plugin_data.insert(key.to_string(), value);
                true
            }
            None => false,
        }
    }

    fn selection(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    fn set_selection(&mut self, ids: Vec<NodeId>) {
        let ids: Vec<NodeId> = ids
            .into_iter()
            .filter(|id| self.nodes.contains_key(id))
            .collect();
        if ids != self.selection {
            self.selection = ids;
            self.events.push(HostEvent::SelectionChanged);
        }
    }

    fn create_overlay(&mut self, spec: OverlaySpec) -> NodeId {
        let id = self.allocate_id();
        let parent = spec.parent.filter(|p| self.nodes.contains_key(p));
        self.insert(SceneNode {
            id: id.clone(),
            kind: NodeKind::Rectangle,
            name: spec.name,
            bounds: spec.bounds,
            parent,
            children: vec![],
            fill: spec.fill,
            opacity: spec.opacity,
            locked: true,
            transient: true,
            plugin_data: BTreeMap::new(),
        });
        id
    }

    fn remove_node(&mut self, id: &NodeId) -> bool {
        if !self.detach(id) {
            return false;
        }
        let before = self.selection.len();
        let nodes = &self.nodes;
        self.selection.retain(|s| nodes.contains_key(s));
        if self.selection.len() != before {
            self.events.push(HostEvent::SelectionChanged);
        }
        true
    }

    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }

    fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Bounds {
        Bounds {
            x,
            y,
            width: w,
            height: h,
        }
    }

    #[test]
    fn frames_follow_document_order() {
        let mut doc = Document::new("Page");
        let a = doc.add_node(NodeKind::Frame, "A", rect(0.0, 0.0, 10.0, 10.0), None);
        let nested = doc.add_node(NodeKind::Frame, "Nested", rect(1.0, 1.0, 2.0, 2.0), Some(&a));
        doc.add_node(NodeKind::Text, "label", rect(0.0, 0.0, 1.0, 1.0), None);
        let b = doc.add_node(NodeKind::Frame, "B", rect(20.0, 0.0, 10.0, 10.0), None);

        let ids: Vec<NodeId> = doc.frames().into_iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec![a, nested, b]);
    }

    #[test]
    fn removing_a_node_drops_subtree_and_selection() {
        let mut doc = Document::new("Page");
        let a = doc.add_node(NodeKind::Frame, "A", rect(0.0, 0.0, 10.0, 10.0), None);
        let child = doc.add_node(NodeKind::Rectangle, "c", rect(0.0, 0.0, 1.0, 1.0), Some(&a));
        doc.set_selection(vec![child.clone()]);
        doc.take_events();

        assert!(doc.remove_node(&a));
        assert!(doc.node(&child).is_none());
        assert!(doc.selection().is_empty());
        assert_eq!(doc.take_events(), vec![HostEvent::SelectionChanged]);
        assert!(!doc.remove_node(&a));
    }

    #[test]
    fn selection_event_only_fires_on_change() {
        let mut doc = Document::new("Page");
        let a = doc.add_node(NodeKind::Frame, "A", rect(0.0, 0.0, 10.0, 10.0), None);
        doc.set_selection(vec![a.clone()]);
        doc.set_selection(vec![a]);
        doc.set_selection(vec![NodeId::from("9:9")]);
        assert_eq!(doc.take_events().len(), 2);
        assert!(doc.selection().is_empty());
    }

    #[test]
    fn hit_test_skips_locked_overlay_and_uses_page_coordinates() {
        let mut doc = Document::new("Page");
        let a = doc.add_node(NodeKind::Frame, "A", rect(100.0, 100.0, 50.0, 50.0), None);
        let inner = doc.add_node(NodeKind::Rectangle, "r", rect(10.0, 10.0, 10.0, 10.0), Some(&a));
        doc.create_overlay(OverlaySpec {
            name: "overlay".into(),
            parent: None,
            bounds: rect(100.0, 100.0, 50.0, 50.0),
            fill: Rgb::default(),
            opacity: 0.5,
        });

        assert_eq!(doc.hit_test(115.0, 115.0), Some(inner));
        assert_eq!(doc.hit_test(140.0, 140.0), Some(a));
        assert_eq!(doc.hit_test(10.0, 10.0), None);
    }

    #[test]
    fn saved_documents_never_contain_overlays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");
        let mut doc = Document::new("Review");
        let a = doc.add_node(NodeKind::Frame, "A", rect(0.0, 0.0, 10.0, 10.0), None);
        doc.set_plugin_data(&a, "estimator", "[]".into());
        let overlay = doc.create_overlay(OverlaySpec {
            name: "overlay".into(),
            parent: Some(a.clone()),
            bounds: rect(0.0, 0.0, 10.0, 10.0),
            fill: Rgb::default(),
            opacity: 0.5,
        });

        doc.save_to_path(&path).unwrap();
        let loaded = Document::load_from_path(&path).unwrap();

        assert_eq!(loaded.page_name, "Review");
        assert!(loaded.node(&overlay).is_none());
        assert!(loaded.node(&a).unwrap().children.is_empty());
        assert_eq!(loaded.plugin_data(&a, "estimator"), "[]");
        // the live document still has it
        assert!(doc.node(&overlay).is_some());
    }

    fn frame_json(id: &str, parent: Option<&str>, children: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "kind": "Frame",
            "name": format!("Frame {id}"),
            "bounds": {"x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0},
            "parent": parent,
            "children": children,
        })
    }

    fn load_json(value: serde_json::Value) -> Document {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.json");
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        Document::load_from_path(&path).unwrap()
    }

    #[test]
    fn loading_a_parent_cycle_lists_each_frame_once() {
        let doc = load_json(serde_json::json!({
            "page_name": "Loop",
            "roots": ["1:1"],
            "next_id": 3,
            "nodes": {
                "1:1": frame_json("1:1", Some("1:2"), &["1:2"]),
                "1:2": frame_json("1:2", Some("1:1"), &["1:1"]),
            },
        }));

        let ids: Vec<&str> = doc.frames().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1:1", "1:2"]);
        assert_eq!(doc.node(&NodeId::from("1:1")).unwrap().parent, None);
        assert!(doc.node(&NodeId::from("1:2")).unwrap().children.is_empty());
        assert!(doc.absolute_bounds(&NodeId::from("1:2")).is_some());
    }

    #[test]
    fn loading_a_node_listed_twice_keeps_the_first_placement() {
        let doc = load_json(serde_json::json!({
            "page_name": "Dupes",
            "roots": ["1:1", "1:2", "1:1"],
            "next_id": 3,
            "nodes": {
                "1:1": frame_json("1:1", None, &["1:2"]),
                "1:2": frame_json("1:2", None, &[]),
            },
        }));

        let ids: Vec<&str> = doc.frames().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1:1", "1:2"]);
        assert_eq!(
            doc.node(&NodeId::from("1:2")).unwrap().parent,
            Some(NodeId::from("1:1"))
        );
    }

    #[test]
    fn unreachable_cycle_is_promoted_to_page_level() {
        let doc = load_json(serde_json::json!({
            "page_name": "Orphans",
            "roots": [],
            "next_id": 3,
            "nodes": {
                "1:1": frame_json("1:1", Some("1:2"), &["1:2"]),
                "1:2": frame_json("1:2", Some("1:1"), &["1:1"]),
            },
        }));

        assert_eq!(doc.frames().len(), 2);
        assert_eq!(doc.hit_test(5.0, 5.0), Some(NodeId::from("1:2")));
    }

    #[test]
    fn loaded_documents_keep_allocating_fresh_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");
        let mut doc = Document::new("P");
        let a = doc.add_node(NodeKind::Frame, "A", rect(0.0, 0.0, 1.0, 1.0), None);
        doc.save_to_path(&path).unwrap();

        let mut loaded = Document::load_from_path(&path).unwrap();
        let b = loaded.add_node(NodeKind::Frame, "B", rect(0.0, 0.0, 1.0, 1.0), None);
        assert_ne!(a, b);
    }
}
