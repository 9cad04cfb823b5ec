//! Diagram blocks - the functional units of a design.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interface::{Interface, InterfaceId};

/// Unique identifier for a node.
///
/// Node ids are user-visible strings and may be renamed; the graph
/// rewrites edge endpoints when that happens. Ids created in the editor
/// come from [`NodeId::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create an id from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Canvas position of a block's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Position {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rendered size of a block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Size {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 180.0,
            height: 120.0,
        }
    }
}

/// A functional block on the diagram canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Block category (e.g. `"cpu"`, `"memory"`, `"accelerator"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Canvas position.
    pub position: Position,
    /// Rendered size.
    pub size: Size,
    /// Display label.
    pub label: String,
    /// Weak reference to a component-library entry, if this block was
    /// instantiated from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    /// Bus ports owned by this block.
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Node {
    /// Create a block with a generated id and default geometry.
    #[must_use]
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: NodeId::generate(),
            kind: kind.into(),
            position: Position::default(),
            size: Size::default(),
            label: label.into(),
            component_id: None,
            interfaces: Vec::new(),
        }
    }

    /// Set the node id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the position.
    #[must_use]
    pub const fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Set the size.
    #[must_use]
    pub const fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Set the component-library reference.
    #[must_use]
    pub fn with_component_id(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    /// Add an interface.
    #[must_use]
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Look up an interface by id.
    #[must_use]
    pub fn interface(&self, id: &InterfaceId) -> Option<&Interface> {
        self.interfaces.iter().find(|i| &i.id == id)
    }

    /// Look up an interface mutably by id.
    pub fn interface_mut(&mut self, id: &InterfaceId) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| &i.id == id)
    }
}

/// Partial update applied to a node by [`Graph::update_node`](crate::Graph::update_node).
///
/// `None` fields are left untouched. A present `id` renames the node;
/// the graph rewrites all referencing edges as part of the same commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodePatch {
    /// New node id (rename).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// New block category.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// New position (drag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// New size (resize).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// New label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// New component-library reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    /// Replacement interface set (inspector edits).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<Interface>>,
}

impl NodePatch {
    /// A patch that only moves the node.
    #[must_use]
    pub fn move_to(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// A patch that renames the node.
    #[must_use]
    pub fn rename(id: impl Into<NodeId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// A patch that relabels the node.
    #[must_use]
    pub fn relabel(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}
