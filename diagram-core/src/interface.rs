//! Port interfaces exposed by diagram blocks.
//!
//! Every block (node) owns a set of interfaces: typed bus ports with a
//! direction that decides which way a connection may flow. Direction
//! classification into [`PortRole`] is what the connection validator
//! operates on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an interface within a diagram.
///
/// Ids are plain strings on the wire; loaded documents may carry
/// arbitrary ids, while interfaces created in the editor get a fresh
/// UUID via [`InterfaceId::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(String);

impl InterfaceId {
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
}

impl std::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InterfaceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Bus protocol carried by an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    /// PCI Express.
    #[serde(rename = "PCIe")]
    PCIe,
    /// DDR memory channel.
    #[serde(rename = "DDR")]
    Ddr,
    /// Full AXI4.
    #[serde(rename = "AXI4")]
    Axi4,
    /// AXI4-Lite register access.
    #[serde(rename = "AXI4-Lite")]
    Axi4Lite,
    /// AXI4-Stream unidirectional stream.
    #[serde(rename = "AXI4-Stream")]
    Axi4Stream,
    /// AHB.
    #[serde(rename = "AHB")]
    Ahb,
    /// APB peripheral bus.
    #[serde(rename = "APB")]
    Apb,
    /// General-purpose I/O.
    #[serde(rename = "GPIO")]
    Gpio,
    /// SPI.
    #[serde(rename = "SPI")]
    Spi,
    /// I2C.
    #[serde(rename = "I2C")]
    I2c,
    /// UART.
    #[serde(rename = "UART")]
    Uart,
    /// Ethernet MAC/PHY link.
    #[serde(rename = "Ethernet")]
    Ethernet,
    /// WiFi radio link.
    #[serde(rename = "WiFi")]
    WiFi,
    /// USB.
    #[serde(rename = "USB")]
    Usb,
    /// CXL.
    #[serde(rename = "CXL")]
    Cxl,
    /// Anything not covered by the named protocols.
    #[serde(rename = "Custom")]
    Custom,
}

/// Direction of an interface as authored in the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Bus master: drives transactions.
    #[serde(rename = "master")]
    Master,
    /// Bus slave: receives transactions.
    #[serde(rename = "slave")]
    Slave,
    /// Acts as master and slave on the same port.
    #[serde(rename = "master & slave")]
    MasterSlave,
    /// Signal input.
    #[serde(rename = "input")]
    Input,
    /// Signal output.
    #[serde(rename = "output")]
    Output,
    /// Bidirectional signal.
    #[serde(rename = "inout")]
    Inout,
}

impl PortDirection {
    /// Classify the direction for connection validation.
    #[must_use]
    pub const fn role(self) -> PortRole {
        match self {
            Self::Master | Self::Output => PortRole::Source,
            Self::Slave | Self::Input => PortRole::Target,
            Self::MasterSlave | Self::Inout => PortRole::Bidirectional,
        }
    }
}

/// Connection-role category of a port direction.
///
/// Source-like ports drive a connection, target-like ports receive one,
/// and bidirectional ports are compatible with either role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    /// Drives connections (`master`, `output`).
    Source,
    /// Receives connections (`slave`, `input`).
    Target,
    /// Compatible with either role (`master & slave`, `inout`).
    Bidirectional,
}

/// Which edge of the block the interface is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Top edge.
    North,
    /// Bottom edge.
    South,
    /// Right edge.
    East,
    /// Left edge.
    West,
}

/// Role of the interface in the data flow of the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFlowRole {
    /// Initiates data transfers.
    Initiator,
    /// Target of data transfers.
    Target,
    /// Both initiates and receives.
    Both,
    /// Carries no payload data (clocks, resets, sideband).
    None,
}

/// A typed bus port on a diagram block.
///
/// Owned exclusively by its [`Node`](crate::Node); interfaces are never
/// shared between blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Interface {
    /// Unique identifier.
    pub id: InterfaceId,
    /// Display name (e.g. `"m_axi_gmem"`).
    pub name: String,
    /// Bus protocol.
    pub bus_type: BusType,
    /// Authored direction.
    pub direction: PortDirection,
    /// Data width in bits, if meaningful for the protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_width: Option<u32>,
    /// Address width in bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr_width: Option<u32>,
    /// Transaction id width in bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_width: Option<u32>,
    /// Link speed description (e.g. `"Gen4 x8"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Block edge the port is drawn on.
    pub placement: Placement,
    /// Data-flow role of the port.
    pub data_flow_role: DataFlowRole,
}

impl Interface {
    /// Create an interface with a generated id and default placement.
    ///
    /// Source-like ports default to the east edge, target-like ports to
    /// the west edge, matching how bus masters and slaves are usually
    /// drawn.
    #[must_use]
    pub fn new(name: impl Into<String>, bus_type: BusType, direction: PortDirection) -> Self {
        let placement = match direction.role() {
            PortRole::Source => Placement::East,
            PortRole::Target => Placement::West,
            PortRole::Bidirectional => Placement::North,
        };
        let data_flow_role = match direction.role() {
            PortRole::Source => DataFlowRole::Initiator,
            PortRole::Target => DataFlowRole::Target,
            PortRole::Bidirectional => DataFlowRole::Both,
        };
        Self {
            id: InterfaceId::generate(),
            name: name.into(),
            bus_type,
            direction,
            data_width: None,
            addr_width: None,
            id_width: None,
            speed: None,
            placement,
            data_flow_role,
        }
    }

    /// Set the interface id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<InterfaceId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the placement.
    #[must_use]
    pub const fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Set the data width in bits.
    #[must_use]
    pub const fn with_data_width(mut self, bits: u32) -> Self {
        self.data_width = Some(bits);
        self
    }

    /// Set the address width in bits.
    #[must_use]
    pub const fn with_addr_width(mut self, bits: u32) -> Self {
        self.addr_width = Some(bits);
        self
    }

    /// Set the data-flow role.
    #[must_use]
    pub const fn with_data_flow_role(mut self, role: DataFlowRole) -> Self {
        self.data_flow_role = role;
        self
    }

    /// Connection-role category of this interface.
    #[must_use]
    pub const fn role(&self) -> PortRole {
        self.direction.role()
    }
}

impl From<String> for InterfaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_roles() {
        assert_eq!(PortDirection::Master.role(), PortRole::Source);
        assert_eq!(PortDirection::Output.role(), PortRole::Source);
        assert_eq!(PortDirection::Slave.role(), PortRole::Target);
        assert_eq!(PortDirection::Input.role(), PortRole::Target);
        assert_eq!(PortDirection::MasterSlave.role(), PortRole::Bidirectional);
        assert_eq!(PortDirection::Inout.role(), PortRole::Bidirectional);
    }

    #[test]
    fn test_direction_wire_spelling() {
        let json = serde_json::to_string(&PortDirection::MasterSlave).expect("serialize");
        assert_eq!(json, "\"master & slave\"");

        let parsed: PortDirection = serde_json::from_str("\"inout\"").expect("parse");
        assert_eq!(parsed, PortDirection::Inout);
    }

    #[test]
    fn test_bus_type_wire_spelling() {
        let json = serde_json::to_string(&BusType::Axi4Lite).expect("serialize");
        assert_eq!(json, "\"AXI4-Lite\"");

        let parsed: BusType = serde_json::from_str("\"PCIe\"").expect("parse");
        assert_eq!(parsed, BusType::PCIe);
    }

    #[test]
    fn test_new_interface_defaults() {
        let iface = Interface::new("m_axi", BusType::Axi4, PortDirection::Master);
        assert_eq!(iface.placement, Placement::East);
        assert_eq!(iface.data_flow_role, DataFlowRole::Initiator);
        assert!(!iface.id.as_str().is_empty());

        let iface = Interface::new("s_axi", BusType::Axi4Lite, PortDirection::Slave);
        assert_eq!(iface.placement, Placement::West);
        assert_eq!(iface.data_flow_role, DataFlowRole::Target);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{
            "id": "i1",
            "name": "gpio0",
            "busType": "GPIO",
            "direction": "inout",
            "placement": "north",
            "dataFlowRole": "none",
            "voltage": "3v3"
        }"#;
        assert!(serde_json::from_str::<Interface>(json).is_err());
    }
}
