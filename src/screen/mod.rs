//! Screen Sessions
//!
//! Data model for logical screens and the three components that own it:
//!
//! - [`IdentityMapper`] translates between hardware surface ids and logical
//!   screen ids.
//! - [`SessionRegistry`] owns every [`ScreenSession`], keyed by logical id.
//! - [`GroupingEngine`] maintains mirror/extend/unique groups over the
//!   registry's sessions.
//!
//! # Ownership
//!
//! Sessions live in a single arena inside the registry. Everything else
//! (groups, the physical counterpart twin, the coordinator) refers to a
//! session by id only, and reads go through cloned snapshots:
//!
//! ```text
//! ScreenMap (one RwLock)
//!   ├─> sessions:  LogicalScreenId  → ScreenSession
//!   ├─> twins:     PhysicalSurfaceId → ScreenSession   (geometry only)
//!   ├─> groups:    GroupId          → ScreenSessionGroup
//!   └─> cast_info: LogicalScreenId  → (target, combination)
//! ```
//!
//! Group membership and session state are mutated under the same lock so a
//! reader never sees a session pointing at a deleted group.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

mod group;
mod id_mapper;
mod registry;

pub use group::{GroupId, GroupMember, GroupingEngine, ReconcileOutcome, ScreenSessionGroup};
pub use id_mapper::IdentityMapper;
pub use registry::SessionRegistry;

/// Client-facing screen identifier, allocated by the [`IdentityMapper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalScreenId(pub u64);

impl fmt::Display for LogicalScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Hardware/render-side output identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysicalSurfaceId(pub u64);

impl fmt::Display for PhysicalSurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Origin of a screen session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenKind {
    /// Physical panel reported by the driver
    Real,
    /// Virtual screen (cast, recording)
    Virtual,
    /// Placeholder used while a panel is handed over
    Fake,
}

/// Topology role of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    /// Primary screen of a multi-screen topology
    Main,
    /// Shows the anchor screen's content
    Mirror,
    /// Extends the desktop next to the anchor screen
    Extend,
    /// Independent content, no sharing
    Unique,
    /// Not part of any topology
    Alone,
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Combination::Main => "main",
            Combination::Mirror => "mirror",
            Combination::Extend => "extend",
            Combination::Unique => "unique",
            Combination::Alone => "alone",
        };
        f.write_str(name)
    }
}

/// A point in the combined desktop space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// X offset in pixels
    pub x: i32,
    /// Y offset in pixels
    pub y: i32,
}

impl Point {
    /// Create a point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The origin `(0, 0)`
    pub const ORIGIN: Point = Point::new(0, 0);
}

/// Geometry handle for a screen
///
/// Owned by the external display-property collaborator; the core only reads
/// the size and writes the relative position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenProperty {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Position relative to the default screen
    pub position: Point,
    /// Virtual pixel ratio
    pub density: f32,
}

impl ScreenProperty {
    /// Create a property with the given size at the origin
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            position: Point::ORIGIN,
            density: 1.0,
        }
    }
}

impl Default for ScreenProperty {
    fn default() -> Self {
        Self::with_size(0, 0)
    }
}

/// Identity fields of a physical panel (EDID-like)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelIdentity {
    /// Panel name
    pub name: String,
    /// Manufacturer code
    pub manufacturer: String,
    /// Product code
    pub product_code: u32,
    /// Serial number string
    pub serial_number: String,
}

impl PanelIdentity {
    /// Stable hash of the identity fields, used as the settings key
    pub fn serial_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.manufacturer.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.product_code.to_le_bytes());
        hasher.update(self.serial_number.as_bytes());
        hasher
            .finalize()
            .iter()
            .take(16)
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// State of one logical screen
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSession {
    /// Logical id
    pub id: LogicalScreenId,
    /// Bound physical surface
    pub physical_id: PhysicalSurfaceId,
    /// Session origin
    pub kind: ScreenKind,
    /// Topology role
    pub combination: Combination,
    /// Built-in panel
    pub is_internal: bool,
    /// Connected and in use
    pub is_current_in_use: bool,
    /// Extended desktop member
    pub is_extend: bool,
    /// Owning group, by id
    pub group_id: Option<GroupId>,
    /// Geometry handle
    pub property: ScreenProperty,
    /// Panel identity, when the driver reports one
    pub identity: PanelIdentity,
    /// Physical twin used for raw geometry math on dual-role devices
    pub physical_counterpart: Option<PhysicalSurfaceId>,
}

impl ScreenSession {
    /// Create a fresh, in-use session with no group
    pub fn new(
        id: LogicalScreenId,
        physical_id: PhysicalSurfaceId,
        kind: ScreenKind,
        property: ScreenProperty,
    ) -> Self {
        Self {
            id,
            physical_id,
            kind,
            combination: Combination::Alone,
            is_internal: false,
            is_current_in_use: true,
            is_extend: false,
            group_id: None,
            property,
            identity: PanelIdentity::default(),
            physical_counterpart: None,
        }
    }

    /// Whether this is a connected physical panel
    pub fn is_real_in_use(&self) -> bool {
        self.kind == ScreenKind::Real && self.is_current_in_use
    }
}
