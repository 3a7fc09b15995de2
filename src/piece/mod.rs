//! Placed track pieces and their connectors.
//!
//! A piece is a catalog entry instantiated at a placement. It owns its
//! connectors and recomputes their world poses every time the placement
//! changes; keeping the graph in step is the orchestrator's job.

mod catalog;
mod connector;
mod placement;
mod track_piece;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use catalog::{Catalog, CatalogEntry, ConnectorLayout, PieceType};
pub use connector::{Connector, ConnectorId, ConnectorRole, WorldPose};
pub use placement::Placement;
pub use track_piece::{ConnectorSnapshot, EdgeSpec, PieceSnapshot, SwitchState, TrackPiece};

/// Stable piece identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(pub u32);

impl PieceId {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Piece({})", self.0)
    }
}

impl From<u32> for PieceId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}
