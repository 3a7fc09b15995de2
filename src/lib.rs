//! Track Layout - WASM Module
//!
//! Core data structures for a model-railway layout editor: the track graph,
//! connector snapping and the arc geometry used to render curved track. The
//! crate compiles to WebAssembly and exposes a JavaScript-friendly API via
//! wasm-bindgen; every piece of it is also usable as a plain Rust library.
//!
//! # Architecture
//!
//! - `geometry`: Arc solver and position/tangent sampling
//! - `graph`: Track topology using petgraph's StableGraph
//! - `spatial`: R-tree index of graph nodes for connector merging
//! - `piece`: Catalog entries, placed pieces and their connectors
//! - `snap`: Candidate search, snap transforms and connection validation
//! - `system`: Orchestrator keeping pieces and graph in step

use glam::Vec3;
use js_sys::Float32Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod geometry;
pub mod graph;
pub mod piece;
pub mod snap;
pub mod spatial;
pub mod system;

use error::TrackError;
use geometry::{Curve, PathSample};
use graph::{EdgeId, NodeId};
use piece::{CatalogEntry, ConnectorRole, PieceId, Placement};
use snap::SnapCandidate;
use system::{LayoutSnapshot, TrackConfig, TrackSystem};

/// Floats per sample in [`TrackLayoutWasm::sample_edge`] buffers:
/// position, tangent, cumulative distance.
pub const SAMPLE_STRIDE: usize = 7;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Main entry point for the layout engine.
///
/// This struct wraps the internal TrackSystem and provides the public API
/// exposed to JavaScript. Structured values cross the boundary as plain JS
/// objects; vectors are `[x, y, z]` arrays and rotations `[x, y, z, w]`.
#[wasm_bindgen]
pub struct TrackLayoutWasm {
    system: TrackSystem,
}

#[wasm_bindgen]
impl TrackLayoutWasm {
    /// Create an empty layout with the default board and snap settings.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            system: TrackSystem::default(),
        }
    }

    /// Create an empty layout from a config object. Missing fields take
    /// their defaults.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config: JsValue) -> Result<TrackLayoutWasm, JsError> {
        let config: TrackConfig = from_js(config)?;
        Ok(Self {
            system: TrackSystem::new(config),
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Register (or replace) a catalog entry.
    #[wasm_bindgen(js_name = registerCatalogEntry)]
    pub fn register_catalog_entry(&mut self, entry: JsValue) -> Result<(), JsError> {
        let entry: CatalogEntry = from_js(entry)?;
        self.system.register_catalog_entry(entry).map_err(reject)
    }

    // =========================================================================
    // Piece Operations
    // =========================================================================

    /// Place a piece exactly where requested.
    ///
    /// Returns the new piece ID.
    #[wasm_bindgen(js_name = placePiece)]
    pub fn place_piece(&mut self, catalog_id: &str, placement: JsValue) -> Result<u32, JsError> {
        let placement = placement_from_js(placement)?;
        self.system
            .place_piece(catalog_id, placement)
            .map(PieceId::raw)
            .map_err(reject)
    }

    /// Snap the system would apply to a piece dropped at `placement`, or
    /// `null` when nothing is in range.
    #[wasm_bindgen(js_name = previewSnap)]
    pub fn preview_snap(&self, catalog_id: &str, placement: JsValue) -> Result<JsValue, JsError> {
        let placement = placement_from_js(placement)?;
        let preview = self
            .system
            .preview_snap(catalog_id, placement)
            .map_err(reject)?;
        to_js(&preview)
    }

    /// Drop a piece, snapping it to the closest free connector when possible.
    ///
    /// Returns `{ pieceId, snapped }`.
    #[wasm_bindgen(js_name = placePieceSnapped)]
    pub fn place_piece_snapped(&mut self, catalog_id: &str, placement: JsValue) -> Result<JsValue, JsError> {
        let placement = placement_from_js(placement)?;
        let placed = self
            .system
            .place_piece_snapped(catalog_id, placement)
            .map_err(reject)?;
        to_js(&placed)
    }

    #[wasm_bindgen(js_name = movePiece)]
    pub fn move_piece(&mut self, piece_id: u32, placement: JsValue) -> Result<(), JsError> {
        let placement = placement_from_js(placement)?;
        self.system
            .move_piece(PieceId(piece_id), placement)
            .map_err(reject)
    }

    /// Move a piece, keeping its rotation.
    #[wasm_bindgen(js_name = setPosition)]
    pub fn set_position(&mut self, piece_id: u32, x: f32, y: f32, z: f32) -> Result<(), JsError> {
        self.system
            .set_position(PieceId(piece_id), Vec3::new(x, y, z))
            .map_err(reject)
    }

    #[wasm_bindgen(js_name = removePiece)]
    pub fn remove_piece(&mut self, piece_id: u32) -> Result<(), JsError> {
        self.system
            .remove_piece(PieceId(piece_id))
            .map(|_| ())
            .map_err(reject)
    }

    /// Flip a switch. Returns the new state (`"normal"` / `"diverging"`), or
    /// `null` for pieces that are not switches.
    #[wasm_bindgen(js_name = toggleSwitch)]
    pub fn toggle_switch(&mut self, piece_id: u32) -> Result<JsValue, JsError> {
        let state = self
            .system
            .toggle_switch(PieceId(piece_id))
            .map_err(reject)?;
        to_js(&state)
    }

    /// Edge ID of the piece's selected route, or `null`.
    #[wasm_bindgen(js_name = getActiveEdge)]
    pub fn get_active_edge(&self, piece_id: u32) -> Result<JsValue, JsError> {
        let edge = self
            .system
            .active_edge(PieceId(piece_id))
            .map_err(reject)?;
        to_js(&edge)
    }

    /// Serialized form of one piece, or `null`.
    #[wasm_bindgen(js_name = getPiece)]
    pub fn get_piece(&self, piece_id: u32) -> Result<JsValue, JsError> {
        to_js(&self.system.piece(PieceId(piece_id)).map(|p| p.snapshot()))
    }

    #[wasm_bindgen(js_name = pieceCount)]
    pub fn piece_count(&self) -> u32 {
        self.system.pieces().len() as u32
    }

    // =========================================================================
    // Snap Queries
    // =========================================================================

    /// Free connectors within snap distance of a point, closest first.
    #[wasm_bindgen(js_name = findNearbyConnectors)]
    pub fn find_nearby_connectors(
        &self,
        x: f32,
        y: f32,
        z: f32,
        exclude_piece_id: Option<u32>,
    ) -> Result<JsValue, JsError> {
        let hits: Vec<ConnectorHit> = self
            .system
            .find_nearby_connectors(Vec3::new(x, y, z), exclude_piece_id.map(PieceId))
            .iter()
            .map(ConnectorHit::from)
            .collect();
        to_js(&hits)
    }

    /// The closest free connector, or `null`.
    #[wasm_bindgen(js_name = getBestSnapCandidate)]
    pub fn get_best_snap_candidate(
        &self,
        x: f32,
        y: f32,
        z: f32,
        exclude_piece_id: Option<u32>,
    ) -> Result<JsValue, JsError> {
        let hit = self
            .system
            .best_snap_candidate(Vec3::new(x, y, z), exclude_piece_id.map(PieceId))
            .as_ref()
            .map(ConnectorHit::from);
        to_js(&hit)
    }

    #[wasm_bindgen(js_name = isPositionInBounds)]
    pub fn is_position_in_bounds(&self, x: f32, y: f32, z: f32) -> bool {
        self.system.is_position_in_bounds(Vec3::new(x, y, z))
    }

    // =========================================================================
    // Graph Operations
    // =========================================================================

    /// Returns `{ nodeCount, edgeCount, totalLengthM }`.
    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> Result<JsValue, JsError> {
        to_js(&self.system.stats())
    }

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.system.graph().node_count() as u32
    }

    #[wasm_bindgen(js_name = edgeCount)]
    pub fn edge_count(&self) -> u32 {
        self.system.graph().edge_count() as u32
    }

    /// Add an edge between two existing nodes.
    ///
    /// `curve` is `{ type: "straight" }` or
    /// `{ type: "arc", radiusM, angleDeg, direction }`. Returns the edge ID.
    #[wasm_bindgen(js_name = addEdge)]
    pub fn add_edge(
        &mut self,
        from_node_id: u32,
        to_node_id: u32,
        length_m: f32,
        curve: JsValue,
        piece_id: u32,
    ) -> Result<u32, JsError> {
        let curve: Curve = from_js(curve)?;
        self.system
            .add_edge(
                NodeId(from_node_id),
                NodeId(to_node_id),
                length_m,
                curve,
                PieceId(piece_id),
            )
            .map(EdgeId::raw)
            .map_err(reject)
    }

    #[wasm_bindgen(js_name = removeEdge)]
    pub fn remove_edge(&mut self, edge_id: u32) -> Result<(), JsError> {
        self.system.remove_edge(EdgeId(edge_id)).map_err(reject)
    }

    /// Remove a node. Fails while any edge still references it.
    #[wasm_bindgen(js_name = removeNode)]
    pub fn remove_node(&mut self, node_id: u32) -> Result<(), JsError> {
        self.system.remove_node(NodeId(node_id)).map_err(reject)
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Sample an edge for mesh generation.
    ///
    /// Returns a Float32Array of `[px, py, pz, tx, ty, tz, dist, ...]`, one
    /// group of seven per sample. Without `segments` the density follows the
    /// configured segments per meter.
    #[wasm_bindgen(js_name = sampleEdge)]
    pub fn sample_edge(&self, edge_id: u32, segments: Option<u32>) -> Result<Float32Array, JsError> {
        let samples = self
            .system
            .sample_edge(EdgeId(edge_id), segments.map(|n| n as usize))
            .map_err(reject)?;
        Ok(Float32Array::from(&flatten_samples(&samples)[..]))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Serialize the whole layout as `{ graph, pieces }`.
    #[wasm_bindgen(js_name = toJSON)]
    pub fn to_json(&self) -> Result<JsValue, JsError> {
        to_js(&self.system.snapshot())
    }

    /// Replace the layout with a previously serialized one. Catalog entries
    /// the layout refers to must already be registered.
    #[wasm_bindgen(js_name = fromJSON)]
    pub fn from_json(&mut self, value: JsValue) -> Result<(), JsError> {
        let snapshot: LayoutSnapshot = from_js(value)?;
        self.system.restore(&snapshot).map_err(reject)
    }

    /// Remove every piece. Registered catalog entries are kept.
    pub fn clear(&mut self) {
        self.system.clear();
    }
}

impl Default for TrackLayoutWasm {
    fn default() -> Self {
        Self::new()
    }
}

/// JS view of a snap candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectorHit {
    piece_id: PieceId,
    connector_index: usize,
    role: ConnectorRole,
    position: Option<Vec3>,
    forward: Option<Vec3>,
    distance_m: f32,
}

impl From<&SnapCandidate<'_>> for ConnectorHit {
    fn from(candidate: &SnapCandidate<'_>) -> Self {
        Self {
            piece_id: candidate.piece.id(),
            connector_index: candidate.connector.id.index,
            role: candidate.connector.role,
            position: candidate.connector.world_position(),
            forward: candidate.connector.world_forward(),
            distance_m: candidate.distance_m,
        }
    }
}

/// Interleave samples into `[px, py, pz, tx, ty, tz, dist, ...]`.
fn flatten_samples(samples: &[PathSample]) -> Vec<f32> {
    let mut buffer = Vec::with_capacity(samples.len() * SAMPLE_STRIDE);
    for sample in samples {
        buffer.extend_from_slice(&sample.position.to_array());
        buffer.extend_from_slice(&sample.tangent.to_array());
        buffer.push(sample.cumulative_distance);
    }
    buffer
}

fn placement_from_js(value: JsValue) -> Result<Placement, JsError> {
    let raw: Placement = from_js(value)?;
    Ok(Placement::new(raw.position, raw.rotation))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsError> {
    serde_wasm_bindgen::from_value(value).map_err(|err| {
        web_sys::console::warn_1(&JsValue::from_str(&err.to_string()));
        JsError::from(err)
    })
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

/// Report a rejected call to the browser console and hand it back to JS.
fn reject(err: TrackError) -> JsError {
    let message = err.to_string();
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsError::new(&message)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::geometry::ArcDirection;

    fn layout() -> TrackSystem {
        let mut system = TrackSystem::default();
        system
            .register_catalog_entry(CatalogEntry::straight("G1", 0.168))
            .unwrap();
        system
            .register_catalog_entry(CatalogEntry::curve("R1", 0.358, 30.0, ArcDirection::Cw))
            .unwrap();
        system
    }

    /// Test the pipeline behind sampleEdge: placement -> graph edge -> flat
    /// sample buffer, without wasm_bindgen JS types.
    #[test]
    fn test_sample_buffer_layout() {
        let mut system = layout();
        let id = system.place_piece("R1", Placement::default()).unwrap();
        let edge = system.piece(id).unwrap().generated_edge_ids()[0];

        let samples = system.sample_edge(edge, Some(10)).unwrap();
        let buffer = flatten_samples(&samples);
        assert_eq!(buffer.len(), 11 * SAMPLE_STRIDE);

        // First sample sits on the origin heading +X.
        assert!(Vec3::from_slice(&buffer[0..3]).length() < 1e-4);
        assert!((buffer[3] - 1.0).abs() < 1e-4);
        assert_eq!(buffer[6], 0.0);

        // Clockwise curves bend toward -Z.
        let last = &buffer[10 * SAMPLE_STRIDE..];
        assert!(last[2] < 0.0);
        let expected_len = 0.358 * 30f32.to_radians();
        assert!((last[6] - expected_len).abs() < 1e-3);
    }

    #[test]
    fn test_connector_hit_from_candidate() {
        let mut system = layout();
        let id = system.place_piece("G1", Placement::default()).unwrap();

        let candidate = system
            .best_snap_candidate(Vec3::new(0.17, 0.0, 0.0), None)
            .unwrap();
        let hit = ConnectorHit::from(&candidate);
        assert_eq!(hit.piece_id, id);
        assert_eq!(hit.connector_index, 1);
        assert_eq!(hit.role, ConnectorRole::B);
        assert_eq!(hit.forward, Some(Vec3::X));
        assert!((hit.distance_m - 0.002).abs() < 1e-4);

        let json = serde_json::to_value(hit).unwrap();
        assert_eq!(json["role"], "B");
        assert_eq!(json["pieceId"], 0);
    }

    /// Layout JSON produced by one session loads into a fresh one.
    #[test]
    fn test_layout_json_reload() {
        let mut system = layout();
        system.place_piece("G1", Placement::default()).unwrap();
        system
            .place_piece_snapped("R1", Placement::at(Vec3::new(0.18, 0.0, 0.01)))
            .unwrap();

        let json = serde_json::to_value(system.snapshot()).unwrap();
        assert_eq!(json["graph"]["edges"][1]["curve"]["type"], "arc");
        assert_eq!(json["pieces"][1]["catalogId"], "R1");

        let snapshot: LayoutSnapshot = serde_json::from_value(json).unwrap();
        let mut reloaded = layout();
        reloaded.restore(&snapshot).unwrap();
        assert_eq!(reloaded.stats(), system.stats());
        assert_eq!(reloaded.stats().node_count, 3);
    }
}
