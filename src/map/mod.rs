//! Map view state: markers, route polylines, and the rendering boundary.
//!
//! `MapController` is the only thing that mutates a `MapSurface`. The
//! browser renders whatever `SceneRecorder` captured.

pub mod controller;
pub mod scene;

pub use controller::MapController;
pub use scene::{MapScene, MarkerLayer, PolylineLayer, SceneRecorder};

use serde::Serialize;

use crate::models::{Bounds, LatLon};

/// Zoom used when centering on a placed marker.
pub const MARKER_ZOOM: u8 = 13;
/// Zoom used while following the vehicle.
pub const TRACKING_ZOOM: u8 = 14;

/// Handle to a layer on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Pickup,
    Destination,
    Waypoint,
    Vehicle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineStyle {
    pub color: &'static str,
    pub weight: u8,
}

impl PolylineStyle {
    /// Best route.
    pub const PRIMARY: PolylineStyle = PolylineStyle {
        color: "blue",
        weight: 5,
    };
    /// Any other candidate.
    pub const ALTERNATE: PolylineStyle = PolylineStyle {
        color: "gray",
        weight: 3,
    };
}

/// Something that can draw map layers.
pub trait MapSurface: Send {
    fn set_view(&mut self, center: LatLon, zoom: u8);

    fn add_marker(&mut self, kind: MarkerKind, at: LatLon, popup: Option<String>) -> LayerId;

    /// Move an existing marker. Returns false if the layer is gone.
    fn move_marker(&mut self, id: LayerId, at: LatLon, popup: Option<String>) -> bool;

    fn add_polyline(
        &mut self,
        points: Vec<LatLon>,
        style: PolylineStyle,
        popup: Option<String>,
    ) -> LayerId;

    fn remove_layer(&mut self, id: LayerId) -> bool;

    fn fit_bounds(&mut self, bounds: Bounds);
}
