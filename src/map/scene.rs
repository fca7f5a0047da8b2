// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! A `MapSurface` that records layers into a serializable scene.

use serde::Serialize;

use super::{LayerId, MapSurface, MarkerKind, PolylineStyle};
use crate::models::{Bounds, LatLon};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerLayer {
    pub id: LayerId,
    pub kind: MarkerKind,
    pub position: LatLon,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineLayer {
    pub id: LayerId,
    pub points: Vec<LatLon>,
    pub style: PolylineStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

/// Everything the browser widget needs to draw the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapScene {
    pub center: Option<LatLon>,
    pub zoom: Option<u8>,
    /// Set by the last `fit_bounds`; cleared by `set_view`
    pub fitted: Option<Bounds>,
    pub markers: Vec<MarkerLayer>,
    pub polylines: Vec<PolylineLayer>,
}

#[derive(Debug, Default)]
pub struct SceneRecorder {
    scene: MapScene,
    next_id: u64,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> &MapScene {
        &self.scene
    }

    fn allocate(&mut self) -> LayerId {
        self.next_id += 1;
        LayerId(self.next_id)
    }
}

impl MapSurface for SceneRecorder {
    fn set_view(&mut self, center: LatLon, zoom: u8) {
        self.scene.center = Some(center);
        self.scene.zoom = Some(zoom);
        self.scene.fitted = None;
    }

    fn add_marker(&mut self, kind: MarkerKind, at: LatLon, popup: Option<String>) -> LayerId {
        let id = self.allocate();
        self.scene.markers.push(MarkerLayer {
            id,
            kind,
            position: at,
            popup,
        });
        id
    }

    fn move_marker(&mut self, id: LayerId, at: LatLon, popup: Option<String>) -> bool {
        match self.scene.markers.iter_mut().find(|m| m.id == id) {
            Some(marker) => {
                marker.position = at;
                if popup.is_some() {
                    marker.popup = popup;
                }
                true
            }
            None => false,
        }
    }

    fn add_polyline(
        &mut self,
        points: Vec<LatLon>,
        style: PolylineStyle,
        popup: Option<String>,
    ) -> LayerId {
        let id = self.allocate();
        self.scene.polylines.push(PolylineLayer {
            id,
            points,
            style,
            popup,
        });
        id
    }

    fn remove_layer(&mut self, id: LayerId) -> bool {
        let before = self.scene.markers.len() + self.scene.polylines.len();
        self.scene.markers.retain(|m| m.id != id);
        self.scene.polylines.retain(|p| p.id != id);
        before != self.scene.markers.len() + self.scene.polylines.len()
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.scene.fitted = Some(bounds);
    }
}
