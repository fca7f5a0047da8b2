// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Marker and route bookkeeping over a `MapSurface`.

use super::{LayerId, MapSurface, MarkerKind, PolylineStyle, MARKER_ZOOM, TRACKING_ZOOM};
use crate::models::{LatLon, RouteCandidate};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Placed {
    id: LayerId,
    at: LatLon,
}

/// Owns the surface and the handles of everything drawn on it.
///
/// Holds at most one pickup, one destination and one vehicle marker, any
/// number of waypoints, and the polylines of the last rendered route set.
#[derive(Debug)]
pub struct MapController<S> {
    surface: S,
    pickup: Option<Placed>,
    destination: Option<Placed>,
    waypoints: Vec<Placed>,
    vehicle: Option<Placed>,
    routes: Vec<LayerId>,
}

impl<S: MapSurface> MapController<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            pickup: None,
            destination: None,
            waypoints: Vec::new(),
            vehicle: None,
            routes: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn pickup(&self) -> Option<LatLon> {
        self.pickup.map(|p| p.at)
    }

    pub fn destination(&self) -> Option<LatLon> {
        self.destination.map(|p| p.at)
    }

    pub fn waypoints(&self) -> Vec<LatLon> {
        self.waypoints.iter().map(|p| p.at).collect()
    }

    pub fn vehicle(&self) -> Option<LatLon> {
        self.vehicle.map(|p| p.at)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Center on the device position and drop the pickup marker there.
    pub fn init(&mut self, at: LatLon) {
        self.surface.set_view(at, MARKER_ZOOM);
        self.place(MarkerKind::Pickup, at, "Your Current Location");
    }

    pub fn set_pickup(&mut self, at: LatLon) {
        self.place(MarkerKind::Pickup, at, "Your Updated Location");
        self.surface.set_view(at, MARKER_ZOOM);
    }

    pub fn set_destination(&mut self, at: LatLon) {
        self.place(MarkerKind::Destination, at, "Destination");
        self.surface.set_view(at, MARKER_ZOOM);
    }

    pub fn add_waypoint(&mut self, at: LatLon) {
        let id = self
            .surface
            .add_marker(MarkerKind::Waypoint, at, Some("Waypoint".to_string()));
        self.waypoints.push(Placed { id, at });
        self.surface.set_view(at, MARKER_ZOOM);
    }

    pub fn clear_waypoints(&mut self) {
        for wp in self.waypoints.drain(..) {
            self.surface.remove_layer(wp.id);
        }
    }

    /// `pickup, waypoints…, destination`, or `None` unless both ends are set.
    pub fn route_stops(&self) -> Option<Vec<LatLon>> {
        let (pickup, destination) = (self.pickup?, self.destination?);
        let mut stops = Vec::with_capacity(self.waypoints.len() + 2);
        stops.push(pickup.at);
        stops.extend(self.waypoints.iter().map(|w| w.at));
        stops.push(destination.at);
        Some(stops)
    }

    /// Remove every route polyline.
    pub fn clear_routes(&mut self) {
        for id in self.routes.drain(..) {
            self.surface.remove_layer(id);
        }
    }

    /// Replace all route polylines with `candidates`; the first is primary.
    pub fn render_routes(&mut self, candidates: &[RouteCandidate]) {
        self.clear_routes();

        for (index, candidate) in candidates.iter().enumerate() {
            let style = if index == 0 {
                PolylineStyle::PRIMARY
            } else {
                PolylineStyle::ALTERNATE
            };
            let id = self.surface.add_polyline(
                candidate.points(),
                style,
                Some(candidate.summary(index)),
            );
            self.routes.push(id);
        }

        if let Some(bounds) = candidates.first().and_then(RouteCandidate::bounds) {
            self.surface.fit_bounds(bounds);
        }
    }

    /// Put the vehicle on the pickup marker at the start of a trip.
    /// Returns false if there is no pickup yet.
    pub fn start_vehicle(&mut self) -> bool {
        let Some(pickup) = self.pickup else {
            return false;
        };
        if let Some(old) = self.vehicle.take() {
            self.surface.remove_layer(old.id);
        }
        let id = self.surface.add_marker(MarkerKind::Vehicle, pickup.at, None);
        self.vehicle = Some(Placed { id, at: pickup.at });
        self.surface.set_view(pickup.at, TRACKING_ZOOM);
        true
    }

    /// Create or move the vehicle marker and follow it.
    pub fn move_vehicle(&mut self, at: LatLon) {
        match self.vehicle {
            Some(ref mut v) if self.surface.move_marker(v.id, at, None) => v.at = at,
            _ => {
                let id = self.surface.add_marker(MarkerKind::Vehicle, at, None);
                self.vehicle = Some(Placed { id, at });
            }
        }
        self.surface.set_view(at, TRACKING_ZOOM);
    }

    fn place(&mut self, kind: MarkerKind, at: LatLon, popup: &str) {
        let slot = match kind {
            MarkerKind::Pickup => &mut self.pickup,
            MarkerKind::Destination => &mut self.destination,
            MarkerKind::Vehicle => &mut self.vehicle,
            MarkerKind::Waypoint => return self.add_waypoint(at),
        };

        match slot {
            Some(existing) if self.surface.move_marker(existing.id, at, Some(popup.to_string())) => {
                existing.at = at;
            }
            _ => {
                let id = self.surface.add_marker(kind, at, Some(popup.to_string()));
                *slot = Some(Placed { id, at });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::SceneRecorder;
    use geo::LineString;

    fn candidate(coords: Vec<(f64, f64)>, meters: f64) -> RouteCandidate {
        RouteCandidate {
            geometry: LineString::from(coords),
            distance_meters: meters,
            duration_seconds: 600.0,
        }
    }

    fn controller() -> MapController<SceneRecorder> {
        let mut map = MapController::new(SceneRecorder::new());
        map.init(LatLon::new(0.0, 0.0));
        map.set_destination(LatLon::new(1.0, 1.0));
        map
    }

    #[test]
    fn test_render_replaces_previous_routes() {
        let mut map = controller();
        let first = vec![
            candidate(vec![(0.0, 0.0), (1.0, 1.0)], 1000.0),
            candidate(vec![(0.0, 0.0), (0.5, 0.2), (1.0, 1.0)], 1200.0),
        ];
        map.render_routes(&first);
        let old_ids: Vec<_> = map.surface().scene().polylines.iter().map(|p| p.id).collect();

        map.render_routes(&first);
        let scene = map.surface().scene();
        assert_eq!(scene.polylines.len(), 2);
        assert!(scene.polylines.iter().all(|p| !old_ids.contains(&p.id)));

        assert_eq!(scene.polylines[0].style, PolylineStyle::PRIMARY);
        assert_eq!(scene.polylines[1].style, PolylineStyle::ALTERNATE);
        assert_eq!(
            scene.polylines[0].popup.as_deref(),
            Some("Route 1: 1.00 km, 10 mins")
        );

        let fitted = scene.fitted.unwrap();
        assert_eq!(fitted.south_west, LatLon::new(0.0, 0.0));
        assert_eq!(fitted.north_east, LatLon::new(1.0, 1.0));
    }

    #[test]
    fn test_empty_render_clears_routes() {
        let mut map = controller();
        map.render_routes(&[candidate(vec![(0.0, 0.0), (1.0, 1.0)], 1000.0)]);
        map.render_routes(&[]);
        assert!(map.surface().scene().polylines.is_empty());
        assert_eq!(map.route_count(), 0);
    }

    #[test]
    fn test_single_pickup_and_destination_marker() {
        let mut map = controller();
        map.set_pickup(LatLon::new(2.0, 2.0));
        map.set_destination(LatLon::new(3.0, 3.0));

        let markers = &map.surface().scene().markers;
        assert_eq!(markers.len(), 2);
        assert_eq!(map.pickup(), Some(LatLon::new(2.0, 2.0)));
        assert_eq!(map.surface().scene().zoom, Some(MARKER_ZOOM));
    }

    #[test]
    fn test_route_stops_order() {
        let mut map = MapController::new(SceneRecorder::new());
        map.set_pickup(LatLon::new(0.0, 0.0));
        map.add_waypoint(LatLon::new(0.5, 0.5));
        assert!(map.route_stops().is_none());

        map.set_destination(LatLon::new(1.0, 1.0));
        assert_eq!(
            map.route_stops().unwrap(),
            vec![
                LatLon::new(0.0, 0.0),
                LatLon::new(0.5, 0.5),
                LatLon::new(1.0, 1.0)
            ]
        );

        map.clear_waypoints();
        assert_eq!(map.route_stops().unwrap().len(), 2);
        assert_eq!(map.surface().scene().markers.len(), 2);
    }

    #[test]
    fn test_vehicle_follows_positions() {
        let mut map = MapController::new(SceneRecorder::new());
        assert!(!map.start_vehicle());

        map.init(LatLon::new(0.0, 0.0));
        assert!(map.start_vehicle());
        map.move_vehicle(LatLon::new(0.1, 0.1));
        map.move_vehicle(LatLon::new(0.2, 0.2));

        let scene = map.surface().scene();
        let vehicles: Vec<_> = scene
            .markers
            .iter()
            .filter(|m| m.kind == MarkerKind::Vehicle)
            .collect();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].position, LatLon::new(0.2, 0.2));
        assert_eq!(scene.zoom, Some(TRACKING_ZOOM));
    }
}
