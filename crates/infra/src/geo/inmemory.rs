use super::IGeoIndex;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use vicinity_domain::{GeoPoint, UserLocation, EARTH_RADIUS_METERS, ID};

/// Grid cell edge in degrees. 0.25° of latitude is roughly 28 km, so the
/// radii this service works with touch only a handful of cells.
const CELL_SIZE_DEG: f64 = 0.25;
const LAT_CELLS: i32 = 720; // 180° / CELL_SIZE_DEG
const LNG_CELLS: i32 = 1440; // 360° / CELL_SIZE_DEG
/// Meters per degree of latitude on the sphere `GeoPoint::distance_meters`
/// measures on.
const METERS_PER_LAT_DEG: f64 = std::f64::consts::PI * EARTH_RADIUS_METERS / 180.0;

type Cell = (i32, i32);

#[derive(Default)]
struct GridState {
    cells: HashMap<Cell, HashSet<ID>>,
    positions: HashMap<ID, UserLocation>,
}

/// An in-process geo index over a fixed lat/lng grid. A query scans every
/// cell the circle can touch and verifies the candidates with the exact
/// great-circle distance, so it returns the same users the postgres index
/// would.
pub struct InMemoryGeoIndex {
    state: RwLock<GridState>,
}

impl InMemoryGeoIndex {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GridState::default()),
        }
    }
}

fn cell_for(point: &GeoPoint) -> Cell {
    let lat_cell = (((point.lat() + 90.0) / CELL_SIZE_DEG) as i32).min(LAT_CELLS - 1);
    let lng_cell = (((point.lng() + 180.0) / CELL_SIZE_DEG) as i32).min(LNG_CELLS - 1);
    (lat_cell, lng_cell)
}

#[async_trait::async_trait]
impl IGeoIndex for InMemoryGeoIndex {
    async fn upsert(&self, location: UserLocation) -> anyhow::Result<()> {
        let mut state = self.state.write().unwrap();
        let cell = cell_for(&location.point);
        let previous_cell = state
            .positions
            .get(&location.user_id)
            .map(|previous| cell_for(&previous.point));
        if let Some(previous_cell) = previous_cell {
            if previous_cell != cell {
                let emptied = match state.cells.get_mut(&previous_cell) {
                    Some(members) => {
                        members.remove(&location.user_id);
                        members.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.cells.remove(&previous_cell);
                }
            }
        }
        state
            .cells
            .entry(cell)
            .or_default()
            .insert(location.user_id.clone());
        state.positions.insert(location.user_id.clone(), location);
        Ok(())
    }

    async fn remove(&self, user_id: &ID) -> anyhow::Result<()> {
        let mut state = self.state.write().unwrap();
        if let Some(previous) = state.positions.remove(user_id) {
            let cell = cell_for(&previous.point);
            let emptied = match state.cells.get_mut(&cell) {
                Some(members) => {
                    members.remove(user_id);
                    members.is_empty()
                }
                None => false,
            };
            if emptied {
                state.cells.remove(&cell);
            }
        }
        Ok(())
    }

    async fn find(&self, user_id: &ID) -> anyhow::Result<Option<UserLocation>> {
        let state = self.state.read().unwrap();
        Ok(state.positions.get(user_id).cloned())
    }

    async fn query(&self, center: &GeoPoint, radius_meters: f64) -> anyhow::Result<Vec<ID>> {
        let state = self.state.read().unwrap();

        let (center_lat_cell, center_lng_cell) = cell_for(center);
        // A point within the radius differs by at most radius / R in
        // latitude.
        let lat_span_deg = radius_meters / METERS_PER_LAT_DEG;
        let lat_cell_span = ((lat_span_deg / CELL_SIZE_DEG).ceil() as i32).min(LAT_CELLS);
        let half_angle_rad =
            (radius_meters / (2.0 * EARTH_RADIUS_METERS)).min(std::f64::consts::FRAC_PI_2);
        let sin_half_radius = half_angle_rad.sin();
        let cos_center_lat = center.lat().to_radians().cos();

        let mut matches = Vec::new();
        for lat_cell in (center_lat_cell - lat_cell_span)..=(center_lat_cell + lat_cell_span) {
            if lat_cell < 0 || lat_cell >= LAT_CELLS {
                continue;
            }
            let row_low = lat_cell as f64 * CELL_SIZE_DEG - 90.0;
            let row_high = row_low + CELL_SIZE_DEG;
            let row_min_cos = row_low.abs().max(row_high.abs()).to_radians().cos();

            // For a point p in this row within the radius, the haversine
            // formula gives sin(|Δlng| / 2) <= sin(radius / 2R) /
            // sqrt(cos(lat_center) * cos(lat_p)), which bounds how many
            // cells to scan to each side. Rows where the bound reaches 1
            // (near a pole, or a circle wrapping one) are scanned whole.
            let denom = (cos_center_lat * row_min_cos).sqrt();
            let lng_cells: Vec<i32> = if sin_half_radius >= denom {
                (0..LNG_CELLS).collect()
            } else {
                let max_offset_deg = 2.0 * (sin_half_radius / denom).asin().to_degrees();
                let lng_cell_span = (max_offset_deg / CELL_SIZE_DEG).ceil() as i32;
                if 2 * lng_cell_span + 1 >= LNG_CELLS {
                    (0..LNG_CELLS).collect()
                } else {
                    ((center_lng_cell - lng_cell_span)..=(center_lng_cell + lng_cell_span))
                        .map(|c| c.rem_euclid(LNG_CELLS))
                        .collect()
                }
            };

            for lng_cell in lng_cells {
                if let Some(members) = state.cells.get(&(lat_cell, lng_cell)) {
                    for user_id in members {
                        if let Some(location) = state.positions.get(user_id) {
                            if location.point.distance_meters(center) <= radius_meters {
                                matches.push(user_id.clone());
                            }
                        }
                    }
                }
            }
        }

        Ok(matches)
    }
}
