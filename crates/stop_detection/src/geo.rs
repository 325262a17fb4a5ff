use crate::types::GeoPoint;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters.
#[must_use]
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
	let lat_a = a.latitude.to_radians();
	let lat_b = b.latitude.to_radians();
	let delta_lat = (b.latitude - a.latitude).to_radians();
	let delta_lon = (b.longitude - a.longitude).to_radians();

	let h = (delta_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
	let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

	EARTH_RADIUS_METERS * c
}

/// Summed great-circle length of a polyline.
#[must_use]
pub fn path_length(points: &[GeoPoint]) -> f64 {
	points.windows(2).map(|pair| haversine_distance(pair[0], pair[1])).sum()
}

/// Arithmetic mean of a growing set of coordinates, updated in O(1).
#[derive(Debug, Clone, Copy)]
pub struct RunningCentroid {
	count: usize,
	mean: GeoPoint,
}

impl RunningCentroid {
	#[must_use]
	pub const fn seed(point: GeoPoint) -> Self {
		Self { count: 1, mean: point }
	}

	pub fn push(&mut self, point: GeoPoint) {
		self.count += 1;
		let n = self.count as f64;
		self.mean.latitude += (point.latitude - self.mean.latitude) / n;
		self.mean.longitude += (point.longitude - self.mean.longitude) / n;
	}

	#[must_use]
	pub const fn point(&self) -> GeoPoint {
		self.mean
	}

	#[must_use]
	pub const fn count(&self) -> usize {
		self.count
	}
}
