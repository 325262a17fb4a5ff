use anyhow::Context;
use serde::Serialize;
use stop_detection::{GeoPoint, StopInterval, Timeline};

use super::csv::timestamp;
use crate::config::ReportConfig;

const DATA_PLACEHOLDER: &str = "__MAP_DATA__";

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Location Timeline</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const data = __MAP_DATA__;
const map = L.map("map").setView(data.center, data.zoom);
L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
	maxZoom: 19,
	attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);

for (const path of data.transits) {
	L.polyline(path, { color: "#3388ff", weight: 3, opacity: 0.6 }).addTo(map);
}

data.stops.forEach((stop, i) => {
	const popup = "<b>Stop #" + (i + 1) + "</b><br>"
		+ "Arrival: " + stop.arrival + "<br>"
		+ "Departure: " + stop.departure + "<br>"
		+ "Duration: " + stop.duration_minutes + " minutes<br>"
		+ "Location points: " + stop.sample_count;
	L.circleMarker([stop.latitude, stop.longitude], {
		radius: 9, color: stop.color, fillColor: stop.color, fillOpacity: 0.8
	})
		.bindPopup(popup, { maxWidth: 300 })
		.bindTooltip("Stop #" + (i + 1) + " (" + stop.duration_minutes + " min)")
		.addTo(map);
});

if (data.heat.length > 0) {
	L.heatLayer(data.heat, { radius: 15, blur: 10 }).addTo(map);
}
</script>
</body>
</html>
"##;

#[derive(Debug, Serialize)]
struct MapData {
	center: [f64; 2],
	zoom: u8,
	stops: Vec<StopMarker>,
	heat: Vec<[f64; 3]>,
	transits: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Serialize)]
struct StopMarker {
	latitude: f64,
	longitude: f64,
	arrival: String,
	departure: String,
	duration_minutes: i64,
	sample_count: usize,
	color: &'static str,
}

impl From<&StopInterval> for StopMarker {
	fn from(stop: &StopInterval) -> Self {
		let duration_minutes = stop.duration().num_minutes();
		Self {
			latitude: stop.centroid.latitude,
			longitude: stop.centroid.longitude,
			arrival: timestamp(stop.start),
			departure: timestamp(stop.end),
			duration_minutes,
			sample_count: stop.sample_count,
			color: dwell_color(duration_minutes),
		}
	}
}

const fn dwell_color(minutes: i64) -> &'static str {
	if minutes < 30 {
		"green"
	} else if minutes < 120 {
		"orange"
	} else {
		"red"
	}
}

/// Stops first, then transit points, then the configured default.
fn center(timeline: &Timeline, report: &ReportConfig) -> GeoPoint {
	let stops: Vec<GeoPoint> = timeline.stops().map(|s| s.centroid).collect();
	let points = if stops.is_empty() {
		timeline.transits().flat_map(|t| t.path.iter().copied()).collect()
	} else {
		stops
	};

	if points.is_empty() {
		return report.default_center();
	}

	let n = points.len() as f64;
	let (lat, lon) = points.iter().fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
	GeoPoint::new(lat / n, lon / n)
}

fn lat_lon(point: &GeoPoint) -> [f64; 2] {
	[point.latitude, point.longitude]
}

pub(super) fn render(timeline: &Timeline, report: &ReportConfig) -> anyhow::Result<String> {
	let stops: Vec<StopMarker> = timeline.stops().map(StopMarker::from).collect();
	let heat = stops.iter().map(|s| [s.latitude, s.longitude, s.duration_minutes as f64]).collect();

	let data = MapData {
		center: lat_lon(&center(timeline, report)),
		zoom: report.zoom,
		stops,
		heat,
		transits: timeline.transits().map(|t| t.path.iter().map(lat_lon).collect()).collect(),
	};

	// Keeps a "</script>" inside string data from closing the script block
	let json = serde_json::to_string(&data).context("Failed to serialize map data")?.replace("</", "<\\/");

	Ok(TEMPLATE.replacen(DATA_PLACEHOLDER, &json, 1))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{DateTime, Duration};
	use stop_detection::{LocationSample, StopDetectionConfig, assemble, detect};

	fn embedded_data(html: &str) -> serde_json::Value {
		let start = html.find("const data = ").unwrap() + "const data = ".len();
		let end = start + html[start..].find(";\n").unwrap();
		serde_json::from_str(&html[start..end]).unwrap()
	}

	#[test]
	fn test_dwell_colors() {
		assert_eq!(dwell_color(5), "green");
		assert_eq!(dwell_color(29), "green");
		assert_eq!(dwell_color(30), "orange");
		assert_eq!(dwell_color(119), "orange");
		assert_eq!(dwell_color(120), "red");
	}

	#[test]
	fn test_template_is_complete() {
		let html = render(&Timeline::default(), &ReportConfig::default()).unwrap();

		assert!(html.starts_with("<!DOCTYPE html>"));
		assert!(html.contains(r##"color: "#3388ff""##));
		assert!(html.trim_end().ends_with("</html>"));
	}

	#[test]
	fn test_empty_timeline_uses_default_center() {
		let report = ReportConfig { default_center: [51.5074, -0.1278], zoom: 10 };
		let html = render(&Timeline::default(), &report).unwrap();
		let data = embedded_data(&html);

		assert_eq!(data["center"], serde_json::json!([51.5074, -0.1278]));
		assert_eq!(data["zoom"], 10);
		assert_eq!(data["stops"].as_array().unwrap().len(), 0);
		assert!(!html.contains(DATA_PLACEHOLDER));
	}

	#[test]
	fn test_stop_markers_and_transit_paths() {
		let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
		let mut samples: Vec<_> =
			(0..=12).map(|i| LocationSample::new(base + Duration::minutes(i * 10), 10.0, 20.0)).collect();
		samples.push(LocationSample::new(base + Duration::minutes(130), 10.01, 20.0));

		let stops = detect(&samples, &StopDetectionConfig::default());
		let html = render(&assemble(&samples, &stops), &ReportConfig::default()).unwrap();
		let data = embedded_data(&html);

		let markers = data["stops"].as_array().unwrap();
		assert_eq!(markers.len(), 1);
		assert_eq!(markers[0]["color"], "red");
		assert_eq!(markers[0]["duration_minutes"], 120);
		assert_eq!(markers[0]["sample_count"], 13);
		assert_eq!(markers[0]["arrival"], "2023-11-14T22:13:20Z");
		assert_eq!(data["center"], serde_json::json!([10.0, 20.0]));

		let transits = data["transits"].as_array().unwrap();
		assert_eq!(transits.len(), 1);
		assert_eq!(transits[0].as_array().unwrap().len(), 2);
		assert_eq!(data["heat"][0][2], 120.0);
	}

	#[test]
	fn test_center_falls_back_to_transit_points() {
		let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
		let samples = vec![LocationSample::new(base, 1.0, 2.0), LocationSample::new(base + Duration::minutes(5), 3.0, 4.0)];
		let timeline = assemble(&samples, &[]);

		assert_eq!(center(&timeline, &ReportConfig::default()), GeoPoint::new(2.0, 3.0));
	}
}
