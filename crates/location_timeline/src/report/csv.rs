use chrono::{DateTime, SecondsFormat, Utc};
use stop_detection::{Timeline, TimelineEntry};

pub(super) const HEADER: &str = "start_time,end_time,kind,duration_minutes,latitude,longitude,radius_or_distance_m,sample_count_or_speed_mps";

/// One row per timeline entry, in timeline order.
pub fn render(timeline: &Timeline) -> String {
	let mut out = String::with_capacity(HEADER.len() + 1 + timeline.len() * 96);
	out.push_str(HEADER);
	out.push('\n');

	for entry in timeline.entries() {
		let (point, extent, measure) = match entry {
			TimelineEntry::Stop(stop) => {
				(stop.centroid, format!("{:.1}", stop.radius_meters), stop.sample_count.to_string())
			},
			TimelineEntry::Transit(transit) => (
				transit.start_point,
				format!("{:.1}", transit.distance_meters),
				format!("{:.2}", transit.avg_speed_mps),
			),
		};

		out.push_str(&format!(
			"{},{},{},{},{:.6},{:.6},{extent},{measure}\n",
			timestamp(entry.start()),
			timestamp(entry.end()),
			entry.kind(),
			entry.duration().num_minutes(),
			point.latitude,
			point.longitude,
		));
	}

	out
}

pub(super) fn timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use stop_detection::{LocationSample, StopDetectionConfig, assemble, detect};

	fn base() -> DateTime<Utc> {
		DateTime::from_timestamp(1_700_000_000, 0).unwrap()
	}

	#[test]
	fn test_empty_timeline_is_header_only() {
		assert_eq!(render(&Timeline::default()), format!("{HEADER}\n"));
	}

	#[test]
	fn test_stop_and_transit_rows() {
		let mut samples: Vec<_> =
			(0..5).map(|i| LocationSample::new(base() + Duration::seconds(i * 150), 48.8566, 2.3522)).collect();
		samples.push(LocationSample::new(base() + Duration::seconds(1200), 48.8606, 2.3376));

		let stops = detect(&samples, &StopDetectionConfig::default());
		let csv = render(&assemble(&samples, &stops));
		let rows: Vec<_> = csv.lines().skip(1).collect();

		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0], "2023-11-14T22:13:20Z,2023-11-14T22:23:20Z,stop,10,48.856600,2.352200,0.0,5");

		let transit: Vec<_> = rows[1].split(',').collect();
		assert_eq!(transit[0], "2023-11-14T22:23:20Z");
		assert_eq!(transit[1], "2023-11-14T22:33:20Z");
		assert_eq!(transit[2], "transit");
		assert_eq!(transit[3], "10");
		assert_eq!(transit[4], "48.856600");
		assert_eq!(transit[7].split('.').nth(1).map(str::len), Some(2));
	}
}
