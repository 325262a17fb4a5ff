use chrono::{DateTime, Utc};
use tracing::debug;

use crate::geo::path_length;
use crate::samples::chronological;
use crate::types::{GeoPoint, LocationSample, StopInterval, Timeline, TimelineEntry, TransitSegment, seconds_between};

/// Interleaves stops with the transit segments between them.
///
/// The result covers `[first sample, last sample]` without gaps or overlaps. Each stop owns
/// its `sample_count` member samples; every other sample is carried by the transit segment
/// of its span. An edge span (before the first stop or after the last one) of zero length
/// produces no transit unless it carries samples; spans between two stops always do.
#[must_use]
pub fn assemble(samples: &[LocationSample], stops: &[StopInterval]) -> Timeline {
	let samples = chronological(samples);
	let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
		return Timeline::default();
	};

	let mut stops: Vec<&StopInterval> = stops.iter().collect();
	stops.sort_by_key(|stop| stop.start);

	let mut entries = Vec::with_capacity(stops.len() * 2 + 1);
	let mut cursor = 0;
	let mut span_start = first.timestamp;
	let mut previous: Option<&StopInterval> = None;

	for stop in stops {
		let members = member_run_start(&samples, cursor, stop);
		let unclaimed = &samples[cursor..members];

		if previous.is_some() || stop.start > span_start || !unclaimed.is_empty() {
			let leg = Leg { start: span_start, end: stop.start, from: previous.map(|p| p.centroid), to: Some(stop.centroid) };
			entries.extend(leg.into_transit(unclaimed).map(TimelineEntry::Transit));
		}

		cursor = (members + stop.sample_count).min(samples.len());
		entries.push(TimelineEntry::Stop(stop.clone()));
		span_start = stop.end;
		previous = Some(stop);
	}

	let rest = &samples[cursor..];
	if previous.is_none() || last.timestamp > span_start || !rest.is_empty() {
		let leg = Leg { start: span_start, end: last.timestamp, from: previous.map(|p| p.centroid), to: None };
		entries.extend(leg.into_transit(rest).map(TimelineEntry::Transit));
	}

	debug!(entries = entries.len(), "Timeline assembled");
	Timeline::from_entries(entries)
}

/// Index of the first member of `stop` at or after `cursor`.
///
/// Members form a contiguous run in chronological order, starting at `stop.start` and
/// ending `sample_count` samples later at `stop.end`. Samples tied with either boundary
/// that sit outside the run stay unclaimed.
fn member_run_start(samples: &[LocationSample], cursor: usize, stop: &StopInterval) -> usize {
	let span = stop.sample_count.max(1) - 1;

	(cursor..samples.len())
		.filter(|&i| samples[i].timestamp == stop.start)
		.find(|&i| samples.get(i + span).is_some_and(|s| s.timestamp == stop.end))
		.or_else(|| (cursor..samples.len()).find(|&i| samples[i].timestamp >= stop.start))
		.unwrap_or(samples.len())
}

/// Time span of a transit plus the stop centroids bracketing it, if any.
struct Leg {
	start: DateTime<Utc>,
	end: DateTime<Utc>,
	from: Option<GeoPoint>,
	to: Option<GeoPoint>,
}

impl Leg {
	fn into_transit(self, unclaimed: &[LocationSample]) -> Option<TransitSegment> {
		let path: Vec<GeoPoint> =
			self.from.into_iter().chain(unclaimed.iter().map(LocationSample::point)).chain(self.to).collect();
		let (&start_point, &end_point) = (path.first()?, path.last()?);

		let distance_meters = path_length(&path);
		let duration = seconds_between(self.start, self.end);
		let avg_speed_mps = if duration > 0.0 { distance_meters / duration } else { 0.0 };

		Some(TransitSegment {
			start: self.start,
			end: self.end,
			start_point,
			end_point,
			distance_meters,
			avg_speed_mps,
			sample_count: unclaimed.len(),
			path,
		})
	}
}
