use std::borrow::Cow;

use tracing::debug;

use crate::types::LocationSample;

/// Returns the samples in timestamp order, keeping input order for equal timestamps.
///
/// Already-sorted input is borrowed as is.
#[must_use]
pub fn chronological(samples: &[LocationSample]) -> Cow<'_, [LocationSample]> {
	if samples.is_sorted_by_key(|sample| sample.timestamp) {
		return Cow::Borrowed(samples);
	}

	debug!(count = samples.len(), "Samples out of order, sorting by timestamp");
	let mut sorted = samples.to_vec();
	sorted.sort_by_key(|sample| sample.timestamp);
	Cow::Owned(sorted)
}

/// Drops samples whose coordinates fall outside the valid latitude/longitude ranges.
///
/// Returns the kept samples and the number of dropped ones.
#[must_use]
pub fn retain_valid(mut samples: Vec<LocationSample>) -> (Vec<LocationSample>, usize) {
	let before = samples.len();
	samples.retain(LocationSample::has_valid_coordinates);
	let dropped = before - samples.len();
	(samples, dropped)
}
