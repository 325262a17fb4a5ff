use tracing::{debug, info};

use crate::config::StopDetectionConfig;
use crate::geo::{RunningCentroid, haversine_distance};
use crate::samples::chronological;
use crate::types::{LocationSample, StopInterval, seconds_between};

/// Groups consecutive samples into stops based on distance to a running centroid.
pub struct StopDetector {
	config: StopDetectionConfig,
}

impl StopDetector {
	#[must_use]
	pub const fn new(config: StopDetectionConfig) -> Self {
		Self { config }
	}

	#[must_use]
	pub const fn config(&self) -> &StopDetectionConfig {
		&self.config
	}

	/// Single pass over the samples in timestamp order.
	///
	/// A sample joins the active cluster when it is within `max_stop_radius_meters` of the
	/// cluster centroid and no more than `max_sample_gap_seconds` after the cluster's last
	/// sample (both inclusive). Otherwise the cluster is closed and the sample seeds a new one.
	#[must_use]
	pub fn detect(&self, samples: &[LocationSample]) -> Vec<StopInterval> {
		let samples = chronological(samples);
		let mut stops = Vec::new();
		let mut active: Option<Cluster> = None;

		for (index, sample) in samples.iter().enumerate() {
			let joins = active.as_ref().is_some_and(|cluster| self.accepts(cluster, &samples, sample));

			if joins {
				if let Some(cluster) = active.as_mut() {
					cluster.push(index, sample);
				}
				continue;
			}

			if let Some(closed) = active.replace(Cluster::seed(index, sample)) {
				stops.extend(self.close(&closed, &samples));
			}
		}

		if let Some(closed) = active {
			stops.extend(self.close(&closed, &samples));
		}

		info!(samples = samples.len(), stops = stops.len(), "Stop detection finished");
		stops
	}

	fn accepts(&self, cluster: &Cluster, samples: &[LocationSample], sample: &LocationSample) -> bool {
		let distance = haversine_distance(cluster.centroid.point(), sample.point());
		let gap = seconds_between(samples[cluster.last].timestamp, sample.timestamp);

		if gap > self.config.max_sample_gap_seconds() {
			debug!(gap_secs = gap, at = %sample.timestamp, "Sample gap too large, closing cluster");
			return false;
		}

		distance <= self.config.max_stop_radius_meters()
	}

	/// Turns a finished cluster into a stop if it lasted long enough.
	fn close(&self, cluster: &Cluster, samples: &[LocationSample]) -> Option<StopInterval> {
		let members = &samples[cluster.first..=cluster.last];
		let (first, last) = (members.first()?, members.last()?);

		if members.len() < 2 {
			return None;
		}

		let duration = seconds_between(first.timestamp, last.timestamp);
		if duration < self.config.min_stop_duration_seconds() {
			debug!(
				samples = members.len(),
				duration_secs = duration,
				threshold = self.config.min_stop_duration_seconds(),
				"Cluster too short, treating as transit"
			);
			return None;
		}

		let centroid = cluster.centroid.point();
		let radius_meters =
			members.iter().map(|sample| haversine_distance(centroid, sample.point())).fold(0.0, f64::max);

		debug!(
			start = %first.timestamp,
			end = %last.timestamp,
			samples = members.len(),
			radius_meters,
			"Stop detected"
		);

		Some(StopInterval {
			start: first.timestamp,
			end: last.timestamp,
			centroid,
			sample_count: cluster.centroid.count(),
			radius_meters,
		})
	}
}

/// Contiguous run of samples (by index into the sorted input) with its running centroid.
struct Cluster {
	first: usize,
	last: usize,
	centroid: RunningCentroid,
}

impl Cluster {
	const fn seed(index: usize, sample: &LocationSample) -> Self {
		Self { first: index, last: index, centroid: RunningCentroid::seed(sample.point()) }
	}

	fn push(&mut self, index: usize, sample: &LocationSample) {
		self.last = index;
		self.centroid.push(sample.point());
	}
}
