use num_traits::Float;

use crate::validation::{in_range, validate_subset, DataValidator};
use crate::EppError;

/// A read-only view of event by measurement data, with values in [0, 1], and a mask choosing
/// the events to cluster.
///
/// Pursuits share one sample across threads, so implementations must be `Send + Sync`.
pub trait Sample: Send + Sync {
    /// Number of events (rows, cells, points).
    fn events(&self) -> usize;

    /// Number of measurements (columns, parameters, dimensions).
    fn measurements(&self) -> usize;

    /// The value of `measurement` for `event`, expected to lie in [0, 1].
    fn value(&self, event: usize, measurement: usize) -> f64;

    /// Which events take part. Must have one entry per event.
    fn subset(&self) -> &[bool];
}

/// Sample data stored one row per event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMajorSample<T> {
    data: Vec<T>,
    events: usize,
    measurements: usize,
    subset: Vec<bool>,
}

/// Sample data stored one column per measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementMajorSample<T> {
    data: Vec<T>,
    events: usize,
    measurements: usize,
    subset: Vec<bool>,
}

fn flatten<T: Float>(data: &[Vec<T>]) -> Vec<T> {
    data.iter().flat_map(|inner| inner.iter().copied()).collect()
}

impl<T: Float + Send + Sync> EventMajorSample<T> {
    /// Creates a sample from one vector of measurements per event. Every event with a value
    /// outside [0, 1] is left out of the subset.
    ///
    /// # Parameters
    /// * `data` - the events; every vector must have the same non-zero length.
    ///
    /// # Returns
    /// * The sample, or an error if the data is empty or ragged.
    ///
    /// # Examples
    /// ```
    ///use epp::{EventMajorSample, Sample};
    ///
    ///let data: Vec<Vec<f32>> = vec![
    ///    vec![0.1, 0.9],
    ///    vec![0.2, 1.7],
    ///    vec![0.3, 0.5],
    ///];
    ///let sample = EventMajorSample::new(&data).unwrap();
    ///assert_eq!(sample.events(), 3);
    ///assert_eq!(sample.measurements(), 2);
    ///assert_eq!(sample.subset(), &[true, false, true]);
    /// ```
    pub fn new(data: &[Vec<T>]) -> Result<Self, EppError> {
        if data.is_empty() {
            return Err(EppError::EmptySample);
        }
        let measurements = DataValidator::new(data).validate_input_data("event")?;
        let subset = data.iter().map(|event| event.iter().all(|&v| in_range(v))).collect();
        Ok(EventMajorSample { data: flatten(data), events: data.len(), measurements, subset })
    }

    /// Creates a sample with an explicit subset. The values of included events are assumed, not
    /// checked, to lie in [0, 1].
    pub fn with_subset(data: &[Vec<T>], subset: Vec<bool>) -> Result<Self, EppError> {
        if data.is_empty() {
            return Err(EppError::EmptySample);
        }
        let measurements = DataValidator::new(data).validate_input_data("event")?;
        validate_subset(&subset, data.len())?;
        Ok(EventMajorSample { data: flatten(data), events: data.len(), measurements, subset })
    }
}

impl<T: Float + Send + Sync> Sample for EventMajorSample<T> {
    fn events(&self) -> usize {
        self.events
    }

    fn measurements(&self) -> usize {
        self.measurements
    }

    #[inline]
    fn value(&self, event: usize, measurement: usize) -> f64 {
        self.data[event * self.measurements + measurement]
            .to_f64()
            .unwrap_or(f64::NAN)
    }

    fn subset(&self) -> &[bool] {
        &self.subset
    }
}

impl<T: Float + Send + Sync> MeasurementMajorSample<T> {
    /// Creates a sample from one vector of events per measurement, the layout of column major
    /// matrices. Every event with a value outside [0, 1] is left out of the subset.
    ///
    /// # Parameters
    /// * `data` - the measurements; every vector must have the same non-zero length.
    ///
    /// # Returns
    /// * The sample, or an error if the data is empty or ragged.
    pub fn new(data: &[Vec<T>]) -> Result<Self, EppError> {
        if data.is_empty() {
            return Err(EppError::NoMeasurements);
        }
        let events = DataValidator::new(data).validate_input_data("measurement")?;
        let subset = (0..events)
            .map(|event| data.iter().all(|measurement| in_range(measurement[event])))
            .collect();
        Ok(MeasurementMajorSample { data: flatten(data), events, measurements: data.len(), subset })
    }

    pub fn with_subset(data: &[Vec<T>], subset: Vec<bool>) -> Result<Self, EppError> {
        if data.is_empty() {
            return Err(EppError::NoMeasurements);
        }
        let events = DataValidator::new(data).validate_input_data("measurement")?;
        validate_subset(&subset, events)?;
        Ok(MeasurementMajorSample { data: flatten(data), events, measurements: data.len(), subset })
    }
}

impl<T: Float + Send + Sync> Sample for MeasurementMajorSample<T> {
    fn events(&self) -> usize {
        self.events
    }

    fn measurements(&self) -> usize {
        self.measurements
    }

    #[inline]
    fn value(&self, event: usize, measurement: usize) -> f64 {
        self.data[measurement * self.events + event]
            .to_f64()
            .unwrap_or(f64::NAN)
    }

    fn subset(&self) -> &[bool] {
        &self.subset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_agree() {
        let rows = vec![vec![0.1f64, 0.2, 0.3], vec![0.4, 0.5, 0.6]];
        let columns = vec![vec![0.1f64, 0.4], vec![0.2, 0.5], vec![0.3, 0.6]];
        let by_event = EventMajorSample::new(&rows).unwrap();
        let by_measurement = MeasurementMajorSample::new(&columns).unwrap();
        assert_eq!(by_event.events(), by_measurement.events());
        assert_eq!(by_event.measurements(), by_measurement.measurements());
        for event in 0..2 {
            for measurement in 0..3 {
                assert_eq!(
                    by_event.value(event, measurement),
                    by_measurement.value(event, measurement)
                );
            }
        }
    }

    #[test]
    fn out_of_range_events_are_excluded() {
        let columns = vec![vec![0.1f32, -0.4, 0.7], vec![0.2, 0.5, f32::NAN]];
        let sample = MeasurementMajorSample::new(&columns).unwrap();
        assert_eq!(sample.subset(), &[true, false, false]);
    }

    #[test]
    fn empty_and_mismatched_input() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert_eq!(EventMajorSample::new(&empty), Err(EppError::EmptySample));
        assert_eq!(MeasurementMajorSample::new(&empty), Err(EppError::NoMeasurements));

        let rows = vec![vec![0.1f32, 0.2], vec![0.3, 0.4]];
        let result = EventMajorSample::with_subset(&rows, vec![true]);
        assert!(matches!(result, Err(EppError::SubsetLength(_))));
    }
}
