use crate::{EppError, Parameters, Sample};
use num_traits::Float;

/// Checks the shape of raw sample data before it is packed into a sample.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataValidator<'a, T> {
    data: &'a [Vec<T>],
}

impl<'a, T: Float> DataValidator<'a, T> {
    pub(crate) fn new(data: &'a [Vec<T>]) -> Self {
        Self { data }
    }

    /// Data must be non-empty and rectangular.
    ///
    /// # Parameters
    /// * `outer` - what each inner vector holds, for the error messages
    ///
    /// # Returns
    /// * The length of the inner vectors.
    pub(crate) fn validate_input_data(&self, outer: &str) -> Result<usize, EppError> {
        if self.data.is_empty() {
            return Err(EppError::WrongDimension(format!("there are no {outer}s")));
        }
        let len_0th = self.data[0].len();
        if len_0th == 0 {
            return Err(EppError::WrongDimension(format!("0th {outer} is empty")));
        }
        for (n, inner) in self.data.iter().enumerate() {
            let len_nth = inner.len();
            if len_nth != len_0th {
                return Err(EppError::WrongDimension(format!(
                    "0th {outer} has {len_0th} values, but {n}th has {len_nth}"
                )));
            }
        }
        Ok(len_0th)
    }
}

/// Whether a value can be binned onto the density grid.
pub(crate) fn in_range<T: Float>(value: T) -> bool {
    value.is_finite() && value >= T::zero() && value <= T::one()
}

pub(crate) fn validate_subset(subset: &[bool], events: usize) -> Result<(), EppError> {
    if subset.len() != events {
        return Err(EppError::SubsetLength(format!(
            "{} entries for {events} events",
            subset.len()
        )));
    }
    Ok(())
}

/// Checks a sample and parameters are fit to start a pursuit with.
pub(crate) fn validate_request<S: Sample + ?Sized>(
    sample: &S,
    parameters: &Parameters,
) -> Result<(), EppError> {
    if sample.events() == 0 {
        return Err(EppError::EmptySample);
    }
    if sample.measurements() == 0 {
        return Err(EppError::NoMeasurements);
    }
    validate_subset(sample.subset(), sample.events())?;
    if parameters.censor_len() > sample.measurements() {
        return Err(EppError::CensorLength(format!(
            "{} entries for {} measurements",
            parameters.censor_len(),
            sample.measurements()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_data_is_rejected() {
        let data = vec![vec![0.1f32, 0.2], vec![0.3]];
        let result = DataValidator::new(&data).validate_input_data("event");
        assert!(matches!(result, Err(EppError::WrongDimension(_))));
    }

    #[test]
    fn rectangular_data_reports_inner_length() {
        let data = vec![vec![0.1f64, 0.2, 0.3], vec![0.3, 0.4, 0.5]];
        assert_eq!(DataValidator::new(&data).validate_input_data("event"), Ok(3));
    }

    #[test]
    fn range_check() {
        assert!(in_range(0.0f32));
        assert!(in_range(1.0f64));
        assert!(!in_range(-0.01f64));
        assert!(!in_range(1.5f32));
        assert!(!in_range(f64::NAN));
        assert!(!in_range(f32::INFINITY));
    }
}
