use std::fmt;
use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::N;

/// Number of values in one (N+1)x(N+1) grid.
pub(crate) const GRID: usize = (N + 1) * (N + 1);

/// Two dimensional type I discrete cosine transform (REDFT00) of an (N+1)x(N+1) grid.
///
/// Each row and then each column is extended evenly to length 2N, where the FFT of the real even
/// sequence is real and equals the DCT. Forward and reverse are the same unnormalized transform
/// so a round trip scales the data by 4N^2.
pub(crate) struct Transform {
    fft: Arc<dyn Fft<f32>>,
    line: Vec<Complex32>,
    scratch: Vec<Complex32>,
    staging: Vec<f32>,
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform").field("len", &self.fft.len()).finish()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub(crate) fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(2 * N);
        let scratch = vec![Complex32::default(); fft.get_inplace_scratch_len()];
        Transform {
            fft,
            line: vec![Complex32::default(); 2 * N],
            scratch,
            staging: vec![0.0; GRID],
        }
    }

    pub(crate) fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        self.redft00(input, output);
    }

    pub(crate) fn reverse(&mut self, input: &[f32], output: &mut [f32]) {
        self.redft00(input, output);
    }

    fn redft00(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), GRID);
        debug_assert_eq!(output.len(), GRID);
        // along i for every j, into staging
        for j in 0..=N {
            let row = (N + 1) * j;
            self.load(|k| input[row + k]);
            for k in 0..=N {
                self.staging[row + k] = self.line[k].re;
            }
        }
        // then along j for every i
        for i in 0..=N {
            let staging = std::mem::take(&mut self.staging);
            self.load(|k| staging[i + (N + 1) * k]);
            self.staging = staging;
            for k in 0..=N {
                output[i + (N + 1) * k] = self.line[k].re;
            }
        }
    }

    /// Even extension of N+1 values into `line`, then the FFT in place.
    fn load(&mut self, value: impl Fn(usize) -> f32) {
        for k in 0..=N {
            self.line[k] = Complex32::new(value(k), 0.0);
        }
        for k in 1..N {
            self.line[2 * N - k] = self.line[k];
        }
        self.fft.process_with_scratch(&mut self.line, &mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_grid_is_a_spike() {
        let input = vec![1.0f32; GRID];
        let mut output = vec![0.0f32; GRID];
        Transform::new().forward(&input, &mut output);
        // 2N per dimension at the origin, nothing anywhere else
        assert_relative_eq!(output[0], (4 * N * N) as f32, max_relative = 1e-4);
        let largest = output[1..].iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(largest < 1.0, "{largest}");
    }

    #[test]
    fn round_trip_scales_by_four_n_squared() {
        let input: Vec<f32> = (0..GRID)
            .map(|k| {
                let (i, j) = ((k % (N + 1)) as f32, (k / (N + 1)) as f32);
                (-(i - 90.0).powi(2) / 400.0 - (j - 150.0).powi(2) / 900.0).exp() + 0.01 * (i / 7.0).sin()
            })
            .collect();
        let mut transform = Transform::new();
        let mut cosine = vec![0.0f32; GRID];
        let mut back = vec![0.0f32; GRID];
        transform.forward(&input, &mut cosine);
        transform.reverse(&cosine, &mut back);
        let scale = (4 * N * N) as f32;
        for k in (0..GRID).step_by(97) {
            assert_relative_eq!(back[k] / scale, input[k], epsilon = 1e-4);
        }
    }
}
