use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;

use crate::pursuit::QualifyMeasurement;
use crate::scheduler::{Job, Scheduler};
use crate::validation::validate_request;
use crate::{EppError, Parameters, PursuitResult, Sample};

/// Runs exhaustive projection pursuits on a pool of worker threads.
///
/// A pursuer is reusable: each call to [`Pursuer::start`] waits for the previous pursuit to
/// finish and then replaces its result. Dropping the pursuer stops and joins the workers.
pub struct Pursuer<S: Sample + 'static> {
    scheduler: Arc<Scheduler<S>>,
    workers: Vec<JoinHandle<()>>,
}

impl<S: Sample + 'static> Pursuer<S> {
    /// Creates a pursuer and starts its worker threads.
    ///
    /// # Parameters
    /// * `threads` - the number of workers. `None` uses one per available core. `Some(0)`
    ///   starts none and runs every pursuit on the calling thread, inside `start`.
    pub fn new(threads: Option<usize>) -> Self {
        let threads = threads.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });
        let scheduler = Arc::new(Scheduler::new());
        let workers = (0..threads)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || scheduler.work())
            })
            .collect();
        debug!("pursuer started with {threads} worker threads");
        Pursuer { scheduler, workers }
    }

    /// The number of worker threads. Zero means pursuits run on the calling thread.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Starts pursuing every uncensored measurement of the sample and returns without waiting,
    /// unless the pursuer has no workers.
    ///
    /// # Parameters
    /// * `sample` - the data, shared with the workers.
    /// * `parameters` - how to pursue.
    ///
    /// # Returns
    /// * An error if the sample or parameters can't be pursued. Nothing is started then.
    pub fn start(&self, sample: Arc<S>, parameters: Parameters) -> Result<(), EppError> {
        validate_request(sample.as_ref(), &parameters)?;
        let parameters = Arc::new(parameters);
        let jobs = (0..sample.measurements())
            .filter(|&measurement| !parameters.is_censored(measurement))
            .map(|measurement| {
                Job::Qualify(QualifyMeasurement::new(
                    Arc::clone(&sample),
                    Arc::clone(&parameters),
                    measurement,
                ))
            })
            .collect();
        self.scheduler.submit(jobs);
        if self.workers.is_empty() {
            self.scheduler.drain();
        }
        Ok(())
    }

    /// Whether the last pursuit started has finished.
    pub fn finished(&self) -> bool {
        self.scheduler.finished()
    }

    /// Blocks until the last pursuit started has finished.
    pub fn wait(&self) {
        self.scheduler.wait();
    }

    /// Time taken by the last pursuit, so far if it's still running.
    pub fn elapsed(&self) -> Duration {
        self.scheduler.elapsed()
    }

    /// Waits for the last pursuit started to finish and returns a copy of its result.
    pub fn result(&self) -> PursuitResult {
        self.scheduler.result()
    }

    /// Starts a pursuit and waits for its result.
    ///
    /// # Examples
    /// ```
    ///use std::sync::Arc;
    ///use epp::{EventMajorSample, Parameters, Pursuer, Status};
    ///
    ///// every event identical, so nothing qualifies
    ///let data: Vec<Vec<f32>> = vec![vec![0.5, 0.5]; 100];
    ///let sample = Arc::new(EventMajorSample::new(&data).unwrap());
    ///let pursuer = Pursuer::new(Some(0));
    ///let result = pursuer.pursue(sample, Parameters::default()).unwrap();
    ///assert_eq!(result.outcome(), Status::NoQualified);
    /// ```
    pub fn pursue(&self, sample: Arc<S>, parameters: Parameters) -> Result<PursuitResult, EppError> {
        self.start(sample, parameters)?;
        Ok(self.result())
    }
}

impl<S: Sample + 'static> Drop for Pursuer<S> {
    fn drop(&mut self) {
        self.scheduler.shut_down();
        for worker in self.workers.drain(..) {
            // a worker that panicked has nothing left to clean up
            let _ = worker.join();
        }
    }
}
