//! A fixed pool of worker threads sharing one queue of work items.
//!
//! Every item runs its parallel stage with the lock released and its serial stage with it held,
//! so serial stages see and update the result one at a time and may queue more work.
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::pursuit::{PursueProjection, QualifyMeasurement};
use crate::{PursuitResult, Sample};

pub(crate) enum Job<S> {
    Qualify(QualifyMeasurement<S>),
    Pursue(PursueProjection<S>),
}

impl<S: Sample> Job<S> {
    fn parallel(&mut self) {
        match self {
            Job::Qualify(job) => job.parallel(),
            Job::Pursue(job) => job.parallel(),
        }
    }

    fn serial(self, board: &mut Board<S>) {
        match self {
            Job::Qualify(job) => job.serial(board),
            Job::Pursue(job) => job.serial(board),
        }
    }
}

/// Everything guarded by the scheduler's lock.
pub(crate) struct Board<S> {
    queue: VecDeque<Job<S>>,
    /// Items queued or running. The run is finished when this reaches zero.
    outstanding: usize,
    result: PursuitResult,
    kiss_of_death: bool,
    started: Instant,
}

impl<S> Board<S> {
    /// Adds an item to the back of the queue. Workers are woken when the current serial stage
    /// ends.
    pub(crate) fn enqueue(&mut self, job: Job<S>) {
        self.outstanding += 1;
        self.queue.push_back(job);
    }

    pub(crate) fn result_mut(&mut self) -> &mut PursuitResult {
        &mut self.result
    }
}

pub(crate) struct Scheduler<S> {
    board: Mutex<Board<S>>,
    work_available: Condvar,
    work_completed: Condvar,
}

impl<S: Sample> Scheduler<S> {
    pub(crate) fn new() -> Self {
        Scheduler {
            board: Mutex::new(Board {
                queue: VecDeque::new(),
                outstanding: 0,
                result: PursuitResult::default(),
                kiss_of_death: false,
                started: Instant::now(),
            }),
            work_available: Condvar::new(),
            work_completed: Condvar::new(),
        }
    }

    /// Waits for any earlier run to finish, then starts a new one with a fresh result.
    pub(crate) fn submit(&self, jobs: Vec<Job<S>>) {
        let mut board = self.board.lock();
        while board.outstanding > 0 {
            self.work_completed.wait(&mut board);
        }
        board.result = PursuitResult::default();
        board.started = Instant::now();
        trace!("submitting {} work items", jobs.len());
        for job in jobs {
            board.enqueue(job);
        }
        self.work_available.notify_all();
    }

    /// The body of a worker thread. Returns once the scheduler is shut down.
    pub(crate) fn work(&self) {
        let mut board = self.board.lock();
        loop {
            if board.kiss_of_death {
                break;
            }
            match board.queue.pop_front() {
                Some(job) => self.run(&mut board, job),
                None => self.work_available.wait(&mut board),
            }
        }
    }

    /// Runs everything queued on the calling thread.
    pub(crate) fn drain(&self) {
        let mut board = self.board.lock();
        while let Some(job) = board.queue.pop_front() {
            self.run(&mut board, job);
        }
    }

    /// Runs both stages of one item. A panic in either stage is contained to the item: a pursuit
    /// left unfinished keeps its `Error` outcome and the run still completes.
    fn run(&self, board: &mut MutexGuard<'_, Board<S>>, mut job: Job<S>) {
        let parallel =
            MutexGuard::unlocked(board, || panic::catch_unwind(AssertUnwindSafe(|| job.parallel())));
        if parallel.is_err() {
            warn!("EPP_WARNING: a work item panicked in its parallel stage");
        }
        if panic::catch_unwind(AssertUnwindSafe(|| job.serial(board))).is_err() {
            warn!("EPP_WARNING: a work item panicked in its serial stage");
        }
        board.outstanding -= 1;
        if !board.queue.is_empty() {
            self.work_available.notify_all();
        }
        if board.outstanding == 0 {
            board.result.duration = board.started.elapsed();
            debug!(
                "pursuit finished in {:?}: {} projections, {} qualified",
                board.result.duration,
                board.result.projections,
                board.result.qualified.len()
            );
            self.work_completed.notify_all();
        }
    }

    pub(crate) fn finished(&self) -> bool {
        self.board.lock().outstanding == 0
    }

    pub(crate) fn wait(&self) {
        let mut board = self.board.lock();
        while board.outstanding > 0 {
            self.work_completed.wait(&mut board);
        }
    }

    /// A copy of the result once the run is finished.
    pub(crate) fn result(&self) -> PursuitResult {
        let mut board = self.board.lock();
        while board.outstanding > 0 {
            self.work_completed.wait(&mut board);
        }
        board.result.clone()
    }

    /// Time since the run started, or its total time once finished.
    pub(crate) fn elapsed(&self) -> Duration {
        let board = self.board.lock();
        if board.outstanding == 0 {
            board.result.duration
        } else {
            board.started.elapsed()
        }
    }

    /// Tells every worker to stop after its current item.
    pub(crate) fn shut_down(&self) {
        self.board.lock().kiss_of_death = true;
        self.work_available.notify_all();
    }
}
