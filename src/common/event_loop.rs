// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, PoisonError,
    },
    thread,
    time::Duration,
};

use futures::channel::oneshot;
use tracing::{debug, info, warn};

/// Why a native event loop stopped running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// `quit()` was called.
    Quit,
    /// The user interrupted the process (e.g. Ctrl-C).
    Interrupted,
}

/// The host's native event-processing loop. Backend callbacks are delivered
/// on the thread running `run()`.
pub trait EventLoop: Send + Sync + 'static {
    /// Process events on the calling thread until `quit()` is called or the
    /// user interrupts the loop.
    fn run(&self) -> LoopExit;

    fn is_running(&self) -> bool;

    /// Ask the loop to stop. Safe to call from any thread.
    fn quit(&self);
}

/// Runs `event_loop` on the calling thread and `target` on a worker thread
/// once the loop is up, so every native call made by `target` has a live
/// loop to deliver its responses on.
///
/// Returns after the loop has stopped:
/// * `Ok(code)` with `target`'s exit code, 0 if it returned `None`.
/// * `Err(e)` with the error `target` returned, unchanged.
/// * `Ok(0)` right away if the user interrupted the loop.
///
/// A panic in `target` is resumed on the calling thread with its original
/// payload. Ending the process with the code is left to the caller.
pub fn run_with<L, F, E>(event_loop: &Arc<L>, target: F) -> Result<i32, E>
where
    L: EventLoop + ?Sized,
    F: FnOnce() -> Result<Option<i32>, E> + Send + 'static,
    E: Send + 'static,
{
    let (outcome_tx, mut outcome_rx) = oneshot::channel();
    let abandoned = Arc::new(AtomicBool::new(false));

    {
        let event_loop = Arc::clone(event_loop);
        let abandoned = abandoned.clone();
        thread::spawn(move || {
            while !event_loop.is_running() {
                if abandoned.load(Ordering::Acquire) {
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            debug!("Event loop is running, starting application logic");
            let outcome = panic::catch_unwind(AssertUnwindSafe(target));
            // The receiver is gone if the loop was interrupted meanwhile.
            let _ = outcome_tx.send(outcome);
            event_loop.quit();
        });
    }

    if event_loop.run() == LoopExit::Interrupted {
        info!("Event loop interrupted by user");
        abandoned.store(true, Ordering::Release);
        return Ok(0);
    }

    match outcome_rx.try_recv() {
        Ok(Some(Ok(Ok(code)))) => Ok(code.unwrap_or(0)),
        Ok(Some(Ok(Err(err)))) => Err(err),
        Ok(Some(Err(payload))) => panic::resume_unwind(payload),
        Ok(None) | Err(_) => {
            warn!("Event loop stopped before the application logic finished");
            abandoned.store(true, Ordering::Release);
            Ok(0)
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct LoopQueue {
    jobs: VecDeque<Job>,
    exit: Option<LoopExit>,
}

struct Shared {
    queue: Mutex<LoopQueue>,
    wake: Condvar,
    running: AtomicBool,
}

impl Shared {
    fn request_exit(&self, exit: LoopExit) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.exit.get_or_insert(exit);
        self.wake.notify_all();
    }
}

/// Minimal run loop for hosts without a GUI toolkit: executes closures
/// posted through a `LoopHandle`, in order, on the thread calling `run()`.
pub struct DispatchLoop {
    shared: Arc<Shared>,
}

/// Cloneable sender side of a `DispatchLoop`.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<Shared>,
}

impl DispatchLoop {
    pub fn new() -> Self {
        DispatchLoop {
            shared: Arc::new(Shared {
                queue: Mutex::new(LoopQueue {
                    jobs: VecDeque::new(),
                    exit: None,
                }),
                wake: Condvar::new(),
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Default for DispatchLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop for DispatchLoop {
    fn run(&self) -> LoopExit {
        self.shared.running.store(true, Ordering::Release);
        let exit = loop {
            let job = {
                let mut queue = self
                    .shared
                    .queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                loop {
                    if let Some(exit) = queue.exit.take() {
                        break Err(exit);
                    }
                    if let Some(job) = queue.jobs.pop_front() {
                        break Ok(job);
                    }
                    queue = self
                        .shared
                        .wake
                        .wait(queue)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };
            match job {
                Ok(job) => job(),
                Err(exit) => break exit,
            }
        };
        self.shared.running.store(false, Ordering::Release);
        exit
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn quit(&self) {
        self.shared.request_exit(LoopExit::Quit);
    }
}

impl LoopHandle {
    /// Queue `job` to run on the loop thread.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self
            .shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        queue.jobs.push_back(Box::new(job));
        self.shared.wake.notify_all();
    }

    pub fn quit(&self) {
        self.shared.request_exit(LoopExit::Quit);
    }

    /// Stop the loop as if the user pressed Ctrl-C.
    pub fn interrupt(&self) {
        self.shared.request_exit(LoopExit::Interrupted);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::BluetoothError;

    #[test]
    fn returns_target_exit_code() {
        let event_loop = Arc::new(DispatchLoop::new());
        let code = run_with(&event_loop, || Ok::<_, BluetoothError>(Some(3)));
        assert_eq!(code, Ok(3));
        assert!(!event_loop.is_running());
    }

    #[test]
    fn missing_exit_code_defaults_to_zero() {
        let event_loop = Arc::new(DispatchLoop::new());
        assert_eq!(run_with(&event_loop, || Ok::<_, BluetoothError>(None)), Ok(0));
    }

    #[test]
    fn target_error_is_returned_unchanged() {
        let event_loop = Arc::new(DispatchLoop::new());
        let result: Result<i32, BluetoothError> = run_with(&event_loop, || {
            Err(BluetoothError::FailedPrecondition(String::from("no adapter")))
        });
        assert_eq!(
            result,
            Err(BluetoothError::FailedPrecondition(String::from("no adapter")))
        );
    }

    #[test]
    fn target_panic_resumes_on_caller() {
        let event_loop = Arc::new(DispatchLoop::new());
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            run_with(&event_loop, || -> Result<Option<i32>, BluetoothError> {
                panic!("application bug")
            })
        }));
        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"application bug"));
    }

    #[test]
    fn target_runs_while_loop_processes_jobs() {
        let event_loop = Arc::new(DispatchLoop::new());
        let handle = event_loop.handle();
        let loop_thread = thread::current().id();

        let result = run_with(&event_loop, move || {
            let (tx, rx) = mpsc::channel();
            handle.post(move || tx.send(thread::current().id()).unwrap());
            let job_thread = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(job_thread, loop_thread);
            assert_ne!(thread::current().id(), loop_thread);
            Ok::<_, BluetoothError>(Some(0))
        });
        assert_eq!(result, Ok(0));
    }

    #[test]
    fn interrupt_exits_immediately_with_success() {
        let event_loop = Arc::new(DispatchLoop::new());
        let handle = event_loop.handle();
        let result = run_with(&event_loop, move || {
            handle.interrupt();
            thread::sleep(Duration::from_secs(60));
            Ok::<_, BluetoothError>(Some(1))
        });
        assert_eq!(result, Ok(0));
    }
}
