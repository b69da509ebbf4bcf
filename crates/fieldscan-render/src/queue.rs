// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-flight render task queue.
//
// Every operation that draws onto the shared rendering surface is submitted
// here and executed by one worker task, strictly in submission order, one at
// a time.  After each executed task settles the worker sleeps for a short
// settling interval so the surface's native resources are released before
// the next task touches it.
//
// Cancellation is cooperative.  A task's closure receives its
// `CancellationToken` and is expected to check it at its suspension points;
// the worker never abandons a running task, it waits for it to settle before
// moving on.  A task cancelled while still queued is dropped without running.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fieldscan_core::config::QueueConfig;
use fieldscan_core::error::{FieldscanError, Result};
use fieldscan_core::types::{QueueState, RenderTaskId};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub state: QueueState,
    /// Tasks submitted but not yet picked up by the worker.
    pub pending: usize,
}

/// How an executed task ended, for logging.
enum Outcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Type-erased unit of work owned by the queue until it settles.
trait Job: Send {
    /// Execute and deliver the result to the submitter.
    fn run(self: Box<Self>, token: CancellationToken) -> BoxFuture<Outcome>;

    /// Settle without running.
    fn reject(self: Box<Self>, err: FieldscanError);
}

struct TypedJob<F, T> {
    execute: F,
    reply: oneshot::Sender<Result<T>>,
}

impl<F, Fut, T> Job for TypedJob<F, T>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>, token: CancellationToken) -> BoxFuture<Outcome> {
        let TypedJob { execute, reply } = *self;
        Box::pin(async move {
            // Call and await on its own task so a panicking render, even one
            // that panics before returning its future, fails only itself.
            let task_token = token.clone();
            let result = match tokio::spawn(async move { execute(task_token).await }).await {
                Ok(result) => result,
                Err(e) => Err(FieldscanError::RenderFailed(format!("render task aborted: {e}"))),
            };
            let result = match result {
                Ok(_) if token.is_cancelled() => Err(FieldscanError::Cancelled),
                other => other,
            };

            let outcome = match &result {
                Ok(_) => Outcome::Completed,
                Err(e) if e.is_cancellation() => Outcome::Cancelled,
                Err(e) => Outcome::Failed(e.to_string()),
            };
            // The submitter may have stopped listening.
            let _ = reply.send(result);
            outcome
        })
    }

    fn reject(self: Box<Self>, err: FieldscanError) {
        let _ = self.reply.send(Err(err));
    }
}

struct QueuedTask {
    id: RenderTaskId,
    context: String,
    token: CancellationToken,
    job: Box<dyn Job>,
}

/// Pending result of a submitted task.
///
/// Await it (or call [`RenderHandle::result`]) to get the task's outcome.
/// Cancelling resolves the handle with [`FieldscanError::Cancelled`] at once,
/// even if the task is still running on the surface.
#[derive(Debug)]
pub struct RenderHandle<T> {
    id: RenderTaskId,
    token: CancellationToken,
    reply: oneshot::Receiver<Result<T>>,
}

impl<T> RenderHandle<T> {
    pub fn id(&self) -> RenderTaskId {
        self.id
    }

    /// Ask the task to stop.  Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token that cancels this task, usable after the handle is consumed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the task to settle.
    pub async fn result(self) -> Result<T> {
        let Self { token, reply, .. } = self;
        tokio::select! {
            biased;
            settled = reply => settled.unwrap_or(Err(FieldscanError::QueueClosed)),
            _ = token.cancelled() => Err(FieldscanError::Cancelled),
        }
    }
}

impl<T: Send + 'static> IntoFuture for RenderHandle<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.result())
    }
}

/// FIFO, single-flight executor for rendering work.
///
/// Construct one per rendering surface and pass it to every call site that
/// draws on that surface.
pub struct RenderQueue {
    sender: mpsc::UnboundedSender<QueuedTask>,
    status: Arc<watch::Sender<QueueSnapshot>>,
    worker: JoinHandle<()>,
}

impl RenderQueue {
    /// Start the queue's worker on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`FieldscanError::RenderFailed`] when called outside a runtime.
    pub fn new(config: &QueueConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| FieldscanError::RenderFailed(format!("no Tokio runtime: {e}")))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(QueueSnapshot {
            state: QueueState::Idle,
            pending: 0,
        });
        let status = Arc::new(status);
        let settle = config.settle_interval();

        let worker = runtime.spawn(drain(receiver, Arc::clone(&status), settle));
        debug!(settle_ms = settle.as_millis() as u64, "render queue started");

        Ok(Self {
            sender,
            status,
            worker,
        })
    }

    /// Enqueue a task.  `context` names it in logs.
    ///
    /// The closure runs once, on the worker's turn, and receives the task's
    /// cancellation token.
    pub fn submit<T, F, Fut>(&self, context: impl Into<String>, execute: F) -> RenderHandle<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let id = RenderTaskId::new();
        let context = context.into();
        let token = CancellationToken::new();
        let (reply, receiver) = oneshot::channel();

        let task = QueuedTask {
            id,
            context,
            token: token.clone(),
            job: Box::new(TypedJob { execute, reply }),
        };

        self.status.send_modify(|s| s.pending += 1);
        if let Err(mpsc::error::SendError(task)) = self.sender.send(task) {
            self.status
                .send_modify(|s| s.pending = s.pending.saturating_sub(1));
            warn!(task_id = %task.id, context = %task.context, "render queue closed, task rejected");
            task.job.reject(FieldscanError::QueueClosed);
        } else {
            debug!(task_id = %id, "render task queued");
        }

        RenderHandle {
            id,
            token,
            reply: receiver,
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        *self.status.borrow()
    }

    pub fn state(&self) -> QueueState {
        self.snapshot().state
    }

    /// Tasks waiting behind the running one.
    pub fn pending(&self) -> usize {
        self.snapshot().pending
    }

    /// Resolve once the queue is idle with nothing pending.
    pub async fn wait_idle(&self) {
        let mut rx = self.status.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx
            .wait_for(|s| s.state == QueueState::Idle && s.pending == 0)
            .await;
    }

    /// Stop accepting work, let everything already queued settle, then stop
    /// the worker.
    pub async fn shutdown(self) -> Result<()> {
        let Self { sender, worker, .. } = self;
        drop(sender);
        worker
            .await
            .map_err(|e| FieldscanError::RenderFailed(format!("render worker join: {e}")))?;
        info!("render queue stopped");
        Ok(())
    }
}

/// The worker loop.  Runs until every sender is gone and the channel is empty.
async fn drain(
    mut receiver: mpsc::UnboundedReceiver<QueuedTask>,
    status: Arc<watch::Sender<QueueSnapshot>>,
    settle: Duration,
) {
    while let Some(task) = receiver.recv().await {
        let QueuedTask {
            id,
            context,
            token,
            job,
        } = task;

        if token.is_cancelled() {
            status.send_modify(|s| s.pending = s.pending.saturating_sub(1));
            info!(task_id = %id, context = %context, "render task cancelled before start");
            job.reject(FieldscanError::Cancelled);
            continue;
        }

        // One update so observers never see Idle between dequeue and start.
        status.send_modify(|s| {
            s.pending = s.pending.saturating_sub(1);
            s.state = QueueState::Running;
        });
        info!(task_id = %id, context = %context, "starting render task");

        match job.run(token).await {
            Outcome::Completed => debug!(task_id = %id, context = %context, "render task completed"),
            Outcome::Cancelled => info!(task_id = %id, context = %context, "render task cancelled"),
            Outcome::Failed(reason) => {
                error!(task_id = %id, context = %context, error = %reason, "render task failed")
            }
        }

        status.send_modify(|s| s.state = QueueState::Idle);
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
    }
    debug!("render queue drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn queue() -> RenderQueue {
        RenderQueue::new(&QueueConfig {
            settle_interval_ms: 1,
        })
        .expect("inside runtime")
    }

    #[tokio::test]
    async fn tasks_run_once_in_submission_order() {
        let queue = queue();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let seen = Arc::clone(&seen);
                queue.submit(format!("task {i}"), move |_| async move {
                    seen.lock().expect("lock").push(i);
                    Ok(i * 10)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.expect("task result"), i * 10);
        }
        assert_eq!(*seen.lock().expect("lock"), (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failure_rejects_only_that_task() {
        let queue = queue();
        let failing = queue.submit("broken", |_| async {
            Err::<(), _>(FieldscanError::RenderFailed("canvas lost".into()))
        });
        let next = queue.submit("after", |_| async { Ok("drawn") });

        assert!(matches!(failing.await, Err(FieldscanError::RenderFailed(_))));
        assert_eq!(next.await.expect("queue keeps draining"), "drawn");
    }

    #[tokio::test]
    async fn panicking_task_is_a_render_failure() {
        let queue = queue();
        let panicking = queue.submit("panics", |_| async {
            if true {
                panic!("surface exploded");
            }
            Ok(())
        });
        let next = queue.submit("after", |_| async { Ok(1) });

        assert!(matches!(panicking.await, Err(FieldscanError::RenderFailed(_))));
        assert_eq!(next.await.expect("next"), 1);
    }

    #[tokio::test]
    async fn closure_panicking_before_its_future_fails_only_itself() {
        let queue = queue();
        let panicking = queue.submit("panics early", |_| -> std::future::Ready<Result<()>> {
            panic!("no canvas to draw on")
        });
        let next = queue.submit("next", |_| async { Ok("next") });

        assert!(matches!(panicking.await, Err(FieldscanError::RenderFailed(_))));
        assert_eq!(next.await.expect("worker survives"), "next");

        let later = queue.submit("later", |_| async { Ok("later") });
        assert_eq!(later.await.expect("queue still accepts work"), "later");
        queue.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn cancelled_while_queued_never_runs() {
        let queue = queue();
        let (release, gate) = oneshot::channel::<()>();
        let blocker = queue.submit("blocker", move |_| async move {
            let _ = gate.await;
            Ok(())
        });

        let ran = Arc::new(AtomicBool::new(false));
        let ran_flag = Arc::clone(&ran);
        let victim = queue.submit("victim", move |_| async move {
            ran_flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        let survivor = queue.submit("survivor", |_| async { Ok("ok") });

        victim.cancel();
        assert!(matches!(victim.await, Err(FieldscanError::Cancelled)));

        let _ = release.send(());
        blocker.await.expect("blocker");
        assert_eq!(survivor.await.expect("survivor runs"), "ok");
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn running_task_sees_cancellation_and_queue_moves_on() {
        let queue = queue();
        let running = queue.submit("long", |token| async move {
            token.cancelled().await;
            Err::<(), _>(FieldscanError::Cancelled)
        });
        let next = queue.submit("next", |_| async { Ok(7) });

        let mut status = queue.status.subscribe();
        status
            .wait_for(|s| s.state == QueueState::Running)
            .await
            .expect("status");
        running.cancel();

        assert!(matches!(running.await, Err(FieldscanError::Cancelled)));
        assert_eq!(next.await.expect("next"), 7);
    }

    #[tokio::test]
    async fn superseded_submission_leaves_queue_idle() {
        let queue = queue();
        let first = queue.submit("render page 1", |token| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if token.is_cancelled() {
                return Err(FieldscanError::Cancelled);
            }
            Ok(1)
        });
        let second = queue.submit("render page 2", |_| async { Ok(2) });
        first.cancel();

        assert!(first.await.is_err());
        assert_eq!(second.await.expect("second resolves"), 2);

        queue.wait_idle().await;
        assert_eq!(queue.state(), QueueState::Idle);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn pending_counts_waiting_tasks() {
        let queue = queue();
        let (release, gate) = oneshot::channel::<()>();
        let blocker = queue.submit("blocker", move |_| async move {
            let _ = gate.await;
            Ok(())
        });
        let a = queue.submit("a", |_| async { Ok(()) });
        let b = queue.submit("b", |_| async { Ok(()) });

        let mut status = queue.status.subscribe();
        status
            .wait_for(|s| s.state == QueueState::Running)
            .await
            .expect("status");
        assert_eq!(queue.pending(), 2);

        let _ = release.send(());
        blocker.await.expect("blocker");
        a.await.expect("a");
        b.await.expect("b");
        queue.wait_idle().await;
        assert_eq!(queue.snapshot(), QueueSnapshot { state: QueueState::Idle, pending: 0 });
    }

    #[tokio::test]
    async fn shutdown_drains_queued_work() {
        let queue = queue();
        let counter = Arc::new(Mutex::new(0));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let counter = Arc::clone(&counter);
                queue.submit("count", move |_| async move {
                    *counter.lock().expect("lock") += 1;
                    Ok(())
                })
            })
            .collect();

        queue.shutdown().await.expect("shutdown");
        assert_eq!(*counter.lock().expect("lock"), 3);
        for handle in handles {
            handle.await.expect("settled before shutdown returned");
        }
    }

    #[test]
    fn new_outside_runtime_is_an_error() {
        assert!(RenderQueue::new(&QueueConfig::default()).is_err());
    }
}
