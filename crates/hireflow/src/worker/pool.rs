use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use futures_util::FutureExt;
use log::{debug, error, info, warn};

use crate::collaborators::ExecutionContext;
use crate::error::{CollaboratorError, Stage};
use crate::job::ItemResult;
use crate::worker::processor::ItemProcessor;

/// Called with the item reference just before a worker starts an item.
pub type DispatchHook = Arc<dyn Fn(&str) + Send + Sync>;

/// One consumed item.
#[derive(Debug, Clone)]
pub struct PoolOutput {
    pub item_ref: String,
    pub result: ItemResult,
    /// Set when processing panicked or could not run at all.
    pub escaped_error: Option<String>,
}

/// Bounded-concurrency executor for one job's items.
///
/// Results are handed over a rendezvous channel, so a worker does not pick
/// its next item until the previous result has been received.
pub struct WorkerPool {
    result_receiver: Receiver<PoolOutput>,
    workers: Vec<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `min(worker_count, items.len())` workers over `items`.
    pub fn start<P: ItemProcessor>(
        processor: Arc<P>,
        items: Vec<P::Item>,
        context: ExecutionContext,
        worker_count: usize,
        cancel: Arc<AtomicBool>,
        on_dispatch: Option<DispatchHook>,
    ) -> std::io::Result<Self> {
        let worker_count = worker_count.max(1).min(items.len());

        let (item_sender, item_receiver) = unbounded::<P::Item>();
        for item in items {
            // The receiver is alive in this scope; send cannot fail
            let _ = item_sender.send(item);
        }
        drop(item_sender);

        let (result_sender, result_receiver) = bounded::<PoolOutput>(0);
        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let item_rx = item_receiver.clone();
            let result_tx = result_sender.clone();
            let cancel_flag = Arc::clone(&cancel);
            let worker_processor = Arc::clone(&processor);
            let worker_context = context.clone();
            let hook = on_dispatch.clone();

            let handle = thread::Builder::new()
                .name(format!("hireflow-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        worker_processor,
                        item_rx,
                        result_tx,
                        cancel_flag,
                        worker_context,
                        hook,
                    );
                })?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            result_receiver,
            workers,
            cancel,
        })
    }

    /// Blocks for the next completed item. `None` once every worker stopped.
    pub fn recv_result(&self) -> Option<PoolOutput> {
        self.result_receiver.recv().ok()
    }

    /// Stops workers from starting items they have not picked up yet.
    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::SeqCst) {
            info!("Worker pool cancelled, in-flight items will finish");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn wait(self) {
        // Unblock workers waiting on a hand-off nobody will receive
        drop(self.result_receiver);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        debug!("All workers have stopped");
    }
}

fn run_worker<P: ItemProcessor>(
    worker_id: usize,
    processor: Arc<P>,
    item_receiver: Receiver<P::Item>,
    result_sender: Sender<PoolOutput>,
    cancel: Arc<AtomicBool>,
    context: ExecutionContext,
    on_dispatch: Option<DispatchHook>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if cancel.load(Ordering::SeqCst) {
            debug!("Worker {} saw cancellation", worker_id);
            break;
        }

        let item = match item_receiver.recv() {
            Ok(item) => item,
            Err(_) => break,
        };

        let item_ref = processor.item_ref(&item);
        if let Some(ref hook) = on_dispatch {
            hook(&item_ref);
        }
        debug!("Worker {} processing {}", worker_id, item_ref);

        let (result, escaped_error) = run_item(processor.as_ref(), &item, &item_ref, &context);

        let output = PoolOutput {
            item_ref,
            result,
            escaped_error,
        };
        if result_sender.send(output).is_err() {
            debug!("Worker {} result receiver dropped", worker_id);
            break;
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Runs one item on its own current-thread runtime, torn down afterwards.
fn run_item<P: ItemProcessor>(
    processor: &P,
    item: &P::Item,
    item_ref: &str,
    context: &ExecutionContext,
) -> (ItemResult, Option<String>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = CollaboratorError::new(Stage::Worker, format!("runtime unavailable: {}", e));
            return escaped(processor, item, item_ref, err);
        }
    };

    let outcome = runtime.block_on(AssertUnwindSafe(processor.process(item, context)).catch_unwind());

    match outcome {
        Ok(result) => (result, None),
        Err(panic) => {
            let err = CollaboratorError::new(
                Stage::Worker,
                format!("panicked: {}", panic_message(panic.as_ref())),
            );
            escaped(processor, item, item_ref, err)
        }
    }
}

fn escaped<P: ItemProcessor>(
    processor: &P,
    item: &P::Item,
    item_ref: &str,
    err: CollaboratorError,
) -> (ItemResult, Option<String>) {
    warn!("Item {} escaped processing: {}", item_ref, err);
    let message = format!("{}: {}", item_ref, err);
    (processor.escaped(item, &err), Some(message))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
