//! Single in-flight render dispatcher.
//!
//! Requests go through a bounded channel of capacity 1 to one worker task.
//! At most one render runs at a time, one more waits in the channel and
//! further submitters wait for a slot in submission order. A running render
//! cannot be cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::library::{FilterLibrary, LibraryLoader};
use crate::output::OutputRaster;
use crate::pipeline::{RenderRequest, Renderer};

#[derive(Debug)]
enum WorkerMessage {
    Render {
        request: Box<RenderRequest>,
        reply: oneshot::Sender<Result<OutputRaster>>,
    },
    Exit,
}

#[derive(Debug)]
pub struct RenderWorker {
    tx: mpsc::Sender<WorkerMessage>,
    task_handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Starts the worker task. Must be called inside a tokio runtime.
    pub fn new(library: Arc<FilterLibrary>) -> Self {
        let (tx, rx) = mpsc::channel::<WorkerMessage>(1);
        let renderer = Renderer::new(library);
        let task_handle = tokio::spawn(worker_loop(rx, renderer));
        info!("Render worker started");

        Self {
            tx,
            task_handle: Some(task_handle),
        }
    }

    /// Waits for `loader` and starts a worker on the loaded library.
    pub async fn load(loader: &LibraryLoader, timeout: Duration) -> Result<Self> {
        if !loader.wait_ready(timeout).await {
            return Err(Error::ResourceReadiness { timeout });
        }
        let library = loader
            .library()
            .ok_or(Error::ResourceReadiness { timeout })?;
        Ok(Self::new(library))
    }

    /// Queues `request` behind the in-flight render and waits for its result.
    pub async fn render(&self, request: RenderRequest) -> Result<OutputRaster> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(WorkerMessage::Render {
                request: Box::new(request),
                reply,
            })
            .await
            .map_err(|_| Error::DispatchConflict)?;

        result.await.map_err(|_| Error::DispatchConflict)?
    }

    /// Stops the worker once the queued renders are done.
    pub async fn exit(&mut self) {
        if self.tx.send(WorkerMessage::Exit).await.is_err() {
            debug!("Render worker already stopped");
        }
        if let Some(task_handle) = self.task_handle.take() {
            if let Err(err) = task_handle.await {
                error!("Render worker failed to join: {}", err);
            }
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        if self.task_handle.is_some() {
            warn!("RenderWorker dropped while still running; call RenderWorker::exit() first");
        }
    }
}

async fn worker_loop(mut rx: mpsc::Receiver<WorkerMessage>, renderer: Renderer) {
    let mut served = 0usize;

    while let Some(msg) = rx.recv().await {
        match msg {
            WorkerMessage::Exit => break,
            WorkerMessage::Render { request, reply } => {
                let renderer = renderer.clone();
                let joined =
                    tokio::task::spawn_blocking(move || renderer.render(&request)).await;
                served += 1;

                // A failed job drops `reply`, which the caller sees as a
                // dispatch conflict.
                let result = match joined {
                    Ok(result) => result,
                    Err(err) => {
                        error!("Render job {} failed: {}", served, err);
                        continue;
                    }
                };
                if let Err(err) = &result {
                    debug!("Render job {} returned error: {}", served, err);
                }
                if reply.send(result).is_err() {
                    warn!("Render job {} finished after its caller went away", served);
                }
            }
        }
    }

    info!("Render worker stopped after {} jobs", served);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderParams;
    use crate::density_map::DensityMap;
    use crate::error::ConfigError;
    use parking_lot::Mutex;

    fn request(seed: usize) -> RenderRequest {
        let values = (0..36).map(|i| ((i * (seed + 3)) % 7) as f32).collect();
        RenderRequest::new(
            DensityMap::new(6, 6, values).unwrap(),
            RenderParams {
                width: 12,
                height: 12,
                ..RenderParams::default()
            },
        )
    }

    #[tokio::test]
    async fn renders_match_direct_calls() {
        common::log_setup::setup_test_logging("debug");
        let library = Arc::new(FilterLibrary::load());
        let mut worker = RenderWorker::new(Arc::clone(&library));
        let renderer = Renderer::new(library);

        for seed in 0..3 {
            let expected = renderer.render(&request(seed)).unwrap();
            assert_eq!(worker.render(request(seed)).await.unwrap(), expected);
        }
        worker.exit().await;
    }

    #[tokio::test]
    async fn concurrent_submissions_complete_in_order() {
        let worker = Arc::new(RenderWorker::new(Arc::new(FilterLibrary::load())));
        let finished = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for seed in 0..4 {
            let worker = Arc::clone(&worker);
            let finished = Arc::clone(&finished);
            handles.push(tokio::spawn(async move {
                let raster = worker.render(request(seed)).await.unwrap();
                finished.lock().push(seed);
                raster
            }));
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*finished.lock(), vec![0, 1, 2, 3]);
        let mut worker = Arc::try_unwrap(worker).unwrap();
        worker.exit().await;
    }

    #[tokio::test]
    async fn errors_pass_through_and_worker_survives() {
        let mut worker = RenderWorker::new(Arc::new(FilterLibrary::load()));
        let mut bad = request(0);
        bad.params.width = 0;

        let err = worker.render(bad).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigError::EmptyOutput { .. })
        ));
        assert!(worker.render(request(1)).await.is_ok());
        worker.exit().await;
    }

    #[tokio::test]
    async fn render_after_exit_is_a_conflict() {
        let mut worker = RenderWorker::new(Arc::new(FilterLibrary::load()));
        worker.exit().await;
        assert!(matches!(
            worker.render(request(0)).await,
            Err(Error::DispatchConflict)
        ));
    }

    #[tokio::test]
    async fn load_waits_for_library() {
        let loader = LibraryLoader::spawn();
        let mut worker = RenderWorker::load(&loader, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(worker.render(request(2)).await.is_ok());
        worker.exit().await;
    }

    #[tokio::test]
    async fn load_times_out() {
        let loader = LibraryLoader::spawn_with(|| {
            std::thread::sleep(Duration::from_millis(300));
            FilterLibrary::load()
        });
        let err = RenderWorker::load(&loader, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceReadiness { .. }));
    }
}
