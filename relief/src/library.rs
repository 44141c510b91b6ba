//! Explicitly owned filter library handle.
//!
//! Holds the expanded colormap tables and a cache of Gaussian kernels. The
//! handle is built once, then shared by every render through an `Arc`.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use common::{Grid, ReadyGate};
use hashbrown::HashMap;
use parking_lot::Mutex;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::colormap::{Colormap, ColormapLut};
use crate::filters;

/// How long callers wait for the library by default.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Distinct kernels kept before the cache is flushed.
pub const KERNEL_CACHE_CAPACITY: usize = 64;

type KernelKey = (usize, u32);

#[derive(Debug)]
pub struct FilterLibrary {
    luts: HashMap<Colormap, ColormapLut>,
    kernels: Mutex<HashMap<KernelKey, Arc<[f32]>>>,
}

impl FilterLibrary {
    /// Builds every colormap table synchronously.
    pub fn load() -> Self {
        let start = Instant::now();
        let luts: HashMap<Colormap, ColormapLut> =
            Colormap::iter().map(|c| (c, c.lut())).collect();
        debug!(
            "Built {} colormap tables in {:?}",
            luts.len(),
            start.elapsed()
        );
        Self {
            luts,
            kernels: Mutex::new(HashMap::new()),
        }
    }

    pub fn lut(&self, colormap: Colormap) -> &ColormapLut {
        &self.luts[&colormap]
    }

    /// Normalized Gaussian kernel, built on first use.
    ///
    /// At most [`KERNEL_CACHE_CAPACITY`] kernels are held. A miss on a full
    /// cache clears it first.
    pub fn gaussian_kernel(&self, ksize: usize, sigma: f32) -> Arc<[f32]> {
        let key = (ksize, sigma.to_bits());
        let mut kernels = self.kernels.lock();
        if kernels.len() >= KERNEL_CACHE_CAPACITY && !kernels.contains_key(&key) {
            debug!("Kernel cache full ({} entries), clearing", kernels.len());
            kernels.clear();
        }
        kernels
            .entry(key)
            .or_insert_with(|| filters::gaussian_kernel(ksize, sigma).into())
            .clone()
    }

    pub fn gaussian_blur(&self, input: &Grid<f32>, ksize: usize, sigma: f32) -> Grid<f32> {
        let kernel = self.gaussian_kernel(ksize, sigma);
        filters::convolve_separable(input, &kernel)
    }

    pub(crate) fn cached_kernels(&self) -> usize {
        self.kernels.lock().len()
    }
}

/// Builds a [`FilterLibrary`] in the background and lets async callers wait
/// for it.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    library: Arc<OnceLock<Arc<FilterLibrary>>>,
    gate: ReadyGate,
}

impl LibraryLoader {
    /// Starts loading on the blocking pool. Must be called inside a tokio
    /// runtime.
    pub fn spawn() -> Self {
        Self::spawn_with(FilterLibrary::load)
    }

    pub(crate) fn spawn_with<F>(build: F) -> Self
    where
        F: FnOnce() -> FilterLibrary + Send + 'static,
    {
        let loader = Self {
            library: Arc::new(OnceLock::new()),
            gate: ReadyGate::new(),
        };
        tokio::task::spawn_blocking({
            let loader = loader.clone();
            move || {
                let library = Arc::new(build());
                if loader.library.set(library).is_err() {
                    warn!("Filter library was already loaded");
                }
                loader.gate.signal();
                info!("Filter library ready");
            }
        });
        loader
    }

    /// Waits until the library is loaded or `timeout` elapses. Returns
    /// whether it is ready.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let ready = self.gate.wait_timeout(timeout).await;
        if !ready {
            warn!("Filter library not ready after {:?}", timeout);
        }
        ready
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// The loaded library, if loading has finished.
    pub fn library(&self) -> Option<Arc<FilterLibrary>> {
        self.library.get().cloned()
    }
}
