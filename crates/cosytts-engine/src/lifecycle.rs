//! Model lifecycle: one loaded engine per slot, loaded lazily under a lock.
//!
//! An [`EngineSlot`] holds at most one [`EngineHandle`]. Every
//! [`ModelLifecycle`] sharing a slot shares its lock, so concurrent loads
//! build the engine once and everyone observes the same `Arc`.
//!
//! Unloading drops only the slot's reference. Callers that are mid-inference
//! keep their own `Arc` alive; unloading during inference is still a misuse,
//! since the device memory is reclaimed right after.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use cosytts_core::{
    Device, DevicePolicy, FrontEnd, ModelConfig, ModelFactory, ModelLayout, Precision,
    SamplingParams, SpeechModel,
};

use crate::error::SynthesisError;
use crate::strategy::StrategyPlan;

/// Process-wide slot for callers that do not manage their own.
static SHARED_SLOT: LazyLock<Arc<EngineSlot>> = LazyLock::new(|| Arc::new(EngineSlot::new()));

/// A loaded speech model paired with its front-end.
pub struct EngineHandle {
    model: Box<dyn SpeechModel>,
    frontend: Box<dyn FrontEnd>,
    model_dir: PathBuf,
    device: Device,
    precision: Precision,
}

impl EngineHandle {
    /// Capability flag reported by the front-end.
    pub fn instruct(&self) -> bool {
        self.frontend.instruct()
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub const fn device(&self) -> Device {
        self.device
    }

    pub const fn precision(&self) -> Precision {
        self.precision
    }

    pub fn frontend(&self) -> &dyn FrontEnd {
        self.frontend.as_ref()
    }

    /// Run `plan` over `texts` and concatenate the waveforms.
    ///
    /// The mode guard runs before any front-end or model call.
    pub fn infer(
        &self,
        plan: &StrategyPlan,
        texts: &[&str],
        sampling: &SamplingParams,
    ) -> Result<Vec<f32>, SynthesisError> {
        plan.check_mode(self.instruct(), &self.model_dir)?;

        let mut waveform = Vec::new();
        for text in texts {
            let mut input = plan.model_input(self.frontend(), text)?;
            input.sampling = *sampling;
            waveform.extend(self.model.inference(input)?);
        }
        Ok(waveform)
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("model_dir", &self.model_dir)
            .field("device", &self.device)
            .field("precision", &self.precision)
            .field("instruct", &self.instruct())
            .finish_non_exhaustive()
    }
}

/// Holder for at most one loaded engine.
#[derive(Debug, Default)]
pub struct EngineSlot {
    handle: Mutex<Option<Arc<EngineHandle>>>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide slot.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_SLOT)
    }

    /// The loaded handle, if any, without loading.
    pub fn current(&self) -> Option<Arc<EngineHandle>> {
        self.lock().clone()
    }

    // A panic while loading leaves the slot empty, which is a valid state.
    fn lock(&self) -> MutexGuard<'_, Option<Arc<EngineHandle>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Loads and unloads the engine held in an [`EngineSlot`].
pub struct ModelLifecycle {
    slot: Arc<EngineSlot>,
    factory: Arc<dyn ModelFactory>,
    devices: Arc<dyn DevicePolicy>,
    layout: ModelLayout,
    model_id: String,
    instruct: bool,
}

impl ModelLifecycle {
    pub fn new(
        slot: Arc<EngineSlot>,
        factory: Arc<dyn ModelFactory>,
        devices: Arc<dyn DevicePolicy>,
        model_dir: impl Into<PathBuf>,
        model_id: impl Into<String>,
        instruct: bool,
    ) -> Self {
        Self {
            slot,
            factory,
            devices,
            layout: ModelLayout::new(model_dir),
            model_id: model_id.into(),
            instruct,
        }
    }

    pub fn model_dir(&self) -> &Path {
        self.layout.dir()
    }

    pub fn slot(&self) -> &Arc<EngineSlot> {
        &self.slot
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.current().is_some()
    }

    /// Return the loaded engine, loading it first if needed.
    ///
    /// The slot lock is held for the whole load, so concurrent callers wait
    /// and then receive the handle the first caller built.
    pub fn load(&self) -> Result<Arc<EngineHandle>, SynthesisError> {
        let mut slot = self.slot.lock();
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(self.build()?);
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Drop the loaded engine and reclaim device memory.
    pub fn unload(&self) {
        let mut slot = self.slot.lock();
        if slot.take().is_some() {
            self.devices.reclaim_memory();
            tracing::info!(dir = %self.model_dir().display(), "CosyVoice model unloaded");
        }
    }

    /// Per-session reset hook. The engine keeps no session state.
    #[allow(clippy::unused_self)]
    pub fn reset(&self) {
        tracing::trace!("Lifecycle reset requested");
    }

    fn build(&self) -> Result<EngineHandle, SynthesisError> {
        let dir = self.layout.dir().to_path_buf();
        let device = self.devices.device_for(&self.model_id);
        let precision = self.devices.precision();

        tracing::info!(
            dir = %dir.display(),
            model_id = %self.model_id,
            %device,
            %precision,
            instruct = self.instruct,
            "Loading CosyVoice model"
        );

        self.layout.verify()?;

        let init_err = |e| SynthesisError::initialization(&dir, e);

        let config = ModelConfig::read(&self.layout.config()).map_err(init_err)?;

        let mut frontend = self
            .factory
            .frontend(&config, &self.layout.frontend_assets(self.instruct))
            .map_err(init_err)?;
        frontend.bind_device(device);

        let mut model = self.factory.speech_model(&config).map_err(init_err)?;
        model.bind_device(device);
        model
            .load_weights(&self.layout.weights())
            .map_err(init_err)?;
        model.to_device(device, precision).map_err(init_err)?;

        self.devices.reclaim_memory();

        tracing::info!(dir = %dir.display(), %device, "CosyVoice model loaded successfully");

        Ok(EngineHandle {
            model,
            frontend,
            model_dir: dir,
            device,
            precision,
        })
    }
}

impl fmt::Debug for ModelLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLifecycle")
            .field("model_dir", &self.layout.dir())
            .field("model_id", &self.model_id)
            .field("instruct", &self.instruct)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}
