use std::fmt;

/// Errors that can occur during GPU context initialization and readback.
#[derive(Debug)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
    /// Waiting on the device failed.
    Poll(wgpu::PollError),
    /// A readback buffer could not be mapped.
    BufferMap(wgpu::BufferAsyncError),
    /// The map callback was dropped without reporting a result.
    ReadbackDropped,
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            Self::Poll(e) => write!(f, "device poll failed: {e}"),
            Self::BufferMap(e) => write!(f, "buffer map failed: {e}"),
            Self::ReadbackDropped => write!(f, "readback callback was dropped"),
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
            Self::Poll(e) => Some(e),
            Self::BufferMap(e) => Some(e),
            Self::ReadbackDropped => None,
        }
    }
}

/// Owns the core wgpu resources: device and queue. Post-processing runs in
/// compute passes, so no surface is needed.
pub struct RenderContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    /// Adapter the device came from, when known; its format features
    /// replace the WebGPU guarantees on downlevel backends.
    adapter: Option<wgpu::Adapter>,
}

impl RenderContext {
    /// Create a headless context on the default adapter.
    ///
    /// # Errors
    ///
    /// Returns `RenderContextError` if the adapter or device request fails.
    pub async fn new() -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::AdapterRequest)?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let required_features =
            adapter.features() & wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("framefx device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::DeviceRequest)?;

        Ok(Self {
            device,
            queue,
            adapter: Some(adapter),
        })
    }

    /// Blocking variant of [`RenderContext::new`].
    ///
    /// # Errors
    ///
    /// See [`RenderContext::new`].
    pub fn new_blocking() -> Result<Self, RenderContextError> {
        pollster::block_on(Self::new())
    }

    /// Wrap an externally-owned device and queue (embedding in a host
    /// renderer).
    #[must_use]
    pub const fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            adapter: None,
        }
    }

    /// Capabilities the device has for `format`.
    ///
    /// Mirrors the device's own check: adapter-specific features apply when
    /// they were enabled or the backend is not WebGPU compliant, otherwise
    /// only the guaranteed ones do. Without a known adapter the guaranteed
    /// features are reported.
    #[must_use]
    pub fn format_features(&self, format: wgpu::TextureFormat) -> wgpu::TextureFormatFeatures {
        let features = self.device.features();
        match &self.adapter {
            Some(adapter)
                if features.contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES)
                    || !adapter.get_downlevel_capabilities().is_webgpu_compliant() =>
            {
                adapter.get_texture_format_features(format)
            }
            _ => format.guaranteed_format_features(features),
        }
    }

    /// Whether compute kernels may bind `format` as a storage texture.
    #[must_use]
    pub fn supports_storage(&self, format: wgpu::TextureFormat) -> bool {
        self.format_features(format)
            .allowed_usages
            .contains(wgpu::TextureUsages::STORAGE_BINDING)
    }

    /// Largest 2D texture extent the device accepts.
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Create a new command encoder for recording GPU commands.
    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(label),
            })
    }

    /// Finish the encoder and submit its command buffer to the GPU queue.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) -> wgpu::SubmissionIndex {
        self.queue.submit(std::iter::once(encoder.finish()))
    }

    /// Block until all submitted work has finished.
    ///
    /// # Errors
    ///
    /// [`RenderContextError::Poll`] if the device is lost or times out.
    pub fn wait_idle(&self) -> Result<(), RenderContextError> {
        let _ = self
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(RenderContextError::Poll)?;
        Ok(())
    }
}
