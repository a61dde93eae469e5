//! Per-camera frame settings and their explicit override records.
//!
//! A camera starts from a default [`FrameSettings`] and applies an optional
//! [`FrameSettingsOverrides`]. MSAA availability is computed once, after
//! overrides are applied, by [`msaa_available`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Shading path the scene was rendered with.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum LitShaderMode {
    /// Single-pass forward shading; compatible with MSAA.
    Forward,
    /// G-buffer shading; cannot be multisampled.
    #[default]
    Deferred,
}

/// Resolved per-camera toggles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrameSettings {
    /// Shading path the scene used.
    pub lit_shader_mode: LitShaderMode,
    /// Whether the camera renders with MSAA. Only meaningful after
    /// [`FrameSettings::resolve`].
    pub msaa: bool,
    /// When false the pipeline only copies the source to the destination.
    pub post_process: bool,
    /// When false exposure is pinned to a neutral value.
    pub exposure_control: bool,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            lit_shader_mode: LitShaderMode::Deferred,
            msaa: false,
            post_process: true,
            exposure_control: true,
        }
    }
}

/// Per-field overrides. `None` keeps the base value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrameSettingsOverrides {
    /// Replaces [`FrameSettings::lit_shader_mode`].
    pub lit_shader_mode: Option<LitShaderMode>,
    /// Replaces [`FrameSettings::msaa`].
    pub msaa: Option<bool>,
    /// Replaces [`FrameSettings::post_process`].
    pub post_process: Option<bool>,
    /// Replaces [`FrameSettings::exposure_control`].
    pub exposure_control: Option<bool>,
}

impl FrameSettingsOverrides {
    /// Whether no field is overridden.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lit_shader_mode.is_none()
            && self.msaa.is_none()
            && self.post_process.is_none()
            && self.exposure_control.is_none()
    }
}

/// What the render pipeline and view can support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderCaps {
    /// The pipeline asset was built with MSAA support.
    pub supports_msaa: bool,
    /// The view is drawn in wireframe.
    pub wireframe: bool,
}

impl Default for RenderCaps {
    fn default() -> Self {
        Self {
            supports_msaa: true,
            wireframe: false,
        }
    }
}

/// Whether MSAA can be used for already-overridden `settings`.
///
/// Evaluated in a fixed order: requested, asset support, lit shader mode,
/// wireframe.
#[must_use]
pub const fn msaa_available(settings: &FrameSettings, caps: RenderCaps) -> bool {
    settings.msaa
        && caps.supports_msaa
        && matches!(settings.lit_shader_mode, LitShaderMode::Forward)
        && !caps.wireframe
}

impl FrameSettings {
    /// Copy of `self` with every `Some` field of `overrides` applied.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &FrameSettingsOverrides) -> Self {
        if let Some(mode) = overrides.lit_shader_mode {
            self.lit_shader_mode = mode;
        }
        if let Some(msaa) = overrides.msaa {
            self.msaa = msaa;
        }
        if let Some(post_process) = overrides.post_process {
            self.post_process = post_process;
        }
        if let Some(exposure_control) = overrides.exposure_control {
            self.exposure_control = exposure_control;
        }
        self
    }

    /// Apply `overrides`, then gate MSAA on `caps`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnsupportedShadingMode`] when the overrides explicitly
    /// request MSAA while the resulting lit shader mode is deferred. A base
    /// profile asking for MSAA with deferred shading is silently downgraded.
    pub fn resolve(
        &self,
        overrides: &FrameSettingsOverrides,
        caps: RenderCaps,
    ) -> Result<Self, ConfigError> {
        let mut resolved = self.with_overrides(overrides);
        if overrides.msaa == Some(true)
            && resolved.lit_shader_mode == LitShaderMode::Deferred
        {
            return Err(ConfigError::UnsupportedShadingMode {
                lit_shader_mode: resolved.lit_shader_mode,
            });
        }
        let msaa = msaa_available(&resolved, caps);
        if resolved.msaa && !msaa {
            log::debug!(
                "MSAA requested but unavailable (asset support: {}, lit: {:?}, wireframe: {})",
                caps.supports_msaa,
                resolved.lit_shader_mode,
                caps.wireframe
            );
        }
        resolved.msaa = msaa;
        Ok(resolved)
    }
}
