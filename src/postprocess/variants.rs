//! Feature-flag kernel selection for the combined uber pass.
//!
//! Every combination of optional uber effects maps to one precompiled kernel
//! variant so the uber shader never branches on "is this effect enabled".
//! Combinations are registered up front; selecting one that was never
//! registered is a configuration error rather than a silent fallback.

use std::fmt;

use crate::error::ConfigError;

/// Optional effects folded into the uber pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UberFeature {
    /// White balance, contrast, saturation, lift/gamma/gain, tonemapping.
    ColorGrading,
    /// Barrel / pincushion lens distortion.
    LensDistortion,
    /// Spectral chromatic aberration.
    ChromaticAberration,
    /// Procedural vignette.
    Vignette,
}

impl UberFeature {
    /// All features in bit order.
    pub const ALL: [Self; 4] = [
        Self::ColorGrading,
        Self::LensDistortion,
        Self::ChromaticAberration,
        Self::Vignette,
    ];

    /// Number of features (`n` in the `2^n` variant count).
    pub const COUNT: usize = Self::ALL.len();

    /// Bit this feature occupies in a [`FeatureFlags`] set.
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::ColorGrading => 1 << 0,
            Self::LensDistortion => 1 << 1,
            Self::ChromaticAberration => 1 << 2,
            Self::Vignette => 1 << 3,
        }
    }

    /// Shader define enabling this feature in the uber WGSL source.
    #[must_use]
    pub const fn shader_def(self) -> &'static str {
        match self {
            Self::ColorGrading => "COLOR_GRADING",
            Self::LensDistortion => "LENS_DISTORTION",
            Self::ChromaticAberration => "CHROMATIC_ABERRATION",
            Self::Vignette => "VIGNETTE",
        }
    }

    /// Lower-case name for logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ColorGrading => "color_grading",
            Self::LensDistortion => "lens_distortion",
            Self::ChromaticAberration => "chromatic_aberration",
            Self::Vignette => "vignette",
        }
    }
}

/// Bitset over [`UberFeature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureFlags(u32);

impl FeatureFlags {
    /// No optional effects.
    pub const NONE: Self = Self(0);
    /// Every optional effect.
    pub const ALL: Self = Self((1 << UberFeature::COUNT) - 1);
    /// Number of distinct combinations.
    pub const COMBINATIONS: usize = 1 << UberFeature::COUNT;

    /// Build a set from raw bits, dropping bits outside the known features.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether no feature is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether `feature` is set.
    #[must_use]
    pub const fn contains(self, feature: UberFeature) -> bool {
        self.0 & feature.bit() != 0
    }

    /// Set `feature`.
    pub fn insert(&mut self, feature: UberFeature) {
        self.0 |= feature.bit();
    }

    /// Copy of this set with `feature` added.
    #[must_use]
    pub const fn with(self, feature: UberFeature) -> Self {
        Self(self.0 | feature.bit())
    }

    /// Features in this set, in bit order.
    pub fn iter(self) -> impl Iterator<Item = UberFeature> {
        UberFeature::ALL
            .into_iter()
            .filter(move |feature| self.contains(*feature))
    }

    /// Every combination, ordered by raw bits.
    pub fn all_combinations() -> impl Iterator<Item = Self> {
        (0..Self::COMBINATIONS as u32).map(Self)
    }

    /// Shader defines enabling this set's features.
    #[must_use]
    pub fn shader_defs(self) -> Vec<&'static str> {
        self.iter().map(UberFeature::shader_def).collect()
    }
}

impl From<UberFeature> for FeatureFlags {
    fn from(feature: UberFeature) -> Self {
        Self(feature.bit())
    }
}

impl FromIterator<UberFeature> for FeatureFlags {
    fn from_iter<I: IntoIterator<Item = UberFeature>>(iter: I) -> Self {
        let mut flags = Self::NONE;
        for feature in iter {
            flags.insert(feature);
        }
        flags
    }
}

impl fmt::Display for FeatureFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for feature in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(feature.name())?;
            first = false;
        }
        Ok(())
    }
}

/// Identifier of a precompiled uber kernel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId(u32);

impl KernelId {
    /// Dense index, usable to address per-variant tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Maps feature combinations to registered kernel variants.
///
/// Lookup is a single index into a dense table addressed by the flag bits.
#[derive(Debug, Clone)]
pub struct KernelSelector {
    table: [Option<KernelId>; FeatureFlags::COMBINATIONS],
    registered: Vec<FeatureFlags>,
}

impl Default for KernelSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelSelector {
    /// Empty selector; nothing is selectable until registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: [None; FeatureFlags::COMBINATIONS],
            registered: Vec::new(),
        }
    }

    /// Selector with every combination registered.
    #[must_use]
    pub fn with_all_variants() -> Self {
        let mut selector = Self::new();
        selector.register_all();
        selector
    }

    /// Register a combination, returning its kernel id. Registering the same
    /// combination twice returns the id assigned the first time.
    pub fn register(&mut self, flags: FeatureFlags) -> KernelId {
        let slot = &mut self.table[flags.bits() as usize];
        if let Some(id) = *slot {
            return id;
        }
        let id = KernelId(self.registered.len() as u32);
        *slot = Some(id);
        self.registered.push(flags);
        id
    }

    /// Register all `2^n` combinations.
    pub fn register_all(&mut self) {
        for flags in FeatureFlags::all_combinations() {
            let _ = self.register(flags);
        }
    }

    /// Kernel registered for `flags`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredVariant`] when `flags` was never
    /// registered.
    pub fn select(&self, flags: FeatureFlags) -> Result<KernelId, ConfigError> {
        self.table[flags.bits() as usize].ok_or(ConfigError::UnregisteredVariant(flags))
    }

    /// Registered `(flags, kernel)` pairs in registration order.
    pub fn registered(&self) -> impl Iterator<Item = (FeatureFlags, KernelId)> + '_ {
        self.registered
            .iter()
            .enumerate()
            .map(|(index, flags)| (*flags, KernelId(index as u32)))
    }

    /// Number of registered variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}
