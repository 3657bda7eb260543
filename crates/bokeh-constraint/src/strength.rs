//! Symbolic constraint strengths.

/// Constraint strength.
///
/// A strength folds three priority tiers (strong, medium, weak) into a
/// single number. Each tier is clamped to `[0, 1000]` and scaled into its own
/// magnitude band, so a higher tier always outweighs any combination of the
/// lower ones.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strength(f64);

impl Strength {
    /// A constraint that must be satisfied.
    pub const REQUIRED: Strength = Strength(1_001_001_000.0);
    /// The highest non-required tier, `create(1, 0, 0, 1)`.
    pub const STRONG: Strength = Strength(1_000_000.0);
    /// The middle tier, `create(0, 1, 0, 1)`.
    pub const MEDIUM: Strength = Strength(1_000.0);
    /// The lowest tier, `create(0, 0, 1, 1)`. Used for preferences.
    pub const WEAK: Strength = Strength(1.0);

    /// Create a strength from its three tier components and a weight.
    ///
    /// Use a weight of `1.0` for the plain tiers.
    pub fn create(strong: f64, medium: f64, weak: f64, weight: f64) -> Self {
        let tier = |x: f64| (x * weight).clamp(0.0, 1000.0);
        Self(tier(strong) * 1_000_000.0 + tier(medium) * 1_000.0 + tier(weak))
    }

    /// Clip a raw strength value into the legal range `[0, REQUIRED]`.
    pub fn clip(value: f64) -> Self {
        Self(value.clamp(0.0, Self::REQUIRED.0))
    }

    /// The folded numeric value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Check if this is a required strength.
    pub fn is_required(self) -> bool {
        self.0 >= Self::REQUIRED.0
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::REQUIRED
    }
}

impl From<f64> for Strength {
    fn from(value: f64) -> Self {
        Self::clip(value)
    }
}
