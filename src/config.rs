//src/config.rs

use crate::error::LcaError;

/// Default percentage-point window below the best hit (eDNAFlow's value).
pub const DEFAULT_CUTOFF: f64 = 1.0;

/// Default percent-identity floor: keep every hit.
pub const DEFAULT_MIN_PIDENT: f64 = 0.0;

/// Where a match that only carries an order (no family) is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderKeyPolicy {
    /// Index under the order name.
    #[default]
    ByOrder,
    /// Index under the (empty) family name, reproducing older outputs.
    /// Every order-only match then shares a single key.
    LegacyFamilyKey,
}

/// Run-wide settings for one LCA calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct LcaConfig {
    /// Window tolerance in percentage points, shared by every rank.
    pub cutoff: f64,
    /// Hits below this percent identity never reach the grouper.
    pub min_pident: f64,
    pub order_key: OrderKeyPolicy,
}

impl Default for LcaConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            min_pident: DEFAULT_MIN_PIDENT,
            order_key: OrderKeyPolicy::default(),
        }
    }
}

impl LcaConfig {
    pub fn validate(&self) -> Result<(), LcaError> {
        if !(0.0..=100.0).contains(&self.min_pident) {
            return Err(LcaError::InvalidPidentFloor(self.min_pident));
        }
        if !self.cutoff.is_finite() || self.cutoff < 0.0 {
            return Err(LcaError::InvalidCutoff(self.cutoff));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LcaConfig::default();
        assert_eq!(config.cutoff, 1.0);
        assert_eq!(config.min_pident, 0.0);
        assert_eq!(config.order_key, OrderKeyPolicy::ByOrder);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn floor_outside_percent_range_is_rejected() {
        for bad in [-0.1, 100.5, f64::NAN] {
            let config = LcaConfig { min_pident: bad, ..LcaConfig::default() };
            assert!(matches!(config.validate(), Err(LcaError::InvalidPidentFloor(_))));
        }
        let edge = LcaConfig { min_pident: 100.0, ..LcaConfig::default() };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn negative_cutoff_is_rejected() {
        let config = LcaConfig { cutoff: -1.0, ..LcaConfig::default() };
        assert!(matches!(config.validate(), Err(LcaError::InvalidCutoff(_))));
        let zero = LcaConfig { cutoff: 0.0, ..LcaConfig::default() };
        assert!(zero.validate().is_ok());
    }
}
