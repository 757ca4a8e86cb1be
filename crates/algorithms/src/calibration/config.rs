//! Calibration parameters

use std::ops::Range;

use encal_core::{Error, Result};
use serde::Serialize;

use super::distances::RingGrouping;

/// Partition of the land-use classes by role.
///
/// Classes are laid out passive first, then active, then feature:
/// with 1 passive, 7 active and 2 feature classes, class 0 is passive,
/// classes 1..=7 are active and classes 8 and 9 are features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassRoles {
    /// Classes that cannot be the destination of a modelled transition
    pub passive: usize,
    /// Classes whose transition rules are calibrated
    pub active: usize,
    /// Structural classes excluded from calibration
    pub feature: usize,
}

impl ClassRoles {
    /// Roles for `classes` classes given the passive and feature counts
    pub fn from_counts(classes: usize, passive: usize, feature: usize) -> Result<Self> {
        let active = classes.checked_sub(passive + feature).ok_or_else(|| {
            Error::invalid_parameter(
                "roles",
                format!("passive={} feature={}", passive, feature),
                format!("more roles than the {} land-use classes", classes),
            )
        })?;
        Ok(Self {
            passive,
            active,
            feature,
        })
    }

    /// Total number of classes
    pub fn classes(&self) -> usize {
        self.passive + self.active + self.feature
    }

    /// Class indices of the active classes
    pub fn active_classes(&self) -> Range<usize> {
        self.passive..self.passive + self.active
    }

    /// Whether `class` is active
    pub fn is_active(&self, class: usize) -> bool {
        self.active_classes().contains(&class)
    }

    /// Fail unless the roles partition exactly `classes` classes
    pub fn validate(&self, classes: usize) -> Result<()> {
        if classes == 0 {
            return Err(Error::invalid_parameter(
                "classes",
                classes,
                "at least one land-use class is required",
            ));
        }
        if self.classes() != classes {
            return Err(Error::invalid_parameter(
                "roles",
                format!(
                    "passive={} active={} feature={}",
                    self.passive, self.active, self.feature
                ),
                format!("roles sum to {} but there are {} classes", self.classes(), classes),
            ));
        }
        Ok(())
    }
}

/// Policy turning z-scores and enrichment into attraction rules
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulePolicy {
    /// Significance limit on |z| (1.96 is the two-tailed 95% level)
    pub z_limit: f64,
    /// Ring indices examined, nearest ring is 0
    pub rings: Vec<usize>,
    /// Rings that must be significant for a rule to be set
    pub min_significant: usize,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            z_limit: 1.96,
            rings: vec![1, 2],
            min_significant: 2,
        }
    }
}

impl RulePolicy {
    pub fn validate(&self) -> Result<()> {
        if !self.z_limit.is_finite() || self.z_limit < 0.0 {
            return Err(Error::invalid_parameter(
                "z_limit",
                self.z_limit,
                "must be a finite non-negative number",
            ));
        }
        if self.min_significant == 0 {
            return Err(Error::invalid_parameter(
                "min_significant",
                self.min_significant,
                "at least one significant ring is required",
            ));
        }
        Ok(())
    }
}

/// Parameters for a calibration run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationParams {
    /// Number of land-use classes `K`
    pub classes: usize,
    /// Role partition of the classes
    pub roles: ClassRoles,
    /// Maximum neighbourhood radius in cells
    pub max_distance: usize,
    /// How offsets are grouped into rings
    pub grouping: RingGrouping,
    /// Rule derivation policy
    pub policy: RulePolicy,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            classes: 10,
            roles: ClassRoles {
                passive: 1,
                active: 7,
                feature: 2,
            },
            max_distance: 8,
            grouping: RingGrouping::Exact,
            policy: RulePolicy::default(),
        }
    }
}

impl CalibrationParams {
    /// Check every parameter before any table is built
    pub fn validate(&self) -> Result<()> {
        self.roles.validate(self.classes)?;
        if self.max_distance == 0 {
            return Err(Error::invalid_parameter(
                "max_distance",
                self.max_distance,
                "neighbourhood radius must be > 0",
            ));
        }
        self.policy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let params = CalibrationParams::default();
        params.validate().unwrap();
        assert_eq!(params.roles.active_classes(), 1..8);
        assert!(params.roles.is_active(7));
        assert!(!params.roles.is_active(8));
    }

    #[test]
    fn test_roles_must_sum_to_classes() {
        let mut params = CalibrationParams::default();
        params.classes = 9;
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter { name: "roles", .. })
        ));
    }

    #[test]
    fn test_zero_distance_rejected() {
        let params = CalibrationParams {
            max_distance: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter {
                name: "max_distance",
                ..
            })
        ));
    }

    #[test]
    fn test_from_counts() {
        let roles = ClassRoles::from_counts(10, 1, 2).unwrap();
        assert_eq!(roles.active, 7);
        assert!(ClassRoles::from_counts(2, 2, 1).is_err());
    }

    #[test]
    fn test_bad_z_limit() {
        let policy = RulePolicy {
            z_limit: f64::NAN,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }
}
