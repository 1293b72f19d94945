//! Design record - the serializable result of a search or verification run

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The only supported objective tag.
pub const OBJECTIVE_MINIMAX: &str = "minimax";

/// The only supported metric tag.
pub const METRIC_L2: &str = "l2";

/// A point-set design plus its claimed coverage radius and provenance.
///
/// Serialization is bit-compatible with the persisted corpus format:
/// keys `author`, `notes`, `objective`, `metric`, `domain`, `radius`, `X`.
/// Failure records carry only `radius` with a non-finite value; JSON cannot
/// represent IEEE infinity, so non-finite radii persist as `null` and parse
/// back from `null` or the strings `"inf"`/`"Infinity"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DesignRecord {
    /// Free-text author attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Free-text provenance notes (optimizer settings, seed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Objective tag; must equal [`OBJECTIVE_MINIMAX`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    /// Metric tag; must equal [`METRIC_L2`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// Domain tag resolvable by [`BoxDomain::from_tag`](crate::domain::BoxDomain::from_tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Claimed coverage radius; `+inf` marks a failed trial.
    #[serde(with = "radius_serde")]
    pub radius: f64,
    /// Design points, row per point.
    #[serde(rename = "X", default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Vec<f64>>,
}

impl DesignRecord {
    /// Create a record for a successful trial with the standard tags.
    #[must_use]
    pub fn new(
        author: impl Into<String>,
        domain_tag: impl Into<String>,
        radius: f64,
        points: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            author: Some(author.into()),
            notes: None,
            objective: Some(OBJECTIVE_MINIMAX.to_string()),
            metric: Some(METRIC_L2.to_string()),
            domain: Some(domain_tag.into()),
            radius,
            points,
        }
    }

    /// Attach provenance notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The failure marker record: `radius = +inf`, all other keys absent.
    #[must_use]
    pub fn failure() -> Self {
        Self {
            author: None,
            notes: None,
            objective: None,
            metric: None,
            domain: None,
            radius: f64::INFINITY,
            points: Vec::new(),
        }
    }

    /// Whether this record marks a failed trial.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.radius.is_finite()
    }

    /// Number of design points.
    #[must_use]
    pub fn size(&self) -> usize {
        self.points.len()
    }

    /// Check the objective/metric/domain tags against the supported set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRepositoryLayout`] for a missing or
    /// unsupported objective/metric, [`Error::InvalidDomainTag`] when the
    /// domain tag is absent (the tag's own validity is checked when it is
    /// resolved).
    pub fn validate_tags(&self) -> Result<()> {
        match self.objective.as_deref() {
            Some(OBJECTIVE_MINIMAX) => {}
            other => {
                return Err(Error::InvalidRepositoryLayout(format!(
                    "expected objective '{OBJECTIVE_MINIMAX}', got {other:?}"
                )))
            }
        }
        match self.metric.as_deref() {
            Some(METRIC_L2) => {}
            other => {
                return Err(Error::InvalidRepositoryLayout(format!(
                    "expected metric '{METRIC_L2}', got {other:?}"
                )))
            }
        }
        if self.domain.is_none() {
            return Err(Error::InvalidDomainTag("<missing>".to_string()));
        }
        Ok(())
    }
}

mod radius_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(radius: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if radius.is_finite() {
            serializer.serialize_f64(*radius)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(f64),
            Text(String),
            Null(()),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(v) => Ok(v),
            Repr::Null(()) => Ok(f64::INFINITY),
            Repr::Text(s) => match s.as_str() {
                "inf" | "Infinity" | "+inf" => Ok(f64::INFINITY),
                other => Err(D::Error::custom(format!("invalid radius value '{other}'"))),
            },
        }
    }
}
