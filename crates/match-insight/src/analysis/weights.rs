use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

pub const MIN_WEIGHT: f64 = 0.1;
pub const MAX_WEIGHT: f64 = 3.0;

/// Scale used when comparing weights; values equal to four decimals compare equal.
const EQUALITY_SCALE: f64 = 10_000.0;

/// Normalizes a raw weight into `[MIN_WEIGHT, MAX_WEIGHT]`, rounded to two decimals.
///
/// Missing, non-finite, zero, and negative inputs yield `None`.
pub fn clamp_weight(value: Option<f64>) -> Option<f64> {
    let value = value?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    let clamped = value.clamp(MIN_WEIGHT, MAX_WEIGHT);
    Some((clamped * 100.0).round() / 100.0)
}

/// Trims criterion names and drops blank names or values that do not clamp.
///
/// Returns `None` instead of an empty map.
pub fn sanitize_custom_criteria(criteria: &BTreeMap<String, f64>) -> Option<BTreeMap<String, f64>> {
    let sanitized: BTreeMap<String, f64> = criteria
        .iter()
        .filter_map(|(name, value)| {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            clamp_weight(Some(*value)).map(|weight| (name.to_string(), weight))
        })
        .collect();

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Partial, loosely typed weighting input (saved preferences or request overrides).
///
/// Values are kept raw; numbers encoded as strings are accepted and anything else
/// non-numeric is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightInput {
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub skills: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub experience: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub education: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub requirements: Option<f64>,
    #[serde(default, deserialize_with = "lenient_criteria", skip_serializing_if = "Option::is_none")]
    pub custom_criteria: Option<BTreeMap<String, f64>>,
}

impl WeightInput {
    /// Keeps only the values that survive clamping; `None` when nothing usable remains.
    pub fn cleaned(&self) -> Option<WeightInput> {
        let cleaned = WeightInput {
            skills: clamp_weight(self.skills),
            experience: clamp_weight(self.experience),
            education: clamp_weight(self.education),
            requirements: clamp_weight(self.requirements),
            custom_criteria: self
                .custom_criteria
                .as_ref()
                .and_then(sanitize_custom_criteria),
        };

        if cleaned == WeightInput::default() {
            None
        } else {
            Some(cleaned)
        }
    }
}

impl From<&WeightSet> for WeightInput {
    fn from(value: &WeightSet) -> Self {
        Self {
            skills: Some(value.skills),
            experience: Some(value.experience),
            education: Some(value.education),
            requirements: Some(value.requirements),
            custom_criteria: value.custom_criteria.clone(),
        }
    }
}

fn number_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number_from_json))
}

fn lenient_criteria<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Object(entries)) = raw else {
        return Ok(None);
    };

    let criteria: BTreeMap<String, f64> = entries
        .iter()
        .filter_map(|(name, value)| number_from_json(value).map(|weight| (name.clone(), weight)))
        .collect();
    Ok(Some(criteria))
}

/// Normalized weighting configuration recorded alongside every job-match result.
///
/// Instances only come out of [`WeightModel`] or [`WeightSet::from_stored`], so every
/// field is already clamped. Equality ignores precision past four decimals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSet {
    skills: f64,
    experience: f64,
    education: f64,
    requirements: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_criteria: Option<BTreeMap<String, f64>>,
}

impl WeightSet {
    pub fn skills(&self) -> f64 {
        self.skills
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn education(&self) -> f64 {
        self.education
    }

    pub fn requirements(&self) -> f64 {
        self.requirements
    }

    pub fn custom_criteria(&self) -> Option<&BTreeMap<String, f64>> {
        self.custom_criteria.as_ref()
    }

    /// Decodes a persisted `weights_used` blob. Malformed blobs decode to `None`.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let input = WeightInput::deserialize(value).ok()?;
        Some(Self {
            skills: clamp_weight(input.skills)?,
            experience: clamp_weight(input.experience)?,
            education: clamp_weight(input.education)?,
            requirements: clamp_weight(input.requirements)?,
            custom_criteria: input
                .custom_criteria
                .as_ref()
                .and_then(sanitize_custom_criteria),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "skills": self.skills,
            "experience": self.experience,
            "education": self.education,
            "requirements": self.requirements,
        });

        if let (Some(criteria), Value::Object(fields)) = (&self.custom_criteria, &mut value) {
            let entries: Map<String, Value> = criteria
                .iter()
                .map(|(name, weight)| (name.clone(), json!(weight)))
                .collect();
            fields.insert("customCriteria".to_string(), Value::Object(entries));
        }

        value
    }
}

impl PartialEq for WeightSet {
    fn eq(&self, other: &Self) -> bool {
        weights_equal(self, other)
    }
}

fn scaled(value: f64) -> i64 {
    (value * EQUALITY_SCALE).round() as i64
}

/// Structural equality after rounding to four decimals with criteria compared by name.
pub fn weights_equal(a: &WeightSet, b: &WeightSet) -> bool {
    let named = [
        (a.skills, b.skills),
        (a.experience, b.experience),
        (a.education, b.education),
        (a.requirements, b.requirements),
    ];
    if named.iter().any(|(left, right)| scaled(*left) != scaled(*right)) {
        return false;
    }

    let empty = BTreeMap::new();
    let left = a.custom_criteria.as_ref().unwrap_or(&empty);
    let right = b.custom_criteria.as_ref().unwrap_or(&empty);

    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|((left_name, left_weight), (right_name, right_weight))| {
                left_name == right_name && scaled(*left_weight) == scaled(*right_weight)
            })
}

/// Baseline weights injected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultWeights {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub requirements: f64,
}

impl Default for DefaultWeights {
    fn default() -> Self {
        Self {
            skills: 1.0,
            experience: 1.0,
            education: 1.0,
            requirements: 1.0,
        }
    }
}

/// Validates, merges, and compares weighting configurations against injected defaults.
#[derive(Debug, Clone)]
pub struct WeightModel {
    defaults: WeightSet,
}

impl Default for WeightModel {
    fn default() -> Self {
        Self::new(DefaultWeights::default())
    }
}

impl WeightModel {
    pub fn new(defaults: DefaultWeights) -> Self {
        let normalize = |value: f64| clamp_weight(Some(value)).unwrap_or(1.0);
        Self {
            defaults: WeightSet {
                skills: normalize(defaults.skills),
                experience: normalize(defaults.experience),
                education: normalize(defaults.education),
                requirements: normalize(defaults.requirements),
                custom_criteria: None,
            },
        }
    }

    pub fn defaults(&self) -> &WeightSet {
        &self.defaults
    }

    /// Turns a partial override into a full set, falling back to defaults per field.
    ///
    /// Returns `None` when the input carries no usable value at all so callers can
    /// fall through to the next weight source.
    ///
    /// Request resolution layers the partial [`WeightInput::cleaned`] form through
    /// [`WeightModel::merge`] instead, so fields an override leaves out keep the saved
    /// preference rather than being reset to the defaults this fills in.
    pub fn sanitize(&self, input: &WeightInput) -> Option<WeightSet> {
        let cleaned = input.cleaned()?;
        Some(WeightSet {
            skills: cleaned.skills.unwrap_or(self.defaults.skills),
            experience: cleaned.experience.unwrap_or(self.defaults.experience),
            education: cleaned.education.unwrap_or(self.defaults.education),
            requirements: cleaned.requirements.unwrap_or(self.defaults.requirements),
            custom_criteria: cleaned.custom_criteria,
        })
    }

    /// Layers `preference` and then `overrides` over `base`, field by field.
    ///
    /// Custom criteria merge by name with later sources winning. A merge where every
    /// value ends up non-positive resets to the defaults; otherwise individual fields
    /// that fail to clamp take the default for that field.
    pub fn merge(
        &self,
        base: &WeightSet,
        preference: Option<&WeightInput>,
        overrides: Option<&WeightInput>,
    ) -> WeightSet {
        let mut skills = base.skills;
        let mut experience = base.experience;
        let mut education = base.education;
        let mut requirements = base.requirements;
        let mut criteria = base.custom_criteria.clone().unwrap_or_default();

        for source in [preference, overrides].into_iter().flatten() {
            if let Some(value) = source.skills {
                skills = value;
            }
            if let Some(value) = source.experience {
                experience = value;
            }
            if let Some(value) = source.education {
                education = value;
            }
            if let Some(value) = source.requirements {
                requirements = value;
            }
            if let Some(entries) = &source.custom_criteria {
                for (name, value) in entries {
                    criteria.insert(name.trim().to_string(), *value);
                }
            }
        }

        let degenerate = [skills, experience, education, requirements]
            .iter()
            .chain(criteria.values())
            .all(|value| !(value.is_finite() && *value > 0.0));
        if degenerate {
            return self.defaults.clone();
        }

        WeightSet {
            skills: clamp_weight(Some(skills)).unwrap_or(self.defaults.skills),
            experience: clamp_weight(Some(experience)).unwrap_or(self.defaults.experience),
            education: clamp_weight(Some(education)).unwrap_or(self.defaults.education),
            requirements: clamp_weight(Some(requirements)).unwrap_or(self.defaults.requirements),
            custom_criteria: sanitize_custom_criteria(&criteria),
        }
    }
}
