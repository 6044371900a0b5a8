use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ArtifactError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibratorType {
    PiecewiseLinear,
}

impl fmt::Display for CalibratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibratorType::PiecewiseLinear => write!(f, "piecewise_linear"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub x: f32,
    pub y: f32,
}

/// A validated calibration artifact for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub entity: String,
    pub version: String,
    pub calibrator_type: CalibratorType,
    /// Sorted ascending by `x`, at least two points.
    pub breakpoints: Vec<Breakpoint>,
    pub required_features: Vec<String>,
}

impl CalibrationModel {
    /// Parse and validate artifact JSON.
    ///
    /// Accepted shape:
    /// `{"entity": "total", "version": "v3", "type": "piecewise_linear",
    ///   "breakpoints": [[0.0, 0.0], [0.6, 0.45], [1.0, 0.97]],
    ///   "required_features": ["winner_margin"]}`.
    /// Breakpoints may also be `{"x": .., "y": ..}` objects.
    pub fn from_json(text: &str) -> Result<Self, ArtifactError> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| ArtifactError::Schema(format!("not valid JSON: {e}")))?;
        let obj = root
            .as_object()
            .ok_or_else(|| ArtifactError::Schema("artifact must be a JSON object".into()))?;

        let entity = required_str(obj, "entity")?;
        let version = match obj.get("version") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ArtifactError::Schema("missing field 'version'".into())),
        };

        let type_str = obj
            .get("type")
            .or_else(|| obj.get("calibrator_type"))
            .and_then(Value::as_str)
            .ok_or_else(|| ArtifactError::Schema("missing field 'type'".into()))?;
        let calibrator_type = match type_str {
            "piecewise_linear" => CalibratorType::PiecewiseLinear,
            other => {
                return Err(ArtifactError::Schema(format!(
                    "unsupported calibrator type '{other}'"
                )))
            }
        };

        let raw_points = obj
            .get("breakpoints")
            .and_then(Value::as_array)
            .ok_or_else(|| ArtifactError::Schema("missing field 'breakpoints'".into()))?;
        if raw_points.len() < 2 {
            return Err(ArtifactError::Schema(format!(
                "need at least 2 breakpoints, found {}",
                raw_points.len()
            )));
        }
        let mut breakpoints = raw_points
            .iter()
            .enumerate()
            .map(|(i, p)| parse_breakpoint(p).ok_or_else(|| {
                ArtifactError::Schema(format!("malformed breakpoint at index {i}: {p}"))
            }))
            .collect::<Result<Vec<_>, _>>()?;
        breakpoints.sort_by(|a, b| a.x.total_cmp(&b.x));

        let required_features = match obj.get("required_features") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        ArtifactError::Schema("required_features must be strings".into())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ArtifactError::Schema(
                    "required_features must be a list".into(),
                ))
            }
        };

        Ok(CalibrationModel {
            entity,
            version,
            calibrator_type,
            breakpoints,
            required_features,
        })
    }

    /// Map a raw confidence through the curve. Input and output are clamped to `[0, 1]`;
    /// inputs outside the breakpoint range take the nearest boundary `y`.
    pub fn apply(&self, raw: f32) -> f32 {
        let x = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
        let (Some(first), Some(last)) = (self.breakpoints.first(), self.breakpoints.last()) else {
            return x;
        };

        let y = if x <= first.x {
            first.y
        } else if x >= last.x {
            last.y
        } else {
            self.breakpoints
                .windows(2)
                .find(|w| x >= w[0].x && x < w[1].x)
                .map(|w| interpolate(w[0], w[1], x))
                .unwrap_or(last.y)
        };
        y.clamp(0.0, 1.0)
    }
}

fn interpolate(a: Breakpoint, b: Breakpoint, x: f32) -> f32 {
    let span = b.x - a.x;
    if span <= f32::EPSILON {
        return a.y;
    }
    a.y + (x - a.x) * (b.y - a.y) / span
}

fn required_str(obj: &serde_json::Map<String, Value>, key: &str) -> Result<String, ArtifactError> {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(ArtifactError::Schema(format!("missing field '{key}'"))),
    }
}

fn parse_breakpoint(v: &Value) -> Option<Breakpoint> {
    let (x, y) = match v {
        Value::Array(pair) if pair.len() == 2 => (pair[0].as_f64()?, pair[1].as_f64()?),
        Value::Object(o) => (o.get("x")?.as_f64()?, o.get("y")?.as_f64()?),
        _ => return None,
    };
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some(Breakpoint { x: x as f32, y: y as f32 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(points: &[(f32, f32)]) -> CalibrationModel {
        CalibrationModel {
            entity: "total".into(),
            version: "v1".into(),
            calibrator_type: CalibratorType::PiecewiseLinear,
            breakpoints: points.iter().map(|&(x, y)| Breakpoint { x, y }).collect(),
            required_features: vec![],
        }
    }

    #[test]
    fn apply_hits_every_breakpoint_exactly() {
        let m = model(&[(0.0, 0.05), (0.3, 0.2), (0.6, 0.45), (0.9, 0.88), (1.0, 0.97)]);
        for bp in &m.breakpoints {
            assert_eq!(m.apply(bp.x), bp.y, "breakpoint {bp:?}");
        }
    }

    #[test]
    fn apply_interpolates_between_breakpoints() {
        let m = model(&[(0.0, 0.0), (1.0, 0.5)]);
        assert!((m.apply(0.5) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn apply_clamps_outside_range_to_boundary_y() {
        let m = model(&[(0.2, 0.3), (0.8, 0.9)]);
        assert_eq!(m.apply(0.0), 0.3);
        assert_eq!(m.apply(0.95), 0.9);
        assert_eq!(m.apply(7.0), 0.9);
        assert_eq!(m.apply(-3.0), 0.3);
        assert_eq!(m.apply(f32::NAN), 0.3);
    }

    #[test]
    fn apply_clamps_boundary_y_into_unit_interval() {
        let m = model(&[(0.0, -0.2), (1.0, 1.4)]);
        assert_eq!(m.apply(0.0), 0.0);
        assert_eq!(m.apply(1.0), 1.0);
    }

    #[test]
    fn non_monotonic_curves_are_applied_as_written() {
        let m = model(&[(0.0, 0.5), (0.5, 0.2), (1.0, 0.9)]);
        assert_eq!(m.apply(0.5), 0.2);
    }

    #[test]
    fn from_json_accepts_pairs_and_objects() {
        let m = CalibrationModel::from_json(
            r#"{"entity":"total","version":"2026-09","type":"piecewise_linear",
                "breakpoints":[[1.0,0.95],{"x":0.0,"y":0.1}],"required_features":["winner_margin"]}"#,
        )
        .unwrap();
        assert_eq!(m.breakpoints[0], Breakpoint { x: 0.0, y: 0.1 });
        assert_eq!(m.required_features, vec!["winner_margin".to_string()]);
        assert_eq!(m.calibrator_type.to_string(), "piecewise_linear");
    }

    #[test]
    fn from_json_rejects_invalid_artifacts() {
        let cases = [
            "not json",
            "[]",
            r#"{"version":"v1","type":"piecewise_linear","breakpoints":[[0,0],[1,1]]}"#,
            r#"{"entity":"total","type":"piecewise_linear","breakpoints":[[0,0],[1,1]]}"#,
            r#"{"entity":"total","version":"v1","breakpoints":[[0,0],[1,1]]}"#,
            r#"{"entity":"total","version":"v1","type":"isotonic","breakpoints":[[0,0],[1,1]]}"#,
            r#"{"entity":"total","version":"v1","type":"piecewise_linear","breakpoints":[[0,0]]}"#,
            r#"{"entity":"total","version":"v1","type":"piecewise_linear","breakpoints":[[0,0],[1]]}"#,
            r#"{"entity":"total","version":"v1","type":"piecewise_linear","breakpoints":[[0,0],["a",1]]}"#,
            r#"{"entity":"total","version":"v1","type":"piecewise_linear","breakpoints":[[0,0],[1,1]],"required_features":"x"}"#,
        ];
        for case in cases {
            assert!(
                matches!(CalibrationModel::from_json(case), Err(ArtifactError::Schema(_))),
                "accepted: {case}"
            );
        }
    }
}
