use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A race as listed by `GET /races`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub id: i64,
    /// Races without a year are never eligible for training.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub year: i32,
    #[serde(default)]
    pub round: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or_default())
}

/// One driver's entry in one race, as served by `GET /predictions/model-input/{race_id}`.
///
/// Values are kept exactly as received; accessors coerce them to numbers on read.
/// Numeric strings count as numbers, anything else non-numeric counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRow {
    fields: Map<String, Value>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this row with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric value of `key`, or `None` when absent, null, non-numeric or not finite.
    /// Booleans read as 1.0 / 0.0.
    pub fn number(&self, key: &str) -> Option<f64> {
        let value = match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Integer value of `key`; fractional values are truncated toward zero.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| self.number(key).map(|f| f as i64)),
            _ => self.number(key).map(|f| f as i64),
        }
    }

    /// Feature value for model input: missing and null both read as 0.0.
    pub fn feature(&self, key: &str) -> f64 {
        self.number(key).unwrap_or(0.0)
    }

    pub fn driver_id(&self) -> Option<i64> {
        self.integer("driver_id")
    }

    pub fn constructor_id(&self) -> Option<i64> {
        self.integer("constructor_id")
    }

    pub fn grid(&self) -> Option<i64> {
        self.integer("grid")
    }

    pub fn actual_position(&self) -> Option<i64> {
        self.integer("actual_position")
    }

    /// Historical rows are usable for training only when the finishing position is known.
    pub fn has_outcome(&self) -> bool {
        self.number("actual_position").is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for FeatureRow {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Predicted finishing position for one driver in one race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub driver_id: i64,
    pub constructor_id: Option<i64>,
    pub grid: Option<i64>,
    pub predicted_position: u32,
    pub actual_position: Option<i64>,
    /// Positions gained versus the grid slot (grid - predicted).
    pub predicted_delta: Option<i64>,
    /// Positions actually gained (grid - actual).
    pub actual_delta: Option<i64>,
    pub confidence: f64,
    pub model_version: String,
}

impl PredictionResult {
    /// Builds the record for `row`, deriving both deltas from its grid slot.
    pub fn from_row(
        driver_id: i64,
        row: &FeatureRow,
        predicted_position: u32,
        confidence: f64,
        model_version: &str,
    ) -> Self {
        let grid = row.grid();
        let actual = row.actual_position();
        let predicted = i64::from(predicted_position);

        Self {
            driver_id,
            constructor_id: row.constructor_id(),
            grid,
            predicted_position,
            actual_position: actual,
            predicted_delta: grid.map(|g| g - predicted),
            actual_delta: match (grid, actual) {
                (Some(g), Some(a)) => Some(g - a),
                _ => None,
            },
            confidence,
            model_version: model_version.to_string(),
        }
    }
}

/// Outgoing entry of a `POST /predictions` batch.
#[derive(Debug, Serialize)]
pub struct PredictionPayload<'a> {
    #[serde(flatten)]
    pub result: &'a PredictionResult,
    pub race_id: i64,
}

/// Body of `POST /predictions`.
#[derive(Debug, Serialize)]
pub struct PredictionBatch<'a> {
    pub predictions: Vec<PredictionPayload<'a>>,
}

impl<'a> PredictionBatch<'a> {
    pub fn for_race(race_id: i64, results: &'a [PredictionResult]) -> Self {
        Self {
            predictions: results
                .iter()
                .map(|result| PredictionPayload { result, race_id })
                .collect(),
        }
    }
}

/// Acknowledgement returned by `POST /predictions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_row() -> FeatureRow {
        FeatureRow::new()
            .with("driver_id", 44)
            .with("constructor_id", 131)
            .with("grid", 3)
            .with("actual_position", 1)
            .with("championship_points", json!(null))
            .with("circuit_lat", "43.7347")
    }

    #[test]
    fn test_feature_coercion() {
        let row = sample_row();
        assert_eq!(row.feature("grid"), 3.0);
        assert_eq!(row.feature("championship_points"), 0.0);
        assert_eq!(row.feature("season_wins"), 0.0);
        assert!((row.feature("circuit_lat") - 43.7347).abs() < 1e-9);
        assert!(row.has_outcome());
    }

    #[test]
    fn test_non_finite_strings_read_as_missing() {
        let row = FeatureRow::new()
            .with("actual_position", "NaN")
            .with("grid", "inf")
            .with("championship_points", "-infinity")
            .with("driver_id", "nan");

        assert_eq!(row.number("actual_position"), None);
        assert!(!row.has_outcome());
        assert_eq!(row.grid(), None);
        assert_eq!(row.driver_id(), None);
        assert_eq!(row.feature("grid"), 0.0);
        assert_eq!(row.feature("championship_points"), 0.0);
    }

    #[test]
    fn test_booleans_read_as_zero_or_one() {
        let row = FeatureRow::new().with("season_wins", true).with("grid", false);
        assert_eq!(row.feature("season_wins"), 1.0);
        assert_eq!(row.feature("grid"), 0.0);
        assert_eq!(row.integer("season_wins"), Some(1));
    }

    #[test]
    fn test_integer_truncates_fractional_values() {
        let row = FeatureRow::new().with("actual_position", 4.7);
        assert_eq!(row.actual_position(), Some(4));
    }

    #[test]
    fn test_deltas_from_row() {
        let result = PredictionResult::from_row(44, &sample_row(), 2, 0.9, "gbr-v1");
        assert_eq!(result.predicted_delta, Some(1));
        assert_eq!(result.actual_delta, Some(2));
        assert_eq!(result.constructor_id, Some(131));
    }

    #[test]
    fn test_deltas_null_propagate() {
        let row = FeatureRow::new().with("driver_id", 1).with("grid", json!(null));
        let result = PredictionResult::from_row(1, &row, 5, 1.0, "gbr-v1");
        assert_eq!(result.grid, None);
        assert_eq!(result.predicted_delta, None);
        assert_eq!(result.actual_delta, None);

        let row = FeatureRow::new().with("driver_id", 1).with("grid", 7);
        let result = PredictionResult::from_row(1, &row, 5, 1.0, "gbr-v1");
        assert_eq!(result.predicted_delta, Some(2));
        assert_eq!(result.actual_delta, None);
    }

    #[test]
    fn test_batch_attaches_race_id_and_keeps_nulls() {
        let result = PredictionResult {
            driver_id: 1,
            constructor_id: None,
            grid: Some(5),
            predicted_position: 3,
            actual_position: None,
            predicted_delta: Some(2),
            actual_delta: None,
            confidence: 0.85,
            model_version: "test-v1".to_string(),
        };
        let results = vec![result];
        let body = serde_json::to_value(PredictionBatch::for_race(101, &results)).unwrap();

        let entry = &body["predictions"][0];
        assert_eq!(entry["race_id"], 101);
        assert_eq!(entry["driver_id"], 1);
        assert_eq!(entry["predicted_position"], 3);
        assert_eq!(entry["confidence"], 0.85);
        assert!(entry["actual_position"].is_null());
        assert!(entry.as_object().unwrap().contains_key("constructor_id"));
    }

    #[test]
    fn test_race_record_without_year() {
        let race: RaceRecord = serde_json::from_value(json!({"id": 7, "name": "Monaco"})).unwrap();
        assert_eq!(race.year, 0);
        assert_eq!(race.round, None);

        let race: RaceRecord = serde_json::from_value(json!({"id": 8, "year": null})).unwrap();
        assert_eq!(race.year, 0);
    }
}
