use crate::domain::prediction::FeatureRow;

/// Default ordered list of model input columns.
/// The order defines the column layout of every feature matrix; training and
/// inference must use the same list.
pub const DEFAULT_FEATURE_COLUMNS: &[&str] = &[
    "grid",
    "championship_points",
    "championship_position",
    "season_wins",
    "circuit_lat",
    "circuit_lng",
    "circuit_altitude",
];

/// Name of the training target column.
pub const TARGET_COLUMN: &str = "actual_position";

/// Converts one row into a feature vector following `columns`.
/// Missing or null values read as 0.0.
pub fn row_to_vector(row: &FeatureRow, columns: &[String]) -> Vec<f64> {
    columns.iter().map(|col| row.feature(col)).collect()
}

/// Builds a row-major feature matrix, one vector per row in input order.
pub fn build_feature_matrix(rows: &[FeatureRow], columns: &[String]) -> Vec<Vec<f64>> {
    rows.iter().map(|row| row_to_vector(row, columns)).collect()
}

pub fn default_feature_columns() -> Vec<String> {
    DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_vector_length() {
        let columns = default_feature_columns();
        let vec = row_to_vector(&FeatureRow::default(), &columns);
        assert_eq!(vec.len(), DEFAULT_FEATURE_COLUMNS.len());
        assert!(vec.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_feature_order_follows_columns() {
        let row = FeatureRow::new()
            .with("grid", 4)
            .with("season_wins", 2)
            .with("circuit_altitude", json!(null));
        let columns = vec!["season_wins".to_string(), "grid".to_string(), "circuit_altitude".to_string()];

        assert_eq!(row_to_vector(&row, &columns), vec![2.0, 4.0, 0.0]);
    }

    #[test]
    fn test_matrix_keeps_row_order() {
        let rows = vec![
            FeatureRow::new().with("grid", 1),
            FeatureRow::new().with("grid", 2),
        ];
        let matrix = build_feature_matrix(&rows, &["grid".to_string()]);
        assert_eq!(matrix, vec![vec![1.0], vec![2.0]]);
    }
}
