use skycast_data::{
    generate, DataError, DataSplit, FeatureBuilder, RawTable, StandardScaler, SyntheticConfig,
};
use tempfile::TempDir;

#[test]
fn test_synthetic_file_round_trip_builds_seventeen_features() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.csv");
    generate(&SyntheticConfig::new(1000, 4, 42))
        .unwrap()
        .write_csv(&path)
        .unwrap();

    let table = RawTable::from_path(&path).unwrap();
    assert_eq!(table.len(), 1000);

    let set = FeatureBuilder::new().build(&table).unwrap();
    assert_eq!(set.width(), 17);
    assert_eq!(set.features.shape(), &[1000, 17]);
    assert_eq!(set.targets.len(), 1000);
    assert_eq!(set.schema.weather_categories.len(), 4);

    let mean = set.features.mean_axis(0);
    let var = set.features.var_axis(0);
    for j in 0..17 {
        let name = &set.schema.column_names()[j];
        assert!(mean.data()[j].abs() < 1e-4, "{} mean {}", name, mean.data()[j]);
        // 1000 hourly rows stay inside 1979, so the year column is constant
        if name == "year" {
            assert_eq!(var.data()[j], 0.0);
        } else {
            assert!((var.data()[j] - 1.0).abs() < 1e-3, "{} var {}", name, var.data()[j]);
        }
    }
}

#[test]
fn test_gappy_input_is_filled() {
    let config = SyntheticConfig::new(300, 3, 5).with_missing_rate(0.1);
    let table = generate(&config).unwrap();
    let set = FeatureBuilder::new().build(&table).unwrap();
    assert_eq!(set.features.shape(), &[300, 16]);
    assert!(set.features.is_finite());
    assert!(set.targets.iter().all(|t| t.is_finite()));
}

#[test]
fn test_scaler_survives_json() {
    let table = generate(&SyntheticConfig::new(100, 2, 1)).unwrap();
    let set = FeatureBuilder::new().build(&table).unwrap();
    let json = serde_json::to_string_pretty(&set.scaler).unwrap();
    let back: StandardScaler = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set.scaler);

    let (raw, _, _) = FeatureBuilder::new().extract(&table).unwrap();
    let scaled = back.transform(&raw).unwrap();
    for (a, b) in scaled.iter().zip(set.features.data()) {
        assert!((*a as f32 - b).abs() < 1e-5);
    }
}

#[test]
fn test_split_over_feature_rows() {
    let table = generate(&SyntheticConfig::new(1000, 4, 42)).unwrap();
    let set = FeatureBuilder::new().build(&table).unwrap();
    let split = DataSplit::new(set.len(), 0.2, 0.2, 42).unwrap();
    let (x, y) = set.subset(&split.test);
    assert_eq!(x.shape(), &[200, 17]);
    assert_eq!(y.shape(), &[200, 1]);
    assert_eq!(split, DataSplit::new(set.len(), 0.2, 0.2, 42).unwrap());
}

#[test]
fn test_file_with_only_header_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "dt_iso,temp\n").unwrap();
    let err = RawTable::from_path(&path).unwrap_err();
    assert!(matches!(err, DataError::Empty));
}

#[test]
fn test_unparseable_timestamp_reports_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    let mut table = generate(&SyntheticConfig::new(10, 2, 0)).unwrap();
    table.write_csv(&path).unwrap();
    let text = std::fs::read_to_string(&path)
        .unwrap()
        .replacen("1979-01-01 03:00:00 +0000 UTC", "03/01/1979 +0000 UTC", 1);
    std::fs::write(&path, text).unwrap();

    table = RawTable::from_path(&path).unwrap();
    let err = FeatureBuilder::new().build(&table).unwrap_err();
    match err {
        DataError::InvalidTimestamp { value, row } => {
            assert_eq!(value, "03/01/1979");
            assert_eq!(row, 4);
        }
        other => panic!("unexpected error: {}", other),
    }
}
