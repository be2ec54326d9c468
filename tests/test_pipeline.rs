//! Integration test: full train -> persist -> predict pipeline

use exoseekr::inference::{ModelVariant, PredictEngine, PredictRequest};
use exoseekr::store::{ModelStore, BASE_MODEL_FILENAME};
use exoseekr::training::{TrainEngine, TrainRequest};
use exoseekr::ExoSeekrError;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A small but learnable TOI-style table: positives have deep short-period
/// transits, negatives shallow long-period ones, plus error pairs, limit
/// flags, and ambiguous rows.
fn write_toi_csv(path: &Path, with_labels: bool) -> PathBuf {
    let mut file = std::fs::File::create(path).unwrap();
    let header = if with_labels {
        "tid,rastr,pl_orbper,pl_orbpererr1,pl_orbpererr2,pl_orbperlim,pl_trandurh,pl_trandep,st_tmag,st_rad,pl_rade,tfopwg_disp"
    } else {
        "tid,rastr,pl_orbper,pl_orbpererr1,pl_orbpererr2,pl_orbperlim,pl_trandurh,pl_trandep,st_tmag,st_rad,pl_rade"
    };
    writeln!(file, "{header}").unwrap();

    for i in 0..15 {
        let row = format!(
            "p{i},00:00:0{},{:.2},0.01,-0.01,0,{:.2},{:.1},{:.2},1.0,{:.2}",
            i % 10,
            2.0 + i as f64 * 0.15,
            3.0 + i as f64 * 0.05,
            800.0 + i as f64 * 12.0,
            9.0 + i as f64 * 0.02,
            11.0 + i as f64 * 0.1,
        );
        if with_labels {
            let label = if i % 2 == 0 { "CP" } else { "KP" };
            writeln!(file, "{row},{label}").unwrap();
        } else {
            writeln!(file, "{row}").unwrap();
        }
    }
    for i in 0..15 {
        let row = format!(
            "n{i},00:00:1{},{:.2},0.05,-0.05,1,{:.2},{:.1},{:.2},1.0,{:.2}",
            i % 10,
            30.0 + i as f64 * 0.8,
            1.0 + i as f64 * 0.02,
            40.0 + i as f64 * 2.0,
            13.0 + i as f64 * 0.05,
            1.0 + i as f64 * 0.05,
        );
        if with_labels {
            let label = if i % 2 == 0 { "FP" } else { "FA" };
            writeln!(file, "{row},{label}").unwrap();
        } else {
            writeln!(file, "{row}").unwrap();
        }
    }
    if with_labels {
        // Ambiguous candidates are dropped by the label mapper
        writeln!(file, "a0,00:00:20,5.0,0.01,-0.01,0,2.0,100.0,10.0,1.0,2.0,PC").unwrap();
        writeln!(file, "a1,00:00:21,5.0,0.01,-0.01,0,2.0,100.0,10.0,1.0,2.0,APC").unwrap();
    }
    path.to_path_buf()
}

fn fixed_params() -> HashMap<String, serde_json::Value> {
    HashMap::from([
        ("n_estimators".to_string(), json!(15)),
        ("max_depth".to_string(), json!(6)),
        ("min_samples_split".to_string(), json!(2)),
        ("max_features".to_string(), json!("sqrt")),
    ])
}

fn train_engine(root: &Path) -> TrainEngine {
    TrainEngine::new(
        root,
        ModelStore::new(root.join("models/retrainable")),
        root.join("plots"),
    )
}

fn predict_engine(root: &Path, variant: ModelVariant) -> PredictEngine {
    let store_dir = match variant {
        ModelVariant::Base => root.join("models/base"),
        ModelVariant::Retrainable => root.join("models/retrainable"),
    };
    PredictEngine::new(root, ModelStore::new(store_dir), root.join("plots"), variant)
}

#[test]
fn test_train_then_latest_predict_round_trip() {
    let dir = TempDir::new().unwrap();
    let csv = write_toi_csv(&dir.path().join("toi.csv"), true);

    let outcome = train_engine(dir.path())
        .train(&TrainRequest {
            data_source: csv.clone(),
            n_trials: 5,
            hyperparameters: Some(fixed_params()),
        })
        .unwrap();
    assert_eq!(outcome.status, "success");

    // "latest" with no reference resolves the artifact just trained
    let store = ModelStore::new(dir.path().join("models/retrainable"));
    let latest = store.latest().unwrap().unwrap();
    assert!(outcome.model_path.ends_with(latest.file_name().unwrap().to_str().unwrap()));

    let prediction = predict_engine(dir.path(), ModelVariant::Retrainable)
        .predict(&PredictRequest {
            data_source: csv,
            model_path: None,
            threshold: 0.5,
        })
        .unwrap();

    // 30 recognized labels; the 2 ambiguous rows are dropped
    assert_eq!(prediction.total_samples, 30);
    assert_eq!(prediction.predictions.len(), 30);
    assert!(prediction.metrics.is_some());
    assert!(prediction
        .model_info
        .source
        .ends_with(latest.file_name().unwrap().to_str().unwrap()));
    assert_eq!(prediction.model_info.train_data.as_deref(), Some("toi.csv"));
    assert!(prediction.model_info.retrainable);

    // The separable fixture should be learned almost perfectly
    let accuracy = prediction.metrics.unwrap().accuracy.unwrap();
    assert!(accuracy >= 0.9, "accuracy too low: {accuracy}");
}

#[test]
fn test_predict_without_labels_suppresses_metrics() {
    let dir = TempDir::new().unwrap();
    let train_csv = write_toi_csv(&dir.path().join("train.csv"), true);
    let unlabeled_csv = write_toi_csv(&dir.path().join("unlabeled.csv"), false);

    train_engine(dir.path())
        .train(&TrainRequest {
            data_source: train_csv,
            n_trials: 5,
            hyperparameters: Some(fixed_params()),
        })
        .unwrap();

    let prediction = predict_engine(dir.path(), ModelVariant::Retrainable)
        .predict(&PredictRequest {
            data_source: unlabeled_csv,
            model_path: None,
            threshold: 0.5,
        })
        .unwrap();

    assert_eq!(prediction.total_samples, 30);
    assert!(prediction.metrics.is_none());
    assert!(prediction.plots.roc.is_none());
}

#[test]
fn test_predict_with_nonexistent_model_reference() {
    let dir = TempDir::new().unwrap();
    let csv = write_toi_csv(&dir.path().join("toi.csv"), true);

    let err = predict_engine(dir.path(), ModelVariant::Retrainable)
        .predict(&PredictRequest {
            data_source: csv,
            model_path: Some("models/retrainable/rf_pipeline_ghost.bin".to_string()),
            threshold: 0.5,
        })
        .unwrap_err();

    assert!(matches!(err, ExoSeekrError::NotFound(_)));
    assert!(err.to_string().contains("rf_pipeline_ghost.bin"));
}

#[test]
fn test_predict_with_no_usable_numeric_features() {
    let dir = TempDir::new().unwrap();
    let train_csv = write_toi_csv(&dir.path().join("train.csv"), true);
    train_engine(dir.path())
        .train(&TrainRequest {
            data_source: train_csv,
            n_trials: 5,
            hyperparameters: Some(fixed_params()),
        })
        .unwrap();

    let bad_csv = dir.path().join("strings.csv");
    std::fs::write(&bad_csv, "rastr,decstr\n00:00:01,+10:00:00\n00:00:02,+11:00:00\n").unwrap();

    let err = predict_engine(dir.path(), ModelVariant::Retrainable)
        .predict(&PredictRequest {
            data_source: bad_csv,
            model_path: None,
            threshold: 0.5,
        })
        .unwrap_err();

    assert!(matches!(err, ExoSeekrError::ValidationError(_)));
    assert!(err.to_string().contains("No usable numeric features"));
}

#[test]
fn test_base_variant_ignores_caller_threshold() {
    let dir = TempDir::new().unwrap();
    let csv = write_toi_csv(&dir.path().join("toi.csv"), true);

    train_engine(dir.path())
        .train(&TrainRequest {
            data_source: csv.clone(),
            n_trials: 5,
            hyperparameters: Some(fixed_params()),
        })
        .unwrap();

    // Promote the trained artifact to the immutable base slot
    let retrain_store = ModelStore::new(dir.path().join("models/retrainable"));
    let latest = retrain_store.latest().unwrap().unwrap();
    let base_dir = dir.path().join("models/base");
    std::fs::create_dir_all(&base_dir).unwrap();
    std::fs::copy(&latest, base_dir.join(BASE_MODEL_FILENAME)).unwrap();

    let impossible_threshold = 1.1;

    let base = predict_engine(dir.path(), ModelVariant::Base)
        .predict(&PredictRequest {
            data_source: csv.clone(),
            model_path: None,
            threshold: impossible_threshold,
        })
        .unwrap();
    let retrain = predict_engine(dir.path(), ModelVariant::Retrainable)
        .predict(&PredictRequest {
            data_source: csv,
            model_path: None,
            threshold: impossible_threshold,
        })
        .unwrap();

    // The retrainable variant applies the threshold; the base variant
    // reports the raw predicted class as the detection flag.
    assert_eq!(retrain.exoplanets_detected, 0);
    assert!(base.exoplanets_detected > 0);
    assert!(!base.model_info.retrainable);
}

#[test]
fn test_search_path_trains_and_records_params() {
    let dir = TempDir::new().unwrap();
    let csv = write_toi_csv(&dir.path().join("toi.csv"), true);

    let outcome = train_engine(dir.path())
        .train(&TrainRequest {
            data_source: csv,
            n_trials: 2,
            hyperparameters: None,
        })
        .unwrap();

    assert!((100..=800).contains(&outcome.best_params.n_estimators));
    assert!((2..=15).contains(&outcome.best_params.min_samples_split));
    assert!(outcome.metrics.roc_auc.is_some());

    // Metadata pairs with the artifact and records the same parameters
    let store = ModelStore::new(dir.path().join("models/retrainable"));
    let entries = store.list().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].best_params.as_ref(), Some(&outcome.best_params));
}

#[test]
fn test_retraining_versions_coexist() {
    let dir = TempDir::new().unwrap();
    let csv = write_toi_csv(&dir.path().join("toi.csv"), true);
    let engine = train_engine(dir.path());
    let request = TrainRequest {
        data_source: csv,
        n_trials: 5,
        hyperparameters: Some(fixed_params()),
    };

    engine.train(&request).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1100));
    engine.train(&request).unwrap();

    let store = ModelStore::new(dir.path().join("models/retrainable"));
    assert_eq!(store.list().unwrap().len(), 2);
}
