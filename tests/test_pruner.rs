//! Tests for predictor pruning across the fitting, validation and scoring tables

use pml_rf::pipeline::{
    near_zero_variance, prune, stratified_split, PipelineError, PrunerConfig, PruningPlan,
    DEFAULT_FREQ_CUT, DEFAULT_UNIQUE_CUT,
};
use polars::prelude::*;

mod common;

fn sensors() -> Vec<String> {
    (0..common::INFORMATIVE).map(|j| format!("sensor_{}", j)).collect()
}

#[test]
fn test_prune_keeps_informative_sensors_only() {
    let training = common::create_exercise_dataframe(100, 4);
    let (scoring, _) = common::create_scoring_dataframe(20, 5);
    let partition = stratified_split(&training, "classe", 0.6, 32343).unwrap();

    let pruned = prune(
        &partition.fit,
        &partition.validation,
        &scoring,
        "classe",
        &PrunerConfig::default(),
    )
    .unwrap();

    assert_eq!(pruned.plan.kept_features, sensors());
    assert!(pruned.plan.dropped.near_zero_variance.contains(&"near_constant".to_string()));
    assert!(pruned.plan.dropped.near_zero_variance.contains(&"new_window".to_string()));
    assert_eq!(pruned.plan.dropped.sparse, vec!["mostly_missing".to_string()]);
    assert_eq!(
        pruned.plan.dropped.identifiers,
        vec!["X".to_string(), "user_name".to_string(), "cvtd_timestamp".to_string()]
    );
    assert!(pruned.plan.skipped.is_empty(), "all static columns exist: {:?}", pruned.plan.skipped);
}

#[test]
fn test_pruned_tables_share_column_set() {
    let training = common::create_exercise_dataframe(60, 6);
    let (scoring, _) = common::create_scoring_dataframe(20, 7);
    let partition = stratified_split(&training, "classe", 0.6, 32343).unwrap();

    let pruned = prune(
        &partition.fit,
        &partition.validation,
        &scoring,
        "classe",
        &PrunerConfig::default(),
    )
    .unwrap();

    let mut labeled = pruned.plan.kept_features.clone();
    labeled.push("classe".to_string());
    assert_eq!(common::column_names(&pruned.fit), labeled);
    assert_eq!(common::column_names(&pruned.validation), labeled);
    assert_eq!(common::column_names(&pruned.scoring), pruned.plan.kept_features);
    common::assert_missing_columns(&pruned.scoring, &["problem_id", "classe"]);

    // Pruning never changes row counts
    assert_eq!(pruned.fit.height(), partition.fit.height());
    assert_eq!(pruned.validation.height(), partition.validation.height());
    assert_eq!(pruned.scoring.height(), 20);
}

#[test]
fn test_stage_dimensions_never_grow() {
    let df = common::create_exercise_dataframe(40, 8);
    let plan = PruningPlan::decide(&df, "classe", &PrunerConfig::default()).unwrap();

    assert_eq!(plan.stages.first().unwrap().columns, df.width());
    for pair in plan.stages.windows(2) {
        assert!(pair[1].columns <= pair[0].columns);
        assert_eq!(pair[1].rows, pair[0].rows);
    }
    assert_eq!(
        plan.stages.last().unwrap().columns,
        plan.kept_features.len() + 1
    );
    assert_eq!(
        plan.dropped.total() + plan.kept_features.len() + 1,
        df.width()
    );
}

#[test]
fn test_near_zero_variance_flags_constant_and_rare_columns() {
    let df = common::create_test_dataframe();
    let (profiles, flagged) =
        near_zero_variance(&df, "classe", &[], DEFAULT_FREQ_CUT, DEFAULT_UNIQUE_CUT).unwrap();

    assert!(flagged.contains(&"constant".to_string()));
    assert!(!flagged.contains(&"roll_belt".to_string()));
    assert!(profiles.iter().all(|p| p.name != "classe"));

    for profile in &profiles {
        if flagged.contains(&profile.name) {
            assert!(
                profile.zero_var
                    || (profile.freq_ratio > DEFAULT_FREQ_CUT
                        && profile.percent_unique < DEFAULT_UNIQUE_CUT)
            );
        }
    }
}

#[test]
fn test_looser_cutoffs_keep_more_columns() {
    let df = common::create_exercise_dataframe(40, 9);
    let (_, strict) = near_zero_variance(&df, "classe", &[], DEFAULT_FREQ_CUT, DEFAULT_UNIQUE_CUT).unwrap();
    let (_, loose) = near_zero_variance(&df, "classe", &[], 1000.0, DEFAULT_UNIQUE_CUT).unwrap();
    assert!(loose.len() <= strict.len());
    assert!(!loose.contains(&"near_constant".to_string()));
}

#[test]
fn test_scoring_without_kept_feature_is_rejected() {
    let training = common::create_exercise_dataframe(40, 10);
    let partition = stratified_split(&training, "classe", 0.6, 1).unwrap();
    let (scoring, _) = common::create_scoring_dataframe(5, 11);
    let scoring = scoring.drop("sensor_3").unwrap();

    let err = prune(
        &partition.fit,
        &partition.validation,
        &scoring,
        "classe",
        &PrunerConfig::default(),
    )
    .err()
    .unwrap();
    match err {
        PipelineError::ColumnNotFound { table, column } => {
            assert_eq!(table, "scoring");
            assert_eq!(column, "sensor_3");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_validation_without_label_is_rejected() {
    let training = common::create_exercise_dataframe(40, 12);
    let partition = stratified_split(&training, "classe", 0.6, 1).unwrap();
    let validation = partition.validation.drop("classe").unwrap();
    let (scoring, _) = common::create_scoring_dataframe(5, 13);

    let err = prune(&partition.fit, &validation, &scoring, "classe", &PrunerConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::LabelMissing { .. }));
}

#[test]
fn test_all_columns_pruned_is_an_error() {
    let df = df! {
        "X" => [1i64, 2, 3, 4],
        "constant" => [1.0f64; 4],
        "classe" => ["A", "B", "A", "B"],
    }
    .unwrap();
    let err = PruningPlan::decide(&df, "classe", &PrunerConfig::default()).err().unwrap();
    assert!(matches!(err, PipelineError::EmptyAfterPruning { .. }));
}
