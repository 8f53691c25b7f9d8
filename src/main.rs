//! pml-rf: exercise-quality classification CLI
//!
//! Reproduces the weight-lifting analysis end to end: load, split, prune,
//! tune with cross-validation, validate and predict the scoring rows.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use pml_rf::cli::Cli;
use pml_rf::pipeline::{
    evaluate, load_datasets, predict, prune, stratified_split, train, Fetcher, HttpFetcher,
    StageDimensions,
};
use pml_rf::report::{export_report, EnvironmentInfo, PipelineReport, ReportMetadata};
use pml_rf::utils::{
    print_banner, print_completion, print_config, print_count, print_info, print_step_header,
    print_step_time, print_success, print_warning, ConfigCard,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let training_source = cli.training_source();
    let scoring_source = cli.scoring_source();
    let training_label = source_label(&training_source);
    let scoring_label = source_label(&scoring_source);

    // Print styled banner
    print_banner(env!("CARGO_PKG_VERSION"));

    // Print configuration card
    print_config(&ConfigCard {
        training: &training_label,
        scoring: &scoring_label,
        label: &cli.label,
        fraction: cli.fraction,
        folds: cli.folds,
        classifier: cli.classifier.label(),
        seed: cli.seed,
    });

    // Step 1: Load both tables
    print_step_header(1, "Load Data");

    let step_start = Instant::now();
    let http = if cli.offline {
        None
    } else {
        Some(HttpFetcher::new().context("Failed to initialise HTTP client")?)
    };
    let fetcher = http.as_ref().map(|f| f as &dyn Fetcher);
    let loaded = load_datasets(
        &training_source,
        &scoring_source,
        fetcher,
        &cli.loader_options(),
    )
    .context("Failed to load input tables")?;
    print_success("Training and scoring tables loaded");
    let mut load_dims = vec![
        StageDimensions::of("training (raw)", &loaded.training),
        StageDimensions::of("scoring (raw)", &loaded.scoring),
    ];
    print_step_time(step_start.elapsed());

    // Step 2: Stratified split
    print_step_header(2, "Stratified Split");

    let step_start = Instant::now();
    let partition = stratified_split(&loaded.training, &cli.label, cli.fraction, cli.seed)
        .with_context(|| format!("Failed to split training table on '{}'", cli.label))?;
    println!(
        "      Fitting: {} rows, validation: {} rows",
        style(partition.fit.height()).yellow().bold(),
        style(partition.validation.height()).yellow().bold()
    );
    load_dims.push(StageDimensions::of("fitting (split)", &partition.fit));
    load_dims.push(StageDimensions::of("validation (split)", &partition.validation));
    print_step_time(step_start.elapsed());

    // Step 3: Prune predictors
    print_step_header(3, "Prune Predictors");

    let step_start = Instant::now();
    let pruned = prune(
        &partition.fit,
        &partition.validation,
        &loaded.scoring,
        &cli.label,
        &cli.pruner_config(),
    )
    .context("Failed to prune predictors")?;
    let plan = &pruned.plan;
    print_count(
        "near-zero variance column(s)",
        plan.dropped.near_zero_variance.len(),
        Some(&format!(
            "(freq ratio > {:.1}, unique < {:.1}%)",
            cli.freq_cut, cli.unique_cut
        )),
    );
    print_count(
        "identifier/metadata column(s)",
        plan.dropped.identifiers.len() + plan.dropped.metadata.len(),
        None,
    );
    print_count(
        "sparse column(s)",
        plan.dropped.sparse.len(),
        Some(&format!("(< {} present values)", plan.min_present)),
    );
    for skipped in &plan.skipped {
        print_warning(&format!(
            "Column '{}' not present at {} stage, skipped",
            skipped.column, skipped.stage
        ));
    }
    print_success(&format!("{} predictors kept", plan.kept_features.len()));
    print_step_time(step_start.elapsed());

    // Step 4: Cross-validated training
    print_step_header(4, "Tune and Train");

    let step_start = Instant::now();
    let candidates = cli.candidates(plan.kept_features.len());
    print_info(&format!(
        "{} candidate(s) x {} folds",
        candidates.len(),
        cli.folds
    ));
    let model = train(
        &pruned.fit,
        &plan.kept_features,
        &cli.label,
        &candidates,
        &cli.trainer_config(),
    )
    .context("Failed to train model")?;
    let selected = model.summary.selected_candidate();
    print_success(&format!(
        "Selected {} with CV accuracy {:.4}",
        selected.classifier, selected.mean_accuracy
    ));
    print_step_time(step_start.elapsed());

    // Step 5: Validation
    print_step_header(5, "Validate");

    let step_start = Instant::now();
    let evaluation =
        evaluate(&model, &pruned.validation).context("Failed to evaluate on validation rows")?;
    print_success(&format!(
        "Out-of-sample error {:.2}%",
        evaluation.error_rate * 100.0
    ));
    print_step_time(step_start.elapsed());

    // Step 6: Predict scoring rows
    print_step_header(6, "Predict");

    let step_start = Instant::now();
    let predictions = predict(&model, &pruned.scoring).context("Failed to predict scoring rows")?;
    print_success(&format!("{} rows predicted", predictions.len()));
    print_step_time(step_start.elapsed());

    let report = PipelineReport {
        metadata: ReportMetadata {
            training_source: training_label,
            scoring_source: scoring_label,
            label: cli.label.clone(),
            fraction: cli.fraction,
        },
        load: load_dims,
        pruning: pruned.plan.clone(),
        cross_validation: model.summary.clone(),
        evaluation,
        predictions,
        environment: EnvironmentInfo::collect(cli.seed),
    };

    // Display summary
    report.display();

    if let Some(path) = &cli.json {
        export_report(&report, path)?;
        println!();
        print_success(&format!("Report written to {}", path.display()));
    }

    // Final completion message
    print_completion();

    Ok(())
}

/// URL for remote sources, path for local ones
fn source_label(source: &pml_rf::pipeline::DataSource) -> String {
    match &source.url {
        Some(url) => url.clone(),
        None => source.cache_path.display().to_string(),
    }
}
