//! Pipeline report: stage dimensions, model selection, validation and predictions

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use serde::Serialize;

use super::environment::EnvironmentInfo;
use crate::pipeline::{CvSummary, Evaluation, Prediction, PruningPlan, StageDimensions};

/// Above this many predictions the table is printed one row per line
const MAX_INLINE_PREDICTIONS: usize = 20;

/// Inputs and settings of the run
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub training_source: String,
    pub scoring_source: String,
    pub label: String,
    pub fraction: f64,
}

/// Everything a run produces, ready to display or serialize
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub metadata: ReportMetadata,
    /// Loaded and split table sizes
    pub load: Vec<StageDimensions>,
    pub pruning: PruningPlan,
    pub cross_validation: CvSummary,
    pub evaluation: Evaluation,
    pub predictions: Vec<Prediction>,
    pub environment: EnvironmentInfo,
}

impl PipelineReport {
    pub fn display(&self) {
        section("📋", "TABLE DIMENSIONS");
        print_table(&self.dimensions_table());
        self.display_dropped();

        section("🌲", "MODEL SELECTION");
        println!(
            "      {} on {} rows x {} features, {}-fold stratified CV",
            style(&self.cross_validation.selected_candidate().classifier).bold(),
            self.cross_validation.fitting_rows,
            self.cross_validation.features,
            self.cross_validation.folds
        );
        println!();
        print_table(&self.cv_table());
        if !self.cross_validation.final_model.is_empty() {
            let facts: Vec<String> = self
                .cross_validation
                .final_model
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            println!("      Final model: {}", style(facts.join(", ")).dim());
        }

        section("🎯", "VALIDATION");
        print_table(&self.confusion_table());
        println!();
        println!(
            "      Accuracy:               {}",
            style(format!("{:.4}", self.evaluation.accuracy)).green().bold()
        );
        println!("      Kappa:                  {:.4}", self.evaluation.kappa);
        println!(
            "      Out-of-sample error:    {}",
            style(format!("{:.2}%", self.evaluation.error_rate * 100.0)).yellow().bold()
        );

        section("🔮", "PREDICTIONS");
        print_table(&self.predictions_table());

        section("💻", "ENVIRONMENT");
        let mut env = new_table(vec!["Field", "Value"]);
        for (field, value) in self.environment.rows() {
            env.add_row(vec![Cell::new(field), Cell::new(value)]);
        }
        print_table(&env);
    }

    fn dimensions_table(&self) -> Table {
        let mut table = new_table(vec!["Stage", "Rows", "Columns"]);
        for stage in self.load.iter().chain(self.pruning.stages.iter()) {
            table.add_row(vec![
                Cell::new(&stage.stage),
                Cell::new(stage.rows).set_alignment(CellAlignment::Right),
                Cell::new(stage.columns).set_alignment(CellAlignment::Right),
            ]);
        }
        table
    }

    fn display_dropped(&self) {
        let dropped = &self.pruning.dropped;
        let sparse_title = format!("Fewer than {} values present", self.pruning.min_present);
        let groups = [
            ("Near-zero variance", &dropped.near_zero_variance),
            ("Identifiers", &dropped.identifiers),
            ("Timestamp / window metadata", &dropped.metadata),
            (sparse_title.as_str(), &dropped.sparse),
        ];

        println!();
        for (title, columns) in groups {
            if columns.is_empty() {
                continue;
            }
            println!(
                "      {} {}",
                style(title).yellow(),
                style(format!("({})", columns.len())).dim()
            );
            println!("        {}", style(columns.join(", ")).dim());
        }
        for skipped in &self.pruning.skipped {
            println!(
                "      {} '{}' not present at {}, skipped",
                style("!").yellow().bold(),
                skipped.column,
                skipped.stage
            );
        }
        println!(
            "      {} {} predictors kept",
            style("✓").green().bold(),
            style(self.pruning.kept_features.len()).green().bold()
        );
    }

    fn cv_table(&self) -> Table {
        let cv = &self.cross_validation;
        let mut header = vec!["Parameters".to_string()];
        header.extend((1..=cv.folds).map(|f| format!("Fold {}", f)));
        header.push("Mean accuracy".to_string());
        header.push("Mean kappa".to_string());

        let mut table = new_table(header);
        for (i, candidate) in cv.candidates.iter().enumerate() {
            let params: Vec<String> = candidate
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            let mut row = vec![Cell::new(params.join(", "))];
            row.extend(
                candidate
                    .fold_accuracies
                    .iter()
                    .map(|a| Cell::new(format!("{:.4}", a)).set_alignment(CellAlignment::Right)),
            );
            let mean = Cell::new(format!("{:.4}", candidate.mean_accuracy))
                .set_alignment(CellAlignment::Right);
            row.push(if i == cv.selected {
                mean.fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                mean
            });
            row.push(Cell::new(format!("{:.4}", candidate.mean_kappa)).set_alignment(CellAlignment::Right));
            table.add_row(row);
        }
        table
    }

    fn confusion_table(&self) -> Table {
        let cm = &self.evaluation.confusion;
        let mut header = vec!["Truth \\ Predicted".to_string()];
        header.extend(cm.levels.iter().cloned());

        let mut table = new_table(header);
        for (i, row) in cm.counts.iter().enumerate() {
            let mut cells = vec![Cell::new(&cm.levels[i]).add_attribute(Attribute::Bold)];
            cells.extend(row.iter().enumerate().map(|(j, &count)| {
                let cell = Cell::new(count).set_alignment(CellAlignment::Right);
                if i == j {
                    cell.fg(Color::Green)
                } else if count > 0 {
                    cell.fg(Color::Red)
                } else {
                    cell
                }
            }));
            table.add_row(cells);
        }
        table
    }

    fn predictions_table(&self) -> Table {
        if self.predictions.len() > MAX_INLINE_PREDICTIONS {
            let mut table = new_table(vec!["Row", "Label"]);
            for p in &self.predictions {
                table.add_row(vec![Cell::new(p.row), Cell::new(&p.label)]);
            }
            return table;
        }

        let mut header = vec!["Row".to_string()];
        header.extend(self.predictions.iter().map(|p| p.row.to_string()));
        let mut table = new_table(header);
        let mut row = vec![Cell::new("Label").add_attribute(Attribute::Bold)];
        row.extend(self.predictions.iter().map(|p| Cell::new(&p.label)));
        table.add_row(row);
        table
    }
}

fn new_table<T: ToString>(header: Vec<T>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .into_iter()
            .map(|h| Cell::new(h.to_string()).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_table(table: &Table) {
    // Indent the table
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
