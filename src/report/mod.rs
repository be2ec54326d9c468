//! Diagnostic plot rendering
//!
//! ROC curve, precision-recall curve, and top-20 feature importances as
//! PNG files. Rendering is a reporting side effect: callers wrap each
//! render in `try_compute` so a failure leaves the artifact reference
//! absent without failing the train/predict result.

use crate::error::{try_compute, ExoSeekrError, Result};
use crate::store::relative_display;
use crate::training::{precision_recall_curve, roc_curve, EvalMetrics};
use ndarray::Array1;
use plotters::prelude::*;
use serde::Serialize;
use std::path::Path;

/// References to the rendered diagnostic artifacts; absent when the
/// corresponding render was skipped or failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlotRefs {
    pub roc: Option<String>,
    pub pr: Option<String>,
    pub importances: Option<String>,
}

fn plot_err(err: impl std::fmt::Display) -> ExoSeekrError {
    ExoSeekrError::ComputationError(format!("plot rendering failed: {err}"))
}

/// Render the standard diagnostic set (ROC, PR, top-20 importances) into
/// `plots_dir` with timestamped filenames. Each artifact is independent
/// and best-effort; references are relative to the project root.
pub fn render_diagnostics(
    plots_dir: &Path,
    project_root: &Path,
    ts: &str,
    metrics: Option<&EvalMetrics>,
    scored_labels: Option<(&Array1<f64>, &Array1<f64>)>,
    importances: Option<&[(String, f64)]>,
) -> PlotRefs {
    let _ = std::fs::create_dir_all(plots_dir);

    let roc = metrics
        .and_then(|m| m.roc_auc)
        .zip(scored_labels)
        .and_then(|(auc, (y_true, y_prob))| {
            try_compute("roc plot", || {
                let points = roc_curve(y_true, y_prob)?;
                let path = plots_dir.join(format!("roc_{ts}.png"));
                render_roc_curve(&points, auc, &path)?;
                Ok(relative_display(&path, project_root))
            })
        });

    let pr = metrics
        .and_then(|m| m.pr_auc)
        .zip(scored_labels)
        .and_then(|(ap, (y_true, y_prob))| {
            try_compute("pr plot", || {
                let points = precision_recall_curve(y_true, y_prob)?;
                let path = plots_dir.join(format!("pr_{ts}.png"));
                render_pr_curve(&points, ap, &path)?;
                Ok(relative_display(&path, project_root))
            })
        });

    let importances = importances.and_then(|imp| {
        try_compute("importances plot", || {
            let path = plots_dir.join(format!("importances_{ts}.png"));
            render_importances(imp, &path)?;
            Ok(relative_display(&path, project_root))
        })
    });

    PlotRefs {
        roc,
        pr,
        importances,
    }
}

/// Render a ROC curve with the chance diagonal.
pub fn render_roc_curve(points: &[(f64, f64)], auc: f64, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("ROC Curve", ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(45)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("False Positive Rate")
        .y_desc("True Positive Rate")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            vec![(0.0, 0.0), (1.0, 1.0)],
            BLACK.mix(0.4),
        ))
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(points.to_vec(), BLUE.stroke_width(2)))
        .map_err(plot_err)?
        .label(format!("ROC (AUC={auc:.3})"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .border_style(BLACK.mix(0.4))
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render a precision-recall curve.
pub fn render_pr_curve(points: &[(f64, f64)], ap: f64, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Precision-Recall Curve", ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(45)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Recall")
        .y_desc("Precision")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(points.to_vec(), GREEN.stroke_width(2)))
        .map_err(plot_err)?
        .label(format!("PR (AUC={ap:.3})"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerLeft)
        .border_style(BLACK.mix(0.4))
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render a horizontal bar chart of the top feature importances.
/// `importances` must be sorted descending; at most 20 bars are drawn,
/// largest at the top.
pub fn render_importances(importances: &[(String, f64)], path: &Path) -> Result<()> {
    if importances.is_empty() {
        return Err(ExoSeekrError::ComputationError(
            "no importances to plot".to_string(),
        ));
    }

    let top: Vec<&(String, f64)> = importances.iter().take(20).collect();
    let max_imp = top
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0_f64, f64::max)
        .max(1e-9);
    let n = top.len();

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let names: Vec<String> = top.iter().map(|(name, _)| name.clone()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption("Top 20 Feature Importances", ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(180)
        .build_cartesian_2d(0.0..max_imp * 1.05, 0.0..n as f64)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Importance")
        .y_labels(n)
        .y_label_formatter(&|y: &f64| {
            // Bars are drawn top-down: index 0 is the most important
            let idx = n as f64 - y - 0.5;
            if idx < 0.0 {
                return String::new();
            }
            names.get(idx as usize).cloned().unwrap_or_default()
        })
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(top.iter().enumerate().map(|(i, (_, value))| {
            let y = (n - 1 - i) as f64;
            Rectangle::new([(0.0, y + 0.15), (*value, y + 0.85)], BLUE.mix(0.7).filled())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
