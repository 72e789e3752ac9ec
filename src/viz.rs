//! Scatter plot of clustered patients using Plotters

use crate::data::PatientSet;
use crate::error::VitalsError;
use crate::model::LabelAssignment;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Plot size in pixels (width, height)
pub const PLOT_SIZE: (u32, u32) = (1000, 600);
const NORMAL_RADIUS: i32 = 4;
const ANOMALY_RADIUS: i32 = 6;
const ANOMALY_COLOR: RGBColor = RED;

/// Hue sweep for cluster colors: violet through blue and green to yellow
const HUE_START: f64 = 0.75;
const HUE_END: f64 = 0.17;

/// Which text elements get drawn around the points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decorations {
    /// Caption, axis labels, tick labels and legend
    Full,
    /// Grid and points only; needs no fonts
    Plain,
}

/// Where the finished plot goes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotOptions {
    /// Write a PNG here; nothing is written when `None`
    pub export: Option<PathBuf>,
    /// Show the plot in a window and wait for it to be closed
    pub display: bool,
}

/// What `publish_plot` actually did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotReport {
    pub exported: Option<PathBuf>,
    pub displayed: bool,
}

/// Color of a cluster on a continuous hue scale.
///
/// Ids are spread over the whole scale, so the first and last cluster always
/// get its two ends.
pub fn cluster_color(cluster_id: usize, n_clusters: usize) -> HSLColor {
    let position = if n_clusters > 1 {
        cluster_id.min(n_clusters - 1) as f64 / (n_clusters - 1) as f64
    } else {
        0.0
    };
    HSLColor(HUE_START + (HUE_END - HUE_START) * position, 0.8, 0.45)
}

/// Axis range covering every value with 5% padding on each side
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let padding = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - padding)..(max + padding)
}

fn check_inputs(patients: &PatientSet, labels: &LabelAssignment) -> Result<(), VitalsError> {
    if patients.is_empty() {
        return Err(VitalsError::InsufficientData {
            stage: "visualization",
            required: 1,
            actual: 0,
        });
    }
    if patients.len() != labels.len() {
        return Err(VitalsError::LabelMismatch {
            patients: patients.len(),
            labels: labels.len(),
        });
    }
    Ok(())
}

/// Draw the scatter plot onto any Plotters drawing area
///
/// # Arguments
/// * `root` - Drawing area to fill, typically a whole backend
/// * `patients` - Patients to draw, must be non-empty
/// * `labels` - Cluster labels for exactly those patients
/// * `decorations` - Whether text elements are drawn
pub fn draw_scatter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    patients: &PatientSet,
    labels: &LabelAssignment,
    decorations: Decorations,
) -> crate::Result<()>
where
    DB::ErrorType: 'static,
{
    check_inputs(patients, labels)?;

    let x_range = padded_range(patients.iter().map(|p| p.blood_pressure));
    let y_range = padded_range(patients.iter().map(|p| p.blood_sugar));
    let n_clusters = labels.cluster_sizes().len();

    let (normal, anomalies): (Vec<_>, Vec<_>) = patients
        .iter()
        .enumerate()
        .map(|(i, patient)| (labels.membership(i), patient.features()))
        .partition(|(membership, _)| membership.is_some());

    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(root);
    builder.margin(10);
    if decorations == Decorations::Full {
        builder
            .caption("Patient clustering", ("sans-serif", 30))
            .x_label_area_size(50)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

    let mut mesh = chart.configure_mesh();
    match decorations {
        Decorations::Full => {
            mesh.x_desc("Blood pressure (mmHg)")
                .y_desc("Blood sugar (mg/dL)")
                .axis_desc_style(("sans-serif", 15));
        }
        Decorations::Plain => {
            mesh.disable_axes();
        }
    }
    mesh.draw()?;

    let normal_series = chart.draw_series(normal.iter().map(|&(membership, [x, y])| {
        let color = cluster_color(membership.unwrap_or_default(), n_clusters);
        Circle::new((x, y), NORMAL_RADIUS, color.filled())
    }))?;
    if decorations == Decorations::Full {
        normal_series
            .label("Normal patients")
            .legend(|(x, y)| Circle::new((x, y), NORMAL_RADIUS, cluster_color(0, 1).filled()));
    }

    let anomaly_series = chart.draw_series(
        anomalies
            .iter()
            .map(|&(_, [x, y])| Circle::new((x, y), ANOMALY_RADIUS, ANOMALY_COLOR.filled())),
    )?;
    if decorations == Decorations::Full {
        anomaly_series
            .label("Anomalies")
            .legend(|(x, y)| Circle::new((x, y), ANOMALY_RADIUS, ANOMALY_COLOR.filled()));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Render patients as a scatter plot and save it as a PNG
///
/// # Arguments
/// * `patients` - Patients to draw, must be non-empty
/// * `labels` - Cluster labels for exactly those patients
/// * `output_path` - Path of the PNG to write
pub fn render_scatter(
    patients: &PatientSet,
    labels: &LabelAssignment,
    output_path: &Path,
) -> crate::Result<()> {
    // Checked first so a bad call never creates the file
    check_inputs(patients, labels)?;

    let root = BitMapBackend::new(output_path, PLOT_SIZE).into_drawing_area();
    draw_scatter(&root, patients, labels, Decorations::Full)
}

/// Render the full plot into an RGB buffer of `PLOT_SIZE`
pub fn render_to_buffer(patients: &PatientSet, labels: &LabelAssignment) -> crate::Result<Vec<u8>> {
    let (width, height) = PLOT_SIZE;
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, PLOT_SIZE).into_drawing_area();
        draw_scatter(&root, patients, labels, Decorations::Full)?;
    }
    Ok(buffer)
}

/// Show the plot in a window; blocks until it is closed (or Escape).
///
/// Returns `false` when the binary was built without the `window` feature.
#[cfg(feature = "window")]
pub fn show_scatter(patients: &PatientSet, labels: &LabelAssignment) -> crate::Result<bool> {
    use minifb::{Key, Window, WindowOptions};

    let buffer = render_to_buffer(patients, labels)?;
    let pixels: Vec<u32> = buffer
        .chunks_exact(3)
        .map(|rgb| (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2]))
        .collect();

    let (width, height) = (PLOT_SIZE.0 as usize, PLOT_SIZE.1 as usize);
    let mut window = Window::new("Patient clustering", width, height, WindowOptions::default())?;
    window.set_target_fps(30);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        window.update_with_buffer(&pixels, width, height)?;
    }
    Ok(true)
}

/// Show the plot in a window; blocks until it is closed (or Escape).
///
/// Returns `false` when the binary was built without the `window` feature.
#[cfg(not(feature = "window"))]
pub fn show_scatter(patients: &PatientSet, labels: &LabelAssignment) -> crate::Result<bool> {
    check_inputs(patients, labels)?;
    tracing::debug!("built without the `window` feature, plot not displayed");
    Ok(false)
}

/// Export and/or display the plot as requested
pub fn publish_plot(
    patients: &PatientSet,
    labels: &LabelAssignment,
    options: &PlotOptions,
) -> crate::Result<PlotReport> {
    check_inputs(patients, labels)?;

    let mut report = PlotReport::default();
    if let Some(path) = &options.export {
        render_scatter(patients, labels, path)?;
        report.exported = Some(path.clone());
    }
    if options.display {
        report.displayed = show_scatter(patients, labels)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use tempfile::tempdir;

    fn outlier_scenario() -> (PatientSet, LabelAssignment) {
        let patients: PatientSet =
            vec![[120.0, 90.0], [122.0, 91.0], [121.0, 89.0], [200.0, 250.0]]
                .into_iter()
                .collect();
        let labels = LabelAssignment::new(array![Some(0), Some(0), Some(0), None]);
        (patients, labels)
    }

    fn draw_plain(patients: &PatientSet, labels: &LabelAssignment) -> crate::Result<Vec<u8>> {
        let (width, height) = PLOT_SIZE;
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, PLOT_SIZE).into_drawing_area();
            draw_scatter(&root, patients, labels, Decorations::Plain)?;
        }
        Ok(buffer)
    }

    fn count_pixels(buffer: &[u8], rgb: (u8, u8, u8)) -> usize {
        buffer
            .chunks_exact(3)
            .filter(|px| (px[0], px[1], px[2]) == rgb)
            .count()
    }

    #[test]
    fn test_padded_range() {
        let range = padded_range([100.0, 200.0, 150.0].into_iter());
        assert!((range.start - 95.0).abs() < 1e-9);
        assert!((range.end - 205.0).abs() < 1e-9);

        // A single value still yields a non-empty range
        let range = padded_range(std::iter::once(120.0));
        assert!(range.start < 120.0 && range.end > 120.0);
    }

    #[test]
    fn test_cluster_colors_span_the_scale() {
        let first = cluster_color(0, 3);
        let last = cluster_color(2, 3);
        assert!((first.0 - HUE_START).abs() < 1e-9);
        assert!((last.0 - HUE_END).abs() < 1e-9);
        assert!((cluster_color(0, 1).0 - HUE_START).abs() < 1e-9);
    }

    #[test]
    fn test_draw_scatter_into_buffer() {
        let (patients, labels) = outlier_scenario();

        let buffer = draw_plain(&patients, &labels).unwrap();

        // Background filled, anomaly drawn red, cluster drawn in its map color
        assert!(count_pixels(&buffer, (255, 255, 255)) > 0);
        assert!(count_pixels(&buffer, ANOMALY_COLOR.rgb()) > 0);
        assert!(count_pixels(&buffer, cluster_color(0, 1).rgb()) > 0);
    }

    #[test]
    fn test_draw_scatter_without_anomalies_has_no_red() {
        let patients: PatientSet = vec![[120.0, 90.0], [122.0, 91.0]].into_iter().collect();
        let labels = LabelAssignment::new(array![Some(0), Some(0)]);

        let buffer = draw_plain(&patients, &labels).unwrap();

        assert_eq!(count_pixels(&buffer, ANOMALY_COLOR.rgb()), 0);
        assert!(count_pixels(&buffer, cluster_color(0, 1).rgb()) > 0);
    }

    #[test]
    fn test_render_rejects_empty_set() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("empty.png");
        let labels = LabelAssignment::new(Array1::from(Vec::new()));

        let err = render_scatter(&PatientSet::new(), &labels, &output_path).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<VitalsError>(),
            Some(VitalsError::InsufficientData { .. })
        ));
        assert!(!output_path.exists());
    }

    #[test]
    fn test_render_rejects_mismatched_labels() {
        let (patients, _) = outlier_scenario();
        let labels = LabelAssignment::new(array![Some(0), None]);
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("mismatch.png");

        let err = render_scatter(&patients, &labels, &output_path).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<VitalsError>(),
            Some(VitalsError::LabelMismatch { patients: 4, labels: 2 })
        ));
        assert!(!output_path.exists());
    }

    #[test]
    fn test_default_options_write_no_file() {
        let (patients, labels) = outlier_scenario();

        let report = publish_plot(&patients, &labels, &PlotOptions::default()).unwrap();

        assert_eq!(report, PlotReport::default());
    }

    #[test]
    #[ignore = "needs a system sans-serif font for captions"]
    fn test_publish_plot_exports_png() {
        let (patients, labels) = outlier_scenario();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("clusters.png");
        let options = PlotOptions {
            export: Some(output_path.clone()),
            display: false,
        };

        let report = publish_plot(&patients, &labels, &options).unwrap();

        assert_eq!(report.exported, Some(output_path.clone()));
        assert!(output_path.exists());
    }
}
