//! Torque plot artifacts
//!
//! Rendering is a collaborator of the recorder: anything implementing
//! [`TorquePlotter`] can turn a buffered series into a file. [`SvgPlotter`]
//! draws one line per joint with a `1`..`6` legend.

use crate::{
    types::{TorqueSample, NUM_JOINTS},
    Result,
};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

pub trait TorquePlotter {
    /// File extension of the produced artifact, without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, samples: &[TorqueSample], path: &Path) -> Result<()>;
}

const JOINT_COLORS: [&str; NUM_JOINTS] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

#[derive(Debug, Clone)]
pub struct SvgPlotter {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Default for SvgPlotter {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 480.0,
            margin: 48.0,
        }
    }
}

impl SvgPlotter {
    /// Build the SVG document for a torque series
    pub fn document(&self, samples: &[TorqueSample]) -> String {
        let plot_w = self.width - 2.0 * self.margin;
        let plot_h = self.height - 2.0 * self.margin;

        let (mut lo, mut hi) = samples
            .iter()
            .flat_map(|s| s.torques.0.iter().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() || !hi.is_finite() {
            lo = 0.0;
            hi = 1.0;
        }
        if (hi - lo).abs() < f64::EPSILON {
            lo -= 1.0;
            hi += 1.0;
        }

        let steps = samples.len().saturating_sub(1).max(1) as f64;
        let x = |i: usize| self.margin + plot_w * i as f64 / steps;
        let y = |v: f64| self.margin + plot_h * (hi - v) / (hi - lo);

        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            svg,
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" "#,
                r#"width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
            ),
            w = self.width,
            h = self.height
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="black"/>"#,
            self.margin, self.margin, plot_w, plot_h
        );
        let _ = writeln!(
            svg,
            r#"<text x="4" y="{}" font-size="12">{:.2}</text>"#,
            self.margin + 4.0,
            hi
        );
        let _ = writeln!(
            svg,
            r#"<text x="4" y="{}" font-size="12">{:.2}</text>"#,
            self.margin + plot_h,
            lo
        );

        for (joint, color) in JOINT_COLORS.iter().enumerate() {
            let points: Vec<String> = samples
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{:.2},{:.2}", x(i), y(s.torques.0[joint])))
                .collect();
            let _ = writeln!(
                svg,
                r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                color,
                points.join(" ")
            );

            let legend_y = self.margin + 14.0 * (joint as f64 + 1.0);
            let legend_x = self.width - self.margin + 8.0;
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" font-size="12" fill="{}">{}</text>"#,
                legend_x,
                legend_y,
                color,
                joint + 1
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl TorquePlotter for SvgPlotter {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn render(&self, samples: &[TorqueSample], path: &Path) -> Result<()> {
        fs::write(path, self.document(samples))?;
        info!("Torque plot saved to {}", path.display());
        Ok(())
    }
}
