use crate::field::Potential;
use crate::grid::Grid;
use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes a finished potential as a PNG heatmap over physical x/y axes.
pub struct HeatmapRenderer {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    gradient: Box<dyn colorgrad::Gradient>,
}

impl HeatmapRenderer {
    pub fn new(output_dir: impl AsRef<Path>, width: u32, height: u32) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

        // Diverging map, so +1 and -1 electrodes land on opposite ends
        let gradient = Box::new(colorgrad::preset::rd_yl_bu());

        Ok(Self {
            output_dir,
            width,
            height,
            gradient,
        })
    }

    /// Render `potential` to `<output_dir>/<file_stem>.png` and return the path.
    pub fn render(
        &self,
        potential: &Potential,
        grid: &Grid,
        title: &str,
        file_stem: &str,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{file_stem}.png"));
        self.draw(potential, grid, title, &path)
            .map_err(|e| anyhow!("failed to render {}: {}", path.display(), e))?;
        info!(path = %path.display(), "saved heatmap");
        Ok(path)
    }

    fn draw(
        &self,
        potential: &Potential,
        grid: &Grid,
        title: &str,
        path: &Path,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let h = grid.h;
        let limit = potential.max_abs();

        // Each node owns the h x h cell to its upper right; y grows upwards,
        // so row 0 sits at the bottom of the image.
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..grid.width() + h, 0.0..grid.height() + h)?;

        chart.configure_mesh().x_desc("x").y_desc("y").draw()?;

        chart.draw_series(potential.phi.indexed_iter().map(|((i, j), &value)| {
            let x = grid.x_coord(j);
            let y = grid.y_coord(i);
            Rectangle::new(
                [(x, y), (x + h, y + h)],
                self.value_to_color(value, limit).filled(),
            )
        }))?;

        root.present()?;
        Ok(())
    }

    /// Map `value` in `[-limit, limit]` onto the gradient, positive towards red.
    pub fn value_to_color(&self, value: f64, limit: f64) -> RGBColor {
        let normalized = if limit > 0.0 {
            0.5 - 0.5 * value / limit
        } else {
            0.5
        };
        let normalized = normalized.clamp(0.0, 1.0);
        let rgba = self.gradient.at(normalized as f32).to_rgba8();
        RGBColor(rgba[0], rgba[1], rgba[2])
    }
}
