//! Box-and-whisker figures of the aggregated prices.
//!
//! Every figure has one panel per bracket and one box per insurer. A box is
//! filled on a green → white → red scale by how far its median sits from the
//! panel's reference median.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::aggregate::{AggregateGroup, Bracket, Breakdown, GroupKey, panels};
use crate::prelude::*;

/// Median difference, in price units, that spans half the colour scale.
pub const SIGNIFICANT_PRICE_DIFFERENCE: f64 = 50.0;

const GREEN: RGBColor = RGBColor(0, 128, 0);

/// Position of a box on the colour scale, clamped into `[0, 1]`;
/// `0.5` is a box whose median equals the reference.
pub fn intensity(group_median: f64, reference: f64) -> f64 {
    ((group_median - reference) / SIGNIFICANT_PRICE_DIFFERENCE + 0.5).clamp(0.0, 1.0)
}

/// Linear green → white → red map.
pub fn color(intensity: f64) -> RGBColor {
    let t = intensity.clamp(0.0, 1.0);
    let (from, to, t) = if t <= 0.5 { (GREEN, WHITE, t * 2.0) } else { (WHITE, RED, (t - 0.5) * 2.0) };
    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Quantile of ascending `sorted` with linear interpolation between the
/// closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = q.clamp(0.0, 1.0) * last as f64;
    let (lo, hi) = (position.floor() as usize, position.ceil() as usize);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64))
}

pub fn median(sorted: &[f64]) -> Option<f64> {
    quantile(sorted, 0.5)
}

/// What a box is drawn from. Whiskers reach the most extreme prices within
/// 1.5 × IQR of the box; prices beyond them are not drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSummary {
    pub whisker_low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_high: f64,
}

impl BoxSummary {
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let (q1, median, q3) = (quantile(sorted, 0.25)?, quantile(sorted, 0.5)?, quantile(sorted, 0.75)?);
        let reach = 1.5 * (q3 - q1);
        let whisker_low = sorted.iter().copied().find(|&p| p >= q1 - reach).unwrap_or(q1);
        let whisker_high = sorted.iter().rev().copied().find(|&p| p <= q3 + reach).unwrap_or(q3);
        Some(BoxSummary { whisker_low, q1, median, q3, whisker_high })
    }
}

/// The median each box of a panel is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMedian {
    /// Median of all prices of the panel.
    Pooled,
    /// Median of the per-insurer medians.
    OfGroupMedians,
}

impl ReferenceMedian {
    /// `None` when the panel has no prices.
    pub fn of(self, groups: &[&[f64]]) -> Option<f64> {
        let mut values: Vec<f64> = match self {
            ReferenceMedian::Pooled => groups.iter().flat_map(|g| g.iter().copied()).collect(),
            ReferenceMedian::OfGroupMedians => groups.iter().filter_map(|g| median(g)).collect(),
        };
        values.sort_by(f64::total_cmp);
        median(&values)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpec {
    pub label: String,
    pub summary: BoxSummary,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSpec {
    pub title: String,
    pub boxes: Vec<BoxSpec>,
}

/// A laid-out figure; [`Figure::render`] draws it.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub file_name: &'static str,
    pub size: (u32, u32),
    pub panels: Vec<PanelSpec>,
}

impl Figure {
    /// Lay out the aggregate groups of `breakdown`, which must be in key
    /// order as [`crate::aggregate::aggregate`] returns them.
    pub fn from_groups(breakdown: Breakdown, groups: &[AggregateGroup<GroupKey>]) -> Self {
        let (file_name, size, reference) = match breakdown {
            Breakdown::Insurer => ("insurers_prices_boxplot.png", (640, 480), ReferenceMedian::Pooled),
            Breakdown::Age => ("insurance_prices_age_insurer_boxplot.png", (1000, 800), ReferenceMedian::Pooled),
            Breakdown::CarAge => {
                ("insurance_prices_car_age_insurer_boxplot.png", (1000, 2000), ReferenceMedian::OfGroupMedians)
            }
            Breakdown::Location => {
                ("insurance_prices_location_insurer_boxplot.png", (1000, 2000), ReferenceMedian::OfGroupMedians)
            }
            Breakdown::Month => ("insurance_prices_seasonality_insurer_boxplot.png", (1500, 3000), ReferenceMedian::Pooled),
        };

        let panels = panels(groups)
            .into_iter()
            .map(|(bracket, members)| {
                let prices: Vec<&[f64]> = members.iter().map(|g| g.prices.as_slice()).collect();
                let reference = reference.of(&prices);
                let boxes = members
                    .iter()
                    .filter_map(|g| {
                        let summary = BoxSummary::from_sorted(&g.prices)?;
                        Some(BoxSpec {
                            label: g.key.insurer.to_string(),
                            summary,
                            intensity: intensity(summary.median, reference?),
                        })
                    })
                    .collect();
                PanelSpec { title: panel_title(bracket), boxes }
            })
            .collect();

        Figure { file_name, size, panels }
    }

    /// Draw into `dir`, creating it if missing. Returns the written path.
    #[instrument(skip_all, fields(file = self.file_name))]
    pub fn render(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(self.file_name);

        {
            let root = BitMapBackend::new(&path, self.size).into_drawing_area();
            root.fill(&WHITE)?;
            for (panel, area) in self.panels.iter().zip(root.split_evenly((self.panels.len().max(1), 1))) {
                draw_panel(panel, &area)?;
            }
            root.present().with_context(|| format!("failed to write {}", path.display()))?;
        }

        info!(path = %path.display(), panels = self.panels.len(), "rendered figure");
        Ok(path)
    }
}

fn panel_title(bracket: Bracket) -> String {
    match bracket {
        Bracket::All => "Insurance Prices by Insurer".to_string(),
        Bracket::Age(age) => format!("Insurance Prices by Insurer - Age Group: {}", age.label()),
        Bracket::CarAge(car_age) => format!("Insurance Prices by Insurer - Car Age Group: {}", car_age.label()),
        Bracket::Location(location) => format!("Insurance Prices by Insurer - Location: {location}"),
        Bracket::Month(month) => format!("Insurance Prices by Insurer - {}", month.name()),
    }
}

/// Box `i` is centred on `x = i`.
fn draw_panel(panel: &PanelSpec, area: &DrawingArea<BitMapBackend<'_>, Shift>) -> Result {
    if panel.boxes.is_empty() {
        warn!(panel = %panel.title, "nothing to draw");
        return Ok(());
    }

    let low = panel.boxes.iter().map(|b| b.summary.whisker_low).fold(f64::INFINITY, f64::min);
    let high = panel.boxes.iter().map(|b| b.summary.whisker_high).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((high - low) * 0.05).max(1.0);
    let n = panel.boxes.len();

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..n as f64 - 0.5, (low - pad)..(high + pad))?;

    let labels: Vec<&str> = panel.boxes.iter().map(|b| b.label.as_str()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&|x| {
            let i = x.round();
            match labels.get(i as usize) {
                Some(label) if (x - i).abs() < 1e-6 && i >= 0.0 => (*label).to_string(),
                _ => String::new(),
            }
        })
        .x_desc("Insurer")
        .y_desc("Price")
        .draw()?;

    const HALF_WIDTH: f64 = 0.3;
    let boxes = || panel.boxes.iter().enumerate().map(|(i, b)| (i as f64, b));

    chart.draw_series(boxes().map(|(x, b)| {
        Rectangle::new([(x - HALF_WIDTH, b.summary.q1), (x + HALF_WIDTH, b.summary.q3)], color(b.intensity).filled())
    }))?;
    chart.draw_series(boxes().map(|(x, b)| {
        Rectangle::new([(x - HALF_WIDTH, b.summary.q1), (x + HALF_WIDTH, b.summary.q3)], BLACK.stroke_width(1))
    }))?;
    chart.draw_series(boxes().flat_map(|(x, b)| {
        let s = b.summary;
        let cap = HALF_WIDTH / 2.0;
        [
            PathElement::new(vec![(x - HALF_WIDTH, s.median), (x + HALF_WIDTH, s.median)], BLACK.stroke_width(2)),
            PathElement::new(vec![(x, s.q1), (x, s.whisker_low)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x, s.q3), (x, s.whisker_high)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x - cap, s.whisker_low), (x + cap, s.whisker_low)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x - cap, s.whisker_high), (x + cap, s.whisker_high)], BLACK.stroke_width(1)),
        ]
    }))?;

    Ok(())
}
