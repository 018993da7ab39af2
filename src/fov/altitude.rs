//! Altitude bands of a range-gate window.
//!
//! Echoes from one propagation mode cluster in virtual height. The bands are found from
//! peaks of the height histogram, each widened to ±3σ of a Gaussian fitted around it, and
//! the rest of the region is tiled with uniform bands.
use crate::fitting::gaussian::{fit_gaussian, GaussianFit};
use itertools::Itertools;
use tracing::debug;

/// Number of histogram bins per uniform band width.
const BINS_PER_BOX: f64 = 5.0;

/// Virtual height interval, closed below and open above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeBand {
    pub min: f64,
    pub max: f64,
}

impl AltitudeBand {
    pub fn contains(&self, height: f64) -> bool {
        height >= self.min && height < self.max
    }

    fn overlaps(&self, other: &AltitudeBand) -> bool {
        self.min < other.max && other.min < self.max
    }
}

/// Index of the band containing `height`. The last band also holds its upper edge.
pub fn band_index(bands: &[AltitudeBand], height: f64) -> Option<usize> {
    bands.iter().position(|b| b.contains(height)).or_else(|| {
        bands
            .last()
            .filter(|b| height == b.max)
            .map(|_| bands.len() - 1)
    })
}

/// Bands of width `vh_box` tiling [min_height, max_height]. The last one may be narrower.
pub fn uniform_bands(min_height: f64, max_height: f64, vh_box: f64) -> Vec<AltitudeBand> {
    let mut bands = vec![];
    let mut lower = min_height;
    while lower < max_height {
        let upper = (lower + vh_box).min(max_height);
        bands.push(AltitudeBand {
            min: lower,
            max: upper,
        });
        lower = upper;
    }
    bands
}

struct Histogram {
    centres: Vec<f64>,
    counts: Vec<f64>,
}

fn histogram(heights: &[f64], min_height: f64, max_height: f64, width: f64) -> Histogram {
    let num_bins = (((max_height - min_height) / width).ceil() as usize).max(1);
    let mut counts = vec![0.0; num_bins];
    for &h in heights {
        let bin = (((h - min_height) / width).floor() as usize).min(num_bins - 1);
        counts[bin] += 1.0;
    }
    let centres = (0..num_bins)
        .map(|i| min_height + (i as f64 + 0.5) * width)
        .collect();
    Histogram { centres, counts }
}

/// Bins that rise above their left neighbour and are not below their right one. Falls back
/// to the fullest bin when there is no such bin.
fn find_peaks(counts: &[f64]) -> Vec<usize> {
    let mut peaks: Vec<usize> = (0..counts.len())
        .filter(|&i| {
            counts[i] > 0.0
                && (i == 0 || counts[i] > counts[i - 1])
                && (i + 1 == counts.len() || counts[i] >= counts[i + 1])
        })
        .collect();
    if peaks.is_empty() {
        if let Some((i, _)) = counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
        {
            peaks.push(i);
        }
    }
    // tallest first, lower height on ties
    peaks.sort_by(|&a, &b| counts[b].total_cmp(&counts[a]).then(a.cmp(&b)));
    peaks
}

fn peak_band(hist: &Histogram, peak: usize, vh_box: f64) -> Option<AltitudeBand> {
    let centre = hist.centres[peak];
    let (x, y): (Vec<f64>, Vec<f64>) = hist
        .centres
        .iter()
        .zip(&hist.counts)
        .filter(|(c, _)| (*c - centre).abs() <= vh_box)
        .map(|(c, n)| (*c, *n))
        .unzip();
    let guess = GaussianFit {
        amplitude: hist.counts[peak],
        mean: centre,
        sigma: vh_box / 4.0,
    };
    match fit_gaussian(&x, &y, guess) {
        Ok(fit) if (centre - fit.mean).abs() <= 2.0 * fit.sigma => Some(AltitudeBand {
            min: fit.mean - 3.0 * fit.sigma,
            max: fit.mean + 3.0 * fit.sigma,
        }),
        Ok(fit) => {
            debug!(centre, mean = fit.mean, sigma = fit.sigma, "peak outside its fitted 2σ");
            None
        }
        Err(e) => {
            debug!(centre, "Gaussian fit failed: {e}");
            None
        }
    }
}

/// Splits [min_height, max_height] into non-overlapping, increasing altitude bands around
/// the peaks of the distribution of `heights`.
///
/// Bands of taller peaks take precedence: a later band overlapping an accepted one is trimmed
/// back to the edge of the accepted band on its own side, or dropped when its peak already
/// lies inside an accepted band. Gaps are tiled with uniform bands of width `vh_box`. When no
/// peak can be fitted, or there are fewer than `min_pnts` heights, the whole interval is
/// tiled uniformly.
pub fn select_alt_groups(
    heights: &[f64],
    min_height: f64,
    max_height: f64,
    vh_box: f64,
    min_pnts: usize,
) -> Vec<AltitudeBand> {
    let inside: Vec<f64> = heights
        .iter()
        .copied()
        .filter(|&h| h >= min_height && h <= max_height)
        .collect();
    if inside.len() < min_pnts.max(1) {
        return uniform_bands(min_height, max_height, vh_box);
    }

    let hist = histogram(&inside, min_height, max_height, (vh_box / BINS_PER_BOX).max(1.0));
    let mut accepted: Vec<AltitudeBand> = vec![];
    'peaks: for peak in find_peaks(&hist.counts) {
        let Some(mut band) = peak_band(&hist, peak, vh_box) else {
            continue;
        };
        band.min = band.min.max(min_height);
        band.max = band.max.min(max_height);
        let centre = hist.centres[peak];
        for other in &accepted {
            if !band.overlaps(other) {
                continue;
            }
            if other.contains(centre) {
                continue 'peaks;
            }
            if centre < other.min {
                band.max = band.max.min(other.min);
            } else {
                band.min = band.min.max(other.max);
            }
        }
        if band.max > band.min {
            accepted.push(band);
        }
    }
    if accepted.is_empty() {
        debug!(min_height, max_height, "no altitude peak could be fitted");
        return uniform_bands(min_height, max_height, vh_box);
    }

    let accepted: Vec<AltitudeBand> = accepted
        .into_iter()
        .sorted_by(|a, b| a.min.total_cmp(&b.min))
        .collect();
    let mut bands = vec![];
    let mut lower = min_height;
    for band in accepted {
        bands.extend(uniform_bands(lower, band.min, vh_box));
        lower = band.max;
        bands.push(band);
    }
    bands.extend(uniform_bands(lower, max_height, vh_box));
    bands
}
