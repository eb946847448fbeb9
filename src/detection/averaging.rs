use tracing::{debug, warn};

use crate::models::{FitParams, LaneLine, LaneLines, LaneSide, LineSegment};

/// Component-wise mean of the finite fits, or None if nothing usable remains
pub fn average_fits(fits: &[FitParams]) -> Option<FitParams> {
    let finite: Vec<&FitParams> = fits.iter().filter(|f| f.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }

    let n = finite.len() as f64;
    let average = FitParams {
        slope: finite.iter().map(|f| f.slope).sum::<f64>() / n,
        intercept: finite.iter().map(|f| f.intercept).sum::<f64>() / n,
    };
    average.is_finite().then_some(average)
}

/// Turn a fit into a line from the bottom row up to `horizon_ratio` of the height
pub fn lane_line_from_fit(
    fit: &FitParams,
    frame_height: u32,
    horizon_ratio: f64,
) -> Option<LaneLine> {
    if fit.slope == 0.0 {
        warn!("slope is zero, cannot solve for x");
        return None;
    }

    let y1 = frame_height as f64;
    let y2 = (y1 * horizon_ratio).trunc();
    let x1 = fit.x_at(y1).trunc();
    let x2 = fit.x_at(y2).trunc();

    if !(x1.is_finite() && x2.is_finite()) {
        warn!(x1, x2, "non-finite x computed for lane line");
        return None;
    }

    Some(LaneLine { x1, y1, x2, y2 })
}

/// Split segments into left/right by slope sign, average each side and
/// convert the averages back into drawable lines
pub fn average_slope_intercept(
    frame_height: u32,
    segments: &[LineSegment],
    horizon_ratio: f64,
) -> LaneLines {
    let mut left_fit = Vec::new();
    let mut right_fit = Vec::new();

    for segment in segments {
        let Some(fit) = FitParams::from_segment(segment) else {
            continue;
        };
        match LaneSide::classify(&fit) {
            LaneSide::Left => left_fit.push(fit),
            LaneSide::Right => right_fit.push(fit),
        }
    }

    debug!(left = left_fit.len(), right = right_fit.len(), "classified segment fits");

    let side = |fits: &[FitParams]| {
        average_fits(fits).and_then(|avg| lane_line_from_fit(&avg, frame_height, horizon_ratio))
    };

    LaneLines {
        left: side(&left_fit),
        right: side(&right_fit),
    }
}
