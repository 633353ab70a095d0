use crate::types::{ChannelGrid, OffsetError, OffsetResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Gap-filling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillParams {
    /// Maximum number of cells a value may travel from its seed
    pub max_search_dist: usize,
    /// 3x3 smoothing passes over the filled cells
    pub smooth_iterations: usize,
}

impl Default for GapFillParams {
    fn default() -> Self {
        Self {
            max_search_dist: 1000,
            smooth_iterations: 10,
        }
    }
}

const NEIGHBOURS: [(isize, isize, f64); 8] = [
    (-1, 0, 1.0),
    (1, 0, 1.0),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (-1, -1, std::f64::consts::FRAC_1_SQRT_2),
    (-1, 1, std::f64::consts::FRAC_1_SQRT_2),
    (1, -1, std::f64::consts::FRAC_1_SQRT_2),
    (1, 1, std::f64::consts::FRAC_1_SQRT_2),
];

/// Fill invalid cells by propagating valid values inwards.
///
/// Each round assigns every invalid cell touching a known cell the
/// inverse-distance weighted mean of its known 8-neighbours; rounds stop after
/// `max_search_dist` or when nothing changes. The filled region is then smoothed
/// `smooth_iterations` times with a 3x3 mean over known cells; original values
/// are never modified. Cells out of reach are returned as NaN.
pub fn fill_gaps(
    array: &ChannelGrid,
    valid_mask: &Array2<bool>,
    max_search_dist: usize,
    smooth_iterations: usize,
) -> OffsetResult<ChannelGrid> {
    if array.dim() != valid_mask.dim() {
        return Err(OffsetError::Processing(format!(
            "validity mask {:?} does not match grid {:?}",
            valid_mask.dim(),
            array.dim()
        )));
    }
    if max_search_dist == 0 {
        return Err(OffsetError::InvalidConfiguration(
            "gap-fill search distance must be at least 1".to_string(),
        ));
    }

    let (height, width) = array.dim();
    let mut known: Array2<bool> = ndarray::Zip::from(array)
        .and(valid_mask)
        .map_collect(|v, &ok| ok && !v.is_nan());
    let mut values = ndarray::Zip::from(array)
        .and(&known)
        .map_collect(|&v, &ok| if ok { v } else { f32::NAN });
    let mut filled = Array2::from_elem((height, width), false);

    let void_count = known.iter().filter(|&&k| !k).count();
    if void_count == 0 || void_count == known.len() {
        return Ok(values);
    }

    let neighbour = |i: usize, j: usize, di: isize, dj: isize| -> Option<(usize, usize)> {
        let ni = i as isize + di;
        let nj = j as isize + dj;
        (ni >= 0 && ni < height as isize && nj >= 0 && nj < width as isize)
            .then(|| (ni as usize, nj as usize))
    };

    let mut rounds = 0;
    for _ in 0..max_search_dist {
        let mut updates = Vec::new();
        for ((i, j), &is_known) in known.indexed_iter() {
            if is_known {
                continue;
            }
            let mut sum = 0.0f64;
            let mut weight = 0.0f64;
            for &(di, dj, w) in NEIGHBOURS.iter() {
                if let Some((ni, nj)) = neighbour(i, j, di, dj) {
                    if known[[ni, nj]] {
                        sum += w * values[[ni, nj]] as f64;
                        weight += w;
                    }
                }
            }
            if weight > 0.0 {
                updates.push((i, j, (sum / weight) as f32));
            }
        }
        if updates.is_empty() {
            break;
        }
        for (i, j, v) in updates {
            values[[i, j]] = v;
            known[[i, j]] = true;
            filled[[i, j]] = true;
        }
        rounds += 1;
    }

    for _ in 0..smooth_iterations {
        let mut smoothed = values.clone();
        for ((i, j), &is_filled) in filled.indexed_iter() {
            if !is_filled {
                continue;
            }
            let mut sum = values[[i, j]] as f64;
            let mut count = 1usize;
            for &(di, dj, _) in NEIGHBOURS.iter() {
                if let Some((ni, nj)) = neighbour(i, j, di, dj) {
                    if known[[ni, nj]] {
                        sum += values[[ni, nj]] as f64;
                        count += 1;
                    }
                }
            }
            smoothed[[i, j]] = (sum / count as f64) as f32;
        }
        values = smoothed;
    }

    let filled_count = filled.iter().filter(|&&f| f).count();
    log::debug!(
        "Gap fill: {} of {} void cells filled in {} rounds",
        filled_count,
        void_count,
        rounds
    );
    Ok(values)
}
