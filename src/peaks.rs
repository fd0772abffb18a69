//! Peak picker (spec §4.3): local-maximum detection + connected
//! components, keeping only singleton-pixel components. Grounded in
//! `examples/original_source/functions.py`'s `form_constellation`
//! (`maximum_filter` + `ndimage.label` + `find_objects` + the
//! `== 1`-area filter).

use std::collections::VecDeque;

use crate::config::NEIGHBORHOOD_SIZE;
use crate::spectral::Matrix;
use crate::types::{Constellation, Peak};

/// Sliding-window maximum over a 1-D slice, window centered on each
/// index and clamped to the slice bounds at the edges. `O(n)` via a
/// monotonic deque.
fn sliding_max_1d(data: &[f32], window: usize) -> Vec<f32> {
    let n = data.len();
    let low_half = (window - 1) / 2;
    let high_half = window / 2;
    let mut out = vec![0.0f32; n];
    let mut deque: VecDeque<usize> = VecDeque::new();

    // process with a window [i - low_half, i + high_half] clamped to [0, n)
    let mut right = 0usize;
    for i in 0..n {
        let lo = i.saturating_sub(low_half);
        let hi = (i + high_half).min(n.saturating_sub(1));
        while right <= hi && right < n {
            while let Some(&back) = deque.back() {
                if data[back] <= data[right] {
                    deque.pop_back();
                } else {
                    break;
                }
            }
            deque.push_back(right);
            right += 1;
        }
        while let Some(&front) = deque.front() {
            if front < lo {
                deque.pop_front();
            } else {
                break;
            }
        }
        out[i] = data[*deque.front().unwrap()];
    }
    out
}

/// 2-D maximum filter over a square neighbourhood, separable into a
/// row-wise pass followed by a column-wise pass (valid because the
/// neighbourhood is rectangular).
fn maximum_filter(matrix: &Matrix, window: usize) -> Vec<f32> {
    let bands = matrix.bands();
    let frames = matrix.frames();

    // pass 1: max along the time axis, independently per band.
    let mut row_max = vec![0.0f32; bands * frames];
    for band in 0..bands {
        let row: Vec<f32> = (0..frames).map(|frame| matrix.get(band, frame)).collect();
        let filtered = sliding_max_1d(&row, window);
        row_max[band * frames..(band + 1) * frames].copy_from_slice(&filtered);
    }

    // pass 2: max along the frequency axis, independently per frame.
    let mut out = vec![0.0f32; bands * frames];
    for frame in 0..frames {
        let col: Vec<f32> = (0..bands).map(|band| row_max[band * frames + frame]).collect();
        let filtered = sliding_max_1d(&col, window);
        for (band, &v) in filtered.iter().enumerate() {
            out[band * frames + frame] = v;
        }
    }
    out
}

/// `matrix -> Constellation` (spec §4.3).
pub fn pick(matrix: &Matrix) -> Constellation {
    let bands = matrix.bands();
    let frames = matrix.frames();
    if bands == 0 || frames == 0 {
        return Constellation::default();
    }

    let local_max = maximum_filter(matrix, NEIGHBORHOOD_SIZE);

    // boolean mask of local maxima, addressed [band][frame] row-major
    let mut mask = vec![false; bands * frames];
    for band in 0..bands {
        for frame in 0..frames {
            let idx = band * frames + frame;
            mask[idx] = matrix.get(band, frame) == local_max[idx];
        }
    }

    // 4-connectivity labelling via BFS; keep components whose
    // bounding box is exactly one pixel.
    let mut visited = vec![false; bands * frames];
    let mut peaks = Vec::new();

    for band in 0..bands {
        for frame in 0..frames {
            let idx = band * frames + frame;
            if !mask[idx] || visited[idx] {
                continue;
            }

            let mut queue = VecDeque::new();
            queue.push_back((band, frame));
            visited[idx] = true;

            let (mut min_band, mut max_band) = (band, band);
            let (mut min_frame, mut max_frame) = (frame, frame);

            while let Some((b, t)) = queue.pop_front() {
                min_band = min_band.min(b);
                max_band = max_band.max(b);
                min_frame = min_frame.min(t);
                max_frame = max_frame.max(t);

                let neighbors = [
                    (b.checked_sub(1), Some(t)),
                    (Some(b + 1).filter(|&v| v < bands), Some(t)),
                    (Some(b), t.checked_sub(1)),
                    (Some(b), Some(t + 1).filter(|&v| v < frames)),
                ];
                for (nb, nt) in neighbors {
                    if let (Some(nb), Some(nt)) = (nb, nt) {
                        let nidx = nb * frames + nt;
                        if mask[nidx] && !visited[nidx] {
                            visited[nidx] = true;
                            queue.push_back((nb, nt));
                        }
                    }
                }
            }

            let width = max_frame - min_frame + 1;
            let height = max_band - min_band + 1;
            if width * height == 1 {
                peaks.push(Peak {
                    t: min_frame as u32,
                    f: min_band as u32,
                });
            }
        }
    }

    Constellation::from_peaks(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::spectrogram;

    #[test]
    fn constant_spectrogram_has_no_peaks() {
        let pcm = vec![0.0f32; crate::config::WINDOW_SIZE * 5];
        let matrix = spectrogram(&pcm);
        let constellation = pick(&matrix);
        assert!(constellation.is_empty());
    }

    #[test]
    fn empty_matrix_has_no_peaks() {
        let pcm: Vec<f32> = vec![];
        let matrix = spectrogram(&pcm);
        let constellation = pick(&matrix);
        assert!(constellation.is_empty());
    }

    #[test]
    fn picked_peaks_are_sorted_and_deduped() {
        let freq = 1200.0f32;
        let n = crate::config::WINDOW_SIZE * 8;
        let pcm: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / crate::config::SAMPLE_RATE as f32).sin())
            .collect();
        let matrix = spectrogram(&pcm);
        let constellation = pick(&matrix);
        assert!(constellation.is_well_formed());
    }
}
