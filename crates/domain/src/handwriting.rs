//! Deterministic handwriting synthesis: maps sampled glyph/path polylines
//! into a jittered, pressure-varying `StrokeBatch`. Kept a pure function of
//! its inputs plus an explicit RNG seed so stroke output is reproducible in
//! tests (spec §9 design note).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::action::{Stroke, StrokeBatch, StrokePoint};

/// One sampled path, in local glyph/SVG coordinates before placement.
pub type SampledPath = Vec<(f64, f64)>;

const JITTER_AMPLITUDE: f64 = 0.6;
const BASE_PRESSURE: f64 = 0.55;
const PRESSURE_VARIANCE: f64 = 0.25;
const DEFAULT_ANIMATION_SPEED: f64 = 1.0;

/// Turn a set of sampled polylines (already positioned at the write's
/// origin) into a `StrokeBatch` with small randomized jitter and a pressure
/// envelope that rises then falls along each stroke.
pub fn synthesize(
    paths: &[SampledPath],
    color: &str,
    width: f64,
    seed: u64,
) -> StrokeBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    let strokes = paths
        .iter()
        .filter(|p| !p.is_empty())
        .map(|path| jittered_stroke(path, color, width, &mut rng))
        .collect();

    StrokeBatch {
        strokes,
        animation_speed: DEFAULT_ANIMATION_SPEED,
    }
}

fn jittered_stroke(path: &SampledPath, color: &str, width: f64, rng: &mut StdRng) -> Stroke {
    let n = path.len().max(1);
    let points = path
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let jx: f64 = rng.gen_range(-JITTER_AMPLITUDE..JITTER_AMPLITUDE);
            let jy: f64 = rng.gen_range(-JITTER_AMPLITUDE..JITTER_AMPLITUDE);
            let t = i as f64 / n as f64;
            let envelope = 1.0 - (2.0 * t - 1.0).abs(); // rises then falls
            let pressure = (BASE_PRESSURE + envelope * PRESSURE_VARIANCE).clamp(0.05, 1.0);
            StrokePoint {
                x: x + jx,
                y: y + jy,
                pressure,
            }
        })
        .collect();

    Stroke {
        points,
        color: color.to_string(),
        width,
    }
}

/// Heuristic vertical extent estimate for a `write` action before
/// synthesis, used by the rebase step (spec §9: left as an implementation
/// detail, bounded by the invariant that the write must fit under
/// `maxBoardHeight`).
///
/// `line_count` is the number of newline-separated lines in the write's
/// content; `line_height` is the configured target glyph/render height.
pub fn estimate_extent(line_count: usize, line_height: u32) -> i64 {
    let lines = line_count.max(1) as i64;
    lines * line_height as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_is_deterministic_given_same_seed() {
        let paths = vec![vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]];
        let a = synthesize(&paths, "#000", 2.0, 42);
        let b = synthesize(&paths, "#000", 2.0, 42);
        let pa: Vec<_> = a.strokes[0].points.iter().map(|p| (p.x, p.y)).collect();
        let pb: Vec<_> = b.strokes[0].points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn synthesize_different_seeds_diverge() {
        let paths = vec![vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]];
        let a = synthesize(&paths, "#000", 2.0, 1);
        let b = synthesize(&paths, "#000", 2.0, 2);
        let pa: Vec<_> = a.strokes[0].points.iter().map(|p| (p.x, p.y)).collect();
        let pb: Vec<_> = b.strokes[0].points.iter().map(|p| (p.x, p.y)).collect();
        assert_ne!(pa, pb);
    }

    #[test]
    fn empty_paths_are_skipped() {
        let paths = vec![vec![], vec![(1.0, 1.0)]];
        let batch = synthesize(&paths, "#000", 1.0, 7);
        assert_eq!(batch.strokes.len(), 1);
    }

    #[test]
    fn estimate_extent_scales_with_lines() {
        assert_eq!(estimate_extent(1, 28), 28);
        assert_eq!(estimate_extent(3, 28), 84);
        assert_eq!(estimate_extent(0, 28), 28);
    }
}
