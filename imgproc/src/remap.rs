use crate::histogram::{Cdf, GRAY_LEVELS};

/// How a cumulative count is turned into an output intensity.
///
/// With `L = 256` levels and `A` total pixels:
///
/// * `Scaled`: `round(L * ((L / A) * (cdf[v] / L)))` in `f64`. Equal to
///   `round((L / A) * cdf[v])`.
/// * `Legacy`: the same expression with `cdf[v] / L` as an integer division,
///   scaled in `f32` and truncated. Reproduces byte-identical legacy output.
///
/// Both saturate at 255; `cdf[v] == A` would otherwise map to 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemapFormula {
    #[default]
    Scaled,
    Legacy,
}

/// Output intensity of `level` under `cdf`.
pub fn remap(level: u8, cdf: &Cdf, formula: RemapFormula) -> u8 {
    let area = cdf.total();
    if area == 0 {
        return level;
    }
    let c = cdf.get(level);
    match formula {
        RemapFormula::Scaled => {
            let l = GRAY_LEVELS as f64;
            let value = l * ((l / area as f64) * (c as f64 / l));
            value.round().clamp(0.0, 255.0) as u8
        }
        RemapFormula::Legacy => {
            let l = GRAY_LEVELS as f32;
            let buckets = c / GRAY_LEVELS as u64;
            // `as u8` truncates toward zero and saturates.
            (l * ((l / area as f32) * buckets as f32)) as u8
        }
    }
}

/// Lookup table built once from the global CDF and shared by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapTable {
    lut: [u8; GRAY_LEVELS],
}

impl RemapTable {
    pub fn from_cdf(cdf: &Cdf, formula: RemapFormula) -> Self {
        let mut lut = [0u8; GRAY_LEVELS];
        for (level, slot) in lut.iter_mut().enumerate() {
            *slot = remap(level as u8, cdf, formula);
        }
        Self { lut }
    }

    #[inline]
    pub fn apply(&self, level: u8) -> u8 {
        self.lut[level as usize]
    }

    pub fn as_slice(&self) -> &[u8; GRAY_LEVELS] {
        &self.lut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::Histogram;

    fn cdf_of(samples: &[u8]) -> Cdf {
        Cdf::from_histogram(&Histogram::aggregate(samples).unwrap())
    }

    #[test]
    fn test_full_cdf_clamps_to_255() {
        let cdf = cdf_of(&[0, 1, 2, 3]);
        assert_eq!(remap(3, &cdf, RemapFormula::Scaled), 255);
    }

    #[test]
    fn test_uniform_levels_spread_evenly() {
        let cdf = cdf_of(&[0, 0, 1, 1, 2, 2, 3, 3]);
        let table = RemapTable::from_cdf(&cdf, RemapFormula::Scaled);
        assert_eq!(&table.as_slice()[..4], &[64, 128, 192, 255]);
    }

    #[test]
    fn test_scaled_rounds_half_away_from_zero() {
        // A = 512: (256 / 512) * 3 = 1.5 rounds to 2.
        let mut samples = vec![0u8; 3];
        samples.extend(std::iter::repeat(9u8).take(509));
        let cdf = cdf_of(&samples);
        assert_eq!(remap(0, &cdf, RemapFormula::Scaled), 2);
    }

    #[test]
    fn test_legacy_divides_cdf_before_scaling() {
        // A = 512, cdf[0] = 300: 300 / 256 = 1 bucket, 256 * 0.5 * 1 = 128.
        let mut samples = vec![0u8; 300];
        samples.extend(std::iter::repeat(1u8).take(212));
        let cdf = cdf_of(&samples);
        assert_eq!(remap(0, &cdf, RemapFormula::Scaled), 150);
        assert_eq!(remap(0, &cdf, RemapFormula::Legacy), 128);
        assert_eq!(remap(1, &cdf, RemapFormula::Legacy), 255);
    }

    #[test]
    fn test_legacy_truncates() {
        // A = 768, cdf[0] = 300: 256 * (256 / 768) * 1 = 85.33.
        let mut samples = vec![0u8; 300];
        samples.extend(std::iter::repeat(5u8).take(468));
        let cdf = cdf_of(&samples);
        assert_eq!(remap(0, &cdf, RemapFormula::Legacy), 85);
        assert_eq!(remap(0, &cdf, RemapFormula::Scaled), 100);
    }

    #[test]
    fn test_legacy_zeroes_counts_below_one_bucket() {
        let cdf = cdf_of(&[0, 0, 1, 1, 2, 2, 3, 3]);
        let table = RemapTable::from_cdf(&cdf, RemapFormula::Legacy);
        assert_eq!(&table.as_slice()[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_cdf_is_identity() {
        let cdf = Cdf::from_histogram(&Histogram::new());
        assert_eq!(remap(42, &cdf, RemapFormula::Scaled), 42);
    }
}
