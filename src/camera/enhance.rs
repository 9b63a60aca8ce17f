//! Image quality enhancement via lookup tables.
//!
//! Gamma and contrast are read from the device and folded into a single
//! 256-entry table applied to every channel byte.

/// Precomputed gamma/contrast correction.
#[derive(Clone)]
pub struct Enhancement {
    gamma: Option<f64>,
    contrast: Option<i64>,
    lut: [u8; 256],
}

impl Enhancement {
    /// Builds the table. Missing or non-positive gamma and missing contrast
    /// leave that stage as identity.
    pub fn new(gamma: Option<f64>, contrast: Option<i64>) -> Self {
        let gamma = gamma.filter(|g| g.is_finite() && *g > 0.0);
        let gamma_lut = gamma.map(gamma_lut);
        let contrast_lut = contrast.map(contrast_lut);

        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let mut v = i as u8;
            if let Some(t) = &gamma_lut {
                v = t[v as usize];
            }
            if let Some(t) = &contrast_lut {
                v = t[v as usize];
            }
            *slot = v;
        }

        Self { gamma, contrast, lut }
    }

    pub fn gamma(&self) -> Option<f64> {
        self.gamma
    }

    pub fn contrast(&self) -> Option<i64> {
        self.contrast
    }

    pub fn is_identity(&self) -> bool {
        self.lut.iter().enumerate().all(|(i, v)| *v as usize == i)
    }

    /// Maps every byte of the buffer through the table.
    pub fn apply(&self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b = self.lut[*b as usize];
        }
    }
}

impl std::fmt::Debug for Enhancement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enhancement")
            .field("gamma", &self.gamma)
            .field("contrast", &self.contrast)
            .finish()
    }
}

/// `out = 255 · (in / 255)^(1 / gamma)`.
fn gamma_lut(gamma: f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        let normalized = i as f64 / 255.0;
        *slot = (normalized.powf(1.0 / gamma) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Linear stretch around mid-grey; `contrast` is a percentage in [-50, 100].
fn contrast_lut(contrast: i64) -> [u8; 256] {
    let factor = (100.0 + contrast.clamp(-50, 100) as f64) / 100.0;
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = ((i as f64 - 128.0) * factor + 128.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
