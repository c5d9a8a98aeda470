//! Numeric precision of the coefficient arithmetic.
//!
//! All arithmetic runs in `Complex64`. `Single` rounds every stored
//! coefficient and every accelerated estimate through `Complex32`, and picks
//! the single-precision extremes as the epsilon algorithm's sentinels.

use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Double,
    Single,
}

impl Precision {
    /// Smallest positive normal magnitude.
    pub fn tiny(self) -> f64 {
        match self {
            Precision::Double => f64::MIN_POSITIVE,
            Precision::Single => f32::MIN_POSITIVE as f64,
        }
    }

    /// Largest finite magnitude.
    pub fn huge(self) -> f64 {
        match self {
            Precision::Double => f64::MAX,
            Precision::Single => f32::MAX as f64,
        }
    }

    #[inline]
    pub fn round(self, z: Complex64) -> Complex64 {
        match self {
            Precision::Double => z,
            Precision::Single => {
                let narrow = Complex32::new(z.re as f32, z.im as f32);
                Complex64::new(narrow.re as f64, narrow.im as f64)
            }
        }
    }

    pub fn round_slice(self, values: &mut [Complex64]) {
        if self == Precision::Single {
            for v in values.iter_mut() {
                *v = self.round(*v);
            }
        }
    }
}
