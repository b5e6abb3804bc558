//! The seven analysis bands
//!
//! Shared by the phase and tonal analysers. Centres are the published
//! values; edges follow the conventional octave-group boundaries.

/// One analysis band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub name: &'static str,
    pub low_hz: f32,
    pub center_hz: f32,
    pub high_hz: f32,
}

/// Number of analysis bands
pub const BAND_COUNT: usize = 7;

/// Sub-bass through brilliance
pub const BANDS: [Band; BAND_COUNT] = [
    Band {
        name: "sub-bass",
        low_hz: 20.0,
        center_hz: 40.0,
        high_hz: 60.0,
    },
    Band {
        name: "bass",
        low_hz: 60.0,
        center_hz: 155.0,
        high_hz: 250.0,
    },
    Band {
        name: "low-mid",
        low_hz: 250.0,
        center_hz: 375.0,
        high_hz: 500.0,
    },
    Band {
        name: "mid",
        low_hz: 500.0,
        center_hz: 1000.0,
        high_hz: 2000.0,
    },
    Band {
        name: "high-mid",
        low_hz: 2000.0,
        center_hz: 2800.0,
        high_hz: 4000.0,
    },
    Band {
        name: "presence",
        low_hz: 4000.0,
        center_hz: 5000.0,
        high_hz: 6000.0,
    },
    Band {
        name: "brilliance",
        low_hz: 6000.0,
        center_hz: 10000.0,
        high_hz: 20000.0,
    },
];

/// Band containing `freq_hz`, if any
pub fn band_index_for(freq_hz: f32) -> Option<usize> {
    BANDS
        .iter()
        .position(|b| freq_hz >= b.low_hz && freq_hz < b.high_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_contiguous() {
        for pair in BANDS.windows(2) {
            assert_eq!(pair[0].high_hz, pair[1].low_hz);
        }
    }

    #[test]
    fn test_centers_inside_edges() {
        for band in BANDS {
            assert!(band.low_hz < band.center_hz && band.center_hz < band.high_hz);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(band_index_for(1000.0), Some(3));
        assert_eq!(band_index_for(40.0), Some(0));
        assert_eq!(band_index_for(19.0), None);
        assert_eq!(band_index_for(21000.0), None);
    }
}
