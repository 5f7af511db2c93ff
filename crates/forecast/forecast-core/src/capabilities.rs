//! Build-time family availability.

use forecast_spi::{Capabilities, ModelFamily};

/// The families compiled into this build, computed from cargo features.
///
/// The stationarity test ships with the autoregressive family.
pub fn detect_capabilities() -> Capabilities {
    let mut families = Vec::new();
    if cfg!(feature = "autoregressive") {
        families.push(ModelFamily::Autoregressive);
    }
    if cfg!(feature = "seasonal") {
        families.push(ModelFamily::SeasonalAdditive);
    }
    if cfg!(feature = "recurrent") {
        families.push(ModelFamily::Recurrent);
    }
    Capabilities::only(&families)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_matches_features() {
        let caps = detect_capabilities();
        assert_eq!(caps.supports(ModelFamily::Autoregressive), cfg!(feature = "autoregressive"));
        assert_eq!(caps.supports(ModelFamily::SeasonalAdditive), cfg!(feature = "seasonal"));
        assert_eq!(caps.supports(ModelFamily::Recurrent), cfg!(feature = "recurrent"));
        assert_eq!(caps.has_stationarity_test(), cfg!(feature = "autoregressive"));
    }
}
