pub(crate) const LIGHTSPEED_f64: f64 = 299_792_458.0;
pub(crate) const KHZ_TO_HZ_f64: f64 = 1000.0;

/// Slant range covered per microsecond of round-trip delay, in km
pub(crate) const KM_PER_US: f64 = 0.15;

/// Mean Earth radius used when no latitude-dependent radius is available, in km
pub const RADIUS_EARTH: f64 = 6371.2;

/// WGS84 semi-major and semi-minor axes, in km
pub(crate) const WGS84_A: f64 = 6378.137;
pub(crate) const WGS84_B: f64 = 6356.752314245;
