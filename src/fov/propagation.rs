//! Ionospheric region classification and realism checks of propagation paths.
use crate::error::FovError;
use crate::fov::Hop;
use indexmap::IndexMap;
use std::fmt;

/// Ionospheric layer, ordered by height.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    D,
    E,
    F,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Region::D => "D",
            Region::E => "E",
            Region::F => "F",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Virtual height interval of a region, in km.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HeightBand {
    pub min: f64,
    pub max: f64,
}

/// Height bands of the ionospheric regions. Each band is closed below and open above, except
/// the highest band which also includes its upper edge.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionBounds {
    bands: IndexMap<Region, HeightBand>,
}

impl Default for RegionBounds {
    fn default() -> Self {
        RegionBounds {
            bands: IndexMap::from([
                (Region::D, HeightBand { min: 75.0, max: 115.0 }),
                (Region::E, HeightBand { min: 115.0, max: 150.0 }),
                (Region::F, HeightBand { min: 150.0, max: 900.0 }),
            ]),
        }
    }
}

impl RegionBounds {
    /// Builds the table from `(region, min, max)` entries, which must be listed from the
    /// lowest region up and must not overlap.
    pub fn new(bands: &[(Region, f64, f64)]) -> Result<RegionBounds, FovError> {
        let mut table = IndexMap::new();
        let mut previous: Option<(Region, f64)> = None;
        for &(region, min, max) in bands {
            if !(min.is_finite() && max.is_finite()) || min >= max {
                Err(FovError::InvalidConfig(format!(
                    "height band of region {region} is [{min}, {max})"
                )))?
            }
            if let Some((prev_region, prev_max)) = previous {
                if region <= prev_region {
                    Err(FovError::InvalidConfig(format!(
                        "region {region} listed after {prev_region}"
                    )))?
                }
                if min < prev_max {
                    Err(FovError::InvalidConfig(format!(
                        "height band of region {region} overlaps {prev_region}"
                    )))?
                }
            }
            table.insert(region, HeightBand { min, max });
            previous = Some((region, max));
        }
        if table.is_empty() {
            Err(FovError::InvalidConfig("no region height bands".to_string()))?
        }
        Ok(RegionBounds { bands: table })
    }

    pub fn band(&self, region: Region) -> Option<HeightBand> {
        self.bands.get(&region).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Region, HeightBand)> + '_ {
        self.bands.iter().map(|(r, b)| (*r, *b))
    }

    /// Region whose band contains `height`, if any. Heights outside every band (and NaN)
    /// are a normal outcome and return `None`.
    pub fn assign_region(&self, height: f64) -> Option<Region> {
        let last = self.bands.len().saturating_sub(1);
        self.bands
            .iter()
            .enumerate()
            .find(|(i, (_, band))| {
                height >= band.min && (height < band.max || (*i == last && height == band.max))
            })
            .map(|(_, (region, _))| *region)
    }

    /// Whether a path of `hop` hops reflecting at `height` km is realistic for an echo at
    /// total slant range `distance` km. D-region echoes only come from half-hop paths within
    /// 500 km; half- and one-hop E-region echoes only from within 900 km.
    pub fn test_propagation(&self, hop: Hop, height: f64, distance: f64) -> bool {
        match self.assign_region(height) {
            Some(Region::D) => hop <= Hop::HALF && distance <= 500.0,
            Some(Region::E) => hop > Hop::ONE || distance <= 900.0,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_partition() {
        let bounds = RegionBounds::default();
        assert_eq!(bounds.assign_region(74.9), None);
        assert_eq!(bounds.assign_region(75.0), Some(Region::D));
        assert_eq!(bounds.assign_region(114.9), Some(Region::D));
        assert_eq!(bounds.assign_region(115.0), Some(Region::E));
        assert_eq!(bounds.assign_region(150.0), Some(Region::F));
        assert_eq!(bounds.assign_region(900.0), Some(Region::F));
        assert_eq!(bounds.assign_region(900.1), None);
        assert_eq!(bounds.assign_region(f64::NAN), None);
    }

    #[test]
    fn same_band_same_region() {
        let bounds = RegionBounds::default();
        for (region, band) in bounds.iter() {
            let mut h = band.min;
            while h < band.max {
                assert_eq!(bounds.assign_region(h), Some(region));
                h += 0.5;
            }
        }
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(RegionBounds::new(&[(Region::D, 80.0, 70.0)]).is_err());
        assert!(RegionBounds::new(&[(Region::D, 75.0, 120.0), (Region::E, 115.0, 150.0)]).is_err());
        assert!(RegionBounds::new(&[(Region::E, 115.0, 150.0), (Region::D, 75.0, 115.0)]).is_err());
        assert!(RegionBounds::new(&[]).is_err());
        let custom = RegionBounds::new(&[(Region::E, 100.0, 140.0), (Region::F, 140.0, 500.0)]).unwrap();
        assert_eq!(custom.assign_region(90.0), None);
        assert_eq!(custom.assign_region(500.0), Some(Region::F));
    }

    #[test]
    fn d_region_is_monotone_in_distance() {
        let bounds = RegionBounds::default();
        let mut realistic = true;
        for step in 0..40 {
            let distance = 100.0 + step as f64 * 25.0;
            let now = bounds.test_propagation(Hop::HALF, 90.0, distance);
            // once unrealistic it stays unrealistic
            assert!(realistic || !now);
            realistic = now;
        }
        assert!(!bounds.test_propagation(Hop::ONE, 90.0, 300.0));
    }

    #[test]
    fn e_region_limits() {
        let bounds = RegionBounds::default();
        assert!(bounds.test_propagation(Hop::HALF, 120.0, 800.0));
        assert!(!bounds.test_propagation(Hop::HALF, 120.0, 1000.0));
        assert!(!bounds.test_propagation(Hop::ONE, 120.0, 1000.0));
        assert!(bounds.test_propagation(Hop::from_f64(1.5).unwrap(), 120.0, 3000.0));
        assert!(bounds.test_propagation(Hop::HALF, 300.0, 3000.0));
    }
}
