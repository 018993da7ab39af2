//! Field-of-view resolution of SuperDARN backscatter.
//!
//! Every detection can be explained by a signal arriving through the front or the rear lobe of
//! the interferometer. For each lobe the phase lag yields an elevation angle, which together
//! with a propagation hop gives a virtual height and an ionospheric region. The scan resolver
//! then picks the lobe whose elevations vary smoothly across neighbouring range gates, and the
//! continuity passes remove picks that disagree with neighbouring beams or soundings.
use std::fmt;

pub mod altitude;
pub mod beam;
pub mod config;
pub(crate) mod continuity;
pub mod elevation;
pub mod geometry;
pub mod groundscatter;
pub mod propagation;
pub mod resolve;
pub mod scan;
pub mod temporal;
pub mod vheight;

pub use propagation::Region;

/// One lobe of the interferometer pattern.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Fov {
    Front,
    Back,
}

impl Fov {
    pub const BOTH: [Fov; 2] = [Fov::Front, Fov::Back];

    pub fn sign(self) -> f64 {
        match self {
            Fov::Front => 1.0,
            Fov::Back => -1.0,
        }
    }

    pub fn flag(self) -> FovFlag {
        match self {
            Fov::Front => FovFlag::Front,
            Fov::Back => FovFlag::Back,
        }
    }

    pub fn other(self) -> Fov {
        match self {
            Fov::Front => Fov::Back,
            Fov::Back => Fov::Front,
        }
    }
}

/// FoV flag as stored in the output records: 1 front, -1 back, 0 unresolved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FovFlag {
    Back,
    #[default]
    Unresolved,
    Front,
}

impl FovFlag {
    pub fn as_i8(self) -> i8 {
        match self {
            FovFlag::Back => -1,
            FovFlag::Unresolved => 0,
            FovFlag::Front => 1,
        }
    }

    pub fn fov(self) -> Option<Fov> {
        match self {
            FovFlag::Back => Some(Fov::Back),
            FovFlag::Unresolved => None,
            FovFlag::Front => Some(Fov::Front),
        }
    }
}

impl From<i8> for FovFlag {
    fn from(value: i8) -> Self {
        match value {
            1 => FovFlag::Front,
            -1 => FovFlag::Back,
            _ => FovFlag::Unresolved,
        }
    }
}

/// Number of propagation hops, stored in half-hop units so that paths can be compared exactly.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hop(u8);

impl Hop {
    pub const HALF: Hop = Hop(1);
    pub const ONE: Hop = Hop(2);

    /// Rounds `hops` to the nearest half hop. Returns `None` for non-positive or non-finite input.
    pub fn from_f64(hops: f64) -> Option<Hop> {
        let halves = (hops * 2.0).round();
        if hops.is_finite() && halves >= 1.0 && halves <= u8::MAX as f64 {
            Some(Hop(halves as u8))
        } else {
            None
        }
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 2.0
    }

    /// The next hop with the same scatter type (ionospheric or ground), one full hop further.
    /// `None` past the largest representable hop.
    pub fn next(self) -> Option<Hop> {
        self.0.checked_add(2).map(Hop)
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}", self.as_f64())
    }
}

/// A propagation path: hop count and the region of the reflection.
pub type PathKey = (Hop, Region);

/// Elevation, virtual height and propagation path derived for one FoV of one point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FovSolution {
    pub elevation: f64,
    pub elevation_error: f64,
    pub phase_ambiguity: i32,
    pub vheight: f64,
    pub vheight_error: f64,
    pub hop: Option<Hop>,
    pub region: Option<Region>,
}

impl FovSolution {
    pub const INVALID: FovSolution = FovSolution {
        elevation: f64::NAN,
        elevation_error: f64::NAN,
        phase_ambiguity: 0,
        vheight: f64::NAN,
        vheight_error: f64::NAN,
        hop: None,
        region: None,
    };

    /// A solution is usable by the resolvers when it has a finite elevation on a realistic path.
    pub fn is_valid(&self) -> bool {
        self.elevation.is_finite() && self.path().is_some()
    }

    pub fn path(&self) -> Option<PathKey> {
        Some((self.hop?, self.region?))
    }
}

impl Default for FovSolution {
    fn default() -> Self {
        FovSolution::INVALID
    }
}

/// Per-point outcome of FoV resolution.
///
/// Both FoV solutions are kept for diagnostics. The accessors return the values of the assigned
/// FoV, or of the front FoV while the point is unresolved; `fov` stays `Unresolved` in that case
/// so the default can be told apart from a real assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct FovAssignment {
    pub range_gate: usize,
    pub groundscatter: i8,
    pub front: FovSolution,
    pub back: FovSolution,
    pub fov: FovFlag,
    pub past_fov: FovFlag,
    /// Best |z-score| that supported the current assignment
    pub score: f64,
    /// Residual standard deviation of the fit behind `score`, in degrees
    pub std: f64,
}

impl FovAssignment {
    pub fn new(range_gate: usize, groundscatter: i8) -> FovAssignment {
        FovAssignment {
            range_gate,
            groundscatter,
            front: FovSolution::INVALID,
            back: FovSolution::INVALID,
            fov: FovFlag::Unresolved,
            past_fov: FovFlag::Unresolved,
            score: f64::INFINITY,
            std: f64::INFINITY,
        }
    }

    pub fn solution(&self, fov: Fov) -> &FovSolution {
        match fov {
            Fov::Front => &self.front,
            Fov::Back => &self.back,
        }
    }

    pub fn solution_mut(&mut self, fov: Fov) -> &mut FovSolution {
        match fov {
            Fov::Front => &mut self.front,
            Fov::Back => &mut self.back,
        }
    }

    /// The solution of the assigned FoV, if any.
    pub fn assigned(&self) -> Option<&FovSolution> {
        self.fov.fov().map(|f| self.solution(f))
    }

    fn chosen(&self) -> &FovSolution {
        self.assigned().unwrap_or(&self.front)
    }

    pub fn elevation(&self) -> f64 {
        self.chosen().elevation
    }

    pub fn elevation_error(&self) -> f64 {
        self.chosen().elevation_error
    }

    pub fn vheight(&self) -> f64 {
        self.chosen().vheight
    }

    pub fn vheight_error(&self) -> f64 {
        self.chosen().vheight_error
    }

    pub fn hop(&self) -> Option<Hop> {
        self.chosen().hop
    }

    pub fn region(&self) -> Option<Region> {
        self.chosen().region
    }

    /// Moves the point to `fov`, remembering the FoV it leaves.
    pub(crate) fn switch_to(&mut self, fov: FovFlag) {
        if self.fov != fov {
            self.past_fov = self.fov;
            self.fov = fov;
        }
    }

    /// Replaces the assignment with `fov` if the new score and std both pass the thresholds
    /// and are strictly better than the stored ones. Returns whether the point was updated.
    pub(crate) fn offer(&mut self, fov: Fov, score: f64, std: f64, max_score: f64, max_std: f64) -> bool {
        if score <= max_score && std <= max_std && score < self.score && std < self.std {
            self.switch_to(fov.flag());
            self.score = score;
            self.std = std;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_arithmetic() {
        assert_eq!(Hop::from_f64(0.5), Some(Hop::HALF));
        assert_eq!(Hop::from_f64(1.0), Some(Hop::ONE));
        assert_eq!(Hop::HALF.next().map(Hop::as_f64), Some(1.5));
        assert_eq!(Hop::from_f64(127.0).and_then(Hop::next), None);
        assert_eq!(Hop::from_f64(0.0), None);
        assert_eq!(Hop::from_f64(f64::NAN), None);
        assert_eq!(Hop::from_f64(2.5).unwrap().to_string(), "2.5");
    }

    #[test]
    fn flags_round_trip_through_i8() {
        for flag in [FovFlag::Front, FovFlag::Back, FovFlag::Unresolved] {
            assert_eq!(FovFlag::from(flag.as_i8()), flag);
        }
    }

    #[test]
    fn unresolved_points_report_front_values() {
        let mut point = FovAssignment::new(4, 0);
        point.front.elevation = 20.0;
        point.back.elevation = 30.0;
        assert_eq!(point.elevation(), 20.0);
        assert_eq!(point.fov, FovFlag::Unresolved);

        point.switch_to(FovFlag::Back);
        assert_eq!(point.elevation(), 30.0);
        assert_eq!(point.past_fov, FovFlag::Unresolved);
    }

    #[test]
    fn offers_must_beat_both_score_and_std() {
        let mut point = FovAssignment::new(4, 0);
        assert!(point.offer(Fov::Front, 1.0, 1.0, 3.0, 3.0));
        // ties go to the incumbent
        assert!(!point.offer(Fov::Back, 1.0, 0.5, 3.0, 3.0));
        // better score but worse std
        assert!(!point.offer(Fov::Back, 0.5, 1.5, 3.0, 3.0));
        assert!(point.offer(Fov::Back, 0.5, 0.5, 3.0, 3.0));
        assert_eq!(point.fov, FovFlag::Back);
        assert_eq!(point.past_fov, FovFlag::Front);
        // thresholds apply even to an unresolved point
        let mut fresh = FovAssignment::new(4, 0);
        assert!(!fresh.offer(Fov::Front, 3.5, 1.0, 3.0, 3.0));
    }
}
