//! Instrument geometry, fingering, tuning and constraint data model (see
//! spec §3).
//!
//! The calculator owns a normalized, SI-unit working copy of whatever
//! `Instrument` it is given; derived values (bore diameter under a hole,
//! headspace volume) are recomputed on demand from that copy and never
//! mutate the caller's original.

use crate::error::{CoreError, CoreResult};

/// A point on the bore profile: axial `position` (m) from the mouthpiece
/// reference and bore `diameter` (m) at that position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorePoint {
    pub position: f64,
    pub diameter: f64,
}

/// Key-mechanism parameters for a keyed (as opposed to finger-closed) hole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyParameters {
    /// Pad diameter, m.
    pub pad_diameter: f64,
    /// Height of the pad above the hole when closed, m.
    pub pad_height: f64,
}

/// A tone hole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hole {
    pub position: f64,
    pub diameter: f64,
    /// Chimney (wall) height, m.
    pub height: f64,
    pub key: Option<KeyParameters>,
}

/// Sound-generation mechanism of the mouthpiece. Fipple and Embouchure are
/// flow nodes (volume-velocity source); the reed variants are pressure
/// nodes. Exactly one variant is active per mouthpiece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouthpieceKind {
    Fipple {
        window_length: f64,
        window_width: f64,
        windway_height: f64,
        fipple_factor: f64,
    },
    Embouchure {
        length: f64,
        width: f64,
        height: f64,
        airstream_length: f64,
        airstream_height: f64,
    },
    SingleReed {
        alpha: f64,
    },
    DoubleReed {
        alpha: f64,
        crow_frequency: f64,
    },
    LipReed {
        alpha: f64,
    },
}

impl MouthpieceKind {
    /// Flow nodes generate sound by modulating volume velocity into the
    /// bore; pressure nodes (reeds) are driven by a pressure difference.
    pub fn is_flow_node(&self) -> bool {
        matches!(self, MouthpieceKind::Fipple { .. } | MouthpieceKind::Embouchure { .. })
    }
}

/// Position of the splitting edge (fipple/embouchure) or reed seat, plus
/// the sound-generation mechanism.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mouthpiece {
    pub position: f64,
    pub kind: MouthpieceKind,
}

/// The open end of the bore. `flange_diameter` of `0` or `<=` the bore
/// diameter at the termination is unflanged; larger is flanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Termination {
    pub flange_diameter: f64,
}

impl Termination {
    pub fn is_flanged(&self, bore_diameter_at_end: f64) -> bool {
        self.flange_diameter > bore_diameter_at_end
    }
}

/// Which air-property/geometry calculator family applies to an instrument.
/// `Auto` chooses by mouthpiece variant and bore profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalculatorKind {
    #[default]
    Auto,
    Naf,
    Whistle,
    Flute,
    Generic,
}

impl CalculatorKind {
    /// Resolves `Auto` against a mouthpiece kind; concrete kinds pass
    /// through unchanged.
    pub fn resolve(self, mouthpiece: &MouthpieceKind) -> PhysicsModel {
        match self {
            CalculatorKind::Naf => PhysicsModel::Simple,
            CalculatorKind::Auto => match mouthpiece {
                MouthpieceKind::Fipple { .. } => PhysicsModel::Simple,
                _ => PhysicsModel::Full,
            },
            CalculatorKind::Whistle | CalculatorKind::Flute | CalculatorKind::Generic => {
                PhysicsModel::Full
            }
        }
    }
}

/// Which [`crate::physics`] air-property model a resolved [`CalculatorKind`]
/// maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsModel {
    Full,
    Simple,
}

/// A complete wind-instrument description in SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub mouthpiece: Mouthpiece,
    /// Sorted by position, ascending; at least two entries.
    pub bore: Vec<BorePoint>,
    pub holes: Vec<Hole>,
    pub termination: Termination,
}

impl Instrument {
    /// Validates the invariants named in spec §3: at least two bore points,
    /// every hole strictly between the mouthpiece and the termination, and
    /// all diameters positive. Does not sort; call [`Self::sorted`] first
    /// if the bore points are not already ordered.
    pub fn validate(&self) -> CoreResult<()> {
        if self.bore.len() < 2 {
            return Err(CoreError::InvalidInput {
                reason: "instrument must have at least two bore points".into(),
            });
        }
        for w in self.bore.windows(2) {
            if w[1].position < w[0].position {
                return Err(CoreError::InvalidInput {
                    reason: "bore points must be sorted by position".into(),
                });
            }
        }
        if self.bore.iter().any(|b| !(b.diameter > 0.0) || !b.position.is_finite()) {
            return Err(CoreError::InvalidInput {
                reason: "bore diameters must be positive and finite".into(),
            });
        }
        let bore_start = self.bore.first().unwrap().position;
        let bore_end = self.bore.last().unwrap().position;
        for hole in &self.holes {
            if !(hole.diameter > 0.0) {
                return Err(CoreError::InvalidInput {
                    reason: "hole diameter must be positive".into(),
                });
            }
            if hole.position <= self.mouthpiece.position.min(bore_start)
                || hole.position >= bore_end
            {
                return Err(CoreError::InvalidInput {
                    reason: "hole must lie strictly between the mouthpiece and the termination"
                        .into(),
                });
            }
        }
        if !self.termination.flange_diameter.is_finite() || self.termination.flange_diameter < 0.0
        {
            return Err(CoreError::InvalidInput {
                reason: "termination flange diameter must be nonnegative and finite".into(),
            });
        }
        Ok(())
    }

    /// Returns a copy with `bore` sorted by position, ready for
    /// [`Self::validate`].
    pub fn sorted(&self) -> Instrument {
        let mut out = self.clone();
        out.bore
            .sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
        out
    }

    /// Linearly interpolated bore diameter at `position`. Positions
    /// outside the bore range clamp to the nearest endpoint diameter.
    pub fn bore_diameter_at(&self, position: f64) -> f64 {
        if position <= self.bore[0].position {
            return self.bore[0].diameter;
        }
        let last = self.bore.len() - 1;
        if position >= self.bore[last].position {
            return self.bore[last].diameter;
        }
        for w in self.bore.windows(2) {
            if position >= w[0].position && position <= w[1].position {
                let span = w[1].position - w[0].position;
                if span <= 0.0 {
                    return w[0].diameter;
                }
                let t = (position - w[0].position) / span;
                return w[0].diameter + t * (w[1].diameter - w[0].diameter);
            }
        }
        self.bore[last].diameter
    }

    /// Bore volume upstream of the mouthpiece splitting edge: sum of
    /// conical-frustum volumes between consecutive bore points that lie at
    /// or before `mouthpiece.position`.
    pub fn headspace_volume(&self) -> f64 {
        let mp = self.mouthpiece.position;
        let mut volume = 0.0;
        for w in self.bore.windows(2) {
            if w[1].position <= mp {
                volume += frustum_volume(w[0], w[1]);
            } else if w[0].position < mp {
                let diameter_at_mp = self.bore_diameter_at(mp);
                volume += frustum_volume(w[0], BorePoint { position: mp, diameter: diameter_at_mp });
            }
        }
        volume
    }
}

fn frustum_volume(a: BorePoint, b: BorePoint) -> f64 {
    let length = (b.position - a.position).abs();
    let r1 = a.diameter / 2.0;
    let r2 = b.diameter / 2.0;
    std::f64::consts::PI * length / 3.0 * (r1 * r1 + r1 * r2 + r2 * r2)
}

/// A named note target with an optional acceptable frequency band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTarget {
    pub target_frequency: f64,
    pub min_frequency: Option<f64>,
    pub max_frequency: Option<f64>,
}

/// One fingering: which holes are open, and (optionally) which note it is
/// meant to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingering {
    pub name: String,
    pub note: Option<NoteTarget>,
    /// Length must equal the owning [`Tuning`]'s `hole_count`.
    pub open: Vec<bool>,
    /// Overrides whether the bore's true termination (rather than the
    /// lowest open hole) is the effective acoustic end. `None` defers to
    /// [`crate::calculator::InstrumentCalculator`]'s default resolution.
    pub open_end: Option<bool>,
    pub weight: f64,
}

impl Default for Fingering {
    fn default() -> Self {
        Self {
            name: String::new(),
            note: None,
            open: Vec::new(),
            open_end: None,
            weight: 1.0,
        }
    }
}

/// An ordered sequence of fingerings sharing a hole count.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    pub name: String,
    pub hole_count: usize,
    pub fingerings: Vec<Fingering>,
}

impl Tuning {
    pub fn validate(&self) -> CoreResult<()> {
        for f in &self.fingerings {
            if f.open.len() != self.hole_count {
                return Err(CoreError::InvalidInput {
                    reason: format!(
                        "fingering '{}' has {} open-hole entries, expected {}",
                        f.name,
                        f.open.len(),
                        self.hole_count
                    ),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Dimensional,
    Dimensionless,
    Boolean,
    Integer,
}

/// Bounds and metadata for one dimension of an [`crate::objective::ObjectiveFunction`].
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub category: String,
    pub display_name: String,
    pub kind: ConstraintKind,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// The full set of constraints for one objective function, in encode/decode
/// dimension order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    pub objective_name: String,
    pub unit_tag: String,
    pub constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn dimension(&self) -> usize {
        self.constraints.len()
    }
}
