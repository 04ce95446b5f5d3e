// template.rs — Feature records and the fingerprint template.
//
// Minutiae and cores share a field layout (id, x, y, angle) but are kept as
// separate record types; `PointKind` is the tagged union over their kinds.
// Descriptors reference their owner by id, which is also the minutia's
// slot in the template, so no back-pointers are needed.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, Result};
use crate::image::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MinutiaKind {
    Ending,
    Bifurcation,
}

impl MinutiaKind {
    /// Wire tag.
    pub fn code(self) -> u8 {
        match self {
            MinutiaKind::Ending => 0,
            MinutiaKind::Bifurcation => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MinutiaKind::Ending),
            1 => Some(MinutiaKind::Bifurcation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CoreKind {
    Loop,
    Delta,
    Whorl,
}

impl CoreKind {
    /// Wire tag.
    pub fn code(self) -> u8 {
        match self {
            CoreKind::Loop => 0,
            CoreKind::Delta => 1,
            CoreKind::Whorl => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CoreKind::Loop),
            1 => Some(CoreKind::Delta),
            2 => Some(CoreKind::Whorl),
            _ => None,
        }
    }
}

/// Kind of any characteristic point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointKind {
    Minutia(MinutiaKind),
    Core(CoreKind),
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointKind::Minutia(k) => write!(f, "minutia {k:?}"),
            PointKind::Core(k) => write!(f, "core {k:?}"),
        }
    }
}

/// Geometric relation of a minutia to two of its nearest neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TupleDescriptor {
    pub owner_id: u32,
    /// Longer over shorter edge length, ≥ 1.
    pub ratio: f32,
    /// Angle at the owner vertex, degrees in [0, 180].
    pub interior_angle: f32,
    pub neighbor_a_kind: MinutiaKind,
    pub neighbor_b_kind: MinutiaKind,
}

/// Ridge ending or bifurcation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minutia {
    pub id: u32,
    pub x: u16,
    pub y: u16,
    /// Ridge tangent in degrees.
    pub angle: f32,
    pub kind: MinutiaKind,
    pub neighborhood: Vec<TupleDescriptor>,
}

impl Minutia {
    /// A minutia without a neighborhood yet.
    pub fn new(id: u32, x: u16, y: u16, angle: f32, kind: MinutiaKind) -> Self {
        Minutia {
            id,
            x,
            y,
            angle,
            kind,
            neighborhood: Vec::new(),
        }
    }

    pub fn point_kind(&self) -> PointKind {
        PointKind::Minutia(self.kind)
    }

    #[inline]
    pub fn position(&self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }
}

/// Singular point of the orientation field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorePoint {
    pub id: u32,
    pub x: u16,
    pub y: u16,
    pub angle: f32,
    pub kind: CoreKind,
}

impl CorePoint {
    pub fn new(id: u32, x: u16, y: u16, angle: f32, kind: CoreKind) -> Self {
        CorePoint { id, x, y, angle, kind }
    }

    pub fn point_kind(&self) -> PointKind {
        PointKind::Core(self.kind)
    }
}

/// Minutiae, cores and the quality scalars of the sample they came from.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintTemplate {
    minutiae: Vec<Minutia>,
    cores: Vec<CorePoint>,
    spectral_q: f32,
    spatial_q: f32,
}

impl FingerprintTemplate {
    pub fn new(minutiae: Vec<Minutia>, cores: Vec<CorePoint>) -> Self {
        FingerprintTemplate {
            minutiae,
            cores,
            spectral_q: 0.0,
            spatial_q: 0.0,
        }
    }

    /// Same template stamped with the sample's quality scalars.
    pub fn with_quality(mut self, spectral_q: f32, spatial_q: f32) -> Self {
        self.spectral_q = spectral_q;
        self.spatial_q = spatial_q;
        self
    }

    #[inline]
    pub fn minutiae(&self) -> &[Minutia] {
        &self.minutiae
    }

    #[inline]
    pub fn cores(&self) -> &[CorePoint] {
        &self.cores
    }

    pub fn spectral_q(&self) -> f32 {
        self.spectral_q
    }

    pub fn spatial_q(&self) -> f32 {
        self.spatial_q
    }

    /// Whether every minutia carries a neighborhood. Templates with fewer
    /// than three minutiae cannot have any and count as described.
    pub fn has_descriptors(&self) -> bool {
        self.minutiae.len() < 3 || self.minutiae.iter().all(|m| !m.neighborhood.is_empty())
    }

    pub fn into_parts(self) -> (Vec<Minutia>, Vec<CorePoint>) {
        (self.minutiae, self.cores)
    }

    pub(crate) fn minutiae_mut(&mut self) -> &mut [Minutia] {
        &mut self.minutiae
    }

    /// Check every invariant that does not depend on the image size:
    /// unique ids, angle and ratio ranges, descriptor owners.
    pub fn validate_structure(&self) -> Result<()> {
        let mut ids = HashSet::with_capacity(self.minutiae.len());
        for m in &self.minutiae {
            if !ids.insert(m.id) {
                return Err(violation(format!("duplicate minutia id {}", m.id)));
            }
            if !(0.0..360.0).contains(&m.angle) {
                return Err(violation(format!("minutia {} angle {} outside [0, 360)", m.id, m.angle)));
            }
            for d in &m.neighborhood {
                if d.owner_id != m.id {
                    return Err(violation(format!(
                        "descriptor owned by {} attached to minutia {}",
                        d.owner_id, m.id
                    )));
                }
                if !(d.ratio.is_finite() && d.ratio >= 1.0) {
                    return Err(violation(format!("minutia {} descriptor ratio {}", m.id, d.ratio)));
                }
                if !(0.0..=180.0).contains(&d.interior_angle) {
                    return Err(violation(format!(
                        "minutia {} interior angle {}",
                        m.id, d.interior_angle
                    )));
                }
            }
        }

        let mut core_ids = HashSet::with_capacity(self.cores.len());
        for c in &self.cores {
            if !core_ids.insert(c.id) {
                return Err(violation(format!("duplicate core id {}", c.id)));
            }
            if !c.angle.is_finite() {
                return Err(violation(format!("core {} angle {}", c.id, c.angle)));
            }
        }
        Ok(())
    }

    /// Full invariant check for a template taken from a `width × height`
    /// image.
    pub fn validate(&self, width: usize, height: usize) -> Result<()> {
        self.validate_structure()?;
        let inside = |x: u16, y: u16| (x as usize) < width && (y as usize) < height;
        for m in &self.minutiae {
            if !inside(m.x, m.y) {
                return Err(violation(format!("minutia {} at ({}, {}) outside image", m.id, m.x, m.y)));
            }
        }
        for c in &self.cores {
            if !inside(c.x, c.y) {
                return Err(violation(format!("core {} at ({}, {}) outside image", c.id, c.x, c.y)));
            }
        }
        Ok(())
    }

    /// Every point must also lie inside `roi`.
    pub fn validate_in_roi(&self, roi: &Image<bool>) -> Result<()> {
        self.validate(roi.width(), roi.height())?;
        let points = self
            .minutiae
            .iter()
            .map(|m| (m.point_kind(), m.id, m.x, m.y))
            .chain(self.cores.iter().map(|c| (c.point_kind(), c.id, c.x, c.y)));
        for (kind, id, x, y) in points {
            if !roi.get(x as usize, y as usize) {
                return Err(violation(format!("{kind} {id} at ({x}, {y}) outside ROI")));
            }
        }
        Ok(())
    }
}

fn violation(msg: String) -> FingerprintError {
    FingerprintError::InternalInvariantViolated(msg)
}
