//! Static segment and perforation records.

use mw_core::units::{Area, Length, Volume, m, m2, m3};
use mw_core::{CellIndex, SegmentNumber};
use serde::{Deserialize, Serialize};

/// Which terms enter the segment pressure-drop equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PressureDropModel {
    /// Hydrostatic head only.
    #[default]
    Hydrostatic,
    /// Hydrostatic head plus friction.
    HydrostaticFriction,
    /// Hydrostatic head, friction and acceleration (velocity heads).
    HydrostaticFrictionAcceleration,
}

impl PressureDropModel {
    pub fn includes_friction(self) -> bool {
        !matches!(self, PressureDropModel::Hydrostatic)
    }

    pub fn includes_acceleration(self) -> bool {
        matches!(self, PressureDropModel::HydrostaticFrictionAcceleration)
    }
}

/// Geometry of one wellbore section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentGeometry {
    /// True vertical depth of the segment node.
    pub depth: Length,
    /// Length along the wellbore from the wellhead to this segment node.
    pub total_length: Length,
    /// Fluid volume of the segment.
    pub volume: Volume,
    pub internal_diameter: Length,
    /// Absolute wall roughness.
    pub roughness: Length,
    pub cross_area: Area,
    pub pressure_drop: PressureDropModel,
}

impl Default for SegmentGeometry {
    fn default() -> Self {
        Self {
            depth: m(0.0),
            total_length: m(0.0),
            volume: m3(0.0),
            internal_diameter: m(0.1),
            roughness: m(1.0e-5),
            cross_area: m2(std::f64::consts::PI * 0.1 * 0.1 / 4.0),
            pressure_drop: PressureDropModel::Hydrostatic,
        }
    }
}

impl SegmentGeometry {
    /// Circular tubing: area from the diameter, volume from the given section length.
    pub fn tubing(
        depth: Length,
        total_length: Length,
        section_length: Length,
        internal_diameter: Length,
        roughness: Length,
    ) -> Self {
        let d = internal_diameter.value;
        let area = std::f64::consts::PI * d * d / 4.0;
        Self {
            depth,
            total_length,
            volume: m3(area * section_length.value),
            internal_diameter,
            roughness,
            cross_area: m2(area),
            pressure_drop: PressureDropModel::Hydrostatic,
        }
    }

    pub fn with_pressure_drop(mut self, model: PressureDropModel) -> Self {
        self.pressure_drop = model;
        self
    }
}

/// A validated segment stored at its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub number: SegmentNumber,
    /// `None` only for the top segment.
    pub outlet: Option<SegmentNumber>,
    pub geometry: SegmentGeometry,
}

impl Segment {
    pub fn depth(&self) -> f64 {
        self.geometry.depth.value
    }

    pub fn total_length(&self) -> f64 {
        self.geometry.total_length.value
    }

    pub fn volume(&self) -> f64 {
        self.geometry.volume.value
    }

    pub fn cross_area(&self) -> f64 {
        self.geometry.cross_area.value
    }

    pub fn internal_diameter(&self) -> f64 {
        self.geometry.internal_diameter.value
    }

    pub fn roughness(&self) -> f64 {
        self.geometry.roughness.value
    }

    pub fn pressure_drop(&self) -> PressureDropModel {
        self.geometry.pressure_drop
    }
}

/// Opening between one segment and one reservoir cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Perforation {
    pub cell: CellIndex,
    pub segment: SegmentNumber,
    /// Connection transmissibility factor.
    pub well_index: f64,
    /// Saturation region used for the connection relative permeability.
    /// `None` uses the cell's own region.
    pub sat_region: Option<usize>,
    /// Depth of the perforation centre.
    pub depth: Length,
}
