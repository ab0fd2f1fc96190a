//! Well primary variables and their differentiable evaluation.
//!
//! Each segment carries a total rate `GTotal`, the water and gas fractions
//! of that rate (oil is the remainder) and the segment pressure. Only the
//! fractions of active phases are unknowns, so the variable layout depends on
//! the phase usage:
//!
//! | phases        | unknowns                          |
//! |---------------|-----------------------------------|
//! | oil           | GTotal, SPres                     |
//! | oil-water     | GTotal, WFrac, SPres              |
//! | oil-gas       | GTotal, GFrac, SPres              |
//! | water-oil-gas | GTotal, WFrac, GFrac, SPres       |

use mw_core::{EvalWell, MAX_CELL_EQ, SegmentLocation};
use mw_fluids::{MAX_PHASES, Phase, PhaseUsage};

use crate::control::ComponentScaling;
use crate::error::{WellError, WellResult};

/// Index layout of well unknowns and equations per segment.
///
/// Component equations use compact phase positions; the pressure (or control)
/// equation shares the index of `SPres`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellLayout {
    usage: PhaseUsage,
}

impl WellLayout {
    pub const G_TOTAL: usize = 0;

    pub fn new(usage: PhaseUsage) -> Self {
        Self { usage }
    }

    pub fn usage(&self) -> &PhaseUsage {
        &self.usage
    }

    pub fn num_components(&self) -> usize {
        self.usage.num_phases()
    }

    pub fn num_well_eq(&self) -> usize {
        self.num_components() + 1
    }

    /// Equations (and primary variables) per reservoir cell.
    pub fn num_cell_eq(&self) -> usize {
        self.num_components()
    }

    pub fn wfrac(&self) -> Option<usize> {
        self.usage.water.then_some(1)
    }

    pub fn gfrac(&self) -> Option<usize> {
        self.usage.gas.then_some(1 + usize::from(self.usage.water))
    }

    pub fn spres(&self) -> usize {
        self.num_components()
    }

    /// Derivative slot of well primary variable `pv` in an [`EvalWell`].
    pub fn well_slot(pv: usize) -> usize {
        MAX_CELL_EQ + pv
    }
}

/// Primary variable values of one segment. Fractions of inactive phases stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentVariables {
    pub g_total: f64,
    pub wfrac: f64,
    pub gfrac: f64,
    pub pressure: f64,
}

impl SegmentVariables {
    /// Value of primary variable `pv` (must be below `num_well_eq`).
    pub fn get(&self, layout: &WellLayout, pv: usize) -> f64 {
        if pv == WellLayout::G_TOTAL {
            self.g_total
        } else if Some(pv) == layout.wfrac() {
            self.wfrac
        } else if Some(pv) == layout.gfrac() {
            self.gfrac
        } else {
            self.pressure
        }
    }

    /// Phase fractions of the total rate by compact position.
    pub fn fractions(&self, usage: &PhaseUsage) -> [f64; MAX_PHASES] {
        let mut fractions = [0.0; MAX_PHASES];
        let oil = usage.oil_position();
        fractions[oil] = 1.0;
        if let Some(pos) = usage.position(Phase::Water) {
            fractions[pos] = self.wfrac;
            fractions[oil] -= self.wfrac;
        }
        if let Some(pos) = usage.position(Phase::Gas) {
            fractions[pos] = self.gfrac;
            fractions[oil] -= self.gfrac;
        }
        fractions
    }
}

/// Bring the fractions of one segment back onto the simplex.
///
/// A negative water or gas fraction is set to zero and the others are
/// rescaled to keep the sum at one; the oil fraction is handled last.
pub fn process_fractions(usage: &PhaseUsage, vars: &mut SegmentVariables) {
    let mut f = vars.fractions(usage);
    let oil = usage.oil_position();
    let water = usage.position(Phase::Water);
    let gas = usage.position(Phase::Gas);

    for (negative, others) in [(water, [gas, Some(oil)]), (gas, [water, Some(oil)])] {
        let Some(neg) = negative else { continue };
        if f[neg] < 0.0 {
            let denom = 1.0 - f[neg];
            for pos in others.into_iter().flatten() {
                f[pos] /= denom;
            }
            f[neg] = 0.0;
        }
    }

    if f[oil] < 0.0 {
        let denom = 1.0 - f[oil];
        for pos in [water, gas].into_iter().flatten() {
            f[pos] /= denom;
        }
        f[oil] = 0.0;
    }

    if let Some(pos) = water {
        vars.wfrac = f[pos];
    }
    if let Some(pos) = gas {
        vars.gfrac = f[pos];
    }
}

/// Primary variables seeded as independent variables in the well slots of
/// an [`EvalWell`].
///
/// Every segment uses the same slots: a derivative always refers to the
/// variables of the segment the evaluation came from. The assembler routes
/// it to the matching (row, column) block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEval {
    pub g_total: EvalWell,
    pub wfrac: EvalWell,
    pub gfrac: EvalWell,
    pub pressure: EvalWell,
}

impl SegmentEval {
    pub fn seed(layout: &WellLayout, vars: &SegmentVariables) -> Self {
        let var = |pv: usize, value: f64| EvalWell::variable(value, WellLayout::well_slot(pv));
        Self {
            g_total: var(WellLayout::G_TOTAL, vars.g_total),
            wfrac: layout
                .wfrac()
                .map_or(EvalWell::constant(0.0), |pv| var(pv, vars.wfrac)),
            gfrac: layout
                .gfrac()
                .map_or(EvalWell::constant(0.0), |pv| var(pv, vars.gfrac)),
            pressure: var(layout.spres(), vars.pressure),
        }
    }

    /// Fraction of `GTotal` carried by component `comp`.
    pub fn volume_fraction(&self, usage: &PhaseUsage, comp: usize) -> EvalWell {
        match usage.phase_at(comp) {
            Phase::Water => self.wfrac,
            Phase::Gas => self.gfrac,
            Phase::Oil => 1.0 - self.wfrac - self.gfrac,
        }
    }

    pub fn volume_fraction_scaled(&self, scaling: &ComponentScaling, comp: usize) -> EvalWell {
        let fraction = self.volume_fraction(scaling.usage(), comp);
        let scale = scaling.factor(comp);
        if scale > 0.0 { fraction / scale } else { fraction }
    }

    /// Surface-condition composition of the segment fluid.
    pub fn surface_volume_fractions(
        &self,
        scaling: &ComponentScaling,
    ) -> WellResult<[EvalWell; MAX_PHASES]> {
        let nc = scaling.num_components();
        let mut fractions = [EvalWell::constant(0.0); MAX_PHASES];
        let mut sum = EvalWell::constant(0.0);
        for (comp, fraction) in fractions.iter_mut().enumerate().take(nc) {
            *fraction = self.volume_fraction_scaled(scaling, comp);
            sum += *fraction;
        }
        if sum.value() == 0.0 {
            return Err(WellError::NumericalProblem {
                what: "scaled volume fractions sum to zero".to_string(),
            });
        }
        for fraction in fractions.iter_mut().take(nc) {
            *fraction /= sum;
        }
        Ok(fractions)
    }

    /// Surface rate of component `comp` through the segment.
    pub fn segment_rate(&self, scaling: &ComponentScaling, comp: usize) -> EvalWell {
        self.g_total * self.volume_fraction_scaled(scaling, comp)
    }
}

/// Primary variable values of all segments of one well.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryVariables {
    layout: WellLayout,
    segments: Vec<SegmentVariables>,
}

impl PrimaryVariables {
    pub fn new(layout: WellLayout, num_segments: usize) -> Self {
        Self {
            layout,
            segments: vec![SegmentVariables::default(); num_segments],
        }
    }

    pub fn layout(&self) -> &WellLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[SegmentVariables] {
        &self.segments
    }

    pub fn segment(&self, seg: SegmentLocation) -> &SegmentVariables {
        &self.segments[seg]
    }

    pub fn segment_mut(&mut self, seg: SegmentLocation) -> &mut SegmentVariables {
        &mut self.segments[seg]
    }

    pub fn process_fractions(&mut self, seg: SegmentLocation) {
        let usage = *self.layout.usage();
        process_fractions(&usage, &mut self.segments[seg]);
    }

    /// Seed every segment for differentiation.
    pub fn evaluate(&self) -> Vec<SegmentEval> {
        self.segments
            .iter()
            .map(|vars| SegmentEval::seed(&self.layout, vars))
            .collect()
    }
}
