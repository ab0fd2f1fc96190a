//! Forward-mode dual numbers.
//!
//! An [`Eval`] carries a value together with its partial derivatives with
//! respect to a fixed set of primary variables. Arithmetic propagates the
//! derivatives by the chain rule, so assembling a residual with `Eval`s yields
//! the matching Jacobian row for free.
//!
//! Two derivative spaces are used by the well model:
//! - [`EvalCell`]: derivatives with respect to the primary variables of one
//!   reservoir cell (slots `0..MAX_CELL_EQ`),
//! - [`EvalWell`]: the cell slots followed by the primary variables of one
//!   well segment system (slots `MAX_CELL_EQ..NUM_DERIVATIVES`).
//!
//! Cell quantities enter well expressions through [`Eval::extend`].

use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Maximum number of reservoir equations (components) per cell.
pub const MAX_CELL_EQ: usize = 3;

/// Maximum number of well equations per segment (components + pressure).
pub const MAX_WELL_EQ: usize = 4;

/// Derivative slots of a well evaluation.
pub const NUM_DERIVATIVES: usize = MAX_CELL_EQ + MAX_WELL_EQ;

/// Evaluation differentiated with respect to cell primary variables.
pub type EvalCell = Eval<MAX_CELL_EQ>;

/// Evaluation differentiated with respect to cell and well primary variables.
pub type EvalWell = Eval<NUM_DERIVATIVES>;

/// A scalar value with `N` partial derivatives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Eval<const N: usize> {
    value: f64,
    derivatives: [f64; N],
}

impl<const N: usize> Default for Eval<N> {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl<const N: usize> From<f64> for Eval<N> {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl<const N: usize> Eval<N> {
    /// A value with all derivatives zero.
    pub const fn constant(value: f64) -> Self {
        Self {
            value,
            derivatives: [0.0; N],
        }
    }

    /// An independent variable: unit derivative in slot `index`.
    ///
    /// Panics if `index >= N`.
    pub fn variable(value: f64, index: usize) -> Self {
        let mut derivatives = [0.0; N];
        derivatives[index] = 1.0;
        Self { value, derivatives }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn derivative(&self, index: usize) -> f64 {
        self.derivatives[index]
    }

    pub fn derivatives(&self) -> &[f64; N] {
        &self.derivatives
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn set_derivative(&mut self, index: usize, derivative: f64) {
        self.derivatives[index] = derivative;
    }

    /// Copy into a derivative space of size `M`.
    ///
    /// Slots `0..min(N, M)` are preserved and the rest are zero. This is how a
    /// cell evaluation becomes a well evaluation.
    pub fn extend<const M: usize>(&self) -> Eval<M> {
        let mut out = Eval::<M>::constant(self.value);
        let n = N.min(M);
        out.derivatives[..n].copy_from_slice(&self.derivatives[..n]);
        out
    }

    /// Apply `f` with known derivative `df` at the current value.
    fn chain(self, value: f64, df: f64) -> Self {
        let mut derivatives = self.derivatives;
        for d in &mut derivatives {
            *d *= df;
        }
        Self { value, derivatives }
    }

    pub fn abs(self) -> Self {
        if self.value < 0.0 { -self } else { self }
    }

    pub fn powi(self, n: i32) -> Self {
        let df = if n == 0 {
            0.0
        } else {
            f64::from(n) * self.value.powi(n - 1)
        };
        self.chain(self.value.powi(n), df)
    }

    pub fn powf(self, n: f64) -> Self {
        self.chain(self.value.powf(n), n * self.value.powf(n - 1.0))
    }

    pub fn sqrt(self) -> Self {
        let v = self.value.sqrt();
        self.chain(v, 0.5 / v)
    }

    pub fn ln(self) -> Self {
        self.chain(self.value.ln(), 1.0 / self.value)
    }

    pub fn log10(self) -> Self {
        self.chain(
            self.value.log10(),
            1.0 / (self.value * core::f64::consts::LN_10),
        )
    }

    pub fn exp(self) -> Self {
        let v = self.value.exp();
        self.chain(v, v)
    }

    /// The smaller of two evaluations by value (derivatives follow the winner).
    pub fn min(self, other: Self) -> Self {
        if other.value < self.value { other } else { self }
    }

    /// The larger of two evaluations by value (derivatives follow the winner).
    pub fn max(self, other: Self) -> Self {
        if other.value > self.value { other } else { self }
    }

    pub fn is_nan(&self) -> bool {
        self.value.is_nan() || self.derivatives.iter().any(|d| d.is_nan())
    }
}

impl<const N: usize> Neg for Eval<N> {
    type Output = Self;

    fn neg(self) -> Self {
        self.chain(-self.value, -1.0)
    }
}

impl<const N: usize> AddAssign for Eval<N> {
    fn add_assign(&mut self, rhs: Self) {
        self.value += rhs.value;
        for (d, r) in self.derivatives.iter_mut().zip(rhs.derivatives) {
            *d += r;
        }
    }
}

impl<const N: usize> SubAssign for Eval<N> {
    fn sub_assign(&mut self, rhs: Self) {
        self.value -= rhs.value;
        for (d, r) in self.derivatives.iter_mut().zip(rhs.derivatives) {
            *d -= r;
        }
    }
}

impl<const N: usize> MulAssign for Eval<N> {
    fn mul_assign(&mut self, rhs: Self) {
        for (d, r) in self.derivatives.iter_mut().zip(rhs.derivatives) {
            *d = *d * rhs.value + self.value * r;
        }
        self.value *= rhs.value;
    }
}

impl<const N: usize> DivAssign for Eval<N> {
    fn div_assign(&mut self, rhs: Self) {
        let inv = 1.0 / rhs.value;
        let quotient = self.value * inv;
        for (d, r) in self.derivatives.iter_mut().zip(rhs.derivatives) {
            *d = (*d - quotient * r) * inv;
        }
        self.value = quotient;
    }
}

impl<const N: usize> AddAssign<f64> for Eval<N> {
    fn add_assign(&mut self, rhs: f64) {
        self.value += rhs;
    }
}

impl<const N: usize> SubAssign<f64> for Eval<N> {
    fn sub_assign(&mut self, rhs: f64) {
        self.value -= rhs;
    }
}

impl<const N: usize> MulAssign<f64> for Eval<N> {
    fn mul_assign(&mut self, rhs: f64) {
        self.value *= rhs;
        for d in &mut self.derivatives {
            *d *= rhs;
        }
    }
}

impl<const N: usize> DivAssign<f64> for Eval<N> {
    fn div_assign(&mut self, rhs: f64) {
        *self *= 1.0 / rhs;
    }
}

macro_rules! binary_ops {
    ($($trait:ident :: $method:ident => $assign:ident),* $(,)?) => {$(
        impl<const N: usize> $trait for Eval<N> {
            type Output = Self;

            fn $method(mut self, rhs: Self) -> Self {
                self.$assign(rhs);
                self
            }
        }

        impl<const N: usize> $trait<f64> for Eval<N> {
            type Output = Self;

            fn $method(mut self, rhs: f64) -> Self {
                self.$assign(rhs);
                self
            }
        }
    )*};
}

binary_ops! {
    Add::add => add_assign,
    Sub::sub => sub_assign,
    Mul::mul => mul_assign,
    Div::div => div_assign,
}

impl<const N: usize> Add<Eval<N>> for f64 {
    type Output = Eval<N>;

    fn add(self, rhs: Eval<N>) -> Eval<N> {
        rhs + self
    }
}

impl<const N: usize> Sub<Eval<N>> for f64 {
    type Output = Eval<N>;

    fn sub(self, rhs: Eval<N>) -> Eval<N> {
        -rhs + self
    }
}

impl<const N: usize> Mul<Eval<N>> for f64 {
    type Output = Eval<N>;

    fn mul(self, rhs: Eval<N>) -> Eval<N> {
        rhs * self
    }
}

impl<const N: usize> Div<Eval<N>> for f64 {
    type Output = Eval<N>;

    fn div(self, rhs: Eval<N>) -> Eval<N> {
        Eval::constant(self) / rhs
    }
}
