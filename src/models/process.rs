use std::marker::PhantomData;

use nalgebra::{Matrix4, RealField, SMatrix, SVector};

/// State transition `x(k+1) = f(x(k)) + w(k)` together with its Jacobian.
pub trait ProcessModel<T: RealField, const S: usize> {
    fn prediction(&self, x: &SVector<T, S>) -> SVector<T, S>;

    /// Jacobian of `f`, evaluated at `x`
    fn jacobian(&self, x: &SVector<T, S>) -> SMatrix<T, S, S>;

    /// Predicted state and Jacobian in one call. Override when both share work.
    fn linearize(&self, x: &SVector<T, S>) -> (SVector<T, S>, SMatrix<T, S, S>) {
        (self.prediction(x), self.jacobian(x))
    }
}

/// `x(k+1) = F x(k)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearProcess<T: RealField, const S: usize> {
    pub f: SMatrix<T, S, S>,
}

impl<T: RealField + Copy, const S: usize> LinearProcess<T, S> {
    pub fn new(f: SMatrix<T, S, S>) -> Self {
        LinearProcess { f }
    }

    /// Random walk: the state is expected to stay where it is.
    pub fn identity() -> Self {
        LinearProcess {
            f: SMatrix::identity(),
        }
    }
}

impl LinearProcess<f64, 4> {
    /// Constant velocity in the plane, state = [px, py, vx, vy]
    pub fn constant_velocity(dt: f64) -> Self {
        #[rustfmt::skip]
        let f = Matrix4::new(
            1., 0., dt, 0.,
            0., 1., 0., dt,
            0., 0., 1., 0.,
            0., 0., 0., 1.,
        );
        LinearProcess { f }
    }
}

impl<T: RealField + Copy, const S: usize> ProcessModel<T, S> for LinearProcess<T, S> {
    fn prediction(&self, x: &SVector<T, S>) -> SVector<T, S> {
        self.f * x
    }

    fn jacobian(&self, _x: &SVector<T, S>) -> SMatrix<T, S, S> {
        self.f
    }
}

/// Wraps a closure returning `(f(x), df/dx)`.
pub struct FnProcess<T, F, const S: usize> {
    f: F,
    _scalar: PhantomData<T>,
}

impl<T, F, const S: usize> FnProcess<T, F, S>
where
    T: RealField,
    F: Fn(&SVector<T, S>) -> (SVector<T, S>, SMatrix<T, S, S>),
{
    pub fn new(f: F) -> Self {
        FnProcess {
            f,
            _scalar: PhantomData,
        }
    }
}

impl<T, F, const S: usize> ProcessModel<T, S> for FnProcess<T, F, S>
where
    T: RealField,
    F: Fn(&SVector<T, S>) -> (SVector<T, S>, SMatrix<T, S, S>),
{
    fn prediction(&self, x: &SVector<T, S>) -> SVector<T, S> {
        (self.f)(x).0
    }

    fn jacobian(&self, x: &SVector<T, S>) -> SMatrix<T, S, S> {
        (self.f)(x).1
    }

    fn linearize(&self, x: &SVector<T, S>) -> (SVector<T, S>, SMatrix<T, S, S>) {
        (self.f)(x)
    }
}
