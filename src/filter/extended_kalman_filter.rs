#![allow(non_snake_case)]

use nalgebra::{RealField, SMatrix, SVector};

use crate::error::FilterError;
use crate::filter::BayesianFilter;
use crate::linalg;
use crate::models::{MeasurementModel, ProcessModel};
use crate::utils::state::GaussianState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    /// Holding the initial estimate, no update committed yet
    Idle,
    /// At least one update committed
    Ready,
}

/// Buffers for one predict/correct cycle, sized once at construction.
struct Scratch<T: RealField, const S: usize, const Z: usize> {
    xp: SVector<T, S>,
    fy: SMatrix<T, S, S>,
    fyt: SMatrix<T, S, S>,
    fy_p: SMatrix<T, S, S>,
    pp: SMatrix<T, S, S>,

    gxp: SVector<T, Z>,
    h: SMatrix<T, Z, S>,
    ht: SMatrix<T, S, Z>,
    pp_ht: SMatrix<T, S, Z>,
    h_pp: SMatrix<T, Z, S>,
    s: SMatrix<T, Z, Z>,
    s_work: SMatrix<T, Z, Z>,
    s_inv: SMatrix<T, Z, Z>,
    g: SMatrix<T, S, Z>,

    innovation: SVector<T, Z>,
    correction: SVector<T, S>,
    gh: SMatrix<T, S, S>,
    i_gh: SMatrix<T, S, S>,
    x_post: SVector<T, S>,
    p_post: SMatrix<T, S, S>,
}

impl<T: RealField + Copy, const S: usize, const Z: usize> Scratch<T, S, Z> {
    fn new() -> Self {
        Scratch {
            xp: SVector::zeros(),
            fy: SMatrix::zeros(),
            fyt: SMatrix::zeros(),
            fy_p: SMatrix::zeros(),
            pp: SMatrix::zeros(),
            gxp: SVector::zeros(),
            h: SMatrix::zeros(),
            ht: SMatrix::zeros(),
            pp_ht: SMatrix::zeros(),
            h_pp: SMatrix::zeros(),
            s: SMatrix::zeros(),
            s_work: SMatrix::zeros(),
            s_inv: SMatrix::zeros(),
            g: SMatrix::zeros(),
            innovation: SVector::zeros(),
            correction: SVector::zeros(),
            gh: SMatrix::zeros(),
            i_gh: SMatrix::zeros(),
            x_post: SVector::zeros(),
            p_post: SMatrix::zeros(),
        }
    }
}

/// S : State Size, Z: Observation Size
///
/// Owns the estimate, the noise covariances and every intermediate buffer,
/// so [`ExtendedKalmanFilter::update`] runs without allocating. `update` takes
/// `&mut self`; share an instance across threads behind a lock.
pub struct ExtendedKalmanFilter<T: RealField, const S: usize, const Z: usize> {
    x: SVector<T, S>,
    P: SMatrix<T, S, S>,
    Q: SMatrix<T, S, S>,
    R: SMatrix<T, Z, Z>,
    process_model: Box<dyn ProcessModel<T, S>>,
    measurement_model: Box<dyn MeasurementModel<T, S, Z>>,
    scratch: Scratch<T, S, Z>,
    phase: FilterPhase,
    steps: u64,
}

impl<T: RealField + Copy, const S: usize, const Z: usize> ExtendedKalmanFilter<T, S, Z> {
    const NON_EMPTY: () = assert!(S > 0 && Z > 0, "state and measurement sizes must be > 0");

    pub fn new(
        initial: GaussianState<T, S>,
        Q: SMatrix<T, S, S>,
        R: SMatrix<T, Z, Z>,
        process_model: Box<dyn ProcessModel<T, S>>,
        measurement_model: Box<dyn MeasurementModel<T, S, Z>>,
    ) -> ExtendedKalmanFilter<T, S, Z> {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;

        warn_if_asymmetric("initial covariance", &initial.cov);
        warn_if_asymmetric("process noise", &Q);
        warn_if_asymmetric("measurement noise", &R);
        log::debug!(
            "extended kalman filter created: state size {}, measurement size {}",
            S,
            Z
        );

        ExtendedKalmanFilter {
            x: initial.x,
            P: initial.cov,
            Q,
            R,
            process_model,
            measurement_model,
            scratch: Scratch::new(),
            phase: FilterPhase::Idle,
            steps: 0,
        }
    }

    /// One predict/correct cycle for measurement `z`.
    ///
    /// Everything is computed into scratch buffers and committed to the
    /// estimate only once the innovation covariance has been inverted, so a
    /// `SingularMatrix` failure leaves the previous estimate in place.
    pub fn update(&mut self, z: &SVector<T, Z>) -> Result<GaussianState<T, S>, FilterError> {
        let ws = &mut self.scratch;

        // predict: Xp = f(X), Pp = Fy P Fyᵗ + Q
        let (xp, fy) = self.process_model.linearize(&self.x);
        ws.xp = xp;
        ws.fy = fy;
        linalg::multiply(&ws.fy, &self.P, &mut ws.fy_p);
        linalg::transpose(&ws.fy, &mut ws.fyt);
        linalg::multiply(&ws.fy_p, &ws.fyt, &mut ws.pp);
        linalg::add_assign(&mut ws.pp, &self.Q);

        // linearize the measurement at Xp
        let (gxp, h) = self.measurement_model.linearize(&ws.xp);
        ws.gxp = gxp;
        ws.h = h;

        // innovation covariance: S = H Pp Hᵗ + R
        linalg::transpose(&ws.h, &mut ws.ht);
        linalg::multiply(&ws.pp, &ws.ht, &mut ws.pp_ht);
        linalg::multiply(&ws.h, &ws.pp, &mut ws.h_pp);
        linalg::multiply(&ws.h_pp, &ws.ht, &mut ws.s);
        linalg::add_assign(&mut ws.s, &self.R);
        if let Err(err) = linalg::invert(&ws.s, &mut ws.s_work, &mut ws.s_inv) {
            log::warn!("update {} rejected, estimate kept: {err}", self.steps + 1);
            return Err(err);
        }

        // gain: G = Pp Hᵗ S⁻¹
        linalg::multiply(&ws.pp_ht, &ws.s_inv, &mut ws.g);

        // correct: X = Xp + G (Z - g(Xp))
        ws.innovation = self.measurement_model.residual(z, &ws.gxp);
        log::trace!("innovation {:?}", ws.innovation.as_slice());
        linalg::multiply(&ws.g, &ws.innovation, &mut ws.correction);
        ws.x_post.copy_from(&ws.xp);
        linalg::add_assign(&mut ws.x_post, &ws.correction);

        // P = (I - G H) Pp
        linalg::multiply(&ws.g, &ws.h, &mut ws.gh);
        ws.i_gh.fill_with_identity();
        ws.i_gh -= &ws.gh;
        linalg::multiply(&ws.i_gh, &ws.pp, &mut ws.p_post);

        self.x.copy_from(&ws.x_post);
        self.P.copy_from(&ws.p_post);
        self.phase = FilterPhase::Ready;
        self.steps += 1;
        log::debug!("update {} committed", self.steps);

        Ok(self.gaussian_estimate())
    }

    pub fn state(&self) -> &SVector<T, S> {
        &self.x
    }

    pub fn covariance(&self) -> &SMatrix<T, S, S> {
        &self.P
    }

    /// Restarts the filter from `initial`.
    pub fn set_state(&mut self, initial: GaussianState<T, S>) {
        warn_if_asymmetric("covariance", &initial.cov);
        self.x = initial.x;
        self.P = initial.cov;
        self.phase = FilterPhase::Idle;
        self.steps = 0;
    }

    pub fn process_noise(&self) -> &SMatrix<T, S, S> {
        &self.Q
    }

    /// Q is read on every update, so changes apply from the next cycle.
    pub fn process_noise_mut(&mut self) -> &mut SMatrix<T, S, S> {
        &mut self.Q
    }

    pub fn set_process_noise(&mut self, Q: SMatrix<T, S, S>) {
        self.Q = Q;
    }

    pub fn measurement_noise(&self) -> &SMatrix<T, Z, Z> {
        &self.R
    }

    pub fn measurement_noise_mut(&mut self) -> &mut SMatrix<T, Z, Z> {
        &mut self.R
    }

    pub fn set_measurement_noise(&mut self, R: SMatrix<T, Z, Z>) {
        self.R = R;
    }

    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    /// Number of committed updates since construction or the last `set_state`.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Kalman gain of the last committed update.
    pub fn gain(&self) -> Option<&SMatrix<T, S, Z>> {
        match self.phase {
            FilterPhase::Idle => None,
            FilterPhase::Ready => Some(&self.scratch.g),
        }
    }

    /// `Z - g(Xp)` of the last committed update.
    pub fn innovation(&self) -> Option<&SVector<T, Z>> {
        match self.phase {
            FilterPhase::Idle => None,
            FilterPhase::Ready => Some(&self.scratch.innovation),
        }
    }
}

impl<T: RealField + Copy, const S: usize, const Z: usize> BayesianFilter<T, S, Z>
    for ExtendedKalmanFilter<T, S, Z>
{
    fn update_estimate(&mut self, z: &SVector<T, Z>) -> Result<(), FilterError> {
        self.update(z).map(|_| ())
    }

    fn gaussian_estimate(&self) -> GaussianState<T, S> {
        GaussianState {
            x: self.x,
            cov: self.P,
        }
    }
}

fn warn_if_asymmetric<T: RealField + Copy, const K: usize>(name: &str, m: &SMatrix<T, K, K>) {
    let tolerance: T = nalgebra::convert(1e-9);
    let asymmetry = linalg::asymmetry(m);
    if asymmetry > tolerance {
        log::warn!("{name} is not symmetric (max |A - Aᵗ| = {asymmetry})");
    }
}
