mod bayesian_filter;
mod extended_kalman_filter;
mod kalman_filter;

pub use bayesian_filter::{replay, BayesianFilter};
pub use extended_kalman_filter::{ExtendedKalmanFilter, FilterPhase};
pub use kalman_filter::LinearKalmanFilter;
