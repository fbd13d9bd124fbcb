//! Chronic disease transition solver
//!
//! Advances the Susceptible/Case compartments over one step using the exact
//! solution of
//!
//! ```text
//! dS/dt = −i·S + r·C
//! dC/dt =  i·S − (r+f)·C
//! ```
//!
//! with incidence `i`, remission `r` and case excess mortality `f`, all per
//! step. Writing `l = i+f+r` and `q = sqrt((i−f)² + r·(r + 2i + 2f))`, the
//! system matrix has eigenvalues `(−l ± q)/2`. With `a = exp(−l/2)`,
//! `g = sinh(q/2)/q` and `k = cosh(q/2)`:
//!
//! ```text
//! S' = a·[ g·(2(S(f+r) + C·r) − l·S) + k·S ]
//! C' = a·[ −g·(2(f+r)(S+C) − 2l·S − l·C) + k·C ]
//! ```
//!
//! which is the usual closed form with `v − w = 2a·sinh(q/2)` and
//! `v + w = 2a·cosh(q/2)`. As `q → 0` the ratio `g` tends to `1/2`, giving the
//! repeated-eigenvalue solution `exp(A) = e^{−l/2}·(I + A + (l/2)·I)`, so the
//! degenerate case `q = 0` needs no division.

use crate::models::state::Compartments;

/// Below this discriminant `sinh(q/2)/q` is evaluated from its series
const SERIES_THRESHOLD: f64 = 1e-4;

/// Per-step hazards driving one track's transition
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransitionRates {
    pub incidence: f64,
    pub remission: f64,
    pub excess_mortality: f64,
}

impl TransitionRates {
    pub fn new(incidence: f64, remission: f64, excess_mortality: f64) -> Self {
        Self {
            incidence,
            remission,
            excess_mortality,
        }
    }

    /// Sum of all outflow hazards, `l = i + f + r`
    pub fn total(&self) -> f64 {
        self.incidence + self.remission + self.excess_mortality
    }

    /// Eigenvalue gap `q`, never negative
    pub fn discriminant(&self) -> f64 {
        let (i, r, f) = (self.incidence, self.remission, self.excess_mortality);
        ((i - f).powi(2) + r * (r + 2.0 * (i + f))).max(0.0).sqrt()
    }
}

/// `sinh(q/2) / q`, continuous at `q = 0` where it equals `1/2`
pub fn half_sinh_ratio(q: f64) -> f64 {
    if q < SERIES_THRESHOLD {
        0.5 * (1.0 + q * q / 24.0)
    } else {
        (q / 2.0).sinh() / q
    }
}

/// Advance compartments one step with the general closed form
///
/// Valid for every non-negative rate combination, including `q = 0`.
///
/// # Example
/// ```
/// use mslt_core_rs::components::transition::{solve, TransitionRates};
/// use mslt_core_rs::models::Compartments;
///
/// let next = solve(Compartments::new(900.0, 100.0), TransitionRates::new(0.05, 0.1, 0.0));
/// // Without excess mortality nobody leaves the unit population
/// assert!((next.alive() - 1000.0).abs() < 1e-9);
/// ```
pub fn solve(current: Compartments, rates: TransitionRates) -> Compartments {
    let Compartments {
        susceptible: s,
        cases: c,
    } = current;
    let r = rates.remission;
    let f_plus_r = rates.excess_mortality + r;
    let l = rates.total();
    let q = rates.discriminant();

    let a = (-l / 2.0).exp();
    let g = half_sinh_ratio(q);
    let k = (q / 2.0).cosh();

    let susceptible = a * (g * (2.0 * (s * f_plus_r + c * r) - l * s) + k * s);
    let cases = a * (-g * (2.0 * f_plus_r * (s + c) - 2.0 * l * s - l * c) + k * c);

    Compartments::new(susceptible, cases)
}

/// Advance compartments one step with the simplified zero-remission equations
///
/// ```text
/// S' = S·e^{−i}
/// C' = C·e^{−f} + (S − S')
/// ```
///
/// Everyone leaving the susceptible compartment is counted as a case and
/// new cases do not die within the step of onset. `S'` is exact, `C'` is
/// above the general solution whenever `f > 0`, and the two agree at `f = 0`.
pub fn solve_remission_free(
    current: Compartments,
    incidence: f64,
    excess_mortality: f64,
) -> Compartments {
    let Compartments {
        susceptible: s,
        cases: c,
    } = current;
    let susceptible = s * (-incidence).exp();
    Compartments::new(susceptible, c * (-excess_mortality).exp() + (s - susceptible))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_zero_rates_leave_state_unchanged() {
        let start = Compartments::new(850.0, 150.0);
        let next = solve(start, TransitionRates::default());
        assert!(close(next.susceptible, 850.0, 1e-15));
        assert!(close(next.cases, 150.0, 1e-15));
    }

    #[test]
    fn test_discriminant_matches_expanded_form() {
        let rates = TransitionRates::new(0.3, 0.2, 0.1);
        let (i, r, f): (f64, f64, f64) = (0.3, 0.2, 0.1);
        let expanded = (i * i + r * r + f * f + 2.0 * i * r + 2.0 * f * r - 2.0 * i * f).sqrt();
        assert!(close(rates.discriminant(), expanded, 1e-14));
    }

    #[test]
    fn test_half_sinh_ratio_is_continuous_at_threshold() {
        let below = half_sinh_ratio(SERIES_THRESHOLD * 0.999_999);
        let above = half_sinh_ratio(SERIES_THRESHOLD);
        assert!(close(below, above, 1e-12));
        assert_eq!(half_sinh_ratio(0.0), 0.5);
    }

    #[test]
    fn test_incidence_only_moves_susceptible_to_cases() {
        let next = solve(Compartments::new(1000.0, 0.0), TransitionRates::new(0.1, 0.0, 0.0));
        assert!(close(next.susceptible, 1000.0 * (-0.1f64).exp(), 1e-12));
        assert!(close(next.cases, 1000.0 * (1.0 - (-0.1f64).exp()), 1e-12));
    }

    #[test]
    fn test_remission_free_counts_every_onset_as_a_case() {
        let next = solve_remission_free(Compartments::new(900.0, 100.0), 0.05, 0.1);
        let susceptible = 900.0 * (-0.05f64).exp();
        assert!(close(next.susceptible, susceptible, 1e-15));
        assert!(close(next.cases, 100.0 * (-0.1f64).exp() + 900.0 - susceptible, 1e-15));
    }
}
