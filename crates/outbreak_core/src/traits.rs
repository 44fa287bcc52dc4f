use num_traits::Float;
use std::fmt::Debug;

/// Floating-point types the integrators can step.
pub trait Scalar: Float + Debug + 'static {}

impl<T: Float + Debug + 'static> Scalar for T {}

/// An autonomous or time-dependent right-hand side `dx/dt = f(t, x)`.
pub trait DynamicalSystem<T: Scalar> {
    /// Number of state variables.
    fn dimension(&self) -> usize;

    /// Writes `f(t, x)` into `out`. `out.len()` equals `x.len()`.
    fn apply(&self, t: T, x: &[T], out: &mut [T]);

    /// Allocating variant of [`apply`](Self::apply).
    fn rate_of_change(&self, t: T, x: &[T]) -> Vec<T> {
        let mut out = vec![T::zero(); x.len()];
        self.apply(t, x, &mut out);
        out
    }
}

/// Fixed-step integrators.
pub trait Steppable<T: Scalar> {
    /// Order of accuracy of one step, used in run summaries.
    fn order(&self) -> u32;

    /// Advances `state` from `t` to `t + dt` in place and updates `t`.
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
