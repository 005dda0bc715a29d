use std::{fmt::Display, ops::Deref};

/// A non-negative percentage. Category progress uses it clamped to `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.round())
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value.is_nan() || value < 0. {
            None
        } else {
            Some(Percentage(value))
        }
    }

    pub fn zero() -> Percentage {
        Percentage(0.)
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `target` already covered by `done`, capped at 100%. A zero target has no progress to
/// show and yields 0%.
pub fn progress_percentage(done: u64, target: u64) -> Percentage {
    if target == 0 {
        return Percentage::zero();
    }
    let value = (done as f64 / target as f64 * 100.).min(100.);
    Percentage::new_opt(value).unwrap_or_else(Percentage::zero)
}
