use std::cmp::Ordering;
use std::fmt::Display;

// Direction of optimization. Every factor algorithm is written once against `compare`/`max`
// and works for both utilities (Maximize) and costs (Minimize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Maximize,
    Minimize,
}

impl Operator {
    // `Greater` means that `v1` is better than `v2` under this operator
    pub fn compare(&self, v1: f64, v2: f64) -> Ordering {
        let ordering = v1.partial_cmp(&v2).unwrap_or(Ordering::Equal);
        match self {
            Operator::Maximize => ordering,
            Operator::Minimize => ordering.reverse(),
        }
    }

    // Returns the better of the two values
    pub fn max(&self, v1: f64, v2: f64) -> f64 {
        if self.compare(v1, v2) == Ordering::Less {
            v2
        } else {
            v1
        }
    }

    pub fn is_better(&self, v1: f64, v2: f64) -> bool {
        self.compare(v1, v2) == Ordering::Greater
    }

    // Identity element of `max`
    pub fn worst_value(&self) -> f64 {
        match self {
            Operator::Maximize => f64::NEG_INFINITY,
            Operator::Minimize => f64::INFINITY,
        }
    }

    pub fn inverse(&self) -> Operator {
        match self {
            Operator::Maximize => Operator::Minimize,
            Operator::Minimize => Operator::Maximize,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Maximize => write!(f, "max"),
            Operator::Minimize => write!(f, "min"),
        }
    }
}
