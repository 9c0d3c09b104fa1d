use std::cmp::Ordering;

use crate::maxsum::operator::Operator;

// Keeps the best and second best (element, value) pairs tracked since the last reset, so that
// "the best value among every element except x" is answered without rescanning.
#[derive(Debug, Clone)]
pub struct BestValuesTracker<T> {
    operator: Operator,
    best: Option<T>,
    best_value: f64,
    second: Option<T>,
    second_value: f64,
}

impl<T: PartialEq> BestValuesTracker<T> {
    pub fn new(operator: Operator) -> Self {
        BestValuesTracker {
            operator,
            best: None,
            best_value: operator.worst_value(),
            second: None,
            second_value: operator.worst_value(),
        }
    }

    pub fn reset(&mut self) {
        self.best = None;
        self.best_value = self.operator.worst_value();
        self.second = None;
        self.second_value = self.operator.worst_value();
    }

    pub fn track(&mut self, element: T, value: f64) {
        if self.operator.compare(value, self.best_value) != Ordering::Less {
            self.second = self.best.take();
            self.second_value = self.best_value;
            self.best = Some(element);
            self.best_value = value;
        } else if self.operator.compare(value, self.second_value) != Ordering::Less {
            self.second = Some(element);
            self.second_value = value;
        }
    }

    // Best value tracked for anything other than `element`
    pub fn complementary(&self, element: &T) -> f64 {
        match &self.best {
            Some(best) if best == element => self.second_value,
            _ => self.best_value,
        }
    }

    pub fn best(&self) -> Option<&T> {
        self.best.as_ref()
    }

    pub fn best_value(&self) -> f64 {
        self.best_value
    }

    pub fn second_value(&self) -> f64 {
        self.second_value
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }
}
