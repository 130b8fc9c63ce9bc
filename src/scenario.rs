//! Forecast scenarios derived from one model fit
//!
//! The point forecast is the realistic scenario; the upper and lower bounds of
//! the confidence interval are the optimistic and pessimistic ones.

use serde::{Deserialize, Serialize};

/// Which trajectory of a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Realistic,
    Optimistic,
    Pessimistic,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Realistic, Scenario::Optimistic, Scenario::Pessimistic];

    /// Column suffix used in exports
    pub fn key(&self) -> &'static str {
        match self {
            Scenario::Realistic => "central",
            Scenario::Optimistic => "optimistic",
            Scenario::Pessimistic => "pessimistic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Realistic => "Realistic",
            Scenario::Optimistic => "Optimistic",
            Scenario::Pessimistic => "Pessimistic",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBands<T> {
    pub central: T,
    pub optimistic: T,
    pub pessimistic: T,
}

impl<T> ScenarioBands<T> {
    pub fn new(central: T, optimistic: T, pessimistic: T) -> Self {
        Self { central, optimistic, pessimistic }
    }

    pub fn get(&self, scenario: Scenario) -> &T {
        match scenario {
            Scenario::Realistic => &self.central,
            Scenario::Optimistic => &self.optimistic,
            Scenario::Pessimistic => &self.pessimistic,
        }
    }

    /// Apply `f` to each band, keeping scenario positions
    pub fn map<U, F>(&self, mut f: F) -> ScenarioBands<U>
    where
        F: FnMut(Scenario, &T) -> U,
    {
        ScenarioBands {
            central: f(Scenario::Realistic, &self.central),
            optimistic: f(Scenario::Optimistic, &self.optimistic),
            pessimistic: f(Scenario::Pessimistic, &self.pessimistic),
        }
    }

    /// Bands in `Scenario::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = (Scenario, &T)> {
        Scenario::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}
