//! Declarative list of the metrics a pipeline run tracks

use crate::error::PipelineError;
use crate::records::Field;
use crate::series::{AggregateRequest, Reduction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const WEIGHT: &str = "weight";
pub const ORDERS: &str = "orders";
pub const WEIGHT_PER_ORDER: &str = "weight_per_order";
pub const ORDERS_PER_TON: &str = "orders_per_ton";
pub const WEIGHT_CHANGE_PCT: &str = "weight_change_pct";

/// How a metric's monthly series is obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricDefinition {
    /// Reduce a record field per month
    Aggregate { field: Field, reduction: Reduction },
    /// Quotient of two earlier metrics
    Ratio { numerator: String, denominator: String },
    /// Month-over-month percent change of an earlier metric
    PercentChange { of: String },
}

impl MetricDefinition {
    fn dependencies(&self) -> Vec<&str> {
        match self {
            MetricDefinition::Aggregate { .. } => Vec::new(),
            MetricDefinition::Ratio { numerator, denominator } => {
                vec![numerator.as_str(), denominator.as_str()]
            }
            MetricDefinition::PercentChange { of } => vec![of.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    #[serde(flatten)]
    pub definition: MetricDefinition,
    /// Whether the series is fitted and projected
    #[serde(default)]
    pub forecast: bool,
}

impl MetricSpec {
    pub fn aggregate(name: &str, field: Field, reduction: Reduction, forecast: bool) -> Self {
        Self {
            name: name.to_string(),
            definition: MetricDefinition::Aggregate { field, reduction },
            forecast,
        }
    }

    pub fn ratio(name: &str, numerator: &str, denominator: &str) -> Self {
        Self {
            name: name.to_string(),
            definition: MetricDefinition::Ratio {
                numerator: numerator.to_string(),
                denominator: denominator.to_string(),
            },
            forecast: false,
        }
    }

    pub fn percent_change(name: &str, of: &str) -> Self {
        Self {
            name: name.to_string(),
            definition: MetricDefinition::PercentChange { of: of.to_string() },
            forecast: false,
        }
    }

    pub fn forecasted(mut self) -> Self {
        self.forecast = true;
        self
    }
}

/// Which metrics a run tracks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSet {
    /// Monthly tonnage, forecast
    #[default]
    WeightOnly,
    /// Tonnage and order count, both forecast
    WeightAndCount,
    /// Tonnage and order count, plus weight per order, orders per ton and tonnage change
    WeightCountAndRatios,
    Custom(Vec<MetricSpec>),
}

impl MetricSet {
    /// Expanded metric list, in evaluation order
    pub fn specs(&self) -> Vec<MetricSpec> {
        let weight = MetricSpec::aggregate(WEIGHT, Field::Weight, Reduction::Sum, true);
        let orders = MetricSpec::aggregate(ORDERS, Field::OrderRef, Reduction::Count, true);
        match self {
            MetricSet::WeightOnly => vec![weight],
            MetricSet::WeightAndCount => vec![weight, orders],
            MetricSet::WeightCountAndRatios => vec![
                weight,
                orders,
                MetricSpec::ratio(WEIGHT_PER_ORDER, WEIGHT, ORDERS),
                MetricSpec::ratio(ORDERS_PER_TON, ORDERS, WEIGHT),
                MetricSpec::percent_change(WEIGHT_CHANGE_PCT, WEIGHT),
            ],
            MetricSet::Custom(specs) => specs.clone(),
        }
    }

    /// Whether any aggregate metric reads `field`
    pub fn uses_field(&self, field: Field) -> bool {
        self.specs().iter().any(|s| {
            matches!(s.definition, MetricDefinition::Aggregate { field: f, .. } if f == field)
        })
    }

    /// Aggregate requests in spec order, paired with their metric names
    pub(crate) fn aggregate_requests(specs: &[MetricSpec]) -> Vec<(String, AggregateRequest)> {
        specs
            .iter()
            .filter_map(|s| match s.definition {
                MetricDefinition::Aggregate { field, reduction } => {
                    Some((s.name.clone(), AggregateRequest::new(field, reduction)))
                }
                _ => None,
            })
            .collect()
    }

    /// Names must be unique and derived metrics may only refer to metrics declared before them
    pub fn validate(&self) -> Result<(), PipelineError> {
        let specs = self.specs();
        if specs.is_empty() {
            return Err(PipelineError::InvalidConfig("metric list is empty".to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for spec in &specs {
            if spec.name.trim().is_empty() {
                return Err(PipelineError::InvalidConfig("metric with empty name".to_string()));
            }
            for dep in spec.definition.dependencies() {
                if !seen.contains(dep) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "metric '{}' refers to unknown or later metric '{}'",
                        spec.name, dep
                    )));
                }
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate metric name '{}'",
                    spec.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_expand_in_dependency_order() {
        let names: Vec<_> = MetricSet::WeightCountAndRatios
            .specs()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec![WEIGHT, ORDERS, WEIGHT_PER_ORDER, ORDERS_PER_TON, WEIGHT_CHANGE_PCT]
        );
        assert!(MetricSet::WeightCountAndRatios.validate().is_ok());
        assert!(MetricSet::WeightAndCount.uses_field(Field::OrderRef));
        assert!(!MetricSet::WeightOnly.uses_field(Field::OrderRef));
    }

    #[test]
    fn test_validate_rejects_forward_and_duplicate_references() {
        let forward = MetricSet::Custom(vec![
            MetricSpec::ratio("r", WEIGHT, ORDERS),
            MetricSpec::aggregate(WEIGHT, Field::Weight, Reduction::Sum, true),
        ]);
        assert!(matches!(forward.validate(), Err(PipelineError::InvalidConfig(_))));

        let duplicate = MetricSet::Custom(vec![
            MetricSpec::aggregate(WEIGHT, Field::Weight, Reduction::Sum, true),
            MetricSpec::aggregate(WEIGHT, Field::Weight, Reduction::Mean, false),
        ]);
        assert!(duplicate.validate().is_err());
        assert!(MetricSet::Custom(Vec::new()).validate().is_err());
    }

    #[test]
    fn test_custom_metrics_from_json() {
        let json = r#"{"custom": [
            {"name": "weight", "kind": "aggregate", "field": "weight", "reduction": "sum", "forecast": true},
            {"name": "avg_weight", "kind": "aggregate", "field": "weight", "reduction": "mean"},
            {"name": "growth", "kind": "percent_change", "of": "weight"}
        ]}"#;
        let set: MetricSet = serde_json::from_str(json).unwrap();
        let specs = set.specs();
        assert_eq!(specs.len(), 3);
        assert!(specs[0].forecast);
        assert!(!specs[1].forecast);
        assert_eq!(specs[2].definition, MetricDefinition::PercentChange { of: "weight".to_string() });

        let preset: MetricSet = serde_json::from_str(r#""weight_and_count""#).unwrap();
        assert_eq!(preset, MetricSet::WeightAndCount);
    }
}
