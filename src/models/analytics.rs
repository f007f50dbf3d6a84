use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaintenanceCost {
    pub amount: u64,
    pub currency: &'static str,
    pub period: &'static str,
}

/// Headline figures shown on the analytics page. These are fixed mock
/// values; nothing here is computed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub average_uptime_percent: f64,
    pub uptime_change_percent: f64,
    pub total_runtime_hours: u64,
    pub maintenance_cost: MaintenanceCost,
}

impl AnalyticsSummary {
    pub fn current() -> Self {
        Self {
            average_uptime_percent: 99.2,
            uptime_change_percent: 0.5,
            total_runtime_hours: 12_450,
            maintenance_cost: MaintenanceCost {
                amount: 4_250,
                currency: "USD",
                period: "month",
            },
        }
    }
}
