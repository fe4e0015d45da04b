use std::collections::VecDeque;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::models::{ActivityLogEntry, SaleCategory};

/// Capacity of the recent-activity feed.
pub const DEFAULT_FEED_CAPACITY: usize = 5;

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const WEEK_OF_MONTH_LABELS: [&str; 5] = ["Week 1", "Week 2", "Week 3", "Week 4", "Week 5"];
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A completed sale as the dashboard sees it: one event per category, so a
/// cab sale with bundled accessories produces two events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleEvent {
    pub category: SaleCategory,
    pub amount: Decimal,
    pub quantity: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Parallel label/series arrays for one chart. The `Total` series is
/// derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub cabs: Vec<Decimal>,
    pub accessories: Vec<Decimal>,
}

impl TrendSeries {
    fn with_labels(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            cabs: vec![Decimal::ZERO; labels.len()],
            accessories: vec![Decimal::ZERO; labels.len()],
        }
    }

    fn accumulate(&mut self, bucket: usize, category: SaleCategory, amount: Decimal) {
        let series = match category {
            SaleCategory::Cabs => &mut self.cabs,
            SaleCategory::Accessories => &mut self.accessories,
        };
        if let Some(slot) = series.get_mut(bucket) {
            *slot += amount;
        }
    }

    /// Elementwise sum of the category series.
    pub fn totals(&self) -> Vec<Decimal> {
        self.cabs
            .iter()
            .zip(&self.accessories)
            .map(|(cab, accessory)| *cab + *accessory)
            .collect()
    }
}

/// Point-in-time copy of the dashboard state for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub total_sales: Decimal,
    pub sales_count: u64,
    pub total_inventory_value: Decimal,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    pub weekly: TrendSeries,
    pub monthly: TrendSeries,
    pub yearly: TrendSeries,
    pub recent_activity: Vec<ActivityLogEntry>,
}

#[derive(Debug)]
struct DashboardState {
    total_sales: Decimal,
    sales_count: u64,
    total_inventory_value: Decimal,
    low_stock_count: u64,
    out_of_stock_count: u64,
    weekly: TrendSeries,
    monthly: TrendSeries,
    yearly: TrendSeries,
    recent_activity: VecDeque<ActivityLogEntry>,
}

/// Accumulates recorded sales into running totals and time-bucketed trend
/// series, and keeps a bounded recent-activity feed.
///
/// This state is advisory display state: nothing reconciles it against the
/// repositories, and it is allowed to drift until the next refresh.
pub struct DashboardAggregator {
    state: RwLock<DashboardState>,
    feed_capacity: usize,
}

impl DashboardAggregator {
    pub fn new(feed_capacity: usize) -> Self {
        Self {
            state: RwLock::new(DashboardState {
                total_sales: Decimal::ZERO,
                sales_count: 0,
                total_inventory_value: Decimal::ZERO,
                low_stock_count: 0,
                out_of_stock_count: 0,
                weekly: TrendSeries::with_labels(&WEEKDAY_LABELS),
                monthly: TrendSeries::with_labels(&WEEK_OF_MONTH_LABELS),
                yearly: TrendSeries::with_labels(&MONTH_LABELS),
                recent_activity: VecDeque::with_capacity(feed_capacity),
            }),
            feed_capacity: feed_capacity.max(1),
        }
    }

    /// Folds one sale event into totals and into the bucket of each trend
    /// series matching the event's timestamp.
    #[instrument(skip(self, event), fields(category = %event.category, amount = %event.amount))]
    pub async fn record_sale(&self, event: SaleEvent) {
        let weekday = event.occurred_at.weekday().num_days_from_monday() as usize;
        let week_of_month = (((event.occurred_at.day0()) / 7) as usize).min(4);
        let month = event.occurred_at.month0() as usize;

        let mut state = self.state.write().await;
        state.total_sales += event.amount;
        state.sales_count += 1;
        state.weekly.accumulate(weekday, event.category, event.amount);
        state
            .monthly
            .accumulate(week_of_month, event.category, event.amount);
        state.yearly.accumulate(month, event.category, event.amount);
    }

    /// Prepends an activity entry, evicting the oldest beyond capacity.
    pub async fn add_activity(&self, entry: ActivityLogEntry) {
        let mut state = self.state.write().await;
        state.recent_activity.push_front(entry);
        while state.recent_activity.len() > self.feed_capacity {
            state.recent_activity.pop_back();
        }
    }

    /// Refreshes the inventory-derived figures shown beside the sales
    /// totals.
    pub async fn sync_inventory(
        &self,
        total_value: Decimal,
        low_stock_count: u64,
        out_of_stock_count: u64,
    ) {
        let mut state = self.state.write().await;
        state.total_inventory_value = total_value;
        state.low_stock_count = low_stock_count;
        state.out_of_stock_count = out_of_stock_count;
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let state = self.state.read().await;
        DashboardSnapshot {
            total_sales: state.total_sales,
            sales_count: state.sales_count,
            total_inventory_value: state.total_inventory_value,
            low_stock_count: state.low_stock_count,
            out_of_stock_count: state.out_of_stock_count,
            weekly: state.weekly.clone(),
            monthly: state.monthly.clone(),
            yearly: state.yearly.clone(),
            recent_activity: state.recent_activity.iter().cloned().collect(),
        }
    }
}

impl Default for DashboardAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
