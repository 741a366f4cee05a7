//! Pure insight math shared by the database read-model and the API.
//!
//! Nothing here touches storage; the database layer feeds raw aggregates in
//! and serializes what comes out.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// Reported in the advanced bundle in place of a computed value.
pub const AVG_DAYS_BETWEEN_ORDERS: u32 = 30;

/// Spend above which a customer is VIP (exclusive).
const VIP_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;
/// Spend at or above which a customer is Regular (inclusive).
const REGULAR_THRESHOLD: Decimal = Decimal::ONE_HUNDRED;

/// What a percentage change reports when the previous period is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroBaseline {
    /// Divide by 1 instead of 0. `0 -> 150` reports `14900%`.
    SubstituteOne,
    /// Report `0%`.
    Zero,
    /// Report unbounded growth (`0%` when the current value is also zero).
    Infinite,
    /// Report no value.
    Undefined,
}

/// Zero-baseline handling for the advanced insights bundle.
///
/// `Legacy` keeps the historical asymmetry: revenue growth substitutes a
/// denominator of 1 while customer growth reports 0%. Every other policy
/// applies the same [`ZeroBaseline`] to both metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthPolicy {
    #[default]
    Legacy,
    Zero,
    Infinite,
    Undefined,
}

impl GrowthPolicy {
    #[must_use]
    pub fn revenue_baseline(self) -> ZeroBaseline {
        match self {
            GrowthPolicy::Legacy => ZeroBaseline::SubstituteOne,
            other => other.uniform(),
        }
    }

    #[must_use]
    pub fn customer_baseline(self) -> ZeroBaseline {
        match self {
            GrowthPolicy::Legacy => ZeroBaseline::Zero,
            other => other.uniform(),
        }
    }

    fn uniform(self) -> ZeroBaseline {
        match self {
            GrowthPolicy::Legacy | GrowthPolicy::Zero => ZeroBaseline::Zero,
            GrowthPolicy::Infinite => ZeroBaseline::Infinite,
            GrowthPolicy::Undefined => ZeroBaseline::Undefined,
        }
    }
}

impl std::fmt::Display for GrowthPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrowthPolicy::Legacy => write!(f, "legacy"),
            GrowthPolicy::Zero => write!(f, "zero"),
            GrowthPolicy::Infinite => write!(f, "infinite"),
            GrowthPolicy::Undefined => write!(f, "undefined"),
        }
    }
}

impl std::str::FromStr for GrowthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "zero" => Ok(Self::Zero),
            "infinite" => Ok(Self::Infinite),
            "undefined" => Ok(Self::Undefined),
            other => Err(format!(
                "unknown growth policy \"{other}\"; expected legacy, zero, infinite, or undefined"
            )),
        }
    }
}

/// A period-over-period percentage.
///
/// Serializes as a JSON number, the string `"infinite"`, or `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthRate {
    Percent(f64),
    Infinite,
    Undefined,
}

impl GrowthRate {
    #[must_use]
    pub fn as_percent(self) -> Option<f64> {
        match self {
            GrowthRate::Percent(p) => Some(p),
            GrowthRate::Infinite | GrowthRate::Undefined => None,
        }
    }
}

impl Serialize for GrowthRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GrowthRate::Percent(p) => serializer.serialize_f64(*p),
            GrowthRate::Infinite => serializer.serialize_str("infinite"),
            GrowthRate::Undefined => serializer.serialize_none(),
        }
    }
}

/// `(current - previous) / previous * 100`, with `zero_baseline` deciding the
/// result when `previous` is not positive.
///
/// A negative `previous` (net refunds) is treated like a zero baseline, except
/// under [`ZeroBaseline::SubstituteOne`], which only substitutes an exact zero
/// and reports `0%` for a negative baseline.
#[must_use]
pub fn percent_change(
    current: Decimal,
    previous: Decimal,
    zero_baseline: ZeroBaseline,
) -> GrowthRate {
    if previous > Decimal::ZERO {
        return ratio_percent(current, previous);
    }

    match zero_baseline {
        ZeroBaseline::SubstituteOne if previous.is_zero() => ratio_percent(current, Decimal::ONE),
        ZeroBaseline::SubstituteOne | ZeroBaseline::Zero => GrowthRate::Percent(0.0),
        ZeroBaseline::Infinite if current.is_zero() => GrowthRate::Percent(0.0),
        ZeroBaseline::Infinite => GrowthRate::Infinite,
        ZeroBaseline::Undefined => GrowthRate::Undefined,
    }
}

fn ratio_percent(current: Decimal, previous: Decimal) -> GrowthRate {
    let pct = (current - previous) / previous * Decimal::ONE_HUNDRED;
    pct.to_f64().map_or(GrowthRate::Undefined, GrowthRate::Percent)
}

/// Spend-based customer bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Vip,
    Regular,
    New,
}

impl Segment {
    /// Classify by cumulative spend. Both 100 and 1000 are `Regular`.
    #[must_use]
    pub fn classify(total_spent: Decimal) -> Self {
        if total_spent > VIP_THRESHOLD {
            Segment::Vip
        } else if total_spent >= REGULAR_THRESHOLD {
            Segment::Regular
        } else {
            Segment::New
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Segment::Vip => "VIP Customers",
            Segment::Regular => "Regular Customers",
            Segment::New => "New Customers",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Segment::Vip => "Spent over $1,000",
            Segment::Regular => "Spent $100 - $1,000",
            Segment::New => "Spent under $100",
        }
    }
}

/// Minimal per-customer input for segmentation and repeat rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CustomerSpend {
    pub total_spent: Decimal,
    pub orders_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub count: usize,
    /// Mean spend rounded to cents; zero for an empty segment.
    pub avg_spend: Decimal,
}

/// Partition customers into VIP, Regular, and New, in that order.
#[must_use]
pub fn segment_customers(customers: &[CustomerSpend]) -> Vec<SegmentSummary> {
    [Segment::Vip, Segment::Regular, Segment::New]
        .into_iter()
        .map(|segment| {
            let spends: Vec<Decimal> = customers
                .iter()
                .filter(|c| Segment::classify(c.total_spent) == segment)
                .map(|c| c.total_spent)
                .collect();
            let avg_spend = if spends.is_empty() {
                Decimal::ZERO
            } else {
                let total: Decimal = spends.iter().copied().sum();
                (total / Decimal::from(spends.len())).round_dp(2)
            };
            SegmentSummary {
                name: segment.name(),
                description: segment.description(),
                count: spends.len(),
                avg_spend,
            }
        })
        .collect()
}

/// Percentage of customers with more than one order; `0.0` with no customers.
#[must_use]
pub fn repeat_customer_rate(customers: &[CustomerSpend]) -> f64 {
    if customers.is_empty() {
        return 0.0;
    }
    let repeat = customers.iter().filter(|c| c.orders_count > 1).count();
    let rate = Decimal::from(repeat) / Decimal::from(customers.len()) * Decimal::ONE_HUNDRED;
    rate.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
#[path = "insights_test.rs"]
mod tests;
