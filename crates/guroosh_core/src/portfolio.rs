//! crates/guroosh_core/src/portfolio.rs
//!
//! Investments and the arithmetic over a portfolio: valuation totals, category
//! distribution, placeholder trend series and the Zakat assessment.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::LedgerEntry;
use crate::not_blank;

/// Zakat is due at 2.5% of zakatable wealth.
pub const ZAKAT_RATE: f64 = 0.025;
/// Nisab is the value of 85 grams of gold.
pub const NISAB_GOLD_GRAMS: f64 = 85.0;

text_enum! {
    pub enum InvestmentCategory {
        Stock => "Stock",
        RealEstate => "Real Estate",
        Crypto => "Crypto",
        Gold => "Gold",
    }
}

impl InvestmentCategory {
    /// Categories counted when the caller does not pick any. Real estate held
    /// for personal use is not zakatable, so it is left out.
    pub const DEFAULT_ZAKATABLE: &'static [InvestmentCategory] = &[
        InvestmentCategory::Stock,
        InvestmentCategory::Crypto,
        InvestmentCategory::Gold,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub symbol: Option<String>,
    pub category: InvestmentCategory,
    pub purchase_price: f64,
    pub current_price: f64,
    pub amount_owned: f64,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investment {
    /// Current market value of the holding.
    pub fn value(&self) -> f64 {
        self.current_price * self.amount_owned
    }

    pub fn cost(&self) -> f64 {
        self.purchase_price * self.amount_owned
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestment {
    #[validate(
        length(max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: String,
    #[validate(length(max = 20, message = "Symbol is too long"))]
    pub symbol: Option<String>,
    pub category: InvestmentCategory,
    #[validate(range(min = 0.0, message = "Purchase price cannot be negative"))]
    pub purchase_price: f64,
    #[validate(range(min = 0.0, message = "Current price cannot be negative"))]
    pub current_price: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Amount owned must be greater than zero"))]
    pub amount_owned: f64,
    pub purchase_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPatch {
    #[validate(
        length(max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: Option<String>,
    #[validate(length(max = 20, message = "Symbol is too long"))]
    pub symbol: Option<String>,
    pub category: Option<InvestmentCategory>,
    #[validate(range(min = 0.0, message = "Purchase price cannot be negative"))]
    pub purchase_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Current price cannot be negative"))]
    pub current_price: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Amount owned must be greater than zero"))]
    pub amount_owned: Option<f64>,
    pub purchase_date: Option<DateTime<Utc>>,
}

impl LedgerEntry for Investment {
    const KIND: &'static str = "investment";
    const LABEL: &'static str = "Investment";
    type Draft = NewInvestment;
    type Patch = InvestmentPatch;

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.purchase_date
    }

    fn from_draft(owner_id: Uuid, draft: NewInvestment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner_id,
            name: draft.name.trim().to_string(),
            symbol: normalize_symbol(draft.symbol),
            category: draft.category,
            purchase_price: draft.purchase_price,
            current_price: draft.current_price.unwrap_or(draft.purchase_price),
            amount_owned: draft.amount_owned,
            purchase_date: draft.purchase_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: InvestmentPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if patch.symbol.is_some() {
            self.symbol = normalize_symbol(patch.symbol);
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(price) = patch.purchase_price {
            self.purchase_price = price;
        }
        if let Some(price) = patch.current_price {
            self.current_price = price;
        }
        if let Some(amount) = patch.amount_owned {
            self.amount_owned = amount;
        }
        if let Some(date) = patch.purchase_date {
            self.purchase_date = date;
        }
        self.updated_at = now;
    }
}

fn normalize_symbol(symbol: Option<String>) -> Option<String> {
    symbol
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

//=========================================================================================
// Aggregation
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: InvestmentCategory,
    pub value: f64,
    pub percent: f64,
    pub holdings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_cost: f64,
    pub total_gain: f64,
    pub gain_percent: f64,
    pub holdings: usize,
    pub distribution: Vec<CategoryShare>,
}

/// Totals and per-category distribution. Categories without holdings are omitted.
pub fn summarize(investments: &[Investment]) -> PortfolioSummary {
    let total_value: f64 = investments.iter().map(Investment::value).sum();
    let total_cost: f64 = investments.iter().map(Investment::cost).sum();
    let total_gain = total_value - total_cost;
    let gain_percent = if total_cost > 0.0 {
        total_gain * 100.0 / total_cost
    } else {
        0.0
    };

    let distribution = InvestmentCategory::ALL
        .iter()
        .filter_map(|category| {
            let held: Vec<&Investment> = investments
                .iter()
                .filter(|i| i.category == *category)
                .collect();
            if held.is_empty() {
                return None;
            }
            let value: f64 = held.iter().map(|i| i.value()).sum();
            Some(CategoryShare {
                category: *category,
                value,
                percent: if total_value > 0.0 {
                    value * 100.0 / total_value
                } else {
                    0.0
                },
                holdings: held.len(),
            })
        })
        .collect();

    PortfolioSummary {
        total_value,
        total_cost,
        total_gain,
        gain_percent,
        holdings: investments.len(),
        distribution,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZakatAssessment {
    pub categories: Vec<InvestmentCategory>,
    pub zakatable_total: f64,
    pub nisab: Option<f64>,
    pub nisab_reached: bool,
    pub due: f64,
}

/// Zakat over the holdings in `categories`.
///
/// Without a gold price the Nisab cannot be derived and the full 2.5% is reported.
/// With one, nothing is due while the zakatable total stays below 85 g of gold.
pub fn assess_zakat(
    investments: &[Investment],
    categories: &[InvestmentCategory],
    gold_price_per_gram: Option<f64>,
) -> ZakatAssessment {
    let zakatable_total: f64 = investments
        .iter()
        .filter(|i| categories.contains(&i.category))
        .map(Investment::value)
        .sum();
    let nisab = gold_price_per_gram.map(|price| price * NISAB_GOLD_GRAMS);
    let nisab_reached = nisab.map_or(true, |threshold| zakatable_total >= threshold);
    let due = if nisab_reached {
        zakatable_total * ZAKAT_RATE
    } else {
        0.0
    };

    ZakatAssessment {
        categories: categories.to_vec(),
        zakatable_total,
        nisab,
        nisab_reached,
        due,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

pub const DEFAULT_TREND_POINTS: usize = 12;
pub const MIN_TREND_POINTS: usize = 2;
pub const MAX_TREND_POINTS: usize = 365;

/// A value series interpolated linearly from the purchase to today's price,
/// for holdings that have no recorded price history.
pub fn trend_series(investment: &Investment, now: DateTime<Utc>, points: usize) -> Vec<TrendPoint> {
    let points = points.clamp(MIN_TREND_POINTS, MAX_TREND_POINTS);
    let start = investment.purchase_date;
    let span_ms = (now - start).num_milliseconds().max(0) as f64;
    let last = (points - 1) as f64;

    (0..points)
        .map(|i| {
            let t = i as f64 / last;
            let price =
                investment.purchase_price + (investment.current_price - investment.purchase_price) * t;
            TrendPoint {
                date: start + Duration::milliseconds((span_ms * t).round() as i64),
                value: price * investment.amount_owned,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(category: InvestmentCategory, purchase: f64, current: f64, amount: f64) -> Investment {
        let now = Utc::now();
        Investment::from_draft(
            Uuid::nil(),
            NewInvestment {
                name: "Holding".to_string(),
                symbol: Some(" aapl ".to_string()),
                category,
                purchase_price: purchase,
                current_price: Some(current),
                amount_owned: amount,
                purchase_date: Some(now - Duration::days(30)),
            },
            now,
        )
    }

    #[test]
    fn summary_totals_and_distribution() {
        let portfolio = vec![
            holding(InvestmentCategory::Stock, 100.0, 150.0, 10.0),
            holding(InvestmentCategory::Gold, 200.0, 250.0, 2.0),
            holding(InvestmentCategory::Stock, 50.0, 25.0, 20.0),
        ];
        let summary = summarize(&portfolio);

        assert_eq!(summary.total_value, 1500.0 + 500.0 + 500.0);
        assert_eq!(summary.total_cost, 1000.0 + 400.0 + 1000.0);
        assert_eq!(summary.total_gain, 100.0);
        assert_eq!(summary.holdings, 3);
        assert_eq!(summary.distribution.len(), 2);
        assert_eq!(summary.distribution[0].category, InvestmentCategory::Stock);
        assert_eq!(summary.distribution[0].value, 2000.0);
        assert_eq!(summary.distribution[0].percent, 80.0);
        assert_eq!(summary.distribution[0].holdings, 2);
        assert_eq!(summary.distribution[1].percent, 20.0);
    }

    #[test]
    fn empty_portfolio_has_no_gain_percent() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_value, 0.0);
        assert_eq!(summary.gain_percent, 0.0);
        assert!(summary.distribution.is_empty());
    }

    #[test]
    fn zakat_is_two_and_a_half_percent_of_selected_categories() {
        let portfolio = vec![
            holding(InvestmentCategory::Stock, 10.0, 10.0, 300.0),
            holding(InvestmentCategory::Crypto, 10.0, 10.0, 100.0),
            holding(InvestmentCategory::RealEstate, 10.0, 10.0, 10_000.0),
        ];
        let assessment = assess_zakat(
            &portfolio,
            &[InvestmentCategory::Stock, InvestmentCategory::Crypto],
            None,
        );
        assert_eq!(assessment.zakatable_total, 4000.0);
        assert_eq!(assessment.due, 4000.0 * ZAKAT_RATE);
        assert!(assessment.nisab_reached);
    }

    #[test]
    fn zakat_on_nothing_is_nothing() {
        let assessment = assess_zakat(&[], InvestmentCategory::DEFAULT_ZAKATABLE, None);
        assert_eq!(assessment.zakatable_total, 0.0);
        assert_eq!(assessment.due, 0.0);
    }

    #[test]
    fn nothing_is_due_below_nisab() {
        let portfolio = vec![holding(InvestmentCategory::Gold, 300.0, 300.0, 10.0)];
        // Nisab at 250 per gram is 21,250; the holding is worth 3,000.
        let assessment = assess_zakat(&portfolio, &[InvestmentCategory::Gold], Some(250.0));
        assert_eq!(assessment.nisab, Some(21_250.0));
        assert!(!assessment.nisab_reached);
        assert_eq!(assessment.due, 0.0);

        let assessment = assess_zakat(&portfolio, &[InvestmentCategory::Gold], Some(10.0));
        assert!(assessment.nisab_reached);
        assert_eq!(assessment.due, 3000.0 * ZAKAT_RATE);
    }

    #[test]
    fn trend_runs_from_purchase_to_current_value() {
        let investment = holding(InvestmentCategory::Crypto, 100.0, 200.0, 2.0);
        let now = Utc::now();
        let series = trend_series(&investment, now, 5);

        assert_eq!(series.len(), 5);
        assert_eq!(series[0].date, investment.purchase_date);
        assert_eq!(series[0].value, 200.0);
        assert_eq!(series[2].value, 300.0);
        assert_eq!(series[4].value, 400.0);
        assert!(series.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn trend_point_count_is_clamped() {
        let investment = holding(InvestmentCategory::Stock, 1.0, 1.0, 1.0);
        assert_eq!(trend_series(&investment, Utc::now(), 0).len(), MIN_TREND_POINTS);
        assert_eq!(trend_series(&investment, Utc::now(), 10_000).len(), MAX_TREND_POINTS);
    }

    #[test]
    fn symbols_are_normalized() {
        let investment = holding(InvestmentCategory::Stock, 1.0, 1.0, 1.0);
        assert_eq!(investment.symbol.as_deref(), Some("AAPL"));
    }
}
