//! # Sales Summary
//!
//! Aggregates over a set of sales: totals, averages, payment mix and the
//! best-selling products. Only completed sales count; cancelled ones are
//! skipped wherever they appear in the input.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, Months, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::ticket::{business_day, day_bounds_utc};
use crate::types::{PaymentMethod, Sale, SaleStatus};

/// How many products [`SalesSummary::top_products`] keeps.
pub const TOP_PRODUCTS: usize = 5;

// =============================================================================
// Period
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SummaryPeriod {
    /// Since local midnight.
    #[default]
    Today,
    /// The last 7 days.
    Week,
    /// The last calendar month.
    Month,
}

impl SummaryPeriod {
    /// Start of the period ending at `now`.
    pub fn since(&self, now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
        match self {
            SummaryPeriod::Today => day_bounds_utc(business_day(now, offset), offset).0,
            SummaryPeriod::Week => now - Duration::days(7),
            SummaryPeriod::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| now - Duration::days(30)),
        }
    }
}

impl std::str::FromStr for SummaryPeriod {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "today" => Ok(SummaryPeriod::Today),
            "week" => Ok(SummaryPeriod::Week),
            "month" => Ok(SummaryPeriod::Month),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: vec!["today".into(), "week".into(), "month".into()],
            }),
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentMethodStats {
    pub method: Option<PaymentMethod>,
    pub count: i64,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSales {
    /// Name as recorded on the sale lines.
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// Statistics over completed sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummary {
    pub sales_count: i64,
    pub total_amount: Money,
    pub units_sold: i64,
    /// Truncated integer average; zero when there are no sales.
    pub average_ticket: Money,
    /// One entry per payment method, in `PaymentMethod::ALL` order.
    pub by_payment_method: Vec<PaymentMethodStats>,
    /// Up to five products by units sold, ties broken by name.
    pub top_products: Vec<ProductSales>,
}

impl SalesSummary {
    pub fn from_sales<'a, I>(sales: I) -> Self
    where
        I: IntoIterator<Item = &'a Sale>,
    {
        let mut summary = SalesSummary::default();
        let mut by_method: BTreeMap<PaymentMethod, (i64, Money)> = PaymentMethod::ALL
            .iter()
            .map(|m| (*m, (0, Money::zero())))
            .collect();
        let mut by_product: BTreeMap<&str, (i64, Money)> = BTreeMap::new();

        for sale in sales.into_iter().filter(|s| s.status == SaleStatus::Completed) {
            summary.sales_count += 1;
            summary.total_amount += sale.total();

            let entry = by_method.entry(sale.payment_method).or_insert((0, Money::zero()));
            entry.0 += 1;
            entry.1 += sale.total();

            for line in &sale.lines {
                summary.units_sold += line.quantity;
                let entry = by_product
                    .entry(line.name_snapshot.as_str())
                    .or_insert((0, Money::zero()));
                entry.0 += line.quantity;
                entry.1 += line.subtotal();
            }
        }

        summary.average_ticket = summary
            .total_amount
            .average_over(summary.sales_count as usize);

        summary.by_payment_method = by_method
            .into_iter()
            .map(|(method, (count, total))| PaymentMethodStats {
                method: Some(method),
                count,
                total,
            })
            .collect();

        // BTreeMap iterates by name, so a stable sort on quantity keeps
        // equal quantities in name order.
        let mut products: Vec<ProductSales> = by_product
            .into_iter()
            .map(|(name, (quantity, revenue))| ProductSales {
                name: name.to_string(),
                quantity,
                revenue,
            })
            .collect();
        products.sort_by(|a, b| b.quantity.cmp(&a.quantity));
        products.truncate(TOP_PRODUCTS);
        summary.top_products = products;

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReceiptChannel, SaleLine};

    fn sale(method: PaymentMethod, status: SaleStatus, lines: &[(&str, i64, i64)]) -> Sale {
        let now = Utc::now();
        let lines: Vec<SaleLine> = lines
            .iter()
            .enumerate()
            .map(|(i, (name, qty, price))| SaleLine {
                id: format!("l-{i}"),
                sale_id: "s".to_string(),
                line_no: i as i64 + 1,
                product_id: format!("p-{name}"),
                name_snapshot: name.to_string(),
                barcode_snapshot: "0".to_string(),
                quantity: *qty,
                unit_price_cents: *price,
                subtotal_cents: qty * price,
            })
            .collect();
        Sale {
            id: "s".to_string(),
            tenant_id: "t".to_string(),
            ticket_number: "20261019-0001".to_string(),
            status,
            payment_method: method,
            receipt_channel: ReceiptChannel::None,
            total_cents: lines.iter().map(|l| l.subtotal_cents).sum(),
            customer_email: None,
            customer_phone: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            lines,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = SalesSummary::from_sales(&Vec::<Sale>::new());
        assert_eq!(summary.sales_count, 0);
        assert_eq!(summary.average_ticket, Money::zero());
        assert_eq!(summary.by_payment_method.len(), 3);
        assert!(summary.top_products.is_empty());
    }

    #[test]
    fn test_summary_skips_cancelled() {
        let sales = vec![
            sale(PaymentMethod::Cash, SaleStatus::Completed, &[("Pan", 2, 500)]),
            sale(PaymentMethod::Card, SaleStatus::Completed, &[("Leche", 1, 950), ("Pan", 1, 500)]),
            sale(PaymentMethod::Cash, SaleStatus::Cancelled, &[("Pan", 10, 500)]),
        ];

        let summary = SalesSummary::from_sales(&sales);
        assert_eq!(summary.sales_count, 2);
        assert_eq!(summary.total_amount, Money::from_cents(2450));
        assert_eq!(summary.units_sold, 4);
        assert_eq!(summary.average_ticket, Money::from_cents(1225));

        let cash = &summary.by_payment_method[0];
        assert_eq!(cash.method, Some(PaymentMethod::Cash));
        assert_eq!((cash.count, cash.total), (1, Money::from_cents(1000)));
        let transfer = &summary.by_payment_method[1];
        assert_eq!(transfer.count, 0);

        assert_eq!(summary.top_products[0].name, "Pan");
        assert_eq!(summary.top_products[0].quantity, 3);
        assert_eq!(summary.top_products[0].revenue, Money::from_cents(1500));
    }

    #[test]
    fn test_top_products_limit_and_ties() {
        let sales = vec![sale(
            PaymentMethod::Transfer,
            SaleStatus::Completed,
            &[("F", 1, 1), ("E", 1, 1), ("D", 2, 1), ("C", 1, 1), ("B", 1, 1), ("A", 1, 1)],
        )];

        let names: Vec<String> = SalesSummary::from_sales(&sales)
            .top_products
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["D", "A", "B", "C", "E"]);
    }

    #[test]
    fn test_period_since() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let now = DateTime::parse_from_rfc3339("2026-10-19T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(
            SummaryPeriod::Today.since(now, offset).to_rfc3339(),
            "2026-10-19T03:00:00+00:00"
        );
        assert_eq!(SummaryPeriod::Week.since(now, offset), now - Duration::days(7));
        assert_eq!(
            SummaryPeriod::Month.since(now, offset).to_rfc3339(),
            "2026-09-19T15:00:00+00:00"
        );
        assert_eq!("week".parse::<SummaryPeriod>().unwrap(), SummaryPeriod::Week);
        assert!("year".parse::<SummaryPeriod>().is_err());
    }
}
