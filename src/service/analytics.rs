use crate::models::{
    AnalyticsReport, Insight, InvoiceRecord, ItemCount, MonthlyPoint, Trend, VendorSummary,
};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;

/// 按供应商精确字符串分组聚合
/// 不做模糊归一: 同一公司的不同拼写视为不同供应商 (已知限制)
pub fn vendor_summaries(records: &[InvoiceRecord]) -> IndexMap<String, VendorSummary> {
    let mut stats: IndexMap<String, VendorSummary> = IndexMap::new();
    // 每个供应商按商品描述跨发票累计购买数量
    let mut item_counts: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();

    for record in records {
        let entry = stats
            .entry(record.vendor.clone())
            .or_insert_with(|| VendorSummary {
                total_spent: 0.0,
                invoice_count: 0,
                average_invoice: 0.0,
                most_purchased_items: Vec::new(),
            });
        entry.total_spent += record.total_amount;
        entry.invoice_count += 1;

        let counts = item_counts.entry(record.vendor.clone()).or_default();
        for item in record.items.iter() {
            *counts.entry(item.description.clone()).or_insert(0.0) += item.quantity;
        }
    }

    for (vendor, summary) in stats.iter_mut() {
        // 分组只由既有记录构成, invoice_count 恒 >= 1
        summary.average_invoice = summary.total_spent / summary.invoice_count as f64;

        if let Some(counts) = item_counts.get(vendor) {
            let mut ranked: Vec<ItemCount> = counts
                .iter()
                .map(|(item, quantity)| ItemCount {
                    item: item.clone(),
                    quantity: *quantity,
                })
                .collect();
            // 稳定排序: 数量并列时保持首次出现顺序
            ranked.sort_by(|a, b| {
                b.quantity
                    .partial_cmp(&a.quantity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            ranked.truncate(3);
            summary.most_purchased_items = ranked;
        }
    }

    stats
}

/// 月度时间序列. 桶键是 (年, 月) 而非展示字符串,
/// 跨年时仍按时间顺序输出, 展示层才格式化为 "Jan 2025"
pub fn monthly_series(records: &[InvoiceRecord]) -> Vec<MonthlyPoint> {
    let mut buckets: IndexMap<(i32, u32), f64> = IndexMap::new();
    for record in records {
        *buckets
            .entry((record.date.year(), record.date.month()))
            .or_insert(0.0) += record.total_amount;
    }
    buckets.sort_keys();

    buckets
        .into_iter()
        .map(|((year, month), total)| MonthlyPoint {
            month: NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b %Y").to_string())
                .unwrap_or_default(),
            total,
        })
        .collect()
}

/// 全量分析报表: 简单归约, 每次加载全部重算, 无增量无缓存
pub fn report(records: &[InvoiceRecord]) -> AnalyticsReport {
    let total_spent: f64 = records.iter().map(|r| r.total_amount).sum();
    let invoice_count = records.len();
    let average_invoice = if invoice_count == 0 {
        0.0
    } else {
        total_spent / invoice_count as f64
    };

    let vendors = vendor_summaries(records);
    AnalyticsReport {
        total_spent,
        invoice_count,
        average_invoice,
        unique_vendors: vendors.len(),
        monthly: monthly_series(records),
        vendors,
    }
}

/// 消费洞察: 最近一笔消费, 以及最近两个月度桶的环比变化
pub fn insights(records_desc: &[InvoiceRecord]) -> Vec<Insight> {
    let mut out = Vec::new();

    if let Some(latest) = records_desc.first() {
        out.push(Insight {
            title: "Latest Purchase".to_string(),
            value: format!("${:.2}", latest.total_amount),
            description: format!("From {}", latest.vendor),
            trend: Trend::Neutral,
        });
    }

    // monthly_series 自身按桶键排序, 接受降序输入
    let monthly = monthly_series(records_desc);
    if monthly.len() >= 2 {
        let this_month = monthly[monthly.len() - 1].total;
        let last_month = monthly[monthly.len() - 2].total;
        if last_month != 0.0 {
            let change = (this_month - last_month) / last_month * 100.0;
            out.push(Insight {
                title: "Monthly Change".to_string(),
                value: format!("{:.1}%", change.abs()),
                description: if change >= 0.0 {
                    "Increase from last month".to_string()
                } else {
                    "Decrease from last month".to_string()
                },
                trend: if change >= 0.0 { Trend::Up } else { Trend::Down },
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use sqlx::types::Json;

    fn item(description: &str, quantity: f64) -> LineItem {
        LineItem {
            description: description.to_string(),
            quantity,
            unit_price: 1.0,
            total: quantity,
        }
    }

    fn record(vendor: &str, total: f64, date: &str, items: Vec<LineItem>) -> InvoiceRecord {
        InvoiceRecord {
            id: 0,
            vendor: vendor.to_string(),
            items: Json(items),
            total_amount: total,
            date: date.parse().unwrap(),
        }
    }

    #[test]
    fn vendor_totals_counts_and_average() {
        let records = vec![
            record("Acme", 10.0, "2025-01-05T10:00:00Z", vec![]),
            record("Acme", 20.0, "2025-01-20T10:00:00Z", vec![]),
        ];

        let stats = vendor_summaries(&records);
        let acme = &stats["Acme"];
        assert_eq!(acme.total_spent, 30.0);
        assert_eq!(acme.invoice_count, 2);
        assert_eq!(acme.average_invoice, 15.0);
    }

    #[test]
    fn most_purchased_items_accumulate_across_invoices() {
        let records = vec![
            record("Acme", 5.0, "2025-01-05T10:00:00Z", vec![item("Pen", 5.0)]),
            record(
                "Acme",
                4.0,
                "2025-02-05T10:00:00Z",
                vec![item("Pen", 3.0), item("Cup", 1.0)],
            ),
        ];

        let stats = vendor_summaries(&records);
        let top = &stats["Acme"].most_purchased_items;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], ItemCount { item: "Pen".into(), quantity: 8.0 });
        assert_eq!(top[1], ItemCount { item: "Cup".into(), quantity: 1.0 });
    }

    #[test]
    fn most_purchased_items_keep_top_three_only() {
        let records = vec![record(
            "Acme",
            10.0,
            "2025-01-05T10:00:00Z",
            vec![
                item("A", 1.0),
                item("B", 4.0),
                item("C", 2.0),
                item("D", 3.0),
            ],
        )];

        let top = &vendor_summaries(&records)["Acme"].most_purchased_items;
        let names: Vec<&str> = top.iter().map(|i| i.item.as_str()).collect();
        assert_eq!(names, ["B", "D", "C"]);
    }

    #[test]
    fn tied_quantities_keep_first_encountered_order() {
        let records = vec![record(
            "Acme",
            10.0,
            "2025-01-05T10:00:00Z",
            vec![item("Zeta", 2.0), item("Alpha", 2.0)],
        )];

        let top = &vendor_summaries(&records)["Acme"].most_purchased_items;
        assert_eq!(top[0].item, "Zeta");
        assert_eq!(top[1].item, "Alpha");
    }

    #[test]
    fn monthly_buckets_stay_chronological_across_year_boundary() {
        // 字符串键会把 "Dec 2024" 排到 "Jan 2025" 之后; 桶键是 (年, 月)
        let records = vec![
            record("Acme", 30.0, "2025-01-10T10:00:00Z", vec![]),
            record("Acme", 10.0, "2024-12-05T10:00:00Z", vec![]),
            record("Acme", 5.0, "2024-12-20T10:00:00Z", vec![]),
        ];

        let series = monthly_series(&records);
        assert_eq!(
            series,
            vec![
                MonthlyPoint { month: "Dec 2024".into(), total: 15.0 },
                MonthlyPoint { month: "Jan 2025".into(), total: 30.0 },
            ]
        );
    }

    #[test]
    fn empty_collection_yields_zeroed_report_without_nan() {
        let report = report(&[]);
        assert_eq!(report.invoice_count, 0);
        assert_eq!(report.total_spent, 0.0);
        assert_eq!(report.average_invoice, 0.0);
        assert!(report.vendors.is_empty());
        assert!(report.monthly.is_empty());
    }

    #[test]
    fn report_global_reductions() {
        let records = vec![
            record("Acme", 10.0, "2025-01-05T10:00:00Z", vec![]),
            record("Globex", 30.0, "2025-01-06T10:00:00Z", vec![]),
        ];

        let report = report(&records);
        assert_eq!(report.total_spent, 40.0);
        assert_eq!(report.average_invoice, 20.0);
        assert_eq!(report.unique_vendors, 2);
    }

    #[test]
    fn insights_latest_purchase_and_monthly_change() {
        // 降序输入, 如浏览端点返回
        let records = vec![
            record("Globex", 30.0, "2025-02-10T10:00:00Z", vec![]),
            record("Acme", 20.0, "2025-01-05T10:00:00Z", vec![]),
        ];

        let out = insights(&records);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Latest Purchase");
        assert_eq!(out[0].value, "$30.00");
        assert_eq!(out[0].description, "From Globex");

        assert_eq!(out[1].title, "Monthly Change");
        assert_eq!(out[1].value, "50.0%");
        assert_eq!(out[1].trend, Trend::Up);
    }

    #[test]
    fn insights_empty_collection_is_empty() {
        assert!(insights(&[]).is_empty());
    }
}
