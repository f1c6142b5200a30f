use crate::error::AppError;
use crate::models::{InvoiceRecord, LineItem};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

/// 确保 invoices 集合存在 (幂等建表, 不是迁移系统)
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id           BIGSERIAL PRIMARY KEY,
            vendor       TEXT NOT NULL,
            items        JSONB NOT NULL,
            total_amount DOUBLE PRECISION NOT NULL,
            date         TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// 全量读取的排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// 时间升序 (分析时间序列用)
    Ascending,
    /// 时间降序 (浏览最新优先)
    Descending,
}

/// 写入一条发票记录, id 由库生成, 返回落库后的完整记录
pub async fn insert_invoice(
    pool: &PgPool,
    vendor: &str,
    items: &[LineItem],
    total_amount: f64,
    date: DateTime<Utc>,
) -> Result<InvoiceRecord, sqlx::Error> {
    let query = sqlx::query_as::<_, InvoiceRecord>(
        r#"
        INSERT INTO invoices (vendor, items, total_amount, date)
        VALUES ($1, $2, $3, $4)
        RETURNING id, vendor, items, total_amount, date
        "#,
    )
    .bind(vendor)
    .bind(Json(items))
    .bind(total_amount)
    .bind(date);

    // 添加超时控制: 30秒
    let execute_result = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        query.fetch_one(pool),
    )
    .await;

    match execute_result {
        Ok(Ok(record)) => {
            tracing::debug!(id = record.id, "invoice row inserted");
            Ok(record)
        }
        Ok(Err(e)) => {
            tracing::error!(error = ?e, "invoice insert failed");
            Err(e)
        }
        Err(_) => {
            tracing::error!("invoice insert timed out (>30s)");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// 全量读取发票记录, 按 date 排序
/// 不分页不过滤, 过滤发生在调用方内存中
pub async fn list_invoices(
    pool: &PgPool,
    order: SortOrder,
) -> Result<Vec<InvoiceRecord>, sqlx::Error> {
    let sql = match order {
        SortOrder::Ascending => {
            r#"
            SELECT id, vendor, items, total_amount, date
            FROM invoices
            ORDER BY date ASC
            "#
        }
        SortOrder::Descending => {
            r#"
            SELECT id, vendor, items, total_amount, date
            FROM invoices
            ORDER BY date DESC
            "#
        }
    };

    sqlx::query_as::<_, InvoiceRecord>(sql).fetch_all(pool).await
}

/// 导出发票到 CSV (每条明细一行, 发票字段随行重复)
pub fn export_to_csv(records: &[InvoiceRecord]) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record([
            "id",
            "vendor",
            "date",
            "total_amount",
            "item_description",
            "item_quantity",
            "item_unit_price",
            "item_total",
        ])?;

        for record in records {
            if record.items.is_empty() {
                writer.write_record([
                    record.id.to_string(),
                    record.vendor.clone(),
                    record.date.to_rfc3339(),
                    record.total_amount.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ])?;
                continue;
            }
            for item in record.items.iter() {
                writer.write_record([
                    record.id.to_string(),
                    record.vendor.clone(),
                    record.date.to_rfc3339(),
                    record.total_amount.to_string(),
                    item.description.clone(),
                    item.quantity.to_string(),
                    item.unit_price.to_string(),
                    item.total.to_string(),
                ])?;
            }
        }
        writer.flush()?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, vendor: &str, total: f64, items: Vec<LineItem>) -> InvoiceRecord {
        InvoiceRecord {
            id,
            vendor: vendor.to_string(),
            items: Json(items),
            total_amount: total,
            date: "2025-03-01T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn csv_export_repeats_invoice_fields_per_item() {
        let records = vec![record(
            1,
            "Acme",
            12.0,
            vec![
                LineItem {
                    description: "Pen".into(),
                    quantity: 2.0,
                    unit_price: 1.5,
                    total: 3.0,
                },
                LineItem {
                    description: "Cup".into(),
                    quantity: 3.0,
                    unit_price: 3.0,
                    total: 9.0,
                },
            ],
        )];

        let csv = String::from_utf8(export_to_csv(&records).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,Acme,"));
        assert!(lines[1].ends_with("Pen,2,1.5,3"));
        assert!(lines[2].ends_with("Cup,3,3,9"));
    }

    #[test]
    fn csv_export_keeps_invoices_without_items() {
        let records = vec![record(7, "Globex", 0.0, vec![])];
        let csv = String::from_utf8(export_to_csv(&records).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("7,Globex,"));
    }
}
