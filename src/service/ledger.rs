use crate::db::{self, SortOrder};
use crate::error::AppError;
use crate::models::{InvoiceDraft, InvoiceRecord};
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

/// 发票台账服务: 确认写入与全量读取
pub struct LedgerService {
    pool: PgPool,
}

impl LedgerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 确认草稿入库. date 取确认时刻而非票面日期 (票面日期抽取不可靠,
    /// 这是产品决策). 单次尽力写入, 无幂等键, 用户重试可能产生重复记录
    pub async fn confirm(&self, draft: InvoiceDraft) -> Result<InvoiceRecord, AppError> {
        let record = db::insert_invoice(
            &self.pool,
            &draft.vendor,
            &draft.items,
            draft.total_amount,
            Utc::now(),
        )
        .await?;
        info!(
            id = record.id,
            vendor = %record.vendor,
            total_amount = record.total_amount,
            "invoice confirmed"
        );
        Ok(record)
    }

    /// 全量读取, 按 date 排序 (分析用升序, 浏览用降序)
    pub async fn list(&self, order: SortOrder) -> Result<Vec<InvoiceRecord>, AppError> {
        Ok(db::list_invoices(&self.pool, order).await?)
    }

    /// 导出全量发票为 CSV 字节
    pub async fn export_csv(&self) -> Result<Vec<u8>, AppError> {
        let records = db::list_invoices(&self.pool, SortOrder::Descending).await?;
        db::export_to_csv(&records)
    }
}
