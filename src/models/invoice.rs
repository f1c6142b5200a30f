use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// 发票明细行. total 由编辑侧重算 (数量 × 单价), 库侧不强制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub total: f64,
}

/// 待确认的发票草稿 (模型抽取结果, 确认前由用户编辑)
/// 字段类型严格校验, 缺失字段取默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total_amount: f64,
}

/// 已入库的发票记录 (只追加: 确认后不更新不删除)
/// date 为确认时刻, 而非发票票面日期
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: i64,
    pub vendor: String,
    pub items: Json<Vec<LineItem>>,
    pub total_amount: f64,
    pub date: DateTime<Utc>,
}
