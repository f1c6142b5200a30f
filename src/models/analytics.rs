use indexmap::IndexMap;
use serde::Serialize;

/// 单一商品描述的累计购买数量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemCount {
    pub item: String,
    pub quantity: f64,
}

/// 按供应商聚合的消费概览 (派生数据, 不落库, 每次加载重算)
#[derive(Debug, Clone, Serialize)]
pub struct VendorSummary {
    pub total_spent: f64,
    pub invoice_count: usize,
    pub average_invoice: f64,
    /// 按累计数量降序取前 3, 并列时保持首次出现顺序
    pub most_purchased_items: Vec<ItemCount>,
}

/// 月度消费时间序列点
/// month 仅为展示字符串 ("Jan 2025"), 内部桶键为 (年, 月)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub total: f64,
}

/// 全量分析报表
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub total_spent: f64,
    pub invoice_count: usize,
    pub average_invoice: f64,
    pub unique_vendors: usize,
    pub vendors: IndexMap<String, VendorSummary>,
    pub monthly: Vec<MonthlyPoint>,
}

/// 消费洞察卡片
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub title: String,
    pub value: String,
    pub description: String,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}
