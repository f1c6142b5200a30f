pub mod analytics;
pub mod invoice;

pub use analytics::{AnalyticsReport, Insight, ItemCount, MonthlyPoint, Trend, VendorSummary};
pub use invoice::{InvoiceDraft, InvoiceRecord, LineItem};
