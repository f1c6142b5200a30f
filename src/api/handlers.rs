use crate::db::SortOrder;
use crate::error::AppError;
use crate::service::{analytics, ExtractionPipeline, LedgerService};
use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// 错误响应体. 归一化失败时附带模型原始输出
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

fn error_response(status: StatusCode, err: &AppError) -> Response {
    let body = ErrorBody {
        error: err.to_string(),
        raw_response: err.raw_response().map(str::to_string),
    };
    (status, Json(body)).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 上传并抽取: multipart 的 file 字段 -> 可编辑草稿
/// 无 file 字段返回 400, 抽取或归一化失败返回 500
pub async fn extract_invoice(
    State(pipeline): State<Arc<ExtractionPipeline>>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(Vec<u8>, String)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    match field.bytes().await {
                        Ok(bytes) => upload = Some((bytes.to_vec(), content_type)),
                        Err(e) => {
                            return error_response(
                                StatusCode::BAD_REQUEST,
                                &AppError::Multipart(e),
                            )
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &AppError::Multipart(e)),
        }
    }

    let Some((bytes, content_type)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, &AppError::MissingFile);
    };

    match pipeline.extract(&bytes, &content_type).await {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(e) => {
            error!(error = %e, "invoice extraction failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// 确认草稿入库, 返回库分配 id 与确认时间戳的完整记录
/// 失败时草稿仍在客户端, 重新确认即重试同一次写入
pub async fn confirm_invoice(
    State(ledger): State<Arc<LedgerService>>,
    Json(draft): Json<crate::models::InvoiceDraft>,
) -> Response {
    match ledger.confirm(draft).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => {
            error!(error = %e, "invoice confirmation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub order: Option<String>,
}

/// 浏览全量发票, 默认按时间降序 (最新优先)
pub async fn list_invoices(
    State(ledger): State<Arc<LedgerService>>,
    Query(params): Query<ListParams>,
) -> Response {
    let order = match params.order.as_deref() {
        Some("asc") => SortOrder::Ascending,
        _ => SortOrder::Descending,
    };

    match ledger.list(order).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!(error = %e, "invoice listing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// 消费分析报表: 全量升序加载后内存归约
pub async fn analytics_report(State(ledger): State<Arc<LedgerService>>) -> Response {
    match ledger.list(SortOrder::Ascending).await {
        Ok(records) => (StatusCode::OK, Json(analytics::report(&records))).into_response(),
        Err(e) => {
            error!(error = %e, "analytics load failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// 消费洞察卡片
pub async fn expense_insights(State(ledger): State<Arc<LedgerService>>) -> Response {
    match ledger.list(SortOrder::Descending).await {
        Ok(records) => (StatusCode::OK, Json(analytics::insights(&records))).into_response(),
        Err(e) => {
            error!(error = %e, "insights load failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// 导出全量发票 CSV
pub async fn export_invoices(State(ledger): State<Arc<LedgerService>>) -> Response {
    match ledger.export_csv().await {
        Ok(data) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv")],
            data,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "csv export failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}
