use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use invoice_ledger_rust::{
    api, create_pool, db, AppConfig, ChatCompletionsBackend, ExtractionPipeline, LedgerService,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置 (密钥不打印)
    let config = AppConfig::from_env();
    info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.vision.model,
        "Starting server"
    );

    // 创建数据库连接池并确保 invoices 集合存在
    let pool = create_pool(&config.database.url).await?;
    db::init_schema(&pool).await?;
    info!("Database pool created, invoices schema ensured");

    // 进程级单例: 抽取管线与台账服务, 句柄显式传入各路由
    let pipeline = Arc::new(ExtractionPipeline::new(Box::new(
        ChatCompletionsBackend::new(config.vision.clone()),
    )));
    let ledger = Arc::new(LedgerService::new(pool));

    // 抽取路由 (multipart 上传, 限 10MB)
    let extraction_routes = Router::new()
        .route("/api/invoices/extract", post(api::extract_invoice))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(pipeline);

    // 台账与分析路由
    let ledger_routes = Router::new()
        .route(
            "/api/invoices",
            post(api::confirm_invoice).get(api::list_invoices),
        )
        .route("/api/invoices/export", get(api::export_invoices))
        .route("/api/analytics", get(api::analytics_report))
        .route("/api/insights", get(api::expense_insights))
        .with_state(ledger);

    // 合并路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(extraction_routes)
        .merge(ledger_routes)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/invoices/extract  - upload & extract editable draft");
    info!("  POST /api/invoices          - confirm draft (append-only)");
    info!("  GET  /api/invoices          - browse all (order=asc|desc)");
    info!("  GET  /api/invoices/export   - CSV export");
    info!("  GET  /api/analytics         - spend analytics");
    info!("  GET  /api/insights          - expense insights");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
