use crate::error::AppError;
use crate::models::InvoiceDraft;

/// 去掉三反引号围栏并修剪空白
/// 开栏行整行吞掉, 语言标记 (json, jsonc ...) 不会残留进载荷;
/// 开栏行上已出现 '{' 时视为载荷本身, 不吞
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = match trimmed.strip_prefix("```") {
        Some(rest) => match rest.split_once('\n') {
            Some((tag, body)) if !tag.contains('{') => body,
            _ => rest,
        },
        None => trimmed,
    };
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

/// 单引号替换为双引号. 尽力而为的 JSON 修复,
/// 会破坏内嵌撇号, 因此只作严格解析失败后的兜底
fn repair_quotes(text: &str) -> String {
    text.replace('\'', "\"")
}

/// 模型原始文本 -> 结构化发票草稿
///
/// 严格 serde 解码优先 (字段类型校验, 缺失字段取默认值);
/// 失败后才走引号修复重试; 两者都失败时返回携带原始文本的
/// 归一化错误, 绝不 panic 到请求处理器
pub fn parse_model_output(raw: &str) -> Result<InvoiceDraft, AppError> {
    let cleaned = strip_code_fences(raw);

    serde_json::from_str::<InvoiceDraft>(cleaned)
        .or_else(|_| serde_json::from_str::<InvoiceDraft>(&repair_quotes(cleaned)))
        .map_err(|e| AppError::Normalize {
            reason: e.to_string(),
            raw: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_single_quoted_output_is_repaired() {
        let raw = "```json\n{'vendor':'Acme','items':[],'total_amount':0}\n```";
        let draft = parse_model_output(raw).unwrap();
        assert_eq!(draft.vendor, "Acme");
        assert!(draft.items.is_empty());
        assert_eq!(draft.total_amount, 0.0);
    }

    #[test]
    fn plain_json_needs_no_repair() {
        let raw = r#"{"vendor":"Globex","items":[{"description":"Widget","quantity":2,"unit_price":5.0,"total":10.0}],"total_amount":10.0}"#;
        let draft = parse_model_output(raw).unwrap();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].description, "Widget");
        assert_eq!(draft.total_amount, 10.0);
    }

    #[test]
    fn fence_language_tag_is_consumed_whole() {
        // "jsonc" 这类标记必须整体吞掉, 不能残留尾字符到载荷里
        let raw = "```jsonc\n{\"vendor\":\"Acme\",\"items\":[],\"total_amount\":1.0}\n```";
        let draft = parse_model_output(raw).unwrap();
        assert_eq!(draft.vendor, "Acme");
        assert_eq!(draft.total_amount, 1.0);
    }

    #[test]
    fn payload_on_the_fence_line_is_kept() {
        let raw = "```{\"vendor\":\"Acme\",\"items\":[],\"total_amount\":2.0}```";
        let draft = parse_model_output(raw).unwrap();
        assert_eq!(draft.total_amount, 2.0);
    }

    #[test]
    fn fence_without_language_tag_is_stripped() {
        let raw = "```\n{\"vendor\":\"Acme\",\"items\":[],\"total_amount\":3.5}\n```";
        let draft = parse_model_output(raw).unwrap();
        assert_eq!(draft.total_amount, 3.5);
    }

    #[test]
    fn strict_path_preserves_embedded_apostrophes() {
        // 合法 JSON 里的撇号不能被修复启发式破坏
        let raw = r#"{"vendor":"O'Reilly Supplies","items":[],"total_amount":12.5}"#;
        let draft = parse_model_output(raw).unwrap();
        assert_eq!(draft.vendor, "O'Reilly Supplies");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let draft = parse_model_output(r#"{"vendor":"Acme"}"#).unwrap();
        assert!(draft.items.is_empty());
        assert_eq!(draft.total_amount, 0.0);
    }

    #[test]
    fn prose_output_is_a_typed_failure_with_raw_text() {
        let raw = "Sorry, I cannot read this invoice.";
        match parse_model_output(raw) {
            Err(AppError::Normalize { raw: carried, .. }) => assert_eq!(carried, raw),
            other => panic!("expected normalize error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        let raw = r#"{"vendor":"Acme","items":"none","total_amount":0}"#;
        assert!(parse_model_output(raw).is_err());
    }
}
