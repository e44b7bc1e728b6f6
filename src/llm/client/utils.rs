/// 从模型输出中提取JSON对象文本
///
/// 兼容 ```json 代码块以及JSON前后夹带说明文字的情况。
pub fn extract_json_object(text: &str) -> Option<&str> {
    let body = strip_code_fence(text.trim());
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // 跳过语言标识行
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
