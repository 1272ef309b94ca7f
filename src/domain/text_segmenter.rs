//! 文本分割器
//!
//! 将生成的冥想文本按句末标点切分为高亮片段

/// 检查是否为句末标点
#[inline]
fn is_sentence_end(ch: char) -> bool {
    matches!(ch, '.' | '?' | '!')
}

/// 对文本进行分句
///
/// 分割策略：
/// 1. 句末标点（`.` `!` `?`）后紧跟空白时切分，标点保留在前一句
/// 2. 标点后没有空白不切分（如 "3.5"、"a.m."）
/// 3. 片段去除首尾空白，空片段丢弃
pub fn split_into_segments(text: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        if ch.is_whitespace() && prev.map(is_sentence_end).unwrap_or(false) {
            push_trimmed(&mut segments, &current);
            current.clear();
        }
        current.push(ch);
        prev = Some(ch);
    }

    // 剩余内容
    push_trimmed(&mut segments, &current);
    segments
}

fn push_trimmed(segments: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}
