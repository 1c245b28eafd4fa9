// kb-core/src/extract.rs
//! 元数据提取模块
//!
//! 笔记按行解析，识别以下指令（均只取第一次出现）：
//!
//! ```text
//! heading  := "#" WS+ TEXT        一级标题，作为 title
//! tag      := "Tag:" ( "#" TOKEN | 其他 )*
//! category := "Category:" TEXT    追加为一个标签
//! ```
//!
//! 任何字段缺失或格式不对都回退到默认值，不会报错。

use std::path::Path;

use chardetng::EncodingDetector;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{KbError, Result};
use crate::models::NoteMetadata;

const TAG_PREFIX: &str = "Tag:";
const CATEGORY_PREFIX: &str = "Category:";

/// `#` 后跟非 `#`、非空白字符
static TAG_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([^#\s]+)").expect("valid tag pattern"));

/// 解析笔记内容，`rel_path` 为相对根目录、以 `/` 分隔的路径
pub fn parse_note(content: &str, rel_path: &str, uncategorized: &str) -> NoteMetadata {
    let mut title = None;
    let mut tag_line = None;
    let mut category_line = None;

    for line in content.lines() {
        if title.is_none() {
            title = heading_text(line);
        }
        if tag_line.is_none() {
            tag_line = line.strip_prefix(TAG_PREFIX);
        }
        if category_line.is_none() {
            category_line = line.strip_prefix(CATEGORY_PREFIX);
        }
        if title.is_some() && tag_line.is_some() && category_line.is_some() {
            break;
        }
    }

    let mut tags: Vec<String> = Vec::new();
    if let Some(rest) = tag_line {
        for cap in TAG_TOKEN.captures_iter(rest) {
            push_unique(&mut tags, &cap[1]);
        }
    }
    if let Some(rest) = category_line {
        let value = rest.trim();
        if !value.is_empty() {
            push_unique(&mut tags, value);
        }
    }

    NoteMetadata {
        title: title.unwrap_or_else(|| title_from_path(rel_path)),
        tags,
        category: category_for(rel_path, uncategorized),
    }
}

/// 一级标题的文本；`## x` 之类的低级标题返回 `None`
fn heading_text(line: &str) -> Option<String> {
    let rest = line.strip_prefix('#')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

/// 文件名去掉扩展名
pub fn title_from_path(rel_path: &str) -> String {
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if stem.is_empty() {
        file_name.to_string()
    } else {
        stem
    }
}

/// 第一级目录作为分类
pub fn category_for(rel_path: &str, uncategorized: &str) -> String {
    match rel_path.split_once('/') {
        Some((first, _)) if !first.is_empty() => first.to_string(),
        _ => uncategorized.to_string(),
    }
}

/// 解码文件内容，非 UTF-8 时自动检测编码
pub fn decode_text(bytes: Vec<u8>, path: &Path) -> String {
    let bytes = match String::from_utf8(bytes) {
        Ok(text) => return text,
        Err(e) => e.into_bytes(),
    };

    let mut detector = EncodingDetector::new();
    detector.feed(&bytes, true);
    let detected_encoding = detector.guess(None, true);

    tracing::debug!("检测到文件编码 {:?}: {:?}", detected_encoding.name(), path);

    let (decoded, encoding_used, had_errors) = detected_encoding.decode(&bytes);
    if had_errors {
        tracing::warn!(
            "文件 {:?} 使用 {} 解码时有部分错误，可能影响搜索准确性",
            path,
            encoding_used.name()
        );
    }
    decoded.into_owned()
}

/// 异步读取笔记文本
pub async fn read_note_text(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| KbError::io(path, e))?;
    Ok(decode_text(bytes, path))
}
