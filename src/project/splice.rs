//! 页面片段拼接
//!
//! 纯文本拼接：按第一个 `>` / 最后一个 `</` 定位，不做结构化的标记解析。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::project::ArtifactError;

/// 片段插入位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplicePosition {
    /// 插入到最后一个闭合标签之前
    #[default]
    BeforeClosing,
    /// 插入到第一个开标签的 `>` 之后
    AfterOpening,
    /// 整体替换
    Replace,
    /// 追加到末尾
    Append,
}

impl SplicePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplicePosition::BeforeClosing => "before_closing",
            SplicePosition::AfterOpening => "after_opening",
            SplicePosition::Replace => "replace",
            SplicePosition::Append => "append",
        }
    }

    /// 宽松解析：未知取值按 append 处理
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(SplicePosition::Append)
    }
}

impl fmt::Display for SplicePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplicePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "before_closing" => Ok(SplicePosition::BeforeClosing),
            "after_opening" => Ok(SplicePosition::AfterOpening),
            "replace" => Ok(SplicePosition::Replace),
            "append" => Ok(SplicePosition::Append),
            other => Err(format!("unknown splice position: {other}")),
        }
    }
}

/// 将 section 拼接到 existing 的指定位置，插入的片段前后各补一个换行
pub fn splice(existing: &str, section: &str, position: SplicePosition) -> Result<String, ArtifactError> {
    match position {
        SplicePosition::BeforeClosing => {
            let idx = existing
                .rfind("</")
                .filter(|&i| i > 0)
                .ok_or(ArtifactError::NoClosingTag)?;
            Ok(format!(
                "{}\n{}\n{}",
                &existing[..idx],
                section,
                &existing[idx..]
            ))
        }
        SplicePosition::AfterOpening => {
            let idx = existing
                .find('>')
                .filter(|&i| i > 0)
                .ok_or(ArtifactError::NoOpeningTag)?;
            Ok(format!(
                "{}\n{}\n{}",
                &existing[..=idx],
                section,
                &existing[idx + 1..]
            ))
        }
        SplicePosition::Replace => Ok(section.to_string()),
        SplicePosition::Append => Ok(format!("{}\n{}", existing, section)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_closing_lands_before_final_tag() {
        let out = splice("<div>A</div>", "<section>X</section>", SplicePosition::BeforeClosing).unwrap();
        assert_eq!(out, "<div>A\n<section>X</section>\n</div>");
        let x = out.find("X").unwrap();
        assert!(x < out.rfind("</div>").unwrap());
        assert!(out.contains('A'));
    }

    #[test]
    fn test_after_opening() {
        let out = splice("<main><p>old</p></main>", "<h1>new</h1>", SplicePosition::AfterOpening).unwrap();
        assert_eq!(out, "<main>\n<h1>new</h1>\n<p>old</p></main>");
    }

    #[test]
    fn test_replace_and_append() {
        assert_eq!(splice("old", "new", SplicePosition::Replace).unwrap(), "new");
        assert_eq!(splice("old", "new", SplicePosition::Append).unwrap(), "old\nnew");
    }

    #[test]
    fn test_missing_delimiters() {
        assert!(matches!(
            splice("plain text", "x", SplicePosition::BeforeClosing),
            Err(ArtifactError::NoClosingTag)
        ));
        assert!(matches!(
            splice("</only>", "x", SplicePosition::BeforeClosing),
            Err(ArtifactError::NoClosingTag)
        ));
        assert!(matches!(
            splice("no tags", "x", SplicePosition::AfterOpening),
            Err(ArtifactError::NoOpeningTag)
        ));
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!("before-closing".parse::<SplicePosition>(), Ok(SplicePosition::BeforeClosing));
        assert_eq!(SplicePosition::parse_lenient("AFTER_OPENING"), SplicePosition::AfterOpening);
        assert_eq!(SplicePosition::parse_lenient("somewhere"), SplicePosition::Append);
    }
}
