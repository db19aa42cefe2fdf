//! 回复解析：把补全服务的文本回复转成 Decision
//!
//! 期望格式：
//! ```text
//! Thought: ...
//! Action: createPage
//! Params: {"name": "home", "content": "..."}
//! Final Answer: ...（仅 finish 时）
//! ```
//! Params 可跨多行（按花括号配平，字符串内的括号不计），可被代码围栏包裹，字符串内允许裸换行。
//! JSON 解析失败时回退到正则逐字段提取。解析永不失败：无法得到可执行动作时返回 FINISH(Unparseable)。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::project::SplicePosition;
use crate::react::{Action, Decision, FinishReason};

static OBJECT_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    CreatePage,
    CreateComponent,
    UpdatePage,
    FixError,
    Finish,
}

/// 动作名归一化：忽略大小写与 `_` / `-` / 空格，`createPage` / `create_page` / `CREATE_PAGE` 等价
fn normalize_action(raw: &str) -> Option<ActionKind> {
    let cleaned: String = raw
        .trim()
        .trim_matches(|c| c == '`' || c == '*' || c == '"' || c == '\'')
        .trim_end_matches("()")
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    match cleaned.as_str() {
        "createpage" => Some(ActionKind::CreatePage),
        "createcomponent" => Some(ActionKind::CreateComponent),
        "updatepage" => Some(ActionKind::UpdatePage),
        "fixerror" => Some(ActionKind::FixError),
        "finish" => Some(ActionKind::Finish),
        _ => None,
    }
}

/// 字符串感知的花括号计数
#[derive(Debug, Default)]
struct BraceScanner {
    depth: usize,
    in_string: bool,
    escaped: bool,
    opened: bool,
}

impl BraceScanner {
    /// 喂入一段文本；返回该段内对象闭合处的字节偏移（含 `}`）
    fn feed(&mut self, text: &str) -> Option<usize> {
        for (i, c) in text.char_indices() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' if self.opened => self.in_string = true,
                '{' => {
                    self.opened = true;
                    self.depth += 1;
                }
                '}' if self.opened => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// 从文本中截出第一个完整的 JSON 对象（字符串感知）；未闭合时返回从 `{` 起的剩余部分
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let rest = &text[start..];
    let mut scanner = BraceScanner::default();
    match scanner.feed(rest) {
        Some(end) => Some(&rest[..end]),
        None => Some(rest),
    }
}

/// 把字符串字面量内的裸换行 / 回车 / 制表符转义，使其成为合法 JSON
fn repair_raw_newlines(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

fn parse_params_json(buffer: &str) -> Option<Map<String, Value>> {
    let object = extract_object(buffer)?;
    let parsed = serde_json::from_str::<Value>(object)
        .ok()
        .or_else(|| serde_json::from_str::<Value>(&repair_raw_newlines(object)).ok())?;
    match parsed {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// 反转义 JSON 字符串片段（\n \t \r \" \\ \/ \uXXXX）
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// 正则回退：先找同时含 name / content 的扁平对象，再逐字段提取
fn regex_fallback(text: &str) -> Map<String, Value> {
    let object_re = OBJECT_RE
        .get_or_init(|| Regex::new(r#"(?s)\{[^{}]*"name"[^{}]*"content"[^{}]*\}"#).unwrap());
    if let Some(m) = object_re.find(text) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(m.as_str()) {
            return map;
        }
    }

    let mut map = Map::new();
    for key in ["name", "filePath", "content", "section", "position", "fix"] {
        let pattern = format!(r#"(?s)"{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(key));
        let Ok(re) = Regex::new(&pattern) else { continue };
        if let Some(value) = re.captures(text).and_then(|c| c.get(1)) {
            map.insert(key.to_string(), Value::String(unescape(value.as_str())));
        }
    }
    map
}

/// 取第一个存在且非空的字符串字段
fn field(params: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| params.get(*k).and_then(Value::as_str))
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn build_action(kind: ActionKind, params: &Map<String, Value>) -> Option<Action> {
    match kind {
        ActionKind::CreatePage => Some(Action::CreatePage {
            name: field(params, &["name"])?,
            content: field(params, &["content"])?,
        }),
        ActionKind::CreateComponent => Some(Action::CreateComponent {
            name: field(params, &["name"])?,
            content: field(params, &["content"])?,
        }),
        ActionKind::UpdatePage => Some(Action::UpdatePage {
            name: field(params, &["name"])?,
            section: field(params, &["section", "content"])?,
            position: field(params, &["position"])
                .map(|p| SplicePosition::parse_lenient(&p))
                .unwrap_or_default(),
        }),
        ActionKind::FixError => Some(Action::FixError {
            target: field(params, &["name", "filePath"])?,
            fix: field(params, &["content", "fix"])?,
        }),
        ActionKind::Finish => None,
    }
}

/// 解析一条回复为 Decision（永不失败）
pub fn parse_decision(text: &str) -> Decision {
    let mut thought = String::new();
    let mut action_raw: Option<String> = None;
    let mut params: Option<Map<String, Value>> = None;
    let mut final_answer: Option<String> = None;

    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if let Some(rest) = line.strip_prefix("Thought:") {
            thought = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Action:") {
            action_raw = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Params:") {
            let mut scanner = BraceScanner::default();
            let mut buffer = rest.trim().to_string();
            let mut closed = scanner.feed(&buffer).is_some();
            while !closed && i + 1 < lines.len() {
                i += 1;
                let next = lines[i];
                if next.trim_start().starts_with("```") {
                    continue;
                }
                buffer.push('\n');
                closed = scanner.feed(next).is_some();
                buffer.push_str(next);
            }
            params = parse_params_json(&buffer);
        } else if let Some(rest) = line.strip_prefix("Final Answer:") {
            final_answer = Some(rest.trim().to_string());
        }
        i += 1;
    }

    let Some(raw) = action_raw.filter(|a| !a.is_empty()) else {
        tracing::warn!("reply has no Action line");
        return Decision::finish(
            thought,
            "Error: Could not determine the next action from the response",
            FinishReason::Unparseable,
        );
    };

    let Some(kind) = normalize_action(&raw) else {
        tracing::warn!(action = %raw, "unknown action in reply");
        return Decision::finish(thought, format!("Error: Unknown action '{}'", raw), FinishReason::Unparseable);
    };

    if kind == ActionKind::Finish {
        let answer = final_answer
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| thought.clone());
        return Decision::finish(thought, answer, FinishReason::Declared);
    }

    let mut fields = params.unwrap_or_default();
    let mut action = build_action(kind, &fields);
    if action.is_none() {
        for (key, value) in regex_fallback(text) {
            fields.entry(key).or_insert(value);
        }
        action = build_action(kind, &fields);
    }

    match action {
        Some(action) => Decision { thought, action },
        None => {
            tracing::warn!(action = %raw, "could not parse required parameters");
            Decision::finish(
                thought,
                format!("Error: Could not parse required parameters for '{}' from the response", raw),
                FinishReason::Unparseable,
            )
        }
    }
}
