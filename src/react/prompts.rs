//! 提示词模板：推理提示（模式头 + 最近历史 + 回复格式约束）与三种规划提示

use crate::context::ProjectContext;
use crate::core::Mode;

/// FRESH：先建组件、最后建根页面、完成前自检
const FRESH_HEADER: &str = r#"Create a Next.js 14 project from scratch.

Tools:
1. createPage(name, content) - create a page
   - Use name="home" for the main landing page (app/page.js)
   - Use name="about", "contact", ... for other pages (app/<name>/page.js)
2. createComponent(name, content) - create a reusable component (components/<Name>.js)

EXECUTION ORDER:
1. Create ALL components the site needs first (Header, Hero, Features, Footer, ...)
2. Then create the home page with name="home", importing and using every component
3. Then create any other requested pages

RULES:
- Import components as: import ComponentName from '../components/ComponentName'
- Add "use client" to files that use hooks or interactivity
- Style with Tailwind CSS
- Every file exports a default function and is complete (no placeholders)
"#;

/// MODIFY：优先增量 updatePage，依赖先于使用创建
const MODIFY_HEADER: &str = r#"Modify an existing Next.js 14 project.

Tools:
1. createPage(name, content) - REPLACE a whole page (name="home" is app/page.js)
2. updatePage(name, section, position) - ADD a section to an existing page
   - position: "before_closing", "after_opening", "replace" or "append"
3. createComponent(name, content) - create or replace a component
4. fixError(name, content) - append a fix to a project file; name is the file path (e.g. "app/page.js")

WHEN TO USE EACH TOOL:
- updatePage for adding sections (testimonials, features, CTA, ...), so existing content is kept
- createPage only for a complete redesign of a page
- createComponent for reusable pieces

RULES:
- Create components BEFORE pages use them
- Import components as: import ComponentName from '../components/ComponentName'
- Add "use client" to files that use hooks or interactivity
"#;

/// 回复格式约束（解析器依赖这里的前缀）
pub const RESPONSE_DIRECTIVE: &str = r#"
Response format:

Thought: [your reasoning]
Action: [createPage|createComponent|updatePage|fixError|finish]
Params: {"name": "...", "content": "code with \n for newlines"}
Final Answer: [only when Action is finish]

FORMATTING RULES:
1. Params is valid JSON on ONE line
2. Escape newlines as \n and quotes as \"
3. No markdown code blocks
4. createPage / createComponent need "name" and "content"; updatePage needs "name" and "section"

BEFORE FINISHING:
- The home page (name="home") exists and is complete, not a placeholder
- The home page imports and uses the components it needs
- Only answer finish when the request is fully implemented

Respond now:"#;

/// 推理提示：模式头 + 请求 + 最近历史 + 回复格式
pub fn reasoning_prompt(instruction: &str, mode: Mode, recent_history: &str) -> String {
    let header = match mode {
        Mode::Fresh => FRESH_HEADER,
        Mode::Modify => MODIFY_HEADER,
    };
    format!(
        "{}\nRequest: {}\n{}{}",
        header, instruction, recent_history, RESPONSE_DIRECTIVE
    )
}

/// FRESH 规划提示
pub fn project_plan_prompt(instruction: &str) -> String {
    format!(
        r#"Create a Next.js 14 website plan.

REQUEST: {instruction}

Describe:
1. Pages to CREATE (the home page and any others)
2. Components to CREATE (every reusable component)
3. Design approach
4. Features to include

Format:
PROJECT PLAN
Goal: [brief description]
PAGES TO CREATE:
- [page - purpose]
COMPONENTS TO CREATE:
- [component - purpose]
DESIGN:
- [style, colors, layout]
FEATURES:
- [key features]

Create the plan:"#
    )
}

/// MODIFY 且存在构建 / 导入 / 组件错误时的修复规划提示
pub fn error_fix_plan_prompt(context: &ProjectContext) -> String {
    let errors = serde_json::to_string_pretty(&context.detected_errors).unwrap_or_default();
    format!(
        r#"Fix errors in a Next.js project.

CONTEXT: {} pages, {} components

ERRORS:
{}

Create a fix plan:
1. Components to CREATE
2. Files to MODIFY
3. Expected outcome

Format:
FIX PLAN
Goal: [brief]
MODIFY: [list]
CREATE: [list]
OUTCOME: [brief]"#,
        context.pages.len(),
        context.components.len(),
        errors
    )
}

/// MODIFY 常规规划提示：列出现有页面与组件
pub fn feature_plan_prompt(instruction: &str, context: &ProjectContext) -> String {
    format!(
        r#"Modify a Next.js project.

CURRENT STATE:
- Pages: {}
- Components: {}

REQUEST: {}

Create a plan:
1. What to MODIFY
2. What to CREATE
3. Components needed

Format:
PLAN
Goal: [brief]
MODIFY: [list]
CREATE: [list]
COMPONENTS: [list]
IMPACT: [brief]"#,
        context.page_names().join(", "),
        context.component_names().join(", "),
        instruction
    )
}
