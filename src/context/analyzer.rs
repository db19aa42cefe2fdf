//! 上下文分析器：从磁盘重建项目摘要，并对诊断信息分类
//!
//! - 页面预览取前 200 字符、组件预览取前 150 字符（按字符边界截断）
//! - 静态检查：`<Capitalized` 标签既未导入、也未在本文件定义、且不在白名单中时，报告 `Missing import for X`
//! - 诊断按子串匹配归入 missing-import / missing-component / build-error / other 四类

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::context::{
    ComponentSummary, DetectedErrors, DiagnosticFeed, PageSummary, ProjectContext, SnapshotStore,
};
use crate::core::AgentError;
use crate::project::ArtifactStore;

const PAGE_PREVIEW_CHARS: usize = 200;
const COMPONENT_PREVIEW_CHARS: usize = 150;

/// 框架内置、无需导入检查的组件
const BUILTIN_COMPONENTS: [&str; 5] = ["Link", "Image", "Head", "Script", "Fragment"];

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static DEFAULT_IMPORT_RE: OnceLock<Regex> = OnceLock::new();
static NAMED_IMPORT_RE: OnceLock<Regex> = OnceLock::new();
static NAMESPACE_IMPORT_RE: OnceLock<Regex> = OnceLock::new();
static LOCAL_DEF_RE: OnceLock<Regex> = OnceLock::new();
static MODULE_NAME_RE: OnceLock<Regex> = OnceLock::new();

pub struct ContextAnalyzer {
    store: ArtifactStore,
    snapshot: SnapshotStore,
    diagnostics: Arc<dyn DiagnosticFeed>,
}

impl ContextAnalyzer {
    pub fn new(store: ArtifactStore, snapshot: SnapshotStore, diagnostics: Arc<dyn DiagnosticFeed>) -> Self {
        Self {
            store,
            snapshot,
            diagnostics,
        }
    }

    /// 重建项目上下文；项目根目录不存在时返回 None
    pub fn analyze(&self) -> Result<Option<ProjectContext>, AgentError> {
        if !self.store.project_exists() {
            tracing::info!(root = %self.store.root().display(), "no existing project found");
            return Ok(None);
        }

        let mut pages = Vec::new();
        for entry in self.store.list_pages()? {
            let content = self.store.read_file(&entry.rel_path)?;
            pages.push(PageSummary {
                name: entry.name,
                path: entry.rel_path,
                content_preview: preview(&content, PAGE_PREVIEW_CHARS),
                detected_issues: missing_imports(&content),
            });
        }

        let mut components = Vec::new();
        for entry in self.store.list_components()? {
            let content = self.store.read_file(&entry.rel_path)?;
            components.push(ComponentSummary {
                name: entry.name,
                path: entry.rel_path,
                content_preview: preview(&content, COMPONENT_PREVIEW_CHARS),
                detected_issues: missing_imports(&content),
            });
        }

        let metadata = self.snapshot.load_or_create()?;
        let detected_errors = self.detected_errors();

        tracing::info!(
            pages = pages.len(),
            components = components.len(),
            errors = detected_errors.total(),
            total_iterations = metadata.total_iterations,
            "project context analyzed"
        );

        Ok(Some(ProjectContext {
            pages,
            components,
            detected_errors,
            metadata,
        }))
    }

    /// 只对当前诊断分类，不读磁盘
    pub fn detected_errors(&self) -> DetectedErrors {
        categorize(&self.diagnostics.snapshot())
    }
}

/// 按子串匹配分类诊断行
pub fn categorize(lines: &[String]) -> DetectedErrors {
    let module_re = MODULE_NAME_RE.get_or_init(|| {
        Regex::new(r#"(?:Cannot find module|Can't resolve)\s+['"](.+?)['"]"#).unwrap()
    });

    let mut errors = DetectedErrors::default();
    for line in lines {
        if line.contains("Module not found") || line.contains("Cannot find module") {
            let name = module_re
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| line.clone());
            errors.missing_imports.push(name);
        } else if line.contains("is not defined") || line.contains("ReferenceError") {
            errors.missing_components.push(line.clone());
        } else if line.contains("Error:") || line.contains("Failed to compile") {
            errors.build_errors.push(line.clone());
        } else {
            errors.other.push(line.clone());
        }
    }
    errors
}

/// 浅层静态检查：找出使用了但既未导入也未定义的大写组件标签
pub fn missing_imports(content: &str) -> Vec<String> {
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"<([A-Z][A-Za-z0-9]*)").unwrap());
    let default_re = DEFAULT_IMPORT_RE
        .get_or_init(|| Regex::new(r"import\s+([A-Za-z_$][\w$]*)\s*(?:,|from\b)").unwrap());
    let named_re = NAMED_IMPORT_RE.get_or_init(|| Regex::new(r"import\s+(?:[\w$]+\s*,\s*)?\{([^}]*)\}").unwrap());
    let namespace_re =
        NAMESPACE_IMPORT_RE.get_or_init(|| Regex::new(r"import\s+\*\s+as\s+([A-Za-z_$][\w$]*)").unwrap());
    let local_re = LOCAL_DEF_RE.get_or_init(|| {
        Regex::new(r"(?:function|const|let|var|class)\s+([A-Z][\w$]*)").unwrap()
    });

    let mut known: HashSet<&str> = BUILTIN_COMPONENTS.iter().copied().collect();
    for caps in default_re.captures_iter(content) {
        known.extend(caps.get(1).map(|m| m.as_str()));
    }
    for caps in namespace_re.captures_iter(content) {
        known.extend(caps.get(1).map(|m| m.as_str()));
    }
    for caps in local_re.captures_iter(content) {
        known.extend(caps.get(1).map(|m| m.as_str()));
    }
    for caps in named_re.captures_iter(content) {
        let Some(list) = caps.get(1) else { continue };
        for spec in list.as_str().split(',') {
            // `Foo as Bar` 绑定的是 Bar
            let bound = spec.rsplit(" as ").next().unwrap_or(spec).trim();
            if !bound.is_empty() {
                known.insert(bound);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut issues = Vec::new();
    for caps in tag_re.captures_iter(content) {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else { continue };
        if !known.contains(name) && seen.insert(name) {
            issues.push(format!("Missing import for {}", name));
        }
    }
    issues
}

fn preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DiagnosticBuffer;
    use crate::project::{ArtifactStore, ProjectLayout};

    #[test]
    fn test_missing_import_detection() {
        let page = r#"import Header from '../components/Header'
import { Hero, Footer as Foot } from '../components'
import Link from 'next/link'

function Badge() { return <span/> }

export default function Home() {
  return (
    <main>
      <Header />
      <Hero />
      <Foot />
      <Badge />
      <Link href="/">home</Link>
      <Pricing />
      <Pricing />
      <Image src="/x.png" />
    </main>
  )
}
"#;
        assert_eq!(missing_imports(page), vec!["Missing import for Pricing"]);
        assert!(missing_imports("<div>plain</div>").is_empty());
    }

    #[test]
    fn test_categorize_buckets() {
        let lines: Vec<String> = [
            "Module not found: Can't resolve '../components/Navbar'",
            "Error: Cannot find module 'framer-motion'",
            "Module not found",
            "ReferenceError: Hero is not defined",
            "Failed to compile",
            "SyntaxError: Error: Unexpected token",
            "ready - started server on 0.0.0.0:3000",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let errors = categorize(&lines);
        assert_eq!(
            errors.missing_imports,
            vec!["../components/Navbar", "framer-motion", "Module not found"]
        );
        assert_eq!(errors.missing_components.len(), 1);
        assert_eq!(errors.build_errors.len(), 2);
        assert_eq!(errors.other.len(), 1);
    }

    #[test]
    fn test_analyze_absent_and_present_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        let store = ArtifactStore::new(&root, ProjectLayout::default());
        let diagnostics = DiagnosticBuffer::new();
        let analyzer = ContextAnalyzer::new(
            store.clone(),
            SnapshotStore::new(root.join(".ctx.json")),
            Arc::new(diagnostics.clone()),
        );
        assert!(analyzer.analyze().unwrap().is_none());

        let long_page = format!("<main>{}<Gallery /></main>", "é".repeat(300));
        store.write_page("home", &long_page).unwrap();
        store.write_component("Hero", "export default function Hero() {}").unwrap();
        diagnostics.push("Failed to compile".into());

        let ctx = analyzer.analyze().unwrap().unwrap();
        assert_eq!(ctx.page_names(), vec!["home"]);
        assert_eq!(ctx.pages[0].content_preview.chars().count(), 200);
        assert_eq!(ctx.pages[0].detected_issues, vec!["Missing import for Gallery"]);
        assert_eq!(ctx.component_names(), vec!["Hero"]);
        assert_eq!(ctx.detected_errors.build_errors, vec!["Failed to compile"]);
        assert!(root.join(".ctx.json").is_file());
    }
}
