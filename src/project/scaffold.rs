//! 项目脚手架：FRESH 模式下写入固定样板与占位根页面
//!
//! 样板内容对编排层是不透明的，只要求根页面携带 PLACEHOLDER_MARKERS，
//! 以便完成校验判断根页面是否已被真正生成。

use serde_json::json;

use crate::project::{ArtifactError, ArtifactStore};

/// 占位根页面中的标记；根页面仍含任一标记即视为未生成
pub const PLACEHOLDER_MARKERS: [&str; 2] = ["⚙️ Generating...", "AI is creating"];

/// 脚手架：在空项目目录中写入样板文件
pub trait Scaffolder: Send + Sync {
    fn scaffold(&self, store: &ArtifactStore) -> Result<Vec<String>, ArtifactError>;
}

/// Next.js App Router + Tailwind 样板
#[derive(Debug, Clone)]
pub struct NextAppScaffold {
    pub package_name: String,
    pub title: String,
}

impl Default for NextAppScaffold {
    fn default() -> Self {
        Self {
            package_name: "sitesmith-generated-site".to_string(),
            title: "Generated Next.js App".to_string(),
        }
    }
}

impl NextAppScaffold {
    fn package_json(&self) -> String {
        let manifest = json!({
            "name": self.package_name,
            "version": "0.1.0",
            "private": true,
            "scripts": {
                "dev": "next dev",
                "build": "next build",
                "start": "next start",
                "lint": "next lint"
            },
            "dependencies": {
                "react": "^18",
                "react-dom": "^18",
                "next": "14.0.4"
            },
            "devDependencies": {
                "autoprefixer": "^10.0.1",
                "postcss": "^8",
                "tailwindcss": "^3.3.0",
                "eslint": "^8",
                "eslint-config-next": "14.0.4"
            }
        });
        serde_json::to_string_pretty(&manifest).unwrap_or_default()
    }

    fn layout(&self) -> String {
        format!(
            r#"import './globals.css'

export const metadata = {{
  title: '{}',
  description: 'Generated by sitesmith',
}}

export default function RootLayout({{ children }}) {{
  return (
    <html lang="en">
      <body>{{children}}</body>
    </html>
  )
}}
"#,
            self.title.replace('\'', "\\'")
        )
    }
}

const NEXT_CONFIG: &str = "/** @type {import('next').NextConfig} */
const nextConfig = {}

module.exports = nextConfig
";

const TAILWIND_CONFIG: &str = "/** @type {import('tailwindcss').Config} */
module.exports = {
  content: [
    './components/**/*.{js,ts,jsx,tsx,mdx}',
    './app/**/*.{js,ts,jsx,tsx,mdx}',
  ],
  theme: {
    extend: {},
  },
  plugins: [],
}
";

const POSTCSS_CONFIG: &str = "module.exports = {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
}
";

const GLOBALS_CSS: &str = "@tailwind base;
@tailwind components;
@tailwind utilities;
";

const GITIGNORE: &str = "node_modules
.next
out
*.log
.DS_Store
.env*.local
";

/// 占位根页面，会被 agent 生成的 home 页面覆盖
pub const PLACEHOLDER_ROOT_PAGE: &str = r#"export default function Home() {
  return (
    <div className="min-h-screen flex items-center justify-center bg-gray-50">
      <div className="text-center">
        <h1 className="text-4xl font-bold text-gray-800">⚙️ Generating...</h1>
        <p className="mt-4 text-gray-600">AI is creating your website</p>
      </div>
    </div>
  )
}
"#;

impl Scaffolder for NextAppScaffold {
    fn scaffold(&self, store: &ArtifactStore) -> Result<Vec<String>, ArtifactError> {
        let pages_dir = &store.layout().pages_dir;
        let files = [
            ("package.json".to_string(), self.package_json()),
            ("next.config.js".to_string(), NEXT_CONFIG.to_string()),
            ("tailwind.config.js".to_string(), TAILWIND_CONFIG.to_string()),
            ("postcss.config.js".to_string(), POSTCSS_CONFIG.to_string()),
            (format!("{}/layout.js", pages_dir), self.layout()),
            (format!("{}/globals.css", pages_dir), GLOBALS_CSS.to_string()),
            (".gitignore".to_string(), GITIGNORE.to_string()),
        ];

        let mut written = Vec::with_capacity(files.len() + 1);
        for (rel, content) in files {
            store.write_file(&rel, &content)?;
            written.push(rel);
        }
        let receipt = store.write_page(crate::project::ROOT_PAGE_NAME, PLACEHOLDER_ROOT_PAGE)?;
        written.push(receipt.rel_path);

        tracing::info!(root = %store.root().display(), files = written.len(), "project scaffolded");
        Ok(written)
    }
}

/// 内容是否仍为占位页面
pub fn is_placeholder(content: &str) -> bool {
    PLACEHOLDER_MARKERS.iter().any(|m| content.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ArtifactKind, ProjectLayout};

    #[test]
    fn test_scaffold_writes_boilerplate_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), ProjectLayout::default());
        let written = NextAppScaffold::default().scaffold(&store).unwrap();

        assert!(written.contains(&"package.json".to_string()));
        assert!(written.contains(&"app/layout.js".to_string()));
        assert!(store.root().join(".gitignore").is_file());

        let manifest: serde_json::Value =
            serde_json::from_str(&store.read_file("package.json").unwrap()).unwrap();
        assert_eq!(manifest["dependencies"]["next"], "14.0.4");

        let home = store.read(ArtifactKind::Page, "home").unwrap();
        assert!(is_placeholder(&home));
        assert!(!is_placeholder("<main>Bakery</main>"));
    }
}
