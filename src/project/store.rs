//! 产物存储：生成项目在磁盘上的页面 / 组件
//!
//! 所有写入都走 write_leaf：目标路径上若是目录则先强制清除（上游曾把 page.js 建成目录），
//! 若是文件则先删除，再以 create_new 写入，最后立即回读逐字节比对。
//! 页面寻址：保留名 home（别名 `/`、`index`）对应根页面 `<pages_dir>/<page_file>`，
//! 其它名字对应 `<pages_dir>/<name>/<page_file>`；组件对应 `<components_dir>/<Name>.<ext>`。

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::ProjectSection;
use crate::project::{splice, ArtifactError, SplicePosition};

/// 根页面的保留名
pub const ROOT_PAGE_NAME: &str = "home";
const ROOT_PAGE_ALIASES: [&str; 3] = ["home", "/", "index"];
/// 扫描时跳过的目录
const SKIPPED_DIRS: [&str; 2] = ["node_modules", ".next"];

/// 项目目录布局
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub pages_dir: String,
    pub components_dir: String,
    pub page_file: String,
    pub component_extension: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        ProjectLayout::from(&ProjectSection::default())
    }
}

impl From<&ProjectSection> for ProjectLayout {
    fn from(section: &ProjectSection) -> Self {
        Self {
            pages_dir: section.pages_dir.clone(),
            components_dir: section.components_dir.clone(),
            page_file: section.page_file.clone(),
            component_extension: section.component_extension.trim_start_matches('.').to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    Page,
    Component,
}

/// 枚举得到的一个产物
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    pub kind: ArtifactKind,
    pub name: String,
    /// 相对项目根目录的路径（`/` 分隔）
    pub rel_path: String,
}

/// 一次写入的回执
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReceipt {
    pub kind: ArtifactKind,
    pub name: String,
    pub rel_path: String,
    pub bytes: usize,
}

/// 项目目录树节点
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: TreeNodeType,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeNodeType {
    File,
    Directory,
}

/// 项目内的文本文件
#[derive(Debug, Clone, Serialize)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
}

/// 产物存储：绑定项目根目录与布局
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    layout: ProjectLayout,
}

impl ArtifactStore {
    pub fn new(root: impl AsRef<Path>, layout: ProjectLayout) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// 项目根目录是否存在
    pub fn project_exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn is_root_page_name(name: &str) -> bool {
        ROOT_PAGE_ALIASES.contains(&name.trim())
    }

    /// 页面的相对路径
    pub fn page_rel_path(&self, name: &str) -> Result<String, ArtifactError> {
        if Self::is_root_page_name(name) {
            return Ok(format!("{}/{}", self.layout.pages_dir, self.layout.page_file));
        }
        let name = validate_name(name)?;
        Ok(format!(
            "{}/{}/{}",
            self.layout.pages_dir, name, self.layout.page_file
        ))
    }

    /// 组件的相对路径（名字自带扩展名时去掉）
    pub fn component_rel_path(&self, name: &str) -> Result<String, ArtifactError> {
        let name = validate_name(name)?;
        let suffix = format!(".{}", self.layout.component_extension);
        let stem = name.strip_suffix(suffix.as_str()).unwrap_or(name);
        if stem.is_empty() {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }
        Ok(format!(
            "{}/{}.{}",
            self.layout.components_dir, stem, self.layout.component_extension
        ))
    }

    fn rel_path(&self, kind: ArtifactKind, name: &str) -> Result<String, ArtifactError> {
        match kind {
            ArtifactKind::Page => self.page_rel_path(name),
            ArtifactKind::Component => self.component_rel_path(name),
        }
    }

    /// 根页面的绝对路径
    pub fn root_page_path(&self) -> PathBuf {
        self.root
            .join(&self.layout.pages_dir)
            .join(&self.layout.page_file)
    }

    /// 创建或覆盖页面
    pub fn write_page(&self, name: &str, content: &str) -> Result<ArtifactReceipt, ArtifactError> {
        let rel_path = self.page_rel_path(name)?;
        tracing::info!(page = %name, path = %rel_path, "write page");
        self.write_leaf(&self.root.join(&rel_path), content)?;
        Ok(ArtifactReceipt {
            kind: ArtifactKind::Page,
            name: name.trim().to_string(),
            rel_path,
            bytes: content.len(),
        })
    }

    /// 创建或覆盖组件
    pub fn write_component(&self, name: &str, content: &str) -> Result<ArtifactReceipt, ArtifactError> {
        let rel_path = self.component_rel_path(name)?;
        tracing::info!(component = %name, path = %rel_path, "write component");
        self.write_leaf(&self.root.join(&rel_path), content)?;
        Ok(ArtifactReceipt {
            kind: ArtifactKind::Component,
            name: name.trim().to_string(),
            rel_path,
            bytes: content.len(),
        })
    }

    /// 向已存在的页面拼接片段；页面不存在时返回 PageMissing（创建请用 write_page）
    pub fn update_page(
        &self,
        name: &str,
        section: &str,
        position: SplicePosition,
    ) -> Result<ArtifactReceipt, ArtifactError> {
        let rel_path = self.page_rel_path(name)?;
        let path = self.root.join(&rel_path);
        if !path.is_file() {
            return Err(ArtifactError::PageMissing { path: rel_path });
        }
        let existing =
            std::fs::read_to_string(&path).map_err(|e| ArtifactError::io(&path, e))?;
        let updated = splice(&existing, section, position)?;
        tracing::info!(page = %name, path = %rel_path, position = %position, "update page");
        self.write_leaf(&path, &updated)?;
        Ok(ArtifactReceipt {
            kind: ArtifactKind::Page,
            name: name.trim().to_string(),
            rel_path,
            bytes: updated.len(),
        })
    }

    /// 删除整个生成项目；目录本就不存在时视为成功
    pub fn delete_all(&self) -> Result<(), ArtifactError> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {
                tracing::info!(root = %self.root.display(), "project tree deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(root = %self.root.display(), "no existing project tree (fresh start)");
                Ok(())
            }
            Err(e) => Err(ArtifactError::io(&self.root, e)),
        }
    }

    pub fn read(&self, kind: ArtifactKind, name: &str) -> Result<String, ArtifactError> {
        let rel_path = self.rel_path(kind, name)?;
        let path = self.root.join(&rel_path);
        if !path.is_file() {
            return Err(ArtifactError::NotFound(rel_path));
        }
        std::fs::read_to_string(&path).map_err(|e| ArtifactError::io(&path, e))
    }

    pub fn exists(&self, kind: ArtifactKind, name: &str) -> bool {
        self.rel_path(kind, name)
            .map(|rel| self.root.join(rel).is_file())
            .unwrap_or(false)
    }

    /// 枚举页面：根页面 + 第一层页面目录（按名字排序，根页面在前）
    pub fn list_pages(&self) -> Result<Vec<ArtifactEntry>, ArtifactError> {
        let mut pages = Vec::new();
        if self.root_page_path().is_file() {
            pages.push(ArtifactEntry {
                kind: ArtifactKind::Page,
                name: ROOT_PAGE_NAME.to_string(),
                rel_path: format!("{}/{}", self.layout.pages_dir, self.layout.page_file),
            });
        }

        let pages_dir = self.root.join(&self.layout.pages_dir);
        let mut named = Vec::new();
        for name in self.read_dir_names(&pages_dir, true)? {
            if pages_dir.join(&name).join(&self.layout.page_file).is_file() {
                named.push(ArtifactEntry {
                    kind: ArtifactKind::Page,
                    rel_path: format!(
                        "{}/{}/{}",
                        self.layout.pages_dir, name, self.layout.page_file
                    ),
                    name,
                });
            }
        }
        named.sort_by(|a, b| a.name.cmp(&b.name));
        pages.extend(named);
        Ok(pages)
    }

    /// 枚举组件目录下带组件扩展名的文件
    pub fn list_components(&self) -> Result<Vec<ArtifactEntry>, ArtifactError> {
        let dir = self.root.join(&self.layout.components_dir);
        let suffix = format!(".{}", self.layout.component_extension);
        let mut components: Vec<ArtifactEntry> = self
            .read_dir_names(&dir, false)?
            .into_iter()
            .filter_map(|file| {
                let stem = file.strip_suffix(suffix.as_str())?.to_string();
                Some(ArtifactEntry {
                    kind: ArtifactKind::Component,
                    rel_path: format!("{}/{}", self.layout.components_dir, file),
                    name: stem,
                })
            })
            .collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(components)
    }

    /// 列出目录下的子目录名（dirs=true）或文件名（dirs=false）；目录不存在时返回空
    fn read_dir_names(&self, dir: &Path, dirs: bool) -> Result<Vec<String>, ArtifactError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ArtifactError::io(dir, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArtifactError::io(dir, e))?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().to_string();
            if is_dir == dirs && !SKIPPED_DIRS.contains(&name.as_str()) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// 解析项目内相对路径；拒绝绝对路径与 `..`，防止逃逸出项目根目录
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, ArtifactError> {
        let rel = rel.trim().trim_start_matches("./");
        let path = Path::new(rel);
        if rel.is_empty()
            || path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ArtifactError::PathEscape(rel.to_string()));
        }
        Ok(self.root.join(path))
    }

    pub fn read_file(&self, rel: &str) -> Result<String, ArtifactError> {
        let path = self.resolve(rel)?;
        if !path.is_file() {
            return Err(ArtifactError::NotFound(rel.to_string()));
        }
        std::fs::read_to_string(&path).map_err(|e| ArtifactError::io(&path, e))
    }

    /// 写入任意项目文件（同样经过 write_leaf 的冲突修复与回读校验）
    pub fn write_file(&self, rel: &str, content: &str) -> Result<(), ArtifactError> {
        let path = self.resolve(rel)?;
        self.write_leaf(&path, content)
    }

    pub fn delete_file(&self, rel: &str) -> Result<(), ArtifactError> {
        let path = self.resolve(rel)?;
        if !path.is_file() {
            return Err(ArtifactError::NotFound(rel.to_string()));
        }
        std::fs::remove_file(&path).map_err(|e| ArtifactError::io(&path, e))
    }

    /// 在已存在的项目文件末尾追加修复片段
    pub fn append_to_file(&self, rel: &str, fix: &str) -> Result<usize, ArtifactError> {
        let existing = self.read_file(rel)?;
        let fixed = format!("{}\n{}", existing, fix);
        self.write_file(rel, &fixed)?;
        Ok(fixed.len())
    }

    /// 项目目录树（跳过 node_modules / .next）
    pub fn project_tree(&self) -> Result<Vec<TreeNode>, ArtifactError> {
        if !self.project_exists() {
            return Ok(Vec::new());
        }
        build_tree(&self.root, "")
    }

    /// 项目内所有 UTF-8 文本文件
    pub fn list_files(&self) -> Result<Vec<ProjectFile>, ArtifactError> {
        if !self.project_exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !SKIPPED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()));
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                ArtifactError::io(path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            files.push(ProjectFile {
                path: to_slash(rel),
                content,
            });
        }
        Ok(files)
    }

    /// 冲突安全写入：清除目录冲突 -> 删除旧文件 -> create_new 写入 -> 回读比对
    pub(crate) fn write_leaf(&self, path: &Path, content: &str) -> Result<(), ArtifactError> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => {
                tracing::warn!(path = %path.display(), "artifact path exists as a directory, removing it");
                std::fs::remove_dir_all(path).map_err(|e| ArtifactError::DirectoryConflict {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
            Ok(_) => {
                tracing::debug!(path = %path.display(), "removing existing file before overwrite");
                std::fs::remove_file(path).map_err(|e| ArtifactError::io(path, e))?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ArtifactError::io(path, e)),
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| ArtifactError::io(path, e))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ArtifactError::io(path, e))?;
        drop(file);

        let written = std::fs::read(path).map_err(|e| ArtifactError::io(path, e))?;
        if written != content.as_bytes() {
            return Err(ArtifactError::WriteVerification {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(path = %path.display(), bytes = content.len(), "write verified");
        Ok(())
    }
}

/// 名字校验：去掉首尾空白与斜杠后不能为空，也不能包含路径分隔符或 `..`
fn validate_name(name: &str) -> Result<&str, ArtifactError> {
    let trimmed = name.trim().trim_matches('/');
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
    {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

fn build_tree(dir: &Path, base: &str) -> Result<Vec<TreeNode>, ArtifactError> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| ArtifactError::io(dir, e))?
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut tree = Vec::new();
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if SKIPPED_DIRS.contains(&name.as_str()) {
            continue;
        }
        let path = if base.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", base, name)
        };
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            let children = build_tree(&entry.path(), &path)?;
            tree.push(TreeNode {
                name,
                node_type: TreeNodeType::Directory,
                path,
                children,
            });
        } else {
            tree.push(TreeNode {
                name,
                node_type: TreeNodeType::File,
                path,
                children: Vec::new(),
            });
        }
    }
    Ok(tree)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
