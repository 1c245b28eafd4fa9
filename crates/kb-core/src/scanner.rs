// kb-core/src/scanner.rs
//! 文件扫描模块 - 深度优先遍历知识库目录，只产出路径，不写索引

use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use ignore::WalkBuilder;
use walkdir::WalkDir;

use crate::config::{KbConfig, WalkerConfig};

/// 判断路径是否为需要索引的笔记
#[derive(Debug, Clone)]
pub struct NoteFilter {
    suffix: String,
    ignore: Vec<Pattern>,
}

impl NoteFilter {
    pub fn new(config: &KbConfig) -> Self {
        let ignore = config
            .walker
            .ignore_patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("忽略无效的 ignore 模式 '{}': {}", p, e);
                    None
                }
            })
            .collect();
        Self {
            suffix: config.note_suffix(),
            ignore,
        }
    }

    /// 文件名是否以笔记扩展名结尾（区分大小写）
    pub fn has_note_extension(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.len() > self.suffix.len() && name.ends_with(&self.suffix))
    }

    /// 相对路径中任意一级名称命中 ignore 模式
    pub fn is_ignored(&self, rel_path: &Path) -> bool {
        rel_path.components().any(|c| match c {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                self.ignore.iter().any(|p| p.matches(&name))
            }
            _ => false,
        })
    }

    pub fn is_note(&self, rel_path: &Path) -> bool {
        self.has_note_extension(rel_path) && !self.is_ignored(rel_path)
    }
}

/// 扫描结果
#[derive(Debug, Default)]
pub struct ScanReport {
    /// 按遍历顺序排列的笔记绝对路径
    pub files: Vec<PathBuf>,
    /// 因无法读取而跳过的条目数
    pub skipped: usize,
}

/// 扫描 `root` 下所有笔记
pub fn scan(root: &Path, config: &KbConfig) -> ScanReport {
    let filter = NoteFilter::new(config);
    tracing::debug!("开始遍历目录: {:?}", root);

    let report = if config.walker.use_ripgrep_walker {
        scan_with_ripgrep_walker(root, &config.walker, &filter)
    } else {
        scan_with_std_walker(root, &config.walker, &filter)
    };

    tracing::info!(
        "扫描完成: {:?} 共发现 {} 个笔记，跳过 {} 个不可读条目",
        root,
        report.files.len(),
        report.skipped
    );
    report
}

fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn scan_with_std_walker(root: &Path, walker_config: &WalkerConfig, filter: &NoteFilter) -> ScanReport {
    let mut report = ScanReport::default();

    let mut walker = WalkDir::new(root)
        .follow_links(walker_config.follow_symlinks)
        .sort_by_file_name();
    if walker_config.max_depth > 0 {
        walker = walker.max_depth(walker_config.max_depth);
    }

    let entries = walker.into_iter().filter_entry(|entry| {
        let rel = relative(root, entry.path());
        if filter.is_ignored(rel) {
            return false;
        }
        !(walker_config.skip_hidden && entry.depth() > 0 && is_hidden(entry.file_name()))
    });

    for result in entries {
        match result {
            Ok(entry) => {
                if entry.file_type().is_file() && filter.has_note_extension(entry.path()) {
                    report.files.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("遍历错误，已跳过: {}", e);
                report.skipped += 1;
            }
        }
    }

    report
}

fn scan_with_ripgrep_walker(
    root: &Path,
    walker_config: &WalkerConfig,
    filter: &NoteFilter,
) -> ScanReport {
    let mut report = ScanReport::default();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(walker_config.skip_hidden)
        // 知识库目录由用户指定，不受 .gitignore 影响
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .ignore(walker_config.respect_ignore)
        .follow_links(walker_config.follow_symlinks)
        .sort_by_file_name(|a, b| a.cmp(b));

    if walker_config.max_depth > 0 {
        builder.max_depth(Some(walker_config.max_depth));
    }

    let filter_for_entries = filter.clone();
    let root_for_entries = root.to_path_buf();
    builder.filter_entry(move |entry| {
        !filter_for_entries.is_ignored(relative(&root_for_entries, entry.path()))
    });

    for result in builder.build() {
        match result {
            Ok(entry) => {
                let is_file = entry.file_type().is_some_and(|t| t.is_file());
                if is_file && filter.has_note_extension(entry.path()) {
                    report.files.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("遍历错误，已跳过: {}", e);
                report.skipped += 1;
            }
        }
    }

    report
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("alpha/deep")).unwrap();
        fs::create_dir_all(root.join("beta")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("top.md"), "# Top").unwrap();
        fs::write(root.join("alpha/a.md"), "# A").unwrap();
        fs::write(root.join("alpha/deep/b.md"), "# B").unwrap();
        fs::write(root.join("beta/c.md"), "# C").unwrap();
        fs::write(root.join("beta/notes.txt"), "not a note").unwrap();
        fs::write(root.join("beta/README.MD"), "wrong case").unwrap();
        fs::write(root.join("node_modules/pkg/readme.md"), "# dep").unwrap();
        fs::write(root.join(".hidden/h.md"), "# hidden").unwrap();
        dir
    }

    fn relative_names(root: &Path, report: &ScanReport) -> Vec<String> {
        report
            .files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_scan_finds_only_notes(#[case] use_ripgrep_walker: bool) {
        let dir = fixture();
        let mut config = KbConfig::with_root(dir.path());
        config.walker.use_ripgrep_walker = use_ripgrep_walker;

        let report = scan(dir.path(), &config);
        let names = relative_names(dir.path(), &report);

        assert_eq!(
            names,
            vec![".hidden/h.md", "alpha/a.md", "alpha/deep/b.md", "beta/c.md", "top.md"]
        );
        assert_eq!(report.skipped, 0);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_scan_skip_hidden(#[case] use_ripgrep_walker: bool) {
        let dir = fixture();
        let mut config = KbConfig::with_root(dir.path());
        config.walker.use_ripgrep_walker = use_ripgrep_walker;
        config.walker.skip_hidden = true;

        let report = scan(dir.path(), &config);
        let names = relative_names(dir.path(), &report);
        assert!(!names.iter().any(|n| n.starts_with(".hidden")));
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_scan_max_depth() {
        let dir = fixture();
        let mut config = KbConfig::with_root(dir.path());
        config.walker.max_depth = 2;
        let report = scan(dir.path(), &config);
        let names = relative_names(dir.path(), &report);
        assert!(!names.contains(&"alpha/deep/b.md".to_string()));
        assert!(names.contains(&"alpha/a.md".to_string()));
    }

    #[test]
    fn test_scan_missing_root_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let config = KbConfig::with_root(&missing);
        let report = scan(&missing, &config);
        assert!(report.files.is_empty());
        assert_eq!(report.skipped, 1);
    }

    #[cfg(unix)]
    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_scan_continues_past_unreadable_entry(#[case] use_ripgrep_walker: bool) {
        let dir = fixture();
        // 悬空链接在跟随链接时无法读取
        std::os::unix::fs::symlink(dir.path().join("missing-target"), dir.path().join("beta/broken.md"))
            .unwrap();
        let mut config = KbConfig::with_root(dir.path());
        config.walker.use_ripgrep_walker = use_ripgrep_walker;
        config.walker.follow_symlinks = true;

        let report = scan(dir.path(), &config);
        let names = relative_names(dir.path(), &report);

        assert_eq!(report.skipped, 1);
        assert_eq!(
            names,
            vec![".hidden/h.md", "alpha/a.md", "alpha/deep/b.md", "beta/c.md", "top.md"]
        );
    }

    #[rstest]
    #[case("notes/a.md", true)]
    #[case("notes/a.md.bak", false)]
    #[case("notes/A.MD", false)]
    #[case(".md", false)]
    #[case("node_modules/x/a.md", false)]
    #[case("deps/node_modules/a.md", false)]
    #[case(".git/a.md", false)]
    fn test_note_filter(#[case] rel_path: &str, #[case] expected: bool) {
        let filter = NoteFilter::new(&KbConfig::default());
        assert_eq!(filter.is_note(Path::new(rel_path)), expected);
    }
}
