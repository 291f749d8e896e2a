use crate::error::{Error, Result};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Package scanner for project directories.
///
/// The `FileScanner` walks the directory tree under its root and groups Rust source files by
/// directory: every directory holding at least one `.rs` file is a package. It skips `target`
/// and hidden directories (those starting with `.`).
///
/// Package patterns select the root packages of a scan:
/// - `dir` selects the package in `dir`
/// - `dir/...` selects `dir` and every package below it
///
/// # Example
///
/// ```no_run
/// use swag_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project"));
/// let result = scanner.scan(&["./...".to_string()]).unwrap();
/// println!("Found {} packages", result.packages.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Source files of one package directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSources {
    /// Directory relative to the scan root with `/` separators, `.` for the root itself
    pub id: String,
    /// Directory name
    pub name: String,
    /// Absolute or root-joined directory path
    pub dir: PathBuf,
    /// `.rs` files directly in the directory, sorted by name
    pub files: Vec<PathBuf>,
}

/// Result of a directory scan.
#[derive(Debug)]
pub struct ScanResult {
    /// Every package found under the root, sorted by identity
    pub packages: Vec<PackageSources>,
    /// Identities of the packages selected by the patterns, in pattern order
    pub roots: Vec<String>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl ScanResult {
    pub fn package(&self, id: &str) -> Option<&PackageSources> {
        self.packages.iter().find(|package| package.id == id)
    }

    pub fn rust_file_count(&self) -> usize {
        self.packages.iter().map(|package| package.files.len()).sum()
    }
}

/// Splits a pattern into a package identity and whether it selects descendants.
fn parse_pattern(pattern: &str) -> (String, bool) {
    let (path, recursive) = match pattern.trim().strip_suffix("...") {
        Some(rest) => (rest, true),
        None => (pattern.trim(), false),
    };
    let id = path
        .split(['/', '\\'])
        .filter(|component| !component.is_empty() && *component != ".")
        .collect::<Vec<_>>()
        .join("/");

    if id.is_empty() {
        (".".to_string(), recursive)
    } else {
        (id, recursive)
    }
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and selects root packages with `patterns`.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when a pattern names a directory that does not exist.
    pub fn scan(&self, patterns: &[String]) -> Result<ScanResult> {
        let mut packages: BTreeMap<String, PackageSources> = BTreeMap::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if !entry.file_type().is_file() || path.extension().and_then(|s| s.to_str()) != Some("rs") {
                        continue;
                    }
                    let Some(dir) = path.parent() else {
                        continue;
                    };
                    let id = self.package_id(dir);
                    packages
                        .entry(id.clone())
                        .or_insert_with(|| PackageSources {
                            name: package_name(dir, &id),
                            id,
                            dir: dir.to_path_buf(),
                            files: Vec::new(),
                        })
                        .files
                        .push(path.to_path_buf());
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        let mut roots: Vec<String> = Vec::new();
        for pattern in patterns {
            let (root, recursive) = parse_pattern(pattern);
            let dir = if root == "." {
                self.root_path.clone()
            } else {
                self.root_path.join(&root)
            };
            if !dir.is_dir() {
                return Err(Error::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: format!("{} is not a directory", dir.display()),
                });
            }

            let before = roots.len();
            for id in packages.keys() {
                let selected = *id == root
                    || (recursive && (root == "." || id.starts_with(&format!("{root}/"))));
                if selected && !roots.contains(id) {
                    roots.push(id.clone());
                }
            }

            if roots.len() == before {
                let warning = format!("Pattern {} matched no packages", pattern);
                warn!("{}", warning);
                warnings.push(warning);
            } else {
                debug!("Pattern {} selected {} packages", pattern, roots.len() - before);
            }
        }

        Ok(ScanResult {
            packages: packages.into_values().collect(),
            roots,
            warnings,
        })
    }

    fn package_id(&self, dir: &Path) -> String {
        let relative = dir.strip_prefix(&self.root_path).unwrap_or(dir);
        let id = relative
            .components()
            .filter_map(|component| match component {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        if id.is_empty() {
            ".".to_string()
        } else {
            id
        }
    }
}

fn package_name(dir: &Path, id: &str) -> String {
    dir.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.rsplit('/').next().unwrap_or(id).to_string())
}
