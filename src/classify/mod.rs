//! Project classification
//!
//! Classification inspects the working tree for fingerprint files (manifests,
//! lockfiles, build descriptors) and maps them to a project kind. A lockfile
//! for a specific ecosystem outranks a generic marker file, and Docker only
//! claims a repository when nothing else matched. Absence of evidence is not
//! an error: the classifier never fails, it returns [`ProjectKind::Unknown`].

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod versions;

/// Toolchain ecosystem of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    NodeJs,
    Python,
    Maven,
    Gradle,
    DotNet,
    Go,
    Ruby,
    Php,
    Rust,
    Docker,
    Unknown,
}

impl ProjectKind {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ProjectKind::Unknown)
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectKind::NodeJs => "nodejs",
            ProjectKind::Python => "python",
            ProjectKind::Maven => "maven",
            ProjectKind::Gradle => "gradle",
            ProjectKind::DotNet => "dotnet",
            ProjectKind::Go => "go",
            ProjectKind::Ruby => "ruby",
            ProjectKind::Php => "php",
            ProjectKind::Rust => "rust",
            ProjectKind::Docker => "docker",
            ProjectKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Package manager refinement for ecosystems with more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Pip,
    Poetry,
    Pipenv,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Pip => "pip",
            PackageManager::Poetry => "poetry",
            PackageManager::Pipenv => "pipenv",
        };
        write!(f, "{}", name)
    }
}

/// Immutable classification result, created once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProfile {
    pub kind: ProjectKind,
    pub package_manager: Option<PackageManager>,
    pub tool_version_hint: Option<String>,
    pub root_path: PathBuf,
}

impl ProjectProfile {
    pub fn unknown(root_path: PathBuf) -> Self {
        Self {
            kind: ProjectKind::Unknown,
            package_manager: None,
            tool_version_hint: None,
            root_path,
        }
    }
}

impl fmt::Display for ProjectProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(pm) = self.package_manager {
            write!(f, " ({})", pm)?;
        }
        if let Some(ref v) = self.tool_version_hint {
            write!(f, " [{}]", v)?;
        }
        Ok(())
    }
}

/// How a fingerprint matches a file name.
#[derive(Debug, Clone, Copy)]
enum Matcher {
    Name(&'static str),
    Extension(&'static str),
}

impl Matcher {
    fn matches(&self, file_name: &str) -> bool {
        match self {
            Matcher::Name(name) => file_name.eq_ignore_ascii_case(name),
            Matcher::Extension(ext) => Path::new(file_name)
                .extension()
                .map(|e| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false),
        }
    }
}

/// Fingerprint file mapped to a project kind. Higher priority wins;
/// table order breaks remaining ties.
struct Fingerprint {
    matcher: Matcher,
    kind: ProjectKind,
    priority: u8,
}

const FINGERPRINTS: &[Fingerprint] = &[
    // Lockfiles pin the ecosystem more reliably than manifests.
    Fingerprint { matcher: Matcher::Name("yarn.lock"), kind: ProjectKind::NodeJs, priority: 30 },
    Fingerprint { matcher: Matcher::Name("pnpm-lock.yaml"), kind: ProjectKind::NodeJs, priority: 30 },
    Fingerprint { matcher: Matcher::Name("package-lock.json"), kind: ProjectKind::NodeJs, priority: 30 },
    Fingerprint { matcher: Matcher::Name("poetry.lock"), kind: ProjectKind::Python, priority: 30 },
    Fingerprint { matcher: Matcher::Name("Cargo.lock"), kind: ProjectKind::Rust, priority: 30 },
    Fingerprint { matcher: Matcher::Name("Gemfile.lock"), kind: ProjectKind::Ruby, priority: 30 },
    Fingerprint { matcher: Matcher::Name("composer.lock"), kind: ProjectKind::Php, priority: 30 },
    Fingerprint { matcher: Matcher::Name("go.sum"), kind: ProjectKind::Go, priority: 30 },
    // Primary manifests.
    Fingerprint { matcher: Matcher::Name("package.json"), kind: ProjectKind::NodeJs, priority: 20 },
    Fingerprint { matcher: Matcher::Name("pom.xml"), kind: ProjectKind::Maven, priority: 20 },
    Fingerprint { matcher: Matcher::Name("build.gradle"), kind: ProjectKind::Gradle, priority: 20 },
    Fingerprint { matcher: Matcher::Name("build.gradle.kts"), kind: ProjectKind::Gradle, priority: 20 },
    Fingerprint { matcher: Matcher::Name("go.mod"), kind: ProjectKind::Go, priority: 20 },
    Fingerprint { matcher: Matcher::Name("Gemfile"), kind: ProjectKind::Ruby, priority: 20 },
    Fingerprint { matcher: Matcher::Name("composer.json"), kind: ProjectKind::Php, priority: 20 },
    Fingerprint { matcher: Matcher::Name("Cargo.toml"), kind: ProjectKind::Rust, priority: 20 },
    Fingerprint { matcher: Matcher::Name("pyproject.toml"), kind: ProjectKind::Python, priority: 20 },
    Fingerprint { matcher: Matcher::Extension("csproj"), kind: ProjectKind::DotNet, priority: 20 },
    Fingerprint { matcher: Matcher::Extension("fsproj"), kind: ProjectKind::DotNet, priority: 20 },
    Fingerprint { matcher: Matcher::Extension("sln"), kind: ProjectKind::DotNet, priority: 20 },
    // Generic markers.
    Fingerprint { matcher: Matcher::Name("setup.py"), kind: ProjectKind::Python, priority: 10 },
    Fingerprint { matcher: Matcher::Name("requirements.txt"), kind: ProjectKind::Python, priority: 10 },
    Fingerprint { matcher: Matcher::Name("Pipfile"), kind: ProjectKind::Python, priority: 10 },
    // Docker only claims a repository nothing else matched.
    Fingerprint { matcher: Matcher::Name("Dockerfile"), kind: ProjectKind::Docker, priority: 5 },
    Fingerprint { matcher: Matcher::Name("docker-compose.yml"), kind: ProjectKind::Docker, priority: 5 },
];

/// Depth of directory levels scanned below the repository root.
const SCAN_DEPTH: usize = 2;

/// Project classifier. Read-only: never mutates the working tree.
pub struct ProjectClassifier;

impl ProjectClassifier {
    /// Classifies the repository rooted at `root_path`.
    ///
    /// Scans the top two directory levels for fingerprint files. Ties are
    /// broken by priority, then by shallower depth, then by table order.
    /// Returns a profile with [`ProjectKind::Unknown`] when no fingerprint
    /// matches.
    pub fn classify(root_path: &Path) -> ProjectProfile {
        // (priority, negated depth, negated table index): bigger is better.
        let mut best: Option<((u8, i32, i32), ProjectKind)> = None;

        let walker = WalkBuilder::new(root_path)
            .max_depth(Some(SCAN_DEPTH))
            .hidden(true)
            .git_ignore(true)
            .build();

        for entry in walker.flatten() {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            let depth = entry.depth() as i32;

            for (index, fp) in FINGERPRINTS.iter().enumerate() {
                if !fp.matcher.matches(&file_name) {
                    continue;
                }
                let key = (fp.priority, -depth, -(index as i32));
                if best.as_ref().map(|(k, _)| key > *k).unwrap_or(true) {
                    debug!(
                        "Fingerprint match: {} -> {} (priority {}, depth {})",
                        file_name, fp.kind, fp.priority, depth
                    );
                    best = Some((key, fp.kind));
                }
            }
        }

        let kind = match best {
            Some((_, kind)) => kind,
            None => {
                info!("No fingerprint matched under {}", root_path.display());
                return ProjectProfile::unknown(root_path.to_path_buf());
            }
        };

        let package_manager = detect_package_manager(root_path, kind);
        let tool_version_hint = versions::tool_version_hint(root_path, kind);

        let profile = ProjectProfile {
            kind,
            package_manager,
            tool_version_hint,
            root_path: root_path.to_path_buf(),
        };
        info!("Classified repository as {}", profile);
        profile
    }
}

fn detect_package_manager(root: &Path, kind: ProjectKind) -> Option<PackageManager> {
    match kind {
        ProjectKind::NodeJs => {
            if root.join("yarn.lock").exists() {
                Some(PackageManager::Yarn)
            } else if root.join("pnpm-lock.yaml").exists() {
                Some(PackageManager::Pnpm)
            } else {
                Some(PackageManager::Npm)
            }
        }
        ProjectKind::Python => {
            if root.join("poetry.lock").exists() || versions::is_poetry_project(root) {
                Some(PackageManager::Poetry)
            } else if root.join("Pipfile").exists() {
                Some(PackageManager::Pipenv)
            } else {
                Some(PackageManager::Pip)
            }
        }
        _ => None,
    }
}
