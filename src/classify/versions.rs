//! Tool version hints extracted from manifests
//!
//! Each ecosystem declares its runtime version somewhere different: a
//! package.json `engines` block, a `requires-python` constraint, a pom.xml
//! property. Extraction is best-effort; a missing or unparseable manifest
//! simply yields no hint.

use crate::classify::ProjectKind;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Returns the declared toolchain version for the repository, if any.
pub fn tool_version_hint(root: &Path, kind: ProjectKind) -> Option<String> {
    let hint = match kind {
        ProjectKind::NodeJs => node_version(root),
        ProjectKind::Python => python_version(root),
        ProjectKind::Maven => maven_java_version(root),
        ProjectKind::Gradle => gradle_java_version(root),
        ProjectKind::DotNet => dotnet_version(root),
        ProjectKind::Go => go_version(root),
        ProjectKind::Ruby => ruby_version(root),
        ProjectKind::Php => php_version(root),
        ProjectKind::Rust => rust_version(root),
        ProjectKind::Docker | ProjectKind::Unknown => None,
    };
    if let Some(ref v) = hint {
        debug!("Tool version hint for {}: {}", kind, v);
    }
    hint
}

/// True when pyproject.toml declares a `[tool.poetry]` table.
pub fn is_poetry_project(root: &Path) -> bool {
    let Ok(content) = fs::read_to_string(root.join("pyproject.toml")) else {
        return false;
    };
    content
        .parse::<toml::Value>()
        .ok()
        .and_then(|v| v.get("tool").and_then(|t| t.get("poetry")).cloned())
        .is_some()
}

fn read(root: &Path, name: &str) -> Option<String> {
    fs::read_to_string(root.join(name)).ok()
}

fn first_version(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn node_version(root: &Path) -> Option<String> {
    let content = read(root, "package.json")?;
    let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
    let engine = manifest.get("engines")?.get("node")?.as_str()?;
    Some(engine.replace(['^', '~'], "").trim().to_string()).filter(|s| !s.is_empty())
}

fn python_version(root: &Path) -> Option<String> {
    if let Some(runtime) = read(root, "runtime.txt") {
        let runtime = runtime.trim();
        if let Some(version) = runtime.strip_prefix("python-") {
            return Some(version.to_string());
        }
    }
    let content = read(root, "pyproject.toml")?;
    let spec = first_version(r#"requires-python\s*=\s*['"]([^'"]+)['"]"#, &content)?;
    // Take the first concrete version out of a constraint like ">=3.9,<4.0".
    first_version(r"(\d+\.\d+)", &spec)
}

fn maven_java_version(root: &Path) -> Option<String> {
    let content = read(root, "pom.xml")?;
    let doc = roxmltree::Document::parse(&content).ok()?;
    for tag in ["java.version", "maven.compiler.source"] {
        if let Some(node) = doc.descendants().find(|n| n.has_tag_name(tag)) {
            if let Some(text) = node.text() {
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }
    None
}

fn gradle_java_version(root: &Path) -> Option<String> {
    let content = read(root, "build.gradle").or_else(|| read(root, "build.gradle.kts"))?;
    first_version(r#"sourceCompatibility\s*=\s*['"]?(\d+)['"]?"#, &content)
}

fn dotnet_version(root: &Path) -> Option<String> {
    let entries = fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".csproj") || name.ends_with(".fsproj") {
            let content = fs::read_to_string(entry.path()).ok()?;
            return first_version(r"<TargetFramework>net(\d+\.\d+)</TargetFramework>", &content);
        }
    }
    None
}

fn go_version(root: &Path) -> Option<String> {
    let content = read(root, "go.mod")?;
    first_version(r"(?m)^go\s+(\d+\.\d+)", &content)
}

fn ruby_version(root: &Path) -> Option<String> {
    if let Some(content) = read(root, ".ruby-version") {
        let version = content.trim().to_string();
        if !version.is_empty() {
            return Some(version);
        }
    }
    let content = read(root, "Gemfile")?;
    first_version(r#"(?m)^ruby\s+['"](\d+\.\d+\.\d+)['"]"#, &content)
}

fn php_version(root: &Path) -> Option<String> {
    let content = read(root, "composer.json")?;
    let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
    let constraint = manifest.get("require")?.get("php")?.as_str()?;
    first_version(r"(\d+\.\d+)", constraint)
}

fn rust_version(root: &Path) -> Option<String> {
    if let Some(content) = read(root, "rust-toolchain") {
        let version = content.trim().to_string();
        if !version.is_empty() && !version.starts_with('[') {
            return Some(version);
        }
    }
    let content = read(root, "rust-toolchain.toml")?;
    let value: toml::Value = content.parse().ok()?;
    value
        .get("toolchain")?
        .get("channel")?
        .as_str()
        .map(|s| s.to_string())
}
