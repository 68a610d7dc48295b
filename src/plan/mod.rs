//! Command planning
//!
//! Maps a [`ProjectProfile`] to the install and build commands for its
//! ecosystem. The mapping is a pure function of the profile plus explicit
//! overrides: identical inputs always produce identical plans. An unknown
//! project kind yields an empty plan, which the pipeline reports as
//! `NO_TOOLCHAIN_DETECTED` instead of crashing.

use crate::classify::{PackageManager, ProjectKind, ProjectProfile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single external command: argv plus working directory. Value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Command {
    pub fn new(cwd: &PathBuf, program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.clone(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Ordered install commands and the single build command for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommandPlan {
    pub install_commands: Vec<Command>,
    pub build_command: Option<Command>,
}

impl CommandPlan {
    pub fn is_empty(&self) -> bool {
        self.install_commands.is_empty() && self.build_command.is_none()
    }
}

/// Planner overrides injected from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOverrides {
    /// Overrides the runtime/toolchain version used in generated commands.
    pub tool_version: Option<String>,
}

/// Maps project profiles to command plans.
pub struct CommandPlanner;

impl CommandPlanner {
    /// Derives the command plan for a classified repository.
    ///
    /// Pure: no filesystem access, no side effects.
    pub fn plan(profile: &ProjectProfile, overrides: &PlanOverrides) -> CommandPlan {
        let root = &profile.root_path;
        let version = overrides
            .tool_version
            .as_ref()
            .or(profile.tool_version_hint.as_ref());

        match profile.kind {
            ProjectKind::NodeJs => {
                let pm = profile.package_manager.unwrap_or(PackageManager::Npm);
                let (install, build) = match pm {
                    PackageManager::Yarn => (
                        Command::new(root, "yarn", &["install", "--frozen-lockfile"]),
                        Command::new(root, "yarn", &["run", "build"]),
                    ),
                    PackageManager::Pnpm => (
                        Command::new(root, "pnpm", &["install", "--frozen-lockfile"]),
                        Command::new(root, "pnpm", &["run", "build"]),
                    ),
                    _ => (
                        Command::new(root, "npm", &["ci"]),
                        Command::new(root, "npm", &["run", "build"]),
                    ),
                };
                CommandPlan {
                    install_commands: vec![install],
                    build_command: Some(build),
                }
            }
            ProjectKind::Python => {
                let pm = profile.package_manager.unwrap_or(PackageManager::Pip);
                match pm {
                    PackageManager::Poetry => CommandPlan {
                        install_commands: vec![Command::new(root, "poetry", &["install"])],
                        build_command: Some(Command::new(root, "poetry", &["build"])),
                    },
                    PackageManager::Pipenv => CommandPlan {
                        install_commands: vec![Command::new(root, "pipenv", &["install", "--dev"])],
                        build_command: Some(Command::new(
                            root,
                            "pipenv",
                            &["run", "python", "-m", "build"],
                        )),
                    },
                    _ => {
                        // A pinned interpreter version selects the python binary.
                        let python = match version {
                            Some(v) => format!("python{}", major_minor(v)),
                            None => "python".to_string(),
                        };
                        CommandPlan {
                            install_commands: vec![Command::new(
                                root,
                                &python,
                                &["-m", "pip", "install", "-r", "requirements.txt"],
                            )],
                            build_command: Some(Command::new(root, &python, &["-m", "build"])),
                        }
                    }
                }
            }
            ProjectKind::Maven => CommandPlan {
                install_commands: vec![Command::new(
                    root,
                    "mvn",
                    &["clean", "install", "-DskipTests"],
                )],
                build_command: Some(Command::new(root, "mvn", &["package"])),
            },
            ProjectKind::Gradle => CommandPlan {
                install_commands: vec![Command::new(root, "./gradlew", &["dependencies"])],
                build_command: Some(Command::new(root, "./gradlew", &["build", "-x", "test"])),
            },
            ProjectKind::DotNet => CommandPlan {
                install_commands: vec![Command::new(root, "dotnet", &["restore"])],
                build_command: Some(Command::new(
                    root,
                    "dotnet",
                    &["build", "--configuration", "Release"],
                )),
            },
            ProjectKind::Go => CommandPlan {
                install_commands: vec![Command::new(root, "go", &["mod", "download"])],
                build_command: Some(Command::new(root, "go", &["build", "./..."])),
            },
            ProjectKind::Ruby => CommandPlan {
                install_commands: vec![Command::new(root, "bundle", &["install"])],
                build_command: Some(Command::new(root, "bundle", &["exec", "rake", "build"])),
            },
            ProjectKind::Php => CommandPlan {
                install_commands: vec![Command::new(root, "composer", &["install"])],
                build_command: Some(Command::new(root, "composer", &["dump-autoload", "-o"])),
            },
            ProjectKind::Rust => {
                // A pinned toolchain threads through as `cargo +<version>`.
                let toolchain_arg = version.map(|v| format!("+{}", v));
                let with_toolchain = |subcommand: &[&str]| {
                    let mut args: Vec<String> = Vec::new();
                    if let Some(ref t) = toolchain_arg {
                        args.push(t.clone());
                    }
                    args.extend(subcommand.iter().map(|a| a.to_string()));
                    Command {
                        program: "cargo".to_string(),
                        args,
                        cwd: root.clone(),
                    }
                };
                CommandPlan {
                    install_commands: vec![with_toolchain(&["fetch"])],
                    build_command: Some(with_toolchain(&["build", "--release"])),
                }
            }
            ProjectKind::Docker => CommandPlan {
                install_commands: Vec::new(),
                build_command: Some(Command::new(
                    root,
                    "docker",
                    &["build", "-t", "project:latest", "."],
                )),
            },
            ProjectKind::Unknown => CommandPlan::default(),
        }
    }
}

fn major_minor(version: &str) -> String {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{}.{}", major, minor),
        _ => version.to_string(),
    }
}
