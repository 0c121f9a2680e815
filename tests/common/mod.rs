//! Simulated host for convergence tests
//!
//! `SimHost` implements `CommandRunner` over a temporary directory tree. It
//! keeps a small model of npm global packages (per npm bin directory), dpkg
//! entries, the network and nvm, and materializes executables on disk so
//! PATH resolution in the installer sees the same world the commands do.

#![allow(dead_code)]

use async_trait::async_trait;
use reinstaller::models::{InstallerConfig, OptionalTool, ShellKind};
use reinstaller::orchestrator::{CommandOutput, CommandRunner, CommandSpec, RunError};
use reinstaller::{Host, OsFamily};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const TARGET_PACKAGE: &str = "@anthropic-ai/claude-code";
pub const TARGET_BINARY: &str = "claude";

/// Starting state of the simulated host
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Major version of a system Node.js in /usr/bin (with npm)
    pub system_node: Option<u64>,
    /// Packages installed globally with the system npm
    pub npm_packages: Vec<String>,
    /// A loose copy in ~/.local/bin
    pub loose_binary: bool,
    /// A dpkg-registered copy in /opt/claude/bin
    pub os_package: bool,
    /// Copies in separate PATH directories, none of them on a candidate path
    pub shadowed_copies: usize,
    /// dpkg, apt-get present
    pub debian: bool,
    pub network_ok: bool,
    pub fail_npm_uninstall: bool,
    pub fail_apt_remove: bool,
    pub fail_target_install: bool,
    pub fail_target_version: bool,
    pub fail_optional: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            system_node: None,
            npm_packages: Vec::new(),
            loose_binary: false,
            os_package: false,
            shadowed_copies: 0,
            debian: true,
            network_ok: true,
            fail_npm_uninstall: false,
            fail_apt_remove: false,
            fail_target_install: false,
            fail_target_version: false,
            fail_optional: false,
        }
    }
}

struct World {
    scenario: Scenario,
    npm_globals: HashMap<PathBuf, BTreeSet<String>>,
    dpkg: BTreeSet<String>,
    registry: String,
    calls: Vec<String>,
}

pub struct SimHost {
    root: TempDir,
    world: Mutex<World>,
}

pub fn make_executable(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "#!/bin/sh\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

fn ok(stdout: impl Into<String>) -> Result<CommandOutput, RunError> {
    Ok(CommandOutput::ok(stdout))
}

fn fail(code: i32, stderr: &str) -> Result<CommandOutput, RunError> {
    Ok(CommandOutput::failed(code, stderr))
}

impl SimHost {
    pub fn new(scenario: Scenario) -> Self {
        let root = TempDir::new().unwrap();
        let sim = SimHost {
            root,
            world: Mutex::new(World {
                scenario: scenario.clone(),
                npm_globals: HashMap::new(),
                dpkg: BTreeSet::new(),
                registry: "https://registry.npmjs.org/".to_string(),
                calls: Vec::new(),
            }),
        };

        fs::create_dir_all(sim.home()).unwrap();
        for tool in ["sudo", "curl", "tar", "bash", "rm"] {
            make_executable(&sim.tools_dir().join(tool));
        }
        if scenario.debian {
            make_executable(&sim.tools_dir().join("dpkg"));
            make_executable(&sim.tools_dir().join("apt-get"));
        }

        let system_bin = sim.system_bin();
        if scenario.system_node.is_some() {
            make_executable(&system_bin.join("node"));
            make_executable(&system_bin.join("npm"));
        }
        {
            let mut world = sim.world.lock().unwrap();
            let set = world.npm_globals.entry(system_bin.clone()).or_default();
            for package in &scenario.npm_packages {
                set.insert(package.clone());
            }
            if scenario.os_package {
                world.dpkg.insert("claude-code".to_string());
            }
        }
        if !scenario.npm_packages.is_empty() {
            make_executable(&system_bin.join(TARGET_BINARY));
        }
        if scenario.loose_binary {
            make_executable(&sim.home().join(".local/bin").join(TARGET_BINARY));
        }
        if scenario.os_package {
            make_executable(&sim.os_package_bin().join(TARGET_BINARY));
        }
        for dir in sim.shadow_dirs() {
            make_executable(&dir.join(TARGET_BINARY));
        }

        sim
    }

    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    pub fn system_bin(&self) -> PathBuf {
        self.root.path().join("usr/bin")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.path().join("tools")
    }

    pub fn os_package_bin(&self) -> PathBuf {
        self.root.path().join("opt/claude/bin")
    }

    pub fn shadow_dirs(&self) -> Vec<PathBuf> {
        let count = self.world.lock().unwrap().scenario.shadowed_copies;
        (0..count)
            .map(|i| self.root.path().join(format!("shadow/{:02}/bin", i)))
            .collect()
    }

    pub fn nvm_dir(&self) -> PathBuf {
        self.home().join(".nvm")
    }

    /// Host as a fresh login shell would see it (profile not sourced)
    pub fn host(&self) -> Host {
        self.host_with(OsFamily::Linux)
    }

    pub fn host_with(&self, os: OsFamily) -> Host {
        let mut dirs = vec![
            self.system_bin(),
            self.home().join(".local/bin"),
            self.os_package_bin(),
            self.tools_dir(),
        ];
        dirs.extend(self.shadow_dirs());
        let path = std::env::join_paths(dirs).unwrap();
        Host::new(self.home(), path, ShellKind::Bash, os)
    }

    /// Default config with system paths moved under the sandbox
    pub fn config(&self) -> InstallerConfig {
        let mut config = InstallerConfig::default();
        config.target.candidate_paths = vec![
            self.system_bin().join(TARGET_BINARY).to_string_lossy().to_string(),
            self.root
                .path()
                .join("usr/local/bin")
                .join(TARGET_BINARY)
                .to_string_lossy()
                .to_string(),
            "~/.local/bin/claude".to_string(),
            "~/.nvm/versions/node/*/bin/claude".to_string(),
        ];
        config.optional_tools = vec![OptionalTool {
            name: "ripgrep".to_string(),
            binary: "rg".to_string(),
            install: vec![
                "sudo".to_string(),
                "apt-get".to_string(),
                "install".to_string(),
                "-y".to_string(),
                "ripgrep".to_string(),
            ],
            requires: Some("apt-get".to_string()),
        }];
        config
    }

    pub fn calls(&self) -> Vec<String> {
        self.world.lock().unwrap().calls.clone()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn npm_globals(&self, bin_dir: &Path) -> BTreeSet<String> {
        self.world
            .lock()
            .unwrap()
            .npm_globals
            .get(bin_dir)
            .cloned()
            .unwrap_or_default()
    }

    pub fn dpkg_installed(&self, package: &str) -> bool {
        self.world.lock().unwrap().dpkg.contains(package)
    }

    pub fn registry(&self) -> String {
        self.world.lock().unwrap().registry.clone()
    }

    fn handle(&self, world: &mut World, program: &Path, args: &[String], env: &[(String, String)]) -> Result<CommandOutput, RunError> {
        let name = program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let bin_dir = program.parent().map(Path::to_path_buf).unwrap_or_default();

        match (name.as_str(), args.as_slice()) {
            ("sudo", ["env", path_var, inner, rest @ ..]) if path_var.starts_with("PATH=") => {
                let rest: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
                self.handle(world, Path::new(inner), &rest, env)
            }
            ("sudo", [inner, rest @ ..]) => {
                let rest: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
                self.handle(world, Path::new(inner), &rest, env)
            }

            ("node", ["--version"]) => {
                if program.starts_with(self.nvm_dir()) {
                    let version = program
                        .parent()
                        .and_then(|bin| bin.parent())
                        .and_then(|dir| dir.file_name())
                        .map(|v| v.to_string_lossy().to_string())
                        .unwrap_or_default();
                    ok(format!("{}\n", version))
                } else {
                    match world.scenario.system_node {
                        Some(major) => ok(format!("v{}.20.4\n", major)),
                        None => fail(127, "node: not found"),
                    }
                }
            }

            ("npm", ["list", "-g", "--depth=0", package]) => {
                let installed = world
                    .npm_globals
                    .get(&bin_dir)
                    .map(|s| s.contains(*package))
                    .unwrap_or(false);
                if installed {
                    ok(format!("{}\n└── {}@1.0.0\n", bin_dir.display(), package))
                } else {
                    fail(1, "")
                }
            }
            ("npm", ["uninstall", "-g", package]) => {
                if world.scenario.fail_npm_uninstall {
                    return fail(243, "npm ERR! code EACCES");
                }
                let set = world.npm_globals.entry(bin_dir.clone()).or_default();
                set.remove(*package);
                if *package == TARGET_PACKAGE {
                    let _ = fs::remove_file(bin_dir.join(TARGET_BINARY));
                }
                ok("removed 1 package\n")
            }
            ("npm", ["install", "-g", spec]) => {
                if world.scenario.fail_target_install {
                    return fail(1, "npm ERR! 404 Not Found");
                }
                let package = spec.trim_end_matches("@latest").to_string();
                world.npm_globals.entry(bin_dir.clone()).or_default().insert(package);
                make_executable(&bin_dir.join(TARGET_BINARY));
                ok("added 1 package\n")
            }
            ("npm", ["config", "set", "registry", url]) => {
                world.registry = url.to_string();
                let npmrc = self.home().join(".npmrc");
                let mut content: String = fs::read_to_string(&npmrc)
                    .unwrap_or_default()
                    .lines()
                    .filter(|l| !l.starts_with("registry="))
                    .map(|l| format!("{}\n", l))
                    .collect();
                content.push_str(&format!("registry={}\n", url));
                fs::write(&npmrc, content).unwrap();
                ok("")
            }
            ("npm", ["config", "get", "registry"]) => ok(format!("{}\n", world.registry)),
            ("npm", ["prefix", "-g"]) => ok(format!(
                "{}\n",
                bin_dir.parent().unwrap_or(&bin_dir).display()
            )),

            ("claude", ["--version"]) => {
                if world.scenario.fail_target_version {
                    fail(1, "segfault")
                } else {
                    ok("2.0.0 (Claude Code)\n")
                }
            }

            ("dpkg", ["-s", package]) => {
                if world.dpkg.contains(*package) {
                    ok(format!("Package: {}\nStatus: install ok installed\n", package))
                } else {
                    fail(1, "dpkg-query: package is not installed")
                }
            }
            ("apt-get", ["remove", "-y", package]) | ("dpkg", ["-r", package]) => {
                if world.scenario.fail_apt_remove {
                    return fail(100, "E: Could not get lock /var/lib/dpkg/lock-frontend");
                }
                world.dpkg.remove(*package);
                let _ = fs::remove_file(self.os_package_bin().join(TARGET_BINARY));
                ok("")
            }
            ("apt-get", ["install", "-y", _package]) => {
                if world.scenario.fail_optional {
                    fail(100, "E: Unable to locate package")
                } else {
                    make_executable(&self.tools_dir().join("rg"));
                    ok("")
                }
            }

            ("curl", args) => {
                if !world.scenario.network_ok {
                    return fail(28, "curl: (28) Connection timed out after 10001 milliseconds");
                }
                let out = args
                    .iter()
                    .position(|a| *a == "-o")
                    .and_then(|i| args.get(i + 1))
                    .expect("curl -o <file>");
                fs::write(out, "archive").unwrap();
                ok("")
            }
            ("tar", ["-xzf", _archive, "-C", dest]) => {
                let root = Path::new(dest).join("nvm-0.40.1");
                fs::create_dir_all(&root).unwrap();
                fs::write(root.join("nvm.sh"), "# nvm\n").unwrap();
                ok("")
            }

            ("bash", ["-c", script]) => {
                let nvm_dir = env
                    .iter()
                    .find(|(k, _)| k == "NVM_DIR")
                    .map(|(_, v)| PathBuf::from(v))
                    .expect("NVM_DIR exported");
                if !nvm_dir.join("nvm.sh").exists() {
                    return fail(1, "nvm.sh: No such file or directory");
                }
                let major = script
                    .split("nvm install ")
                    .nth(1)
                    .and_then(|rest| rest.split_whitespace().next())
                    .expect("nvm install <major>");
                let version = format!("v{}.11.0", major);
                let bin = nvm_dir.join("versions/node").join(&version).join("bin");
                make_executable(&bin.join("node"));
                make_executable(&bin.join("npm"));
                ok(format!(
                    "Now using node {} (npm v10.9.0)\ndefault -> {} ({})\n{}\n",
                    version,
                    major,
                    version,
                    bin.join("node").display()
                ))
            }

            ("rm", ["-rf", path]) => {
                let path = Path::new(path);
                if path.is_dir() {
                    let _ = fs::remove_dir_all(path);
                } else {
                    let _ = fs::remove_file(path);
                }
                ok("")
            }

            _ => fail(127, &format!("{}: command not simulated", name)),
        }
    }
}

#[async_trait]
impl CommandRunner for SimHost {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        let mut world = self.world.lock().unwrap();
        world.calls.push(spec.display());

        if !Path::new(&spec.program).is_absolute() {
            return Err(RunError::NotFound(spec.program.clone()));
        }
        self.handle(&mut world, Path::new(&spec.program), &spec.args, &spec.env)
    }
}
