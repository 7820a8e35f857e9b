use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::process::run_command;
use super::{BuildOptions, Toolkit, ToolkitError};

/// One invocation of the cordova CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CordovaCommand {
    Create {
        target_dir: PathBuf,
        app_id: String,
        app_name: String,
        link_www: Option<PathBuf>,
    },
    Prepare {
        platform: Option<String>,
    },
    Build(BuildOptions),
    Run {
        platforms: Vec<String>,
        options: Vec<String>,
    },
    Emulate {
        platforms: Vec<String>,
    },
    PlatformAdd(Vec<PathBuf>),
    PluginAdd(Vec<String>),
}

impl CordovaCommand {
    /// Arguments following the program name.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            CordovaCommand::Create {
                target_dir,
                app_id,
                app_name,
                link_www,
            } => {
                args.push("create".into());
                args.push(target_dir.into());
                args.push(app_id.into());
                args.push(app_name.into());
                if let Some(www) = link_www {
                    args.push("--link-to".into());
                    args.push(www.into());
                }
            }
            CordovaCommand::Prepare { platform } => {
                args.push("prepare".into());
                args.extend(platform.iter().map(OsString::from));
            }
            CordovaCommand::Build(options) => {
                args.push("build".into());
                args.extend(options.platforms.iter().map(OsString::from));
                if options.release {
                    args.push("--release".into());
                }
                push_passthrough(&mut args, &options.options);
            }
            CordovaCommand::Run { platforms, options } => {
                args.push("run".into());
                args.extend(platforms.iter().map(OsString::from));
                push_passthrough(&mut args, options);
            }
            CordovaCommand::Emulate { platforms } => {
                args.push("emulate".into());
                args.extend(platforms.iter().map(OsString::from));
            }
            CordovaCommand::PlatformAdd(dirs) => {
                args.push("platform".into());
                args.push("add".into());
                args.extend(dirs.iter().map(OsString::from));
            }
            CordovaCommand::PluginAdd(plugins) => {
                args.push("plugin".into());
                args.push("add".into());
                args.extend(plugins.iter().map(OsString::from));
            }
        }
        args
    }
}

/// Cordova's own flags (`--device`, `--release`) go before `--`; anything
/// else is for the platform scripts.
fn push_passthrough(args: &mut Vec<OsString>, options: &[String]) {
    let (cordova_flags, platform_flags): (Vec<&String>, Vec<&String>) = options
        .iter()
        .partition(|opt| matches!(opt.as_str(), "--device" | "--emulator" | "--release" | "--debug"));

    args.extend(cordova_flags.into_iter().map(OsString::from));
    if !platform_flags.is_empty() {
        args.push("--".into());
        args.extend(platform_flags.into_iter().map(OsString::from));
    }
}

/// Runs commands through the `cordova` command line tool.
///
/// Commands are serialized: a second command waits until the running one has
/// finished, so a watch-triggered `prepare` never interleaves with a build.
pub struct CordovaCli {
    program: String,
    lock: Mutex<()>,
}

impl CordovaCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            lock: Mutex::new(()),
        }
    }

    async fn exec(&self, cwd: &Path, command: CordovaCommand) -> Result<(), ToolkitError> {
        let _guard = self.lock.lock().await;
        run_command(&self.program, &command.args(), cwd)
            .await?
            .check()
    }
}

impl Default for CordovaCli {
    fn default() -> Self {
        Self::new("cordova")
    }
}

#[async_trait]
impl Toolkit for CordovaCli {
    async fn create(
        &self,
        target_dir: &Path,
        app_id: &str,
        app_name: &str,
        link_www: Option<&Path>,
    ) -> Result<(), ToolkitError> {
        let cwd = target_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        self.exec(
            cwd,
            CordovaCommand::Create {
                target_dir: target_dir.to_path_buf(),
                app_id: app_id.to_string(),
                app_name: app_name.to_string(),
                link_www: link_www.map(Path::to_path_buf),
            },
        )
        .await
    }

    async fn prepare(&self, root: &Path, platform: Option<&str>) -> Result<(), ToolkitError> {
        self.exec(
            root,
            CordovaCommand::Prepare {
                platform: platform.map(str::to_string),
            },
        )
        .await
    }

    async fn build(&self, root: &Path, options: &BuildOptions) -> Result<(), ToolkitError> {
        self.exec(root, CordovaCommand::Build(options.clone())).await
    }

    async fn run(
        &self,
        root: &Path,
        platforms: &[String],
        options: &[String],
    ) -> Result<(), ToolkitError> {
        self.exec(
            root,
            CordovaCommand::Run {
                platforms: platforms.to_vec(),
                options: options.to_vec(),
            },
        )
        .await
    }

    async fn emulate(&self, root: &Path, platforms: &[String]) -> Result<(), ToolkitError> {
        self.exec(
            root,
            CordovaCommand::Emulate {
                platforms: platforms.to_vec(),
            },
        )
        .await
    }

    async fn add_platforms(&self, root: &Path, dirs: &[PathBuf]) -> Result<(), ToolkitError> {
        self.exec(root, CordovaCommand::PlatformAdd(dirs.to_vec())).await
    }

    async fn add_plugins(&self, root: &Path, plugins: &[String]) -> Result<(), ToolkitError> {
        self.exec(root, CordovaCommand::PluginAdd(plugins.to_vec())).await
    }
}
