use std::sync::Arc;

use clap::ValueEnum;

use super::TaskGraph;
use crate::lint::Linter;
use crate::project::Project;
use crate::scaffold;
use crate::server;
use crate::toolkit::BuildOptions;

/// Tasks available from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum TaskName {
    Jshint,
    Clean,
    Prepare,
    Build,
    Run,
    Emulate,
    Release,
    /// Recreate the build directory by linking `config.xml` and `www/`
    Recreate,
    /// Recreate the build directory with the toolkit's `create`
    Cdvcreate,
    /// Serve the browser platform with live-reload
    Server,
}

impl TaskName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Jshint => "jshint",
            TaskName::Clean => "clean",
            TaskName::Prepare => "prepare",
            TaskName::Build => "build",
            TaskName::Run => "run",
            TaskName::Emulate => "emulate",
            TaskName::Release => "release",
            TaskName::Recreate => "recreate",
            TaskName::Cdvcreate => "cdvcreate",
            TaskName::Server => "server",
        }
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// The task set of a cordova app whose build directory is disposable.
///
/// Every toolkit command runs with the build directory as project root,
/// except `create` which makes it.
pub fn standard_tasks(project: Arc<Project>) -> TaskGraph {
    let p = project;

    TaskGraph::builder()
        .task("jshint", &[], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    Linter::new(p.config.jshint_program.clone())
                        .lint_dir(&p.layout.lint_dir())
                        .await?;
                    Ok(())
                }
            }
        })
        .task("clean", &[], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    scaffold::clean(&p.layout.build_dir).await?;
                    Ok(())
                }
            }
        })
        .task("prepare", &[], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    p.toolkit
                        .prepare(&p.layout.build_dir, Some(p.config.serve_platform.as_str()))
                        .await?;
                    Ok(())
                }
            }
        })
        .task("build", &[], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    p.toolkit
                        .build(&p.layout.build_dir, &BuildOptions::default())
                        .await?;
                    Ok(())
                }
            }
        })
        .task("run", &[], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    p.toolkit
                        .run(&p.layout.build_dir, &p.test_platforms(), &p.config.run_options)
                        .await?;
                    Ok(())
                }
            }
        })
        .task("emulate", &[], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    p.toolkit
                        .emulate(&p.layout.build_dir, &p.test_platforms())
                        .await?;
                    Ok(())
                }
            }
        })
        .task("release", &[], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    p.toolkit
                        .build(&p.layout.build_dir, &BuildOptions::release())
                        .await?;
                    Ok(())
                }
            }
        })
        .task("recreate", &["clean"], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    scaffold::recreate_linked(
                        &p.layout,
                        &p.config.plugins,
                        &p.platforms,
                        p.toolkit.as_ref(),
                    )
                    .await?;
                    Ok(())
                }
            }
        })
        .task("cdvcreate", &["clean"], {
            let p = p.clone();
            move |_: TaskGraph| {
                let p = p.clone();
                async move {
                    scaffold::recreate_scaffolded(
                        &p.layout,
                        &p.config.app_id,
                        &p.manifest.name,
                        &p.config.plugins,
                        &p.platforms,
                        p.toolkit.as_ref(),
                    )
                    .await?;
                    Ok(())
                }
            }
        })
        .task("server", &[], {
            let p = p.clone();
            move |graph: TaskGraph| {
                let p = p.clone();
                async move { server::run(p, graph).await }
            }
        })
        .build()
}
