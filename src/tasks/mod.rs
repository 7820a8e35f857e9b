//! Named tasks with predecessors.
//!
//! A [`TaskGraph`] is built once at startup with [`TaskGraphBuilder`] and can
//! be invoked any number of times. Each invocation runs every task it needs
//! exactly once: the predecessors of a task, in declared order, then its body.
//! The first failing body ends the invocation and nothing that depends on it
//! runs.

mod builtin;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use thiserror::Error;

pub use builtin::{standard_tasks, TaskName};

/// What a task body returns.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Task bodies receive the graph so they can invoke other tasks later (the
/// dev server re-runs `prepare` on source changes).
type TaskBody = Arc<dyn Fn(TaskGraph) -> TaskFuture + Send + Sync>;

struct TaskNode {
    predecessors: Vec<String>,
    body: TaskBody,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Unknown task `{0}`")]
    Unknown(String),

    #[error("Task `{task}` depends on unknown task `{predecessor}`")]
    UnknownPredecessor { task: String, predecessor: String },

    #[error("Task dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("Task `{task}` failed")]
    Failed {
        task: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Where a task is within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    RunningPredecessors,
    RunningBody,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// A task that reached a terminal state during an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub name: String,
    pub state: TaskState,
    pub elapsed: Duration,
}

/// Outcomes of a successful invocation, in the order tasks finished.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub tasks: Vec<TaskOutcome>,
}

impl RunReport {
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Default)]
pub struct TaskGraphBuilder {
    tasks: HashMap<String, TaskNode>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Registering a name again replaces the earlier task.
    pub fn task<F, Fut>(mut self, name: &str, predecessors: &[&str], body: F) -> Self
    where
        F: Fn(TaskGraph) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let body: TaskBody = Arc::new(move |graph: TaskGraph| -> TaskFuture { Box::pin(body(graph)) });
        self.tasks.insert(
            name.to_string(),
            TaskNode {
                predecessors: predecessors.iter().map(|p| p.to_string()).collect(),
                body,
            },
        );
        self
    }

    pub fn build(self) -> TaskGraph {
        TaskGraph {
            tasks: Arc::new(self.tasks),
        }
    }
}

/// Cheap to clone; clones share the same task definitions.
#[derive(Clone)]
pub struct TaskGraph {
    tasks: Arc<HashMap<String, TaskNode>>,
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::new()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered task names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The order an invocation of `requested` would run tasks in.
    ///
    /// Fails on unknown names and dependency cycles, which are configuration
    /// errors caught before anything runs.
    pub fn plan<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>, TaskError> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut order = Vec::new();
        let mut path = Vec::new();

        for name in requested {
            let name = name.as_ref();
            if !self.contains(name) {
                return Err(TaskError::Unknown(name.to_string()));
            }
            self.visit(name, &mut marks, &mut path, &mut order)?;
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<(), TaskError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(name.to_string());
                return Err(TaskError::Cycle(cycle));
            }
            None => {}
        }

        // Callers only pass registered names.
        let Some(node) = self.tasks.get(name) else {
            return Err(TaskError::Unknown(name.to_string()));
        };

        marks.insert(name, Mark::Visiting);
        path.push(name);
        for predecessor in &node.predecessors {
            if !self.contains(predecessor) {
                return Err(TaskError::UnknownPredecessor {
                    task: name.to_string(),
                    predecessor: predecessor.clone(),
                });
            }
            self.visit(predecessor, marks, path, order)?;
        }
        path.pop();
        marks.insert(name, Mark::Done);
        order.push(name.to_string());

        Ok(())
    }

    /// Run `requested` and everything they depend on, as one invocation.
    pub async fn run<S: AsRef<str>>(&self, requested: &[S]) -> Result<RunReport, TaskError> {
        self.plan(requested)?;

        let mut invocation = Invocation::default();
        for name in requested {
            self.execute(name.as_ref(), &mut invocation).await?;
        }

        Ok(RunReport {
            tasks: invocation.finished,
        })
    }

    fn execute<'a>(
        &'a self,
        name: &'a str,
        invocation: &'a mut Invocation,
    ) -> BoxFuture<'a, Result<(), TaskError>> {
        Box::pin(async move {
            match invocation.state(name) {
                TaskState::Pending => {}
                TaskState::Succeeded => return Ok(()),
                // plan() rejected cycles and a failure ends the invocation, so
                // a task is never reached again while running or failed.
                state => {
                    tracing::warn!(task = name, ?state, "Task reached twice in one invocation");
                    return Ok(());
                }
            }

            let Some(node) = self.tasks.get(name) else {
                return Err(TaskError::Unknown(name.to_string()));
            };

            let started = Instant::now();
            invocation.set(name, TaskState::RunningPredecessors);
            for predecessor in &node.predecessors {
                if let Err(e) = self.execute(predecessor, invocation).await {
                    invocation.finish(name, TaskState::Failed, started.elapsed());
                    return Err(e);
                }
            }

            invocation.set(name, TaskState::RunningBody);
            tracing::info!("Starting '{}'...", name);
            let body_started = Instant::now();

            match (node.body)(self.clone()).await {
                Ok(()) => {
                    let elapsed = body_started.elapsed();
                    tracing::info!("Finished '{}' after {:?}", name, elapsed);
                    invocation.finish(name, TaskState::Succeeded, elapsed);
                    Ok(())
                }
                Err(source) => {
                    tracing::error!("'{}' errored after {:?}: {:#}", name, body_started.elapsed(), source);
                    invocation.finish(name, TaskState::Failed, started.elapsed());
                    Err(TaskError::Failed {
                        task: name.to_string(),
                        source,
                    })
                }
            }
        })
    }
}

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done,
}

/// State of every task touched by one invocation.
#[derive(Default)]
struct Invocation {
    states: HashMap<String, TaskState>,
    finished: Vec<TaskOutcome>,
}

impl Invocation {
    fn state(&self, name: &str) -> TaskState {
        self.states.get(name).copied().unwrap_or(TaskState::Pending)
    }

    fn set(&mut self, name: &str, state: TaskState) {
        self.states.insert(name.to_string(), state);
    }

    fn finish(&mut self, name: &str, state: TaskState, elapsed: Duration) {
        debug_assert!(state.is_terminal());
        self.set(name, state);
        self.finished.push(TaskOutcome {
            name: name.to_string(),
            state,
            elapsed,
        });
    }
}
