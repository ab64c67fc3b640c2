//! Named build tasks.
//!
//! A task has dependencies and an optional action. Running a task runs its
//! dependencies first (depth-first, in declaration order), each at most once
//! per run, then its own action.

use crate::config::BuildConfig;
use crate::error::BuildError;
use futures::future::LocalBoxFuture;
use std::collections::HashSet;
use std::time::Instant;

pub type TaskFn = for<'a> fn(&'a BuildConfig) -> LocalBoxFuture<'a, Result<(), BuildError>>;

pub struct Task {
    pub name: String,
    pub deps: Vec<String>,
    pub action: Option<TaskFn>,
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `scripts` runs the bundle task; `build` and `default` depend on it.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .task("scripts", &[], Some(crate::scripts::scripts_task))
            .task("build", &["scripts"], None)
            .task("default", &["scripts"], None);
        registry
    }

    /// Registers `name`, replacing an earlier task of the same name.
    pub fn task(&mut self, name: &str, deps: &[&str], action: Option<TaskFn>) -> &mut Self {
        let task = Task {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            action,
        };
        match self.tasks.iter_mut().find(|t| t.name == name) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    /// Order in which `name` and its dependencies run.
    pub fn execution_order(&self, name: &str) -> Result<Vec<&Task>, BuildError> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = HashSet::new();
        self.visit(name, &mut visiting, &mut done, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<&'a Task>,
    ) -> Result<(), BuildError> {
        if done.contains(name) {
            return Ok(());
        }
        if !visiting.insert(name.to_string()) {
            return Err(BuildError::TaskCycle(name.to_string()));
        }
        let task = self
            .get(name)
            .ok_or_else(|| BuildError::UnknownTask(name.to_string()))?;
        for dep in &task.deps {
            self.visit(dep, visiting, done, order)?;
        }
        visiting.remove(name);
        done.insert(name.to_string());
        order.push(task);
        Ok(())
    }

    pub async fn run(&self, name: &str, config: &BuildConfig) -> Result<(), BuildError> {
        for task in self.execution_order(name)? {
            log::info!("Starting '{}'...", task.name);
            let started = Instant::now();
            if let Some(action) = task.action {
                action(config).await?;
            }
            log::info!(
                "Finished '{}' after {:.2?}",
                task.name,
                started.elapsed()
            );
        }
        Ok(())
    }
}
