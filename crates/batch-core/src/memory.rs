//! In-memory host collaborators for tests and single-process deployments.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use batch_model::{BuildId, NodeLabel, Priority, ProjectName, ProjectSpec};

use crate::{
    Authorizer, BatchTask, BuildStore, Enqueue, ProjectDirectory, ProjectView, RunLog,
    TaskRegistry,
};

/// Project directory backed by a map.
#[derive(Default)]
pub struct InMemoryDirectory {
    projects: RwLock<HashMap<ProjectName, ProjectEntry>>,
}

struct ProjectEntry {
    display_name: String,
    tasks: Option<Arc<TaskRegistry>>,
    last_build: Option<BuildId>,
    last_built_on: Option<NodeLabel>,
    blocked: Option<String>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project or rewrite its configuration.
    ///
    /// The task set is swapped as a whole; build history and block state survive.
    pub fn register(&self, spec: &ProjectSpec) {
        let tasks = spec
            .tasks
            .clone()
            .map(|specs| Arc::new(TaskRegistry::new(spec.name.clone(), specs)));

        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        match projects.get_mut(&spec.name) {
            Some(entry) => {
                entry.display_name = spec.display_name().to_string();
                entry.tasks = tasks;
            }
            None => {
                projects.insert(
                    spec.name.clone(),
                    ProjectEntry {
                        display_name: spec.display_name().to_string(),
                        tasks,
                        last_build: None,
                        last_built_on: None,
                        blocked: None,
                    },
                );
            }
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        projects.remove(&ProjectName::from(name)).is_some()
    }

    /// Record a new build of `name` and make it the latest one.
    ///
    /// Returns `None` for unknown projects.
    pub fn record_build(&self, name: &str, node: Option<NodeLabel>) -> Option<BuildId> {
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        let entry = projects.get_mut(&ProjectName::from(name))?;

        let number = entry.last_build.as_ref().map_or(1, |b| b.number + 1);
        let build = BuildId::new(name, number);
        entry.last_build = Some(build.clone());
        if node.is_some() {
            entry.last_built_on = node;
        }
        Some(build)
    }

    /// Set or clear the block reason of `name`.
    pub fn set_blocked(&self, name: &str, reason: Option<&str>) {
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = projects.get_mut(&ProjectName::from(name)) {
            entry.blocked = reason.map(str::to_string);
        }
    }

    pub fn names(&self) -> Vec<ProjectName> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = projects.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ProjectDirectory for InMemoryDirectory {
    fn project(&self, full_name: &str) -> Option<ProjectView> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        let (name, entry) = projects.get_key_value(&ProjectName::from(full_name))?;
        Some(ProjectView {
            name: name.clone(),
            display_name: entry.display_name.clone(),
            last_build: entry.last_build.clone(),
            last_built_on: entry.last_built_on.clone(),
            blocked: entry.blocked.clone(),
            tasks: entry.tasks.clone(),
        })
    }
}

/// Build store keeping run logs in a map. Nothing is persisted.
#[derive(Default)]
pub struct InMemoryBuildStore {
    logs: RwLock<HashMap<BuildId, Arc<RunLog>>>,
}

impl InMemoryBuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of builds with an attached run log.
    pub fn attached(&self) -> usize {
        self.logs.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl BuildStore for InMemoryBuildStore {
    fn run_log(&self, build: &BuildId) -> Option<Arc<RunLog>> {
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        logs.get(build).cloned()
    }

    fn attach_run_log(&self, build: &BuildId, log: Arc<RunLog>) {
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        logs.insert(build.clone(), log);
    }
}

/// Queue that only records what was submitted.
#[derive(Default)]
pub struct RecordingQueue {
    items: Mutex<Vec<(Arc<BatchTask>, Priority)>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<(Arc<BatchTask>, Priority)> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Enqueue for RecordingQueue {
    fn enqueue(&self, task: Arc<BatchTask>, priority: Priority) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((task, priority));
    }
}

/// Permits every request.
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can_execute(&self, _principal: Option<&str>, _task: &BatchTask) -> bool {
        true
    }
}

/// Denies every request.
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn can_execute(&self, _principal: Option<&str>, _task: &BatchTask) -> bool {
        false
    }
}

/// Permits only the listed principals.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    principals: Vec<String>,
}

impl AllowList {
    pub fn new(principals: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            principals: principals.into_iter().map(Into::into).collect(),
        }
    }
}

impl Authorizer for AllowList {
    fn can_execute(&self, principal: Option<&str>, _task: &BatchTask) -> bool {
        principal.is_some_and(|p| self.principals.iter().any(|allowed| allowed == p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_model::BatchTaskSpec;

    #[test]
    fn record_build_numbers_builds() {
        let dir = InMemoryDirectory::new();
        dir.register(&ProjectSpec::new("app"));

        assert_eq!(dir.record_build("app", None), Some(BuildId::new("app", 1)));
        assert_eq!(
            dir.record_build("app", Some(NodeLabel::from("n1"))),
            Some(BuildId::new("app", 2))
        );
        assert!(dir.record_build("nope", None).is_none());

        let view = dir.project("app").unwrap();
        assert_eq!(view.last_build, Some(BuildId::new("app", 2)));
        assert_eq!(view.last_built_on, Some(NodeLabel::from("n1")));
    }

    #[test]
    fn reregister_swaps_tasks_but_keeps_history() {
        let dir = InMemoryDirectory::new();
        dir.register(&ProjectSpec::new("app").with_task(BatchTaskSpec::new("old", "true")));
        dir.record_build("app", None);

        dir.register(&ProjectSpec::new("app").with_task(BatchTaskSpec::new("new", "true")));

        let view = dir.project("app").unwrap();
        let tasks = view.tasks.unwrap();
        assert!(tasks.find("old").is_none());
        assert!(tasks.find("new").is_some());
        assert_eq!(view.last_build, Some(BuildId::new("app", 1)));
    }

    #[test]
    fn allow_list_requires_known_principal() {
        let task = TaskRegistry::new(ProjectName::from("app"), [BatchTaskSpec::new("t", "true")])
            .find("t")
            .unwrap();
        let auth = AllowList::new(["admin"]);
        assert!(auth.can_execute(Some("admin"), &task));
        assert!(!auth.can_execute(Some("guest"), &task));
        assert!(!auth.can_execute(None, &task));
    }

    #[test]
    fn remove_and_names() {
        let dir = InMemoryDirectory::new();
        dir.register(&ProjectSpec::new("b"));
        dir.register(&ProjectSpec::new("a"));
        assert_eq!(dir.names(), [ProjectName::from("a"), ProjectName::from("b")]);
        assert!(dir.remove("a"));
        assert!(dir.project("a").is_none());
    }
}
