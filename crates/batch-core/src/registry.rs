use std::sync::Arc;

use batch_model::{BatchTaskSpec, ProjectName};

use crate::BatchTask;

/// The batch tasks configured for one project, in configuration order.
///
/// A configuration rewrite replaces the whole registry; tasks are never
/// mutated in place.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    owner: ProjectName,
    tasks: Vec<Arc<BatchTask>>,
}

impl TaskRegistry {
    /// Bind every spec to `owner`.
    pub fn new(owner: ProjectName, specs: impl IntoIterator<Item = BatchTaskSpec>) -> Self {
        let tasks = specs
            .into_iter()
            .map(|spec| Arc::new(BatchTask::bind(spec, owner.clone())))
            .collect();
        Self { owner, tasks }
    }

    pub fn owner(&self) -> &ProjectName {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BatchTask>> {
        self.tasks.iter()
    }

    /// Exact name match; the first task wins on duplicate names.
    pub fn find(&self, name: &str) -> Option<Arc<BatchTask>> {
        self.tasks.iter().find(|t| t.name() == name).cloned()
    }

    /// Task whose name has the smallest edit distance to `name`.
    ///
    /// Only meant for "did you mean" diagnostics. Ties go to the earlier task.
    pub fn find_nearest(&self, name: &str) -> Option<Arc<BatchTask>> {
        self.tasks
            .iter()
            .min_by_key(|t| edit_distance(name, t.name()))
            .cloned()
    }
}

/// Levenshtein distance over Unicode scalar values.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
