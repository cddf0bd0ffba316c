// Task list state machine with write-through persistence

use crate::kv::KvStore;
use crate::task::{Task, display_now, next_id};
use eyre::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Storage key holding the active list
pub const TASKS_KEY: &str = "tasks";
/// Storage key holding the completed list
pub const COMPLETED_KEY: &str = "completedTasks";

/// Pending title/description fields of the task form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: String,
}

impl Draft {
    pub fn clear(&mut self) {
        self.title.clear();
        self.description.clear();
    }
}

/// Why an input was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another active task already has this title (case-insensitive)
    DuplicateTitle,
}

/// Outcome of a task store operation
///
/// Rejected and ignored inputs are reported here rather than as errors;
/// only storage failures surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added { id: i64 },
    EditStarted { index: usize },
    Updated { id: i64 },
    EditCancelled,
    Completed { id: i64 },
    Deleted { id: i64 },
    DeletedCompleted { id: i64 },
    Cleared,
    Rejected(Rejection),
    /// Empty title, stale index, or no edit in progress
    Ignored,
}

/// Active and completed task lists plus the edit cursor
///
/// Every mutating operation writes both lists to the backing [`KvStore`]
/// before returning, except [`TaskStore::clear_all`], which removes the keys.
pub struct TaskStore<K: KvStore> {
    kv: K,
    active: Vec<Task>,
    completed: Vec<Task>,
    edit_cursor: Option<usize>,
    draft: Draft,
}

impl<K: KvStore> TaskStore<K> {
    /// Hydrate both lists from `kv`
    ///
    /// Missing or unparsable entries start as empty lists. Entries that break
    /// the list invariants are dropped with a warning.
    pub fn open(kv: K) -> Result<Self> {
        let mut seen_ids = HashSet::new();
        let active = sanitize_active(load_list(&kv, TASKS_KEY)?, &mut seen_ids);
        let completed = sanitize_completed(load_list(&kv, COMPLETED_KEY)?, &mut seen_ids);

        info!(
            active = active.len(),
            completed = completed.len(),
            "Hydrated task lists"
        );

        Ok(Self {
            kv,
            active,
            completed,
            edit_cursor: None,
            draft: Draft::default(),
        })
    }

    pub fn active(&self) -> &[Task] {
        &self.active
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn edit_cursor(&self) -> Option<usize> {
        self.edit_cursor
    }

    pub fn is_editing(&self) -> bool {
        self.edit_cursor.is_some()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Replace the pending form fields
    pub fn set_draft(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.draft.title = title.into();
        self.draft.description = description.into();
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn into_kv(self) -> K {
        self.kv
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Append a new active task
    pub fn add(&mut self, title: &str, description: &str) -> Result<Change> {
        let title = title.trim();
        if title.is_empty() {
            debug!("add: empty title, ignoring");
            return Ok(Change::Ignored);
        }

        if self.active.iter().any(|t| t.title_matches(title)) {
            debug!(title, "add: duplicate title, rejecting");
            self.draft.title.clear();
            return Ok(Change::Rejected(Rejection::DuplicateTitle));
        }

        let id = next_id(self.active.iter().chain(self.completed.iter()));
        self.active.push(Task::new(id, title, description.trim()));
        self.draft.clear();
        self.persist()?;

        debug!(id, "add: appended task");
        Ok(Change::Added { id })
    }

    /// Point the edit cursor at `index` and pre-fill the draft
    pub fn begin_edit(&mut self, index: usize) -> Result<Change> {
        let Some(task) = self.active.get(index) else {
            debug!(index, "begin_edit: index out of range");
            return Ok(Change::Ignored);
        };

        self.draft.title = task.title.clone();
        self.draft.description = task.description.clone();
        self.edit_cursor = Some(index);
        Ok(Change::EditStarted { index })
    }

    /// Apply `title` and `description` to the task under the edit cursor
    pub fn commit_edit(&mut self, title: &str, description: &str) -> Result<Change> {
        let Some(index) = self.edit_cursor else {
            debug!("commit_edit: not editing");
            return Ok(Change::Ignored);
        };

        let title = title.trim();
        if title.is_empty() {
            debug!(index, "commit_edit: empty title, ignoring");
            return Ok(Change::Ignored);
        }

        let duplicate = self
            .active
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.title_matches(title));
        if duplicate {
            debug!(index, title, "commit_edit: duplicate title, rejecting");
            self.end_edit();
            return Ok(Change::Rejected(Rejection::DuplicateTitle));
        }

        let task = &mut self.active[index];
        task.title = title.to_string();
        task.description = description.trim().to_string();
        let id = task.id;

        self.end_edit();
        self.persist()?;
        Ok(Change::Updated { id })
    }

    /// Abandon the edit in progress
    pub fn cancel_edit(&mut self) -> Change {
        if self.edit_cursor.is_none() {
            return Change::Ignored;
        }
        self.end_edit();
        Change::EditCancelled
    }

    /// Single form action: commit the edit in progress, or add a new task
    pub fn submit(&mut self, title: &str, description: &str) -> Result<Change> {
        if self.is_editing() {
            self.commit_edit(title, description)
        } else {
            self.add(title, description)
        }
    }

    /// [`TaskStore::submit`] using the current draft fields
    pub fn submit_draft(&mut self) -> Result<Change> {
        let Draft { title, description } = self.draft.clone();
        self.submit(&title, &description)
    }

    /// Move the active task at `index` to the end of the completed list
    pub fn complete(&mut self, index: usize) -> Result<Change> {
        if index >= self.active.len() {
            debug!(index, "complete: index out of range");
            return Ok(Change::Ignored);
        }

        let mut task = self.active.remove(index);
        task.completed_on = Some(display_now());
        let id = task.id;
        self.completed.push(task);
        self.cursor_after_removal(index);
        self.persist()?;

        debug!(id, "complete: moved task");
        Ok(Change::Completed { id })
    }

    /// Remove the active task at `index`
    pub fn delete(&mut self, index: usize) -> Result<Change> {
        if index >= self.active.len() {
            debug!(index, "delete: index out of range");
            return Ok(Change::Ignored);
        }

        let task = self.active.remove(index);
        self.cursor_after_removal(index);
        self.persist()?;
        Ok(Change::Deleted { id: task.id })
    }

    /// Remove the completed task at `index`
    pub fn delete_completed(&mut self, index: usize) -> Result<Change> {
        if index >= self.completed.len() {
            debug!(index, "delete_completed: index out of range");
            return Ok(Change::Ignored);
        }

        let task = self.completed.remove(index);
        self.persist()?;
        Ok(Change::DeletedCompleted { id: task.id })
    }

    /// Empty both lists and drop their storage keys
    pub fn clear_all(&mut self) -> Result<Change> {
        self.active.clear();
        self.completed.clear();
        self.end_edit();

        self.kv
            .remove(TASKS_KEY)
            .wrap_err_with(|| format!("Failed to remove {}", TASKS_KEY))?;
        self.kv
            .remove(COMPLETED_KEY)
            .wrap_err_with(|| format!("Failed to remove {}", COMPLETED_KEY))?;

        info!("Cleared all tasks");
        Ok(Change::Cleared)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn end_edit(&mut self) {
        self.edit_cursor = None;
        self.draft.clear();
    }

    /// Keep the cursor on the same logical task after `index` is removed
    fn cursor_after_removal(&mut self, index: usize) {
        match self.edit_cursor {
            Some(cursor) if cursor == index => self.end_edit(),
            Some(cursor) if cursor > index => self.edit_cursor = Some(cursor - 1),
            _ => {}
        }
    }

    fn persist(&mut self) -> Result<()> {
        // Completed first: an interrupted move leaves the task in both lists,
        // and hydration keeps the active copy.
        write_list(&mut self.kv, COMPLETED_KEY, &self.completed)?;
        write_list(&mut self.kv, TASKS_KEY, &self.active)?;
        Ok(())
    }
}

fn load_list<K: KvStore>(kv: &K, key: &str) -> Result<Vec<Task>> {
    let Some(bytes) = kv.get(key).wrap_err_with(|| format!("Failed to read {}", key))? else {
        return Ok(Vec::new());
    };

    match serde_json::from_slice::<Vec<Task>>(&bytes) {
        Ok(tasks) => Ok(tasks),
        Err(e) => {
            warn!(key, error = ?e, "Stored list is not valid JSON, starting empty");
            Ok(Vec::new())
        }
    }
}

fn write_list<K: KvStore>(kv: &mut K, key: &str, tasks: &[Task]) -> Result<()> {
    let bytes = serde_json::to_vec(tasks).context("Failed to serialize task list")?;
    kv.set(key, &bytes)
        .wrap_err_with(|| format!("Failed to write {}", key))
}

fn sanitize_active(tasks: Vec<Task>, seen_ids: &mut HashSet<i64>) -> Vec<Task> {
    let mut kept: Vec<Task> = Vec::with_capacity(tasks.len());
    for mut task in tasks {
        if task.title.trim().is_empty() {
            warn!(id = task.id, "Dropping stored task with empty title");
            continue;
        }
        if !seen_ids.insert(task.id) {
            warn!(id = task.id, "Dropping stored task with duplicate id");
            continue;
        }
        if kept.iter().any(|t| t.title_matches(&task.title)) {
            warn!(id = task.id, title = %task.title, "Dropping stored task with duplicate title");
            continue;
        }
        task.completed_on = None;
        kept.push(task);
    }
    kept
}

fn sanitize_completed(tasks: Vec<Task>, seen_ids: &mut HashSet<i64>) -> Vec<Task> {
    let mut kept = Vec::with_capacity(tasks.len());
    for task in tasks {
        if task.title.trim().is_empty() {
            warn!(id = task.id, "Dropping stored task with empty title");
            continue;
        }
        if !task.is_completed() {
            warn!(id = task.id, "Dropping completed task without completedOn");
            continue;
        }
        if !seen_ids.insert(task.id) {
            warn!(id = task.id, "Dropping stored task with duplicate id");
            continue;
        }
        kept.push(task);
    }
    kept
}
