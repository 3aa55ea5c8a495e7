use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{category_or_default, deserialize_some, non_negative, required_title, DateInput, OwnedEntity};
use crate::database::error::DatabaseError;
use crate::database::order::SortKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }
}

impl FromStr for Priority {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(DatabaseError::invalid(format!("Unknown priority '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub estimated_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_time: f64,
    pub category: String,
    pub priority: Priority,
    /// Display order is insertion order
    pub subtasks: Vec<Subtask>,
}

/// Postgres shape of a todo: priority as text, subtasks as one JSONB document
#[derive(Debug, FromRow)]
pub struct TodoRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_time: f64,
    pub category: String,
    pub priority: String,
    pub subtasks: Json<Vec<Subtask>>,
}

impl TryFrom<TodoRow> for Todo {
    type Error = DatabaseError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            completed: row.completed,
            created_at: row.created_at,
            due_date: row.due_date,
            estimated_time: row.estimated_time,
            category: row.category,
            priority: row
                .priority
                .parse()
                .map_err(|_| DatabaseError::Internal(format!("stored priority '{}'", row.priority)))?,
            subtasks: row.subtasks.0,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub due_date: Option<DateInput>,
    #[serde(default)]
    pub estimated_time: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    /// `null` clears the due date
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<DateInput>>,
    pub estimated_time: Option<f64>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubtask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub estimated_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub estimated_time: Option<f64>,
}

impl Todo {
    pub fn subtask(&self, sub_id: Uuid) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == sub_id)
    }

    fn fresh_subtask_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if self.subtask(id).is_none() {
                return id;
            }
        }
    }

    /// Append a subtask; the id is unique within this todo
    pub fn push_subtask(&mut self, input: NewSubtask) -> Result<Subtask, DatabaseError> {
        let subtask = Subtask {
            id: self.fresh_subtask_id(),
            title: required_title(&input.title, "Subtask")?,
            completed: false,
            estimated_time: non_negative(input.estimated_time.unwrap_or(0.0), "estimatedTime")?,
        };
        self.subtasks.push(subtask.clone());
        Ok(subtask)
    }

    pub fn patch_subtask(&mut self, sub_id: Uuid, patch: SubtaskPatch) -> Result<Subtask, DatabaseError> {
        let subtask = self
            .subtasks
            .iter_mut()
            .find(|s| s.id == sub_id)
            .ok_or_else(|| DatabaseError::not_found("Subtask"))?;

        // Validate everything before writing anything
        let title = patch.title.map(|t| required_title(&t, "Subtask")).transpose()?;
        let estimated_time = patch
            .estimated_time
            .map(|t| non_negative(t, "estimatedTime"))
            .transpose()?;

        if let Some(title) = title {
            subtask.title = title;
        }
        if let Some(completed) = patch.completed {
            subtask.completed = completed;
        }
        if let Some(estimated_time) = estimated_time {
            subtask.estimated_time = estimated_time;
        }
        Ok(subtask.clone())
    }

    pub fn take_subtask(&mut self, sub_id: Uuid) -> Result<Subtask, DatabaseError> {
        let index = self
            .subtasks
            .iter()
            .position(|s| s.id == sub_id)
            .ok_or_else(|| DatabaseError::not_found("Subtask"))?;
        Ok(self.subtasks.remove(index))
    }
}

impl OwnedEntity for Todo {
    type Draft = NewTodo;
    type Patch = TodoPatch;

    const KIND: &'static str = "Todo";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(owner_id: Uuid, draft: NewTodo) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            title: required_title(&draft.title, "Todo")?,
            completed: false,
            created_at: Utc::now(),
            due_date: draft.due_date.map(|d| d.0),
            estimated_time: non_negative(draft.estimated_time.unwrap_or(0.0), "estimatedTime")?,
            category: category_or_default(draft.category),
            priority: draft.priority.unwrap_or_default(),
            subtasks: Vec::new(),
        })
    }

    fn apply(&mut self, patch: TodoPatch) -> Result<(), DatabaseError> {
        let title = patch.title.map(|t| required_title(&t, "Todo")).transpose()?;
        let estimated_time = patch
            .estimated_time
            .map(|t| non_negative(t, "estimatedTime"))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date.map(|d| d.0);
        }
        if let Some(estimated_time) = estimated_time {
            self.estimated_time = estimated_time;
        }
        if let Some(category) = patch.category {
            self.category = category_or_default(Some(category));
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        Ok(())
    }

    fn supports_order(key: SortKey) -> bool {
        matches!(key, SortKey::Created | SortKey::DueDate | SortKey::Priority | SortKey::Title)
    }

    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering {
        match key {
            SortKey::DueDate => self.due_date.cmp(&other.due_date),
            SortKey::Priority => self.priority.rank().cmp(&other.priority.rank()),
            SortKey::Title => self.title.cmp(&other.title),
            _ => self.created_at.cmp(&other.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(title: &str) -> Todo {
        Todo::from_draft(
            Uuid::new_v4(),
            NewTodo {
                title: title.to_string(),
                due_date: None,
                estimated_time: None,
                category: Some("Work".to_string()),
                priority: Some(Priority::High),
            },
        )
        .unwrap()
    }

    fn subtask(title: &str, minutes: f64) -> NewSubtask {
        NewSubtask { title: title.to_string(), estimated_time: Some(minutes) }
    }

    #[test]
    fn new_todo_defaults() {
        let todo = Todo::from_draft(
            Uuid::new_v4(),
            NewTodo { title: "x".into(), due_date: None, estimated_time: None, category: None, priority: None },
        )
        .unwrap();
        assert!(!todo.completed);
        assert_eq!(todo.category, "General");
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.estimated_time, 0.0);
        assert!(todo.subtasks.is_empty());
    }

    #[test]
    fn completing_keeps_other_fields() {
        let mut t = todo("ship it");
        let before = t.clone();
        t.apply(TodoPatch { completed: Some(true), ..Default::default() }).unwrap();

        assert!(t.completed);
        assert_eq!(t.title, before.title);
        assert_eq!(t.category, before.category);
        assert_eq!(t.priority, before.priority);
    }

    #[test]
    fn failed_patch_changes_nothing() {
        let mut t = todo("ship it");
        let before = t.clone();
        let err = t.apply(TodoPatch {
            completed: Some(true),
            estimated_time: Some(-5.0),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn null_due_date_clears_absent_keeps() {
        let patch: TodoPatch = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(patch.due_date, Some(None));

        let patch: TodoPatch = serde_json::from_str(r#"{"title": "t"}"#).unwrap();
        assert_eq!(patch.due_date, None);

        let patch: TodoPatch = serde_json::from_str(r#"{"dueDate": "2024-05-01"}"#).unwrap();
        assert!(matches!(patch.due_date, Some(Some(_))));
    }

    #[test]
    fn subtasks_append_in_order() {
        let mut t = todo("parent");
        let a = t.push_subtask(subtask("a", 5.0)).unwrap();
        let b = t.push_subtask(subtask("b", 10.0)).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(t.subtasks.iter().map(|s| s.title.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn empty_subtask_title_is_invalid() {
        let mut t = todo("parent");
        let err = t.push_subtask(subtask("  ", 0.0)).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidArgument(_)));
        assert!(t.subtasks.is_empty());
    }

    #[test]
    fn removing_first_subtask_keeps_second_intact() {
        let mut t = todo("parent");
        let first = t.push_subtask(subtask("first", 5.0)).unwrap();
        let second = t.push_subtask(subtask("second", 15.0)).unwrap();

        t.take_subtask(first.id).unwrap();

        assert_eq!(t.subtasks, vec![second]);
    }

    #[test]
    fn unknown_subtask_is_not_found() {
        let mut t = todo("parent");
        let missing = Uuid::new_v4();
        assert!(matches!(t.take_subtask(missing), Err(DatabaseError::NotFound(_))));
        assert!(matches!(
            t.patch_subtask(missing, SubtaskPatch::default()),
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[test]
    fn priority_round_trips_through_text() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(p.as_str().parse::<Priority>().unwrap(), p);
        }
        assert!("urgent".parse::<Priority>().is_err());
    }
}
