use uuid::Uuid;

use crate::database::models::{NewSubtask, Subtask, SubtaskPatch, Todo};
use crate::database::{DatabaseError, Repository};

/// Subtasks live inside their todo; every change rewrites the parent in one step
impl Repository<Todo> {
    pub async fn list_subtasks(&self, owner_id: Uuid, todo_id: Uuid) -> Result<Vec<Subtask>, DatabaseError> {
        Ok(self.find(owner_id, todo_id).await?.subtasks)
    }

    pub async fn add_subtask(
        &self,
        owner_id: Uuid,
        todo_id: Uuid,
        input: NewSubtask,
    ) -> Result<(Todo, Subtask), DatabaseError> {
        let todo = self
            .modify(owner_id, todo_id, move |todo| todo.push_subtask(input).map(|_| ()))
            .await?;
        // Appended inside the same atomic write, so it is the last one
        let subtask = todo
            .subtasks
            .last()
            .cloned()
            .ok_or_else(|| DatabaseError::Internal("subtask was not stored".to_string()))?;
        Ok((todo, subtask))
    }

    pub async fn update_subtask(
        &self,
        owner_id: Uuid,
        todo_id: Uuid,
        sub_id: Uuid,
        patch: SubtaskPatch,
    ) -> Result<Todo, DatabaseError> {
        self.modify(owner_id, todo_id, move |todo| todo.patch_subtask(sub_id, patch).map(|_| ()))
            .await
    }

    pub async fn remove_subtask(&self, owner_id: Uuid, todo_id: Uuid, sub_id: Uuid) -> Result<Todo, DatabaseError> {
        self.modify(owner_id, todo_id, move |todo| todo.take_subtask(sub_id).map(|_| ()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewTodo;
    use std::sync::Arc;

    use crate::database::MemoryStore;

    async fn setup() -> (Repository<Todo>, Uuid, Todo) {
        let store = Arc::new(MemoryStore::new());
        let owner = store.seed_user("owner").await;
        let repo: Repository<Todo> = Repository::new(store);
        let todo = repo
            .create(
                owner,
                NewTodo {
                    title: "Plan trip".into(),
                    due_date: None,
                    estimated_time: Some(60.0),
                    category: None,
                    priority: None,
                },
            )
            .await
            .unwrap();
        (repo, owner, todo)
    }

    fn sub(title: &str) -> NewSubtask {
        NewSubtask { title: title.into(), estimated_time: Some(10.0) }
    }

    #[tokio::test]
    async fn add_returns_parent_and_new_subtask() {
        let (repo, owner, todo) = setup().await;
        let (parent, subtask) = repo.add_subtask(owner, todo.id, sub("Book hotel")).await.unwrap();

        assert_eq!(parent.subtasks, vec![subtask.clone()]);
        assert!(!subtask.completed);
        assert_eq!(repo.list_subtasks(owner, todo.id).await.unwrap(), vec![subtask]);
    }

    #[tokio::test]
    async fn remove_keeps_sibling_and_parent_fields() {
        let (repo, owner, todo) = setup().await;
        let (_, first) = repo.add_subtask(owner, todo.id, sub("first")).await.unwrap();
        let (_, second) = repo.add_subtask(owner, todo.id, sub("second")).await.unwrap();

        let parent = repo.remove_subtask(owner, todo.id, first.id).await.unwrap();

        assert_eq!(parent.subtasks, vec![second]);
        assert_eq!(parent.title, todo.title);
        assert_eq!(parent.estimated_time, todo.estimated_time);
        assert_eq!(parent.created_at, todo.created_at);
    }

    #[tokio::test]
    async fn update_marks_completed() {
        let (repo, owner, todo) = setup().await;
        let (_, s) = repo.add_subtask(owner, todo.id, sub("x")).await.unwrap();

        let parent = repo
            .update_subtask(owner, todo.id, s.id, SubtaskPatch { completed: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert!(parent.subtask(s.id).unwrap().completed);
        assert_eq!(parent.subtask(s.id).unwrap().title, "x");
    }

    #[tokio::test]
    async fn other_owner_cannot_reach_subtasks() {
        let (repo, _, todo) = setup().await;
        let stranger = Uuid::new_v4();

        assert!(matches!(
            repo.add_subtask(stranger, todo.id, sub("x")).await,
            Err(DatabaseError::NotFound(_))
        ));
        assert!(matches!(repo.list_subtasks(stranger, todo.id).await, Err(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn unknown_subtask_is_not_found_and_changes_nothing() {
        let (repo, owner, todo) = setup().await;
        let (before, _) = repo.add_subtask(owner, todo.id, sub("keep")).await.unwrap();

        let err = repo.remove_subtask(owner, todo.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
        assert_eq!(repo.find(owner, todo.id).await.unwrap(), before);
    }
}
