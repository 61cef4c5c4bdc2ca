//! Todo storage scoped by owning user.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct TodoStore {
    pool: SqlitePool,
}

/// A single todo item belonging to a user.
#[derive(Debug, Clone)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub is_complete: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct TodoRow {
    id: i64,
    user_id: i64,
    text: String,
    is_complete: bool,
    created_at: String,
    updated_at: String,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            text: row.text,
            is_complete: row.is_complete,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TodoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all todos for the given user, ordered by ID.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Todo>, sqlx::Error> {
        let rows: Vec<TodoRow> = sqlx::query_as(
            "SELECT id, user_id, text, is_complete, created_at, updated_at
             FROM todos WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Todo::from).collect())
    }

    /// Insert a new todo for the user and return the created row.
    pub async fn create(&self, user_id: i64, text: &str) -> Result<Todo, sqlx::Error> {
        let row: TodoRow = sqlx::query_as(
            "INSERT INTO todos (user_id, text, is_complete) VALUES (?, ?, 0)
             RETURNING id, user_id, text, is_complete, created_at, updated_at",
        )
        .bind(user_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Insert several todos for the user in a single transaction.
    /// Either all rows are created or none are.
    pub async fn create_bulk(
        &self,
        user_id: i64,
        texts: &[String],
    ) -> Result<Vec<Todo>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut todos = Vec::with_capacity(texts.len());
        for text in texts {
            let row: TodoRow = sqlx::query_as(
                "INSERT INTO todos (user_id, text, is_complete) VALUES (?, ?, 0)
                 RETURNING id, user_id, text, is_complete, created_at, updated_at",
            )
            .bind(user_id)
            .bind(text)
            .fetch_one(&mut *tx)
            .await?;
            todos.push(row.into());
        }

        tx.commit().await?;
        Ok(todos)
    }

    /// Update a todo owned by the user.
    /// Returns None when the todo does not exist or belongs to someone else.
    pub async fn update(
        &self,
        id: i64,
        user_id: i64,
        text: &str,
        is_complete: bool,
    ) -> Result<Option<Todo>, sqlx::Error> {
        let row: Option<TodoRow> = sqlx::query_as(
            "UPDATE todos SET text = ?, is_complete = ?, updated_at = datetime('now')
             WHERE id = ? AND user_id = ?
             RETURNING id, user_id, text, is_complete, created_at, updated_at",
        )
        .bind(text)
        .bind(is_complete)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Todo::from))
    }

    /// Delete a todo owned by the user.
    /// Returns false when the todo does not exist or belongs to someone else.
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
