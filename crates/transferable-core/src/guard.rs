//! Pre-delete interception.
//!
//! [`DeletionGuard::before_delete`] is the hook a host calls before removing
//! a parent row. [`DeletionGuard::delete_with`] wraps the host's own delete in
//! a scope so the check and the delete commit together.

use rusqlite::Connection;

use crate::dangling::DanglingChecker;
use crate::error::Result;
use crate::model::{DeletePolicy, HasRelationships};
use crate::registry::Registry;
use crate::scope::Scope;

#[derive(Debug, Clone, Copy)]
pub struct DeletionGuard<'r> {
    registry: &'r Registry,
}

impl<'r> DeletionGuard<'r> {
    #[must_use]
    pub const fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Delete policy of the entity's type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownEntityType`] if the type is not registered.
    pub fn policy<E>(&self, entity: &E) -> Result<DeletePolicy>
    where
        E: HasRelationships + ?Sized,
    {
        Ok(self.registry.get(entity.entity_type())?.delete_policy())
    }

    /// Block deletion of a strict entity that still has dependents.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DanglingRelationships`] for strict types with
    /// dependents, or any counting error. Lenient types never fail here.
    pub fn before_delete<E>(&self, conn: &Connection, entity: &E) -> Result<()>
    where
        E: HasRelationships + ?Sized,
    {
        match self.policy(entity)? {
            DeletePolicy::Strict => {
                DanglingChecker::new(self.registry).check_dangling(conn, entity, true)?;
                tracing::info!(
                    entity_type = entity.entity_type(),
                    key = %entity.key(),
                    "deletion allowed"
                );
            }
            DeletePolicy::Lenient => {
                tracing::debug!(
                    entity_type = entity.entity_type(),
                    "lenient type, deletion not guarded"
                );
            }
        }
        Ok(())
    }

    /// Run the guard and then `delete` inside one scope.
    ///
    /// The closure performs the actual delete; its return value is passed
    /// through. Nothing is committed unless both the guard and the closure
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns the guard's error or the closure's error after rolling back.
    pub fn delete_with<E, F, T>(
        &self,
        conn: &Connection,
        entity: &E,
        delete: F,
    ) -> Result<T>
    where
        E: HasRelationships + ?Sized,
        F: FnOnce(&Connection) -> Result<T>,
    {
        let scope = Scope::begin(conn, "delete")?;
        let outcome = self.before_delete(conn, entity).and_then(|()| delete(conn));
        match outcome {
            Ok(value) => {
                scope.commit()?;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(
                    entity_type = entity.entity_type(),
                    key = %entity.key(),
                    error = %err,
                    "delete rolled back"
                );
                drop(scope);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DeletionGuard;
    use crate::error::Error;
    use crate::model::{DeletePolicy, Entity, EntityType, RelationDescriptor};
    use crate::registry::Registry;
    use rusqlite::Connection;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                EntityType::new("genre", "genres")
                    .strict(true)
                    .relation("books", RelationDescriptor::has_many("book", "genre_id"))
                    .transferable(["books"]),
            )
            .expect("genre");
        registry
            .register(
                EntityType::new("shelf", "shelves")
                    .relation("books", RelationDescriptor::has_many("book", "shelf_id"))
                    .transferable(["books"]),
            )
            .expect("shelf");
        registry.register(EntityType::new("book", "books")).expect("book");
        registry
    }

    fn db() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE genres (id INTEGER PRIMARY KEY);
             CREATE TABLE shelves (id INTEGER PRIMARY KEY);
             CREATE TABLE books (id INTEGER PRIMARY KEY, genre_id INTEGER, shelf_id INTEGER);
             INSERT INTO genres (id) VALUES (1), (2);
             INSERT INTO shelves (id) VALUES (1);
             INSERT INTO books (genre_id, shelf_id) VALUES (1, 1);",
        )
        .expect("seed");
        conn
    }

    fn delete_row(
        table: &'static str,
        id: i64,
    ) -> impl FnOnce(&Connection) -> crate::Result<usize> {
        move |conn| Ok(conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?)
    }

    fn exists(conn: &Connection, table: &str, id: i64) -> bool {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"), [id], |r| {
            r.get::<_, i64>(0)
        })
        .expect("count")
            == 1
    }

    #[test]
    fn strict_type_with_dependents_is_blocked() {
        let (registry, conn) = (registry(), db());
        let guard = DeletionGuard::new(&registry);
        let genre = Entity::new("genre", 1);
        assert_eq!(guard.policy(&genre).expect("policy"), DeletePolicy::Strict);

        let err = guard.before_delete(&conn, &genre).expect_err("blocked");
        assert!(matches!(err, Error::DanglingRelationships { count: 1, keyword: "must", .. }));
    }

    #[test]
    fn strict_type_without_dependents_passes() {
        let (registry, conn) = (registry(), db());
        DeletionGuard::new(&registry)
            .before_delete(&conn, &Entity::new("genre", 2))
            .expect("clean");
    }

    #[test]
    fn lenient_type_is_never_blocked() {
        let (registry, conn) = (registry(), db());
        let guard = DeletionGuard::new(&registry);
        let shelf = Entity::new("shelf", 1);
        assert_eq!(guard.policy(&shelf).expect("policy"), DeletePolicy::Lenient);
        guard.before_delete(&conn, &shelf).expect("lenient");
    }

    #[test]
    fn delete_with_commits_when_guard_passes() {
        let (registry, conn) = (registry(), db());
        let deleted = DeletionGuard::new(&registry)
            .delete_with(&conn, &Entity::new("genre", 2), delete_row("genres", 2))
            .expect("delete");
        assert_eq!(deleted, 1);
        assert!(!exists(&conn, "genres", 2));
        assert!(conn.is_autocommit());
    }

    #[test]
    fn delete_with_skips_closure_when_blocked() {
        let (registry, conn) = (registry(), db());
        let mut called = false;
        let err = DeletionGuard::new(&registry)
            .delete_with(&conn, &Entity::new("genre", 1), |_| {
                called = true;
                Ok(())
            })
            .expect_err("blocked");
        assert!(matches!(err, Error::DanglingRelationships { .. }));
        assert!(!called);
        assert!(exists(&conn, "genres", 1));
    }

    #[test]
    fn delete_with_rolls_back_when_closure_fails() {
        let (registry, conn) = (registry(), db());
        let err = DeletionGuard::new(&registry)
            .delete_with(&conn, &Entity::new("shelf", 1), |conn| {
                conn.execute("DELETE FROM shelves WHERE id = 1", [])?;
                conn.execute("DELETE FROM no_such_table", [])?;
                Ok(())
            })
            .expect_err("closure fails");
        assert!(matches!(err, Error::Sqlite(_)));
        assert!(exists(&conn, "shelves", 1));
        assert!(conn.is_autocommit());
    }
}
