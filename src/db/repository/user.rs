use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::User;

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>, DatabaseError> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;

    document
        .map(|doc| {
            serde_json::from_str(&doc).map_err(|e| DatabaseError::CorruptDocument {
                entity_type: "user",
                id: user_id.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

pub fn put_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let document = serde_json::to_string(user)?;
    conn.execute(
        "INSERT INTO users (user_id, document) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET document = excluded.document",
        params![user.user_id, document],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::{Credential, UserRole};

    fn make_user(id: &str) -> User {
        User {
            user_id: id.into(),
            display_name: "Dr. Njeri".into(),
            role: UserRole::Doctor,
            credential: Credential::from_secret("pw"),
        }
    }

    #[test]
    fn put_then_get_round_trips_credential() {
        let conn = open_memory_database().unwrap();
        put_user(&conn, &make_user("njeri")).unwrap();
        let stored = get_user(&conn, "njeri").unwrap().unwrap();
        assert_eq!(stored.role, UserRole::Doctor);
        assert!(stored.credential.verify("pw"));
    }

    #[test]
    fn ids_are_case_sensitive_keys() {
        let conn = open_memory_database().unwrap();
        put_user(&conn, &make_user("njeri")).unwrap();
        assert!(get_user(&conn, "NJERI").unwrap().is_none());
    }

    #[test]
    fn reseeding_replaces_account() {
        let conn = open_memory_database().unwrap();
        put_user(&conn, &make_user("njeri")).unwrap();
        let mut changed = make_user("njeri");
        changed.role = UserRole::Registrar;
        put_user(&conn, &changed).unwrap();
        assert_eq!(get_user(&conn, "njeri").unwrap().unwrap().role, UserRole::Registrar);
    }
}
