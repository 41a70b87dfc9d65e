//! The user directory: credentials plus the admin/submitted flags the
//! aggregation engine needs. Authentication is an exact trimmed match
//! against the credentials sheet; anything stronger is out of scope.

use crate::model::UserRecord;
use crate::sheet::{self, columns, Row};

/// One credentials row. The password never leaves this module's
/// `authenticate`.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    password: String,
    pub user: UserRecord,
}

/// In-memory view of the credentials sheet for one request.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    credentials: Vec<Credential>,
}

impl UserDirectory {
    pub fn from_rows(rows: &[Row]) -> Self {
        let credentials = rows
            .iter()
            .filter_map(|row| {
                let username = sheet::cell(row, columns::USERNAME).to_string();
                if username.is_empty() {
                    return None;
                }
                let user_id = non_empty_or(sheet::cell(row, columns::USER_ID), &username);
                let display_name =
                    non_empty_or(sheet::cell(row, columns::DISPLAY_NAME), &username);
                Some(Credential {
                    password: sheet::cell(row, columns::PASSWORD).to_string(),
                    user: UserRecord {
                        user_id,
                        display_name,
                        is_admin: sheet::cell_bool(row, columns::IS_ADMIN),
                        has_submitted: sheet::cell_bool(row, columns::SUBMITTED),
                    },
                    username,
                })
            })
            .collect();
        Self { credentials }
    }

    /// Exact trimmed match on username and password.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&UserRecord> {
        let username = username.trim();
        let password = password.trim();
        self.credentials
            .iter()
            .find(|c| c.username == username && c.password == password)
            .map(|c| &c.user)
    }

    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        let user_id = user_id.trim();
        self.credentials
            .iter()
            .find(|c| c.user.user_id == user_id)
            .map(|c| &c.user)
    }

    /// Resolve the judge name an evaluation row carries. Rows are keyed by
    /// whatever name the client sent, so match username first, then the
    /// display name.
    pub fn find_judge(&self, name: &str) -> Option<&UserRecord> {
        let name = name.trim();
        self.credentials
            .iter()
            .find(|c| c.username == name)
            .or_else(|| {
                self.credentials
                    .iter()
                    .find(|c| c.user.display_name == name)
            })
            .map(|c| &c.user)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn directory(csv: &str) -> UserDirectory {
        let rows = sheet::read_all(csv.as_bytes(), &PathBuf::from("users.csv")).unwrap();
        UserDirectory::from_rows(&rows)
    }

    const SHEET: &str = "USERID,Name,Username,Password,Admin,Submitted\n\
                         u1,Alice Judge,alice,secret,false,true\n\
                         u2,Ops Admin,admin,root,true,false\n";

    #[test]
    fn authenticates_with_trimmed_exact_match() {
        let dir = directory(SHEET);
        let user = dir.authenticate(" alice ", "secret").unwrap();
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.display_name, "Alice Judge");
        assert!(!user.is_admin);
        assert!(user.has_submitted);

        assert!(dir.authenticate("alice", "wrong").is_none());
        assert!(dir.authenticate("ALICE", "secret").is_none());
    }

    #[test]
    fn finds_judges_by_username_or_display_name() {
        let dir = directory(SHEET);
        assert_eq!(dir.find_judge("alice").unwrap().user_id, "u1");
        assert_eq!(dir.find_judge("Alice Judge").unwrap().user_id, "u1");
        assert!(dir.find_judge("charlie").is_none());
    }

    #[test]
    fn falls_back_to_username_for_missing_id_and_name() {
        let dir = directory("Username,Password\ncarol,pw\n");
        let user = dir.authenticate("carol", "pw").unwrap();
        assert_eq!(user.user_id, "carol");
        assert_eq!(user.display_name, "carol");
        assert!(!user.is_admin);
    }

    #[test]
    fn skips_rows_without_a_username() {
        let dir = directory("Username,Password\n,pw\nalice,pw\n");
        assert_eq!(dir.len(), 1);
    }
}
