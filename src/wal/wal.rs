use crate::models::role::Role;
use crate::models::user::{ProfilePatch, User, UserId};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// WAL operation types, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOperation {
    CreateUser {
        user: User,
    },
    UpdateProfile {
        id: UserId,
        patch: ProfilePatch,
        updated_at: i64,
    },
    ChangeRole {
        id: UserId,
        role: Role,
        updated_at: i64,
    },
    DeleteUser {
        id: UserId,
    },
    IssueToken {
        digest: String,
        user_id: UserId,
        issued_at: i64,
    },
    RevokeToken {
        digest: String,
    },
}

impl WalOperation {
    fn encode(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize WAL operation")
    }

    fn decode(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse WAL operation")
    }
}

pub struct Wal {
    file: Mutex<File>,
    path: PathBuf,
}

impl Wal {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open WAL file")?;

        Ok(Wal {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn log_operation(&self, op: WalOperation) -> Result<()> {
        let line = op.encode()?;
        let mut file = self.file.lock().map_err(|_| anyhow!("WAL lock poisoned"))?;
        writeln!(file, "{}", line).context("Failed to write to WAL")?;
        file.flush().context("Failed to flush WAL")?;
        Ok(())
    }

    pub fn replay(&self) -> Result<Vec<WalOperation>> {
        let file = File::open(&self.path).context("Failed to open WAL for replay")?;
        let reader = BufReader::new(file);
        let mut operations = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("Failed to read line from WAL")?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            match WalOperation::decode(line) {
                Ok(op) => operations.push(op),
                Err(e) => {
                    tracing::warn!(
                        line_num = line_num + 1,
                        error = %e,
                        "Failed to parse WAL line, skipping"
                    );
                }
            }
        }

        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_user() -> User {
        User::new(
            "bob".to_string(),
            "bob@x.com".to_string(),
            "$argon2id$v=19$fake".to_string(),
            Role::Client,
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_operation_line_format() {
        let id = Uuid::nil();
        let line = WalOperation::ChangeRole {
            id,
            role: Role::Admin,
            updated_at: 42,
        }
        .encode()
        .unwrap();

        assert!(line.starts_with("{\"op\":\"change_role\""));
        assert!(line.contains("\"role\":\"admin\""));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_wal_log_and_replay() {
        let temp_dir = TempDir::new().unwrap();
        let wal = Wal::new(temp_dir.path().join("test.wal")).unwrap();

        let user = sample_user();
        let id = user.id;

        wal.log_operation(WalOperation::CreateUser { user: user.clone() }).unwrap();
        wal.log_operation(WalOperation::ChangeRole {
            id,
            role: Role::Admin,
            updated_at: 2,
        })
        .unwrap();
        wal.log_operation(WalOperation::IssueToken {
            digest: "ab".repeat(32),
            user_id: id,
            issued_at: 3,
        })
        .unwrap();
        wal.log_operation(WalOperation::DeleteUser { id }).unwrap();

        let operations = wal.replay().unwrap();
        assert_eq!(operations.len(), 4);

        match &operations[0] {
            WalOperation::CreateUser { user: replayed } => assert_eq!(replayed, &user),
            _ => panic!("Expected CreateUser"),
        }

        match &operations[1] {
            WalOperation::ChangeRole { id: i, role, updated_at } => {
                assert_eq!(*i, id);
                assert_eq!(*role, Role::Admin);
                assert_eq!(*updated_at, 2);
            }
            _ => panic!("Expected ChangeRole"),
        }

        assert!(matches!(operations[3], WalOperation::DeleteUser { .. }));
    }

    #[test]
    fn test_wal_invalid_lines() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        fs::write(
            &wal_path,
            "ADD_USER|1|garbage\n{\"op\":\"revoke_token\",\"digest\":\"ff\"}\n{\"op\":\"unknown\"}\n",
        )
        .unwrap();

        let wal = Wal::new(wal_path).unwrap();
        let operations = wal.replay().unwrap();

        assert_eq!(operations, vec![WalOperation::RevokeToken { digest: "ff".into() }]);
    }
}
