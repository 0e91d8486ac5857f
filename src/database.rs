use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};

use crate::error::Result;
use crate::session::{Role, Session};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub role: Role,
    pub name: String,
}

/// Badge values for the sidebar. `None` means the count query failed and the
/// badge is not shown.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BadgeCounts {
    pub students: Option<i64>,
    pub certificates: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateScope {
    All,
    Student(i64),
}

#[derive(FromRow)]
struct CredentialRow {
    id: i64,
    password_hash: String,
    name: String,
}

#[derive(FromRow)]
struct SessionRow {
    token: String,
    role: String,
    subject_id: i64,
    display_name: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Option<Session> {
        let role = match self.role.parse::<Role>() {
            Ok(role) => role,
            Err(_) => {
                tracing::warn!("Session {} has unknown role {:?}", self.token, self.role);
                return None;
            }
        };

        Some(Session {
            token: self.token,
            role,
            subject_id: self.subject_id,
            display_name: self.display_name,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS admins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS students (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS certificates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id INTEGER NOT NULL REFERENCES students(id),
        course_title TEXT NOT NULL,
        issued_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        role TEXT NOT NULL,
        subject_id INTEGER NOT NULL,
        display_name TEXT NOT NULL,
        created_at DATETIME NOT NULL,
        expires_at DATETIME NOT NULL
    )
    "#,
];

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqlitePoolOptions::new();
        // Every connection to `sqlite::memory:` is its own database, so keep a
        // single connection alive for the lifetime of the pool.
        let pool = if database_url.contains(":memory:") {
            options
                .max_connections(1)
                .idle_timeout(None::<std::time::Duration>)
                .max_lifetime(None::<std::time::Duration>)
                .connect(database_url)
                .await?
        } else {
            options.max_connections(5).connect(database_url).await?
        };

        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Database schema is up to date");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn count_students(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_certificates(&self, scope: CertificateScope) -> Result<i64> {
        let count = match scope {
            CertificateScope::All => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM certificates")
                    .fetch_one(&self.pool)
                    .await?
            }
            CertificateScope::Student(student_id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM certificates WHERE student_id = ?",
                )
                .bind(student_id)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count)
    }

    /// Counts for the sidebar badges. Never fails: a query error only hides
    /// the corresponding badge. Students see their own certificates.
    pub async fn badge_counts(&self, role: Role, subject_id: i64) -> BadgeCounts {
        let scope = match role {
            Role::Admin => CertificateScope::All,
            Role::Student => CertificateScope::Student(subject_id),
        };

        BadgeCounts {
            students: swallow("students", self.count_students().await),
            certificates: swallow("certificates", self.count_certificates(scope).await),
        }
    }

    pub async fn create_admin(&self, username: &str, password: &str, name: &str) -> Result<i64> {
        let password_hash = hash_password(password)?;
        let result = sqlx::query(
            r#"
            INSERT INTO admins (username, password_hash, name)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Creates the admin unless the username is already taken.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool> {
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(false);
        }
        self.create_admin(username, password, username).await?;
        Ok(true)
    }

    pub async fn create_student(&self, email: &str, password: &str, name: &str) -> Result<i64> {
        let password_hash = hash_password(password)?;
        let result = sqlx::query(
            r#"
            INSERT INTO students (email, password_hash, name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn issue_certificate(&self, student_id: i64, course_title: &str) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO certificates (student_id, course_title, issued_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(student_id)
        .bind(course_title)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Admins sign in with their username, students with their email.
    pub async fn verify_login(
        &self,
        role: Role,
        identifier: &str,
        password: &str,
    ) -> Result<Option<Account>> {
        let sql = match role {
            Role::Admin => "SELECT id, password_hash, name FROM admins WHERE username = ?",
            Role::Student => "SELECT id, password_hash, name FROM students WHERE email = ?",
        };

        let row = sqlx::query_as::<_, CredentialRow>(sql)
            .bind(identifier.trim())
            .fetch_optional(&self.pool)
            .await?;

        // Unknown identifiers still pay for one verification.
        let Some(row) = row else {
            let parsed = PasswordHash::new(dummy_hash()?)?;
            let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
            return Ok(None);
        };

        let parsed = PasswordHash::new(&row.password_hash)?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }

        Ok(Some(Account {
            id: row.id,
            role,
            name: row.name,
        }))
    }

    pub async fn create_session(&self, account: &Account, ttl: Duration) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            role: account.role,
            subject_id: account.id,
            display_name: account.name.clone(),
            created_at: now,
            expires_at: now + ttl,
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (token, role, subject_id, display_name, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.token)
        .bind(session.role.as_str())
        .bind(session.subject_id)
        .bind(&session.display_name)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    /// Looks up a live session. Expired sessions are removed on sight.
    pub async fn find_session(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT token, role, subject_id, display_name, created_at, expires_at
            FROM sessions
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(session) = row.and_then(SessionRow::into_session) else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.delete_session(&session.token).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE julianday(expires_at) <= julianday(?)")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn swallow(badge: &str, result: Result<i64>) -> Option<i64> {
    match result {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Could not count {} for badge: {}", badge, e);
            None
        }
    }
}

fn dummy_hash() -> Result<&'static str> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash);
    }
    let hash = hash_password("lms-portal-unknown-account")?;
    Ok(DUMMY.get_or_init(|| hash))
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn counts_start_at_zero() {
        let db = Database::in_memory().await.unwrap();
        assert_eq!(db.count_students().await.unwrap(), 0);
        assert_eq!(db.count_certificates(CertificateScope::All).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn certificate_count_can_be_scoped_to_a_student() {
        let db = Database::in_memory().await.unwrap();
        let amina = db.create_student("amina@example.com", "pw", "Amina").await.unwrap();
        let brian = db.create_student("brian@example.com", "pw", "Brian").await.unwrap();
        db.issue_certificate(amina, "Rust 101").await.unwrap();
        db.issue_certificate(amina, "SQL Basics").await.unwrap();
        db.issue_certificate(brian, "Rust 101").await.unwrap();

        assert_eq!(db.count_students().await.unwrap(), 2);
        assert_eq!(db.count_certificates(CertificateScope::All).await.unwrap(), 3);
        assert_eq!(
            db.count_certificates(CertificateScope::Student(amina)).await.unwrap(),
            2
        );

        let admin = db.badge_counts(Role::Admin, 1).await;
        assert_eq!(admin.students, Some(2));
        assert_eq!(admin.certificates, Some(3));

        let student = db.badge_counts(Role::Student, brian).await;
        assert_eq!(student.students, Some(2));
        assert_eq!(student.certificates, Some(1));
    }

    #[actix_web::test]
    async fn badge_counts_swallow_query_failures() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query("DROP TABLE certificates").execute(db.pool()).await.unwrap();

        let badges = db.badge_counts(Role::Admin, 1).await;
        assert_eq!(badges.students, Some(0));
        assert_eq!(badges.certificates, None);
    }

    #[actix_web::test]
    async fn login_checks_password_and_role_table() {
        let db = Database::in_memory().await.unwrap();
        db.create_admin("registrar", "s3cret", "Registrar").await.unwrap();

        let account = db
            .verify_login(Role::Admin, "registrar", "s3cret")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.name, "Registrar");
        assert_eq!(account.role, Role::Admin);

        assert!(db.verify_login(Role::Admin, "registrar", "wrong").await.unwrap().is_none());
        assert!(db.verify_login(Role::Student, "registrar", "s3cret").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn unknown_identifier_is_rejected_after_a_full_verification() {
        let db = Database::in_memory().await.unwrap();
        db.create_student("known@example.com", "pw", "Known").await.unwrap();

        assert!(db
            .verify_login(Role::Student, "ghost@example.com", "pw")
            .await
            .unwrap()
            .is_none());

        let dummy = dummy_hash().unwrap();
        assert!(PasswordHash::new(dummy).is_ok());
        assert_eq!(dummy, dummy_hash().unwrap());
    }

    #[actix_web::test]
    async fn ensure_admin_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.ensure_admin("root", "pw").await.unwrap());
        assert!(!db.ensure_admin("root", "other").await.unwrap());
        assert!(db.verify_login(Role::Admin, "root", "pw").await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn expired_sessions_are_dropped_on_lookup() {
        let db = Database::in_memory().await.unwrap();
        let account = Account { id: 7, role: Role::Student, name: "Wanjiru".to_string() };

        let live = db.create_session(&account, Duration::minutes(30)).await.unwrap();
        let stale = db.create_session(&account, Duration::minutes(-1)).await.unwrap();

        let found = db.find_session(&live.token).await.unwrap().unwrap();
        assert_eq!(found.subject_id, 7);
        assert_eq!(found.role, Role::Student);

        assert!(db.find_session(&stale.token).await.unwrap().is_none());
        assert!(!db.delete_session(&stale.token).await.unwrap());
    }

    #[actix_web::test]
    async fn purge_removes_only_expired_sessions() {
        let db = Database::in_memory().await.unwrap();
        let account = Account { id: 1, role: Role::Admin, name: "Ops".to_string() };
        let live = db.create_session(&account, Duration::minutes(30)).await.unwrap();
        db.create_session(&account, Duration::minutes(-5)).await.unwrap();
        db.create_session(&account, Duration::minutes(-10)).await.unwrap();

        assert_eq!(db.purge_expired_sessions().await.unwrap(), 2);
        assert!(db.find_session(&live.token).await.unwrap().is_some());
    }
}
