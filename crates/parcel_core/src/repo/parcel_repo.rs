//! Parcel repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the canonical `parcel` table.
//! - Enforce the registered-only guard for address changes and deletion.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `set_address`/`delete` only mutate rows whose status is `registered`.
//! - Under `GuardStrategy::Atomic` the guard check and the write are one
//!   statement, so a concurrent status change cannot slip in between.
//! - `set_status` never reports a missing row.
//! - Read paths reject undecodable persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelId, ParcelStatus};
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: &[&str] = &["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type RepoResult<T> = Result<T, RepoError>;

/// Mutation subject to the registered-only guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedAction {
    ChangeAddress,
    Delete,
}

impl GuardedAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::ChangeAddress => "change address for",
            Self::Delete => "delete",
        }
    }

    fn event(self) -> &'static str {
        match self {
            Self::ChangeAddress => "parcel_set_address",
            Self::Delete => "parcel_delete",
        }
    }
}

/// How guarded mutations check the registered-only rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuardStrategy {
    /// One conditional statement; zero affected rows means the guard failed.
    ///
    /// Race-free, but cannot tell a missing parcel from a non-registered one.
    /// A follow-up read fills `RepoError::GuardFailed::observed` for
    /// diagnostics only.
    #[default]
    Atomic,
    /// Read the parcel, check its status, then write unconditionally.
    ///
    /// Reports `NotFound` and `InvalidState` separately, but the read and the
    /// write are independent statements: a status change committed between
    /// them is not seen and the write still lands.
    ReadCheckWrite,
}

/// Repository error for parcel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying datastore failure.
    Db(DbError),
    /// No parcel has the requested number.
    NotFound(ParcelId),
    /// Parcel exists but its status forbids the mutation.
    InvalidState {
        number: ParcelId,
        action: GuardedAction,
        status: ParcelStatus,
    },
    /// The conditional statement matched no row: the parcel is missing or is
    /// not registered. `observed` is the status read right after the failed
    /// statement, `None` when no row was found or the read itself failed.
    GuardFailed {
        number: ParcelId,
        action: GuardedAction,
        observed: Option<ParcelStatus>,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns whether the error is an infrastructure failure rather than a
    /// business outcome.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Db(_) | Self::InvalidData(_))
    }

    /// Returns whether retrying the same call can succeed.
    ///
    /// Only lock contention (`SQLITE_BUSY`/`SQLITE_LOCKED`) qualifies. Other
    /// datastore failures, not-found and guard rejections are final for the
    /// current state of the database.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(number) => write!(f, "parcel with number {number} not found"),
            Self::InvalidState {
                number,
                action,
                status,
            } => write!(
                f,
                "cannot {} parcel {number}: status is `{status}`, expected `registered`",
                action.as_str()
            ),
            Self::GuardFailed {
                number,
                action,
                observed,
            } => {
                write!(
                    f,
                    "cannot {} parcel {number} as it does not exist or is not in 'registered' status",
                    action.as_str()
                )?;
                match observed {
                    Some(status) => write!(f, " (observed status `{status}`)"),
                    None => Ok(()),
                }
            }
            Self::InvalidData(message) => write!(f, "invalid persisted parcel data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match required {expected_version}; open it with db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for parcel CRUD operations.
pub trait ParcelRepository {
    /// Inserts a parcel and returns its storage-assigned number.
    /// The incoming `number` is ignored.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelId>;
    /// Gets one parcel, `NotFound` when no row matches.
    fn get(&self, number: ParcelId) -> RepoResult<Parcel>;
    /// Lists all parcels of a client. Empty when the client has none.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites the status. A missing number is not an error.
    fn set_status(&self, number: ParcelId, status: &ParcelStatus) -> RepoResult<()>;
    /// Changes the address of a registered parcel.
    fn set_address(&self, number: ParcelId, address: &str) -> RepoResult<()>;
    /// Removes a registered parcel.
    fn delete(&self, number: ParcelId) -> RepoResult<()>;
}

/// SQLite-backed parcel repository over a caller-owned connection.
pub struct SqliteParcelRepository<'conn> {
    conn: &'conn Connection,
    guard: GuardStrategy,
}

impl<'conn> SqliteParcelRepository<'conn> {
    /// Binds the repository to a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when the schema does
    ///   not carry the `parcel` table shape.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(conn)?;
        Ok(Self {
            conn,
            guard: GuardStrategy::default(),
        })
    }

    /// Selects the guard strategy used by `set_address` and `delete`.
    pub fn with_guard(mut self, guard: GuardStrategy) -> Self {
        self.guard = guard;
        self
    }

    /// Returns the active guard strategy.
    pub fn guard(&self) -> GuardStrategy {
        self.guard
    }

    fn guarded_write(
        &self,
        number: ParcelId,
        action: GuardedAction,
        conditional: impl FnOnce() -> rusqlite::Result<usize>,
        unconditional: impl FnOnce() -> rusqlite::Result<usize>,
        interleave: impl FnOnce(),
    ) -> RepoResult<()> {
        match self.guard {
            GuardStrategy::Atomic => {
                // No window between check and write: other writers can only
                // land before or after the statement.
                interleave();
                if conditional()? == 0 {
                    let observed = self.probe_status(number);
                    warn!(
                        "event={} module=repo status=rejected guard=atomic number={} observed={}",
                        action.event(),
                        number,
                        observed.as_ref().map_or("none", ParcelStatus::as_str)
                    );
                    return Err(RepoError::GuardFailed {
                        number,
                        action,
                        observed,
                    });
                }
            }
            GuardStrategy::ReadCheckWrite => {
                let current = self.get(number)?;
                if !current.is_registered() {
                    warn!(
                        "event={} module=repo status=rejected guard=read_check_write number={} observed={}",
                        action.event(),
                        number,
                        current.status
                    );
                    return Err(RepoError::InvalidState {
                        number,
                        action,
                        status: current.status,
                    });
                }
                interleave();
                unconditional()?;
            }
        }

        debug!(
            "event={} module=repo status=ok number={}",
            action.event(),
            number
        );
        Ok(())
    }

    fn probe_status(&self, number: ParcelId) -> Option<ParcelStatus> {
        let probed = self
            .conn
            .query_row(
                "SELECT status FROM parcel WHERE number = ?1;",
                [number],
                |row| row.get::<_, String>(0),
            )
            .optional();

        match probed {
            Ok(status) => status.map(ParcelStatus::from),
            Err(err) => {
                warn!(
                    "event=parcel_probe module=repo status=error number={} error={}",
                    number, err
                );
                None
            }
        }
    }
}

impl ParcelRepository for SqliteParcelRepository<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelId> {
        self.conn.execute(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                parcel.client,
                parcel.status.as_str(),
                parcel.address.as_str(),
                parcel.created_at.as_str(),
            ],
        )?;

        let number = self.conn.last_insert_rowid();
        debug!(
            "event=parcel_add module=repo status=ok number={} client={}",
            number, parcel.client
        );
        Ok(number)
    }

    fn get(&self, number: ParcelId) -> RepoResult<Parcel> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE number = ?1;"))?;

        let mut rows = stmt.query([number])?;
        if let Some(row) = rows.next()? {
            return parse_parcel_row(row);
        }

        Err(RepoError::NotFound(number))
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARCEL_SELECT_SQL} WHERE client = ?1 ORDER BY number ASC;"
        ))?;

        let mut rows = stmt.query([client])?;
        let mut parcels = Vec::new();
        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        debug!(
            "event=parcel_list module=repo status=ok client={} count={}",
            client,
            parcels.len()
        );
        Ok(parcels)
    }

    fn set_status(&self, number: ParcelId, status: &ParcelStatus) -> RepoResult<()> {
        // Zero affected rows is accepted; callers rely on the silent no-op.
        let changed = self.conn.execute(
            "UPDATE parcel SET status = ?1 WHERE number = ?2;",
            params![status.as_str(), number],
        )?;

        debug!(
            "event=parcel_set_status module=repo status=ok number={} new_status={} changed={}",
            number, status, changed
        );
        Ok(())
    }

    fn set_address(&self, number: ParcelId, address: &str) -> RepoResult<()> {
        self.set_address_interleaved(number, address, || {})
    }

    fn delete(&self, number: ParcelId) -> RepoResult<()> {
        self.delete_interleaved(number, || {})
    }
}

impl SqliteParcelRepository<'_> {
    /// `set_address` with `interleave` run where another connection's write
    /// could land between the guard check and the address write.
    fn set_address_interleaved(
        &self,
        number: ParcelId,
        address: &str,
        interleave: impl FnOnce(),
    ) -> RepoResult<()> {
        let registered = ParcelStatus::Registered;
        self.guarded_write(
            number,
            GuardedAction::ChangeAddress,
            || {
                self.conn.execute(
                    "UPDATE parcel SET address = ?1 WHERE number = ?2 AND status = ?3;",
                    params![address, number, registered.as_str()],
                )
            },
            || {
                self.conn.execute(
                    "UPDATE parcel SET address = ?1 WHERE number = ?2;",
                    params![address, number],
                )
            },
            interleave,
        )
    }

    fn delete_interleaved(&self, number: ParcelId, interleave: impl FnOnce()) -> RepoResult<()> {
        let registered = ParcelStatus::Registered;
        self.guarded_write(
            number,
            GuardedAction::Delete,
            || {
                self.conn.execute(
                    "DELETE FROM parcel WHERE number = ?1 AND status = ?2;",
                    params![number, registered.as_str()],
                )
            },
            || {
                self.conn
                    .execute("DELETE FROM parcel WHERE number = ?1;", [number])
            },
            interleave,
        )
    }
}

fn ensure_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [PARCEL_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let present = stmt
        .query_map([PARCEL_TABLE], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for &column in PARCEL_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    let number: ParcelId = row.get("number")?;
    if number <= 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid number value `{number}` in parcel.number"
        )));
    }

    let status: String = row.get("status")?;
    Ok(Parcel {
        number,
        client: row.get("client")?,
        status: ParcelStatus::from(status),
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}
