//! Subcommands and their execution against a freshly opened store.

use clap::Subcommand;
use parcel_core::db::open_db;
use parcel_core::{
    current_timestamp, ClientId, GuardStrategy, Parcel, ParcelId, ParcelRepository,
    ParcelService, ParcelStatus, SqliteParcelRepository,
};
use serde_json::json;
use std::error::Error;
use std::path::Path;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Insert a parcel with an explicit status
    Add {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "registered")]
        status: String,
        /// Creation timestamp; defaults to now (UTC, RFC 3339)
        #[arg(long)]
        created_at: Option<String>,
    },
    /// Register a new parcel in `registered` status
    Register {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        address: String,
    },
    /// Show one parcel
    Get { number: ParcelId },
    /// List parcels of a client
    List {
        #[arg(long)]
        client: ClientId,
    },
    /// Overwrite the status of a parcel
    SetStatus { number: ParcelId, status: String },
    /// Move a parcel to the next delivery status
    NextStatus { number: ParcelId },
    /// Change the address of a registered parcel
    SetAddress { number: ParcelId, address: String },
    /// Delete a registered parcel
    Delete { number: ParcelId },
}

/// Runs one command and returns its JSON output.
pub fn execute(
    db: &Path,
    guard: GuardStrategy,
    command: Command,
) -> Result<String, Box<dyn Error>> {
    let conn = open_db(db)?;
    let service = ParcelService::new(SqliteParcelRepository::try_new(&conn)?.with_guard(guard));

    let output = match command {
        Command::Add {
            client,
            address,
            status,
            created_at,
        } => {
            let created_at = created_at.unwrap_or_else(current_timestamp);
            let parcel = Parcel::new(client, ParcelStatus::from(status), address, created_at);
            let number = service.repo().add(&parcel)?;
            json!({ "number": number })
        }
        Command::Register { client, address } => {
            serde_json::to_value(service.register(client, address)?)?
        }
        Command::Get { number } => serde_json::to_value(service.parcel(number)?)?,
        Command::List { client } => serde_json::to_value(service.client_parcels(client)?)?,
        Command::SetStatus { number, status } => {
            let status = ParcelStatus::from(status);
            service.repo().set_status(number, &status)?;
            json!({ "number": number, "status": status })
        }
        Command::NextStatus { number } => {
            let status = service.next_status(number)?;
            json!({ "number": number, "status": status })
        }
        Command::SetAddress { number, address } => {
            service.change_address(number, &address)?;
            json!({ "number": number, "address": address })
        }
        Command::Delete { number } => {
            service.delete(number)?;
            json!({ "number": number, "deleted": true })
        }
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::{execute, Command};
    use parcel_core::GuardStrategy;
    use serde_json::Value;
    use std::path::Path;

    fn run(db: &Path, command: Command) -> Value {
        let output = execute(db, GuardStrategy::Atomic, command).unwrap();
        serde_json::from_str(&output).unwrap()
    }

    #[test]
    fn register_then_advance_then_reject_address_change() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cli.db");

        let registered = run(
            &db,
            Command::Register {
                client: 5,
                address: "Lenina 1".to_string(),
            },
        );
        assert_eq!(registered["status"], "registered");
        let number = registered["number"].as_i64().unwrap();

        let advanced = run(&db, Command::NextStatus { number });
        assert_eq!(advanced["status"], "sent");

        let err = execute(
            &db,
            GuardStrategy::Atomic,
            Command::SetAddress {
                number,
                address: "Lenina 2".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("not in 'registered' status"));

        let listed = run(&db, Command::List { client: 5 });
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["address"], "Lenina 1");
    }

    #[test]
    fn add_with_explicit_timestamp_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cli.db");

        let added = run(
            &db,
            Command::Add {
                client: 1,
                address: "addr".to_string(),
                status: "registered".to_string(),
                created_at: Some("2024-05-05T05:05:05Z".to_string()),
            },
        );
        let number = added["number"].as_i64().unwrap();

        let fetched = run(&db, Command::Get { number });
        assert_eq!(fetched["created_at"], "2024-05-05T05:05:05Z");

        let deleted = run(&db, Command::Delete { number });
        assert_eq!(deleted["deleted"], true);
        assert!(execute(&db, GuardStrategy::Atomic, Command::Get { number }).is_err());
    }
}
