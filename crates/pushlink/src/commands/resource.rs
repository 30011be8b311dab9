//! Resource command handlers: CRUD over the backend collections.

use std::sync::Arc;

use pushlink_api::{Collection, Record, ResourceAdapter, TransactionExecutor};

use crate::cli::{GlobalOpts, ResourceArgs, ResourceCommand};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::output;

/// Log in with the profile's token and hand back an adapter holding the
/// session.
async fn connect(resolved: &Resolved) -> Result<ResourceAdapter, CliError> {
    let token = config::resolve_auth_token(&resolved.profile, &resolved.name)?;
    let executor = Arc::new(TransactionExecutor::new(
        resolved.base_url.clone(),
        &resolved.transport,
    )?);
    executor
        .login(&token, &resolved.settings().auth_cookie_name)
        .await?;
    Ok(ResourceAdapter::new(executor))
}

fn keyed_record(collection: Collection, key: String, fields: Vec<(String, String)>) -> Record {
    let mut record: Record = fields.into_iter().collect();
    record.insert(collection.key_field(), key);
    record
}

fn rejected(operation: &str, collection: Collection) -> CliError {
    CliError::Rejected {
        operation: operation.into(),
        collection: collection.to_string(),
    }
}

pub async fn handle(
    resolved: &Resolved,
    args: ResourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resources = connect(resolved).await?;

    match args.command {
        ResourceCommand::List { collection } => {
            let records = resources
                .read_all(collection)
                .await?
                .ok_or_else(|| rejected("list", collection))?;
            let out = output::render_records(global.output, &records, collection.key_field())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ResourceCommand::Get { collection, key } => {
            let record = resources
                .read(collection, &key)
                .await?
                .ok_or_else(|| CliError::NotFound {
                    collection: collection.to_string(),
                    key,
                })?;
            let out = output::render_record(global.output, &record, collection.key_field())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ResourceCommand::Create { collection, fields } => {
            let record: Record = fields.into_iter().collect();
            let created = resources
                .create(collection, &record)
                .await?
                .ok_or_else(|| rejected("create", collection))?;
            let out = output::render_record(global.output, &created, collection.key_field())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ResourceCommand::Update {
            collection,
            key,
            fields,
        } => {
            let record = keyed_record(collection, key, fields);
            resources.update(collection, &record).await?;
            if !global.quiet {
                eprintln!("Update sent");
            }
            Ok(())
        }

        ResourceCommand::Delete {
            collection,
            key,
            all,
        } => {
            let deleted = match key {
                Some(key) if !all => {
                    let record = keyed_record(collection, key, Vec::new());
                    resources.delete_record(collection, &record).await?
                }
                _ => resources.delete_all(collection).await?,
            };
            if !deleted {
                return Err(rejected("delete", collection));
            }
            if !global.quiet {
                eprintln!("Deleted");
            }
            Ok(())
        }

        ResourceCommand::Message {
            collection,
            key,
            fields,
        } => {
            let record = keyed_record(collection, key, fields);
            let reply = resources
                .message(collection, &record)
                .await?
                .ok_or_else(|| rejected("message", collection))?;
            let out = output::render_record(global.output, &reply, collection.key_field())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
