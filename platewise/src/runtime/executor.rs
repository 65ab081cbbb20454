use std::borrow::Cow;

use redis::{Script, aio::ConnectionLike};
use serde_json::Value;

use crate::{
    errors::RepoError,
    runtime::{
        commands::{MutationCommand, MutationOutcome, MutationPlan, RefreshedAggregate, ToggleAction},
        scripts::{
            AGGREGATE_REFRESH_SCRIPT, COUNTER_INCREMENT_SCRIPT, ENTITY_DELETE_SCRIPT, ENTITY_INSERT_SCRIPT,
            ENTITY_PATCH_SCRIPT, RELATION_TOGGLE_SCRIPT,
        },
    },
};

fn script_for(command: &MutationCommand) -> &'static Script {
    match command {
        MutationCommand::Insert(_) => &*ENTITY_INSERT_SCRIPT,
        MutationCommand::Patch(_) => &*ENTITY_PATCH_SCRIPT,
        MutationCommand::Delete(_) => &*ENTITY_DELETE_SCRIPT,
        MutationCommand::Toggle(_) => &*RELATION_TOGGLE_SCRIPT,
        MutationCommand::Refresh(_) => &*AGGREGATE_REFRESH_SCRIPT,
        MutationCommand::Increment(_) => &*COUNTER_INCREMENT_SCRIPT,
    }
}

/// Runs each command of the plan as one script invocation, stopping at the first error.
pub async fn execute_plan<C>(conn: &mut C, plan: &MutationPlan) -> Result<Vec<MutationOutcome>, RepoError>
where
    C: ConnectionLike + Send,
{
    let mut outcomes = Vec::with_capacity(plan.commands.len());

    for command in &plan.commands {
        let payload = serde_json::to_string(command).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("failed to serialize command: {err}")),
        })?;

        let mut invocation = script_for(command).prepare_invoke();
        invocation.arg(payload);
        let raw: String = invocation.invoke_async(conn).await.map_err(|err| {
            log::warn!("mutation script failed: {err}");
            RepoError::from(err)
        })?;

        let mut outcome = decode_response(&raw)?;
        if let MutationCommand::Insert(insert) = command {
            outcome.document = Some(parse_document(&insert.document_json)?);
        }
        if let MutationCommand::Toggle(toggle) = command
            && outcome.action == Some(ToggleAction::Added)
        {
            outcome.document = Some(parse_document(&toggle.document_json)?);
        }
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Turns a script reply into an outcome, or into the `RepoError` its error code names.
pub fn decode_response(raw: &str) -> Result<MutationOutcome, RepoError> {
    let value: Value = serde_json::from_str(raw).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to parse lua response: {err}")),
    })?;

    if let Some(error) = value.get("error") {
        return Err(decode_error(error, &value));
    }

    let action = value
        .get("action")
        .cloned()
        .map(serde_json::from_value::<ToggleAction>)
        .transpose()
        .map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("unknown toggle action: {err}")),
        })?;

    let document = match value.get("document") {
        Some(Value::String(json)) => Some(parse_document(json)?),
        _ => None,
    };

    // An empty Lua table encodes as `{}`, so anything but an array is "nothing refreshed".
    let refreshed = match value.get("refreshed") {
        Some(Value::Array(entries)) => entries
            .iter()
            .cloned()
            .map(serde_json::from_value::<RefreshedAggregate>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RepoError::Other {
                message: Cow::Owned(format!("malformed aggregate refresh: {err}")),
            })?,
        _ => Vec::new(),
    };

    Ok(MutationOutcome {
        action,
        document,
        refreshed,
        value: value.get("value").and_then(Value::as_f64),
    })
}

fn decode_error(error: &Value, value: &Value) -> RepoError {
    let text = |field: &str| value.get(field).and_then(Value::as_str).unwrap_or_default().to_string();
    let strings = |field: &str| -> Vec<String> {
        value
            .get(field)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    };

    match error.as_str() {
        Some("entity_not_found") => RepoError::NotFound {
            collection: text("collection"),
            entity_id: text("entity_id"),
        },
        Some("unique_constraint_violation") => RepoError::UniqueConstraintViolation {
            fields: strings("fields"),
            values: strings("values"),
            existing_entity_id: text("existing_entity_id"),
        },
        Some("entity_exists") => RepoError::UniqueConstraintViolation {
            fields: vec!["id".to_string()],
            values: vec![text("entity_id")],
            existing_entity_id: text("entity_id"),
        },
        Some("restricted") => RepoError::Restricted {
            collection: text("collection"),
            entity_id: text("entity_id"),
            dependents: text("dependents"),
        },
        Some(other) => RepoError::Other {
            message: Cow::Owned(other.to_string()),
        },
        None => RepoError::Other {
            message: Cow::Borrowed("lua_error"),
        },
    }
}

fn parse_document(json: &str) -> Result<Value, RepoError> {
    serde_json::from_str(json).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to parse stored document: {err}")),
    })
}
