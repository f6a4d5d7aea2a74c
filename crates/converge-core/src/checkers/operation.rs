// # Operation Checker
//
// Follows a long-running operation by its tracking handle until it is
// `done`. An `error` status is a terminal failure carrying the remote's
// error detail.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::{AppApi, Operation, OperationApi, OperationStatus};
use crate::wait::{Condition, WaitSpec, wait_until};

/// Condition satisfied once the operation is done
pub struct OperationFinished<'a, O: OperationApi + ?Sized> {
    api: &'a O,
    location: String,
    last: Option<Operation>,
}

impl<'a, O: OperationApi + ?Sized> OperationFinished<'a, O> {
    pub fn new(api: &'a O, location: impl Into<String>) -> Self {
        Self {
            api,
            location: location.into(),
            last: None,
        }
    }

    pub fn into_last(self) -> Option<Operation> {
        self.last
    }
}

#[async_trait]
impl<'a, O: OperationApi + ?Sized> Condition for OperationFinished<'a, O> {
    async fn check(&mut self) -> Result<bool> {
        let operation = self.api.show_operation(&self.location).await?;
        let status = operation.status;
        debug!(operation_id = %operation.id, ?status, "operation status");

        let outcome = match status {
            OperationStatus::Done => Ok(true),
            OperationStatus::Error => Err(Error::remote_failure(
                format!("operation {}", operation.id),
                operation
                    .error
                    .clone()
                    .unwrap_or_else(|| "no error detail reported".to_string()),
            )),
            _ => Ok(false),
        };
        self.last = Some(operation);
        outcome
    }
}

/// Block until the operation tracked by `location` is done and return it
pub async fn wait_for_operation<O: OperationApi + ?Sized>(
    api: &O,
    cancel: &CancellationToken,
    spec: &WaitSpec,
    location: &str,
) -> Result<Operation> {
    let mut checker = OperationFinished::new(api, location);
    wait_until(cancel, spec, &mut checker).await?;
    super::observed(checker.into_last(), "operation")
}

/// Restart the application and, if the platform started an operation for
/// it, block until that operation is done
///
/// Nothing is sent if `cancel` has already fired.
pub async fn restart_and_wait<C>(
    api: &C,
    cancel: &CancellationToken,
    spec: &WaitSpec,
    app_id: &str,
) -> Result<Option<Operation>>
where
    C: AppApi + OperationApi + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let Some(location) = api.restart_app(app_id).await? else {
        debug!(app_id, "restart did not start an operation");
        return Ok(None);
    };

    info!(app_id, %location, "waiting for restart operation");
    wait_for_operation(api, cancel, spec, &location).await.map(Some)
}
