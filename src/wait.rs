use crate::{
    Error, Result,
    jsonpath::{JsonPath, render},
};
use kube::api::{Api, DynamicObject};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::*;

/// Readiness condition: the value selected by `jsonpath` must render as `value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitCondition {
    pub jsonpath: String,
    pub value: String,
    pub timeout: Duration,
}

/// Poll until `check_fn` yields a value or `timeout` is reached
///
/// `check_fn` returns `Ok(Some(_))` when done and `Ok(None)` to keep polling.
/// Errors from a single check are logged and polling continues. The check runs
/// at least once, even with a zero timeout.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    timeout_msg: impl Into<String>,
    mut check_fn: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    let mut last_error = None;

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => trace!("Polling condition not yet met, retrying"),
            Err(e) => {
                debug!("Polling check returned error (retrying): {e}");
                last_error = Some(e);
            }
        }

        if start.elapsed() >= timeout {
            let msg = timeout_msg.into();
            return Err(Error::Timeout(match last_error {
                Some(e) => format!("{msg} (last error: {e})"),
                None => msg,
            }));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Wait until every condition holds on the named object, one condition after another.
///
/// Returns the object as last observed, or `None` when there was nothing to wait for.
pub async fn wait_for_conditions(
    api: &Api<DynamicObject>,
    name: &str,
    conditions: &[WaitCondition],
    poll_interval: Duration,
) -> Result<Option<DynamicObject>> {
    let mut latest = None;

    for condition in conditions {
        let path: JsonPath = condition.jsonpath.parse()?;
        let path = &path;

        info!(
            "Waiting for {} to equal {:?} on {name} (timeout {:?})",
            condition.jsonpath, condition.value, condition.timeout
        );

        let object = poll_until(
            condition.timeout,
            poll_interval,
            format!(
                "{} did not become {:?} within {:?}",
                condition.jsonpath, condition.value, condition.timeout
            ),
            || async move {
                let object = api.get(name).await.map_err(Error::KubeError)?;
                let document = serde_json::to_value(&object).map_err(Error::SerializationError)?;
                let satisfied = path
                    .query(&document)
                    .into_iter()
                    .any(|v| render(v) == condition.value);
                Ok(satisfied.then_some(object))
            },
        )
        .await?;

        latest = Some(object);
    }

    Ok(latest)
}

/// Wait until the named object can no longer be found.
pub async fn wait_for_deletion(
    api: &Api<DynamicObject>,
    name: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    poll_until(
        timeout,
        poll_interval,
        format!("{name} still exists after {timeout:?}"),
        || async move {
            match api.get_opt(name).await.map_err(Error::KubeError)? {
                Some(_) => Ok(None),
                None => Ok(Some(())),
            }
        },
    )
    .await
}
