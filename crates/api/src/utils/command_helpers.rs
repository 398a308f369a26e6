//! Command execution helpers
//!
//! Every handler body runs through [`execute_command`] so timing and the
//! completion log line are uniform across routes.

use std::future::Future;
use std::time::Instant;

use crate::utils::api_error::ApiError;
use crate::utils::logging::log_command_execution;

/// Await `command`, then log its duration and outcome.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn delete_event(
///     State(ctx): State<Arc<AppContext>>,
///     Path(event_id): Path<String>,
/// ) -> Result<Json<Value>, ApiError> {
///     execute_command("calendar::delete_event", async {
///         let token = ensure_token(&ctx, &headers).await?;
///         ctx.calendar.delete_event(&token.token, &event_id).await?;
///         Ok(Json(json!({"status": "deleted"})))
///     })
///     .await
/// }
/// ```
pub async fn execute_command<Fut, T>(command_name: &str, command: Fut) -> Result<T, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    let start = Instant::now();

    let result = command.await;

    let error_type = result.as_ref().err().map(ApiError::label);
    log_command_execution(command_name, start.elapsed(), result.is_ok(), error_type);

    result
}
