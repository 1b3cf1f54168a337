use chrono::Utc;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use order_report::trigger::{self, TriggerRequest, TriggerResponse};
use order_report::utils::{logger, validation::Validate};
use order_report::{ReportConfig, ReportEngine, ReportOutcome};

async fn function_handler(event: LambdaEvent<TriggerRequest>) -> Result<TriggerResponse, Error> {
    let request = event.payload;
    tracing::info!(
        request_id = %event.context.request_id,
        method = request.http_method.as_deref().unwrap_or("-"),
        "Order report triggered"
    );

    if let Some(response) = trigger::short_circuit(&request) {
        return Ok(response);
    }

    let config = match ReportConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            return Ok(TriggerResponse::from_outcome(&ReportOutcome::from_error(&e)));
        }
    };

    let collaborators = config
        .order_store()
        .and_then(|store| Ok((store, config.email_dispatcher()?)));
    let (store, dispatcher) = match collaborators {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "Could not build collaborators");
            return Ok(TriggerResponse::from_outcome(&ReportOutcome::from_error(&e)));
        }
    };

    let engine = ReportEngine::new(store, dispatcher, config.settings());
    Ok(trigger::handle(&engine, &request, Utc::now()).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
