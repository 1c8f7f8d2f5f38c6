//! Runs the HTTP API on a single threaded runtime.
use crate::args::ServerParams;
use crate::commands::options_of;
use std::time::Duration;
use toit_tql::context::Context;
use toit_tql::server::{router, ServerSettings};
use toit_tql::{Error, InternalError};
use tokio::runtime::Builder;

pub fn run(params: ServerParams) -> Result<(), Error> {
    // The server logs through tracing, everything else keeps using env_logger.
    tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish()).map_err(
        |error| InternalError(format!("Cannot set up request logging: {error}")),
    )?;

    let allow_origin = params
        .allow_origin
        .map(|origin| {
            origin
                .parse()
                .map_err(|_| InternalError(format!("Invalid origin: {origin}")))
        })
        .transpose()?;

    let context = Context::current()?;
    let settings = ServerSettings {
        options: options_of(context.as_ref()),
        max_requests: params.max_requests,
        window: Duration::from_secs(params.window_secs),
        allow_origin,
    };

    // One thread is plenty, all the work is synchronous and quick.
    let tokio = Builder::new_current_thread().enable_io().build()?;

    tokio.block_on(async {
        let listener = tokio::net::TcpListener::bind(&params.bind).await?;
        tracing::info!("listening on {}", params.bind);

        axum::serve(listener, router(settings)).await?;

        Ok::<(), Error>(())
    })
}
