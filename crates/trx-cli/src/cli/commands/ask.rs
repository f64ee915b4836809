//! Ask command handler: one-shot query with a live trace on stderr.
//!
//! Trace lines go to stderr and the final answer to stdout, so piping the
//! answer still shows progress on the terminal.

use anyhow::{Context, Result, bail};
use tracing::debug;
use trx_core::api::types::{QueryRequest, QueryResponse};
use trx_core::api::{ApiClient, StreamEvent};
use trx_core::config::Config;
use trx_core::interrupt::{self, InterruptedError};
use trx_core::thinking::split_thinking;

pub struct AskOptions<'a> {
    pub query: &'a str,
    pub batch: bool,
    pub stream: bool,
    pub session: Option<&'a str>,
    pub json: bool,
    pub user: Option<&'a str>,
    pub new_user: bool,
}

pub async fn run(options: AskOptions<'_>, config: &Config) -> Result<()> {
    let user_id = if options.new_user {
        format!("user_{}", uuid::Uuid::new_v4().simple())
    } else {
        options.user.unwrap_or(&config.user_id).to_string()
    };
    let client = ApiClient::new(config).context("create API client")?;

    let session_id = match options.session {
        Some(id) => id.to_string(),
        None => {
            client
                .create_session(&user_id)
                .await
                .context("create session")?
                .session_id
        }
    };

    debug!(%session_id, "session ready");
    let request = QueryRequest::new(options.query, user_id).with_session(Some(session_id));

    // Flags win over the configured default, in either direction.
    let batch = options.batch || (!options.stream && config.mode.is_batch());
    let response = if batch {
        client.query(&request).await.context("query failed")?
    } else {
        stream_query(&client, &request).await?
    };

    print_response(&response, options.json)
}

async fn stream_query(client: &ApiClient, request: &QueryRequest) -> Result<QueryResponse> {
    let mut stream = client
        .open_stream(request)
        .await
        .context("open query stream")?;

    loop {
        tokio::select! {
            () = interrupt::wait_for_interrupt() => {
                stream.close();
                return Err(InterruptedError.into());
            }
            next = stream.next_event() => match next {
                None => bail!("stream closed without a final response"),
                Some(Ok(StreamEvent::Complete(response))) => return Ok(*response),
                Some(Ok(event)) => print_trace_event(&event),
                Some(Err(err)) => {
                    return Err(anyhow::Error::new(err)).context("query stream failed");
                }
            }
        }
    }
}

fn print_trace_event(event: &StreamEvent) {
    match event {
        StreamEvent::Thought(thought) => {
            eprintln!(
                "think[{}]  {}",
                thought.iteration + 1,
                thought.content.thought
            );
        }
        StreamEvent::Action(action) => {
            let call = &action.action;
            let params = serde_json::to_string(&call.parameters).unwrap_or_default();
            eprintln!(
                "  act[{}]  {}({params})",
                action.iteration + 1,
                call.function_name
            );
        }
        StreamEvent::Observation(observation) => {
            eprintln!("  obs[{}]  {}", observation.iteration + 1, observation.summary());
        }
        StreamEvent::Complete(_) | StreamEvent::Error { .. } => {}
    }
}

fn print_response(response: &QueryResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        let parts = split_thinking(&response.answer);
        println!("{}", parts.body);
        if let Some(error) = &response.metadata.error {
            eprintln!("warning: {error}");
        }
    }
    if !response.success {
        bail!("query did not succeed");
    }
    Ok(())
}
