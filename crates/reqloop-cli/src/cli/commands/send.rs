//! `reqloop send <METHOD> <URL>`: one request through the executor.

use anyhow::{anyhow, bail, Context, Result};
use reqloop_core::config::ReqloopConfig;
use reqloop_core::{CancelToken, LogicalRequest, Method, RequestBody, Response};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone)]
pub struct SendOptions {
    pub method: Method,
    pub url: String,
    pub headers: Vec<String>,
    pub query: Vec<String>,
    pub data: Option<String>,
    pub data_file: Option<PathBuf>,
    pub retries: Option<u32>,
    pub include: bool,
}

/// Runs the blocking executor off the async runtime; Ctrl-C cancels any
/// backoff sleep in progress.
pub async fn run_send(cfg: &ReqloopConfig, opts: SendOptions) -> Result<()> {
    let request = build_request(&opts)?;
    let mut executor = cfg.executor();
    if let Some(retries) = opts.retries {
        executor.set_max_retries(retries);
    }

    let token = CancelToken::new();
    let on_interrupt = token.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling request");
            on_interrupt.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || executor.execute_with_cancel(request, &token))
        .await
        .context("send task join")?;
    interrupt.abort();

    let response = result?;
    print_response(&response, opts.include)?;
    Ok(())
}

fn build_request(opts: &SendOptions) -> Result<LogicalRequest> {
    let target = Url::parse(&opts.url).with_context(|| format!("invalid URL {}", opts.url))?;
    let mut request = LogicalRequest::new(opts.method, target);
    for header in &opts.headers {
        let (name, value) = split_pair(header, ':')?;
        request.headers_mut().add(name, value);
    }
    for param in &opts.query {
        let (key, value) = split_pair(param, '=')?;
        request.query_mut().put(key, value);
    }

    let body = match (&opts.data, &opts.data_file) {
        (Some(text), _) => Some(RequestBody::from_bytes(text.as_bytes())),
        (None, Some(path)) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let len = file.metadata()?.len();
            Some(RequestBody::from_seekable(file, Some(len)))
        }
        (None, None) => None,
    };
    if let Some(body) = body {
        if !opts.method.has_entity() {
            bail!("{} requests cannot carry a body", opts.method);
        }
        request = request.with_body(body);
    }
    Ok(request)
}

fn split_pair(raw: &str, sep: char) -> Result<(&str, &str)> {
    raw.split_once(sep)
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow!("expected NAME{}VALUE, got {:?}", sep, raw))
}

fn print_response(response: &Response, include: bool) -> Result<()> {
    println!("HTTP {}", response.status());
    if include {
        for (name, value) in response.headers().iter() {
            println!("{}: {}", name, value);
        }
        println!();
    }
    let mut out = io::stdout().lock();
    out.write_all(response.body())?;
    out.flush()?;
    Ok(())
}
