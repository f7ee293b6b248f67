//! `rhc get` / `rhc request` – send one request through the retry engine.

use anyhow::{Context, Result};
use rhc_core::http::{Headers, HttpRequest, Method, Transport};
use rhc_core::Client;
use std::io::Write;

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    Headers::parse_line(raw).with_context(|| format!("header {:?} is not \"Name: value\"", raw))
}

pub async fn run_request<T: Transport>(
    client: &Client<T>,
    method: &str,
    url: &str,
    headers: &[String],
    data: Option<String>,
) -> Result<()> {
    let method: Method = method.parse()?;
    let mut request = HttpRequest::new(method, url)?;
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.header(name, value);
    }
    if let Some(data) = data {
        request = request.body(data);
    }

    client
        .execute(request)
        .if_success(|response| async move {
            let mut out = std::io::stdout().lock();
            out.write_all(&response.body)?;
            out.flush()?;
            Ok(())
        })
        .else_with(|failure| async move {
            eprintln!("{}", serde_json::to_string_pretty(&failure.to_json())?);
            Err(anyhow::Error::new(failure))
        })
        .await
}
