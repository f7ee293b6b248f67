//! libcurl-backed transport.
//!
//! Each attempt runs a blocking `curl::easy::Easy` transfer on tokio's blocking
//! pool. Dropping the attempt future raises an abort flag that the progress
//! callback checks, so an abandoned transfer stops within one callback tick.

use super::parse::parse_header_lines;
use super::{HttpRequest, HttpResponse, Method, Transport, TransportError, TransportErrorKind};
use std::future::Future;
use std::str;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// libcurl options applied to every attempt.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    /// Limit on the connect phase (DNS + TCP + TLS handshake).
    pub connect_timeout: Duration,
    /// Limit on the whole exchange. Expiry is an overall timeout and is not retried.
    pub request_timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(100),
            follow_redirects: true,
            max_redirects: 10,
            user_agent: concat!("rhc/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Default [`Transport`] built on the `curl` crate.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }
}

impl Transport for CurlTransport {
    fn attempt(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let request = request.clone();
        let options = self.options.clone();
        async move {
            let guard = AbortOnDrop::new();
            let flag = guard.flag();
            match tokio::task::spawn_blocking(move || perform(&request, &options, &flag)).await {
                Ok(result) => result,
                Err(e) => Err(TransportError::new(
                    TransportErrorKind::Other,
                    format!("transport task failed: {}", e),
                )),
            }
        }
    }
}

/// Sets the shared abort flag when the owning attempt future is dropped.
struct AbortOnDrop(Arc<AtomicBool>);

impl AbortOnDrop {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn perform(
    request: &HttpRequest,
    options: &CurlOptions,
    abort: &AtomicBool,
) -> Result<HttpResponse, TransportError> {
    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, request, options).map_err(|e| from_curl(&e))?;

    let mut header_lines: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(|e| from_curl(&e))?;
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(|e| from_curl(&e))?;
        // Returning false aborts the transfer (CURLE_ABORTED_BY_CALLBACK).
        transfer
            .progress_function(|_, _, _, _| !abort.load(Ordering::Relaxed))
            .map_err(|e| from_curl(&e))?;
        transfer.perform().map_err(|e| from_curl(&e))?;
    }

    let code = easy.response_code().map_err(|e| from_curl(&e))?;
    let status = u16::try_from(code).map_err(|_| {
        TransportError::new(
            TransportErrorKind::Other,
            format!("invalid response status {}", code),
        )
    })?;
    Ok(HttpResponse {
        status,
        headers: parse_header_lines(&header_lines),
        body,
    })
}

fn configure(
    easy: &mut curl::easy::Easy,
    request: &HttpRequest,
    options: &CurlOptions,
) -> Result<(), curl::Error> {
    easy.url(request.url.as_str())?;
    easy.follow_location(options.follow_redirects)?;
    easy.max_redirections(options.max_redirects)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.timeout(options.request_timeout)?;
    easy.useragent(&options.user_agent)?;
    easy.progress(true)?;

    match request.method {
        Method::Get => easy.get(true)?,
        Method::Head => easy.nobody(true)?,
        Method::Post | Method::Put | Method::Patch => {
            easy.custom_request(request.method.as_str())?;
            easy.post_fields_copy(request.body.as_deref().unwrap_or_default())?;
        }
        Method::Delete | Method::Options | Method::Trace => {
            easy.custom_request(request.method.as_str())?;
            if let Some(body) = &request.body {
                easy.post_fields_copy(body)?;
            }
        }
    }

    let mut list = curl::easy::List::new();
    for (k, v) in request.headers.iter() {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !request.headers.is_empty() {
        easy.http_headers(list)?;
    }
    Ok(())
}

/// libcurl reports both connect-phase and whole-transfer expiry as
/// `CURLE_OPERATION_TIMEDOUT`; only the message tells them apart.
pub(crate) fn is_connect_phase_timeout(message: &str) -> bool {
    message.contains("Connection timed out")
        || message.contains("Resolving timed out")
        || (message.contains("Failed to connect") && message.contains("Timeout was reached"))
}

/// Map a curl error onto a transport error kind.
fn from_curl(e: &curl::Error) -> TransportError {
    let message = e.to_string();
    let kind = if e.is_operation_timedout() {
        if is_connect_phase_timeout(&message) {
            TransportErrorKind::ConnectTimeout
        } else {
            TransportErrorKind::Timeout
        }
    } else if e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cipher()
        || e.is_ssl_cacert()
        || e.is_ssl_cacert_badfile()
        || e.is_ssl_crl_badfile()
        || e.is_ssl_issuer_error()
    {
        TransportErrorKind::Tls
    } else if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_send_error()
        || e.is_recv_error()
        || e.is_got_nothing()
    {
        TransportErrorKind::Connect
    } else if e.is_aborted_by_callback() {
        TransportErrorKind::Cancelled
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_phase_markers() {
        assert!(is_connect_phase_timeout(
            "[28] Timeout was reached (Connection timed out after 10001 milliseconds)"
        ));
        assert!(is_connect_phase_timeout(
            "Resolving timed out after 5000 milliseconds"
        ));
        assert!(is_connect_phase_timeout(
            "Failed to connect to 10.255.255.1 port 80 after 3002 ms: Timeout was reached"
        ));
    }

    #[test]
    fn whole_transfer_timeout_has_no_connect_marker() {
        assert!(!is_connect_phase_timeout(
            "[28] Timeout was reached (Operation timed out after 30000 milliseconds with 0 bytes received)"
        ));
    }

    #[test]
    fn abort_guard_sets_flag_on_drop() {
        let guard = AbortOnDrop::new();
        let flag = guard.flag();
        assert!(!flag.load(Ordering::Relaxed));
        drop(guard);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn default_options_follow_redirects() {
        let t = CurlTransport::default();
        assert!(t.options().follow_redirects);
        assert_eq!(t.options().connect_timeout, Duration::from_secs(10));
        assert!(t.options().user_agent.starts_with("rhc/"));
    }
}
