//! HTTP GET transport for release downloads.
//!
//! Uses the curl crate (libcurl). One [`HttpClient`] is shared by every
//! worker; it keeps a bounded pool of idle curl handles so connections, DNS
//! and TLS sessions are reused across releases.

mod parse;

pub use parse::ResponseHead;

use std::cell::RefCell;
use std::io::Write;
use std::str;
use std::sync::Mutex;

use curl::easy::Easy;

use crate::config::HttpConfig;
use crate::error::PackError;

const MAX_REDIRECTS: u32 = 10;

/// Highest status accepted as a successful response.
const MAX_OK_STATUS: u32 = 302;

/// Outcome of a successful GET.
#[derive(Debug)]
pub struct Fetched<W> {
    pub head: ResponseHead,
    /// Body bytes written to the sink.
    pub received: u64,
    pub body: W,
}

/// Shared GET client.
pub struct HttpClient {
    config: HttpConfig,
    idle: Mutex<Vec<Easy>>,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn checkout(&self) -> Easy {
        self.idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop())
            .unwrap_or_else(Easy::new)
    }

    fn checkin(&self, mut easy: Easy) {
        // reset keeps the handle's connection cache
        easy.reset();
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.config.max_idle_connections as usize {
                idle.push(easy);
            }
        }
    }

    fn configure(&self, easy: &mut Easy, url: &str) -> Result<(), curl::Error> {
        let cfg = &self.config;
        easy.url(url)?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        // libcurl's connect phase includes the TLS handshake
        easy.connect_timeout(cfg.connect_timeout() + cfg.tls_handshake_timeout())?;
        easy.tcp_keepalive(true)?;
        easy.tcp_keepidle(cfg.keepalive())?;
        easy.tcp_keepintvl(cfg.keepalive())?;
        if cfg.skip_insecure {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }
        Ok(())
    }

    /// GET `url`, streaming the body into the writer returned by `open`.
    ///
    /// `open` is called exactly once with the final response head (after
    /// redirects), before the first body byte. Statuses above 302 fail with
    /// [`PackError::HttpStatus`] and no further body is written. A body
    /// shorter than the declared `Content-Length` fails with
    /// [`PackError::PartialTransfer`].
    pub fn fetch<W, F>(&self, url: &str, open: F) -> Result<Fetched<W>, PackError>
    where
        W: Write,
        F: FnOnce(&ResponseHead) -> W,
    {
        let mut easy = self.checkout();
        let result = self.fetch_with(&mut easy, url, open);
        self.checkin(easy);
        result
    }

    fn fetch_with<W, F>(&self, easy: &mut Easy, url: &str, open: F) -> Result<Fetched<W>, PackError>
    where
        W: Write,
        F: FnOnce(&ResponseHead) -> W,
    {
        self.configure(easy, url)?;

        let lines: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let mut open = Some(open);
        let mut sink: Option<(ResponseHead, W)> = None;
        let mut failure: Option<PackError> = None;
        let mut received = 0u64;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    lines.borrow_mut().push(line.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                if sink.is_none() {
                    let head = parse::parse_head(&lines.borrow());
                    if head.status > MAX_OK_STATUS {
                        failure = Some(PackError::HttpStatus(head.status));
                        return Ok(0);
                    }
                    if let Some(open) = open.take() {
                        let writer = open(&head);
                        sink = Some((head, writer));
                    }
                }
                let Some((_, writer)) = sink.as_mut() else {
                    return Ok(0);
                };
                match writer.write_all(data) {
                    Ok(()) => {
                        received += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        failure = Some(PackError::Io(e));
                        Ok(0) // abort transfer
                    }
                }
            })?;
            transfer.perform()
        };

        if let Some(err) = failure {
            return Err(err);
        }
        performed?;

        let code = easy.response_code()?;
        if code > MAX_OK_STATUS {
            return Err(PackError::HttpStatus(code));
        }

        let (head, mut body) = match sink {
            Some(pair) => pair,
            None => {
                // empty body: no write callback fired
                let head = parse::parse_head(&lines.borrow());
                let open = open.take().ok_or(PackError::HttpStatus(code))?;
                let writer = open(&head);
                (head, writer)
            }
        };
        body.flush()?;

        if let Some(expected) = head.content_length {
            if received < expected {
                return Err(PackError::PartialTransfer { expected, received });
            }
        }

        tracing::debug!(url, status = code, bytes = received, "GET completed");
        Ok(Fetched {
            head,
            received,
            body,
        })
    }
}
