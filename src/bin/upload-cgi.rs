//! CGI entry point: handles exactly one request and exits.
//!
//! Logs go to stderr, which CGI servers route to their error log; stdout is
//! reserved for the response.
#[macro_use]
extern crate log;

use std::io::{self, Write};
use std::process;

use upload_cgi::cgi::CgiEnv;
use upload_cgi::config::{UploadConfig, LOG_VAR};
use upload_cgi::upload::{self, Outcome};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_VAR, "warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let status = match handle() {
        Ok(outcome) => {
            debug!("done: {:?}", outcome);
            0
        }
        // the client's fault, not something the host has to look at
        Err(e) if e.is_malformed_request() => {
            warn!("rejected request: {}", e);
            1
        }
        Err(e) => {
            error!("upload failed: {}", e);
            1
        }
    };
    process::exit(status);
}

fn handle() -> upload_cgi::Result<Outcome> {
    let config = UploadConfig::from_env()?;
    let env = CgiEnv::from_env()?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let outcome = upload::run(config, &env, stdin.lock(), &mut stdout)?;
    stdout.flush()?;
    Ok(outcome)
}
