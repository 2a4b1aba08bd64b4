#[cfg(unix)]
mod connector;
