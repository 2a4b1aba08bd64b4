mod endpoint;
mod error;
mod session;
